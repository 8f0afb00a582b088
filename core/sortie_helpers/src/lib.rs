use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use sortie_traits::{SortieError, SortieResult};
use std::fs::File;
use std::path::{Path, PathBuf};

/// What [`basic_sortie_setup`] has put in place.
#[derive(Debug, Clone, Default)]
pub struct SortieContext {
    pub log_file: Option<PathBuf>,
}

/// This is a basic setup for a sortie application to get you started.
/// Duplicate and customize as needed when your needs grow.
///
/// log_file: if given, every line at `level` or above is also written to this file,
///           the file is truncated first.
///
/// text_log: if true, the log will be printed to the console as well.
///           Turn it off when the caller owns the terminal, e.g. in tests.
///
/// The logger can only be installed once per process, a second call returns an error.
pub fn basic_sortie_setup(
    log_file: Option<&Path>,
    level: LevelFilter,
    text_log: bool,
) -> SortieResult<SortieContext> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if text_log {
        loggers.push(TermLogger::new(
            level,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }
    if let Some(path) = log_file {
        let file = File::create(path).map_err(|e| {
            SortieError::from(format!("Failed to create log file: {:?}", path))
                .add_cause(e.to_string().as_str())
        })?;
        loggers.push(WriteLogger::new(level, Config::default(), file));
    }
    CombinedLogger::init(loggers)
        .map_err(|e| SortieError::new_with_cause("Failed to install the logger", e))?;
    Ok(SortieContext {
        log_file: log_file.map(Path::to_path_buf),
    })
}

/// Maps a `-v` count to a level, starting at info.
pub fn level_from_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity() {
        assert_eq!(level_from_verbosity(0), LevelFilter::Info);
        assert_eq!(level_from_verbosity(1), LevelFilter::Debug);
        assert_eq!(level_from_verbosity(7), LevelFilter::Trace);
    }
}
