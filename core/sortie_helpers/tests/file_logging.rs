use log::{debug, info, warn};
use simplelog::LevelFilter;
use sortie_helpers::basic_sortie_setup;
use std::fs;
use tempfile::TempDir;

// The logger is global, keep a single test in this binary.
#[test]
fn log_lines_end_up_in_the_file() {
    let tmp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_path = tmp_dir.path().join("sortie.log");

    let context =
        basic_sortie_setup(Some(&log_path), LevelFilter::Info, false).expect("Failed to setup logger.");
    assert_eq!(context.log_file.as_deref(), Some(log_path.as_path()));

    info!("Attempt {} to get GPS lock...", 1);
    warn!("Already flying");
    debug!("below the threshold");
    log::logger().flush();

    let content = fs::read_to_string(&log_path).expect("Failed to read log file");
    assert!(content.contains("Attempt 1 to get GPS lock..."));
    assert!(content.contains("Already flying"));
    assert!(!content.contains("below the threshold"));

    assert!(basic_sortie_setup(None, LevelFilter::Info, false).is_err());
}
