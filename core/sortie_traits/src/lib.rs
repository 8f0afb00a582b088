use std::error::Error;
use std::fmt::{Display, Formatter};

/// Common sortie Error type.
///
/// This is the error you get when the link to the vehicle itself is broken
/// (transport gone, firmware thread dead, poisoned state). Expected flight
/// failures like a timeout or a refused command are not `SortieError`s, they
/// are values returned by the flight controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortieError {
    message: String,
    cause: Option<String>,
}

impl Display for SortieError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let cause_str = match &self.cause {
            Some(c) => c.to_string(),
            None => "None".to_string(),
        };
        write!(f, "{}\n   cause: {}", self.message, cause_str)?;
        Ok(())
    }
}

impl Error for SortieError {}

impl From<&str> for SortieError {
    fn from(s: &str) -> SortieError {
        SortieError {
            message: s.to_string(),
            cause: None,
        }
    }
}

impl From<String> for SortieError {
    fn from(s: String) -> SortieError {
        SortieError {
            message: s,
            cause: None,
        }
    }
}

impl SortieError {
    pub fn new_with_cause(message: &str, cause: impl Display) -> SortieError {
        SortieError {
            message: message.to_string(),
            cause: Some(cause.to_string()),
        }
    }

    pub fn add_cause(mut self, cause: &str) -> SortieError {
        self.cause = Some(cause.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }
}

// Generic Result type for sortie.
pub type SortieResult<T> = Result<T, SortieError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_has_no_cause() {
        let err = SortieError::from("link lost");
        assert_eq!(err.message(), "link lost");
        assert!(err.cause().is_none());
        assert_eq!(err.to_string(), "link lost\n   cause: None");
    }

    #[test]
    fn test_add_cause() {
        let err: SortieError = format!("Failed to send {}", "TakeOff").into();
        let err = err.add_cause("channel closed");
        assert_eq!(err.message(), "Failed to send TakeOff");
        assert_eq!(err.cause(), Some("channel closed"));
    }

    #[test]
    fn test_new_with_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = SortieError::new_with_cause("Failed to read configuration", io);
        assert!(err.to_string().contains("no such file"));
    }

    #[test]
    fn test_question_mark_conversion() {
        fn inner() -> SortieResult<()> {
            Err::<(), _>("boom")?;
            Ok(())
        }
        assert_eq!(inner().unwrap_err().message(), "boom");
    }
}
