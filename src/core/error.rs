//! Error types for the logging core

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Generic IO error from a sink
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Reflected (serde) value could not be encoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A sink accepted fewer bytes than it was given without reporting an error
    #[error("incomplete write: wrote {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// An object or array marshaler failed
    #[error("{0}")]
    Marshal(String),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// A checked entry was written more than once
    #[error("unsafe CheckedEntry re-use: entry was already written")]
    EntryReused,

    /// Several independent failures, e.g. one per core in a tee
    #[error("{}", join_errors(.0))]
    Multiple(Vec<LoggerError>),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

fn join_errors(errors: &[LoggerError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl LoggerError {
    /// Create an incomplete-write error
    pub fn short_write(written: usize, expected: usize) -> Self {
        LoggerError::ShortWrite { written, expected }
    }

    /// Create a marshaling error
    pub fn marshal<S: Into<String>>(msg: S) -> Self {
        LoggerError::Marshal(msg.into())
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Flattened view of the individual failures held by this error
    pub fn errors(&self) -> Vec<&LoggerError> {
        match self {
            LoggerError::Multiple(errs) => errs.iter().collect(),
            other => vec![other],
        }
    }
}

/// Combine two optional errors without losing either.
///
/// Aggregates are flattened, so appending a `Multiple` to a `Multiple` yields a
/// single list rather than a nested one.
pub fn append_error(acc: Option<LoggerError>, err: LoggerError) -> Option<LoggerError> {
    let Some(acc) = acc else {
        return Some(err);
    };

    let mut errors = match acc {
        LoggerError::Multiple(errs) => errs,
        other => vec![other],
    };
    match err {
        LoggerError::Multiple(errs) => errors.extend(errs),
        other => errors.push(other),
    }
    Some(LoggerError::Multiple(errors))
}

/// Turn an accumulated optional error back into a `Result`.
pub fn into_result(acc: Option<LoggerError>) -> Result<()> {
    match acc {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::short_write(3, 10);
        assert!(matches!(err, LoggerError::ShortWrite { .. }));

        let err = LoggerError::config("IncreaseLevel", "cannot lower level");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerError::marshal("bad object");
        assert!(matches!(err, LoggerError::Marshal(_)));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            LoggerError::short_write(3, 10).to_string(),
            "incomplete write: wrote 3 of 10 bytes"
        );
        assert_eq!(
            LoggerError::config("sampler", "zero tick").to_string(),
            "Invalid configuration for sampler: zero tick"
        );
    }

    #[test]
    fn test_append_error_flattens() {
        let acc = append_error(None, LoggerError::other("a"));
        assert!(matches!(acc, Some(LoggerError::Other(_))));

        let acc = append_error(acc, LoggerError::other("b"));
        let acc = append_error(
            acc,
            LoggerError::Multiple(vec![LoggerError::other("c"), LoggerError::other("d")]),
        );

        let err = acc.expect("aggregate");
        assert_eq!(err.errors().len(), 4);
        assert_eq!(err.to_string(), "a; b; c; d");
    }

    #[test]
    fn test_into_result() {
        assert!(into_result(None).is_ok());
        assert!(into_result(Some(LoggerError::EntryReused)).is_err());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: LoggerError = io_err.into();
        assert!(matches!(err, LoggerError::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }
}
