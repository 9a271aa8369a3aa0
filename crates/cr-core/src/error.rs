//! Error types for coincrank

use thiserror::Error;

/// coincrank error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Requested statistic name is not registered
    #[error("{0} is not an available detection statistic")]
    UnknownStatistic(String),

    /// Calibration data is missing or malformed
    #[error("Calibration error: {0}")]
    Calibration(String),

    /// Validation error (trigger data does not meet the statistic's contract)
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_statistic_names_the_input() {
        let err = Error::UnknownStatistic("snr_squared".into());
        assert_eq!(err.to_string(), "snr_squared is not an available detection statistic");
    }

    #[test]
    fn test_io_error_converts() {
        fn open() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json"))?;
            Ok(())
        }
        assert!(matches!(open(), Err(Error::Io(_))));
    }
}
