//! Error types for mica

use thiserror::Error;

/// Main error type for mica operations.
///
/// Every violated precondition has its own variant so callers can match on
/// the cause instead of parsing messages.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration
    #[error("Methodology must be \"id2d\", \"id3d\", \"mlr+id2d\", \"mlr+id3d\" or \"mlr\" (got {0:?})")]
    UnknownMethod(String),

    #[error("{0} not defined in the configuration file.")]
    MethodNotConfigured(String),

    #[error("{key} not defined in the configuration of {method}.")]
    MissingConfigKey { method: String, key: &'static str },

    #[error("{key} must be {expected}")]
    InvalidConfigType {
        key: &'static str,
        expected: &'static str,
    },

    #[error("Invalid value for {key}: {reason}")]
    InvalidConfigValue { key: &'static str, reason: String },

    #[error(
        "Variables properties are not the same. Variables fields must have the same \
         GeoTransform, Projection, XSize and YSize. (offending layer: {0})"
    )]
    MisalignedPredictors(String),

    #[error("No such file or directory: {0}")]
    FileNotFound(String),

    #[error("cluster file must be a list")]
    ClusterDefinitionsNotList,

    // Input data
    #[error("Point {point} has no field {key}")]
    MissingField { point: String, key: String },

    #[error("Duplicate point id: {0}")]
    DuplicatePointId(String),

    #[error("`raster_data` must be a {expected} dimensional array (got {actual})")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Size mismatch in {what}: expected {expected:?}, got {actual:?}")]
    SizeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Field {0} is not among the raster layers")]
    UnknownField(String),

    // Model degeneracy
    #[error("No variable improves the regression score")]
    NoVariableFits,

    // Generic
    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for mica operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_cause() {
        let err = Error::MissingField {
            point: "AA".into(),
            key: "altitude".into(),
        };
        assert_eq!(err.to_string(), "Point AA has no field altitude");

        let err = Error::MethodNotConfigured("id3d".into());
        assert_eq!(err.to_string(), "id3d not defined in the configuration file.");

        assert_eq!(
            Error::ClusterDefinitionsNotList.to_string(),
            "cluster file must be a list"
        );
    }

    #[test]
    fn json_errors_convert() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Json(_)));
    }
}
