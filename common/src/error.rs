use thiserror::Error;

/// Failure reading or writing the persisted control record.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state store i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("state record is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("field '{field}' holds a {found} value, expected {expected}")]
    FieldType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("field '{field}' value {value} is out of range")]
    FieldRange { field: String, value: i64 },
}
