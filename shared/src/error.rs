use thiserror::Error;

/// Failures turning bytes into wire records and back
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("window start {start} is past window end {end}")]
    InvalidWindow { start: u64, end: u64 },
}
