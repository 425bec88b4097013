use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("unsupported payload type: {0}")]
    Unsupported(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("extraction produced no text")]
    Empty,

    #[error("{strategy} extraction failed: {reason}")]
    Backend {
        strategy: &'static str,
        reason: String,
    },

    #[error("unknown extraction strategy: {0}")]
    UnknownStrategy(String),
}
