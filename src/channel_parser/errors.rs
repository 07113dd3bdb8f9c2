use thiserror::Error;

/// Result type for channel parser internals
pub type ChannelParserResult<T> = Result<T, ChannelParserError>;

/// Errors raised inside the channel parser.
///
/// None of these escape `parse`; they are logged and degraded to
/// "no tool request" or a default.
#[derive(Debug, Error)]
pub enum ChannelParserError {
    #[error("Unknown channel format: {0}")]
    UnknownFormat(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Tool payload has no name")]
    MissingToolName,

    #[error("Unsupported tool payload shape: {0}")]
    UnsupportedPayload(String),

    #[error("Invalid tool call id: {0}")]
    InvalidToolCallId(String),
}
