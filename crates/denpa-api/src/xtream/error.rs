use thiserror::Error;

#[derive(Debug, Error)]
pub enum XtreamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse provider response: {0}")]
    Parse(String),

    #[error("invalid provider configuration: {0}")]
    Config(String),
}
