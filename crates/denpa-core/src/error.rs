use thiserror::Error;

#[derive(Debug, Error)]
pub enum DenpaError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
