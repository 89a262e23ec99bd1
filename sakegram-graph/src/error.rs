use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    /// Credentials or base URL missing. The message names the setting.
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    InvalidImageUrl(String),

    #[error("Graph API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Media processing failed")]
    ProcessingFailed,

    #[error("Unexpected Graph API response: {0}")]
    UnexpectedResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
