use std::io;

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serde_json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("system error: {0}")]
    System(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Method '{0}' not found")]
    MethodNotFound(String),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("render error: {0}")]
    Render(String),
}

impl Error {
    /// True for errors caused by the caller's input rather than by this
    /// process or a remote service.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidParameters(_) | Error::Json(_))
    }
}

pub type Result<T> = core::result::Result<T, Error>;

pub type BoxError = Box<dyn std::error::Error + Sync + Send>;
