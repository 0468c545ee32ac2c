use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Endpoint error: {0}")]
    Endpoint(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FeedError {
    /// Short, stable label attached to failure logs as `error_kind`
    pub fn code(&self) -> &'static str {
        match self {
            FeedError::Config(_) => "config",
            FeedError::Endpoint(_) => "endpoint",
            FeedError::Url(_) => "url",
            FeedError::Http(_) => "http",
            FeedError::WebSocket(_) => "websocket",
            FeedError::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
