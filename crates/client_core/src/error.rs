use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {status}: {message}")]
    Server { status: u16, message: String },
    #[error("websocket failure: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("undecodable server event: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("realtime connection closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ClientError>;
