#![allow(missing_docs)]

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "native-ws")]
    #[error("Websocket error: {0}")]
    Websocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Url parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Failed to open connection to {0}: {1}")]
    ConnectFailed(String, String),

    #[error("Connection {0} is closed")]
    ConnectionClosed(String),

    #[error("Connection {0} not found")]
    ConnectionNotFound(String),
}
