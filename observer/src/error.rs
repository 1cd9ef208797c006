use shared::CodecError;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("connection to the bridge dropped")]
    Closed,
}
