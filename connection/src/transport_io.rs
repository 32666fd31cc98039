use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::error::ConnectionError;

/// A framed byte-stream transport, uniform over TCP (explicit
/// length-delimited framing) and WebSocket (native message framing).
pub enum Transport {
    /// A TCP socket framed with a 4-byte length prefix per JSON frame.
    Tcp(Framed<TcpStream, LengthDelimitedCodec>),
    /// A WebSocket connection; each message is one JSON frame.
    WebSocket(WebSocketStream<TcpStream>),
}

impl Transport {
    /// Wraps a freshly accepted or dialled TCP socket with length-delimited
    /// framing, capped at `max_frame_bytes`.
    pub fn new_tcp(stream: TcpStream, max_frame_bytes: usize) -> Self {
        let codec = LengthDelimitedCodec::builder()
            .max_frame_length(max_frame_bytes)
            .new_codec();
        Transport::Tcp(Framed::new(stream, codec))
    }

    /// Wraps an accepted WebSocket connection.
    pub fn new_websocket(stream: WebSocketStream<TcpStream>) -> Self {
        Transport::WebSocket(stream)
    }

    /// Reads the next complete frame, or `None` on clean connection close.
    pub async fn recv_frame(&mut self) -> Option<Result<Vec<u8>, ConnectionError>> {
        match self {
            Transport::Tcp(framed) => framed
                .next()
                .await
                .map(|result| result.map(|bytes| bytes.to_vec()).map_err(ConnectionError::from)),
            Transport::WebSocket(ws) => loop {
                match ws.next().await {
                    Some(Ok(Message::Binary(bytes))) => return Some(Ok(bytes)),
                    Some(Ok(Message::Text(text))) => return Some(Ok(text.into_bytes())),
                    Some(Ok(Message::Close(_))) => return None,
                    Some(Ok(_)) => continue,
                    Some(Err(err)) => return Some(Err(ConnectionError::from(err))),
                    None => return None,
                }
            },
        }
    }

    /// Writes one complete frame.
    pub async fn send_frame(&mut self, bytes: Vec<u8>) -> Result<(), ConnectionError> {
        match self {
            Transport::Tcp(framed) => framed.send(Bytes::from(bytes)).await.map_err(ConnectionError::from),
            Transport::WebSocket(ws) => ws
                .send(Message::Binary(bytes))
                .await
                .map_err(ConnectionError::from),
        }
    }

    /// The physical transport kind.
    pub fn connection_type(&self) -> crate::types::ConnectionType {
        match self {
            Transport::Tcp(_) => crate::types::ConnectionType::Tcp,
            Transport::WebSocket(_) => crate::types::ConnectionType::WebSocket,
        }
    }
}
