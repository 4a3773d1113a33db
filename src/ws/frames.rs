//! Frame-level stages on either side of the message codec.

use axum::body::Bytes;
use tokio_tungstenite::tungstenite::Message;

/// What the adapter extracted from an inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    Payload(Bytes),
    Ignore,
    Close,
}

/// Inbound stage: WebSocket frames to payload bytes.
///
/// The application protocol is binary; text frames are dropped. Ping/pong
/// replies are produced by the transport itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameAdapter;

impl FrameAdapter {
    pub const NAME: &'static str = "ws-frame-adapter";

    pub fn inbound(&self, frame: Message) -> FrameEvent {
        match frame {
            Message::Binary(payload) => FrameEvent::Payload(payload),
            Message::Close(_) => FrameEvent::Close,
            Message::Text(_) => {
                tracing::debug!("Dropping text frame");
                FrameEvent::Ignore
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => FrameEvent::Ignore,
        }
    }
}

/// Outbound stage: encoded payload to a binary frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct WrapperEncoder;

impl WrapperEncoder {
    pub const NAME: &'static str = "ws-wrapper-encoder";

    pub fn wrap(&self, payload: Bytes) -> Message {
        Message::Binary(payload)
    }
}
