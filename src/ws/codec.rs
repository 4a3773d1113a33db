//! Application message codec seam.
//!
//! The wire format carried inside WebSocket frames belongs to the
//! application; the multiplexer only needs a shared, reentrant codec that
//! turns frame payloads into [`AppMessage`]s and back.

use std::sync::Arc;

use axum::body::Bytes;

use crate::error::MuxError;
use crate::observability::metrics;

/// A decoded application message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppMessage {
    pub payload: Bytes,
}

impl AppMessage {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

/// Converts between frame payloads and application messages.
///
/// One instance is shared by every WebSocket connection.
pub trait MessageCodec: Send + Sync {
    fn decode(&self, payload: Bytes) -> Result<AppMessage, MuxError>;

    fn encode(&self, message: AppMessage) -> Result<Bytes, MuxError>;
}

/// Codec that passes payloads through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueCodec;

impl MessageCodec for OpaqueCodec {
    fn decode(&self, payload: Bytes) -> Result<AppMessage, MuxError> {
        Ok(AppMessage { payload })
    }

    fn encode(&self, message: AppMessage) -> Result<Bytes, MuxError> {
        Ok(message.payload)
    }
}

/// Inbound stage: payload bytes to [`AppMessage`].
#[derive(Clone)]
pub struct MessageDecoder {
    codec: Arc<dyn MessageCodec>,
}

impl MessageDecoder {
    pub const NAME: &'static str = "message-decoder";

    pub fn new(codec: Arc<dyn MessageCodec>) -> Self {
        Self { codec }
    }

    pub fn decode(&self, payload: Bytes) -> Result<AppMessage, MuxError> {
        let message = self.codec.decode(payload)?;
        metrics::record_ws_message("inbound");
        Ok(message)
    }
}

/// Outbound stage: [`AppMessage`] to payload bytes.
#[derive(Clone)]
pub struct MessageEncoder {
    codec: Arc<dyn MessageCodec>,
}

impl MessageEncoder {
    pub const NAME: &'static str = "message-encoder";

    pub fn new(codec: Arc<dyn MessageCodec>) -> Self {
        Self { codec }
    }

    pub fn encode(&self, message: AppMessage) -> Result<Bytes, MuxError> {
        let payload = self.codec.encode(message)?;
        metrics::record_ws_message("outbound");
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_codec_is_identity() {
        let codec: Arc<dyn MessageCodec> = Arc::new(OpaqueCodec);
        let decoder = MessageDecoder::new(Arc::clone(&codec));
        let encoder = MessageEncoder::new(codec);

        let message = decoder.decode(Bytes::from_static(b"\x14\x00\x01hw")).unwrap();
        assert_eq!(message, AppMessage::new(Bytes::from_static(b"\x14\x00\x01hw")));
        assert_eq!(&encoder.encode(message).unwrap()[..], b"\x14\x00\x01hw");
    }
}
