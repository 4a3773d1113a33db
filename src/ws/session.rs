//! The frame pipeline that runs on an upgraded WebSocket connection.
//!
//! ```text
//! inbound:  frame → ws-frame-adapter → message-decoder → generic-login
//! outbound: generic-login → message-encoder → ws-wrapper-encoder → frame
//! ```

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use hyper::upgrade::Upgraded;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Notify;
use tokio_tungstenite::tungstenite::error::{Error as WsError, ProtocolError};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Role};
use tokio_tungstenite::WebSocketStream;

use crate::dispatch::fault;
use crate::error::MuxError;
use crate::net::ConnectionInfo;
use crate::pipeline::stage::StageEntry;
use crate::ws::codec::{MessageCodec, MessageDecoder, MessageEncoder};
use crate::ws::frames::{FrameAdapter, FrameEvent, WrapperEncoder};
use crate::ws::login::{LoginFactory, SessionStage, LOGIN_STAGE};

/// Shared parts of the frame pipeline, built once at server start.
#[derive(Clone)]
pub struct SessionTemplate {
    codec: Arc<dyn MessageCodec>,
    login: Arc<dyn LoginFactory>,
}

impl SessionTemplate {
    /// Frame stages in chain order, after the handshake.
    pub const LAYOUT: [StageEntry; 5] = [
        StageEntry::shared(FrameAdapter::NAME),
        StageEntry::shared(MessageDecoder::NAME),
        StageEntry::shared(WrapperEncoder::NAME),
        StageEntry::shared(MessageEncoder::NAME),
        StageEntry::per_connection(LOGIN_STAGE),
    ];

    pub fn new(codec: Arc<dyn MessageCodec>, login: Arc<dyn LoginFactory>) -> Self {
        Self { codec, login }
    }

    /// Build the frame session for one connection, including a fresh login stage.
    pub fn instantiate(&self, conn: ConnectionInfo) -> Result<FrameSession, MuxError> {
        let login = self
            .login
            .create(conn.into())
            .map_err(|e| MuxError::Assembly(format!("{LOGIN_STAGE}: {e}")))?;

        Ok(FrameSession {
            conn,
            adapter: FrameAdapter,
            decoder: MessageDecoder::new(Arc::clone(&self.codec)),
            wrapper: WrapperEncoder,
            encoder: MessageEncoder::new(Arc::clone(&self.codec)),
            login,
        })
    }
}

/// Frame pipeline owned by a single connection.
pub struct FrameSession {
    conn: ConnectionInfo,
    adapter: FrameAdapter,
    decoder: MessageDecoder,
    wrapper: WrapperEncoder,
    encoder: MessageEncoder,
    login: Box<dyn SessionStage>,
}

/// Why a session stopped pumping without a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Peer,
    Shutdown,
}

impl FrameSession {
    /// Run on a connection the transport has just upgraded.
    pub async fn run_upgraded(self, upgraded: Upgraded, stop: Arc<Notify>) {
        let ws = WebSocketStream::from_raw_socket(TokioIo::new(upgraded), Role::Server, None).await;
        self.run(ws, stop).await;
    }

    /// Pump frames until the peer closes, a stage fails or `stop` is notified.
    pub async fn run<S>(mut self, mut ws: WebSocketStream<S>, stop: Arc<Notify>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let result = self.pump(&mut ws, &stop).await;
        self.login.on_close();

        let close = match result {
            Ok(SessionEnd::Peer) => None,
            Ok(SessionEnd::Shutdown) => {
                tracing::debug!(
                    connection_id = %self.conn.id,
                    "Closing WebSocket session for shutdown"
                );
                Some(CloseFrame {
                    code: CloseCode::Away,
                    reason: "server shutting down".into(),
                })
            }
            Err(err) => {
                fault::session_fault(&self.conn, &err);
                Some(CloseFrame {
                    code: CloseCode::Error,
                    reason: "internal error".into(),
                })
            }
        };
        // The peer may already be gone.
        let _ = ws.close(close).await;
    }

    async fn pump<S>(
        &mut self,
        ws: &mut WebSocketStream<S>,
        stop: &Notify,
    ) -> Result<SessionEnd, MuxError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let frame = tokio::select! {
                frame = ws.next() => frame,
                _ = stop.notified() => return Ok(SessionEnd::Shutdown),
            };
            let frame = match frame {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => match frame_error(FrameAdapter::NAME, e) {
                    Some(err) => return Err(err),
                    None => break,
                },
                None => break,
            };

            let payload = match self.adapter.inbound(frame) {
                FrameEvent::Payload(payload) => payload,
                FrameEvent::Ignore => continue,
                FrameEvent::Close => break,
            };

            let message = self.decoder.decode(payload)?;
            for reply in self.login.on_message(message).await? {
                let frame = self.wrapper.wrap(self.encoder.encode(reply)?);
                if let Err(e) = ws.send(frame).await {
                    return match frame_error(WrapperEncoder::NAME, e) {
                        Some(err) => Err(err),
                        None => Ok(SessionEnd::Peer),
                    };
                }
            }
        }
        Ok(SessionEnd::Peer)
    }
}

/// Map a WebSocket error onto a fault. `None` means the peer went away.
fn frame_error(stage: &'static str, err: WsError) -> Option<MuxError> {
    match err {
        WsError::ConnectionClosed
        | WsError::AlreadyClosed
        | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => None,
        WsError::Io(e) => Some(MuxError::Io(e)),
        other => Some(MuxError::downstream(stage, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::connection::test_connection;
    use crate::ws::codec::{AppMessage, OpaqueCodec};
    use crate::ws::login::{EchoLoginFactory, SessionInfo};
    use axum::body::Bytes;
    use futures_util::future::BoxFuture;
    use tokio_tungstenite::tungstenite::Message;

    struct FailingLogin;

    impl SessionStage for FailingLogin {
        fn on_message(
            &mut self,
            _message: AppMessage,
        ) -> BoxFuture<'_, Result<Vec<AppMessage>, MuxError>> {
            Box::pin(async { Err(MuxError::downstream(LOGIN_STAGE, "bad credentials store")) })
        }
    }

    struct FailingLoginFactory;

    impl LoginFactory for FailingLoginFactory {
        fn create(&self, _session: SessionInfo) -> Result<Box<dyn SessionStage>, MuxError> {
            Ok(Box::new(FailingLogin))
        }
    }

    type Client = WebSocketStream<tokio::io::DuplexStream>;

    async fn connected_with_stop(template: &SessionTemplate, stop: Arc<Notify>) -> Client {
        let (server_io, client_io) = tokio::io::duplex(64 * 1024);
        let session = template.instantiate(test_connection()).unwrap();
        tokio::spawn(async move {
            let ws = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
            session.run(ws, stop).await;
        });
        WebSocketStream::from_raw_socket(client_io, Role::Client, None).await
    }

    async fn connected(template: &SessionTemplate) -> Client {
        connected_with_stop(template, Arc::new(Notify::new())).await
    }

    #[tokio::test]
    async fn echoes_binary_and_ignores_text() {
        let template = SessionTemplate::new(Arc::new(OpaqueCodec), Arc::new(EchoLoginFactory));
        let mut client = connected(&template).await;

        client.send(Message::Text("ignored".into())).await.unwrap();
        client
            .send(Message::Binary(Bytes::from_static(b"\x02\x00\x01")))
            .await
            .unwrap();

        let reply = client.next().await.unwrap().unwrap();
        assert_eq!(reply, Message::Binary(Bytes::from_static(b"\x02\x00\x01")));

        client.close(None).await.unwrap();
    }

    #[tokio::test]
    async fn login_failure_closes_with_error_code() {
        let template = SessionTemplate::new(Arc::new(OpaqueCodec), Arc::new(FailingLoginFactory));
        let mut client = connected(&template).await;

        client
            .send(Message::Binary(Bytes::from_static(b"login")))
            .await
            .unwrap();

        match client.next().await.unwrap().unwrap() {
            Message::Close(Some(frame)) => assert_eq!(frame.code, CloseCode::Error),
            other => panic!("expected close frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stop_closes_idle_session_with_going_away() {
        let template = SessionTemplate::new(Arc::new(OpaqueCodec), Arc::new(EchoLoginFactory));
        let stop = Arc::new(Notify::new());
        let mut client = connected_with_stop(&template, Arc::clone(&stop)).await;

        stop.notify_one();
        match client.next().await.unwrap().unwrap() {
            Message::Close(Some(frame)) => assert_eq!(frame.code, CloseCode::Away),
            other => panic!("expected close frame, got {other:?}"),
        }
    }

    #[test]
    fn transport_errors_map_to_io_faults() {
        let broken = WsError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
        let err = frame_error(FrameAdapter::NAME, broken).unwrap();
        assert!(matches!(err, MuxError::Io(_)));
        assert!(err.closes_connection());

        assert!(frame_error(FrameAdapter::NAME, WsError::ConnectionClosed).is_none());
        assert!(matches!(
            frame_error(WrapperEncoder::NAME, WsError::Utf8),
            Some(MuxError::Downstream { stage: "ws-wrapper-encoder", .. })
        ));
    }

    #[test]
    fn layout_marks_only_login_per_connection() {
        let per_connection: Vec<_> = SessionTemplate::LAYOUT
            .iter()
            .filter(|entry| entry.lifetime == crate::pipeline::stage::StageLifetime::PerConnection)
            .map(|entry| entry.name)
            .collect();
        assert_eq!(per_connection, vec![LOGIN_STAGE]);
    }
}
