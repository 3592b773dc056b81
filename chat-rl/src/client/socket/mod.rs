use std::time::Duration;

use async_trait::async_trait;
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::error::ClientError;
use super::inbox::Inbox;
use super::models::{ChatMessage, OutgoingEvent};
use super::RealtimeChannel;

pub mod codec;

use codec::{Packet, SocketPacket};

pub const NEW_MESSAGE_EVENT: &str = "new-message";

type WsRead = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;
type ConnectSignal = oneshot::Sender<Result<(), ClientError>>;

/// Maps an http(s) backend url onto its Socket.IO websocket endpoint.
pub fn socket_url(base_url: &str) -> Result<String, ClientError> {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        return Err(ClientError::InvalidUrl(base_url.to_string()));
    };
    Ok(format!("{ws_base}/socket.io/?EIO=4&transport=websocket"))
}

/// A live Socket.IO session on the default namespace.
///
/// Inbound `new-message` events land in the [`Inbox`]; frames are written by
/// a dedicated task so heartbeats and emits never race on the sink.
pub struct SocketConnection {
    outgoing: mpsc::UnboundedSender<String>,
    reader: JoinHandle<()>,
    writer: Option<JoinHandle<()>>,
}

impl SocketConnection {
    pub async fn connect(
        base_url: &str,
        inbox: Inbox,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let url = socket_url(base_url)?;
        let (stream, _) = tokio::time::timeout(timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| ClientError::Timeout("websocket handshake"))??;
        let (mut write, read) = stream.split();

        let (outgoing, mut frames) = mpsc::unbounded_channel::<String>();
        let writer = tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                if let Err(err) = write.send(Message::Text(frame)).await {
                    warn!(error = %err, "socket write failed");
                    break;
                }
            }
            let _ = write.close().await;
        });

        let (connected_tx, connected_rx) = oneshot::channel();
        let reader = tokio::spawn(read_loop(read, outgoing.clone(), inbox, connected_tx));

        let connection = SocketConnection {
            outgoing,
            reader,
            writer: Some(writer),
        };
        match tokio::time::timeout(timeout, connected_rx).await {
            Ok(Ok(Ok(()))) => {
                info!(url = %url, "socket.io connected");
                Ok(connection)
            }
            Ok(Ok(Err(err))) => Err(err),
            Ok(Err(_)) => Err(ClientError::ChannelClosed),
            Err(_) => Err(ClientError::Timeout("socket.io namespace connect")),
        }
    }

    fn send_frame(&self, packet: &Packet) -> Result<(), ClientError> {
        self.outgoing
            .send(codec::encode(packet))
            .map_err(|_| ClientError::ChannelClosed)
    }
}

#[async_trait]
impl RealtimeChannel for SocketConnection {
    async fn emit(&mut self, event: OutgoingEvent) -> Result<(), ClientError> {
        debug!(event = event.name(), "emit");
        self.send_frame(&Packet::event(event.name(), event.payload()))
    }

    async fn disconnect(&mut self) -> Result<(), ClientError> {
        let sent = self.send_frame(&Packet::Message(SocketPacket::Disconnect));
        self.reader.abort();
        // Once every sender is gone the writer flushes and closes the websocket.
        let (closed, _) = mpsc::unbounded_channel();
        drop(std::mem::replace(&mut self.outgoing, closed));
        if let Some(writer) = self.writer.take() {
            if tokio::time::timeout(Duration::from_secs(1), writer).await.is_err() {
                warn!("socket writer did not finish in time");
            }
        }
        sent
    }
}

impl Drop for SocketConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(
    mut read: WsRead,
    outgoing: mpsc::UnboundedSender<String>,
    inbox: Inbox,
    connected: ConnectSignal,
) {
    let mut connected = Some(connected);
    let mut signal = |result: Result<(), ClientError>| {
        if let Some(tx) = connected.take() {
            let _ = tx.send(result);
        }
    };

    while let Some(frame) = read.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                warn!(error = %err, "socket read failed");
                signal(Err(ClientError::WebSocket(err)));
                return;
            }
        };

        let packet = match codec::decode(&text) {
            Ok(packet) => packet,
            Err(err) => {
                warn!(error = %err, frame = %text, "dropping undecodable frame");
                continue;
            }
        };

        match packet {
            Packet::Open(handshake) => {
                debug!(sid = %handshake.sid, "engine.io open");
                let connect = codec::encode(&Packet::Message(SocketPacket::Connect(None)));
                if outgoing.send(connect).is_err() {
                    break;
                }
            }
            Packet::Ping => {
                if outgoing.send(codec::encode(&Packet::Pong)).is_err() {
                    break;
                }
            }
            Packet::Message(SocketPacket::Connect(_)) => signal(Ok(())),
            Packet::Message(SocketPacket::ConnectError(data)) => {
                signal(Err(ClientError::Rejected(data.to_string())));
                return;
            }
            Packet::Message(SocketPacket::Event { name, data }) if name == NEW_MESSAGE_EVENT => {
                match serde_json::from_value::<ChatMessage>(data) {
                    Ok(message) => inbox.push(message),
                    Err(err) => warn!(error = %err, "malformed new-message payload"),
                }
            }
            Packet::Message(SocketPacket::Event { name, .. }) => {
                debug!(event = %name, "ignoring event");
            }
            Packet::Message(SocketPacket::Disconnect) | Packet::Close => break,
            _ => {}
        }
    }

    signal(Err(ClientError::ChannelClosed));
    debug!("socket reader finished");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_url() {
        assert_eq!(
            socket_url("http://localhost:3001/").unwrap(),
            "ws://localhost:3001/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            socket_url("https://chat.example.com").unwrap(),
            "wss://chat.example.com/socket.io/?EIO=4&transport=websocket"
        );
        assert!(matches!(
            socket_url("localhost:3001"),
            Err(ClientError::InvalidUrl(_))
        ));
    }
}
