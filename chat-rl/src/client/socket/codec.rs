//! Text framing for Socket.IO (protocol 5) carried over Engine.IO (protocol 4).
//!
//! Every websocket text frame starts with a single Engine.IO packet type
//! digit. Engine.IO `message` frames wrap a Socket.IO packet, which again
//! starts with a type digit, followed by an optional namespace, an optional
//! ack id and a JSON payload.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("empty frame")]
    Empty,
    #[error("unknown engine.io packet type {0:?}")]
    UnknownEnginePacket(char),
    #[error("unknown socket.io packet type {0:?}")]
    UnknownSocketPacket(char),
    #[error("malformed payload: {0}")]
    Payload(String),
}

/// Handshake data sent by the server in the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, data: Value },
    Ack { id: u64, data: Value },
    ConnectError(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Upgrade,
    Noop,
}

impl Packet {
    pub fn event(name: &str, data: Value) -> Self {
        Packet::Message(SocketPacket::Event {
            name: name.to_string(),
            data,
        })
    }
}

pub fn encode(packet: &Packet) -> String {
    match packet {
        Packet::Open(handshake) => format!(
            "0{}",
            serde_json::json!({
                "sid": handshake.sid,
                "pingInterval": handshake.ping_interval,
                "pingTimeout": handshake.ping_timeout,
            })
        ),
        Packet::Close => "1".to_string(),
        Packet::Ping => "2".to_string(),
        Packet::Pong => "3".to_string(),
        Packet::Message(inner) => format!("4{}", encode_socket(inner)),
        Packet::Upgrade => "5".to_string(),
        Packet::Noop => "6".to_string(),
    }
}

fn encode_socket(packet: &SocketPacket) -> String {
    match packet {
        SocketPacket::Connect(None) => "0".to_string(),
        SocketPacket::Connect(Some(auth)) => format!("0{auth}"),
        SocketPacket::Disconnect => "1".to_string(),
        SocketPacket::Event { name, data } => {
            format!("2{}", Value::Array(vec![Value::String(name.clone()), data.clone()]))
        }
        SocketPacket::Ack { id, data } => format!("3{id}{}", Value::Array(vec![data.clone()])),
        SocketPacket::ConnectError(data) => format!("4{data}"),
    }
}

pub fn decode(frame: &str) -> Result<Packet, CodecError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let rest = chars.as_str();
    match kind {
        '0' => serde_json::from_str(rest)
            .map(Packet::Open)
            .map_err(|e| CodecError::Payload(e.to_string())),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_socket(rest).map(Packet::Message),
        '5' => Ok(Packet::Upgrade),
        '6' => Ok(Packet::Noop),
        other => Err(CodecError::UnknownEnginePacket(other)),
    }
}

fn decode_socket(body: &str) -> Result<SocketPacket, CodecError> {
    let mut chars = body.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let rest = skip_namespace(chars.as_str());
    match kind {
        '0' => {
            if rest.is_empty() {
                Ok(SocketPacket::Connect(None))
            } else {
                parse_json(rest).map(|v| SocketPacket::Connect(Some(v)))
            }
        }
        '1' => Ok(SocketPacket::Disconnect),
        '2' => {
            let (_, payload) = split_ack_id(rest);
            let mut items = match parse_json(payload)? {
                Value::Array(items) => items.into_iter(),
                other => return Err(CodecError::Payload(format!("expected array, got {other}"))),
            };
            let name = match items.next() {
                Some(Value::String(name)) => name,
                _ => return Err(CodecError::Payload("event without a name".to_string())),
            };
            let data = items.next().unwrap_or(Value::Null);
            Ok(SocketPacket::Event { name, data })
        }
        '3' => {
            let (id, payload) = split_ack_id(rest);
            let id = id.ok_or_else(|| CodecError::Payload("ack without id".to_string()))?;
            let data = match parse_json(payload)? {
                Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
                Value::Array(_) => Value::Null,
                other => other,
            };
            Ok(SocketPacket::Ack { id, data })
        }
        '4' => parse_json(rest).map(SocketPacket::ConnectError),
        other => Err(CodecError::UnknownSocketPacket(other)),
    }
}

// Namespaces other than "/" are written as "/name," before the payload.
fn skip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        match body.find(',') {
            Some(idx) => &body[idx + 1..],
            None => "",
        }
    } else {
        body
    }
}

fn split_ack_id(body: &str) -> (Option<u64>, &str) {
    let digits = body.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return (None, body);
    }
    (body[..digits].parse().ok(), &body[digits..])
}

fn parse_json(body: &str) -> Result<Value, CodecError> {
    serde_json::from_str(body).map_err(|e| CodecError::Payload(e.to_string()))
}
