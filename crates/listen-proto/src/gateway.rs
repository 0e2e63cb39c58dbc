//! Gateway frames — the JSON messages exchanged over the push connection.
//!
//! Every frame is an object `{ "op": <int>, "d": <object>, "t": <string?> }`.
//! Inbound frames are decoded into [`Frame`]; the only frame this client ever
//! sends is the heartbeat (`{"op":9}`).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server → client: connection accepted, carries the heartbeat period.
pub const OP_WELCOME: i64 = 0;
/// Server → client: a metadata event (track update, queue update, …).
pub const OP_EVENT: i64 = 1;
/// Client → server: keep-alive.
pub const OP_HEARTBEAT: i64 = 9;
/// Server → client: heartbeat acknowledgement.
pub const OP_HEARTBEAT_ACK: i64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("welcome frame has no usable heartbeat interval")]
    MissingHeartbeat,
}

/// Loose shape used only for the first decoding pass.
#[derive(Debug, Deserialize)]
struct RawFrame {
    op: i64,
    #[serde(default)]
    d: Value,
    #[serde(default)]
    t: Option<String>,
}

/// A metadata event, forwarded verbatim to whoever consumes events.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataEvent {
    /// The `t` field, e.g. `TRACK_UPDATE`.
    pub kind: Option<String>,
    /// The untouched `d` payload.
    pub data: Value,
}

/// Decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Welcome { heartbeat: Duration },
    Event(MetadataEvent),
    /// Any op this client does not act on (including heartbeat acks).
    Unknown { op: i64 },
}

impl Frame {
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let raw: RawFrame = serde_json::from_str(text)?;
        match raw.op {
            OP_WELCOME => {
                let ms = raw
                    .d
                    .get("heartbeat")
                    .and_then(Value::as_u64)
                    .filter(|ms| *ms > 0)
                    .ok_or(FrameError::MissingHeartbeat)?;
                Ok(Frame::Welcome {
                    heartbeat: Duration::from_millis(ms),
                })
            }
            OP_EVENT => Ok(Frame::Event(MetadataEvent {
                kind: raw.t,
                data: raw.d,
            })),
            op => Ok(Frame::Unknown { op }),
        }
    }
}

/// Outbound frame. Serialised without the payload fields when they are empty.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundFrame {
    pub op: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

impl OutboundFrame {
    pub fn heartbeat() -> Self {
        Self {
            op: OP_HEARTBEAT,
            d: None,
        }
    }

    pub fn encode(&self) -> String {
        // A struct of an integer and an optional Value cannot fail to serialise.
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"op\":{}}}", self.op))
    }
}
