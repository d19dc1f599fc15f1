use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{MessageId, RoomId, UserId},
    error::ServerFailure,
};

/// Realtime timestamps travel as `{"$date": <unix millis>}`.
pub mod wire_date {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(serde::Serialize, Deserialize)]
    struct WireDate {
        #[serde(rename = "$date")]
        millis: i64,
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(
            &WireDate {
                millis: ts.timestamp_millis(),
            },
            serializer,
        )
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let wire = WireDate::deserialize(deserializer)?;
        Utc.timestamp_millis_opt(wire.millis)
            .single()
            .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", wire.millis)))
    }

    pub fn to_value(ts: &DateTime<Utc>) -> serde_json::Value {
        serde_json::json!({ "$date": ts.timestamp_millis() })
    }
}

/// One outbound method call, handed to the transport as-is. The request id
/// is generated by the dispatcher and echoed back in the matching reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFrame {
    pub request_id: String,
    pub operation: String,
    pub args: Vec<Value>,
}

/// One inbound frame from the transport. Replies carry `requestId` +
/// `outcome`; notifications carry `eventType` + `payload`. Anything else is
/// kept opaque so the router can drop it without failing.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InboundFrame {
    Reply(ReplyFrame),
    Notification(NotificationFrame),
    Unrecognized(Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyFrame {
    pub request_id: String,
    pub outcome: ReplyOutcome,
}

#[derive(Debug, Clone, Deserialize)]
pub enum ReplyOutcome {
    #[serde(rename = "result")]
    Result(Value),
    #[serde(rename = "error")]
    Error(ServerFailure),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFrame {
    pub event_type: String,
    pub payload: Value,
}

/// Event type under which the server streams new room messages.
pub const MESSAGE_EVENT: &str = "stream-room-messages";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub usernames: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A chat message as the server represents it. Immutable once decoded; the
/// message id is the sole key for edit/delete/pin/reaction operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocketMessage {
    #[serde(rename = "_id")]
    pub message_id: MessageId,
    #[serde(rename = "rid")]
    pub room_id: RoomId,
    #[serde(rename = "u")]
    pub author: Author,
    #[serde(rename = "msg")]
    pub text: String,
    #[serde(rename = "ts", with = "wire_date")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactions: Option<HashMap<String, Reaction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
}

/// Result of a history load or search: messages newest first, plus the
/// total count when the server reports one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadMessagesResult {
    #[serde(default)]
    pub messages: Vec<RocketMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Fan-out value delivered to message subscribers. `received_at` is stamped
/// when the notification is decoded, not by the server.
#[derive(Debug, Clone)]
pub struct MessageReceived {
    pub message: RocketMessage,
    pub room_id: RoomId,
    pub received_at: DateTime<Utc>,
}
