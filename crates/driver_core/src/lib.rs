use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use shared::{
    domain::{MessageId, RoomId},
    error::{DriverError, MethodResult},
    protocol::{wire_date, LoadMessagesResult, MessageReceived, RocketMessage},
};

pub mod correlation;
pub mod dispatcher;
pub mod registry;
pub mod router;
pub mod transport;

pub use correlation::CorrelationTable;
pub use dispatcher::{CommandDispatcher, DEFAULT_CALL_TIMEOUT};
pub use registry::{SubscriberRegistry, SubscriptionToken};
pub use router::EventRouter;
pub use transport::{MissingTransport, Transport};

pub const DEFAULT_HISTORY_LIMIT: u32 = 20;
pub const DEFAULT_SEARCH_LIMIT: u32 = 100;

/// Optional filters for history loads. `end` and `ls` are passed to the
/// server verbatim; their exact interaction with `limit` is a server-side
/// detail, and unset `end` means "most recent".
#[derive(Debug, Clone, Default)]
pub struct HistoryOptions {
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub ls: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OutboundAttachment {
    pub text: String,
    pub author_name: String,
    pub room_id: RoomId,
    pub timestamp: Option<DateTime<Utc>>,
    pub icon: Option<String>,
}

/// Typed operation surface over one realtime connection. Construct it
/// around a [`Transport`], wire the transport's read loop into
/// [`RocketDriver::on_inbound_frame`], and every method call below is an
/// independent in-flight request.
pub struct RocketDriver {
    dispatcher: CommandDispatcher,
    router: EventRouter,
    subscribers: Arc<SubscriberRegistry>,
    call_timeout: Duration,
}

impl RocketDriver {
    pub fn new(transport: Arc<dyn Transport>) -> Arc<Self> {
        Self::with_call_timeout(transport, DEFAULT_CALL_TIMEOUT)
    }

    pub fn with_call_timeout(transport: Arc<dyn Transport>, call_timeout: Duration) -> Arc<Self> {
        let table = Arc::new(CorrelationTable::new());
        let subscribers = Arc::new(SubscriberRegistry::new());
        let router = EventRouter::new(Arc::clone(&table), Arc::clone(&subscribers));
        Arc::new(Self {
            dispatcher: CommandDispatcher::new(table, transport),
            router,
            subscribers,
            call_timeout,
        })
    }

    /// Feed one raw frame from the transport's read loop.
    pub async fn on_inbound_frame(&self, raw: &str) {
        self.router.on_inbound_frame(raw).await;
    }

    pub async fn subscribe_messages<F>(&self, callback: F) -> SubscriptionToken
    where
        F: Fn(&MessageReceived) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribers.subscribe(callback).await
    }

    pub async fn unsubscribe_messages(&self, token: SubscriptionToken) -> bool {
        self.subscribers.unsubscribe(token).await
    }

    pub async fn send_message(&self, text: &str, room_id: &RoomId) -> MethodResult<RocketMessage> {
        let reply = self
            .call("sendMessage", vec![json!({ "rid": room_id, "msg": text })])
            .await?;
        decode_reply(reply)
    }

    pub async fn update_message(
        &self,
        message_id: &MessageId,
        room_id: &RoomId,
        new_text: &str,
    ) -> MethodResult<()> {
        self.call(
            "updateMessage",
            vec![json!({ "_id": message_id, "rid": room_id, "msg": new_text })],
        )
        .await?;
        Ok(())
    }

    /// Load room history, newest first. The limit defaults to
    /// [`DEFAULT_HISTORY_LIMIT`].
    pub async fn load_messages(
        &self,
        room_id: &RoomId,
        options: HistoryOptions,
    ) -> MethodResult<LoadMessagesResult> {
        let end = options
            .end
            .as_ref()
            .map(wire_date::to_value)
            .unwrap_or(Value::Null);
        let limit = options.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        let ls = options.ls.map(Value::String).unwrap_or(Value::Null);

        let reply = self
            .call("loadHistory", vec![json!(room_id), end, json!(limit), ls])
            .await?;
        let mut result: LoadMessagesResult = decode_reply(reply)?;
        sort_newest_first(&mut result);
        Ok(result)
    }

    pub async fn delete_message(
        &self,
        message_id: &MessageId,
        room_id: &RoomId,
    ) -> MethodResult<()> {
        self.call(
            "deleteMessage",
            vec![json!({ "_id": message_id, "rid": room_id })],
        )
        .await?;
        Ok(())
    }

    /// Create a direct-message room with `username` and return its id.
    pub async fn create_private_message(&self, username: &str) -> MethodResult<RoomId> {
        let reply = self
            .call("createDirectMessage", vec![json!(username)])
            .await?;
        let created: CreatedRoom = decode_reply(reply)?;
        Ok(RoomId(created.rid))
    }

    /// Search messages in a room. The limit defaults to
    /// [`DEFAULT_SEARCH_LIMIT`]. Queries may use server operators such as
    /// `from:` and `mention:`.
    pub async fn search_messages(
        &self,
        query: &str,
        room_id: &RoomId,
        limit: Option<u32>,
    ) -> MethodResult<LoadMessagesResult> {
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        let reply = self
            .call(
                "messageSearch",
                vec![json!(query), json!(room_id), json!(limit)],
            )
            .await?;
        let mut result: LoadMessagesResult = decode_reply(reply)?;
        sort_newest_first(&mut result);
        Ok(result)
    }

    /// Forward a reaction toggle. Setting the same reaction twice removes
    /// it again; the toggle lives on the server, the client sends the
    /// identical request both times.
    pub async fn set_reaction(&self, reaction: &str, message_id: &MessageId) -> MethodResult<()> {
        self.call("setReaction", vec![json!(reaction), json!(message_id)])
            .await?;
        Ok(())
    }

    pub async fn pin_message(
        &self,
        message_id: &MessageId,
        username: &str,
    ) -> MethodResult<RocketMessage> {
        let reply = self
            .call(
                "pinMessage",
                vec![json!({ "_id": message_id, "username": username })],
            )
            .await?;
        decode_reply(reply)
    }

    pub async fn unpin_message(&self, message_id: &MessageId, username: &str) -> MethodResult<()> {
        self.call(
            "unpinMessage",
            vec![json!({ "_id": message_id, "username": username })],
        )
        .await?;
        Ok(())
    }

    pub async fn send_attachment(
        &self,
        attachment: OutboundAttachment,
    ) -> MethodResult<RocketMessage> {
        let mut payload = json!({
            "rid": attachment.room_id,
            "msg": attachment.text,
            "alias": attachment.author_name,
        });
        if let Some(ts) = attachment.timestamp.as_ref() {
            payload["ts"] = wire_date::to_value(ts);
        }
        if let Some(icon) = attachment.icon {
            payload["avatar"] = Value::String(icon);
        }

        let reply = self.call("sendMessage", vec![payload]).await?;
        decode_reply(reply)
    }

    async fn call(&self, operation: &str, args: Vec<Value>) -> MethodResult<Value> {
        self.dispatcher.call(operation, args, self.call_timeout).await
    }
}

#[derive(serde::Deserialize)]
struct CreatedRoom {
    rid: String,
}

fn decode_reply<T: DeserializeOwned>(value: Value) -> MethodResult<T> {
    serde_json::from_value(value).map_err(|err| DriverError::Decode(err.to_string()))
}

fn sort_newest_first(result: &mut LoadMessagesResult) {
    result.messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
