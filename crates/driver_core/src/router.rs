use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use shared::protocol::{InboundFrame, MessageReceived, RocketMessage, MESSAGE_EVENT};

use crate::{correlation::CorrelationTable, registry::SubscriberRegistry};

/// Classifies every inbound frame and routes it: replies resolve pending
/// calls, message notifications fan out to subscribers, anything else is
/// dropped. Frames are handled strictly in the order the transport
/// delivers them.
pub struct EventRouter {
    table: Arc<CorrelationTable>,
    subscribers: Arc<SubscriberRegistry>,
}

impl EventRouter {
    pub fn new(table: Arc<CorrelationTable>, subscribers: Arc<SubscriberRegistry>) -> Self {
        Self { table, subscribers }
    }

    /// Single entry point for the transport's read path. Never fails: a
    /// malformed frame from a third-party server is dropped with a log,
    /// and a bad notification cannot disturb concurrently pending calls.
    pub async fn on_inbound_frame(&self, raw: &str) {
        let frame = match serde_json::from_str::<InboundFrame>(raw) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("dropping unparseable frame: {err}");
                return;
            }
        };

        match frame {
            InboundFrame::Reply(reply) => {
                if !self.table.resolve(&reply.request_id, reply.outcome).await {
                    debug!(
                        request_id = %reply.request_id,
                        "dropping reply for unknown or expired request"
                    );
                }
            }
            InboundFrame::Notification(notification)
                if notification.event_type == MESSAGE_EVENT =>
            {
                match serde_json::from_value::<RocketMessage>(notification.payload) {
                    Ok(message) => {
                        let event = MessageReceived {
                            room_id: message.room_id.clone(),
                            received_at: Utc::now(),
                            message,
                        };
                        self.subscribers.publish(&event).await;
                    }
                    Err(err) => warn!("dropping undecodable message notification: {err}"),
                }
            }
            InboundFrame::Notification(notification) => {
                debug!(event_type = %notification.event_type, "ignoring notification");
            }
            InboundFrame::Unrecognized(_) => {
                debug!("dropping unrecognized frame");
            }
        }
    }
}
