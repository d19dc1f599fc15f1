use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use shared::protocol::MessageReceived;

pub type MessageCallback = Arc<dyn Fn(&MessageReceived) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

/// Ordered set of message-arrival callbacks. Fan-out works against a
/// snapshot taken at `publish` entry, so subscribe/unsubscribe during an
/// in-flight delivery never faults: additions miss that event, removals
/// may still see it.
pub struct SubscriberRegistry {
    next_token: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionToken, MessageCallback)>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            next_token: AtomicU64::new(1),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub async fn subscribe<F>(&self, callback: F) -> SubscriptionToken
    where
        F: Fn(&MessageReceived) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let token = SubscriptionToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().await.push((token, Arc::new(callback)));
        token
    }

    pub async fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut subscribers = self.subscribers.lock().await;
        let before = subscribers.len();
        subscribers.retain(|(candidate, _)| *candidate != token);
        subscribers.len() != before
    }

    /// Deliver one event to every subscriber registered when the call
    /// starts. A failing callback is logged and does not stop fan-out.
    pub async fn publish(&self, event: &MessageReceived) {
        let snapshot: Vec<MessageCallback> = {
            let subscribers = self.subscribers.lock().await;
            subscribers
                .iter()
                .map(|(_, callback)| Arc::clone(callback))
                .collect()
        };

        for callback in snapshot {
            if let Err(err) = callback(event) {
                warn!(
                    message_id = %event.message.message_id,
                    "message subscriber failed: {err}"
                );
            }
        }
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}
