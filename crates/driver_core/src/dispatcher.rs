use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time;
use tracing::{debug, warn};
use uuid::Uuid;

use shared::{
    error::{DriverError, MethodResult},
    protocol::{ReplyOutcome, RequestFrame},
};

use crate::{correlation::CorrelationTable, transport::Transport};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Issues method calls over the transport and suspends each caller until
/// its correlated reply arrives or the timeout elapses. Calls are fully
/// independent; nothing here blocks the inbound frame path.
pub struct CommandDispatcher {
    table: Arc<CorrelationTable>,
    transport: Arc<dyn Transport>,
}

impl CommandDispatcher {
    pub fn new(table: Arc<CorrelationTable>, transport: Arc<dyn Transport>) -> Self {
        Self { table, transport }
    }

    /// Issue one method call and wait for its correlated reply.
    ///
    /// A timeout drops the pending entry but does not cancel the remote
    /// effect: the server may still apply the operation, and its late
    /// reply is then discarded with a non-fatal log.
    pub async fn call(
        &self,
        operation: &str,
        args: Vec<Value>,
        timeout: Duration,
    ) -> MethodResult<Value> {
        let request_id = Uuid::new_v4().to_string();
        let mut rx = self.table.register(&request_id).await?;

        let frame = RequestFrame {
            request_id: request_id.clone(),
            operation: operation.to_string(),
            args,
        };
        if let Err(err) = self.transport.send_request(&frame).await {
            self.table.cancel(&request_id).await;
            return Err(DriverError::Transport(err.to_string()));
        }

        match time::timeout(timeout, &mut rx).await {
            Ok(Ok(outcome)) => into_result(outcome),
            Ok(Err(_closed)) => {
                warn!(request_id = %request_id, operation, "pending entry dropped before resolution");
                Err(DriverError::Transport(
                    "pending reply channel closed".to_string(),
                ))
            }
            Err(_elapsed) => {
                if self.table.cancel(&request_id).await {
                    debug!(request_id = %request_id, operation, "call timed out");
                    Err(DriverError::Timeout(timeout))
                } else {
                    // The reply reached the table first; it wins the race.
                    match rx.try_recv() {
                        Ok(outcome) => into_result(outcome),
                        Err(_) => Err(DriverError::Timeout(timeout)),
                    }
                }
            }
        }
    }
}

fn into_result(outcome: ReplyOutcome) -> MethodResult<Value> {
    match outcome {
        ReplyOutcome::Result(value) => Ok(value),
        ReplyOutcome::Error(failure) => Err(failure.into()),
    }
}
