use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::protocol::RequestFrame;

/// Outbound seam to the connection layer. The transport owns the socket,
/// authentication, reconnects and keep-alive; this driver only hands it
/// fully built request frames and consumes whatever frames it reads back
/// through [`crate::RocketDriver::on_inbound_frame`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_request(&self, frame: &RequestFrame) -> Result<()>;
}

pub struct MissingTransport;

#[async_trait]
impl Transport for MissingTransport {
    async fn send_request(&self, frame: &RequestFrame) -> Result<()> {
        Err(anyhow!(
            "transport is unavailable for request {}",
            frame.request_id
        ))
    }
}
