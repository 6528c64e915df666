use async_trait::async_trait;
use log::info;

use super::Transport;
use crate::error::TransportError;

/// Logs messages instead of delivering them. Useful for local runs.
#[derive(Debug, Clone, Default)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), TransportError> {
        info!("Sending email to {}: {} ({} bytes)", to, subject, html.len());
        Ok(())
    }
}
