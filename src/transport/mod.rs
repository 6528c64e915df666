use async_trait::async_trait;

use crate::error::TransportError;

pub mod logging;
pub mod relay;

pub use logging::LogTransport;
pub use relay::RelayTransport;

/// Outbound delivery of a rendered notification.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), TransportError>;
}
