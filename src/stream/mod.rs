//! Seam towards the RabbitMQ stream protocol client.

mod config;

pub use config::{DnsEndpoint, StreamSystemConfig};

use crate::BoxError;

/// Entry point of the wrapped stream library.
#[async_trait::async_trait]
pub trait StreamClient: Send + Sync + 'static {
    type System: Send + Sync + 'static;

    /// Connects a stream system, typically opening the locator connections.
    async fn create_system(&self, config: StreamSystemConfig) -> Result<Self::System, BoxError>;
}
