//! Seam towards the AMQP 0-9-1 client library.
//!
//! The registry never speaks the wire protocol itself: it turns named
//! [`ConnectionOptions`](crate::ConnectionOptions) into a
//! [`ConnectionFactoryConfig`] and lets an [`AmqpClient`] build the factory
//! and the connections.

mod config;

pub use config::{AmqpTcpEndpoint, ConnectionFactoryConfig};

use crate::BoxError;

/// Entry point of the wrapped AMQP library.
pub trait AmqpClient: Send + Sync + 'static {
    type Factory: ConnectionFactory;

    fn connection_factory(&self, config: ConnectionFactoryConfig) -> Result<Self::Factory, BoxError>;
}

#[async_trait::async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    type Connection: Send + Sync + 'static;

    /// Configuration the factory was built from.
    fn config(&self) -> &ConnectionFactoryConfig;

    /// Opens a connection to the first reachable endpoint.
    async fn create_connection(
        &self,
        endpoints: Vec<AmqpTcpEndpoint>,
        client_provided_name: &str,
    ) -> Result<Self::Connection, BoxError>;
}

/// Connection type produced by the factories of `A`.
pub type AmqpConnection<A> = <<A as AmqpClient>::Factory as ConnectionFactory>::Connection;
