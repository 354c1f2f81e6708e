use thiserror::Error;

use crate::{
    amqp::{AmqpClient, AmqpTcpEndpoint, ConnectionFactory, ConnectionFactoryConfig},
    stream::{StreamClient, StreamSystemConfig},
    BoxError,
};

/// Fills the protocol slot of a registry that never resolves that protocol.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unsupported;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("No {0} client was supplied to the registry")]
pub struct UnsupportedProtocol(pub &'static str);

/// Factory type of [`Unsupported`], it has no values.
#[derive(Debug)]
pub enum UnsupportedFactory {}

#[derive(Debug)]
pub enum UnsupportedConnection {}

#[derive(Debug)]
pub enum UnsupportedSystem {}

impl AmqpClient for Unsupported {
    type Factory = UnsupportedFactory;

    fn connection_factory(&self, _: ConnectionFactoryConfig) -> Result<Self::Factory, BoxError> {
        Err(Box::new(UnsupportedProtocol("AMQP")))
    }
}

#[async_trait::async_trait]
impl ConnectionFactory for UnsupportedFactory {
    type Connection = UnsupportedConnection;

    fn config(&self) -> &ConnectionFactoryConfig {
        match *self {}
    }

    async fn create_connection(
        &self,
        _: Vec<AmqpTcpEndpoint>,
        _: &str,
    ) -> Result<Self::Connection, BoxError> {
        match *self {}
    }
}

#[async_trait::async_trait]
impl StreamClient for Unsupported {
    type System = UnsupportedSystem;

    async fn create_system(&self, _: StreamSystemConfig) -> Result<Self::System, BoxError> {
        Err(Box::new(UnsupportedProtocol("stream")))
    }
}
