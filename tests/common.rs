#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use fake::{Fake, Faker};
use rabbitmq_named_clients::{
    amqp::{AmqpClient, AmqpTcpEndpoint, ConnectionFactory, ConnectionFactoryConfig},
    stream::{StreamClient, StreamSystemConfig},
    BoxError, Configuration,
};
use tokio::sync::Semaphore;

pub const APPSETTINGS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/appsettings.json");

pub fn appsettings() -> Configuration {
    Configuration::from_json_file(APPSETTINGS).unwrap()
}

pub fn random_name() -> String {
    let suffix: String = Faker.fake();
    format!("registry-{}", suffix)
}

/// Holds constructions back until [`Gate::open`] is called.
#[derive(Clone, Debug)]
pub struct Gate(Arc<Semaphore>);

impl Gate {
    pub fn closed() -> Gate {
        Gate(Arc::new(Semaphore::new(0)))
    }

    pub fn open(&self) {
        self.0.close();
    }

    async fn pass(&self) {
        let _ = self.0.acquire().await;
    }
}

impl Default for Gate {
    fn default() -> Self {
        let gate = Gate::closed();
        gate.open();
        gate
    }
}

/// Counts down pending failures, returns true while some are left.
fn take_failure(failures: &AtomicUsize) -> bool {
    failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[derive(Clone, Debug, Default)]
pub struct TestAmqp {
    pub factories: Arc<AtomicUsize>,
    pub connections: Arc<AtomicUsize>,
    pub connection_failures: Arc<AtomicUsize>,
    pub gate: Gate,
    pub strip_options_name: bool,
}

impl TestAmqp {
    pub fn factories(&self) -> usize {
        self.factories.load(Ordering::SeqCst)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn fail_next_connections(&self, n: usize) {
        self.connection_failures.store(n, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct TestFactory {
    config: ConnectionFactoryConfig,
    client: TestAmqp,
}

#[derive(Debug)]
pub struct TestConnection {
    pub endpoints: Vec<AmqpTcpEndpoint>,
    pub client_provided_name: String,
    pub options_name: Option<String>,
}

impl AmqpClient for TestAmqp {
    type Factory = TestFactory;

    fn connection_factory(
        &self,
        mut config: ConnectionFactoryConfig,
    ) -> Result<Self::Factory, BoxError> {
        self.factories.fetch_add(1, Ordering::SeqCst);
        if self.strip_options_name {
            config.client_properties.clear();
        }
        Ok(TestFactory {
            config,
            client: self.clone(),
        })
    }
}

#[async_trait::async_trait]
impl ConnectionFactory for TestFactory {
    type Connection = TestConnection;

    fn config(&self) -> &ConnectionFactoryConfig {
        &self.config
    }

    async fn create_connection(
        &self,
        endpoints: Vec<AmqpTcpEndpoint>,
        client_provided_name: &str,
    ) -> Result<Self::Connection, BoxError> {
        self.client.connections.fetch_add(1, Ordering::SeqCst);
        self.client.gate.pass().await;
        if take_failure(&self.client.connection_failures) {
            return Err("connection refused".into());
        }
        Ok(TestConnection {
            endpoints,
            client_provided_name: client_provided_name.to_owned(),
            options_name: self.config.options_name().map(str::to_owned),
        })
    }
}

#[derive(Clone, Default)]
pub struct TestStream {
    pub systems: Arc<AtomicUsize>,
    pub failures: Arc<AtomicUsize>,
    pub gate: Gate,
}

impl TestStream {
    pub fn systems(&self) -> usize {
        self.systems.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct TestSystem {
    pub config: StreamSystemConfig,
}

#[async_trait::async_trait]
impl StreamClient for TestStream {
    type System = TestSystem;

    async fn create_system(&self, config: StreamSystemConfig) -> Result<Self::System, BoxError> {
        self.systems.fetch_add(1, Ordering::SeqCst);
        self.gate.pass().await;
        if take_failure(&self.failures) {
            return Err("stream system unreachable".into());
        }
        Ok(TestSystem { config })
    }
}
