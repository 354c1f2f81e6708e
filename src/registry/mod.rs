mod blocking;
mod builder;

pub use builder::RegistryBuilder;

use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use tracing::{debug, trace};

use crate::{
    amqp::{AmqpClient, AmqpConnection, AmqpTcpEndpoint, ConnectionFactory, ConnectionFactoryConfig},
    constants::OPTIONS_NAME_PROPERTY,
    error::{RegistryError, Role},
    options::ConnectionOptions,
    single_flight::SingleFlight,
    store::OptionsStore,
    stream::{StreamClient, StreamSystemConfig},
    unsupported::Unsupported,
    RegistryResult,
};

/// Resolves named options, connection factories, connections and stream
/// systems.
///
/// Every object is constructed on first request and then shared by all
/// callers asking for the same name. Cloning is cheap, clones share the
/// constructed objects.
pub struct Registry<A = Unsupported, S = Unsupported>
where
    A: AmqpClient,
    S: StreamClient,
{
    inner: Arc<RegistryInner<A, S>>,
}

struct RegistryInner<A: AmqpClient, S: StreamClient> {
    amqp: A,
    stream: S,
    options: OptionsStore,
    factories: HashMap<String, String>,
    connections: HashMap<String, String>,
    stream_systems: HashMap<String, String>,
    construction_timeout: Option<Duration>,
    factory_cache: SingleFlight<Arc<A::Factory>>,
    connection_cache: SingleFlight<Arc<AmqpConnection<A>>>,
    stream_system_cache: SingleFlight<Arc<S::System>>,
}

impl<A: AmqpClient, S: StreamClient> Clone for Registry<A, S> {
    fn clone(&self) -> Self {
        Registry {
            inner: self.inner.clone(),
        }
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }
}

impl<A: AmqpClient, S: StreamClient> Registry<A, S> {
    /// Validated options registered under `name`.
    pub fn options(&self, name: &str) -> RegistryResult<Arc<ConnectionOptions>> {
        self.inner.options.get(name)
    }

    /// The wrapped AMQP client.
    pub fn amqp_client(&self) -> &A {
        &self.inner.amqp
    }

    pub fn stream_client(&self) -> &S {
        &self.inner.stream
    }

    pub async fn connection_factory(&self, name: &str) -> RegistryResult<Arc<A::Factory>> {
        if let Some(factory) = self.inner.factory_cache.get(name) {
            trace!(name, "connection factory served from cache");
            return Ok(factory);
        }
        let options_name = self
            .inner
            .factories
            .get(name)
            .ok_or_else(|| RegistryError::UnknownFactory(name.to_owned()))?
            .clone();

        let this = self.clone();
        let factory_name = name.to_owned();
        self.inner
            .factory_cache
            .get_or_try_init(name, move || async move {
                this.bounded(Role::ConnectionFactory, &factory_name, async {
                    let options = this.inner.options.get(&options_name)?;
                    debug!(name = %factory_name, options_name = %options_name, "creating connection factory");
                    let config = ConnectionFactoryConfig::from_options(&options_name, &options);
                    let factory = this
                        .inner
                        .amqp
                        .connection_factory(config)
                        .map_err(RegistryError::construction)?;
                    debug!(name = %factory_name, "connection factory created");
                    Ok::<_, RegistryError>(Arc::new(factory))
                })
                .await
            })
            .await
    }

    /// Connection registered under `name`, opened with the factory it
    /// references and the options that factory was built from.
    pub async fn connection(&self, name: &str) -> RegistryResult<Arc<AmqpConnection<A>>> {
        if let Some(connection) = self.inner.connection_cache.get(name) {
            trace!(name, "connection served from cache");
            return Ok(connection);
        }
        let factory_name = self
            .inner
            .connections
            .get(name)
            .ok_or_else(|| RegistryError::UnknownConnection(name.to_owned()))?
            .clone();

        let this = self.clone();
        let connection_name = name.to_owned();
        self.inner
            .connection_cache
            .get_or_try_init(name, move || async move {
                let factory = this.connection_factory(&factory_name).await?;
                this.bounded(Role::Connection, &connection_name, async {
                    let options_name = factory.config().options_name().ok_or_else(|| {
                        RegistryError::MissingOptionsMarker {
                            factory: factory_name.clone(),
                            key: OPTIONS_NAME_PROPERTY,
                        }
                    })?;
                    let options = this.inner.options.get(options_name)?;
                    let endpoints = AmqpTcpEndpoint::from_options(&options);
                    debug!(
                        name = %connection_name,
                        factory_name = %factory_name,
                        endpoints = endpoints.len(),
                        "opening connection"
                    );
                    let connection = factory
                        .create_connection(endpoints, options.client_provided_name_or_default())
                        .await
                        .map_err(RegistryError::construction)?;
                    debug!(name = %connection_name, "connection opened");
                    Ok::<_, RegistryError>(Arc::new(connection))
                })
                .await
            })
            .await
    }

    pub async fn stream_system(&self, name: &str) -> RegistryResult<Arc<S::System>> {
        if let Some(system) = self.inner.stream_system_cache.get(name) {
            trace!(name, "stream system served from cache");
            return Ok(system);
        }
        let options_name = self
            .inner
            .stream_systems
            .get(name)
            .ok_or_else(|| RegistryError::UnknownStreamSystem(name.to_owned()))?
            .clone();

        let this = self.clone();
        let system_name = name.to_owned();
        self.inner
            .stream_system_cache
            .get_or_try_init(name, move || async move {
                this.bounded(Role::StreamSystem, &system_name, async {
                    let options = this.inner.options.get(&options_name)?;
                    let config = StreamSystemConfig::from_options(&options_name, &options);
                    debug!(
                        name = %system_name,
                        options_name = %options_name,
                        endpoints = config.endpoints.len(),
                        "creating stream system"
                    );
                    let system = this
                        .inner
                        .stream
                        .create_system(config)
                        .await
                        .map_err(RegistryError::construction)?;
                    debug!(name = %system_name, "stream system created");
                    Ok::<_, RegistryError>(Arc::new(system))
                })
                .await
            })
            .await
    }

    /// Blocking form of [`Registry::connection_factory`].
    pub fn connection_factory_blocking(&self, name: &str) -> RegistryResult<Arc<A::Factory>> {
        blocking::block_on(self.connection_factory(name))?
    }

    /// Blocking form of [`Registry::connection`].
    ///
    /// Must not be called from a current-thread runtime.
    pub fn connection_blocking(&self, name: &str) -> RegistryResult<Arc<AmqpConnection<A>>> {
        blocking::block_on(self.connection(name))?
    }

    /// Blocking form of [`Registry::stream_system`].
    pub fn stream_system_blocking(&self, name: &str) -> RegistryResult<Arc<S::System>> {
        blocking::block_on(self.stream_system(name))?
    }

    async fn bounded<T>(
        &self,
        role: Role,
        name: &str,
        construction: impl Future<Output = RegistryResult<T>>,
    ) -> RegistryResult<T> {
        match self.inner.construction_timeout {
            Some(timeout) => tokio::time::timeout(timeout, construction)
                .await
                .map_err(|_| RegistryError::Timeout {
                    role,
                    name: name.to_owned(),
                    timeout,
                })?,
            None => construction.await,
        }
    }
}
