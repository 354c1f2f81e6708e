use std::{collections::HashMap, sync::Arc, time::Duration};

use tracing::debug;

use super::{Registry, RegistryInner};
use crate::{
    amqp::AmqpClient,
    configuration::Configuration,
    constants::DEFAULT_NAME,
    error::RegistryError,
    options::ConnectionOptions,
    single_flight::SingleFlight,
    source::{ConfigureAction, OptionsBuilder, OptionsSource},
    store::OptionsStore,
    stream::StreamClient,
    unsupported::Unsupported,
    validator::{ConnectionOptionsValidator, OptionsValidator},
    RegistryResult,
};

/// Collects named registrations, see [`Registry::builder`].
pub struct RegistryBuilder {
    configuration: Configuration,
    shared: Vec<ConfigureAction>,
    options: HashMap<String, OptionsBuilder>,
    validators: Vec<Arc<dyn OptionsValidator>>,
    factories: HashMap<String, String>,
    connections: HashMap<String, String>,
    stream_systems: HashMap<String, String>,
    construction_timeout: Option<Duration>,
    misuse: Option<RegistryError>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        RegistryBuilder {
            configuration: Configuration::default(),
            shared: Vec::new(),
            options: HashMap::new(),
            validators: vec![Arc::new(ConnectionOptionsValidator)],
            factories: HashMap::new(),
            connections: HashMap::new(),
            stream_systems: HashMap::new(),
            construction_timeout: None,
            misuse: None,
        }
    }
}

impl RegistryBuilder {
    pub fn new() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Configuration tree section paths are resolved against.
    pub fn configuration(mut self, configuration: Configuration) -> RegistryBuilder {
        self.configuration = configuration;
        self
    }

    /// Runs `configure` on every named options before its own actions.
    pub fn configure_all<F>(mut self, configure: F) -> RegistryBuilder
    where
        F: Fn(&mut ConnectionOptions) + Send + Sync + 'static,
    {
        self.shared.push(ConfigureAction::Configure(Arc::new(configure)));
        self
    }

    /// Adds a validator that runs after the built-in endpoint rule.
    pub fn validator(mut self, validator: impl OptionsValidator + 'static) -> RegistryBuilder {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Upper bound for a single construction of a factory, connection or
    /// stream system.
    pub fn construction_timeout(mut self, timeout: Duration) -> RegistryBuilder {
        self.construction_timeout = Some(timeout);
        self
    }

    /// Registers connection options under `name`. Registering the same name
    /// again appends to the existing actions.
    pub fn add_connection_options(
        mut self,
        name: &str,
        source: impl Into<OptionsSource>,
    ) -> RegistryBuilder {
        if !self.check_name("name", name) {
            return self;
        }
        let builder = source.into().into_builder();
        debug!(name, "connection options registered");
        self.options.entry(name.to_owned()).or_default().merge(builder);
        self
    }

    pub fn add_default_connection_options(self, source: impl Into<OptionsSource>) -> RegistryBuilder {
        self.add_connection_options(DEFAULT_NAME, source)
    }

    /// Registers options and a connection factory built from them, both
    /// under `name`.
    pub fn add_connection_factory(
        self,
        name: &str,
        source: impl Into<OptionsSource>,
    ) -> RegistryBuilder {
        self.add_connection_options(name, source)
            .add_connection_factory_from_options(name, name)
    }

    pub fn add_default_connection_factory(self, source: impl Into<OptionsSource>) -> RegistryBuilder {
        self.add_connection_factory(DEFAULT_NAME, source)
    }

    /// Registers a connection factory `name` built from the options
    /// registered under `options_name`.
    pub fn add_connection_factory_from_options(
        mut self,
        name: &str,
        options_name: &str,
    ) -> RegistryBuilder {
        if !self.check_name("name", name) || !self.check_name("options_name", options_name) {
            return self;
        }
        if let Some(previous) = self
            .factories
            .insert(name.to_owned(), options_name.to_owned())
        {
            debug!(name, previous = %previous, "connection factory registration replaced");
        }
        debug!(name, options_name, "connection factory registered");
        self
    }

    /// Registers options, a factory and a connection, all under `name`.
    pub fn add_connection(self, name: &str, source: impl Into<OptionsSource>) -> RegistryBuilder {
        self.add_connection_factory(name, source)
            .add_connection_from_factory(name, name)
    }

    pub fn add_default_connection(self, source: impl Into<OptionsSource>) -> RegistryBuilder {
        self.add_connection(DEFAULT_NAME, source)
    }

    /// Registers a connection `name` opened by the factory registered under
    /// `factory_name`. The factory is looked up at resolution time.
    pub fn add_connection_from_factory(mut self, name: &str, factory_name: &str) -> RegistryBuilder {
        if !self.check_name("name", name) || !self.check_name("factory_name", factory_name) {
            return self;
        }
        if let Some(previous) = self
            .connections
            .insert(name.to_owned(), factory_name.to_owned())
        {
            debug!(name, previous = %previous, "connection registration replaced");
        }
        debug!(name, factory_name, "connection registered");
        self
    }

    pub fn add_stream_system(self, name: &str, source: impl Into<OptionsSource>) -> RegistryBuilder {
        self.add_connection_options(name, source)
            .add_stream_system_from_options(name, name)
    }

    pub fn add_default_stream_system(self, source: impl Into<OptionsSource>) -> RegistryBuilder {
        self.add_stream_system(DEFAULT_NAME, source)
    }

    pub fn add_stream_system_from_options(
        mut self,
        name: &str,
        options_name: &str,
    ) -> RegistryBuilder {
        if !self.check_name("name", name) || !self.check_name("options_name", options_name) {
            return self;
        }
        if let Some(previous) = self
            .stream_systems
            .insert(name.to_owned(), options_name.to_owned())
        {
            debug!(name, previous = %previous, "stream system registration replaced");
        }
        debug!(name, options_name, "stream system registered");
        self
    }

    pub fn add_default_stream_system_from_options(self, options_name: &str) -> RegistryBuilder {
        self.add_stream_system_from_options(DEFAULT_NAME, options_name)
    }

    /// Finishes registration. The first misuse recorded while registering
    /// (an empty name or section path) is reported here.
    pub fn build<A, S>(self, amqp: A, stream: S) -> RegistryResult<Registry<A, S>>
    where
        A: AmqpClient,
        S: StreamClient,
    {
        if let Some(err) = self.misuse {
            return Err(err);
        }
        if let Some(err) = self
            .options
            .values()
            .find_map(|builder| builder.misuse.clone())
        {
            return Err(err);
        }

        debug!(
            options = self.options.len(),
            factories = self.factories.len(),
            connections = self.connections.len(),
            stream_systems = self.stream_systems.len(),
            "registry built"
        );

        Ok(Registry {
            inner: Arc::new(RegistryInner {
                amqp,
                stream,
                options: OptionsStore::new(
                    self.configuration,
                    self.shared,
                    self.options,
                    self.validators,
                ),
                factories: self.factories,
                connections: self.connections,
                stream_systems: self.stream_systems,
                construction_timeout: self.construction_timeout,
                factory_cache: SingleFlight::default(),
                connection_cache: SingleFlight::default(),
                stream_system_cache: SingleFlight::default(),
            }),
        })
    }

    pub fn build_amqp<A: AmqpClient>(self, amqp: A) -> RegistryResult<Registry<A, Unsupported>> {
        self.build(amqp, Unsupported)
    }

    pub fn build_stream<S: StreamClient>(self, stream: S) -> RegistryResult<Registry<Unsupported, S>> {
        self.build(Unsupported, stream)
    }

    fn check_name(&mut self, argument: &'static str, name: &str) -> bool {
        if !name.trim().is_empty() {
            return true;
        }
        if self.misuse.is_none() {
            self.misuse = Some(RegistryError::InvalidArgument {
                argument,
                reason: "must not be empty",
            });
        }
        false
    }
}
