//! Named RabbitMQ client registrations.
//!
//! Connection options, AMQP connection factories, AMQP connections and
//! stream systems are registered under logical names on a
//! [`RegistryBuilder`]. The resulting [`Registry`] validates the options and
//! constructs each object lazily, once per name.
//!
//! ```rust,no_run
//! use rabbitmq_named_clients::{Configuration, OptionsSource, Registry};
//!
//! # fn run(configuration: Configuration) -> rabbitmq_named_clients::RegistryResult<()> {
//! let registry = Registry::builder()
//!     .configuration(configuration)
//!     .add_default_connection_options(OptionsSource::section("RabbitMQ"))
//!     .build(rabbitmq_named_clients::Unsupported, rabbitmq_named_clients::Unsupported)?;
//!
//! let options = registry.options(rabbitmq_named_clients::DEFAULT_NAME)?;
//! println!("{}", options.endpoints[0]);
//! # Ok(())
//! # }
//! ```

pub mod amqp;
mod configuration;
mod constants;
pub mod error;
mod options;
mod registry;
mod single_flight;
mod source;
mod store;
pub mod stream;
mod unsupported;
mod validator;

pub type RegistryResult<T> = Result<T, error::RegistryError>;

/// Error type the wrapped client libraries report construction failures with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub use crate::configuration::Configuration;
pub use crate::constants::{
    AMQP_DEFAULT_PORT, DEFAULT_CLIENT_PROVIDED_NAME, DEFAULT_HEARTBEAT, DEFAULT_NAME,
    OPTIONS_NAME_PROPERTY, STREAM_DEFAULT_PORT,
};
pub use crate::options::{
    ConnectionOptions, Endpoint, PolicyErrors, Secret, SslOption, TlsOptions, TlsVersion,
};
pub use crate::registry::{Registry, RegistryBuilder};
pub use crate::source::{OptionsBuilder, OptionsSource};
pub use crate::unsupported::Unsupported;
pub use crate::validator::{ConnectionOptionsValidator, OptionsValidator};

pub mod types {
    pub use crate::error::Role;
    pub use crate::options::{CertificateSelectionHook, CertificateValidationHook};
    pub use crate::source::ConfigureFn;
    pub use crate::unsupported::{
        UnsupportedConnection, UnsupportedFactory, UnsupportedProtocol, UnsupportedSystem,
    };
}
