use std::{error::Error as StdError, fmt, sync::Arc, time::Duration};

use thiserror::Error;

/// Kind of object a registration produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    ConnectionFactory,
    Connection,
    StreamSystem,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::ConnectionFactory => f.write_str("connection factory"),
            Role::Connection => f.write_str("connection"),
            Role::StreamSystem => f.write_str("stream system"),
        }
    }
}

/// Every failed invariant of a named [`crate::ConnectionOptions`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", .failures.join("; "))]
pub struct ValidationError {
    pub name: String,
    pub failures: Vec<String>,
}

impl ValidationError {
    pub fn new(name: impl Into<String>, failures: Vec<String>) -> Self {
        ValidationError {
            name: name.into(),
            failures,
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum RegistryError {
    #[error("Invalid argument '{argument}': {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: &'static str,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("No connection options registered under '{0}'")]
    UnknownOptions(String),
    #[error("No connection factory registered under '{0}'")]
    UnknownFactory(String),
    #[error("No connection registered under '{0}'")]
    UnknownConnection(String),
    #[error("No stream system registered under '{0}'")]
    UnknownStreamSystem(String),
    #[error("Connection factory '{factory}' does not carry the '{key}' property")]
    MissingOptionsMarker { factory: String, key: &'static str },
    #[error("Cannot bind configuration section '{path}' for '{name}'")]
    Binding {
        name: String,
        path: String,
        #[source]
        source: Arc<serde_json::Error>,
    },
    #[error("Invalid connection uri for '{name}'")]
    Uri {
        name: String,
        #[source]
        source: UriError,
    },
    #[error("Constructing {role} '{name}' did not complete within {timeout:?}")]
    Timeout {
        role: Role,
        name: String,
        timeout: Duration,
    },
    #[error("Cannot start the blocking runtime")]
    Runtime(#[source] Arc<std::io::Error>),
    #[error("Blocking resolution is not supported on a current-thread runtime, use the async API")]
    BlockingOnCurrentThread,
    #[error(transparent)]
    Construction(Arc<dyn StdError + Send + Sync>),
}

impl RegistryError {
    pub(crate) fn construction(err: Box<dyn StdError + Send + Sync>) -> Self {
        RegistryError::Construction(Arc::from(err))
    }

    /// True for errors caused by the registrations or their configuration,
    /// as opposed to failures of the wrapped client library.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(
            self,
            RegistryError::Construction(_)
                | RegistryError::Timeout { .. }
                | RegistryError::Runtime(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error(transparent)]
    Figment(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ConfigurationError {
    fn from(err: figment::Error) -> Self {
        ConfigurationError::Figment(Box::new(err))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    #[error(transparent)]
    Parse(#[from] url::ParseError),
    #[error("Unsupported uri scheme '{0}'")]
    UnsupportedScheme(String),
    #[error("Uri does not contain a host")]
    MissingHost,
    #[error("Invalid percent-encoding in '{0}'")]
    Encoding(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointParseError {
    #[error("Endpoint host is empty")]
    EmptyHost,
    #[error("Invalid endpoint port '{0}'")]
    InvalidPort(String),
}

#[derive(Error, Debug)]
pub enum CertificateError {
    #[error("No certificate path configured")]
    MissingPath,
    #[error("Cannot read certificates from '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
