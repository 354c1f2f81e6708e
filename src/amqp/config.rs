use std::{collections::HashMap, fmt, time::Duration};

use crate::{
    constants::{AMQP_DEFAULT_PORT, OPTIONS_NAME_PROPERTY},
    options::{ConnectionOptions, Endpoint, Secret, SslOption},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AmqpTcpEndpoint {
    pub host_name: String,
    pub port: u16,
}

impl From<&Endpoint> for AmqpTcpEndpoint {
    fn from(endpoint: &Endpoint) -> Self {
        AmqpTcpEndpoint {
            host_name: endpoint.host_name().to_owned(),
            port: endpoint.port_or(AMQP_DEFAULT_PORT),
        }
    }
}

impl fmt::Display for AmqpTcpEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "amqp://{}:{}", self.host_name, self.port)
    }
}

impl AmqpTcpEndpoint {
    pub fn from_options(options: &ConnectionOptions) -> Vec<AmqpTcpEndpoint> {
        options.endpoints.iter().map(AmqpTcpEndpoint::from).collect()
    }
}

/// Native settings of an AMQP connection factory.
#[derive(Clone, Debug)]
pub struct ConnectionFactoryConfig {
    pub user_name: Option<String>,
    pub password: Option<Secret>,
    pub virtual_host: Option<String>,
    pub requested_heartbeat: Duration,
    pub dispatch_consumers_async: bool,
    /// `None` when the options carry no TLS section.
    pub ssl: Option<SslOption>,
    pub client_properties: HashMap<String, String>,
}

impl ConnectionFactoryConfig {
    /// Translates `options`, stamping `options_name` into the client
    /// properties so connections can later find the options again.
    pub fn from_options(options_name: &str, options: &ConnectionOptions) -> Self {
        let mut client_properties = HashMap::new();
        client_properties.insert(OPTIONS_NAME_PROPERTY.to_owned(), options_name.to_owned());

        ConnectionFactoryConfig {
            user_name: options.user_name.clone(),
            password: options.password.clone(),
            virtual_host: options.virtual_host.clone(),
            requested_heartbeat: options.heartbeat,
            dispatch_consumers_async: true,
            ssl: options.tls.as_ref().map(SslOption::from),
            client_properties,
        }
    }

    /// Name of the options this configuration was translated from.
    pub fn options_name(&self) -> Option<&str> {
        self.client_properties
            .get(OPTIONS_NAME_PROPERTY)
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{AmqpTcpEndpoint, ConnectionFactoryConfig};
    use crate::{constants::OPTIONS_NAME_PROPERTY, ConnectionOptions, Endpoint, TlsOptions};

    #[test]
    fn endpoints_get_the_default_port() {
        let mut options = ConnectionOptions::default();
        options.endpoint("localhost").endpoint(("rabbit", 5673));

        let endpoints = AmqpTcpEndpoint::from_options(&options);

        assert_eq!(5672, endpoints[0].port);
        assert_eq!(5673, endpoints[1].port);
        assert_eq!("amqp://localhost:5672", endpoints[0].to_string());
    }

    #[test]
    fn translation_copies_settings_and_stamps_name() {
        let mut options = ConnectionOptions::default();
        options
            .endpoint(Endpoint::new("localhost"))
            .credentials("guest", "guest")
            .virtual_host("/");
        options.heartbeat = Duration::from_secs(30);

        let config = ConnectionFactoryConfig::from_options("test", &options);

        assert_eq!(Some("guest"), config.user_name.as_deref());
        assert_eq!(Some("guest"), config.password.as_ref().map(|p| p.expose()));
        assert_eq!(Some("/"), config.virtual_host.as_deref());
        assert_eq!(Duration::from_secs(30), config.requested_heartbeat);
        assert!(config.dispatch_consumers_async);
        assert_eq!(
            Some("test"),
            config.client_properties.get(OPTIONS_NAME_PROPERTY).map(String::as_str)
        );
        assert_eq!(Some("test"), config.options_name());
    }

    #[test]
    fn tls_is_absent_without_tls_options() {
        let config = ConnectionFactoryConfig::from_options("test", &ConnectionOptions::default());

        assert!(config.ssl.is_none());
    }

    #[test]
    fn tls_options_are_carried_over() {
        let mut tls = TlsOptions::enabled();
        tls.server_name = Some("rabbit.local".to_owned());
        let options = ConnectionOptions {
            tls: Some(tls),
            ..ConnectionOptions::default()
        };

        let ssl = ConnectionFactoryConfig::from_options("test", &options)
            .ssl
            .unwrap();

        assert!(ssl.enabled);
        assert_eq!(Some("rabbit.local"), ssl.server_name.as_deref());
    }
}
