use std::{collections::HashMap, fmt, time::Duration};

use crate::{
    constants::{OPTIONS_NAME_PROPERTY, STREAM_DEFAULT_PORT},
    options::{ConnectionOptions, Endpoint, Secret, SslOption},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnsEndpoint {
    pub host: String,
    pub port: u16,
}

impl From<&Endpoint> for DnsEndpoint {
    fn from(endpoint: &Endpoint) -> Self {
        DnsEndpoint {
            host: endpoint.host_name().to_owned(),
            port: endpoint.port_or(STREAM_DEFAULT_PORT),
        }
    }
}

impl fmt::Display for DnsEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Native settings of a stream system.
#[derive(Clone, Debug)]
pub struct StreamSystemConfig {
    pub endpoints: Vec<DnsEndpoint>,
    pub user_name: Option<String>,
    pub password: Option<Secret>,
    pub virtual_host: Option<String>,
    pub heartbeat: Duration,
    pub client_provided_name: String,
    /// Always present; disabled when the options carry no TLS section.
    pub ssl: SslOption,
    pub properties: HashMap<String, String>,
}

impl StreamSystemConfig {
    pub fn from_options(options_name: &str, options: &ConnectionOptions) -> Self {
        let mut properties = HashMap::new();
        properties.insert(OPTIONS_NAME_PROPERTY.to_owned(), options_name.to_owned());

        StreamSystemConfig {
            endpoints: options.endpoints.iter().map(DnsEndpoint::from).collect(),
            user_name: options.user_name.clone(),
            password: options.password.clone(),
            virtual_host: options.virtual_host.clone(),
            heartbeat: options.heartbeat,
            client_provided_name: options.client_provided_name_or_default().to_owned(),
            ssl: options.tls.as_ref().map(SslOption::from).unwrap_or_default(),
            properties,
        }
    }

    pub fn options_name(&self) -> Option<&str> {
        self.properties.get(OPTIONS_NAME_PROPERTY).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::{DnsEndpoint, StreamSystemConfig};
    use crate::{constants::DEFAULT_CLIENT_PROVIDED_NAME, ConnectionOptions, TlsOptions};

    #[test]
    fn endpoints_get_the_stream_port() {
        let mut options = ConnectionOptions::default();
        options.endpoint("localhost").endpoint(("rabbit", 5553));

        let config = StreamSystemConfig::from_options("test", &options);

        assert_eq!(
            vec![
                DnsEndpoint {
                    host: "localhost".to_owned(),
                    port: 5552
                },
                DnsEndpoint {
                    host: "rabbit".to_owned(),
                    port: 5553
                }
            ],
            config.endpoints
        );
        assert_eq!("localhost:5552", config.endpoints[0].to_string());
    }

    #[test]
    fn tls_defaults_to_disabled() {
        let config = StreamSystemConfig::from_options("test", &ConnectionOptions::default());

        assert!(!config.ssl.enabled);
        assert!(config.ssl.server_name.is_none());
    }

    #[test]
    fn tls_and_identity_are_carried_over() {
        let mut options = ConnectionOptions {
            tls: Some(TlsOptions::enabled()),
            ..ConnectionOptions::default()
        };
        options.credentials("guest", "guest").virtual_host("/");

        let config = StreamSystemConfig::from_options("orders", &options);

        assert!(config.ssl.enabled);
        assert_eq!(Some("guest"), config.user_name.as_deref());
        assert_eq!(Some("/"), config.virtual_host.as_deref());
        assert_eq!(DEFAULT_CLIENT_PROVIDED_NAME, config.client_provided_name);
        assert_eq!(Some("orders"), config.options_name());
    }
}
