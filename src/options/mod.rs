mod endpoint;
mod secret;
mod tls;
mod uri;

use std::time::Duration;

pub use endpoint::Endpoint;
pub use secret::Secret;
pub use tls::{
    CertificateSelectionHook, CertificateValidationHook, PolicyErrors, SslOption, TlsOptions,
    TlsVersion,
};

use crate::constants::{DEFAULT_CLIENT_PROVIDED_NAME, DEFAULT_HEARTBEAT};

/// Protocol independent settings for one named registration.
///
/// Mutable while the registry is being built; every resolution afterwards
/// sees a shared, validated snapshot.
#[derive(Clone, Debug)]
pub struct ConnectionOptions {
    pub endpoints: Vec<Endpoint>,
    pub virtual_host: Option<String>,
    pub user_name: Option<String>,
    pub password: Option<Secret>,
    pub heartbeat: Duration,
    pub tls: Option<TlsOptions>,
    pub client_provided_name: Option<String>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        ConnectionOptions {
            endpoints: Vec::new(),
            virtual_host: None,
            user_name: None,
            password: None,
            heartbeat: DEFAULT_HEARTBEAT,
            tls: None,
            client_provided_name: Some(DEFAULT_CLIENT_PROVIDED_NAME.to_owned()),
        }
    }
}

impl ConnectionOptions {
    pub fn endpoint(&mut self, endpoint: impl Into<Endpoint>) -> &mut Self {
        self.endpoints.push(endpoint.into());
        self
    }

    pub fn credentials(&mut self, user_name: &str, password: &str) -> &mut Self {
        self.user_name = Some(user_name.to_owned());
        self.password = Some(Secret::new(password));
        self
    }

    pub fn virtual_host(&mut self, virtual_host: &str) -> &mut Self {
        self.virtual_host = Some(virtual_host.to_owned());
        self
    }

    pub(crate) fn client_provided_name_or_default(&self) -> &str {
        self.client_provided_name
            .as_deref()
            .unwrap_or(DEFAULT_CLIENT_PROVIDED_NAME)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{ConnectionOptions, Endpoint};
    use crate::constants::DEFAULT_CLIENT_PROVIDED_NAME;

    #[test]
    fn defaults() {
        let options = ConnectionOptions::default();

        assert!(options.endpoints.is_empty());
        assert!(options.tls.is_none());
        assert_eq!(Duration::from_secs(60), options.heartbeat);
        assert_eq!(
            Some(DEFAULT_CLIENT_PROVIDED_NAME),
            options.client_provided_name.as_deref()
        );
    }

    #[test]
    fn debug_does_not_leak_password() {
        let mut options = ConnectionOptions::default();
        options
            .endpoint("localhost")
            .credentials("guest", "s3cr3t-value");

        let debug = format!("{:?}", options);

        assert!(debug.contains("guest"));
        assert!(!debug.contains("s3cr3t-value"));
    }

    #[test]
    fn setters_chain() {
        let mut options = ConnectionOptions::default();
        options
            .endpoint(("rabbit-1", 5672))
            .endpoint("rabbit-2")
            .virtual_host("/");

        assert_eq!(
            vec![Endpoint::with_port("rabbit-1", 5672), Endpoint::new("rabbit-2")],
            options.endpoints
        );
        assert_eq!(Some("/"), options.virtual_host.as_deref());
    }
}
