use std::{fmt, str::FromStr};

use crate::error::EndpointParseError;

/// Host and optional port of a broker node.
///
/// A missing port is resolved per protocol when the options are translated
/// into a native configuration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host_name: String,
    port: Option<u16>,
}

impl Endpoint {
    pub fn new(host_name: impl Into<String>) -> Endpoint {
        Endpoint {
            host_name: host_name.into(),
            port: None,
        }
    }

    pub fn with_port(host_name: impl Into<String>, port: u16) -> Endpoint {
        Endpoint {
            host_name: host_name.into(),
            port: Some(port),
        }
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn port_or(&self, default_port: u16) -> u16 {
        self.port.unwrap_or(default_port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host_name, port),
            None => write!(f, "{}:-1", self.host_name),
        }
    }
}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    /// Accepts `host`, `host:port`, `[v6]` and `[v6]:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            match rest.split_once(']') {
                Some((host, "")) => (host, None),
                Some((host, port)) => match port.strip_prefix(':') {
                    Some(port) => (host, Some(port)),
                    None => return Err(EndpointParseError::InvalidPort(port.to_owned())),
                },
                None => return Err(EndpointParseError::EmptyHost),
            }
        } else {
            match s.rsplit_once(':') {
                // bare ipv6 address without brackets
                Some((host, _)) if host.contains(':') => (s, None),
                Some((host, port)) => (host, Some(port)),
                None => (s, None),
            }
        };

        if host.is_empty() {
            return Err(EndpointParseError::EmptyHost);
        }

        match port {
            Some(port) => port
                .parse::<u16>()
                .map(|port| Endpoint::with_port(host, port))
                .map_err(|_| EndpointParseError::InvalidPort(port.to_owned())),
            None => Ok(Endpoint::new(host)),
        }
    }
}

impl From<&str> for Endpoint {
    fn from(host_name: &str) -> Self {
        Endpoint::new(host_name)
    }
}

impl From<(&str, u16)> for Endpoint {
    fn from((host_name, port): (&str, u16)) -> Self {
        Endpoint::with_port(host_name, port)
    }
}
