use std::{fmt::Display, path::Path, path::PathBuf, str::FromStr, time::Duration};

use figment::{
    providers::{Env, Format, Json, Serialized},
    Figment, Provider,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::trace;

use crate::{
    error::{ConfigurationError, RegistryError},
    options::{ConnectionOptions, Endpoint, PolicyErrors, Secret, TlsOptions, TlsVersion},
    RegistryResult,
};

const SEPARATOR: char = ':';
const ENV_SEPARATOR: &str = "__";

/// Hierarchical configuration that named options can be bound from.
///
/// Layers are merged with [`Figment`]. Keys are matched case-insensitively
/// and sections are addressed with `:` separated paths, e.g.
/// `RabbitMQ:Connections:0`.
#[derive(Clone, Debug)]
pub struct Configuration {
    figment: Figment,
    root: Value,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            figment: Figment::new(),
            root: Value::Object(Map::new()),
        }
    }
}

impl Configuration {
    pub fn new(root: Value) -> Configuration {
        let layer = into_layer(&root);
        Configuration {
            figment: Figment::from(Serialized::defaults(layer.clone())),
            root: restore_arrays(layer),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Configuration, ConfigurationError> {
        Configuration::default().layer(Json::string(json))
    }

    /// Loads a JSON file. A missing file is an empty layer.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Configuration, ConfigurationError> {
        Configuration::default().layer(Json::file(path.as_ref()))
    }

    /// Layers `other` on top of this configuration; its values win.
    pub fn merge(self, other: Configuration) -> Result<Configuration, ConfigurationError> {
        self.layer(other.figment)
    }

    /// Layers every environment variable starting with `prefix` on top of
    /// this configuration. `__` separates sections, so
    /// `APP__RabbitMQ__Endpoints__0__HostName` sets
    /// `RabbitMQ:Endpoints:0:HostName`.
    pub fn add_environment_variables(
        self,
        prefix: &str,
    ) -> Result<Configuration, ConfigurationError> {
        self.layer(Env::prefixed(prefix).split(ENV_SEPARATOR))
    }

    fn layer(self, provider: impl Provider) -> Result<Configuration, ConfigurationError> {
        let value: Value = Figment::from(provider).extract()?;
        let figment = self
            .figment
            .merge(Serialized::defaults(into_layer(&value)));
        let root = restore_arrays(figment.extract()?);
        Ok(Configuration { figment, root })
    }

    /// Looks up the section at `path`, `None` when any segment is missing.
    pub fn section(&self, path: &str) -> Option<&Value> {
        path.split(SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .try_fold(&self.root, |value, segment| child(value, segment))
    }

    /// Binds the section at `path` onto `options`. A missing section leaves
    /// the options untouched.
    pub(crate) fn bind(
        &self,
        name: &str,
        path: &str,
        options: &mut ConnectionOptions,
    ) -> RegistryResult<()> {
        let section = match self.section(path) {
            Some(section) => section,
            None => {
                trace!(name, path, "configuration section not found, nothing to bind");
                return Ok(());
            }
        };

        let binding_error = |source| RegistryError::Binding {
            name: name.to_owned(),
            path: path.to_owned(),
            source: std::sync::Arc::new(source),
        };

        let section: OptionsSection =
            serde_json::from_value(section.clone()).map_err(binding_error)?;

        if let Some(uri) = &section.uri {
            options
                .apply_uri(uri)
                .map_err(|source| RegistryError::Uri {
                    name: name.to_owned(),
                    source,
                })?;
        }

        section.apply(options).map_err(binding_error)
    }
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(&normalize_key(segment)),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Shape a layer is merged in: normalized keys, and non-empty arrays keyed
/// by index so a later layer can override single items.
fn into_layer(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (normalize_key(key), into_layer(value)))
                .collect(),
        ),
        Value::Array(items) if !items.is_empty() => Value::Object(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), into_layer(item)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Turns objects whose keys are all indexes back into arrays.
fn restore_arrays(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let indexed = !map.is_empty() && map.keys().all(|key| key.parse::<usize>().is_ok());
            if indexed {
                let mut items: Vec<(usize, Value)> = map
                    .into_iter()
                    .filter_map(|(key, value)| key.parse().ok().map(|i| (i, value)))
                    .collect();
                items.sort_by_key(|(i, _)| *i);
                Value::Array(items.into_iter().map(|(_, v)| restore_arrays(v)).collect())
            } else {
                Value::Object(
                    map.into_iter()
                        .map(|(key, value)| (key, restore_arrays(value)))
                        .collect(),
                )
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(restore_arrays).collect()),
        other => other,
    }
}

/// Lower-cases a key and drops `_`/`-` from it.
fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn custom<T: Display>(msg: T) -> serde_json::Error {
    <serde_json::Error as serde::de::Error>::custom(msg)
}

/// Accepts either the native JSON type or its string form.
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Value(T),
    Text(String),
}

impl<T> Lenient<T>
where
    T: FromStr,
    T::Err: Display,
{
    fn into_value(self, field: &str) -> Result<T, serde_json::Error> {
        match self {
            Lenient::Value(value) => Ok(value),
            Lenient::Text(text) => text
                .trim()
                .parse()
                .map_err(|err| custom(format!("invalid value '{}' for {}: {}", text, field, err))),
        }
    }
}

/// Environment values that look like numbers or booleans arrive typed,
/// text settings take them back as strings.
fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text)),
        Value::Number(number) => Ok(Some(number.to_string())),
        Value::Bool(flag) => Ok(Some(flag.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, found {}",
            other
        ))),
    }
}

fn secret<'de, D>(deserializer: D) -> Result<Option<Secret>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(text(deserializer)?.map(Secret::new))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EndpointSection {
    Address(String),
    Parts {
        hostname: String,
        #[serde(default)]
        port: Option<Lenient<u16>>,
    },
}

impl EndpointSection {
    fn into_endpoint(self) -> Result<Endpoint, serde_json::Error> {
        match self {
            EndpointSection::Address(address) => address
                .parse()
                .map_err(|err| custom(format!("invalid endpoint '{}': {}", address, err))),
            EndpointSection::Parts { hostname, port } => match port {
                Some(port) => Ok(Endpoint::with_port(hostname, port.into_value("port")?)),
                None => Ok(Endpoint::new(hostname)),
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VersionsSection {
    List(Vec<String>),
    Flags(String),
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TlsSection {
    enabled: Option<Lenient<bool>>,
    #[serde(rename = "servername", deserialize_with = "text")]
    server_name: Option<String>,
    #[serde(rename = "certpath")]
    cert_path: Option<PathBuf>,
    #[serde(rename = "certpassphrase", deserialize_with = "secret")]
    cert_passphrase: Option<Secret>,
    #[serde(rename = "acceptablepolicyerrors", deserialize_with = "text")]
    acceptable_policy_errors: Option<String>,
    #[serde(rename = "checkcertificaterevocation")]
    check_certificate_revocation: Option<Lenient<bool>>,
    #[serde(alias = "version")]
    versions: Option<VersionsSection>,
}

impl TlsSection {
    fn apply(self, tls: &mut TlsOptions) -> Result<(), serde_json::Error> {
        if let Some(enabled) = self.enabled {
            tls.enabled = enabled.into_value("SslOptions:Enabled")?;
        }
        if let Some(server_name) = self.server_name {
            tls.server_name = Some(server_name);
        }
        if let Some(cert_path) = self.cert_path {
            tls.cert_path = Some(cert_path);
        }
        if let Some(cert_passphrase) = self.cert_passphrase {
            tls.cert_passphrase = Some(cert_passphrase);
        }
        if let Some(errors) = self.acceptable_policy_errors {
            tls.acceptable_policy_errors = errors.parse::<PolicyErrors>().map_err(custom)?;
        }
        if let Some(check) = self.check_certificate_revocation {
            tls.check_certificate_revocation =
                check.into_value("SslOptions:CheckCertificateRevocation")?;
        }
        if let Some(versions) = self.versions {
            let names = match versions {
                VersionsSection::List(names) => names,
                VersionsSection::Flags(flags) => flags.split(',').map(str::to_owned).collect(),
            };
            tls.versions = names
                .iter()
                .filter(|name| !name.trim().is_empty())
                .map(|name| name.parse::<TlsVersion>().map_err(custom))
                .collect::<Result<_, _>>()?;
        }
        Ok(())
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct OptionsSection {
    #[serde(deserialize_with = "text")]
    uri: Option<String>,
    endpoints: Option<Vec<EndpointSection>>,
    #[serde(rename = "virtualhost", deserialize_with = "text")]
    virtual_host: Option<String>,
    #[serde(rename = "username", deserialize_with = "text")]
    user_name: Option<String>,
    #[serde(deserialize_with = "secret")]
    password: Option<Secret>,
    heartbeat: Option<Lenient<u64>>,
    #[serde(rename = "ssloptions", alias = "tls")]
    tls: Option<TlsSection>,
    #[serde(rename = "clientprovidedname", deserialize_with = "text")]
    client_provided_name: Option<String>,
}

impl OptionsSection {
    fn apply(self, options: &mut ConnectionOptions) -> Result<(), serde_json::Error> {
        // lists are appended to, like any other binder pass over a collection
        if let Some(endpoints) = self.endpoints {
            for endpoint in endpoints {
                options.endpoints.push(endpoint.into_endpoint()?);
            }
        }
        if let Some(virtual_host) = self.virtual_host {
            options.virtual_host = Some(virtual_host);
        }
        if let Some(user_name) = self.user_name {
            options.user_name = Some(user_name);
        }
        if let Some(password) = self.password {
            options.password = Some(password);
        }
        if let Some(heartbeat) = self.heartbeat {
            options.heartbeat = parse_heartbeat(heartbeat)?;
        }
        if let Some(tls) = self.tls {
            tls.apply(options.tls.get_or_insert_with(TlsOptions::default))?;
        }
        if let Some(client_provided_name) = self.client_provided_name {
            options.client_provided_name = Some(client_provided_name);
        }
        Ok(())
    }
}

fn parse_heartbeat(value: Lenient<u64>) -> Result<Duration, serde_json::Error> {
    match value {
        Lenient::Value(seconds) => Ok(Duration::from_secs(seconds)),
        Lenient::Text(text) => parse_duration(text.trim())
            .ok_or_else(|| custom(format!("invalid value '{}' for Heartbeat", text))),
    }
}

/// Parses `ss`, `hh:mm:ss`, `d.hh:mm:ss` with optional `.fraction` seconds.
fn parse_duration(text: &str) -> Option<Duration> {
    if let Ok(seconds) = text.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let parts: Vec<&str> = text.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [hours, minutes, seconds] => (*hours, *minutes, *seconds),
        _ => return None,
    };

    let (days, hours) = match hours.split_once('.') {
        Some((days, hours)) => (days.parse::<u64>().ok()?, hours.parse::<u64>().ok()?),
        None => (0, hours.parse::<u64>().ok()?),
    };
    let minutes = minutes.parse::<u64>().ok()?;
    let seconds = seconds.parse::<f64>().ok()?;
    if minutes >= 60 || !(0.0..60.0).contains(&seconds) {
        return None;
    }

    let whole = days
        .checked_mul(86_400)?
        .checked_add(hours.checked_mul(3_600)?)?
        .checked_add(minutes * 60)?;
    Duration::from_secs(whole).checked_add(Duration::from_secs_f64(seconds))
}
