use std::{fmt, sync::Arc};

use crate::{error::RegistryError, options::ConnectionOptions};

pub type ConfigureFn = Arc<dyn Fn(&mut ConnectionOptions) + Send + Sync>;
pub(crate) type PredicateFn = Arc<dyn Fn(&ConnectionOptions) -> bool + Send + Sync>;

#[derive(Clone)]
pub(crate) enum ConfigureAction {
    Configure(ConfigureFn),
    Bind(String),
    Uri(String),
}

impl fmt::Debug for ConfigureAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigureAction::Configure(_) => f.write_str("Configure(..)"),
            ConfigureAction::Bind(path) => f.debug_tuple("Bind").field(path).finish(),
            // uris may embed credentials
            ConfigureAction::Uri(_) => f.write_str("Uri(..)"),
        }
    }
}

#[derive(Clone)]
pub(crate) struct Check {
    pub(crate) predicate: PredicateFn,
    pub(crate) message: String,
}

/// Where the settings of a named registration come from.
pub enum OptionsSource {
    /// Inline mutator applied to the default options.
    Configure(ConfigureFn),
    /// Path of a configuration section bound onto the options.
    Section(String),
    Builder(OptionsBuilder),
}

impl OptionsSource {
    pub fn configure<F>(configure: F) -> OptionsSource
    where
        F: Fn(&mut ConnectionOptions) + Send + Sync + 'static,
    {
        OptionsSource::Configure(Arc::new(configure))
    }

    pub fn section(path: impl Into<String>) -> OptionsSource {
        OptionsSource::Section(path.into())
    }

    pub(crate) fn into_builder(self) -> OptionsBuilder {
        match self {
            OptionsSource::Configure(configure) => OptionsBuilder::default().push(
                ConfigureAction::Configure(configure),
            ),
            OptionsSource::Section(path) => OptionsBuilder::default().bind_configuration(path),
            OptionsSource::Builder(builder) => builder,
        }
    }
}

impl From<OptionsBuilder> for OptionsSource {
    fn from(builder: OptionsBuilder) -> Self {
        OptionsSource::Builder(builder)
    }
}

/// Ordered configuration steps and extra checks for one named
/// [`ConnectionOptions`].
#[derive(Clone, Default)]
pub struct OptionsBuilder {
    pub(crate) actions: Vec<ConfigureAction>,
    pub(crate) checks: Vec<Check>,
    pub(crate) misuse: Option<RegistryError>,
}

impl OptionsBuilder {
    pub fn new() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    pub fn configure<F>(self, configure: F) -> OptionsBuilder
    where
        F: Fn(&mut ConnectionOptions) + Send + Sync + 'static,
    {
        self.push(ConfigureAction::Configure(Arc::new(configure)))
    }

    pub fn bind_configuration(mut self, path: impl Into<String>) -> OptionsBuilder {
        let path = path.into();
        if path.trim().is_empty() {
            self.reject(RegistryError::InvalidArgument {
                argument: "config_section_path",
                reason: "must not be empty",
            });
            return self;
        }
        self.push(ConfigureAction::Bind(path))
    }

    /// Applies a connection uri, see [`ConnectionOptions::apply_uri`].
    pub fn uri(self, uri: impl Into<String>) -> OptionsBuilder {
        self.push(ConfigureAction::Uri(uri.into()))
    }

    /// Adds a check that fails validation with `message` when `predicate`
    /// returns false.
    pub fn validate<F>(mut self, predicate: F, message: impl Into<String>) -> OptionsBuilder
    where
        F: Fn(&ConnectionOptions) -> bool + Send + Sync + 'static,
    {
        self.checks.push(Check {
            predicate: Arc::new(predicate),
            message: message.into(),
        });
        self
    }

    pub(crate) fn merge(&mut self, other: OptionsBuilder) {
        self.actions.extend(other.actions);
        self.checks.extend(other.checks);
        if self.misuse.is_none() {
            self.misuse = other.misuse;
        }
    }

    fn push(mut self, action: ConfigureAction) -> OptionsBuilder {
        self.actions.push(action);
        self
    }

    fn reject(&mut self, err: RegistryError) {
        if self.misuse.is_none() {
            self.misuse = Some(err);
        }
    }
}

impl fmt::Debug for OptionsBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionsBuilder")
            .field("actions", &self.actions)
            .field("checks", &self.checks.len())
            .finish()
    }
}
