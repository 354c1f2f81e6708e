use std::{collections::HashMap, sync::Arc};

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::{
    configuration::Configuration,
    error::{RegistryError, ValidationError},
    options::ConnectionOptions,
    source::{ConfigureAction, OptionsBuilder},
    validator::OptionsValidator,
    RegistryResult,
};

/// Named options, materialized and validated on first access.
pub(crate) struct OptionsStore {
    configuration: Configuration,
    shared: Vec<ConfigureAction>,
    named: HashMap<String, OptionsBuilder>,
    validators: Vec<Arc<dyn OptionsValidator>>,
    cache: DashMap<String, Arc<ConnectionOptions>>,
}

impl OptionsStore {
    pub(crate) fn new(
        configuration: Configuration,
        shared: Vec<ConfigureAction>,
        named: HashMap<String, OptionsBuilder>,
        validators: Vec<Arc<dyn OptionsValidator>>,
    ) -> OptionsStore {
        OptionsStore {
            configuration,
            shared,
            named,
            validators,
            cache: DashMap::new(),
        }
    }

    pub(crate) fn get(&self, name: &str) -> RegistryResult<Arc<ConnectionOptions>> {
        if let Some(options) = self.cache.get(name) {
            trace!(name, "connection options served from cache");
            return Ok(options.value().clone());
        }

        let registration = self
            .named
            .get(name)
            .ok_or_else(|| RegistryError::UnknownOptions(name.to_owned()))?;

        // built outside of any shard lock, configure actions may take a while;
        // when two callers race the first stored value wins
        let options = Arc::new(self.materialize(name, registration)?);
        let options = self
            .cache
            .entry(name.to_owned())
            .or_insert(options)
            .value()
            .clone();
        debug!(name, "connection options validated");
        Ok(options)
    }

    fn materialize(
        &self,
        name: &str,
        registration: &OptionsBuilder,
    ) -> RegistryResult<ConnectionOptions> {
        let mut options = ConnectionOptions::default();

        for action in self.shared.iter().chain(registration.actions.iter()) {
            self.apply(name, action, &mut options)?;
        }

        let mut failures = Vec::new();
        for validator in &self.validators {
            if let Err(err) = validator.validate(name, &options) {
                failures.extend(err.failures);
            }
        }
        for check in &registration.checks {
            if !(check.predicate)(&options) {
                failures.push(check.message.clone());
            }
        }

        if failures.is_empty() {
            Ok(options)
        } else {
            Err(ValidationError::new(name, failures).into())
        }
    }

    fn apply(
        &self,
        name: &str,
        action: &ConfigureAction,
        options: &mut ConnectionOptions,
    ) -> RegistryResult<()> {
        match action {
            ConfigureAction::Configure(configure) => {
                configure(options);
                Ok(())
            }
            ConfigureAction::Bind(path) => self.configuration.bind(name, path, options),
            ConfigureAction::Uri(uri) => options
                .apply_uri(uri)
                .map(|_| ())
                .map_err(|source| RegistryError::Uri {
                    name: name.to_owned(),
                    source,
                }),
        }
    }
}
