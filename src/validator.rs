use crate::{error::ValidationError, options::ConnectionOptions};

/// Checks a fully configured [`ConnectionOptions`] before it is used.
///
/// Implementations report every broken rule at once instead of stopping at
/// the first one.
pub trait OptionsValidator: Send + Sync {
    fn validate(&self, name: &str, options: &ConnectionOptions) -> Result<(), ValidationError>;
}

impl<F> OptionsValidator for F
where
    F: Fn(&str, &ConnectionOptions) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, name: &str, options: &ConnectionOptions) -> Result<(), ValidationError> {
        self(name, options)
    }
}

/// Rules every registration has to satisfy.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConnectionOptionsValidator;

impl OptionsValidator for ConnectionOptionsValidator {
    fn validate(&self, name: &str, options: &ConnectionOptions) -> Result<(), ValidationError> {
        let mut failures = Vec::new();

        if options.endpoints.is_empty() {
            failures.push(format!("Expecting at least one endpoint for '{}'", name));
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(name, failures))
        }
    }
}
