use crate::error::YagiError;
use serde::{Deserialize, Serialize};

/// Trait for configuration sections
pub trait ConfigSection: Serialize + for<'de> Deserialize<'de> + Default + Clone {
    fn section_name() -> &'static str;
    fn validate(&self) -> Result<(), YagiError>;
}

/// Shorthand for the section-prefixed configuration error.
pub(crate) fn invalid<S: ConfigSection>(message: impl Into<String>) -> YagiError {
    YagiError::Configuration(format!("[{}] {}", S::section_name(), message.into()))
}

pub(crate) fn check_probability<S: ConfigSection>(name: &str, value: f64) -> Result<(), YagiError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid::<S>(format!("{} must be between 0 and 1, got {}", name, value)));
    }
    Ok(())
}
