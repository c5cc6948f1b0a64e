use super::{
    genetic_algorithm::GeneticAlgorithmConfig, output::OutputConfig, paths::PathsConfig,
    simulation::SimulationConfig, traits::ConfigSection,
};
use crate::error::YagiError;
use config::{Config, Environment, File, FileFormat};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Environment variables override file values, e.g.
/// `YAGIOPT__GENETIC_ALGORITHM__POPULATION_SIZE=80`.
pub const ENV_PREFIX: &str = "YAGIOPT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub simulation: SimulationConfig,
    pub genetic_algorithm: GeneticAlgorithmConfig,
    pub paths: PathsConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), YagiError> {
        self.simulation.validate()?;
        self.genetic_algorithm.validate()?;
        self.paths.validate()?;
        self.output.validate()?;
        Ok(())
    }

    /// Layered load: built-in defaults, then `path` (TOML) if given, then
    /// `YAGIOPT__*` environment variables. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, YagiError> {
        let defaults = Config::try_from(&AppConfig::default()).map_err(config_error)?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = path {
            debug!("Reading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(config_error)?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, YagiError> {
        let config: AppConfig = toml::from_str(contents)
            .map_err(|e| YagiError::Configuration(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, YagiError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn config_error(e: config::ConfigError) -> YagiError {
    YagiError::Configuration(e.to_string())
}

/// Shared, validated configuration handed to the optimizer and to any
/// front-end that edits it.
pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), YagiError> {
        let config = AppConfig::load(Some(path.as_ref()))?;
        info!("Loaded configuration from {}", path.as_ref().display());
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), YagiError> {
        let toml_str = self.get().to_toml_string()?;
        std::fs::write(path.as_ref(), toml_str)
            .map_err(|e| YagiError::Configuration(format!("Failed to write config: {}", e)))?;
        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Apply `f` to a copy; the shared value only changes if the result validates.
    pub fn update<F>(&self, f: F) -> Result<(), YagiError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut guard = self.config.write().unwrap_or_else(|e| e.into_inner());
        let mut candidate = guard.clone();
        f(&mut candidate);
        candidate.validate()?;
        *guard = candidate;
        Ok(())
    }
}
