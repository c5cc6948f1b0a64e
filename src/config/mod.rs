pub mod genetic_algorithm;
pub mod manager;
pub mod output;
pub mod paths;
pub mod simulation;
pub mod traits;

pub use genetic_algorithm::GeneticAlgorithmConfig;
pub use manager::{AppConfig, ConfigManager};
pub use output::OutputConfig;
pub use paths::PathsConfig;
pub use simulation::{EvaluationMode, SimulationConfig};
pub use traits::ConfigSection;
