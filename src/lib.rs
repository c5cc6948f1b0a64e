pub mod config;
pub mod engines;
pub mod error;
pub mod export;
pub mod services;
pub mod types;

pub use engines::generation::genome::Genome;
pub use error::{Result, YagiError};
pub use types::{GenerationRecord, Individual, ObjectiveVector};
