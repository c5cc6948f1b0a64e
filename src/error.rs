use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum YagiError {
    #[error("Failed to write input deck {path:?}: {source}")]
    DeckWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Simulation invocation error: {0}")]
    SimulationInvocation(String),

    #[error("Output parse error: {0}")]
    OutputParse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Optimization worker error: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl YagiError {
    /// Errors that must terminate a run instead of being folded into the
    /// sentinel objective vector.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            YagiError::DeckWrite { .. } | YagiError::Configuration(_) | YagiError::Export(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, YagiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let deck = YagiError::DeckWrite {
            path: PathBuf::from("input.nec"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(deck.is_fatal());
        assert!(YagiError::Configuration("bad".into()).is_fatal());
        assert!(!YagiError::SimulationInvocation("boom".into()).is_fatal());
        assert!(!YagiError::OutputParse("no data".into()).is_fatal());
        assert!(!YagiError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "x")).is_fatal());
    }
}
