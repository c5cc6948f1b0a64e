use super::traits::{invalid, ConfigSection};
use crate::error::YagiError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub csv_output_file: PathBuf,
    /// JSON run report (logbook and hall of fame); skipped when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_file: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_output_file: PathBuf::from("optimized_individuals.csv"),
            report_file: None,
        }
    }
}

impl ConfigSection for OutputConfig {
    fn section_name() -> &'static str {
        "output"
    }

    fn validate(&self) -> Result<(), YagiError> {
        if self.csv_output_file.as_os_str().is_empty() {
            return Err(invalid::<Self>("csv_output_file must not be empty"));
        }
        Ok(())
    }
}
