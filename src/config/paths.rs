use super::traits::{invalid, ConfigSection};
use crate::engines::evaluation::runner::SimulationWorkspace;
use crate::error::YagiError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Locations of the external engine and of the files it exchanges with us.
/// Relative entries are resolved against `base_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub base_dir: PathBuf,
    pub exe_dir: PathBuf,
    pub exe_file: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Two-line file piped to the engine's standard input
    pub instruction_file: PathBuf,
    pub main_input_file: PathBuf,
    pub main_output_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            exe_dir: PathBuf::from("exe"),
            exe_file: PathBuf::from("nec2dxs1K5.exe"),
            input_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("data"),
            instruction_file: PathBuf::from("nec2dSopt.tmp"),
            main_input_file: PathBuf::from("input.nec"),
            main_output_file: PathBuf::from("output.out"),
        }
    }
}

impl PathsConfig {
    fn resolve(&self, path: &Path) -> PathBuf {
        let joined = self.base_dir.join(path);
        std::path::absolute(&joined).unwrap_or(joined)
    }

    /// Resolve every path into the fixed set of files one simulation uses.
    pub fn workspace(&self) -> SimulationWorkspace {
        SimulationWorkspace {
            exe_dir: self.resolve(&self.exe_dir),
            exe_file: self.resolve(&self.exe_dir.join(&self.exe_file)),
            instruction_file: self.resolve(&self.exe_dir.join(&self.instruction_file)),
            deck_path: self.resolve(&self.input_dir.join(&self.main_input_file)),
            report_path: self.resolve(&self.output_dir.join(&self.main_output_file)),
        }
    }
}

impl ConfigSection for PathsConfig {
    fn section_name() -> &'static str {
        "paths"
    }

    fn validate(&self) -> Result<(), YagiError> {
        for (name, value) in [
            ("exe_file", &self.exe_file),
            ("instruction_file", &self.instruction_file),
            ("main_input_file", &self.main_input_file),
            ("main_output_file", &self.main_output_file),
        ] {
            if value.as_os_str().is_empty() {
                return Err(invalid::<Self>(format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }
}
