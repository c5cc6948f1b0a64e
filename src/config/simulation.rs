use super::traits::{invalid, ConfigSection};
use crate::error::YagiError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// One simulation at `frequency`
    #[default]
    Single,
    /// Averaged over evenly spaced frequencies in `[min_freq, max_freq]`
    Sweep,
}

impl std::fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationMode::Single => write!(f, "single"),
            EvaluationMode::Sweep => write!(f, "sweep"),
        }
    }
}

impl std::str::FromStr for EvaluationMode {
    type Err = YagiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(EvaluationMode::Single),
            "sweep" => Ok(EvaluationMode::Sweep),
            other => Err(YagiError::Configuration(format!(
                "Unknown evaluation mode '{}', expected single or sweep",
                other
            ))),
        }
    }
}

/// Frequencies are in MHz.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub mode: EvaluationMode,
    pub frequency: f64,
    pub min_freq: f64,
    pub max_freq: f64,
    pub num_freq_steps: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            mode: EvaluationMode::Single,
            frequency: 144.0,
            min_freq: 143.0,
            max_freq: 145.0,
            num_freq_steps: 3,
        }
    }
}

impl SimulationConfig {
    /// Frequencies visited by a sweep evaluation. A single step collapses to
    /// the centre frequency rather than `min_freq`.
    pub fn sweep_frequencies(&self) -> Vec<f64> {
        if self.num_freq_steps <= 1 {
            return vec![self.frequency];
        }
        let step = (self.max_freq - self.min_freq) / (self.num_freq_steps - 1) as f64;
        (0..self.num_freq_steps)
            .map(|i| self.min_freq + i as f64 * step)
            .collect()
    }
}

impl ConfigSection for SimulationConfig {
    fn section_name() -> &'static str {
        "simulation"
    }

    fn validate(&self) -> Result<(), YagiError> {
        if !(self.frequency.is_finite() && self.frequency > 0.0) {
            return Err(invalid::<Self>("frequency must be positive"));
        }
        if self.num_freq_steps < 1 {
            return Err(invalid::<Self>("num_freq_steps must be at least 1"));
        }
        if self.mode == EvaluationMode::Sweep && self.num_freq_steps > 1 {
            if !(self.min_freq.is_finite() && self.min_freq > 0.0) {
                return Err(invalid::<Self>("min_freq must be positive"));
            }
            if !self.max_freq.is_finite() {
                return Err(invalid::<Self>("max_freq must be finite"));
            }
            if self.min_freq > self.max_freq {
                return Err(invalid::<Self>(format!(
                    "min_freq ({}) exceeds max_freq ({})",
                    self.min_freq, self.max_freq
                )));
            }
        }
        Ok(())
    }
}
