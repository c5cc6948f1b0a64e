use crate::config::{AppConfig, EvaluationMode};
use crate::engines::generation::RunOutcome;
use crate::error::{Result, YagiError};
use crate::types::{GenerationRecord, Individual};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Archive member as written to the report, with the advisory impedance
/// tolerance check alongside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub individual: Individual,
    pub within_tolerance: bool,
}

/// JSON summary of one optimisation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub mode: EvaluationMode,
    pub seed: Option<u64>,
    pub num_elements: usize,
    pub population_size: usize,
    pub generations_completed: usize,
    pub evaluations: usize,
    pub cancelled: bool,
    pub logbook: Vec<GenerationRecord>,
    pub hall_of_fame: Vec<ArchiveEntry>,
}

impl RunReport {
    pub fn new(config: &AppConfig, outcome: &RunOutcome) -> Self {
        let genetic = &config.genetic_algorithm;
        let hall_of_fame = outcome
            .hall_of_fame
            .iter()
            .map(|individual| ArchiveEntry {
                within_tolerance: !individual.fitness().is_failure()
                    && genetic.within_tolerance(individual.fitness().real_penalty),
                individual: individual.clone(),
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            mode: config.simulation.mode,
            seed: genetic.seed,
            num_elements: genetic.num_elements,
            population_size: genetic.population_size,
            generations_completed: outcome.logbook.len(),
            evaluations: outcome.evaluations,
            cancelled: outcome.cancelled,
            logbook: outcome.logbook.clone(),
            hall_of_fame,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)
            .map_err(|e| YagiError::Export(format!("cannot write {}: {}", path.display(), e)))
    }
}
