use super::traits::{check_probability, invalid, ConfigSection};
use crate::engines::generation::genome::{GeneLayout, MIN_SPACING};
use crate::error::YagiError;
use serde::{Deserialize, Serialize};

/// Length used for every element when lengths are locked without explicit values.
pub const DEFAULT_LOCKED_LENGTH: f64 = 0.3;
/// Spacing used for every gap when spacings are locked without explicit values.
pub const DEFAULT_LOCKED_SPACING: f64 = 0.15;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticAlgorithmConfig {
    pub num_elements: usize,
    pub min_length: f64,
    pub max_length: f64,
    /// Spacing genes are bounded by `total_distance / num_elements`
    pub total_distance: f64,
    pub lock_lengths: bool,
    pub lock_distances: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_lengths: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_distances: Option<Vec<f64>>,
    pub target_real_impedance: f64,
    /// Reported against, never folded into the objectives
    pub impedance_tolerance: f64,
    pub population_size: usize,
    pub num_generations: usize,
    pub crossover_probability: f64,
    pub mutation_probability: f64,
    /// Fraction of `population_size` surviving selection each generation
    pub selection_fraction: f64,
    pub hall_of_fame_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for GeneticAlgorithmConfig {
    fn default() -> Self {
        Self {
            num_elements: 3,
            min_length: 0.25,
            max_length: 0.5,
            total_distance: 1.0,
            lock_lengths: false,
            lock_distances: false,
            initial_lengths: None,
            initial_distances: None,
            target_real_impedance: 50.0,
            impedance_tolerance: 5.0,
            population_size: 50,
            num_generations: 100,
            crossover_probability: 0.2,
            mutation_probability: 0.1,
            selection_fraction: 0.6,
            hall_of_fame_size: 5,
            seed: Some(42),
        }
    }
}

impl GeneticAlgorithmConfig {
    pub fn genome_length(&self) -> usize {
        2 * self.num_elements - 1
    }

    pub fn max_spacing(&self) -> f64 {
        self.total_distance / self.num_elements as f64
    }

    /// Number of survivors kept by selection.
    pub fn mu(&self) -> usize {
        ((self.population_size as f64 * self.selection_fraction) as usize).max(1)
    }

    pub fn gene_layout(&self) -> GeneLayout {
        let locked_lengths = self
            .initial_lengths
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_LOCKED_LENGTH; self.num_elements]);
        let locked_spacings = self
            .initial_distances
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_LOCKED_SPACING; self.num_elements.saturating_sub(1)]);

        GeneLayout {
            num_elements: self.num_elements,
            length_bounds: self.min_length..=self.max_length,
            spacing_bounds: MIN_SPACING..=self.max_spacing(),
            lock_lengths: self.lock_lengths,
            lock_spacings: self.lock_distances,
            locked_lengths,
            locked_spacings,
        }
    }

    /// Whether a real impedance penalty is inside the advisory tolerance.
    pub fn within_tolerance(&self, real_penalty: f64) -> bool {
        real_penalty <= self.impedance_tolerance
    }
}

impl ConfigSection for GeneticAlgorithmConfig {
    fn section_name() -> &'static str {
        "genetic_algorithm"
    }

    fn validate(&self) -> Result<(), YagiError> {
        if self.num_elements < 2 {
            return Err(invalid::<Self>("num_elements must be at least 2"));
        }
        if !(self.min_length > 0.0) || self.min_length > self.max_length {
            return Err(invalid::<Self>(format!(
                "length bounds [{}, {}] are not a positive interval",
                self.min_length, self.max_length
            )));
        }
        if !self.lock_distances && !(self.max_spacing() > MIN_SPACING) {
            return Err(invalid::<Self>(format!(
                "total_distance / num_elements ({:.4}) must exceed the minimum spacing {}",
                self.max_spacing(),
                MIN_SPACING
            )));
        }
        if let Some(lengths) = &self.initial_lengths {
            if lengths.len() != self.num_elements {
                return Err(invalid::<Self>(format!(
                    "initial_lengths has {} values, expected {}",
                    lengths.len(),
                    self.num_elements
                )));
            }
        }
        if let Some(distances) = &self.initial_distances {
            if distances.len() != self.num_elements - 1 {
                return Err(invalid::<Self>(format!(
                    "initial_distances has {} values, expected {}",
                    distances.len(),
                    self.num_elements - 1
                )));
            }
        }
        if self.population_size < 2 {
            return Err(invalid::<Self>("population_size must be at least 2"));
        }
        if self.num_generations < 1 {
            return Err(invalid::<Self>("num_generations must be at least 1"));
        }
        check_probability::<Self>("crossover_probability", self.crossover_probability)?;
        check_probability::<Self>("mutation_probability", self.mutation_probability)?;
        if !(self.selection_fraction > 0.0 && self.selection_fraction <= 1.0) {
            return Err(invalid::<Self>("selection_fraction must be in (0, 1]"));
        }
        if self.hall_of_fame_size < 1 {
            return Err(invalid::<Self>("hall_of_fame_size must be at least 1"));
        }
        if self.impedance_tolerance < 0.0 {
            return Err(invalid::<Self>("impedance_tolerance must not be negative"));
        }
        Ok(())
    }
}
