use crate::engines::generation::genome::Genome;
use crate::engines::generation::pareto::{self, OptimizationDirection};
use serde::{Deserialize, Serialize};

/// Penalty written into every component of a failed evaluation.
pub const FAILURE_PENALTY: f64 = 1000.0;

/// Scores a candidate antenna is ranked on: gain is maximized, both
/// impedance penalties are minimized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveVector {
    pub gain_db: f64,
    pub real_penalty: f64,
    pub imag_penalty: f64,
}

impl ObjectiveVector {
    /// Substituted whenever the simulator fails or its report is unusable.
    pub const SENTINEL: ObjectiveVector = ObjectiveVector {
        gain_db: FAILURE_PENALTY,
        real_penalty: FAILURE_PENALTY,
        imag_penalty: FAILURE_PENALTY,
    };

    pub const DIRECTIONS: [OptimizationDirection; 3] = [
        OptimizationDirection::Maximize,
        OptimizationDirection::Minimize,
        OptimizationDirection::Minimize,
    ];

    pub fn new(gain_db: f64, real_penalty: f64, imag_penalty: f64) -> Self {
        Self {
            gain_db,
            real_penalty,
            imag_penalty,
        }
    }

    pub fn is_failure(&self) -> bool {
        *self == Self::SENTINEL
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.gain_db, self.real_penalty, self.imag_penalty]
    }

    pub fn from_array(values: [f64; 3]) -> Self {
        Self::new(values[0], values[1], values[2])
    }

    /// Pareto dominance with the sentinel pinned to the bottom: a failed
    /// vector dominates nothing and every real vector dominates it. The raw
    /// sentinel gain (1000 dB) would otherwise look unbeatable on the
    /// maximized axis.
    pub fn dominates(&self, other: &ObjectiveVector) -> bool {
        match (self.is_failure(), other.is_failure()) {
            (true, _) => false,
            (false, true) => true,
            (false, false) => {
                pareto::dominates(&self.to_array(), &other.to_array(), &Self::DIRECTIONS)
            }
        }
    }
}

/// A genome plus its cached objective vector. `objectives` is `None` until
/// the individual has been evaluated and is cleared again whenever
/// variation touches the genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub genome: Genome,
    pub objectives: Option<ObjectiveVector>,
}

impl Individual {
    pub fn new(genome: Genome) -> Self {
        Self {
            genome,
            objectives: None,
        }
    }

    pub fn is_evaluated(&self) -> bool {
        self.objectives.is_some()
    }

    pub fn invalidate(&mut self) {
        self.objectives = None;
    }

    /// Objective vector, treating a never-evaluated individual as failed.
    pub fn fitness(&self) -> ObjectiveVector {
        self.objectives.unwrap_or(ObjectiveVector::SENTINEL)
    }
}

/// Componentwise statistics of one completed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation: usize,
    pub evaluations: usize,
    pub avg: ObjectiveVector,
    pub min: ObjectiveVector,
    pub max: ObjectiveVector,
}

impl GenerationRecord {
    pub fn compile(generation: usize, evaluations: usize, population: &[Individual]) -> Self {
        let mut sum = [0.0; 3];
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];

        for individual in population {
            let values = individual.fitness().to_array();
            for k in 0..3 {
                sum[k] += values[k];
                min[k] = min[k].min(values[k]);
                max[k] = max[k].max(values[k]);
            }
        }

        let count = population.len().max(1) as f64;
        Self {
            generation,
            evaluations,
            avg: ObjectiveVector::from_array(sum.map(|s| s / count)),
            min: ObjectiveVector::from_array(min),
            max: ObjectiveVector::from_array(max),
        }
    }
}
