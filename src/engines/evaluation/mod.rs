pub mod codec;
pub mod evaluator;
pub mod parametric;
pub mod parser;
pub mod runner;
pub mod sweep;

pub use codec::GeometryCodec;
pub use evaluator::ObjectiveEvaluator;
pub use parametric::{k_range, ParametricDeck};
pub use parser::{NecReportParser, ParsedReport, ReportParser};
pub use runner::{Nec2Runner, SimulationOutput, SimulationRunner, SimulationWorkspace};
pub use sweep::{ParameterSweep, SweepPoint};

use crate::error::Result;
use crate::types::ObjectiveVector;

/// Genome to objective-vector mapping driven by the evolution engine.
///
/// Implementations are called sequentially, one genome at a time. Errors
/// for which [`crate::YagiError::is_fatal`] is false are turned into the
/// sentinel vector by the caller.
pub trait ObjectiveFunction {
    fn evaluate(&mut self, genome: &[f64]) -> Result<ObjectiveVector>;
}
