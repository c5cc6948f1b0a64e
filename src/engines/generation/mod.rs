pub mod evolution_engine;
pub mod genome;
pub mod hall_of_fame;
pub mod operators;
pub mod pareto;
pub mod progress;

pub use evolution_engine::{EvolutionConfig, EvolutionEngine, RunOutcome};
pub use genome::{GeneLayout, Genome};
pub use hall_of_fame::HallOfFame;
pub use pareto::OptimizationDirection;
pub use progress::{
    ChannelProgressCallback, ConsoleProgressCallback, FnProgress, NoProgress, ProgressCallback,
    ProgressMessage,
};
