//! Genetic optimizer over CiM flip-count genomes — spec §4.I.

pub mod genome;
pub mod optimizer;
pub mod population;

pub use genome::Genome;
pub use optimizer::{FitnessContext, GaOptimizer, GaResult, GenerationSummary};
pub use population::Individual;
