//! Gene Expression Programming engine.
//!
//! Chromosomes are fixed-length symbol strings in Karva notation, decoded
//! breadth-first into expression trees and evaluated over numeric input
//! vectors. Genes compose into genomes, genomes into genome sets, each level
//! folded through a linking function; the evolution engine breeds whole
//! populations against a caller-supplied fitness function with concurrent
//! evaluation and elitist generational replacement.

pub mod config;
pub mod engines;
pub mod error;
pub mod functions;
pub mod types;

pub use config::GepConfig;
pub use engines::generation::{
    EvolutionEngine, EvolutionObserver, EvolutionOutcome, Gene, Genome, GenomeSet, Individual,
    LogObserver, NullObserver,
};
pub use error::{KarvaError, Result};
pub use functions::{FuncWeight, FunctionRegistry};
pub use types::{EvolutionMode, Record};
