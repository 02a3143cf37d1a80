pub mod evolution_engine;
pub mod gene;
pub mod genome;
pub mod genome_set;
pub mod operators;
pub mod progress;

pub use evolution_engine::{
    EvolutionEngine, EvolutionObserver, EvolutionOutcome, Individual, NullObserver,
};
pub use gene::{Gene, Symbol, Tree};
pub use genome::Genome;
pub use genome_set::GenomeSet;
pub use operators::SymbolSampler;
pub use progress::{ChannelObserver, GenerationUpdate, LogObserver};
