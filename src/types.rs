use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which population shape a run evolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvolutionMode {
    Genome,
    GenomeSet,
}

impl std::fmt::Display for EvolutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvolutionMode::Genome => write!(f, "Genome"),
            EvolutionMode::GenomeSet => write!(f, "GenomeSet"),
        }
    }
}

/// Final result of a run: the winning entity reduced to its Karva strings.
///
/// `karva` holds one entry per genome, each a list of per-gene expressions,
/// so a plain Genome run produces a single entry and a GenomeSet run one
/// entry per member genome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub mode: EvolutionMode,
    pub score: f64,
    pub karva: Vec<Vec<String>>,
}

impl Record {
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Record> {
        let contents = std::fs::read_to_string(path)?;
        let record = serde_json::from_str(&contents)?;
        Ok(record)
    }
}
