use crate::error::{KarvaError, Result};
use crate::functions::{FuncWeight, FunctionRegistry};
use crate::types::EvolutionMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete model parameters for one evolutionary run.
///
/// Loaded from a TOML file or built in code; either way the value is
/// validated once, at engine construction, before any evolutionary work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GepConfig {
    /// Iteration budget for the evolution loop
    pub iterations: usize,
    /// Gene head length; tail length is derived from the function set
    pub head_size: usize,
    /// Population size in Genome mode
    pub num_genomes: usize,
    /// Population size in GenomeSet mode
    pub num_genome_sets: usize,
    pub num_genes_per_genome: usize,
    pub num_genomes_per_set: usize,
    /// Number of input slots (`d0`, `d1`, ...)
    pub num_terminals: usize,
    /// Number of per-gene random constants (`c0`, `c1`, ...)
    pub num_constants: usize,
    /// Point mutation probability, gated per gene
    pub p_mutate: f64,
    /// Insertion-sequence transposition probability and length bound
    pub p_is: f64,
    pub gl_is: usize,
    /// Root insertion-sequence transposition probability and length bound
    pub p_ris: f64,
    pub gl_ris: usize,
    /// Gene (genome, at set level) transposition probability
    pub p_gene: f64,
    /// One-point recombination probability
    pub p_one_point: f64,
    /// Two-point recombination probability
    pub p_two_point: f64,
    /// Whole-gene recombination probability
    pub p_gene_recomb: f64,
    /// Binary symbol linking gene outputs (and genome outputs at set level)
    pub link_func: String,
    pub mode: EvolutionMode,
    /// Fixed seed for reproducible runs; entropy-seeded when absent
    pub seed: Option<u64>,
    /// Active function set with selection weights
    pub function_weights: Vec<FuncWeight>,
}

impl Default for GepConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            head_size: 5,
            num_genomes: 200,
            num_genome_sets: 200,
            num_genes_per_genome: 2,
            num_genomes_per_set: 2,
            num_terminals: 1,
            num_constants: 0,
            p_mutate: 0.8,
            p_is: 0.5,
            gl_is: 3,
            p_ris: 0.5,
            gl_ris: 3,
            p_gene: 0.5,
            p_one_point: 0.01,
            p_two_point: 0.01,
            p_gene_recomb: 0.01,
            link_func: "+".to_string(),
            mode: EvolutionMode::Genome,
            seed: None,
            function_weights: vec![
                FuncWeight::new("+", 1),
                FuncWeight::new("-", 1),
                FuncWeight::new("*", 1),
                FuncWeight::new("/", 1),
            ],
        }
    }
}

impl GepConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<GepConfig> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| KarvaError::Configuration(format!("Failed to read config: {}", e)))?;
        let config: GepConfig = toml::from_str(&contents)
            .map_err(|e| KarvaError::Configuration(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| KarvaError::Configuration(format!("Failed to serialize: {}", e)))?;
        std::fs::write(path, toml_str)
            .map_err(|e| KarvaError::Configuration(format!("Failed to write config: {}", e)))?;
        Ok(())
    }

    /// Exhaustive validation; every rejection names the offending field.
    pub fn validate(&self, registry: &FunctionRegistry) -> Result<()> {
        if self.iterations == 0 {
            return Err(KarvaError::Configuration(
                "iterations must be at least 1".to_string(),
            ));
        }
        if self.head_size == 0 {
            return Err(KarvaError::Configuration(
                "head_size must be at least 1".to_string(),
            ));
        }
        if self.num_terminals == 0 {
            return Err(KarvaError::Configuration(
                "num_terminals must be at least 1".to_string(),
            ));
        }
        if self.num_genes_per_genome == 0 {
            return Err(KarvaError::Configuration(
                "num_genes_per_genome must be at least 1".to_string(),
            ));
        }
        match self.mode {
            EvolutionMode::Genome => {
                if self.num_genomes < 2 {
                    return Err(KarvaError::Configuration(
                        "num_genomes must be at least 2".to_string(),
                    ));
                }
            }
            EvolutionMode::GenomeSet => {
                if self.num_genome_sets < 2 {
                    return Err(KarvaError::Configuration(
                        "num_genome_sets must be at least 2".to_string(),
                    ));
                }
                if self.num_genomes_per_set == 0 {
                    return Err(KarvaError::Configuration(
                        "num_genomes_per_set must be at least 1".to_string(),
                    ));
                }
            }
        }
        if self.gl_is == 0 {
            return Err(KarvaError::Configuration(
                "gl_is must be at least 1".to_string(),
            ));
        }
        if self.gl_ris == 0 {
            return Err(KarvaError::Configuration(
                "gl_ris must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("p_mutate", self.p_mutate),
            ("p_is", self.p_is),
            ("p_ris", self.p_ris),
            ("p_gene", self.p_gene),
            ("p_one_point", self.p_one_point),
            ("p_two_point", self.p_two_point),
            ("p_gene_recomb", self.p_gene_recomb),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(KarvaError::Configuration(format!(
                    "{} must be between 0 and 1",
                    name
                )));
            }
        }
        if self.function_weights.is_empty() {
            return Err(KarvaError::Configuration(
                "function_weights must not be empty".to_string(),
            ));
        }
        for fw in &self.function_weights {
            if registry.get(&fw.symbol).is_none() {
                return Err(KarvaError::Configuration(format!(
                    "function_weights names unknown symbol {:?}",
                    fw.symbol
                )));
            }
        }
        if self.function_weights.iter().all(|fw| fw.weight == 0) {
            return Err(KarvaError::Configuration(
                "function_weights must carry at least one non-zero weight".to_string(),
            ));
        }
        let link = registry.resolve(&self.link_func).map_err(|_| {
            KarvaError::Configuration(format!("link_func names unknown symbol {:?}", self.link_func))
        })?;
        if link.arity() != 2 {
            return Err(KarvaError::Configuration(format!(
                "link_func {:?} must be binary",
                self.link_func
            )));
        }
        Ok(())
    }
}
