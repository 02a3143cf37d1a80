use crate::config::GepConfig;
use crate::error::{KarvaError, Result};
use crate::functions::{Function, FunctionRegistry};
use crate::types::EvolutionMode;
use rand::Rng;
use std::ops::Range;
use std::sync::Arc;

use super::evolution_engine::Individual;
use super::genome::Genome;
use super::operators::SymbolSampler;

/// An ordered ensemble of genomes combined through its own linking function,
/// for problems that need multiple cooperating expressions. Mirrors the
/// Genome operator surface one level up.
#[derive(Clone)]
pub struct GenomeSet {
    genomes: Vec<Genome>,
    link_symbol: String,
    link: Arc<dyn Function>,
    pub score: f64,
}

impl GenomeSet {
    pub fn new(
        genomes: Vec<Genome>,
        link_symbol: &str,
        registry: &FunctionRegistry,
    ) -> Result<GenomeSet> {
        if genomes.is_empty() {
            return Err(KarvaError::Configuration(
                "genome set requires at least one genome".to_string(),
            ));
        }
        let link = registry.resolve(link_symbol)?;
        if link.arity() != 2 {
            return Err(KarvaError::Configuration(format!(
                "link function {:?} must be binary",
                link_symbol
            )));
        }
        Ok(GenomeSet {
            genomes,
            link_symbol: link_symbol.to_string(),
            link,
            score: 0.0,
        })
    }

    pub fn random<R: Rng>(
        num_genomes: usize,
        num_genes: usize,
        head_size: usize,
        sampler: &SymbolSampler,
        registry: &Arc<FunctionRegistry>,
        link_symbol: &str,
        rng: &mut R,
    ) -> Result<GenomeSet> {
        let genomes = (0..num_genomes)
            .map(|_| Genome::random(num_genes, head_size, sampler, registry, link_symbol, rng))
            .collect::<Result<Vec<Genome>>>()?;
        GenomeSet::new(genomes, link_symbol, registry)
    }

    /// Rebuild a set from stored Karva strings, one entry per genome.
    pub fn from_karva(
        karva: &[Vec<String>],
        head_size: usize,
        link_symbol: &str,
        registry: &Arc<FunctionRegistry>,
    ) -> Result<GenomeSet> {
        let genomes = karva
            .iter()
            .map(|genome| Genome::from_karva(genome, head_size, link_symbol, registry))
            .collect::<Result<Vec<Genome>>>()?;
        GenomeSet::new(genomes, link_symbol, registry)
    }

    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    pub fn symbol_len(&self) -> usize {
        self.genomes.iter().map(|genome| genome.symbol_len()).sum()
    }

    /// Fold the per-genome outputs through the set's link function.
    pub fn evaluate(&self, inputs: &[f64]) -> f64 {
        let mut outputs = self.genomes.iter().map(|genome| genome.evaluate(inputs));
        let first = match outputs.next() {
            Some(output) => output,
            None => return f64::NAN,
        };
        outputs.fold(first, |acc, output| self.link.apply(&[acc, output]))
    }

    /// Per-genome outputs, for callers that score the ensemble members
    /// individually.
    pub fn evaluate_each(&self, inputs: &[f64]) -> Vec<f64> {
        self.genomes
            .iter()
            .map(|genome| genome.evaluate(inputs))
            .collect()
    }

    pub fn expression(&self, variables: &[&str]) -> Result<String> {
        let parts = self
            .genomes
            .iter()
            .map(|genome| genome.expression(variables))
            .collect::<Result<Vec<String>>>()?;
        Ok(parts.join(&format!(" {} ", self.link_symbol)))
    }

    /// Genome transposition: a non-first genome moves to the front,
    /// remainder order preserved.
    pub fn transpose_genome<R: Rng>(&mut self, rng: &mut R) {
        if self.genomes.len() < 2 {
            return;
        }
        let index = rng.gen_range(1..self.genomes.len());
        let genome = self.genomes.remove(index);
        self.genomes.insert(0, genome);
    }

    pub(crate) fn swap_symbol_range(a: &mut GenomeSet, b: &mut GenomeSet, range: Range<usize>) {
        debug_assert_eq!(a.symbol_len(), b.symbol_len());
        let mut offset = 0;
        for (genome_a, genome_b) in a.genomes.iter_mut().zip(b.genomes.iter_mut()) {
            let len = genome_a.symbol_len();
            let start = range.start.max(offset);
            let end = range.end.min(offset + len);
            if start < end {
                Genome::swap_symbol_range(genome_a, genome_b, start - offset..end - offset);
            }
            offset += len;
        }
    }

    pub fn one_point_at(first: &GenomeSet, second: &GenomeSet, point: usize) -> (GenomeSet, GenomeSet) {
        let mut a = first.clone();
        let mut b = second.clone();
        let len = a.symbol_len();
        GenomeSet::swap_symbol_range(&mut a, &mut b, point..len);
        (a, b)
    }

    pub fn two_point_at(
        first: &GenomeSet,
        second: &GenomeSet,
        range: Range<usize>,
    ) -> (GenomeSet, GenomeSet) {
        let mut a = first.clone();
        let mut b = second.clone();
        GenomeSet::swap_symbol_range(&mut a, &mut b, range);
        (a, b)
    }

    /// Whole-genome recombination: the set-level analog of swapping one
    /// gene between genomes.
    pub fn swap_genome_at(
        first: &GenomeSet,
        second: &GenomeSet,
        index: usize,
    ) -> (GenomeSet, GenomeSet) {
        let mut a = first.clone();
        let mut b = second.clone();
        std::mem::swap(&mut a.genomes[index], &mut b.genomes[index]);
        (a, b)
    }
}

impl PartialEq for GenomeSet {
    fn eq(&self, other: &Self) -> bool {
        self.genomes == other.genomes && self.link_symbol == other.link_symbol
    }
}

impl std::fmt::Debug for GenomeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenomeSet")
            .field("genomes", &self.genomes)
            .field("link", &self.link_symbol)
            .field("score", &self.score)
            .finish()
    }
}

impl Individual for GenomeSet {
    const MODE: EvolutionMode = EvolutionMode::GenomeSet;

    fn population_size(config: &GepConfig) -> usize {
        config.num_genome_sets
    }

    fn random<R: Rng>(
        config: &GepConfig,
        registry: &Arc<FunctionRegistry>,
        sampler: &SymbolSampler,
        rng: &mut R,
    ) -> Result<Self> {
        GenomeSet::random(
            config.num_genomes_per_set,
            config.num_genes_per_genome,
            config.head_size,
            sampler,
            registry,
            &config.link_func,
            rng,
        )
    }

    fn score(&self) -> f64 {
        self.score
    }

    fn set_score(&mut self, score: f64) {
        self.score = score;
    }

    fn apply_variation<R: Rng>(
        &mut self,
        config: &GepConfig,
        sampler: &SymbolSampler,
        rng: &mut R,
    ) {
        for genome in &mut self.genomes {
            genome.apply_variation(config, sampler, rng);
        }
        if rng.gen::<f64>() < config.p_gene {
            self.transpose_genome(rng);
        }
    }

    fn crossover_one_point<R: Rng>(first: &Self, second: &Self, rng: &mut R) -> (Self, Self) {
        let point = rng.gen_range(1..first.symbol_len());
        GenomeSet::one_point_at(first, second, point)
    }

    fn crossover_two_point<R: Rng>(first: &Self, second: &Self, rng: &mut R) -> (Self, Self) {
        let len = first.symbol_len();
        let mut start = rng.gen_range(1..len);
        let mut end = rng.gen_range(1..len);
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }
        GenomeSet::two_point_at(first, second, start..end)
    }

    fn swap_component<R: Rng>(first: &Self, second: &Self, rng: &mut R) -> (Self, Self) {
        let index = rng.gen_range(0..first.genomes.len());
        GenomeSet::swap_genome_at(first, second, index)
    }

    fn karva_expressions(&self) -> Vec<Vec<String>> {
        self.genomes
            .iter()
            .map(|genome| genome.karva_strings())
            .collect()
    }

    fn describe(&self) -> String {
        self.expression(&[]).unwrap_or_else(|_| {
            self.karva_expressions()
                .iter()
                .map(|genome| genome.join(" | "))
                .collect::<Vec<String>>()
                .join(" || ")
        })
    }
}
