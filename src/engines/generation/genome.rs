use crate::config::GepConfig;
use crate::error::{KarvaError, Result};
use crate::functions::{Function, FunctionRegistry};
use crate::types::EvolutionMode;
use rand::Rng;
use std::ops::Range;
use std::sync::Arc;

use super::evolution_engine::Individual;
use super::gene::Gene;
use super::operators::SymbolSampler;

/// An ordered sequence of genes combined through a linking function.
///
/// Each gene evaluates independently; the link (a binary, commutative
/// operation such as `+`) folds the per-gene outputs into one scalar. The
/// `score` field is transient bookkeeping, recomputed on every fitness pass
/// and excluded from equality.
#[derive(Clone)]
pub struct Genome {
    genes: Vec<Gene>,
    link_symbol: String,
    link: Arc<dyn Function>,
    pub score: f64,
}

impl Genome {
    pub fn new(genes: Vec<Gene>, link_symbol: &str, registry: &FunctionRegistry) -> Result<Genome> {
        if genes.is_empty() {
            return Err(KarvaError::Configuration(
                "genome requires at least one gene".to_string(),
            ));
        }
        let link = registry.resolve(link_symbol)?;
        if link.arity() != 2 {
            return Err(KarvaError::Configuration(format!(
                "link function {:?} must be binary",
                link_symbol
            )));
        }
        Ok(Genome {
            genes,
            link_symbol: link_symbol.to_string(),
            link,
            score: 0.0,
        })
    }

    pub fn random<R: Rng>(
        num_genes: usize,
        head_size: usize,
        sampler: &SymbolSampler,
        registry: &Arc<FunctionRegistry>,
        link_symbol: &str,
        rng: &mut R,
    ) -> Result<Genome> {
        let genes = (0..num_genes)
            .map(|_| Gene::random(head_size, sampler, registry.clone(), rng))
            .collect();
        Genome::new(genes, link_symbol, registry)
    }

    /// Rebuild a genome from stored Karva strings (record replay).
    pub fn from_karva(
        karva: &[String],
        head_size: usize,
        link_symbol: &str,
        registry: &Arc<FunctionRegistry>,
    ) -> Result<Genome> {
        let genes = karva
            .iter()
            .map(|expression| Gene::parse(expression, head_size, registry.clone()))
            .collect::<Result<Vec<Gene>>>()?;
        Genome::new(genes, link_symbol, registry)
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn link_symbol(&self) -> &str {
        &self.link_symbol
    }

    /// Total linear length: the concatenation of all gene chromosomes.
    pub fn symbol_len(&self) -> usize {
        self.genes.iter().map(|gene| gene.len()).sum()
    }

    /// Evaluate every gene and fold the outputs through the link function.
    /// Non-finite gene outputs propagate into the fold untouched.
    pub fn evaluate(&self, inputs: &[f64]) -> f64 {
        let mut outputs = self.genes.iter().map(|gene| gene.evaluate(inputs));
        let first = match outputs.next() {
            Some(output) => output,
            None => return f64::NAN,
        };
        outputs.fold(first, |acc, output| self.link.apply(&[acc, output]))
    }

    pub fn karva_strings(&self) -> Vec<String> {
        self.genes.iter().map(|gene| gene.karva()).collect()
    }

    /// Human-readable diagnostic form: per-gene expressions joined by the
    /// link operator's textual symbol.
    pub fn expression(&self, variables: &[&str]) -> Result<String> {
        let parts = self
            .genes
            .iter()
            .map(|gene| gene.expression(variables))
            .collect::<Result<Vec<String>>>()?;
        Ok(parts.join(&format!(" {} ", self.link_symbol)))
    }

    /// Gene transposition: a non-first gene moves to the front, preserving
    /// the order of the remainder. Gene count never changes.
    pub fn transpose_gene<R: Rng>(&mut self, rng: &mut R) {
        if self.genes.len() < 2 {
            return;
        }
        let index = rng.gen_range(1..self.genes.len());
        let gene = self.genes.remove(index);
        self.genes.insert(0, gene);
    }

    /// Apply the probability-gated unary operators, each rolled
    /// independently per gene.
    pub fn apply_variation<R: Rng>(
        &mut self,
        config: &GepConfig,
        sampler: &SymbolSampler,
        rng: &mut R,
    ) {
        for gene in &mut self.genes {
            if rng.gen::<f64>() < config.p_mutate {
                gene.point_mutate(sampler, rng);
            }
            if rng.gen::<f64>() < config.p_is {
                gene.is_transpose(config.gl_is, rng);
            }
            if rng.gen::<f64>() < config.p_ris {
                gene.ris_transpose(config.gl_ris, rng);
            }
        }
        if rng.gen::<f64>() < config.p_gene {
            self.transpose_gene(rng);
        }
    }

    /// Swap a range of the concatenated linear forms between two genomes of
    /// identical shape. Per-gene constant tables stay with their gene.
    pub(crate) fn swap_symbol_range(a: &mut Genome, b: &mut Genome, range: Range<usize>) {
        debug_assert_eq!(a.symbol_len(), b.symbol_len());
        let mut offset = 0;
        for (gene_a, gene_b) in a.genes.iter_mut().zip(b.genes.iter_mut()) {
            let len = gene_a.len();
            let start = range.start.max(offset);
            let end = range.end.min(offset + len);
            if start < end {
                let (local_start, local_end) = (start - offset, end - offset);
                gene_a.symbols[local_start..local_end]
                    .swap_with_slice(&mut gene_b.symbols[local_start..local_end]);
            }
            offset += len;
        }
    }

    /// One-point recombination at a fixed cut: offspring exchange every
    /// symbol at or after `point`. Applying it twice at the same point
    /// returns the parents.
    pub fn one_point_at(first: &Genome, second: &Genome, point: usize) -> (Genome, Genome) {
        let mut a = first.clone();
        let mut b = second.clone();
        let len = a.symbol_len();
        Genome::swap_symbol_range(&mut a, &mut b, point..len);
        (a, b)
    }

    /// Two-point recombination at fixed cuts: the segment between them is
    /// exchanged.
    pub fn two_point_at(first: &Genome, second: &Genome, range: Range<usize>) -> (Genome, Genome) {
        let mut a = first.clone();
        let mut b = second.clone();
        Genome::swap_symbol_range(&mut a, &mut b, range);
        (a, b)
    }

    /// Whole-gene recombination: offspring exchange the complete gene (its
    /// constant table included) at one index.
    pub fn swap_gene_at(first: &Genome, second: &Genome, index: usize) -> (Genome, Genome) {
        let mut a = first.clone();
        let mut b = second.clone();
        std::mem::swap(&mut a.genes[index], &mut b.genes[index]);
        (a, b)
    }
}

impl PartialEq for Genome {
    fn eq(&self, other: &Self) -> bool {
        self.genes == other.genes && self.link_symbol == other.link_symbol
    }
}

impl std::fmt::Debug for Genome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Genome")
            .field("genes", &self.karva_strings())
            .field("link", &self.link_symbol)
            .field("score", &self.score)
            .finish()
    }
}

impl Individual for Genome {
    const MODE: EvolutionMode = EvolutionMode::Genome;

    fn population_size(config: &GepConfig) -> usize {
        config.num_genomes
    }

    fn random<R: Rng>(
        config: &GepConfig,
        registry: &Arc<FunctionRegistry>,
        sampler: &SymbolSampler,
        rng: &mut R,
    ) -> Result<Self> {
        Genome::random(
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
        Genome::apply_variation(self, config, sampler, rng);
    }

    fn crossover_one_point<R: Rng>(first: &Self, second: &Self, rng: &mut R) -> (Self, Self) {
        let point = rng.gen_range(1..first.symbol_len());
        Genome::one_point_at(first, second, point)
    }

    fn crossover_two_point<R: Rng>(first: &Self, second: &Self, rng: &mut R) -> (Self, Self) {
        let len = first.symbol_len();
        let mut start = rng.gen_range(1..len);
        let mut end = rng.gen_range(1..len);
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }
        Genome::two_point_at(first, second, start..end)
    }

    fn swap_component<R: Rng>(first: &Self, second: &Self, rng: &mut R) -> (Self, Self) {
        let index = rng.gen_range(0..first.genes.len());
        Genome::swap_gene_at(first, second, index)
    }

    fn karva_expressions(&self) -> Vec<Vec<String>> {
        vec![self.karva_strings()]
    }

    fn describe(&self) -> String {
        self.expression(&[])
            .unwrap_or_else(|_| self.karva_strings().join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::FuncWeight;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn registry() -> Arc<FunctionRegistry> {
        Arc::new(FunctionRegistry::new())
    }

    fn sampler() -> SymbolSampler {
        let weights = vec![
            FuncWeight::new("+", 1),
            FuncWeight::new("-", 1),
            FuncWeight::new("*", 1),
            FuncWeight::new("/", 1),
        ];
        SymbolSampler::new(&FunctionRegistry::new(), &weights, 1, 0).unwrap()
    }

    fn genome_from(karva: &[&str], head_size: usize) -> Genome {
        let strings: Vec<String> = karva.iter().map(|s| s.to_string()).collect();
        Genome::from_karva(&strings, head_size, "+", &registry()).unwrap()
    }

    #[test]
    fn test_link_function_folds_gene_outputs() {
        // (d0 + d0) + (d0 * d0) = 2a + a^2
        let genome = genome_from(&["+.d0.d0.d0.d0", "*.d0.d0.d0.d0"], 2);
        assert_eq!(genome.evaluate(&[3.0]), 15.0);
    }

    #[test]
    fn test_link_function_must_be_binary() {
        let gene = Gene::parse("+.d0.d0.d0.d0", 2, registry()).unwrap();
        assert!(Genome::new(vec![gene], "sqrt", &FunctionRegistry::new()).is_err());
    }

    #[test]
    fn test_expression_joins_with_link_symbol() {
        let genome = genome_from(&["+.d0.d0.d0.d0", "*.d0.d0.d0.d0"], 2);
        assert_eq!(
            genome.expression(&["a"]).unwrap(),
            "(a + a) + (a * a)"
        );
    }

    #[test]
    fn test_gene_transposition_reorders_without_resizing() {
        let genome = genome_from(&["+.d0.d0.d0.d0", "*.d0.d0.d0.d0", "-.d0.d0.d0.d0"], 2);
        let mut moved = genome.clone();
        let mut rng = StdRng::seed_from_u64(5);
        moved.transpose_gene(&mut rng);
        assert_eq!(moved.genes().len(), 3);
        // the set of genes is preserved, only order changes
        let mut before = genome.karva_strings();
        let mut after = moved.karva_strings();
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn test_one_point_recombination_is_involution() {
        let first = genome_from(&["+.d0.d0.d0.d0", "*.d0.d0.d0.d0"], 2);
        let second = genome_from(&["-.d0.d0.d0.d0", "/.d0.d0.d0.d0"], 2);
        for point in 1..first.symbol_len() {
            let (a, b) = Genome::one_point_at(&first, &second, point);
            assert_eq!(a.symbol_len(), first.symbol_len());
            let (back_a, back_b) = Genome::one_point_at(&a, &b, point);
            assert_eq!(back_a, first);
            assert_eq!(back_b, second);
        }
    }

    #[test]
    fn test_two_point_recombination_is_involution() {
        let first = genome_from(&["+.d0.d0.d0.d0", "*.d0.d0.d0.d0"], 2);
        let second = genome_from(&["-.d0.d0.d0.d0", "/.d0.d0.d0.d0"], 2);
        let len = first.symbol_len();
        for start in 1..len {
            for end in start..len {
                let (a, b) = Genome::two_point_at(&first, &second, start..end);
                let (back_a, back_b) = Genome::two_point_at(&a, &b, start..end);
                assert_eq!(back_a, first);
                assert_eq!(back_b, second);
            }
        }
    }

    #[test]
    fn test_one_point_crosses_gene_boundary() {
        let first = genome_from(&["+.d0.d0.d0.d0", "*.d0.d0.d0.d0"], 2);
        let second = genome_from(&["-.d0.d0.d0.d0", "/.d0.d0.d0.d0"], 2);
        // cut inside the first gene: the second gene swaps wholesale
        let (a, _) = Genome::one_point_at(&first, &second, 1);
        assert_eq!(a.karva_strings()[1], "/.d0.d0.d0.d0");
    }

    #[test]
    fn test_gene_recombination_swaps_one_slot() {
        let first = genome_from(&["+.d0.d0.d0.d0", "*.d0.d0.d0.d0"], 2);
        let second = genome_from(&["-.d0.d0.d0.d0", "/.d0.d0.d0.d0"], 2);
        let (a, b) = Genome::swap_gene_at(&first, &second, 1);
        assert_eq!(a.karva_strings(), vec!["+.d0.d0.d0.d0", "/.d0.d0.d0.d0"]);
        assert_eq!(b.karva_strings(), vec!["-.d0.d0.d0.d0", "*.d0.d0.d0.d0"]);
    }

    #[test]
    fn test_variation_preserves_shape() {
        let config = GepConfig::default();
        let sampler = sampler();
        let mut rng = StdRng::seed_from_u64(99);
        let mut genome = Genome::random(
            config.num_genes_per_genome,
            config.head_size,
            &sampler,
            &registry(),
            "+",
            &mut rng,
        )
        .unwrap();
        let gene_count = genome.genes().len();
        let total_len = genome.symbol_len();
        for _ in 0..50 {
            Individual::apply_variation(&mut genome, &config, &sampler, &mut rng);
            assert_eq!(genome.genes().len(), gene_count);
            assert_eq!(genome.symbol_len(), total_len);
        }
    }
}
