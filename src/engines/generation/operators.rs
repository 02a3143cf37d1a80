use crate::error::{KarvaError, Result};
use crate::functions::{FuncWeight, FunctionRegistry};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use super::evolution_engine::Individual;
use super::gene::Symbol;

/// Draws random symbols for gene construction and point mutation.
///
/// Functions are drawn by their configured weight; each input terminal and
/// each constant slot carries an implicit weight of 1 in the head mix. Tail
/// positions draw uniformly from terminals only.
pub struct SymbolSampler {
    function_symbols: Vec<String>,
    head_distribution: WeightedIndex<u32>,
    num_terminals: usize,
    num_constants: usize,
    max_arity: usize,
}

impl SymbolSampler {
    pub fn new(
        registry: &FunctionRegistry,
        weights: &[FuncWeight],
        num_terminals: usize,
        num_constants: usize,
    ) -> Result<Self> {
        if num_terminals == 0 {
            return Err(KarvaError::Configuration(
                "num_terminals must be at least 1".to_string(),
            ));
        }
        let max_arity = registry.max_arity(weights)?;
        let mut combined: Vec<u32> = weights.iter().map(|fw| fw.weight).collect();
        combined.extend(std::iter::repeat(1).take(num_terminals + num_constants));
        let head_distribution = WeightedIndex::new(&combined).map_err(|e| {
            KarvaError::Configuration(format!("invalid function weight table: {}", e))
        })?;
        Ok(Self {
            function_symbols: weights.iter().map(|fw| fw.symbol.clone()).collect(),
            head_distribution,
            num_terminals,
            num_constants,
            max_arity,
        })
    }

    /// Maximum arity across the active function set; sizes gene tails.
    pub fn max_arity(&self) -> usize {
        self.max_arity
    }

    pub fn num_constants(&self) -> usize {
        self.num_constants
    }

    /// A symbol valid for a head position: weighted function or terminal.
    pub fn head_symbol<R: Rng>(&self, rng: &mut R) -> Symbol {
        let pick = self.head_distribution.sample(rng);
        if pick < self.function_symbols.len() {
            Symbol::Func(self.function_symbols[pick].clone())
        } else {
            self.terminal_at(pick - self.function_symbols.len())
        }
    }

    /// A symbol valid for a tail position: terminals only.
    pub fn tail_symbol<R: Rng>(&self, rng: &mut R) -> Symbol {
        self.terminal_at(rng.gen_range(0..self.num_terminals + self.num_constants))
    }

    fn terminal_at(&self, pick: usize) -> Symbol {
        if pick < self.num_terminals {
            Symbol::Input(pick)
        } else {
            Symbol::Const(pick - self.num_terminals)
        }
    }
}

/// Roulette wheel selection: probability proportional to score.
///
/// Negative (and NaN) scores contribute nothing to the wheel; when the whole
/// population is scoreless the pick degrades to uniform random.
pub fn roulette_select<'a, I: Individual, R: Rng>(population: &'a [I], rng: &mut R) -> &'a I {
    let total: f64 = population.iter().map(|i| i.score().max(0.0)).sum();

    if total <= 0.0 {
        return &population[rng.gen_range(0..population.len())];
    }

    let mut spin = rng.gen::<f64>() * total;
    for individual in population {
        spin -= individual.score().max(0.0);
        if spin <= 0.0 {
            return individual;
        }
    }

    // Fallback
    &population[population.len() - 1]
}

/// Scan for the highest score; ties keep the first encountered, and a
/// population of NaN scores keeps the first entity.
pub fn select_champion<I: Individual>(population: &[I]) -> &I {
    let mut best = &population[0];
    for individual in &population[1..] {
        if individual.score() > best.score() {
            best = individual;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampler() -> SymbolSampler {
        let weights = vec![FuncWeight::new("+", 2), FuncWeight::new("sqrt", 1)];
        SymbolSampler::new(&FunctionRegistry::new(), &weights, 2, 1).unwrap()
    }

    #[test]
    fn test_tail_symbols_are_terminal_only() {
        let sampler = sampler();
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            assert!(!sampler.tail_symbol(&mut rng).is_function());
        }
    }

    #[test]
    fn test_head_symbols_cover_all_classes() {
        let sampler = sampler();
        let mut rng = rand::thread_rng();
        let mut saw_function = false;
        let mut saw_input = false;
        let mut saw_const = false;
        for _ in 0..500 {
            match sampler.head_symbol(&mut rng) {
                Symbol::Func(_) => saw_function = true,
                Symbol::Input(_) => saw_input = true,
                Symbol::Const(_) => saw_const = true,
            }
        }
        assert!(saw_function && saw_input && saw_const);
    }

    #[test]
    fn test_sampler_requires_terminals() {
        let weights = vec![FuncWeight::new("+", 1)];
        assert!(SymbolSampler::new(&FunctionRegistry::new(), &weights, 0, 0).is_err());
    }

    #[test]
    fn test_sampler_rejects_unknown_function() {
        let weights = vec![FuncWeight::new("sin", 1)];
        assert!(SymbolSampler::new(&FunctionRegistry::new(), &weights, 1, 0).is_err());
    }

    #[test]
    fn test_max_arity_reflects_function_set() {
        assert_eq!(sampler().max_arity(), 2);
        let unary = vec![FuncWeight::new("neg", 1)];
        let unary_sampler = SymbolSampler::new(&FunctionRegistry::new(), &unary, 1, 0).unwrap();
        assert_eq!(unary_sampler.max_arity(), 1);
    }
}
