use crate::config::GepConfig;
use crate::error::Result;
use crate::functions::FunctionRegistry;
use crate::types::{EvolutionMode, Record};
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::sync::Arc;

use super::operators::{roulette_select, select_champion, SymbolSampler};

/// An entity the evolution loop can breed: a Genome or a GenomeSet.
///
/// The loop depends only on this surface; both implementations delegate to
/// the gene-level operators and differ in which configuration fields shape
/// them.
pub trait Individual: Clone + Send + Sync {
    const MODE: EvolutionMode;

    fn population_size(config: &GepConfig) -> usize;

    fn random<R: Rng>(
        config: &GepConfig,
        registry: &Arc<FunctionRegistry>,
        sampler: &SymbolSampler,
        rng: &mut R,
    ) -> Result<Self>;

    fn score(&self) -> f64;

    fn set_score(&mut self, score: f64);

    /// Apply the probability-gated unary operators (point mutation, IS/RIS
    /// transposition, component transposition) in place.
    fn apply_variation<R: Rng>(
        &mut self,
        config: &GepConfig,
        sampler: &SymbolSampler,
        rng: &mut R,
    );

    fn crossover_one_point<R: Rng>(first: &Self, second: &Self, rng: &mut R) -> (Self, Self);

    fn crossover_two_point<R: Rng>(first: &Self, second: &Self, rng: &mut R) -> (Self, Self);

    /// Swap one whole same-index component (gene, or genome at set level).
    fn swap_component<R: Rng>(first: &Self, second: &Self, rng: &mut R) -> (Self, Self);

    /// Karva strings for persistence: one entry per genome, one string per
    /// gene.
    fn karva_expressions(&self) -> Vec<Vec<String>>;

    /// Human-readable expression for diagnostics.
    fn describe(&self) -> String;
}

/// Per-generation side-effect hook, invoked with the current champion.
/// Return values never influence control flow.
pub trait EvolutionObserver<I> {
    fn on_generation(&mut self, iteration: usize, champion: &I);
}

impl<'a, I, O: EvolutionObserver<I>> EvolutionObserver<I> for &'a mut O {
    fn on_generation(&mut self, iteration: usize, champion: &I) {
        (**self).on_generation(iteration, champion)
    }
}

/// Observer that discards every update.
pub struct NullObserver;

impl<I> EvolutionObserver<I> for NullObserver {
    fn on_generation(&mut self, _iteration: usize, _champion: &I) {}
}

/// Terminal state of one run.
#[derive(Debug, Clone)]
pub struct EvolutionOutcome<I> {
    pub champion: I,
    pub iterations: usize,
    pub accomplished: bool,
}

impl<I: Individual> EvolutionOutcome<I> {
    pub fn to_record(&self) -> Record {
        Record {
            mode: I::MODE,
            score: self.champion.score(),
            karva: self.champion.karva_expressions(),
        }
    }
}

/// Drives one evolutionary run: init, concurrent evaluation, champion
/// selection, termination check, reproduction.
///
/// The engine owns the only random source; operators draw from it
/// sequentially during reproduction, so a fixed `seed` makes whole runs
/// reproducible. Only fitness evaluation runs in parallel, and it never
/// touches the generator.
pub struct EvolutionEngine {
    config: GepConfig,
    registry: Arc<FunctionRegistry>,
    sampler: SymbolSampler,
    rng: StdRng,
}

impl EvolutionEngine {
    /// Validates the configuration exhaustively; no evolutionary work
    /// happens past a bad config.
    pub fn new(config: GepConfig, registry: Arc<FunctionRegistry>) -> Result<Self> {
        config.validate(&registry)?;
        let sampler = SymbolSampler::new(
            &registry,
            &config.function_weights,
            config.num_terminals,
            config.num_constants,
        )?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            registry,
            sampler,
            rng,
        })
    }

    pub fn config(&self) -> &GepConfig {
        &self.config
    }

    /// Run the evolution loop until the champion reaches `target_fitness`
    /// or the iteration budget is exhausted.
    ///
    /// This is the standard wiring of [`run_with_performance`]: concurrent
    /// evaluation with `fitness`, highest score wins, accomplished once the
    /// champion meets the target.
    ///
    /// [`run_with_performance`]: EvolutionEngine::run_with_performance
    pub fn run<I, F, O>(
        &mut self,
        fitness: F,
        observer: O,
        target_fitness: f64,
    ) -> Result<EvolutionOutcome<I>>
    where
        I: Individual,
        F: Fn(&I) -> f64 + Sync,
        O: EvolutionObserver<I>,
    {
        self.run_with_performance(
            |_iteration, population: &mut [I]| {
                Self::evaluate_population(population, &fitness);
                let champion = select_champion(population).clone();
                let accomplished = champion.score() >= target_fitness;
                (champion, accomplished)
            },
            observer,
        )
    }

    /// Run the evolution loop with a caller-supplied selection policy.
    ///
    /// `performance` receives the iteration number and the whole population,
    /// scores it however it likes, and returns the generation's champion
    /// plus an accomplished flag that ends the run early. The loop only
    /// guarantees the returned champion is carried into the next generation
    /// unchanged.
    pub fn run_with_performance<I, P, O>(
        &mut self,
        mut performance: P,
        mut observer: O,
    ) -> Result<EvolutionOutcome<I>>
    where
        I: Individual,
        P: FnMut(usize, &mut [I]) -> (I, bool),
        O: EvolutionObserver<I>,
    {
        let mut population = self.initialize_population::<I>()?;
        log::info!(
            "starting {} run: population={}, iterations={}",
            I::MODE,
            population.len(),
            self.config.iterations
        );

        for iteration in 0..self.config.iterations {
            let (champion, accomplished) = performance(iteration, &mut population);
            observer.on_generation(iteration, &champion);

            if accomplished {
                log::info!(
                    "objective accomplished at iteration {} (score {})",
                    iteration,
                    champion.score()
                );
                return Ok(EvolutionOutcome {
                    champion,
                    iterations: iteration,
                    accomplished: true,
                });
            }

            if iteration + 1 == self.config.iterations {
                log::info!(
                    "iteration budget exhausted (best score {})",
                    champion.score()
                );
                return Ok(EvolutionOutcome {
                    champion,
                    iterations: iteration + 1,
                    accomplished: false,
                });
            }

            population = self.next_generation(&population, champion);
        }

        unreachable!("iteration budget is validated to be at least 1")
    }

    /// Evaluate a population rebuilt from a record without evolving it,
    /// refreshing each entity's score.
    pub fn evaluate_once<I, F>(&self, population: &mut [I], fitness: F)
    where
        I: Individual,
        F: Fn(&I) -> f64 + Sync,
    {
        Self::evaluate_population(population, &fitness);
    }

    fn initialize_population<I: Individual>(&mut self) -> Result<Vec<I>> {
        (0..I::population_size(&self.config))
            .map(|_| I::random(&self.config, &self.registry, &self.sampler, &mut self.rng))
            .collect()
    }

    /// Worker-per-entity fan-out with a total barrier: every entity's slot
    /// holds a fresh score when this returns, so collection can neither
    /// duplicate nor drop a result and champion tie-breaking stays
    /// deterministic regardless of completion order.
    fn evaluate_population<I, F>(population: &mut [I], fitness: &F)
    where
        I: Individual,
        F: Fn(&I) -> f64 + Sync,
    {
        population.par_iter_mut().for_each(|individual| {
            let score = fitness(individual);
            individual.set_score(score);
        });
    }

    /// Build the next generation: the champion is carried over unchanged,
    /// the rest come from fitness-proportionate parent sampling with each
    /// recombination gate rolled independently, then the unary operators.
    fn next_generation<I: Individual>(&mut self, population: &[I], champion: I) -> Vec<I> {
        let size = population.len();
        let mut next = Vec::with_capacity(size);
        next.push(champion);

        while next.len() < size {
            let mut first = roulette_select(population, &mut self.rng).clone();
            let mut second = roulette_select(population, &mut self.rng).clone();

            if self.rng.gen::<f64>() < self.config.p_one_point {
                let (a, b) = I::crossover_one_point(&first, &second, &mut self.rng);
                first = a;
                second = b;
            }
            if self.rng.gen::<f64>() < self.config.p_two_point {
                let (a, b) = I::crossover_two_point(&first, &second, &mut self.rng);
                first = a;
                second = b;
            }
            if self.rng.gen::<f64>() < self.config.p_gene_recomb {
                let (a, b) = I::swap_component(&first, &second, &mut self.rng);
                first = a;
                second = b;
            }

            first.apply_variation(&self.config, &self.sampler, &mut self.rng);
            next.push(first);
            if next.len() < size {
                second.apply_variation(&self.config, &self.sampler, &mut self.rng);
                next.push(second);
            }
        }

        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::genome::Genome;

    fn test_config() -> GepConfig {
        GepConfig {
            iterations: 5,
            num_genomes: 10,
            seed: Some(1),
            ..GepConfig::default()
        }
    }

    #[test]
    fn test_satisfied_objective_terminates_immediately() {
        let mut engine =
            EvolutionEngine::new(test_config(), Arc::new(FunctionRegistry::new())).unwrap();
        let outcome: EvolutionOutcome<Genome> = engine
            .run(|_: &Genome| 1.0, NullObserver, 1.0)
            .unwrap();
        assert!(outcome.accomplished);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.champion.score(), 1.0);
    }

    #[test]
    fn test_budget_exhaustion_reports_not_accomplished() {
        let mut engine =
            EvolutionEngine::new(test_config(), Arc::new(FunctionRegistry::new())).unwrap();
        let outcome: EvolutionOutcome<Genome> = engine
            .run(|_: &Genome| 0.5, NullObserver, 2.0)
            .unwrap();
        assert!(!outcome.accomplished);
        assert_eq!(outcome.iterations, 5);
    }

    #[test]
    fn test_observer_sees_every_generation() {
        struct Collecting {
            seen: Vec<usize>,
        }
        impl EvolutionObserver<Genome> for Collecting {
            fn on_generation(&mut self, iteration: usize, _champion: &Genome) {
                self.seen.push(iteration);
            }
        }

        let mut engine =
            EvolutionEngine::new(test_config(), Arc::new(FunctionRegistry::new())).unwrap();
        let mut observer = Collecting { seen: Vec::new() };
        let _ = engine
            .run(|_: &Genome| 0.0, &mut observer, 1.0)
            .unwrap();
        assert_eq!(observer.seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_same_seed_reproduces_champion() {
        let fitness = |genome: &Genome| {
            let value = genome.evaluate(&[2.0]);
            if !value.is_finite() {
                return 0.0;
            }
            1.0 / (1.0 + (value - 10.0).abs())
        };
        let run = || {
            let mut engine =
                EvolutionEngine::new(test_config(), Arc::new(FunctionRegistry::new())).unwrap();
            let outcome: EvolutionOutcome<Genome> =
                engine.run(fitness, NullObserver, f64::INFINITY).unwrap();
            outcome.champion.karva_expressions()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_custom_performance_policy_controls_termination() {
        let mut engine =
            EvolutionEngine::new(test_config(), Arc::new(FunctionRegistry::new())).unwrap();
        let outcome: EvolutionOutcome<Genome> = engine
            .run_with_performance(
                |iteration, population: &mut [Genome]| {
                    for genome in population.iter_mut() {
                        genome.score = iteration as f64;
                    }
                    (population[0].clone(), iteration >= 2)
                },
                NullObserver,
            )
            .unwrap();
        assert!(outcome.accomplished);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.champion.score, 2.0);
    }

    #[test]
    fn test_record_from_outcome() {
        let mut engine =
            EvolutionEngine::new(test_config(), Arc::new(FunctionRegistry::new())).unwrap();
        let outcome: EvolutionOutcome<Genome> = engine
            .run(|_: &Genome| 3.0, NullObserver, 1.0)
            .unwrap();
        let record = outcome.to_record();
        assert_eq!(record.mode, EvolutionMode::Genome);
        assert_eq!(record.score, 3.0);
        assert_eq!(record.karva.len(), 1);
        assert_eq!(record.karva[0].len(), engine.config().num_genes_per_genome);
    }
}
