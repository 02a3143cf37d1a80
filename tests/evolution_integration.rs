use karva::{
    EvolutionEngine, EvolutionMode, EvolutionOutcome, FunctionRegistry, Gene, Genome, GenomeSet,
    GepConfig, NullObserver, Record,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn registry() -> Arc<FunctionRegistry> {
    Arc::new(FunctionRegistry::new())
}

fn small_config(iterations: usize, num_genomes: usize, seed: u64) -> GepConfig {
    GepConfig {
        iterations,
        num_genomes,
        num_genome_sets: num_genomes,
        seed: Some(seed),
        ..GepConfig::default()
    }
}

/// A genome whose evaluation is the constant `value`, built through the
/// per-gene constant table.
fn constant_genome(value: f64, registry: &Arc<FunctionRegistry>) -> Genome {
    let mut gene = Gene::parse("c0.d0.d0", 1, registry.clone()).unwrap();
    gene.set_constants(vec![value]);
    Genome::new(vec![gene], "+", registry).unwrap()
}

/// Dispatching N concurrent evaluations must collect exactly N scores, one
/// per entity slot, with nothing dropped or duplicated.
#[test]
fn test_evaluation_barrier_accounts_for_every_entity() {
    let registry = registry();
    let engine = EvolutionEngine::new(small_config(1, 2, 0), registry.clone()).unwrap();

    for n in [1usize, 2, 3, 7, 16, 64, 200] {
        let mut population: Vec<Genome> = (0..n)
            .map(|i| constant_genome(i as f64, &registry))
            .collect();

        let calls = AtomicUsize::new(0);
        engine.evaluate_once(&mut population, |genome: &Genome| {
            calls.fetch_add(1, Ordering::SeqCst);
            genome.evaluate(&[])
        });

        assert_eq!(calls.load(Ordering::SeqCst), n);
        for (i, genome) in population.iter().enumerate() {
            assert_eq!(genome.score, i as f64);
        }
    }
}

/// An objective already satisfied by the initial population terminates the
/// run at iteration zero with `accomplished` set.
#[test]
fn test_presatisfied_objective_short_circuits() {
    let mut engine = EvolutionEngine::new(small_config(100, 20, 3), registry()).unwrap();
    let outcome: EvolutionOutcome<Genome> = engine
        .run(|_: &Genome| 10.0, NullObserver, 5.0)
        .unwrap();
    assert!(outcome.accomplished);
    assert_eq!(outcome.iterations, 0);
}

#[test]
fn test_genome_set_run_produces_ensemble_record() {
    let config = GepConfig {
        mode: EvolutionMode::GenomeSet,
        ..small_config(3, 8, 4)
    };
    let genes_per_genome = config.num_genes_per_genome;
    let genomes_per_set = config.num_genomes_per_set;

    let mut engine = EvolutionEngine::new(config, registry()).unwrap();
    let outcome: EvolutionOutcome<GenomeSet> = engine
        .run(
            |set: &GenomeSet| {
                let value = set.evaluate(&[2.0]);
                if value.is_finite() {
                    value.abs().min(1.0)
                } else {
                    0.0
                }
            },
            NullObserver,
            f64::INFINITY,
        )
        .unwrap();

    assert!(!outcome.accomplished);
    let record = outcome.to_record();
    assert_eq!(record.mode, EvolutionMode::GenomeSet);
    assert_eq!(record.karva.len(), genomes_per_set);
    for genome in &record.karva {
        assert_eq!(genome.len(), genes_per_genome);
    }
}

/// Fixed seeds make whole runs reproducible, operator randomness included.
#[test]
fn test_seeded_runs_are_deterministic() {
    let fitness = |genome: &Genome| {
        let value = genome.evaluate(&[3.0]);
        if value.is_finite() {
            1000.0 / (1.0 + (value - 12.0).abs())
        } else {
            0.0
        }
    };
    let run = || {
        let mut engine = EvolutionEngine::new(small_config(10, 15, 77), registry()).unwrap();
        let outcome: EvolutionOutcome<Genome> = engine
            .run(fitness, NullObserver, f64::INFINITY)
            .unwrap();
        (outcome.champion.karva_strings(), outcome.champion.score)
    };
    assert_eq!(run(), run());
}

/// Record persistence plus replay: the champion's Karva strings rebuild an
/// equivalent genome.
#[test]
fn test_record_replay_reproduces_champion_output() {
    let registry = registry();
    let karva = vec![
        "*.+.*.*.d0.d0.d0.d0.d0".to_string(),
        "*.+.d0./.d0.d0.d0.d0.d0".to_string(),
    ];
    let champion = Genome::from_karva(&karva, 4, "+", &registry).unwrap();
    let record = Record {
        mode: EvolutionMode::Genome,
        score: 0.0,
        karva: vec![champion.karva_strings()],
    };

    let path = std::env::temp_dir().join("karva_record_replay_test.json");
    record.save_to_file(&path).unwrap();
    let loaded = Record::load_from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let replayed = Genome::from_karva(&loaded.karva[0], 4, "+", &registry).unwrap();
    assert_eq!(replayed.evaluate(&[2.0]), champion.evaluate(&[2.0]));
    assert_eq!(replayed.evaluate(&[2.0]), 30.0);
}

/// The configuration layer refuses to start a run on nonsense parameters.
#[test]
fn test_invalid_configuration_aborts_before_work() {
    let bad_head = GepConfig {
        head_size: 0,
        ..GepConfig::default()
    };
    assert!(EvolutionEngine::new(bad_head, registry()).is_err());

    let bad_weights = GepConfig {
        function_weights: Vec::new(),
        ..GepConfig::default()
    };
    assert!(EvolutionEngine::new(bad_weights, registry()).is_err());
}
