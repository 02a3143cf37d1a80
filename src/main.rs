use anyhow::Context;
use karva::{
    EvolutionEngine, EvolutionMode, FunctionRegistry, Genome, GenomeSet, GepConfig, Individual,
    LogObserver, Record,
};
use std::sync::Arc;

// Random samples of the function a^4 + a^3 + a^2 + a.
const SR_SAMPLES: &[(f64, f64)] = &[
    (2.81, 95.2425),
    (6.0, 1554.0),
    (7.043, 2866.55),
    (8.0, 4680.0),
    (10.0, 11110.0),
    (11.38, 18386.0),
    (12.0, 22620.0),
    (14.0, 41370.0),
    (15.0, 54240.0),
    (20.0, 168420.0),
    (100.0, 101010100.0),
    (-100.0, 99009900.0),
];

const TARGET_FITNESS: f64 = 1000.0;

/// Normalized absolute-error fitness over the sample set; a non-finite
/// output anywhere scores the whole entity zero.
fn score_samples<E>(evaluate: E) -> f64
where
    E: Fn(&[f64]) -> f64,
{
    let mut total = 0.0;
    for (input, expected) in SR_SAMPLES {
        let result = evaluate(&[*input]);
        if !result.is_finite() {
            return 0.0;
        }
        total += 1000.0 / (1.0 + (result - expected).abs());
    }
    total / SR_SAMPLES.len() as f64
}

fn load_config(path: Option<&String>) -> anyhow::Result<GepConfig> {
    match path {
        Some(path) => {
            GepConfig::load_from_file(path).with_context(|| format!("loading config {}", path))
        }
        None => Ok(GepConfig::default()),
    }
}

/// Rebuild a stored champion from its record and score it against the sample
/// set without running evolution.
fn replay(record_path: &str, config: &GepConfig) -> anyhow::Result<()> {
    let record = Record::load_from_file(record_path)
        .with_context(|| format!("loading record {}", record_path))?;
    let registry = Arc::new(FunctionRegistry::new());

    let (expression, score) = match record.mode {
        EvolutionMode::Genome => {
            let karva = record.karva.first().context("record holds no expressions")?;
            let genome = Genome::from_karva(karva, config.head_size, &config.link_func, &registry)?;
            (
                genome.expression(&["a"])?,
                score_samples(|inputs| genome.evaluate(inputs)),
            )
        }
        EvolutionMode::GenomeSet => {
            let set =
                GenomeSet::from_karva(&record.karva, config.head_size, &config.link_func, &registry)?;
            (
                set.expression(&["a"])?,
                score_samples(|inputs| set.evaluate(inputs)),
            )
        }
    };

    println!("{}", expression);
    println!("recorded score {:.4}, replayed score {:.4}", record.score, score);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("replay") {
        let record_path = args
            .get(1)
            .context("usage: karva replay <record.json> [config.toml]")?;
        let config = load_config(args.get(2))?;
        return replay(record_path, &config);
    }

    let config = load_config(args.first())?;
    let record_path = args.get(1);

    let registry = Arc::new(FunctionRegistry::new());
    let mode = config.mode;
    let mut engine = EvolutionEngine::new(config, registry)?;

    let record = match mode {
        EvolutionMode::Genome => {
            let outcome = engine.run(
                |genome: &Genome| score_samples(|inputs| genome.evaluate(inputs)),
                LogObserver::new(25),
                TARGET_FITNESS,
            )?;
            log::info!(
                "finished after {} iterations (accomplished: {})",
                outcome.iterations,
                outcome.accomplished
            );
            println!("{}", outcome.champion.describe());
            outcome.to_record()
        }
        EvolutionMode::GenomeSet => {
            let outcome = engine.run(
                |set: &GenomeSet| score_samples(|inputs| set.evaluate(inputs)),
                LogObserver::new(25),
                TARGET_FITNESS,
            )?;
            log::info!(
                "finished after {} iterations (accomplished: {})",
                outcome.iterations,
                outcome.accomplished
            );
            println!("{}", outcome.champion.describe());
            outcome.to_record()
        }
    };

    println!("{}", serde_json::to_string_pretty(&record)?);
    if let Some(path) = record_path {
        record
            .save_to_file(&path)
            .with_context(|| format!("writing record {}", path))?;
    }

    Ok(())
}
