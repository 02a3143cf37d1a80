use super::evolution_engine::{EvolutionObserver, Individual};

/// Logs each generation's champion through the `log` facade.
///
/// `every` thins the output for long runs; the first generation is always
/// reported.
pub struct LogObserver {
    every: usize,
}

impl LogObserver {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new(1)
    }
}

impl<I: Individual> EvolutionObserver<I> for LogObserver {
    fn on_generation(&mut self, iteration: usize, champion: &I) {
        if iteration % self.every == 0 {
            log::info!(
                "generation {}: best score {:.4}: {}",
                iteration,
                champion.score(),
                champion.describe()
            );
        }
    }
}

/// Forwards each generation's result over a channel, for callers driving a
/// UI or collecting progress out of band. Send failures are ignored; a gone
/// receiver must not stop the run.
pub struct ChannelObserver<I> {
    sender: std::sync::mpsc::Sender<GenerationUpdate<I>>,
}

#[derive(Debug)]
pub struct GenerationUpdate<I> {
    pub iteration: usize,
    pub champion: I,
}

impl<I> ChannelObserver<I> {
    pub fn new(sender: std::sync::mpsc::Sender<GenerationUpdate<I>>) -> Self {
        Self { sender }
    }
}

impl<I: Individual> EvolutionObserver<I> for ChannelObserver<I> {
    fn on_generation(&mut self, iteration: usize, champion: &I) {
        let _ = self.sender.send(GenerationUpdate {
            iteration,
            champion: champion.clone(),
        });
    }
}
