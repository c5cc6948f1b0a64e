use crate::config::GeneticAlgorithmConfig;
use crate::engines::evaluation::ObjectiveFunction;
use crate::engines::generation::{
    genome::GeneLayout,
    hall_of_fame::HallOfFame,
    operators::{random_genome, vary},
    pareto::select_nsga2,
    progress::ProgressCallback,
};
use crate::error::YagiError;
use crate::types::{GenerationRecord, Individual, ObjectiveVector};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub generations: usize,
    /// Survivors kept by NSGA-II selection each generation
    pub mu: usize,
    pub crossover_probability: f64,
    pub mutation_probability: f64,
    pub hall_of_fame_size: usize,
    pub seed: Option<u64>,
}

impl From<&GeneticAlgorithmConfig> for EvolutionConfig {
    fn from(config: &GeneticAlgorithmConfig) -> Self {
        Self {
            population_size: config.population_size,
            generations: config.num_generations,
            mu: config.mu(),
            crossover_probability: config.crossover_probability,
            mutation_probability: config.mutation_probability,
            hall_of_fame_size: config.hall_of_fame_size,
            seed: config.seed,
        }
    }
}

/// Everything a run leaves behind.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub population: Vec<Individual>,
    pub logbook: Vec<GenerationRecord>,
    pub hall_of_fame: Vec<Individual>,
    pub evaluations: usize,
    pub cancelled: bool,
}

pub struct EvolutionEngine<E: ObjectiveFunction> {
    config: EvolutionConfig,
    layout: GeneLayout,
    evaluator: E,
    hall_of_fame: HallOfFame,
    logbook: Vec<GenerationRecord>,
    rng: StdRng,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl<E: ObjectiveFunction> EvolutionEngine<E> {
    pub fn new(config: EvolutionConfig, layout: GeneLayout, evaluator: E) -> Self {
        // Seeded exactly once per run
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let hall_of_fame = HallOfFame::new(config.hall_of_fame_size);

        Self {
            config,
            layout,
            evaluator,
            hall_of_fame,
            logbook: Vec::new(),
            rng,
            cancel_flag: None,
        }
    }

    /// Checked at the top of every generation step.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    /// Run the evolution process
    ///
    /// Only fatal errors (deck write, configuration) abort the run; every
    /// other evaluation problem has already been folded into the sentinel
    /// objective vector by the evaluator.
    pub fn run<C: ProgressCallback>(mut self, callback: &mut C) -> Result<RunOutcome, YagiError> {
        let total = self.config.generations;
        info!(
            "Starting evolution: population={}, generations={}, mu={}, genes={}",
            self.config.population_size,
            total,
            self.config.mu,
            self.layout.genome_length()
        );

        let mut population = self.initialize_population();
        let mut evaluations = self.evaluate_invalid(&mut population, callback)?;
        let mut cancelled = false;

        for generation in 1..=total {
            if self.is_cancelled() {
                warn!("Evolution cancelled before generation {}", generation);
                cancelled = true;
                break;
            }
            notify(|| callback.on_generation_start(generation, total));

            let mut offspring = vary(
                &population,
                &self.layout,
                self.config.crossover_probability,
                self.config.mutation_probability,
                &mut self.rng,
            );
            let generation_evals = self.evaluate_invalid(&mut offspring, callback)?;
            evaluations += generation_evals;

            population.extend(offspring);
            population = select_nsga2(population, self.config.mu);

            let admitted = self.hall_of_fame.update(&population);
            let record = GenerationRecord::compile(generation, generation_evals, &population);
            debug!(
                "Generation {}: {} admitted to hall of fame (size {})",
                generation,
                admitted,
                self.hall_of_fame.len()
            );
            self.logbook.push(record.clone());

            let fraction = generation as f64 / total as f64;
            notify(|| callback.on_generation_complete(&record, fraction));
        }

        info!(
            "Evolution finished after {} generations, {} evaluations, best gain {:?} dB",
            self.logbook.len(),
            evaluations,
            self.hall_of_fame.best_gain()
        );

        Ok(RunOutcome {
            population,
            logbook: self.logbook,
            hall_of_fame: self.hall_of_fame.into_members(),
            evaluations,
            cancelled,
        })
    }

    fn initialize_population(&mut self) -> Vec<Individual> {
        (0..self.config.population_size)
            .map(|_| Individual::new(random_genome(&self.layout, &mut self.rng)))
            .collect()
    }

    /// Evaluate every individual without cached objectives, in order, one at
    /// a time. Returns the number of evaluations performed.
    fn evaluate_invalid<C: ProgressCallback>(
        &mut self,
        individuals: &mut [Individual],
        callback: &mut C,
    ) -> Result<usize, YagiError> {
        let pending = individuals.iter().filter(|ind| !ind.is_evaluated()).count();
        let mut done = 0;

        for individual in individuals.iter_mut().filter(|ind| !ind.is_evaluated()) {
            let objectives = match self.evaluator.evaluate(&individual.genome) {
                Ok(objectives) => objectives,
                Err(e) if e.is_fatal() => {
                    error!("Aborting run: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Evaluation failed, using sentinel: {}", e);
                    ObjectiveVector::SENTINEL
                }
            };
            individual.objectives = Some(objectives);
            done += 1;
            notify(|| callback.on_individual_evaluated(done, pending));
        }

        Ok(done)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    pub fn layout(&self) -> &GeneLayout {
        &self.layout
    }
}

fn notify<F: FnOnce()>(f: F) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        warn!("Progress callback panicked; continuing");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::genome::MIN_SPACING;
    use crate::engines::generation::progress::{FnProgress, NoProgress};
    use crate::error::Result;

    /// Rewards long first elements and penalises spacing away from 0.2 m.
    struct Analytic;

    impl ObjectiveFunction for Analytic {
        fn evaluate(&mut self, genome: &[f64]) -> Result<ObjectiveVector> {
            Ok(ObjectiveVector::new(genome[0] * 20.0, (genome[3] - 0.2).abs(), 0.0))
        }
    }

    struct DeckFailure;

    impl ObjectiveFunction for DeckFailure {
        fn evaluate(&mut self, _genome: &[f64]) -> Result<ObjectiveVector> {
            Err(YagiError::DeckWrite {
                path: "input.nec".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    fn layout() -> GeneLayout {
        GeneLayout {
            num_elements: 3,
            length_bounds: 0.25..=0.5,
            spacing_bounds: MIN_SPACING..=(1.0 / 3.0),
            lock_lengths: false,
            lock_spacings: false,
            locked_lengths: vec![0.3; 3],
            locked_spacings: vec![0.15; 2],
        }
    }

    fn config(generations: usize) -> EvolutionConfig {
        EvolutionConfig {
            population_size: 20,
            generations,
            mu: 12,
            crossover_probability: 0.5,
            mutation_probability: 0.3,
            hall_of_fame_size: 5,
            seed: Some(42),
        }
    }

    #[test]
    fn test_logbook_and_progress() {
        let mut fractions = Vec::new();
        let outcome = EvolutionEngine::new(config(4), layout(), Analytic)
            .run(&mut FnProgress(|f| fractions.push(f)))
            .unwrap();

        assert_eq!(outcome.logbook.len(), 4);
        assert_eq!(outcome.population.len(), 12);
        assert!(!outcome.cancelled);
        assert_eq!(fractions, vec![0.25, 0.5, 0.75, 1.0]);
        assert!(outcome.hall_of_fame.len() <= 5);
        for ind in &outcome.population {
            assert!(layout().admits(&ind.genome));
        }
    }

    #[test]
    fn test_same_seed_same_run() {
        let a = EvolutionEngine::new(config(3), layout(), Analytic).run(&mut NoProgress).unwrap();
        let b = EvolutionEngine::new(config(3), layout(), Analytic).run(&mut NoProgress).unwrap();
        assert_eq!(a.population, b.population);
        assert_eq!(a.logbook, b.logbook);
    }

    #[test]
    fn test_panicking_callback_does_not_stop_the_loop() {
        let outcome = EvolutionEngine::new(config(2), layout(), Analytic)
            .run(&mut FnProgress(|_| panic!("display went away")))
            .unwrap();
        assert_eq!(outcome.logbook.len(), 2);
    }

    #[test]
    fn test_cancel_flag_stops_before_next_generation() {
        let flag = Arc::new(AtomicBool::new(true));
        let outcome = EvolutionEngine::new(config(5), layout(), Analytic)
            .with_cancel_flag(flag)
            .run(&mut NoProgress)
            .unwrap();
        assert!(outcome.cancelled);
        assert!(outcome.logbook.is_empty());
        assert_eq!(outcome.population.len(), 20);
    }

    #[test]
    fn test_fatal_error_aborts() {
        let result = EvolutionEngine::new(config(2), layout(), DeckFailure).run(&mut NoProgress);
        assert!(matches!(result, Err(YagiError::DeckWrite { .. })));
    }
}
