use super::codec::GeometryCodec;
use super::parser::ReportParser;
use super::runner::SimulationRunner;
use super::ObjectiveFunction;
use crate::config::{EvaluationMode, GeneticAlgorithmConfig, SimulationConfig};
use crate::error::{Result, YagiError};
use crate::types::ObjectiveVector;
use log::{debug, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Genome to objective vector through deck, simulator and report.
///
/// Every failure short of a fatal error (see [`YagiError::is_fatal`]) ends in
/// [`ObjectiveVector::SENTINEL`]; the generation loop never sees the rest.
pub struct ObjectiveEvaluator<R: SimulationRunner, P: ReportParser> {
    codec: GeometryCodec,
    runner: R,
    parser: P,
    mode: EvaluationMode,
    frequency: f64,
    sweep_frequencies: Vec<f64>,
    num_elements: usize,
    target_real_impedance: f64,
    evaluations: usize,
    failures: usize,
}

impl<R: SimulationRunner, P: ReportParser> ObjectiveEvaluator<R, P> {
    pub fn new(
        runner: R,
        parser: P,
        simulation: &SimulationConfig,
        genetic: &GeneticAlgorithmConfig,
    ) -> Self {
        Self {
            codec: GeometryCodec,
            runner,
            parser,
            mode: simulation.mode,
            frequency: simulation.frequency,
            sweep_frequencies: simulation.sweep_frequencies(),
            num_elements: genetic.num_elements,
            target_real_impedance: genetic.target_real_impedance,
            evaluations: 0,
            failures: 0,
        }
    }

    pub fn mode(&self) -> EvaluationMode {
        self.mode
    }

    /// Evaluations attempted so far, failed ones included.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn into_parts(self) -> (R, P) {
        (self.runner, self.parser)
    }

    /// Score `genome` in the given mode. Only fatal errors come back as
    /// `Err`.
    pub fn evaluate_mode(&mut self, genome: &[f64], mode: EvaluationMode) -> Result<ObjectiveVector> {
        self.evaluations += 1;
        let (lengths, spacings) = genome.split_at(self.num_elements.min(genome.len()));

        let result = match mode {
            EvaluationMode::Single => self.simulate_at(lengths, spacings, self.frequency),
            EvaluationMode::Sweep => self.simulate_sweep(lengths, spacings),
        };

        match result {
            Ok(objectives) => {
                debug!(
                    "Evaluated {:?}: gain {:.3} dB, R penalty {:.3}, X penalty {:.3}",
                    genome, objectives.gain_db, objectives.real_penalty, objectives.imag_penalty
                );
                Ok(objectives)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.failures += 1;
                warn!("Evaluation of {:?} failed: {}", genome, e);
                Ok(ObjectiveVector::SENTINEL)
            }
        }
    }

    /// Mean of the per-frequency vectors; the first failing frequency
    /// fails the whole sweep.
    fn simulate_sweep(&mut self, lengths: &[f64], spacings: &[f64]) -> Result<ObjectiveVector> {
        let frequencies = self.sweep_frequencies.clone();
        let mut sums = [0.0; 3];

        for &frequency in &frequencies {
            let objectives = self.simulate_at(lengths, spacings, frequency)?;
            for (sum, value) in sums.iter_mut().zip(objectives.to_array()) {
                *sum += value;
            }
        }

        let count = frequencies.len() as f64;
        Ok(ObjectiveVector::from_array(sums.map(|sum| sum / count)))
    }

    fn simulate_at(&mut self, lengths: &[f64], spacings: &[f64], frequency: f64) -> Result<ObjectiveVector> {
        let deck_path = self.runner.deck_path().to_path_buf();
        self.codec.write_deck(&deck_path, lengths, spacings, frequency)?;

        let runner = &mut self.runner;
        let output = catch_unwind(AssertUnwindSafe(|| runner.run())).map_err(|_| {
            YagiError::SimulationInvocation("simulation runner panicked".to_string())
        })??;

        if output.is_failure() {
            return Err(YagiError::SimulationInvocation(format!(
                "exit code {:?}, stderr: {}",
                output.exit_code,
                output.stderr.trim()
            )));
        }

        let report = self.runner.read_report()?;
        let parsed = self.parser.parse(&report);
        let (real, imag, gain) = parsed.complete().ok_or_else(|| {
            YagiError::OutputParse(format!(
                "incomplete report at {} MHz: R={:?}, X={:?}, gain={}",
                frequency, parsed.real_impedance, parsed.imag_impedance, parsed.max_gain_db
            ))
        })?;

        Ok(ObjectiveVector::new(
            gain,
            (real - self.target_real_impedance).abs(),
            imag.abs(),
        ))
    }
}

impl<R: SimulationRunner, P: ReportParser> ObjectiveFunction for ObjectiveEvaluator<R, P> {
    fn evaluate(&mut self, genome: &[f64]) -> Result<ObjectiveVector> {
        self.evaluate_mode(genome, self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::evaluation::parser::{NecReportParser, ParsedReport};
    use crate::engines::evaluation::runner::SimulationOutput;
    use std::path::{Path, PathBuf};

    /// Replays canned outputs and records the decks it was asked to run.
    struct ScriptedRunner {
        deck_path: PathBuf,
        stderr: String,
        report: Option<String>,
        decks: Vec<String>,
        panic: bool,
    }

    impl ScriptedRunner {
        fn new(dir: &Path) -> Self {
            Self {
                deck_path: dir.join("input.nec"),
                stderr: String::new(),
                report: Some(String::new()),
                decks: Vec::new(),
                panic: false,
            }
        }
    }

    impl SimulationRunner for ScriptedRunner {
        fn deck_path(&self) -> &Path {
            &self.deck_path
        }

        fn run(&mut self) -> Result<SimulationOutput> {
            if self.panic {
                panic!("engine wrapper crashed");
            }
            self.decks.push(std::fs::read_to_string(&self.deck_path)?);
            Ok(SimulationOutput {
                stdout: String::new(),
                stderr: self.stderr.clone(),
                exit_code: Some(0),
            })
        }

        fn read_report(&self) -> Result<String> {
            self.report
                .clone()
                .ok_or_else(|| YagiError::OutputParse("no report".into()))
        }
    }

    /// Same answer for every report: 50 - j2 ohms, 6 dB.
    struct ConstantParser;

    impl ReportParser for ConstantParser {
        fn parse(&self, _report: &str) -> ParsedReport {
            ParsedReport {
                real_impedance: Some(50.0),
                imag_impedance: Some(-2.0),
                max_gain_db: 6.0,
            }
        }
    }

    struct FixedParser(ParsedReport);

    impl ReportParser for FixedParser {
        fn parse(&self, _report: &str) -> ParsedReport {
            self.0
        }
    }

    fn simulation(mode: EvaluationMode, steps: usize) -> SimulationConfig {
        SimulationConfig {
            mode,
            num_freq_steps: steps,
            ..Default::default()
        }
    }

    const GENOME: [f64; 5] = [0.3, 0.3, 0.3, 0.15, 0.15];

    #[test]
    fn test_single_mode_penalties() {
        let dir = tempfile::tempdir().unwrap();
        let parser = FixedParser(ParsedReport {
            real_impedance: Some(42.5),
            imag_impedance: Some(-7.25),
            max_gain_db: 8.1,
        });
        let mut evaluator = ObjectiveEvaluator::new(
            ScriptedRunner::new(dir.path()),
            parser,
            &simulation(EvaluationMode::Single, 3),
            &GeneticAlgorithmConfig::default(),
        );

        let objectives = evaluator.evaluate(&GENOME).unwrap();
        assert_eq!(objectives, ObjectiveVector::new(8.1, 7.5, 7.25));

        let (runner, _) = evaluator.into_parts();
        assert_eq!(runner.decks.len(), 1);
        assert!(runner.decks[0].contains("FR  0  0  0  0  144  0"));
    }

    #[test]
    fn test_stderr_gives_sentinel_whatever_the_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = ScriptedRunner::new(dir.path());
        runner.stderr = "NEC2: geometry error".into();

        let mut evaluator = ObjectiveEvaluator::new(
            runner,
            ConstantParser,
            &simulation(EvaluationMode::Single, 3),
            &GeneticAlgorithmConfig::default(),
        );

        let objectives = evaluator.evaluate(&GENOME).unwrap();
        assert_eq!(objectives, ObjectiveVector::new(1000.0, 1000.0, 1000.0));
        assert_eq!(evaluator.failures(), 1);
    }

    #[test]
    fn test_incomplete_report_gives_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let mut evaluator = ObjectiveEvaluator::new(
            ScriptedRunner::new(dir.path()),
            NecReportParser,
            &simulation(EvaluationMode::Single, 3),
            &GeneticAlgorithmConfig::default(),
        );
        assert_eq!(evaluator.evaluate(&GENOME).unwrap(), ObjectiveVector::SENTINEL);

        let gainless = FixedParser(ParsedReport {
            real_impedance: Some(50.0),
            imag_impedance: Some(0.0),
            ..Default::default()
        });
        let mut evaluator = ObjectiveEvaluator::new(
            ScriptedRunner::new(dir.path()),
            gainless,
            &simulation(EvaluationMode::Single, 3),
            &GeneticAlgorithmConfig::default(),
        );
        assert_eq!(evaluator.evaluate(&GENOME).unwrap(), ObjectiveVector::SENTINEL);
    }

    #[test]
    fn test_missing_report_gives_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = ScriptedRunner::new(dir.path());
        runner.report = None;
        let mut evaluator = ObjectiveEvaluator::new(
            runner,
            ConstantParser,
            &simulation(EvaluationMode::Single, 3),
            &GeneticAlgorithmConfig::default(),
        );
        assert_eq!(evaluator.evaluate(&GENOME).unwrap(), ObjectiveVector::SENTINEL);
    }

    #[test]
    fn test_runner_panic_is_absorbed() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = ScriptedRunner::new(dir.path());
        runner.panic = true;
        let mut evaluator = ObjectiveEvaluator::new(
            runner,
            ConstantParser,
            &simulation(EvaluationMode::Single, 3),
            &GeneticAlgorithmConfig::default(),
        );
        assert_eq!(evaluator.evaluate(&GENOME).unwrap(), ObjectiveVector::SENTINEL);
    }

    #[test]
    fn test_unwritable_deck_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = ScriptedRunner::new(dir.path());
        runner.deck_path = dir.path().join("no-such-dir").join("input.nec");
        let mut evaluator = ObjectiveEvaluator::new(
            runner,
            ConstantParser,
            &simulation(EvaluationMode::Single, 3),
            &GeneticAlgorithmConfig::default(),
        );
        let err = evaluator.evaluate(&GENOME).unwrap_err();
        assert!(matches!(err, YagiError::DeckWrite { .. }));
    }

    #[test]
    fn test_sweep_visits_each_frequency_and_averages() {
        let dir = tempfile::tempdir().unwrap();
        let mut evaluator = ObjectiveEvaluator::new(
            ScriptedRunner::new(dir.path()),
            ConstantParser,
            &simulation(EvaluationMode::Sweep, 3),
            &GeneticAlgorithmConfig::default(),
        );

        let objectives = evaluator.evaluate(&GENOME).unwrap();
        assert_eq!(objectives, ObjectiveVector::new(6.0, 0.0, 2.0));

        let (runner, _) = evaluator.into_parts();
        assert_eq!(runner.decks.len(), 3);
        for (deck, freq) in runner.decks.iter().zip(["143", "144", "145"]) {
            assert!(deck.contains(&format!("FR  0  0  0  0  {}  0", freq)));
        }
    }

    #[test]
    fn test_sweep_with_one_step_matches_single() {
        let dir = tempfile::tempdir().unwrap();
        let parser = || {
            FixedParser(ParsedReport {
                real_impedance: Some(61.3),
                imag_impedance: Some(4.4),
                max_gain_db: 9.2,
            })
        };
        let genetic = GeneticAlgorithmConfig::default();
        let config = simulation(EvaluationMode::Sweep, 1);

        let mut evaluator =
            ObjectiveEvaluator::new(ScriptedRunner::new(dir.path()), parser(), &config, &genetic);
        let single = evaluator.evaluate_mode(&GENOME, EvaluationMode::Single).unwrap();
        let sweep = evaluator.evaluate_mode(&GENOME, EvaluationMode::Sweep).unwrap();
        assert_eq!(single, sweep);

        let (runner, _) = evaluator.into_parts();
        assert_eq!(runner.decks[0], runner.decks[1]);
    }

    #[test]
    fn test_sweep_failure_aborts_with_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = ScriptedRunner::new(dir.path());
        runner.stderr = "bad segment".into();
        let mut evaluator = ObjectiveEvaluator::new(
            runner,
            ConstantParser,
            &simulation(EvaluationMode::Sweep, 3),
            &GeneticAlgorithmConfig::default(),
        );

        assert_eq!(evaluator.evaluate(&GENOME).unwrap(), ObjectiveVector::SENTINEL);
        let (runner, _) = evaluator.into_parts();
        assert_eq!(runner.decks.len(), 1);
    }
}
