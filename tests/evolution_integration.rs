use std::path::{Path, PathBuf};
use yagiopt::config::{AppConfig, EvaluationMode};
use yagiopt::engines::evaluation::{
    NecReportParser, ObjectiveEvaluator, ObjectiveFunction, ParsedReport, ReportParser,
    SimulationOutput, SimulationRunner,
};
use yagiopt::engines::generation::{EvolutionConfig, EvolutionEngine, NoProgress, ProgressCallback};
use yagiopt::{GenerationRecord, ObjectiveVector, Result};

/// Pretends to run the engine: the report it hands back is the deck itself.
struct EchoRunner {
    deck_path: PathBuf,
    runs: usize,
}

impl EchoRunner {
    fn new(dir: &Path) -> Self {
        Self {
            deck_path: dir.join("input.nec"),
            runs: 0,
        }
    }
}

impl SimulationRunner for EchoRunner {
    fn deck_path(&self) -> &Path {
        &self.deck_path
    }

    fn run(&mut self) -> Result<SimulationOutput> {
        self.runs += 1;
        Ok(SimulationOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: Some(0),
        })
    }

    fn read_report(&self) -> Result<String> {
        Ok(std::fs::read_to_string(&self.deck_path)?)
    }
}

struct FixedParser {
    real: f64,
    imag: f64,
    gain: f64,
}

impl ReportParser for FixedParser {
    fn parse(&self, _report: &str) -> ParsedReport {
        ParsedReport {
            real_impedance: Some(self.real),
            imag_impedance: Some(self.imag),
            max_gain_db: self.gain,
        }
    }
}

/// Derives impedance and gain from the deck it is given: gain rises with
/// frequency and with the first element's half-length, resistance with the
/// half-length alone.
struct DeckParser;

impl ReportParser for DeckParser {
    fn parse(&self, report: &str) -> ParsedReport {
        let field = |card: &str, index: usize| -> Option<f64> {
            report
                .lines()
                .find(|l| l.starts_with(card))
                .and_then(|l| l.split_whitespace().nth(index))
                .and_then(|v| v.parse().ok())
        };
        let frequency = field("FR", 5).unwrap_or(0.0);
        let half_length = field("GW", 7).unwrap_or(0.0);
        ParsedReport {
            real_impedance: Some(half_length * 200.0),
            imag_impedance: Some(frequency - 144.0),
            max_gain_db: frequency / 20.0 + half_length * 10.0,
        }
    }
}

fn scenario_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.genetic_algorithm.num_elements = 3;
    config.genetic_algorithm.population_size = 10;
    config.genetic_algorithm.num_generations = 2;
    config.genetic_algorithm.seed = Some(7);
    config.simulation.mode = EvaluationMode::Single;
    config
}

fn engine<E: ObjectiveFunction>(config: &AppConfig, evaluator: E) -> EvolutionEngine<E> {
    let genetic = &config.genetic_algorithm;
    EvolutionEngine::new(EvolutionConfig::from(genetic), genetic.gene_layout(), evaluator)
}

#[test]
fn test_matched_feed_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let config = scenario_config();
    let evaluator = ObjectiveEvaluator::new(
        EchoRunner::new(dir.path()),
        FixedParser {
            real: 50.0,
            imag: 0.0,
            gain: 5.0,
        },
        &config.simulation,
        &config.genetic_algorithm,
    );

    let outcome = engine(&config, evaluator).run(&mut NoProgress).unwrap();

    assert_eq!(outcome.logbook.len(), 2);
    assert!(!outcome.hall_of_fame.is_empty());
    for member in &outcome.hall_of_fame {
        assert_eq!(member.objectives, Some(ObjectiveVector::new(5.0, 0.0, 0.0)));
    }
    assert_eq!(outcome.population.len(), config.genetic_algorithm.mu());
    let layout = config.genetic_algorithm.gene_layout();
    for individual in &outcome.population {
        assert!(layout.admits(&individual.genome));
    }
}

#[test]
fn test_archive_best_gain_never_regresses() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = scenario_config();
    config.genetic_algorithm.population_size = 12;
    config.genetic_algorithm.mutation_probability = 0.4;
    config.genetic_algorithm.crossover_probability = 0.6;

    // A shorter run with the same seed is a prefix of a longer one
    let mut previous = f64::NEG_INFINITY;
    for generations in 1..=6 {
        config.genetic_algorithm.num_generations = generations;
        let evaluator = ObjectiveEvaluator::new(
            EchoRunner::new(dir.path()),
            DeckParser,
            &config.simulation,
            &config.genetic_algorithm,
        );
        let outcome = engine(&config, evaluator).run(&mut NoProgress).unwrap();
        let best = outcome
            .hall_of_fame
            .iter()
            .map(|m| m.fitness().gain_db)
            .fold(f64::NEG_INFINITY, f64::max);

        assert!(best >= previous, "generation {}: {} < {}", generations, best, previous);
        previous = best;
    }
}

#[test]
fn test_single_step_sweep_equals_single() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = scenario_config();
    config.simulation.num_freq_steps = 1;
    config.simulation.frequency = 146.0;
    let genome = [0.4, 0.35, 0.3, 0.15, 0.2];

    let mut evaluator = ObjectiveEvaluator::new(
        EchoRunner::new(dir.path()),
        DeckParser,
        &config.simulation,
        &config.genetic_algorithm,
    );
    let single = evaluator.evaluate_mode(&genome, EvaluationMode::Single).unwrap();
    let sweep = evaluator.evaluate_mode(&genome, EvaluationMode::Sweep).unwrap();

    assert_eq!(single, sweep);
    assert_eq!(single, ObjectiveVector::new(146.0 / 20.0 + 0.2 * 10.0, 10.0, 2.0));
}

#[test]
fn test_sweep_averages_over_band() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = scenario_config();
    config.simulation.mode = EvaluationMode::Sweep;
    config.simulation.min_freq = 140.0;
    config.simulation.max_freq = 148.0;
    config.simulation.num_freq_steps = 3;

    let mut evaluator = ObjectiveEvaluator::new(
        EchoRunner::new(dir.path()),
        DeckParser,
        &config.simulation,
        &config.genetic_algorithm,
    );
    let objectives = evaluator.evaluate(&[0.5, 0.35, 0.3, 0.15, 0.2]).unwrap();

    // Reactance is -4, 0, +4 across the band
    assert!((objectives.gain_db - (144.0 / 20.0 + 2.5)).abs() < 1e-12);
    assert_eq!(objectives.real_penalty, 0.0);
    assert!((objectives.imag_penalty - 8.0 / 3.0).abs() < 1e-12);
    assert_eq!(evaluator.evaluations(), 1);
    let (runner, _) = evaluator.into_parts();
    assert_eq!(runner.runs, 3);
}

#[test]
fn test_progress_reports_each_generation() {
    struct Recorder(Vec<(usize, f64)>);

    impl ProgressCallback for Recorder {
        fn on_generation_complete(&mut self, record: &GenerationRecord, fraction: f64) {
            self.0.push((record.generation, fraction));
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let mut config = scenario_config();
    config.genetic_algorithm.num_generations = 4;
    let evaluator = ObjectiveEvaluator::new(
        EchoRunner::new(dir.path()),
        DeckParser,
        &config.simulation,
        &config.genetic_algorithm,
    );

    let mut recorder = Recorder(Vec::new());
    engine(&config, evaluator).run(&mut recorder).unwrap();
    assert_eq!(recorder.0, vec![(1, 0.25), (2, 0.5), (3, 0.75), (4, 1.0)]);
}

/// Runs a shell script in place of the NEC2 executable: it reads the
/// instruction file from stdin and writes a canned report.
#[cfg(unix)]
#[test]
fn test_external_engine_round_trip() {
    use std::os::unix::fs::PermissionsExt;
    use yagiopt::engines::evaluation::Nec2Runner;

    const REPORT: &str = "
  TAG   SEG.    VOLTAGE (VOLTS)         CURRENT (AMPS)         IMPEDANCE (OHMS)        ADMITTANCE (MHOS)     POWER
  NO.   NO.     REAL      IMAG.       REAL      IMAG.       REAL      IMAG.       REAL      IMAG.     (WATTS)
    2     5  1.0000E+00  0.0000E+00  1.9857E-02 -1.1702E-03  5.2500E+01 -3.0000E+00  1.9857E-02 -1.1702E-03  9.9285E-03

                               - - - RADIATION PATTERNS - - -
   90.00   -180.00   -999.99    -3.21    -3.21    0.00000     90.00  LINEAR
   90.00      0.00   -999.99     8.25     8.25    0.00000     90.00  LINEAR
";

    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.paths.base_dir = dir.path().to_path_buf();
    config.paths.exe_file = PathBuf::from("fake-nec.sh");
    let workspace = config.paths.workspace();
    workspace.prepare().unwrap();

    let good = format!(
        "#!/bin/sh\nread deck\nread report\ntest -s \"$deck\" || exit 2\ncat > \"$report\" <<'EOF'\n{}EOF\n",
        REPORT
    );
    let noisy = "#!/bin/sh\nread deck\nread report\necho 'SEGMENT DATA ERROR' >&2\n";

    let install = |script: &str| {
        std::fs::write(&workspace.exe_file, script).unwrap();
        std::fs::set_permissions(&workspace.exe_file, std::fs::Permissions::from_mode(0o755))
            .unwrap();
    };
    let genome = [0.3, 0.3, 0.3, 0.15, 0.15];

    install(&good);
    let mut evaluator = ObjectiveEvaluator::new(
        Nec2Runner::new(workspace.clone()),
        NecReportParser,
        &config.simulation,
        &config.genetic_algorithm,
    );
    assert_eq!(
        evaluator.evaluate(&genome).unwrap(),
        ObjectiveVector::new(8.25, 2.5, 3.0)
    );
    assert!(std::fs::read_to_string(&workspace.deck_path)
        .unwrap()
        .contains("FR  0  0  0  0  144  0"));

    install(noisy);
    assert_eq!(evaluator.evaluate(&genome).unwrap(), ObjectiveVector::SENTINEL);
    assert_eq!(evaluator.failures(), 1);

    // Clean exit without a report: the previous report must not be reused
    install(&good);
    assert_eq!(
        evaluator.evaluate(&genome).unwrap(),
        ObjectiveVector::new(8.25, 2.5, 3.0)
    );
    install("#!/bin/sh\nexit 0\n");
    assert_eq!(
        evaluator.evaluate(&[0.4, 0.35, 0.3, 0.2, 0.2]).unwrap(),
        ObjectiveVector::SENTINEL
    );
    assert_eq!(evaluator.failures(), 2);
}
