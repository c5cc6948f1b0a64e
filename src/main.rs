use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use yagiopt::config::{AppConfig, ConfigManager, EvaluationMode};
use yagiopt::engines::evaluation::{
    k_range, GeometryCodec, Nec2Runner, NecReportParser, ParameterSweep, ParametricDeck,
};
use yagiopt::engines::generation::ProgressMessage;
use yagiopt::export::{ResultExporter, RunReport};
use yagiopt::services::OptimizationRunner;

#[derive(Parser, Debug)]
#[command(name = "yagiopt", version)]
#[command(about = "Multi-objective Yagi-Uda optimizer driving the NEC2 engine")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the genetic optimisation
    Optimize {
        /// TOML configuration; YAGIOPT__* environment variables override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Evaluation mode: single or sweep
        #[arg(long)]
        mode: Option<EvaluationMode>,

        #[arg(long)]
        seed: Option<u64>,

        /// CSV with the final population
        #[arg(long)]
        csv: Option<PathBuf>,

        /// JSON run report (logbook and hall of fame)
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Simulate a scripted deck over a range of k
    SweepK {
        /// Deck with `SY k=` and `<num>+k` / `<num>-k` coordinates
        #[arg(long)]
        template: PathBuf,

        #[arg(long)]
        start: f64,

        #[arg(long)]
        stop: f64,

        #[arg(long)]
        step: f64,

        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the sweep table as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Write a standalone geometry deck for an external viewer
    ExportDeck {
        #[arg(long, value_delimiter = ',', required = true)]
        lengths: Vec<f64>,

        #[arg(long, value_delimiter = ',')]
        spacings: Vec<f64>,

        /// MHz
        #[arg(long, default_value_t = 144.0)]
        frequency: f64,

        #[arg(long, default_value = "output.nec")]
        out: PathBuf,
    },

    /// Write the default configuration as TOML
    InitConfig { path: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match cli.command {
        Command::Optimize {
            config,
            mode,
            seed,
            csv,
            report,
        } => optimize(config.as_deref(), mode, seed, csv, report),
        Command::SweepK {
            template,
            start,
            stop,
            step,
            config,
            csv,
        } => sweep_k(&template, start, stop, step, config.as_deref(), csv.as_deref()),
        Command::ExportDeck {
            lengths,
            spacings,
            frequency,
            out,
        } => export_deck(&lengths, &spacings, frequency, &out),
        Command::InitConfig { path } => {
            ConfigManager::new()
                .save_to_file(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Default configuration written to {}", path.display());
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ConfigManager> {
    let manager = ConfigManager::new();
    match path {
        Some(path) => manager
            .load_from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => {
            let config = AppConfig::load(None).context("loading configuration")?;
            manager.update(|c| *c = config)?;
        }
    }
    Ok(manager)
}

fn optimize(
    config_path: Option<&Path>,
    mode: Option<EvaluationMode>,
    seed: Option<u64>,
    csv: Option<PathBuf>,
    report: Option<PathBuf>,
) -> Result<()> {
    let manager = load_config(config_path)?;
    manager
        .update(|c| {
            if let Some(mode) = mode {
                c.simulation.mode = mode;
            }
            if seed.is_some() {
                c.genetic_algorithm.seed = seed;
            }
            if let Some(csv) = csv {
                c.output.csv_output_file = csv;
            }
            if report.is_some() {
                c.output.report_file = report;
            }
        })
        .context("applying command-line overrides")?;
    let config = manager.get();

    info!(
        "Optimizing {} elements, population {}, {} generations, {} mode",
        config.genetic_algorithm.num_elements,
        config.genetic_algorithm.population_size,
        config.genetic_algorithm.num_generations,
        config.simulation.mode
    );

    let runner = OptimizationRunner::start(config.clone()).context("starting optimization")?;
    let outcome = runner
        .wait(|message| {
            if let ProgressMessage::GenerationStart { generation, total } = message {
                info!("Generation {}/{}", generation, total);
            }
        })
        .context("optimization aborted")?;

    if outcome.cancelled {
        warn!("Run cancelled after {} generations", outcome.logbook.len());
    }
    for record in &outcome.logbook {
        info!(
            "gen {:>3} evals {:>3} | avg {:8.3} {:8.3} {:8.3} | max gain {:7.3} | min pen {:7.3} {:7.3}",
            record.generation,
            record.evaluations,
            record.avg.gain_db,
            record.avg.real_penalty,
            record.avg.imag_penalty,
            record.max.gain_db,
            record.min.real_penalty,
            record.min.imag_penalty
        );
    }

    println!("Hall of fame:");
    for individual in &outcome.hall_of_fame {
        let objectives = individual.fitness();
        println!(
            "  gain {:7.3} dB  |R-{}| {:7.3}  |X| {:7.3}  genome {:?}",
            objectives.gain_db,
            config.genetic_algorithm.target_real_impedance,
            objectives.real_penalty,
            objectives.imag_penalty,
            individual.genome
        );
    }

    let exporter = ResultExporter::new(config.genetic_algorithm.num_elements);
    exporter
        .write_csv(&outcome.population, &config.output.csv_output_file)
        .context("exporting final population")?;

    if let Some(path) = &config.output.report_file {
        RunReport::new(&config, &outcome)
            .write(path)
            .with_context(|| format!("writing run report {}", path.display()))?;
        info!("Run report written to {}", path.display());
    }

    Ok(())
}

fn sweep_k(
    template: &Path,
    start: f64,
    stop: f64,
    step: f64,
    config_path: Option<&Path>,
    csv: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?.get();
    let k_values = k_range(start, stop, step)?;

    let workspace = config.paths.workspace();
    workspace.prepare().context("preparing simulator workspace")?;
    let deck = ParametricDeck::load(template)?;

    let mut sweep = ParameterSweep::new(deck, Nec2Runner::new(workspace), NecReportParser);
    let points = sweep.run(&k_values).context("parametric sweep aborted")?;

    println!("{:>8} {:>12} {:>12} {:>10}", "k", "R (ohm)", "X (ohm)", "gain (dB)");
    for point in &points {
        println!(
            "{:>8.2} {:>12} {:>12} {:>10}",
            point.k,
            format_optional(point.real_impedance),
            format_optional(point.imag_impedance),
            format_optional(point.max_gain_db)
        );
    }

    if let Some(path) = csv {
        ResultExporter::write_sweep_csv(&points, path)?;
    }
    Ok(())
}

fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.3}", v))
}

fn export_deck(lengths: &[f64], spacings: &[f64], frequency: f64, out: &Path) -> Result<()> {
    if lengths.len() < 2 {
        bail!("need at least two element lengths");
    }
    if spacings.len() != lengths.len() - 1 {
        bail!(
            "{} lengths need {} spacings, got {}",
            lengths.len(),
            lengths.len() - 1,
            spacings.len()
        );
    }

    let deck = GeometryCodec.encode_export(lengths, spacings, frequency);
    std::fs::write(out, deck).with_context(|| format!("writing {}", out.display()))?;
    info!("Deck written to {}", out.display());
    Ok(())
}
