use crate::config::AppConfig;
use crate::engines::evaluation::{NecReportParser, Nec2Runner, ObjectiveEvaluator, ObjectiveFunction};
use crate::engines::generation::{
    ChannelProgressCallback, EvolutionConfig, EvolutionEngine, ProgressMessage, RunOutcome,
};
use crate::error::YagiError;
use log::{error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub type RunnerResult = Result<RunOutcome, YagiError>;

/// Drives one optimisation on a background thread so a front-end stays
/// responsive. The worker owns the evaluator, so the simulator is never
/// invoked from two places at once.
pub struct OptimizationRunner {
    handle: Option<JoinHandle<RunnerResult>>,
    progress_rx: Receiver<ProgressMessage>,
    cancel_flag: Arc<AtomicBool>,
}

impl OptimizationRunner {
    /// Prepare the simulator workspace and start a run against the NEC2
    /// executable configured in `config.paths`.
    pub fn start(config: AppConfig) -> Result<Self, YagiError> {
        config.validate()?;
        let workspace = config.paths.workspace();
        workspace.prepare()?;
        info!(
            "Simulator {} (deck {}, report {})",
            workspace.exe_file.display(),
            workspace.deck_path.display(),
            workspace.report_path.display()
        );

        let evaluator = ObjectiveEvaluator::new(
            Nec2Runner::new(workspace),
            NecReportParser,
            &config.simulation,
            &config.genetic_algorithm,
        );
        Self::start_with_evaluator(config, evaluator)
    }

    /// Start a run with any objective function, e.g. a stub simulator.
    pub fn start_with_evaluator<E>(config: AppConfig, evaluator: E) -> Result<Self, YagiError>
    where
        E: ObjectiveFunction + Send + 'static,
    {
        config.validate()?;
        let (progress_tx, progress_rx) = channel();
        let cancel_flag = Arc::new(AtomicBool::new(false));

        let genetic = &config.genetic_algorithm;
        let mode = config.simulation.mode;
        let engine = EvolutionEngine::new(EvolutionConfig::from(genetic), genetic.gene_layout(), evaluator)
            .with_cancel_flag(Arc::clone(&cancel_flag));

        let handle = thread::Builder::new()
            .name("yagiopt-evolution".to_string())
            .spawn(move || {
                info!("Optimization worker started ({} mode)", mode);
                let mut callback = ChannelProgressCallback::new(progress_tx);
                let result = engine.run(&mut callback);
                if let Err(e) = &result {
                    error!("Optimization failed: {}", e);
                }
                result
            })?;

        Ok(Self {
            handle: Some(handle),
            progress_rx,
            cancel_flag,
        })
    }

    /// Next pending progress message, without blocking.
    pub fn poll_progress(&self) -> Option<ProgressMessage> {
        self.progress_rx.try_recv().ok()
    }

    /// Ask the worker to stop before its next generation. A simulation
    /// already running is allowed to finish.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// The run's result once the worker has exited; `None` while it is
    /// still running or after the result was taken.
    pub fn try_get_results(&mut self) -> Option<RunnerResult> {
        let handle = self.handle.take()?;
        if handle.is_finished() {
            Some(join(handle))
        } else {
            self.handle = Some(handle);
            None
        }
    }

    /// Block until the worker exits. Progress not yet polled is passed to
    /// `on_progress` as it arrives.
    pub fn wait<F: FnMut(ProgressMessage)>(mut self, mut on_progress: F) -> RunnerResult {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| YagiError::Worker("result already taken".to_string()))?;

        // The sender is dropped when the worker returns, ending the loop
        while let Ok(message) = self.progress_rx.recv() {
            on_progress(message);
        }
        join(handle)
    }
}

fn join(handle: JoinHandle<RunnerResult>) -> RunnerResult {
    handle
        .join()
        .unwrap_or_else(|_| Err(YagiError::Worker("optimization thread panicked".to_string())))
}

impl Drop for OptimizationRunner {
    fn drop(&mut self) {
        self.cancel();
    }
}
