use crate::types::GenerationRecord;
use log::info;
use std::sync::mpsc::Sender;

/// Notifications emitted by the generation loop. Every hook is best-effort:
/// the engine catches a panicking callback and carries on.
pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, _generation: usize, _total: usize) {}

    fn on_individual_evaluated(&mut self, _current: usize, _total: usize) {}

    /// `fraction` is `generation / total`, in `[0, 1]`.
    fn on_generation_complete(&mut self, record: &GenerationRecord, fraction: f64);
}

pub struct ConsoleProgressCallback;

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_complete(&mut self, record: &GenerationRecord, fraction: f64) {
        info!(
            "Generation {} ({:.0}%): evals={} best gain={:.2} dB, min |R-R0|={:.2}, min |X|={:.2}",
            record.generation,
            fraction * 100.0,
            record.evaluations,
            record.max.gain_db,
            record.min.real_penalty,
            record.min.imag_penalty
        );
    }
}

/// Adapts a plain `FnMut(f64)` progress sink.
pub struct FnProgress<F>(pub F);

impl<F: FnMut(f64) + Send> ProgressCallback for FnProgress<F> {
    fn on_generation_complete(&mut self, _record: &GenerationRecord, fraction: f64) {
        (self.0)(fraction)
    }
}

pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_generation_complete(&mut self, _record: &GenerationRecord, _fraction: f64) {}
}

// For handing progress to a display thread
#[derive(Debug, Clone)]
pub enum ProgressMessage {
    GenerationStart { generation: usize, total: usize },
    IndividualEvaluated { current: usize, total: usize },
    GenerationComplete { record: GenerationRecord, fraction: f64 },
}

pub struct ChannelProgressCallback {
    sender: Sender<ProgressMessage>,
}

impl ChannelProgressCallback {
    pub fn new(sender: Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_generation_start(&mut self, generation: usize, total: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationStart { generation, total });
    }

    fn on_individual_evaluated(&mut self, current: usize, total: usize) {
        let _ = self.sender.send(ProgressMessage::IndividualEvaluated { current, total });
    }

    fn on_generation_complete(&mut self, record: &GenerationRecord, fraction: f64) {
        let _ = self.sender.send(ProgressMessage::GenerationComplete {
            record: record.clone(),
            fraction,
        });
    }
}
