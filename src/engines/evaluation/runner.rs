use crate::error::{Result, YagiError};
use log::debug;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Fixed set of files shared by every simulation of a run. Only one
/// simulation may use a workspace at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationWorkspace {
    pub exe_dir: PathBuf,
    pub exe_file: PathBuf,
    /// Two lines: deck path, report path. Fed to the engine's stdin.
    pub instruction_file: PathBuf,
    pub deck_path: PathBuf,
    pub report_path: PathBuf,
}

impl SimulationWorkspace {
    pub fn instructions(&self) -> String {
        format!("{}\n{}\n", self.deck_path.display(), self.report_path.display())
    }

    /// Create the deck/report directories and write the instruction file.
    /// Called once per run, before the first evaluation.
    pub fn prepare(&self) -> Result<()> {
        for path in [&self.deck_path, &self.report_path, &self.instruction_file] {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.instruction_file, self.instructions()).map_err(|source| {
            YagiError::DeckWrite {
                path: self.instruction_file.clone(),
                source,
            }
        })?;
        debug!("Instruction file written to {}", self.instruction_file.display());
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulationOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl SimulationOutput {
    /// Any text on stderr counts as failure, whatever the exit code.
    pub fn is_failure(&self) -> bool {
        !self.stderr.is_empty() || self.exit_code != Some(0)
    }
}

/// One blocking invocation of the external engine against the deck at
/// [`SimulationRunner::deck_path`].
pub trait SimulationRunner: Send {
    fn deck_path(&self) -> &Path;
    fn run(&mut self) -> Result<SimulationOutput>;
    fn read_report(&self) -> Result<String>;
}

/// Runs the NEC2 executable with the instruction file on stdin, from
/// inside its own directory.
pub struct Nec2Runner {
    workspace: SimulationWorkspace,
}

impl Nec2Runner {
    pub fn new(workspace: SimulationWorkspace) -> Self {
        Self { workspace }
    }

    pub fn workspace(&self) -> &SimulationWorkspace {
        &self.workspace
    }
}

impl SimulationRunner for Nec2Runner {
    fn deck_path(&self) -> &Path {
        &self.workspace.deck_path
    }

    fn run(&mut self) -> Result<SimulationOutput> {
        // A stale report must never be read back as this run's result
        match fs::remove_file(&self.workspace.report_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(YagiError::SimulationInvocation(format!(
                    "cannot clear previous report {}: {}",
                    self.workspace.report_path.display(),
                    e
                )))
            }
        }

        let stdin = File::open(&self.workspace.instruction_file).map_err(|e| {
            YagiError::SimulationInvocation(format!(
                "cannot open instruction file {}: {}",
                self.workspace.instruction_file.display(),
                e
            ))
        })?;

        let output = Command::new(&self.workspace.exe_file)
            .current_dir(&self.workspace.exe_dir)
            .stdin(Stdio::from(stdin))
            .output()
            .map_err(|e| {
                YagiError::SimulationInvocation(format!(
                    "failed to launch {}: {}",
                    self.workspace.exe_file.display(),
                    e
                ))
            })?;

        Ok(SimulationOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }

    fn read_report(&self) -> Result<String> {
        let bytes = fs::read(&self.workspace.report_path).map_err(|e| {
            YagiError::OutputParse(format!(
                "report {} unreadable: {}",
                self.workspace.report_path.display(),
                e
            ))
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
