use super::parametric::ParametricDeck;
use super::parser::ReportParser;
use super::runner::SimulationRunner;
use crate::error::{Result, YagiError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Result of simulating a parametric deck at one value of `k`. Missing
/// values mean the simulation or the report failed at that point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub k: f64,
    pub real_impedance: Option<f64>,
    pub imag_impedance: Option<f64>,
    pub max_gain_db: Option<f64>,
}

impl SweepPoint {
    fn failed(k: f64) -> Self {
        Self {
            k,
            real_impedance: None,
            imag_impedance: None,
            max_gain_db: None,
        }
    }
}

/// Walks a [`ParametricDeck`] through a list of `k` values, one simulation
/// per value, writing each render to the runner's deck path.
pub struct ParameterSweep<R: SimulationRunner, P: ReportParser> {
    deck: ParametricDeck,
    runner: R,
    parser: P,
}

impl<R: SimulationRunner, P: ReportParser> ParameterSweep<R, P> {
    pub fn new(deck: ParametricDeck, runner: R, parser: P) -> Self {
        Self {
            deck,
            runner,
            parser,
        }
    }

    pub fn deck(&self) -> &ParametricDeck {
        &self.deck
    }

    /// Only a deck that cannot be written stops the sweep.
    pub fn run(&mut self, k_values: &[f64]) -> Result<Vec<SweepPoint>> {
        let mut points = Vec::with_capacity(k_values.len());

        for &k in k_values {
            info!("Simulating k={}", k);
            self.deck.set_k(k);
            let deck_path = self.runner.deck_path().to_path_buf();
            self.deck.write_render(k, &deck_path)?;

            let point = match self.simulate(k) {
                Ok(point) => point,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("k={} failed: {}", k, e);
                    SweepPoint::failed(k)
                }
            };
            points.push(point);
        }

        Ok(points)
    }

    fn simulate(&mut self, k: f64) -> Result<SweepPoint> {
        let runner = &mut self.runner;
        let output = catch_unwind(AssertUnwindSafe(|| runner.run())).map_err(|_| {
            YagiError::SimulationInvocation("simulation runner panicked".to_string())
        })??;
        if output.is_failure() {
            return Err(YagiError::SimulationInvocation(output.stderr.trim().to_string()));
        }

        let parsed = self.parser.parse(&self.runner.read_report()?);
        Ok(SweepPoint {
            k,
            real_impedance: parsed.real_impedance,
            imag_impedance: parsed.imag_impedance,
            max_gain_db: parsed.has_gain().then_some(parsed.max_gain_db),
        })
    }
}
