use log::warn;
use regex::Regex;
use std::sync::LazyLock;

/// Max gain reported when no radiation pattern line was recognised.
pub const NO_GAIN_DB: f64 = -999.99;

pub const IMPEDANCE_HEADER: &str = "IMPEDANCE (OHMS)";
pub const RADIATION_HEADER: &str = "- - - RADIATION PATTERNS - - -";

/// Index of the real part among the numeric tokens of an input-parameter
/// row (tag, segment, voltage re/im, current re/im, impedance re/im, ...).
const IMPEDANCE_REAL_TOKEN: usize = 6;
const IMPEDANCE_IMAG_TOKEN: usize = 7;

static ROW_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\s+\d+").expect("row pattern compiles"));

static NUMERIC_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-+]?\d*\.\d+E[-+]?\d+|[-+]?\d+\.\d+|[-+]?\d+").expect("token pattern compiles")
});

static GAIN_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\s+[-+]?\d+\.\d+\s+[-+]?\d+\.\d+\s+[-+]?\d+\.\d+\s+([-+]?\d+\.\d+)\s+[-+]?\d+\.\d+",
    )
    .expect("gain pattern compiles")
});

/// Quantities lifted from one simulator report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedReport {
    pub real_impedance: Option<f64>,
    pub imag_impedance: Option<f64>,
    pub max_gain_db: f64,
}

impl Default for ParsedReport {
    fn default() -> Self {
        Self {
            real_impedance: None,
            imag_impedance: None,
            max_gain_db: NO_GAIN_DB,
        }
    }
}

impl ParsedReport {
    pub fn has_gain(&self) -> bool {
        self.max_gain_db > NO_GAIN_DB
    }

    /// Impedance and gain, if all three were found.
    pub fn complete(&self) -> Option<(f64, f64, f64)> {
        match (self.real_impedance, self.imag_impedance) {
            (Some(real), Some(imag)) if self.has_gain() => Some((real, imag, self.max_gain_db)),
            _ => None,
        }
    }
}

/// Text-to-quantities step of an evaluation. Never fails: anything not
/// recognised is simply left missing in the result.
pub trait ReportParser: Send {
    fn parse(&self, report: &str) -> ParsedReport;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImpedanceScan {
    /// Header not seen yet
    Waiting,
    /// Header seen, looking for the first indexed row
    InSection,
    /// One row consumed; later impedance blocks are ignored
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RadiationScan {
    Outside,
    /// Stays active until end of input
    InSection,
}

/// Parser for NEC2 line-printer reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct NecReportParser;

impl NecReportParser {
    fn read_impedance_row(line: &str, report: &mut ParsedReport) {
        let tokens: Vec<&str> = NUMERIC_TOKEN.find_iter(line).map(|m| m.as_str()).collect();
        if tokens.len() <= IMPEDANCE_IMAG_TOKEN {
            warn!(
                "Impedance row has {} numeric fields, expected at least {}",
                tokens.len(),
                IMPEDANCE_IMAG_TOKEN + 1
            );
            return;
        }
        match (
            tokens[IMPEDANCE_REAL_TOKEN].parse::<f64>(),
            tokens[IMPEDANCE_IMAG_TOKEN].parse::<f64>(),
        ) {
            (Ok(real), Ok(imag)) => {
                report.real_impedance = Some(real);
                report.imag_impedance = Some(imag);
            }
            _ => warn!("Could not convert impedance fields in row: {}", line.trim()),
        }
    }

    fn read_gain_row(line: &str) -> Option<f64> {
        GAIN_ROW
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    }
}

impl ReportParser for NecReportParser {
    fn parse(&self, report: &str) -> ParsedReport {
        let mut parsed = ParsedReport::default();
        let mut impedance = ImpedanceScan::Waiting;
        let mut radiation = RadiationScan::Outside;

        for line in report.lines() {
            if line.contains(IMPEDANCE_HEADER) {
                if impedance == ImpedanceScan::Waiting {
                    impedance = ImpedanceScan::InSection;
                }
                continue;
            }
            if line.contains(RADIATION_HEADER) {
                radiation = RadiationScan::InSection;
                continue;
            }

            if impedance == ImpedanceScan::InSection && ROW_START.is_match(line) {
                Self::read_impedance_row(line, &mut parsed);
                impedance = ImpedanceScan::Done;
            }

            if radiation == RadiationScan::InSection {
                if let Some(gain) = Self::read_gain_row(line) {
                    parsed.max_gain_db = parsed.max_gain_db.max(gain);
                }
            }
        }

        parsed
    }
}
