use crate::error::{Result, YagiError};
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::LazyLock;

/// Pattern card appended to every rendered deck.
pub const SWEEP_PATTERN_CARD: &str = "RP 0 19 73 1003 -90 0 5 5";

static K_ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"k=([-+]?\d*\.\d+|\d+)").expect("k assignment pattern compiles"));

static PLUS_K: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+-]?\d*\.\d+|\d+)\+k").expect("+k pattern compiles"));

static MINUS_K: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+-]?\d*\.\d+|\d+)-k").expect("-k pattern compiles"));

/// A hand-written deck with a symbolic offset `k`.
///
/// The template declares `SY k=<value>` and writes wire coordinates as
/// `<num>+k` or `<num>-k`. Rendering resolves those to plain numbers so
/// the engine never sees the symbol.
#[derive(Debug, Clone)]
pub struct ParametricDeck {
    template: String,
}

impl ParametricDeck {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let template = std::fs::read_to_string(path).map_err(|e| {
            YagiError::Configuration(format!("cannot read deck template {}: {}", path.display(), e))
        })?;
        Ok(Self::new(template))
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Value of the first `k=` assignment, if any.
    pub fn k(&self) -> Option<f64> {
        K_ASSIGNMENT
            .captures(&self.template)
            .and_then(|caps| caps[1].parse().ok())
    }

    /// Rewrite every `k=<value>` in the template.
    pub fn set_k(&mut self, k: f64) {
        let replacement = format!("k={}", k);
        self.template = K_ASSIGNMENT
            .replace_all(&self.template, replacement.as_str())
            .into_owned();
    }

    /// Engine-ready deck for `k`: the `SY k=` line and the `EN` card are
    /// dropped, `<num>±k` in GW cards becomes a 2-decimal number, and the
    /// sweep pattern card closes the deck.
    pub fn render(&self, k: f64) -> String {
        let mut deck = String::with_capacity(self.template.len() + SWEEP_PATTERN_CARD.len() + 1);

        for line in self.template.lines() {
            if line.contains("SY k=") || card(line) == Some("EN") {
                continue;
            }
            let line = if card(line) == Some("GW") {
                let plus = substitute(&PLUS_K, line, |v| v + k);
                Cow::Owned(substitute(&MINUS_K, &plus, |v| v - k).into_owned())
            } else {
                Cow::Borrowed(line)
            };
            let _ = writeln!(deck, "{}", line);
        }

        deck.push_str(SWEEP_PATTERN_CARD);
        deck.push('\n');
        deck
    }

    pub fn write_render(&self, k: f64, path: &Path) -> Result<()> {
        std::fs::write(path, self.render(k)).map_err(|source| YagiError::DeckWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn card(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

fn substitute<'a>(pattern: &Regex, line: &'a str, apply: impl Fn(f64) -> f64) -> Cow<'a, str> {
    pattern.replace_all(line, |caps: &Captures| match caps[1].parse::<f64>() {
        Ok(value) => format!("{:.2}", apply(value)),
        Err(_) => caps[0].to_string(),
    })
}

/// Values from `start` to `stop` inclusive in steps of `step`, each rounded
/// to two decimals.
pub fn k_range(start: f64, stop: f64, step: f64) -> Result<Vec<f64>> {
    if !(step > 0.0) {
        return Err(YagiError::Configuration(format!(
            "k step must be positive, got {}",
            step
        )));
    }
    if !start.is_finite() || !stop.is_finite() {
        return Err(YagiError::Configuration("k range bounds must be finite".to_string()));
    }

    let mut values = Vec::new();
    let mut i = 0u32;
    loop {
        let value = start + f64::from(i) * step;
        if value > stop + 1e-9 {
            break;
        }
        values.push((value * 100.0).round() / 100.0);
        i += 1;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "CM dual band
CE
SY k=0.05
GW 1 9 0 -0.25-k 0 0 0.25+k 0 0.006
GW 2 9 0.2 -0.2 0 0.2 0.2 0 0.006
GE 0
EX 0 1 5 0 1 0
FR 0 0 0 0 144 0
EN
";

    #[test]
    fn test_set_k_rewrites_assignment() {
        let mut deck = ParametricDeck::new(TEMPLATE);
        assert_eq!(deck.k(), Some(0.05));
        deck.set_k(0.12);
        assert_eq!(deck.k(), Some(0.12));
        assert!(deck.template().contains("SY k=0.12\n"));
    }

    #[test]
    fn test_render_resolves_symbol() {
        let rendered = ParametricDeck::new(TEMPLATE).render(0.1);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[2], "GW 1 9 0 -0.35 0 0 0.35 0 0.006");
        assert_eq!(lines[3], "GW 2 9 0.2 -0.2 0 0.2 0.2 0 0.006");
        assert!(!rendered.contains("SY k="));
        assert!(!lines.contains(&"EN"));
        assert_eq!(lines.last(), Some(&SWEEP_PATTERN_CARD));
    }

    #[test]
    fn test_render_keeps_non_gw_cards() {
        let rendered = ParametricDeck::new(TEMPLATE).render(0.0);
        assert!(rendered.contains("EX 0 1 5 0 1 0\n"));
        assert!(rendered.contains("FR 0 0 0 0 144 0\n"));
        assert!(rendered.starts_with("CM dual band\nCE\n"));
    }

    #[test]
    fn test_k_range_inclusive_and_rounded() {
        assert_eq!(k_range(0.0, 0.3, 0.1).unwrap(), vec![0.0, 0.1, 0.2, 0.3]);
        assert_eq!(k_range(0.05, 0.2, 0.1).unwrap(), vec![0.05, 0.15]);
        assert_eq!(k_range(0.5, 0.1, 0.1).unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn test_k_range_rejects_bad_step() {
        assert!(k_range(0.0, 1.0, 0.0).is_err());
        assert!(k_range(0.0, 1.0, -0.1).is_err());
    }

    #[test]
    fn test_write_render() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.inp");
        let deck = ParametricDeck::new(TEMPLATE);
        deck.write_render(0.02, &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), deck.render(0.02));
    }
}
