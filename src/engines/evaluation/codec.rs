use crate::error::{Result, YagiError};
use std::fmt::Write as _;
use std::path::Path;

pub const SEGMENTS_PER_WIRE: u32 = 9;
pub const WIRE_RADIUS: f64 = 0.006;
/// Wire-loading conductivity written into exported decks (S/m)
pub const EXPORT_CONDUCTIVITY: u64 = 37_700_000;

/// Writes genomes as NEC2 card decks.
///
/// Every element lies along the Y axis, centred on X, with the first
/// element at `x = 0` and each following one shifted by the matching
/// spacing. The driven element is wire 2, segment 5.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryCodec;

impl GeometryCodec {
    /// Deck handed to the simulator: geometry, ground, excitation,
    /// frequency (MHz), execute, and a 73-point radiation pattern.
    pub fn encode(&self, lengths: &[f64], spacings: &[f64], frequency: f64) -> String {
        let mut deck = String::new();
        deck.push_str("CM\n");
        deck.push_str("CM forw: 90, 0 ; back:-90, 0\n");
        deck.push_str("CE\n");

        for (i, (x, half)) in element_positions(lengths, spacings).enumerate() {
            let _ = writeln!(
                deck,
                "GW  {:<2} {}   {:.4} {:.4} 0   {:.4} {:.4} 0   {}",
                i + 1,
                SEGMENTS_PER_WIRE,
                x,
                -half,
                x,
                half,
                WIRE_RADIUS
            );
        }

        deck.push_str("GE  0\n");
        deck.push_str("GN  -1\n");
        deck.push_str("EK\n");
        deck.push_str("EX  0  2  5 0  1 0\n");
        let _ = writeln!(deck, "FR  0  0  0  0  {}  0", frequency);
        deck.push_str("XQ\n");
        deck.push_str("RP  0  73 1  1000 -180 0  5\n");
        deck.push_str("EN\n");
        deck
    }

    /// Encode and write the deck in one go. The file is either fully
    /// written or the error is reported as [`YagiError::DeckWrite`].
    pub fn write_deck(
        &self,
        path: &Path,
        lengths: &[f64],
        spacings: &[f64],
        frequency: f64,
    ) -> Result<()> {
        let deck = self.encode(lengths, spacings, frequency);
        std::fs::write(path, deck).map_err(|source| YagiError::DeckWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Tab-separated deck for opening a result in an external viewer.
    /// Carries a wire-loading card and no execute or pattern cards.
    pub fn encode_export(&self, lengths: &[f64], spacings: &[f64], frequency: f64) -> String {
        let mut deck = String::from("CM\nCE\n");

        for (i, (x, half)) in element_positions(lengths, spacings).enumerate() {
            let _ = writeln!(
                deck,
                "GW\t{}\t{}\t{:.3}\t{:.3}\t0\t{:.3}\t{:.3}\t0\t{}",
                i + 1,
                SEGMENTS_PER_WIRE,
                x,
                -half,
                x,
                half,
                WIRE_RADIUS
            );
        }

        deck.push_str("GE\t0\n");
        let _ = writeln!(deck, "LD\t{}\t2\t0\t0\t{}", lengths.len(), EXPORT_CONDUCTIVITY);
        deck.push_str("GN\t-1\n");
        deck.push_str("EK\n");
        deck.push_str("EX\t0\t2\t5\t0\t1\t0\t0\t'Voltage source (1+j0) at wire 1 segment\n");
        let _ = writeln!(deck, "FR\t0\t0\t0\t0\t{}\t0", frequency);
        deck.push_str("EN\n");
        deck
    }
}

/// `(x, half_length)` for each element. Extra spacings are ignored.
fn element_positions<'a>(
    lengths: &'a [f64],
    spacings: &'a [f64],
) -> impl Iterator<Item = (f64, f64)> + 'a {
    let mut x = 0.0;
    lengths.iter().enumerate().map(move |(i, length)| {
        let position = x;
        if let Some(spacing) = spacings.get(i) {
            x += spacing;
        }
        (position, length / 2.0)
    })
}
