use std::ops::RangeInclusive;

/// Design variables of one antenna candidate.
///
/// The first `num_elements` genes are wire lengths in metres, the remaining
/// `num_elements - 1` genes are the spacings between consecutive elements,
/// also in metres. Lengths and spacings are kept in one flat vector so that
/// blend crossover and per-gene mutation can treat every gene uniformly;
/// [`GeneLayout`] knows which slice is which and what bounds apply.
pub type Genome = Vec<f64>;

/// Lower bound of every unlocked spacing gene, in metres.
pub const MIN_SPACING: f64 = 0.1;

/// Per-gene bounds and lock flags, derived once per run from the
/// configuration and handed to every operator that creates or changes genes.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneLayout {
    pub num_elements: usize,
    pub length_bounds: RangeInclusive<f64>,
    pub spacing_bounds: RangeInclusive<f64>,
    pub lock_lengths: bool,
    pub lock_spacings: bool,
    pub locked_lengths: Vec<f64>,
    pub locked_spacings: Vec<f64>,
}

impl GeneLayout {
    pub fn genome_length(&self) -> usize {
        2 * self.num_elements - 1
    }

    pub fn is_length_gene(&self, index: usize) -> bool {
        index < self.num_elements
    }

    pub fn bounds(&self, index: usize) -> &RangeInclusive<f64> {
        if self.is_length_gene(index) {
            &self.length_bounds
        } else {
            &self.spacing_bounds
        }
    }

    pub fn is_locked(&self, index: usize) -> bool {
        if self.is_length_gene(index) {
            self.lock_lengths
        } else {
            self.lock_spacings
        }
    }

    /// Fixed value of a locked gene, `None` for free genes.
    pub fn locked_value(&self, index: usize) -> Option<f64> {
        if !self.is_locked(index) {
            return None;
        }
        if self.is_length_gene(index) {
            self.locked_lengths.get(index).copied()
        } else {
            self.locked_spacings.get(index - self.num_elements).copied()
        }
    }

    /// Split a genome into `(lengths, spacings)`.
    pub fn split<'a>(&self, genome: &'a [f64]) -> (&'a [f64], &'a [f64]) {
        genome.split_at(self.num_elements.min(genome.len()))
    }

    /// True when every free gene lies inside its bounds and every locked gene
    /// holds its fixed value.
    pub fn admits(&self, genome: &[f64]) -> bool {
        genome.len() == self.genome_length()
            && genome.iter().enumerate().all(|(i, gene)| match self.locked_value(i) {
                Some(fixed) => *gene == fixed,
                None => self.bounds(i).contains(gene),
            })
    }
}
