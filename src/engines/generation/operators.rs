use crate::engines::generation::genome::{GeneLayout, Genome};
use crate::types::Individual;
use rand::Rng;

/// Mixing coefficient of blend crossover.
pub const BLEND_ALPHA: f64 = 0.5;

/// Attempts at drawing an in-bounds blend coefficient before falling back
/// to a convex combination.
const BLEND_RESAMPLE_LIMIT: usize = 16;

/// Generate a genome: uniform draws within bounds for free genes, fixed
/// values for locked ones.
pub fn random_genome<R: Rng>(layout: &GeneLayout, rng: &mut R) -> Genome {
    (0..layout.genome_length())
        .map(|i| match layout.locked_value(i) {
            Some(fixed) => fixed,
            None => rng.gen_range(layout.bounds(i).clone()),
        })
        .collect()
}

/// Mutation: each free gene is replaced by a fresh uniform draw within its
/// bounds with probability `gene_rate`. Returns whether any gene changed.
pub fn mutate<R: Rng>(genome: &mut [f64], layout: &GeneLayout, gene_rate: f64, rng: &mut R) -> bool {
    let mut changed = false;
    for (i, gene) in genome.iter_mut().enumerate() {
        if layout.is_locked(i) {
            continue;
        }
        if rng.gen::<f64>() < gene_rate {
            *gene = rng.gen_range(layout.bounds(i).clone());
            changed = true;
        }
    }
    changed
}

/// Blend crossover, applied in place to both parents.
///
/// Each free gene pair `(x1, x2)` becomes `((1-g)x1 + g x2, g x1 + (1-g)x2)`
/// with `g` drawn from `[-alpha, 1+alpha]`. A draw that would push either
/// child outside the gene bounds is re-sampled; after the re-sample limit
/// `g` is drawn from `[0, 1]`, and if rounding still escapes the bounds the
/// pair is left untouched. Returns whether any gene changed.
pub fn blend_crossover<R: Rng>(
    first: &mut [f64],
    second: &mut [f64],
    layout: &GeneLayout,
    alpha: f64,
    rng: &mut R,
) -> bool {
    let len = first.len().min(second.len());
    let mut changed = false;

    for i in 0..len {
        if layout.is_locked(i) {
            continue;
        }
        let bounds = layout.bounds(i);
        let (x1, x2) = (first[i], second[i]);

        let mut children = None;
        for _ in 0..BLEND_RESAMPLE_LIMIT {
            let gamma = (1.0 + 2.0 * alpha) * rng.gen::<f64>() - alpha;
            let (c1, c2) = blend_pair(x1, x2, gamma);
            if bounds.contains(&c1) && bounds.contains(&c2) {
                children = Some((c1, c2));
                break;
            }
        }
        if children.is_none() {
            let (c1, c2) = blend_pair(x1, x2, rng.gen::<f64>());
            if bounds.contains(&c1) && bounds.contains(&c2) {
                children = Some((c1, c2));
            }
        }

        if let Some((c1, c2)) = children {
            changed |= c1 != x1 || c2 != x2;
            first[i] = c1;
            second[i] = c2;
        }
    }

    changed
}

fn blend_pair(x1: f64, x2: f64, gamma: f64) -> (f64, f64) {
    ((1.0 - gamma) * x1 + gamma * x2, gamma * x1 + (1.0 - gamma) * x2)
}

/// Produce offspring from a copy of `population`: consecutive pairs are
/// blended with probability `crossover_rate`, then each child is mutated
/// with probability `mutation_rate` (and, inside a mutated child, each gene
/// with probability `mutation_rate`). Children whose genes changed lose
/// their cached objectives; untouched copies keep them.
pub fn vary<R: Rng>(
    population: &[Individual],
    layout: &GeneLayout,
    crossover_rate: f64,
    mutation_rate: f64,
    rng: &mut R,
) -> Vec<Individual> {
    let mut offspring: Vec<Individual> = population.to_vec();

    for i in (1..offspring.len()).step_by(2) {
        if rng.gen::<f64>() < crossover_rate {
            let (left, right) = offspring.split_at_mut(i);
            let first = &mut left[i - 1];
            let second = &mut right[0];
            if blend_crossover(&mut first.genome, &mut second.genome, layout, BLEND_ALPHA, rng) {
                first.invalidate();
                second.invalidate();
            }
        }
    }

    for child in offspring.iter_mut() {
        if rng.gen::<f64>() < mutation_rate && mutate(&mut child.genome, layout, mutation_rate, rng) {
            child.invalidate();
        }
    }

    offspring
}
