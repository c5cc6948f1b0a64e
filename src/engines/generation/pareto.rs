//! Pareto optimization utilities for multi-objective evolution
//! Implements NSGA-II style fast non-dominated sorting, crowding distance
//! and the environmental selection built on top of them.

use crate::types::{Individual, ObjectiveVector};
use std::cmp::Ordering;

/// Defines whether an objective should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationDirection {
    Maximize,
    Minimize,
}

/// Item carried through sorting together with its Pareto bookkeeping
#[derive(Debug, Clone)]
pub struct MultiObjectiveIndividual<T> {
    pub data: T,
    pub objectives: ObjectiveVector,
    pub rank: usize,            // Pareto rank (0 = best frontier)
    pub crowding_distance: f64, // Diversity measure
}

impl<T> MultiObjectiveIndividual<T> {
    pub fn new(data: T, objectives: ObjectiveVector) -> Self {
        Self {
            data,
            objectives,
            rank: 0,
            crowding_distance: 0.0,
        }
    }
}

/// Check if individual A dominates individual B
/// A dominates B if A is no worse than B in all objectives and strictly better in at least one
pub fn dominates(
    a_objectives: &[f64],
    b_objectives: &[f64],
    directions: &[OptimizationDirection],
) -> bool {
    if a_objectives.len() != b_objectives.len() || a_objectives.len() != directions.len() {
        return false;
    }

    let mut at_least_one_better = false;

    for i in 0..a_objectives.len() {
        let a_val = a_objectives[i];
        let b_val = b_objectives[i];

        let (a_better, b_better) = match directions[i] {
            OptimizationDirection::Maximize => (a_val > b_val, b_val > a_val),
            OptimizationDirection::Minimize => (a_val < b_val, b_val < a_val),
        };

        if b_better {
            return false;
        }

        if a_better {
            at_least_one_better = true;
        }
    }

    at_least_one_better
}

/// Fast non-dominated sorting (NSGA-II algorithm)
/// Returns indices grouped by Pareto front (0 = best, 1 = second best, etc.)
/// and stores each individual's rank.
pub fn fast_non_dominated_sort<T>(individuals: &mut [MultiObjectiveIndividual<T>]) -> Vec<Vec<usize>> {
    let n = individuals.len();
    if n == 0 {
        return Vec::new();
    }

    // domination_count: how many individuals dominate it
    // dominated_solutions: indices of individuals it dominates
    let mut domination_count = vec![0usize; n];
    let mut dominated_solutions: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut fronts: Vec<Vec<usize>> = Vec::new();
    let mut first_front = Vec::new();

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }

            if individuals[i].objectives.dominates(&individuals[j].objectives) {
                dominated_solutions[i].push(j);
            } else if individuals[j].objectives.dominates(&individuals[i].objectives) {
                domination_count[i] += 1;
            }
        }

        if domination_count[i] == 0 {
            individuals[i].rank = 0;
            first_front.push(i);
        }
    }

    fronts.push(first_front);

    let mut front_index = 0;
    while front_index < fronts.len() && !fronts[front_index].is_empty() {
        let mut next_front = Vec::new();

        for &i in &fronts[front_index] {
            for &j in &dominated_solutions[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    individuals[j].rank = front_index + 1;
                    next_front.push(j);
                }
            }
        }

        if !next_front.is_empty() {
            fronts.push(next_front);
        }
        front_index += 1;
    }

    fronts
}

/// Calculate crowding distance for individuals in a front
/// Higher values indicate more diversity (isolated individuals)
pub fn calculate_crowding_distance<T>(
    individuals: &mut [MultiObjectiveIndividual<T>],
    front_indices: &[usize],
) {
    let front_size = front_indices.len();

    if front_size <= 2 {
        for &idx in front_indices {
            individuals[idx].crowding_distance = f64::INFINITY;
        }
        return;
    }

    for &idx in front_indices {
        individuals[idx].crowding_distance = 0.0;
    }

    for obj in 0..3 {
        let value = |ind: &MultiObjectiveIndividual<T>| ind.objectives.to_array()[obj];

        let mut sorted_indices: Vec<usize> = front_indices.to_vec();
        sorted_indices.sort_by(|&a, &b| {
            value(&individuals[a])
                .partial_cmp(&value(&individuals[b]))
                .unwrap_or(Ordering::Equal)
        });

        // Boundary points have infinite distance
        individuals[sorted_indices[0]].crowding_distance = f64::INFINITY;
        individuals[sorted_indices[front_size - 1]].crowding_distance = f64::INFINITY;

        let min_val = value(&individuals[sorted_indices[0]]);
        let max_val = value(&individuals[sorted_indices[front_size - 1]]);
        let range = max_val - min_val;

        if range.abs() < 1e-10 {
            continue;
        }

        for i in 1..(front_size - 1) {
            let idx = sorted_indices[i];
            let prev_val = value(&individuals[sorted_indices[i - 1]]);
            let next_val = value(&individuals[sorted_indices[i + 1]]);

            individuals[idx].crowding_distance += (next_val - prev_val) / range;
        }
    }
}

/// Compare two individuals for selection (crowded comparison operator)
/// Returns true if individual A should be preferred over individual B
pub fn crowded_comparison<T>(
    a: &MultiObjectiveIndividual<T>,
    b: &MultiObjectiveIndividual<T>,
) -> bool {
    if a.rank != b.rank {
        return a.rank < b.rank;
    }
    a.crowding_distance > b.crowding_distance
}

/// NSGA-II environmental selection: whole fronts are taken in rank order
/// until the next one would overflow `k`, the overflowing front is then
/// filled by descending crowding distance. Ties keep input order.
pub fn select_nsga2(pool: Vec<Individual>, k: usize) -> Vec<Individual> {
    if pool.len() <= k {
        return pool;
    }

    let mut ranked: Vec<MultiObjectiveIndividual<usize>> = pool
        .iter()
        .enumerate()
        .map(|(i, ind)| MultiObjectiveIndividual::new(i, ind.fitness()))
        .collect();

    let fronts = fast_non_dominated_sort(&mut ranked);

    let mut chosen: Vec<usize> = Vec::with_capacity(k);
    for front in &fronts {
        if chosen.len() + front.len() <= k {
            chosen.extend_from_slice(front);
            if chosen.len() == k {
                break;
            }
            continue;
        }

        calculate_crowding_distance(&mut ranked, front);
        let mut last_front = front.clone();
        last_front.sort_by(|&a, &b| {
            if crowded_comparison(&ranked[a], &ranked[b]) {
                Ordering::Less
            } else if crowded_comparison(&ranked[b], &ranked[a]) {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        });
        chosen.extend(last_front.into_iter().take(k - chosen.len()));
        break;
    }

    let mut slots: Vec<Option<Individual>> = pool.into_iter().map(Some).collect();
    chosen
        .into_iter()
        .filter_map(|i| slots[ranked[i].data].take())
        .collect()
}
