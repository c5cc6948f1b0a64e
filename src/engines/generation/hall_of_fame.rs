use crate::engines::generation::pareto::{self, MultiObjectiveIndividual};
use crate::types::Individual;

use std::cmp::Ordering;

/// Bounded archive of the best mutually non-dominated individuals seen
/// across every generation of a run.
pub struct HallOfFame {
    members: Vec<Individual>,
    max_size: usize,
}

impl HallOfFame {
    pub fn new(max_size: usize) -> Self {
        Self {
            members: Vec::new(),
            max_size,
        }
    }

    /// Offer every evaluated individual of `population` to the archive.
    /// Returns how many were admitted.
    pub fn update(&mut self, population: &[Individual]) -> usize {
        let mut admitted = 0;
        for individual in population {
            if self.try_add(individual) {
                admitted += 1;
            }
        }
        admitted
    }

    /// Admit `candidate` unless it is unevaluated, already present, or
    /// dominated by a member. Members it dominates are evicted.
    pub fn try_add(&mut self, candidate: &Individual) -> bool {
        let Some(objectives) = candidate.objectives else {
            return false;
        };

        if self.members.iter().any(|m| m.genome == candidate.genome) {
            return false;
        }
        if self.members.iter().any(|m| m.fitness().dominates(&objectives)) {
            return false;
        }

        self.members.retain(|m| !objectives.dominates(&m.fitness()));
        self.members.push(candidate.clone());
        self.sort_and_trim();
        true
    }

    /// Order members by crowding distance and trim to capacity. The member
    /// with the highest real gain is never the one trimmed.
    fn sort_and_trim(&mut self) {
        if self.members.len() <= self.max_size {
            return;
        }

        let mut ranked: Vec<MultiObjectiveIndividual<usize>> = self
            .members
            .iter()
            .enumerate()
            .map(|(i, m)| MultiObjectiveIndividual::new(i, m.fitness()))
            .collect();
        let front: Vec<usize> = (0..ranked.len()).collect();
        pareto::calculate_crowding_distance(&mut ranked, &front);

        let mut order: Vec<usize> = front;
        order.sort_by(|&a, &b| {
            ranked[b]
                .crowding_distance
                .partial_cmp(&ranked[a].crowding_distance)
                .unwrap_or(Ordering::Equal)
        });

        if let Some(best) = self.best_gain_index() {
            if let Some(pos) = order.iter().position(|&i| i == best) {
                if pos >= self.max_size && self.max_size > 0 {
                    order.remove(pos);
                    order.insert(self.max_size - 1, best);
                }
            }
        }
        order.truncate(self.max_size);

        let mut slots: Vec<Option<Individual>> = self.members.drain(..).map(Some).collect();
        self.members = order.into_iter().filter_map(|i| slots[i].take()).collect();
    }

    fn best_gain_index(&self) -> Option<usize> {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.fitness().is_failure())
            .max_by(|(_, a), (_, b)| {
                a.fitness()
                    .gain_db
                    .partial_cmp(&b.fitness().gain_db)
                    .unwrap_or(Ordering::Equal)
            })
            .map(|(i, _)| i)
    }

    /// Highest gain among members that are real results.
    pub fn best_gain(&self) -> Option<f64> {
        self.best_gain_index()
            .map(|i| self.members[i].fitness().gain_db)
    }

    pub fn get_all(&self) -> &[Individual] {
        &self.members
    }

    pub fn into_members(self) -> Vec<Individual> {
        self.members
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
