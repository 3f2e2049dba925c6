//! Selection machinery: NSGA-II (Pareto) and scalar (MULTI/ACCURACY) ranking,
//! tournament selection — spec §4.I.

use rand::Rng;

use crate::config::SelectionMode;

use super::genome::Genome;

/// One evaluated candidate: a genome plus its fitness under training+evaluation.
#[derive(Debug, Clone)]
pub struct Individual {
    pub genome: Genome,
    pub accuracy: f64,
    pub similarity: f32,
    /// NSGA-II front rank (0 = non-dominated); unused outside `PARETO`.
    pub rank: usize,
    /// NSGA-II crowding distance; unused outside `PARETO`.
    pub crowding: f64,
}

impl Individual {
    pub fn new(genome: Genome, accuracy: f64, similarity: f32) -> Self {
        Self {
            genome,
            accuracy,
            similarity,
            rank: 0,
            crowding: 0.0,
        }
    }

    /// Scalar fitness for `MULTI`/`ACCURACY` selection: `accuracy - similarity`
    /// or `accuracy` alone.
    pub fn scalar_fitness(&self, mode: SelectionMode) -> f64 {
        match mode {
            SelectionMode::Multi => self.accuracy - self.similarity as f64,
            SelectionMode::Accuracy => self.accuracy,
            SelectionMode::Pareto => self.accuracy - self.similarity as f64,
        }
    }

    /// `a` dominates `b` iff `a` is at least as good on both objectives
    /// (maximize accuracy, minimize similarity) and strictly better on one.
    fn dominates(&self, other: &Individual) -> bool {
        let not_worse = self.accuracy >= other.accuracy && self.similarity <= other.similarity;
        let strictly_better = self.accuracy > other.accuracy || self.similarity < other.similarity;
        not_worse && strictly_better
    }
}

/// Non-dominated sort into fronts, front 0 being the Pareto-optimal set.
/// Returns one front per rank, each a list of indices into `individuals`.
pub fn non_dominated_sort(individuals: &[Individual]) -> Vec<Vec<usize>> {
    let n = individuals.len();
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count = vec![0usize; n];
    let mut fronts: Vec<Vec<usize>> = vec![Vec::new()];

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            if individuals[i].dominates(&individuals[j]) {
                dominated_by[i].push(j);
            } else if individuals[j].dominates(&individuals[i]) {
                domination_count[i] += 1;
            }
        }
        if domination_count[i] == 0 {
            fronts[0].push(i);
        }
    }

    let mut current = 0;
    while !fronts[current].is_empty() {
        let mut next = Vec::new();
        for &i in &fronts[current] {
            for &j in &dominated_by[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    next.push(j);
                }
            }
        }
        current += 1;
        fronts.push(next);
    }
    fronts.pop();
    fronts
}

/// Crowding distance within one front: normalized sum of neighbor gaps per
/// objective, boundary individuals pinned to infinity so they're always kept.
pub fn crowding_distance(front: &[usize], individuals: &[Individual]) -> Vec<f64> {
    let m = front.len();
    let mut distance = vec![0.0f64; m];
    if m == 0 {
        return distance;
    }
    if m <= 2 {
        return vec![f64::INFINITY; m];
    }

    // Objective 1: accuracy (maximize).
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| {
        individuals[front[a]]
            .accuracy
            .partial_cmp(&individuals[front[b]].accuracy)
            .unwrap()
    });
    accumulate_crowding(&order, &mut distance, |idx| individuals[front[idx]].accuracy);

    // Objective 2: similarity (minimize — same spread calculation either way).
    order.sort_by(|&a, &b| {
        individuals[front[a]]
            .similarity
            .partial_cmp(&individuals[front[b]].similarity)
            .unwrap()
    });
    accumulate_crowding(&order, &mut distance, |idx| individuals[front[idx]].similarity as f64);

    distance
}

fn accumulate_crowding(order: &[usize], distance: &mut [f64], value_of: impl Fn(usize) -> f64) {
    let m = order.len();
    distance[order[0]] = f64::INFINITY;
    distance[order[m - 1]] = f64::INFINITY;
    let lo = value_of(order[0]);
    let hi = value_of(order[m - 1]);
    let span = (hi - lo).abs();
    if span <= f64::EPSILON {
        return;
    }
    for w in 1..m - 1 {
        let prev = value_of(order[w - 1]);
        let next = value_of(order[w + 1]);
        if distance[order[w]].is_finite() {
            distance[order[w]] += (next - prev).abs() / span;
        }
    }
}

/// Assign `rank`/`crowding` in place from the computed fronts.
pub fn assign_ranks(individuals: &mut [Individual]) {
    let fronts = non_dominated_sort(individuals);
    for (rank, front) in fronts.iter().enumerate() {
        let distances = crowding_distance(front, individuals);
        for (&idx, &d) in front.iter().zip(&distances) {
            individuals[idx].rank = rank;
            individuals[idx].crowding = d;
        }
    }
}

/// `(rank, crowding)` ordering: lower rank wins; within a rank, higher
/// crowding wins (more diverse individuals survive ties).
fn better_pareto(a: &Individual, b: &Individual) -> bool {
    if a.rank != b.rank {
        return a.rank < b.rank;
    }
    a.crowding > b.crowding
}

/// Binary tournament: pick `tournament_size` random individuals, return the
/// index of the best by the active selection mode's criterion.
pub fn tournament_select(
    individuals: &[Individual],
    tournament_size: usize,
    mode: SelectionMode,
    rng: &mut impl Rng,
) -> usize {
    let n = individuals.len();
    let mut best = rng.gen_range(0..n);
    for _ in 1..tournament_size {
        let candidate = rng.gen_range(0..n);
        let candidate_is_better = match mode {
            SelectionMode::Pareto => better_pareto(&individuals[candidate], &individuals[best]),
            SelectionMode::Multi | SelectionMode::Accuracy => {
                individuals[candidate].scalar_fitness(mode) > individuals[best].scalar_fitness(mode)
            }
        };
        if candidate_is_better {
            best = candidate;
        }
    }
    best
}

/// `(μ+λ)` survivor selection: keep the best `population_size` of
/// `parents ∪ offspring`, ranked per the active selection mode.
pub fn select_survivors(
    mut merged: Vec<Individual>,
    population_size: usize,
    mode: SelectionMode,
) -> Vec<Individual> {
    match mode {
        SelectionMode::Pareto => {
            assign_ranks(&mut merged);
            merged.sort_by(|a, b| {
                a.rank
                    .cmp(&b.rank)
                    .then(b.crowding.partial_cmp(&a.crowding).unwrap())
            });
        }
        SelectionMode::Multi | SelectionMode::Accuracy => {
            merged.sort_by(|a, b| {
                b.scalar_fitness(mode)
                    .partial_cmp(&a.scalar_fitness(mode))
                    .unwrap()
            });
        }
    }
    merged.truncate(population_size);
    merged
}
