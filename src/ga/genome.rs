//! GA genome: an integer flip-count vector `B`, laid out as either a single
//! ladder (`L-1` genes) or one ladder per feature (`N*(L-1)` genes) — spec §4.I.

use rand::Rng;

/// A flat vector of nonnegative flip counts. The optimizer interprets the
/// layout (single ladder vs. per-feature ladders) via [`crate::config::HdcConfig::genome_len`];
/// the genome itself is layout-agnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genome {
    genes: Vec<usize>,
}

impl Genome {
    pub fn new(genes: Vec<usize>) -> Self {
        Self { genes }
    }

    pub fn genes(&self) -> &[usize] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn sum(&self) -> usize {
        self.genes.iter().sum()
    }

    /// One ladder's worth of genes, for the per-feature genome layout
    /// (`ladder_len` genes per feature, `ladder` selects which one).
    pub fn ladder(&self, ladder: usize, ladder_len: usize) -> &[usize] {
        &self.genes[ladder * ladder_len..(ladder + 1) * ladder_len]
    }

    /// *Uniform init* (spec §4.I): draw real weights in `[0,1)`, normalize
    /// to sum 1, assign `Bi = round(wi*K)`, then distribute any rounding
    /// remainder by random +1 increments until `sum(B) == K`.
    pub fn uniform_init(len: usize, flip_budget: usize, rng: &mut impl Rng) -> Self {
        if len == 0 {
            return Self::new(Vec::new());
        }
        let weights: Vec<f64> = (0..len).map(|_| rng.gen_range(0.0..1.0)).collect();
        let total: f64 = weights.iter().sum::<f64>().max(f64::EPSILON);
        let mut genes: Vec<i64> = weights
            .iter()
            .map(|w| ((w / total) * flip_budget as f64).round() as i64)
            .collect();

        let mut remainder = flip_budget as i64 - genes.iter().sum::<i64>();
        while remainder > 0 {
            let idx = rng.gen_range(0..len);
            genes[idx] += 1;
            remainder -= 1;
        }
        while remainder < 0 {
            let idx = rng.gen_range(0..len);
            if genes[idx] > 0 {
                genes[idx] -= 1;
                remainder += 1;
            }
        }
        Self::new(genes.into_iter().map(|g| g.max(0) as usize).collect())
    }

    /// *Equal init* (spec §4.I): `Bi = K/(L-1)` with boundary rounding that
    /// respects cumulative targets — the same cumulative-target rounding
    /// `ContinuousItemMemory::uniform` uses to build a ladder from a flip
    /// budget, applied here to seed a genome instead of a ladder directly.
    pub fn equal_init(len: usize, flip_budget: usize) -> Self {
        if len == 0 {
            return Self::new(Vec::new());
        }
        let mut genes = Vec::with_capacity(len);
        let mut prev_target = 0i64;
        for l in 1..=len {
            let target = ((l as f64) * (flip_budget as f64) / (len as f64)).round() as i64;
            let target = target.clamp(0, flip_budget as i64);
            genes.push((target - prev_target).max(0) as usize);
            prev_target = target;
        }
        Self::new(genes)
    }

    /// Per-gene uniform crossover: with probability `crossover_rate`, each
    /// gene is drawn independently from parent A or parent B; otherwise the
    /// child is a straight copy of parent A.
    pub fn crossover(a: &Genome, b: &Genome, crossover_rate: f64, rng: &mut impl Rng) -> Genome {
        debug_assert_eq!(a.len(), b.len());
        if !rng.gen_bool(crossover_rate) {
            return a.clone();
        }
        let genes = a
            .genes
            .iter()
            .zip(&b.genes)
            .map(|(&ga, &gb)| if rng.gen_bool(0.5) { ga } else { gb })
            .collect();
        Genome::new(genes)
    }

    /// Donor/receiver transfer mutation: per gene, with probability
    /// `mutation_rate`, decrement one randomly chosen positive gene and
    /// increment a different randomly chosen gene. Zero-sum by construction,
    /// so `sum(B)` (and therefore the flip budget) never drifts — the spec's
    /// primary mutation operator, in place of the legacy independent ±1 walk.
    pub fn mutate(&mut self, mutation_rate: f64, rng: &mut impl Rng) {
        let len = self.genes.len();
        if len < 2 {
            return;
        }
        for _ in 0..len {
            if !rng.gen_bool(mutation_rate) {
                continue;
            }
            let positive: Vec<usize> = (0..len).filter(|&i| self.genes[i] > 0).collect();
            if positive.is_empty() {
                continue;
            }
            let donor = positive[rng.gen_range(0..positive.len())];
            let mut receiver = rng.gen_range(0..len);
            while receiver == donor && len > 1 {
                receiver = rng.gen_range(0..len);
            }
            self.genes[donor] -= 1;
            self.genes[receiver] += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn uniform_init_sums_to_budget() {
        let mut rng = StdRng::seed_from_u64(1);
        let genome = Genome::uniform_init(5, 100, &mut rng);
        assert_eq!(genome.sum(), 100);
        assert_eq!(genome.len(), 5);
    }

    #[test]
    fn equal_init_sums_to_budget() {
        let genome = Genome::equal_init(4, 100);
        assert_eq!(genome.sum(), 100);
    }

    #[test]
    fn mutation_preserves_sum() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut genome = Genome::equal_init(6, 60);
        let before = genome.sum();
        for _ in 0..20 {
            genome.mutate(0.5, &mut rng);
        }
        assert_eq!(genome.sum(), before);
    }

    #[test]
    fn crossover_without_probability_copies_parent_a() {
        let mut rng = StdRng::seed_from_u64(3);
        let a = Genome::new(vec![1, 2, 3]);
        let b = Genome::new(vec![9, 9, 9]);
        let child = Genome::crossover(&a, &b, 0.0, &mut rng);
        assert_eq!(child, a);
    }

    #[test]
    fn ladder_slices_per_feature_chunk() {
        let genome = Genome::new(vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(genome.ladder(0, 3), &[1, 2, 3]);
        assert_eq!(genome.ladder(1, 3), &[4, 5, 6]);
    }
}
