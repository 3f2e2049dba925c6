//! VSA operations: bind, bundle, bundle_multi, permute, similarity.
//!
//! These are the core algebraic operations of spec §4.B. Each hypervector
//! carries its own dimension/mode (see [`super::HyperVec`]); `VsaOps` only
//! owns the dispatch to a SIMD kernel.

use rand::Rng;

use crate::error::VsaError;
use crate::simd::VsaKernel;

use super::{Dimension, HyperVec, Mode};

pub type VsaResult<T> = std::result::Result<T, VsaError>;

fn check_compatible(a: &HyperVec, b: &HyperVec) -> VsaResult<()> {
    if a.dim() != b.dim() {
        return Err(VsaError::DimensionMismatch {
            expected: a.dim(),
            actual: b.dim(),
        });
    }
    if a.mode() != b.mode() {
        return Err(VsaError::ModeMismatch {
            expected: a.mode().to_string(),
            actual: b.mode().to_string(),
        });
    }
    Ok(())
}

/// VSA operations backed by a SIMD kernel. Mode-agnostic: every method
/// inspects its operands' own `Mode` and dispatches accordingly, matching
/// the "classifier code remains mode-agnostic" guidance of spec §9.
pub struct VsaOps {
    kernel: Box<dyn VsaKernel>,
}

impl VsaOps {
    pub fn new(kernel: Box<dyn VsaKernel>) -> Self {
        Self { kernel }
    }

    pub fn isa_level(&self) -> crate::simd::IsaLevel {
        self.kernel.isa_level()
    }

    /// Sample a hypervector uniformly at random from the chosen representation
    /// space (independent bits, or independent ±1 per component).
    pub fn random(&self, dim: Dimension, mode: Mode, rng: &mut impl Rng) -> HyperVec {
        match mode {
            Mode::Binary => {
                let mut bits = vec![0u8; dim.binary_byte_len()];
                rng.fill(bits.as_mut_slice());
                let used = dim.0 % 8;
                if used != 0 {
                    if let Some(last) = bits.last_mut() {
                        *last &= 0xFFu8 << (8 - used);
                    }
                }
                HyperVec::Binary { dim: dim.0, bits }
            }
            Mode::Bipolar => {
                let vals: Vec<i32> = (0..dim.0)
                    .map(|_| if rng.gen_bool(0.5) { 1 } else { -1 })
                    .collect();
                HyperVec::Bipolar { dim: dim.0, vals }
            }
        }
    }

    /// `bind(a, b)`: XOR for Binary, elementwise product for Bipolar.
    /// Self-inverse in Binary mode.
    pub fn bind(&self, a: &HyperVec, b: &HyperVec) -> VsaResult<HyperVec> {
        check_compatible(a, b)?;
        match (a, b) {
            (HyperVec::Binary { dim, bits: ab }, HyperVec::Binary { bits: bb, .. }) => {
                let mut out = vec![0u8; ab.len()];
                self.kernel.xor_bind(ab, bb, &mut out);
                Ok(HyperVec::Binary { dim: *dim, bits: out })
            }
            (HyperVec::Bipolar { dim, vals: av }, HyperVec::Bipolar { vals: bv, .. }) => {
                let mut out = vec![0i32; av.len()];
                self.kernel.bipolar_bind(av, bv, &mut out);
                Ok(HyperVec::Bipolar { dim: *dim, vals: out })
            }
            _ => unreachable!("check_compatible already rejected mode mismatch"),
        }
    }

    /// Unbind: identical to `bind` (XOR is self-inverse; dividing out a
    /// `{-1,+1}` bipolar key is also a product by that same key).
    pub fn unbind(&self, bound: &HyperVec, key: &HyperVec) -> VsaResult<HyperVec> {
        self.bind(bound, key)
    }

    /// Pairwise `bundle(a, b)`. Binary: majority vote on the two input bits
    /// with ties (`count <= 1` out of 2) broken to 0, per spec §4.B. Bipolar:
    /// elementwise sum (magnitude may exceed 1).
    pub fn bundle(&self, a: &HyperVec, b: &HyperVec) -> VsaResult<HyperVec> {
        check_compatible(a, b)?;
        match (a, b) {
            (HyperVec::Binary { dim, .. }, HyperVec::Binary { .. }) => {
                let mut out = HyperVec::zero(Dimension(*dim), Mode::Binary);
                for i in 0..*dim {
                    let count = a.get(i) as u8 + b.get(i) as u8;
                    out.set_bit(i, count > 1);
                }
                Ok(out)
            }
            (HyperVec::Bipolar { dim, vals: av }, HyperVec::Bipolar { vals: bv, .. }) => {
                let mut out = av.clone();
                self.kernel.bipolar_add(&mut out, bv);
                Ok(HyperVec::Bipolar { dim: *dim, vals: out })
            }
            _ => unreachable!(),
        }
    }

    /// `bundle_multi([v1..vm])`. Binary: per-bit count, output 1 iff
    /// `2*count >= m` (true majority; for m=2 this ties 1-1 to 1, the
    /// opposite tie rule from pairwise `bundle` — both are as spec'd in
    /// §4.B). For odd m there are no ties, so this equals repeated pairwise
    /// majority. Bipolar: elementwise sum across all m. Errors on empty input.
    pub fn bundle_multi(&self, vectors: &[&HyperVec]) -> VsaResult<HyperVec> {
        if vectors.is_empty() {
            return Err(VsaError::EmptyBundle);
        }
        let dim = vectors[0].dim();
        let mode = vectors[0].mode();
        for v in &vectors[1..] {
            if v.dim() != dim {
                return Err(VsaError::DimensionMismatch {
                    expected: dim,
                    actual: v.dim(),
                });
            }
            if v.mode() != mode {
                return Err(VsaError::ModeMismatch {
                    expected: mode.to_string(),
                    actual: v.mode().to_string(),
                });
            }
        }

        match mode {
            Mode::Binary => {
                let m = vectors.len();
                let mut out = HyperVec::zero(Dimension(dim), Mode::Binary);
                for i in 0..dim {
                    let count = vectors.iter().filter(|v| v.get(i)).count();
                    out.set_bit(i, 2 * count >= m);
                }
                Ok(out)
            }
            Mode::Bipolar => {
                let mut acc = vec![0i32; dim];
                for v in vectors {
                    let vals = v.vals().expect("mode checked above");
                    self.kernel.bipolar_add(&mut acc, vals);
                }
                Ok(HyperVec::Bipolar { dim, vals: acc })
            }
        }
    }

    /// `permute(v, k)`: positive `k` rotates right, negative `k` rotates
    /// left by `|k|`. A pure rotation — distance-preserving under repeated
    /// application on its own; only binding with another vector destroys
    /// similarity.
    pub fn permute(&self, v: &HyperVec, k: i64) -> HyperVec {
        match v {
            HyperVec::Binary { dim, bits } => {
                // Rotate within exactly `dim` logical bits, not
                // `bits.len()*8` — those differ whenever `dim` isn't a
                // multiple of 8, and rotating in the wider byte-padded space
                // would let a real bit wrap into the padding.
                let shift = normalize_shift(k, *dim);
                let mut out = vec![0u8; bits.len()];
                self.kernel.permute_bits(bits, *dim, shift, &mut out);
                HyperVec::Binary { dim: *dim, bits: out }
            }
            HyperVec::Bipolar { dim, vals } => {
                let shift = normalize_shift(k, *dim);
                let mut out = vec![0i32; vals.len()];
                self.kernel.permute_i32(vals, shift, &mut out);
                HyperVec::Bipolar { dim: *dim, vals: out }
            }
        }
    }

    /// `similarity(a, b) -> [-1,1]`. Binary: `1 - 2*hamming/D`. Bipolar:
    /// cosine; `DegenerateNorm` if either operand has zero norm.
    pub fn similarity(&self, a: &HyperVec, b: &HyperVec) -> VsaResult<f32> {
        check_compatible(a, b)?;
        match (a, b) {
            (HyperVec::Binary { dim, bits: ab }, HyperVec::Binary { bits: bb, .. }) => {
                let hamming = self.kernel.hamming_distance(ab, bb);
                let d = *dim as f32;
                Ok(1.0 - 2.0 * (hamming as f32) / d)
            }
            (HyperVec::Bipolar { vals: av, .. }, HyperVec::Bipolar { vals: bv, .. }) => self
                .kernel
                .cosine_similarity(av, bv)
                .ok_or(VsaError::DegenerateNorm),
            _ => unreachable!(),
        }
    }
}

/// Turn a signed rotation amount into the unsigned right-rotation the kernel
/// expects: positive `k` is already a right shift, negative `k` (a left
/// shift by `|k|`) is restated as `total - |k| mod total`.
fn normalize_shift(k: i64, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    let total = total as i64;
    let k = k.rem_euclid(total);
    k as usize
}

impl std::fmt::Debug for VsaOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VsaOps")
            .field("isa", &self.kernel.isa_level())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd;
    use rand::SeedableRng;

    fn test_ops() -> VsaOps {
        VsaOps::new(simd::best_kernel())
    }

    fn seeded_rng() -> rand::rngs::StdRng {
        rand::rngs::StdRng::seed_from_u64(42)
    }

    #[test]
    fn random_vectors_are_roughly_uncorrelated_binary() {
        let ops = test_ops();
        let mut rng = seeded_rng();
        let a = ops.random(Dimension::TEST, Mode::Binary, &mut rng);
        let b = ops.random(Dimension::TEST, Mode::Binary, &mut rng);
        let sim = ops.similarity(&a, &b).unwrap();
        assert!(sim > -0.2 && sim < 0.2, "similarity was {sim}, expected ~0");
    }

    #[test]
    fn random_vectors_are_roughly_uncorrelated_bipolar() {
        let ops = test_ops();
        let mut rng = seeded_rng();
        let a = ops.random(Dimension::TEST, Mode::Bipolar, &mut rng);
        let b = ops.random(Dimension::TEST, Mode::Bipolar, &mut rng);
        let sim = ops.similarity(&a, &b).unwrap();
        assert!(sim > -0.2 && sim < 0.2, "similarity was {sim}, expected ~0");
    }

    #[test]
    fn self_similarity_is_one() {
        let ops = test_ops();
        let mut rng = seeded_rng();
        for mode in [Mode::Binary, Mode::Bipolar] {
            let a = ops.random(Dimension::TEST, mode, &mut rng);
            let sim = ops.similarity(&a, &a).unwrap();
            assert!((sim - 1.0).abs() < 0.001);
        }
    }

    #[test]
    fn bind_is_self_inverse_binary() {
        let ops = test_ops();
        let mut rng = seeded_rng();
        let a = ops.random(Dimension::TEST, Mode::Binary, &mut rng);
        let b = ops.random(Dimension::TEST, Mode::Binary, &mut rng);
        let bound = ops.bind(&a, &b).unwrap();
        let recovered = ops.bind(&bound, &b).unwrap();
        assert_eq!(recovered, a);
    }

    #[test]
    fn bind_is_dissimilar_to_inputs() {
        let ops = test_ops();
        let mut rng = seeded_rng();
        let a = ops.random(Dimension::TEST, Mode::Binary, &mut rng);
        let b = ops.random(Dimension::TEST, Mode::Binary, &mut rng);
        let bound = ops.bind(&a, &b).unwrap();
        let sim_a = ops.similarity(&bound, &a).unwrap();
        assert!(sim_a > -0.2 && sim_a < 0.2, "sim_a={sim_a}");
    }

    #[test]
    fn bundle_multi_bipolar_equals_sum() {
        let ops = test_ops();
        let v1 = HyperVec::Bipolar {
            dim: 4,
            vals: vec![1, -1, 1, -1],
        };
        let v2 = HyperVec::Bipolar {
            dim: 4,
            vals: vec![1, 1, -1, -1],
        };
        let bundled = ops.bundle_multi(&[&v1, &v2]).unwrap();
        assert_eq!(bundled.vals().unwrap(), &[2, 0, 0, -2]);
    }

    #[test]
    fn bundle_pairwise_binary_tie_breaks_to_zero() {
        let ops = test_ops();
        let a = HyperVec::from_bits(8, vec![0b1010_0000]);
        let b = HyperVec::from_bits(8, vec![0b0110_0000]);
        let out = ops.bundle(&a, &b).unwrap();
        // bit0: 1+0=1 -> tie -> 0; bit1: 0+1=1 -> tie -> 0;
        // bit2: 1+1=2 -> 1; bit3: 0+0=0 -> 0
        assert!(!out.get(0));
        assert!(!out.get(1));
        assert!(out.get(2));
        assert!(!out.get(3));
    }

    #[test]
    fn bundle_multi_binary_tie_breaks_to_one_for_m_two() {
        let ops = test_ops();
        let a = HyperVec::from_bits(8, vec![0b1010_0000]);
        let b = HyperVec::from_bits(8, vec![0b0110_0000]);
        let out = ops.bundle_multi(&[&a, &b]).unwrap();
        // 2*count >= m; bit0 count=1, m=2 -> 2>=2 -> true (tie breaks to 1)
        assert!(out.get(0));
        assert!(out.get(1));
        assert!(out.get(2));
        assert!(!out.get(3));
    }

    #[test]
    fn bundle_multi_binary_odd_m_is_true_majority() {
        let ops = test_ops();
        // bit0: 1,1,0 -> count=2 of 3, true majority -> 1
        // bit1: 1,0,0 -> count=1 of 3, below majority -> 0 (floor(m/2)=1 would
        // wrongly set this to 1)
        // bit2: 1,1,1 -> count=3 -> 1
        // bit3: 0,0,0 -> count=0 -> 0
        let a = HyperVec::from_bits(8, vec![0b1110_0000]);
        let b = HyperVec::from_bits(8, vec![0b1010_0000]);
        let c = HyperVec::from_bits(8, vec![0b0010_0000]);
        let out = ops.bundle_multi(&[&a, &b, &c]).unwrap();
        assert!(out.get(0));
        assert!(!out.get(1));
        assert!(out.get(2));
        assert!(!out.get(3));
    }

    #[test]
    fn bundle_multi_empty_is_error() {
        let ops = test_ops();
        let result = ops.bundle_multi(&[]);
        assert!(matches!(result, Err(VsaError::EmptyBundle)));
    }

    #[test]
    fn permute_roundtrip() {
        let ops = test_ops();
        let mut rng = seeded_rng();
        for mode in [Mode::Binary, Mode::Bipolar] {
            let a = ops.random(Dimension::TEST, mode, &mut rng);
            for k in [1i64, 5, -3, 999] {
                let p = ops.permute(&a, k);
                let back = ops.permute(&p, -k);
                assert_eq!(back, a, "mode={mode:?} k={k}");
            }
        }
    }

    #[test]
    fn permute_roundtrip_non_byte_aligned_dim() {
        // D not a multiple of 8 (property 4): the rotation must wrap at D,
        // not at the wider byte-padded 8*ceil(D/8) bit-space, or
        // permute(permute(v,k),-k) != v.
        let ops = test_ops();
        let mut rng = seeded_rng();
        for &dim in &[1023usize, 1000 + 3, 13] {
            let a = ops.random(Dimension(dim), Mode::Binary, &mut rng);
            for k in [1i64, 5, -3, 999] {
                let p = ops.permute(&a, k);
                let back = ops.permute(&p, -k);
                assert_eq!(back, a, "dim={dim} k={k}");
            }
        }
    }

    #[test]
    fn permute_leaves_byte_padding_zeroed() {
        // D=6 over a single byte: bits [6,8) are padding and must stay 0
        // after a rotation, never inheriting a real bit that wrapped past D.
        let ops = test_ops();
        let mut v = HyperVec::zero(Dimension(6), Mode::Binary);
        for i in 0..6 {
            v.set_bit(i, true);
        }
        for k in [1i64, 3, -2, 13] {
            let permuted = ops.permute(&v, k);
            let bits = permuted.bits().unwrap();
            assert_eq!(bits[0] & 0b0000_0011, 0, "padding bits must stay 0, k={k}");
        }
    }

    #[test]
    fn permute_example_binary() {
        let ops = test_ops();
        // D=6, v = [1,0,1,0,1,0]
        let mut v = HyperVec::zero(Dimension(6), Mode::Binary);
        for (i, bit) in [true, false, true, false, true, false].iter().enumerate() {
            v.set_bit(i, *bit);
        }
        let permuted = ops.permute(&v, 1);
        let expected = [false, true, false, true, false, true];
        for (i, e) in expected.iter().enumerate() {
            assert_eq!(permuted.get(i), *e, "bit {i}");
        }
        let bound = ops.bind(&permuted, &v).unwrap();
        for i in 0..6 {
            assert!(bound.get(i));
        }
    }

    #[test]
    fn dimension_mismatch_detected() {
        let ops = test_ops();
        let a = HyperVec::zero(Dimension(100), Mode::Binary);
        let b = HyperVec::zero(Dimension(200), Mode::Binary);
        let result = ops.bind(&a, &b);
        assert!(matches!(result, Err(VsaError::DimensionMismatch { .. })));
    }

    #[test]
    fn mode_mismatch_detected() {
        let ops = test_ops();
        let a = HyperVec::zero(Dimension(100), Mode::Binary);
        let b = HyperVec::zero(Dimension(100), Mode::Bipolar);
        let result = ops.bind(&a, &b);
        assert!(matches!(result, Err(VsaError::ModeMismatch { .. })));
    }

    #[test]
    fn similarity_bounds() {
        let ops = test_ops();
        let mut rng = seeded_rng();
        for mode in [Mode::Binary, Mode::Bipolar] {
            for _ in 0..20 {
                let a = ops.random(Dimension::TEST, mode, &mut rng);
                let b = ops.random(Dimension::TEST, mode, &mut rng);
                let sim = ops.similarity(&a, &b).unwrap();
                assert!((-1.0..=1.0).contains(&sim), "sim={sim} out of bounds");
            }
        }
    }

    #[test]
    fn degenerate_norm_detected() {
        let ops = test_ops();
        let zero = HyperVec::zero(Dimension(16), Mode::Bipolar);
        let result = ops.similarity(&zero, &zero);
        assert!(matches!(result, Err(VsaError::DegenerateNorm)));
    }
}
