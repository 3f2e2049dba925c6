//! AVX2 (256-bit) SIMD kernel for x86_64 VSA operations.
//!
//! Falls through to the generic kernel for tail elements that don't fill
//! a full 256-bit register, and for operations (bit permutation) that don't
//! benefit from vectorization at arbitrary shift amounts.

use super::{IsaLevel, VsaKernel};

/// AVX2-accelerated VSA kernel.
///
/// Uses 256-bit SIMD for bulk operations and scalar fallback for tails.
#[derive(Debug, Clone, Copy)]
pub struct Avx2Kernel;

#[cfg(target_arch = "x86_64")]
impl VsaKernel for Avx2Kernel {
    fn isa_level(&self) -> IsaLevel {
        IsaLevel::Avx2
    }

    fn xor_bind(&self, a: &[u8], b: &[u8], out: &mut [u8]) {
        debug_assert_eq!(a.len(), b.len());
        debug_assert_eq!(a.len(), out.len());
        if is_x86_feature_detected!("avx2") {
            unsafe { self.xor_bind_avx2(a, b, out) }
        } else {
            super::generic::GenericKernel.xor_bind(a, b, out);
        }
    }

    fn hamming_distance(&self, a: &[u8], b: &[u8]) -> u32 {
        debug_assert_eq!(a.len(), b.len());
        // Popcount doesn't have a native AVX2 instruction; the scalar
        // per-byte count_ones() path is already at memory-bandwidth speed.
        super::generic::GenericKernel.hamming_distance(a, b)
    }

    fn permute_bits(&self, data: &[u8], dim: usize, shift: usize, out: &mut [u8]) {
        super::generic::GenericKernel.permute_bits(data, dim, shift, out);
    }

    fn bipolar_bind(&self, a: &[i32], b: &[i32], out: &mut [i32]) {
        debug_assert_eq!(a.len(), b.len());
        debug_assert_eq!(a.len(), out.len());
        if is_x86_feature_detected!("avx2") {
            unsafe { self.bipolar_bind_avx2(a, b, out) }
        } else {
            super::generic::GenericKernel.bipolar_bind(a, b, out);
        }
    }

    fn bipolar_add(&self, acc: &mut [i32], src: &[i32]) {
        debug_assert_eq!(acc.len(), src.len());
        if is_x86_feature_detected!("avx2") {
            unsafe { self.bipolar_add_avx2(acc, src) }
        } else {
            super::generic::GenericKernel.bipolar_add(acc, src);
        }
    }

    fn cosine_similarity(&self, a: &[i32], b: &[i32]) -> Option<f32> {
        debug_assert_eq!(a.len(), b.len());
        if is_x86_feature_detected!("avx2") {
            unsafe { self.cosine_similarity_avx2(a, b) }
        } else {
            super::generic::GenericKernel.cosine_similarity(a, b)
        }
    }

    fn permute_i32(&self, data: &[i32], shift: usize, out: &mut [i32]) {
        super::generic::GenericKernel.permute_i32(data, shift, out);
    }
}

#[cfg(target_arch = "x86_64")]
impl Avx2Kernel {
    #[target_feature(enable = "avx2")]
    unsafe fn xor_bind_avx2(&self, a: &[u8], b: &[u8], out: &mut [u8]) {
        use std::arch::x86_64::*;

        let len = a.len();
        let chunks = len / 32;

        for i in 0..chunks {
            let offset = i * 32;
            unsafe {
                let va = _mm256_loadu_si256(a.as_ptr().add(offset) as *const __m256i);
                let vb = _mm256_loadu_si256(b.as_ptr().add(offset) as *const __m256i);
                let result = _mm256_xor_si256(va, vb);
                _mm256_storeu_si256(out.as_mut_ptr().add(offset) as *mut __m256i, result);
            }
        }

        let tail_start = chunks * 32;
        for i in tail_start..len {
            out[i] = a[i] ^ b[i];
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn bipolar_bind_avx2(&self, a: &[i32], b: &[i32], out: &mut [i32]) {
        use std::arch::x86_64::*;

        let len = a.len();
        let chunks = len / 8;

        for i in 0..chunks {
            let offset = i * 8;
            unsafe {
                let va = _mm256_loadu_si256(a.as_ptr().add(offset) as *const __m256i);
                let vb = _mm256_loadu_si256(b.as_ptr().add(offset) as *const __m256i);
                let result = _mm256_mullo_epi32(va, vb);
                _mm256_storeu_si256(out.as_mut_ptr().add(offset) as *mut __m256i, result);
            }
        }

        let tail_start = chunks * 8;
        for i in tail_start..len {
            out[i] = a[i] * b[i];
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn bipolar_add_avx2(&self, acc: &mut [i32], src: &[i32]) {
        use std::arch::x86_64::*;

        let len = acc.len();
        let chunks = len / 8;

        for i in 0..chunks {
            let offset = i * 8;
            unsafe {
                let va = _mm256_loadu_si256(acc.as_ptr().add(offset) as *const __m256i);
                let vb = _mm256_loadu_si256(src.as_ptr().add(offset) as *const __m256i);
                let result = _mm256_add_epi32(va, vb);
                _mm256_storeu_si256(acc.as_mut_ptr().add(offset) as *mut __m256i, result);
            }
        }

        let tail_start = chunks * 8;
        for i in tail_start..len {
            acc[i] += src[i];
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn cosine_similarity_avx2(&self, a: &[i32], b: &[i32]) -> Option<f32> {
        use std::arch::x86_64::*;

        let len = a.len();
        let chunks = len / 8;

        let mut dot: i64 = 0;
        let mut norm_a: i64 = 0;
        let mut norm_b: i64 = 0;

        unsafe {
            let mut dot_acc = _mm256_setzero_si256();
            let mut na_acc = _mm256_setzero_si256();
            let mut nb_acc = _mm256_setzero_si256();

            for i in 0..chunks {
                let offset = i * 8;
                let va = _mm256_loadu_si256(a.as_ptr().add(offset) as *const __m256i);
                let vb = _mm256_loadu_si256(b.as_ptr().add(offset) as *const __m256i);

                // Widen each lane's product to i64 before accumulating, to
                // match `GenericKernel::cosine_similarity`. Bundled bipolar
                // accumulators (spec §3) routinely carry magnitudes far
                // beyond a single i32 lane once many hypervectors have been
                // superposed without NORMALIZE, so summing products in
                // epi32 can overflow and silently diverge from the scalar
                // kernel. `_mm256_mul_epi32` only reads the low 32 bits of
                // each 64-bit lane, so the odd-indexed elements (1,3,5,7)
                // are multiplied separately after a 32-bit logical shift
                // brings them into each lane's low half.
                let va_odd = _mm256_srli_epi64(va, 32);
                let vb_odd = _mm256_srli_epi64(vb, 32);

                dot_acc = _mm256_add_epi64(dot_acc, _mm256_mul_epi32(va, vb));
                dot_acc = _mm256_add_epi64(dot_acc, _mm256_mul_epi32(va_odd, vb_odd));

                na_acc = _mm256_add_epi64(na_acc, _mm256_mul_epi32(va, va));
                na_acc = _mm256_add_epi64(na_acc, _mm256_mul_epi32(va_odd, va_odd));

                nb_acc = _mm256_add_epi64(nb_acc, _mm256_mul_epi32(vb, vb));
                nb_acc = _mm256_add_epi64(nb_acc, _mm256_mul_epi32(vb_odd, vb_odd));
            }

            dot += hsum_epi64(dot_acc);
            norm_a += hsum_epi64(na_acc);
            norm_b += hsum_epi64(nb_acc);
        }

        let tail_start = chunks * 8;
        for i in tail_start..len {
            let av = a[i] as i64;
            let bv = b[i] as i64;
            dot += av * bv;
            norm_a += av * av;
            norm_b += bv * bv;
        }

        if norm_a == 0 || norm_b == 0 {
            return None;
        }
        let denom = (norm_a as f64).sqrt() * (norm_b as f64).sqrt();
        Some((dot as f64 / denom) as f32)
    }
}

/// Horizontal sum of 8 packed i32 values in a __m256i register.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn hsum_epi32(v: std::arch::x86_64::__m256i) -> i32 {
    use std::arch::x86_64::*;
    let hi = _mm256_extracti128_si256(v, 1);
    let lo = _mm256_castsi256_si128(v);
    let sum128 = _mm_add_epi32(lo, hi);
    let shuf = _mm_shuffle_epi32(sum128, 0b_01_00_11_10);
    let sum64 = _mm_add_epi32(sum128, shuf);
    let shuf2 = _mm_shuffle_epi32(sum64, 0b_00_01_00_01);
    let sum32 = _mm_add_epi32(sum64, shuf2);
    _mm_cvtsi128_si32(sum32)
}

/// Horizontal sum of 4 packed i64 values in a __m256i register.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn hsum_epi64(v: std::arch::x86_64::__m256i) -> i64 {
    use std::arch::x86_64::*;
    let hi = _mm256_extracti128_si256(v, 1);
    let lo = _mm256_castsi256_si128(v);
    let sum128 = _mm_add_epi64(lo, hi);
    let hi64 = _mm_unpackhi_epi64(sum128, sum128);
    let sum64 = _mm_add_epi64(sum128, hi64);
    _mm_cvtsi128_si64(sum64)
}

// Stub so the module compiles on non-x86_64 targets; `best_kernel()` never
// selects this impl there since `detect_isa()` can't return `Avx2`.
#[cfg(not(target_arch = "x86_64"))]
impl VsaKernel for Avx2Kernel {
    fn isa_level(&self) -> IsaLevel {
        IsaLevel::Generic
    }
    fn xor_bind(&self, a: &[u8], b: &[u8], out: &mut [u8]) {
        super::generic::GenericKernel.xor_bind(a, b, out);
    }
    fn hamming_distance(&self, a: &[u8], b: &[u8]) -> u32 {
        super::generic::GenericKernel.hamming_distance(a, b)
    }
    fn permute_bits(&self, data: &[u8], dim: usize, shift: usize, out: &mut [u8]) {
        super::generic::GenericKernel.permute_bits(data, dim, shift, out);
    }
    fn bipolar_bind(&self, a: &[i32], b: &[i32], out: &mut [i32]) {
        super::generic::GenericKernel.bipolar_bind(a, b, out);
    }
    fn bipolar_add(&self, acc: &mut [i32], src: &[i32]) {
        super::generic::GenericKernel.bipolar_add(acc, src);
    }
    fn cosine_similarity(&self, a: &[i32], b: &[i32]) -> Option<f32> {
        super::generic::GenericKernel.cosine_similarity(a, b)
    }
    fn permute_i32(&self, data: &[i32], shift: usize, out: &mut [i32]) {
        super::generic::GenericKernel.permute_i32(data, shift, out);
    }
}
