//! SIMD-accelerated kernels for HDC operations.
//!
//! This module provides a `VsaKernel` trait with CPU-specific implementations.
//! At runtime, [`detect_isa`] determines the best available instruction set and
//! [`best_kernel`] returns the fastest implementation for the current CPU.
//!
//! # Supported ISA levels
//!
//! - **Generic**: Pure-Rust scalar fallback — works everywhere.
//! - **AVX2**: 256-bit SIMD for x86_64 systems with AVX2 support.
//!
//! Each method operates on one of the two hypervector storage forms: packed
//! bits (`&[u8]`, Binary mode — bind = XOR, similarity = Hamming) or signed
//! 32-bit lanes (`&[i32]`, Bipolar mode — bind = elementwise multiply,
//! similarity = cosine). i32 is used rather than i8 because bundled
//! accumulators (§3 of the spec) may carry magnitudes far beyond a single
//! byte once many hypervectors have been superposed; keeping every bipolar
//! kernel entry point at i32 means `bind` and `bundle` compose without a
//! separate narrow/wide split.

pub mod avx2;
pub mod generic;

/// Instruction set architecture level detected at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IsaLevel {
    /// Pure-Rust scalar operations, no SIMD.
    Generic,
    /// x86_64 AVX2 (256-bit vectors).
    Avx2,
}

impl std::fmt::Display for IsaLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IsaLevel::Generic => write!(f, "Generic (scalar)"),
            IsaLevel::Avx2 => write!(f, "AVX2 (256-bit)"),
        }
    }
}

/// Detect the best ISA level available on the current CPU.
pub fn detect_isa() -> IsaLevel {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            return IsaLevel::Avx2;
        }
    }
    IsaLevel::Generic
}

/// Trait for SIMD-accelerated HDC kernels.
///
/// Implementations must handle alignment and length requirements internally;
/// all slices passed in are already sized to match the configured dimension.
pub trait VsaKernel: Send + Sync {
    /// The ISA level this kernel targets.
    fn isa_level(&self) -> IsaLevel;

    /// XOR-bind two binary (bit-packed) hypervectors. `a`/`b`/`out` same length.
    fn xor_bind(&self, a: &[u8], b: &[u8], out: &mut [u8]);

    /// Hamming distance between two binary (bit-packed) hypervectors, in bits.
    fn hamming_distance(&self, a: &[u8], b: &[u8]) -> u32;

    /// Cyclic bit rotation of a binary hypervector, within exactly `dim`
    /// logical bit positions (NOT `data.len()*8`, which over-counts whenever
    /// `dim` isn't a multiple of 8). Positive `shift` rotates right; the
    /// caller pre-normalizes negative shifts to a left rotation expressed as
    /// `dim - |shift|`. Bit positions at or beyond `dim` (the byte-alignment
    /// padding) are always zeroed in `out`, never treated as live data.
    fn permute_bits(&self, data: &[u8], dim: usize, shift: usize, out: &mut [u8]);

    /// Bipolar bind: elementwise multiply of two integer-valued vectors.
    fn bipolar_bind(&self, a: &[i32], b: &[i32], out: &mut [i32]);

    /// Accumulate: `acc[i] += src[i]`, used to fold a hypervector into a
    /// running bundle sum.
    fn bipolar_add(&self, acc: &mut [i32], src: &[i32]);

    /// Cosine similarity between two bipolar (integer-valued) hypervectors.
    /// Returns a value in `[-1.0, 1.0]`, or `None` if either operand has
    /// zero norm (degenerate — the caller surfaces this as an error).
    fn cosine_similarity(&self, a: &[i32], b: &[i32]) -> Option<f32>;

    /// Cyclic element rotation of a bipolar hypervector (one element, not
    /// one bit, per position). Positive `shift` rotates right.
    fn permute_i32(&self, data: &[i32], shift: usize, out: &mut [i32]);
}

/// Return the best available kernel for the current CPU.
pub fn best_kernel() -> Box<dyn VsaKernel> {
    match detect_isa() {
        #[cfg(target_arch = "x86_64")]
        IsaLevel::Avx2 => Box::new(avx2::Avx2Kernel),
        _ => Box::new(generic::GenericKernel),
    }
}
