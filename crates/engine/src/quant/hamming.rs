//! Hamming distance over packed binary vectors
//!
//! Two entry points share one contract: [`hamming_distance`] walks bytes,
//! [`hamming_distance_fast`] XORs the widest words available (AVX2 when the
//! CPU has it, then 64-bit words, then bytes). Both mask the unused trailing
//! bits of the final byte, so they agree on every input.

use stratavec_core::{VectorError, VectorResult};

use super::binary::BinaryVector;

/// Sentinel returned by [`hamming_or_unknown`] when the distance is undefined
pub const HAMMING_UNKNOWN: usize = usize::MAX;

/// Mask selecting the valid high bits of the final byte, or 0xFF when full
#[inline]
fn last_byte_mask(dimension: usize) -> u8 {
    match dimension % 8 {
        0 => 0xFF,
        r => 0xFFu8 << (8 - r),
    }
}

fn check_dimensions(a: &BinaryVector<'_>, b: &BinaryVector<'_>) -> VectorResult<()> {
    if a.dimension() != b.dimension() {
        return Err(VectorError::invalid_argument(format!(
            "hamming distance between vectors of {} and {} bits",
            a.dimension(),
            b.dimension()
        )));
    }
    Ok(())
}

/// Split a byte length into (full bytes, has partial tail)
#[inline]
fn full_bytes(dimension: usize) -> (usize, bool) {
    (dimension / 8, dimension % 8 != 0)
}

/// Portable Hamming distance, one byte at a time
///
/// # Errors
///
/// `InvalidArgument` if the dimensions differ.
pub fn hamming_distance(a: &BinaryVector<'_>, b: &BinaryVector<'_>) -> VectorResult<usize> {
    check_dimensions(a, b)?;
    let (full, partial) = full_bytes(a.dimension());
    let (xa, xb) = (a.as_bytes(), b.as_bytes());

    let mut dist: usize = xa[..full]
        .iter()
        .zip(&xb[..full])
        .map(|(x, y)| (x ^ y).count_ones() as usize)
        .sum();

    if partial {
        let mask = last_byte_mask(a.dimension());
        dist += ((xa[full] ^ xb[full]) & mask).count_ones() as usize;
    }
    Ok(dist)
}

/// Hamming distance using the widest XOR/popcount the CPU supports
///
/// Same result as [`hamming_distance`] on every input.
///
/// # Errors
///
/// `InvalidArgument` if the dimensions differ.
pub fn hamming_distance_fast(a: &BinaryVector<'_>, b: &BinaryVector<'_>) -> VectorResult<usize> {
    check_dimensions(a, b)?;
    let (full, partial) = full_bytes(a.dimension());
    let (xa, xb) = (&a.as_bytes()[..full], &b.as_bytes()[..full]);

    #[allow(unused_mut)]
    let mut offset = 0;
    let mut dist = 0usize;

    #[cfg(target_arch = "x86_64")]
    {
        if full >= 32 && is_x86_feature_detected!("avx2") {
            // SAFETY: avx2 availability checked above
            dist += unsafe { xor_popcount_avx2(xa, xb) } as usize;
            offset = full - full % 32;
        }
    }

    // 64-bit words
    let words_end = offset + (full - offset) / 8 * 8;
    for (ca, cb) in xa[offset..words_end]
        .chunks_exact(8)
        .zip(xb[offset..words_end].chunks_exact(8))
    {
        let mut wa = [0u8; 8];
        let mut wb = [0u8; 8];
        wa.copy_from_slice(ca);
        wb.copy_from_slice(cb);
        dist += (u64::from_ne_bytes(wa) ^ u64::from_ne_bytes(wb)).count_ones() as usize;
    }

    // Remaining full bytes
    for (x, y) in xa[words_end..].iter().zip(&xb[words_end..]) {
        dist += (x ^ y).count_ones() as usize;
    }

    if partial {
        let mask = last_byte_mask(a.dimension());
        dist += ((a.as_bytes()[full] ^ b.as_bytes()[full]) & mask).count_ones() as usize;
    }
    Ok(dist)
}

/// Hamming distance, or [`HAMMING_UNKNOWN`] on dimension mismatch
pub fn hamming_or_unknown(a: &BinaryVector<'_>, b: &BinaryVector<'_>) -> usize {
    hamming_distance_fast(a, b).unwrap_or(HAMMING_UNKNOWN)
}

/// Fraction of agreeing bits: `1 - hamming / dimension`
///
/// # Errors
///
/// `InvalidArgument` if the dimensions differ.
pub fn hamming_similarity(a: &BinaryVector<'_>, b: &BinaryVector<'_>) -> VectorResult<f32> {
    let d = hamming_distance_fast(a, b)?;
    Ok(1.0 - d as f32 / a.dimension() as f32)
}

/// XOR + popcount over all complete 32-byte blocks
///
/// Per-byte counts come from a nibble lookup table; `sad_epu8` folds them
/// into four 64-bit lane sums.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn xor_popcount_avx2(a: &[u8], b: &[u8]) -> u64 {
    use std::arch::x86_64::*;

    debug_assert_eq!(a.len(), b.len());
    let blocks = a.len() / 32;

    let lookup = _mm256_setr_epi8(
        0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4, 0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3,
        3, 4,
    );
    let low_nibble = _mm256_set1_epi8(0x0f);
    let zero = _mm256_setzero_si256();
    let mut acc = _mm256_setzero_si256();

    for i in 0..blocks {
        let va = _mm256_loadu_si256(a.as_ptr().add(i * 32) as *const __m256i);
        let vb = _mm256_loadu_si256(b.as_ptr().add(i * 32) as *const __m256i);
        let x = _mm256_xor_si256(va, vb);
        let lo = _mm256_and_si256(x, low_nibble);
        let hi = _mm256_and_si256(_mm256_srli_epi16(x, 4), low_nibble);
        let counts = _mm256_add_epi8(
            _mm256_shuffle_epi8(lookup, lo),
            _mm256_shuffle_epi8(lookup, hi),
        );
        acc = _mm256_add_epi64(acc, _mm256_sad_epu8(counts, zero));
    }

    let mut lanes = [0u64; 4];
    _mm256_storeu_si256(lanes.as_mut_ptr() as *mut __m256i, acc);
    lanes.iter().sum()
}
