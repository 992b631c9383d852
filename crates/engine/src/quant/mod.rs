//! Binary quantization
//!
//! Compresses float vectors to one sign bit per dimension and scores them
//! with Hamming distance. Used as a cheap proxy distance for candidate
//! generation ahead of an exact rerank.

mod binary;
mod hamming;

pub use binary::{bytes_needed, BinaryVector};
pub use hamming::{
    hamming_distance, hamming_distance_fast, hamming_or_unknown, hamming_similarity,
    HAMMING_UNKNOWN,
};
