//! Packed 1-bit-per-dimension vectors
//!
//! Bit `i` lives in byte `i / 8` at position `7 - (i % 8)` (MSB-first).
//! Trailing bits of the last byte are zero after quantization but undefined
//! for wrapped buffers; distance code masks them out.

use stratavec_core::{VectorError, VectorResult};

/// Number of bytes needed to hold `dimension` bits
pub fn bytes_needed(dimension: usize) -> usize {
    (dimension + 7) / 8
}

/// Backing storage for a [`BinaryVector`]
#[derive(Debug, Clone)]
enum Bits<'a> {
    /// Produced by quantization; freed on drop
    Owned(Vec<u8>),
    /// Caller's buffer; never freed here
    Borrowed(&'a [u8]),
}

/// A binary-quantized vector
///
/// Either owns its bits (from [`BinaryVector::quantize`]) or borrows an
/// external buffer (from [`BinaryVector::wrap`]). The byte slice always has
/// exactly `bytes_needed(dimension)` bytes.
#[derive(Debug, Clone)]
pub struct BinaryVector<'a> {
    dimension: usize,
    bits: Bits<'a>,
}

impl BinaryVector<'static> {
    /// Quantize a float vector: bit `i` is set iff `data[i] >= 0`
    ///
    /// Zero and negative zero both map to 1. NaN maps to 0.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `data` is empty.
    pub fn quantize(data: &[f32]) -> VectorResult<Self> {
        if data.is_empty() {
            return Err(VectorError::invalid_argument(
                "cannot quantize an empty vector",
            ));
        }

        let mut bits = vec![0u8; bytes_needed(data.len())];
        for (i, &x) in data.iter().enumerate() {
            if x >= 0.0 {
                bits[i / 8] |= 0x80 >> (i % 8);
            }
        }

        Ok(BinaryVector {
            dimension: data.len(),
            bits: Bits::Owned(bits),
        })
    }
}

impl<'a> BinaryVector<'a> {
    /// Borrow an existing packed buffer as a binary vector
    ///
    /// Only the first `bytes_needed(dimension)` bytes are used.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `dimension` is zero or `bits` is too short.
    pub fn wrap(bits: &'a [u8], dimension: usize) -> VectorResult<Self> {
        if dimension == 0 {
            return Err(VectorError::invalid_argument(
                "binary vector dimension must be > 0",
            ));
        }
        let needed = bytes_needed(dimension);
        if bits.len() < needed {
            return Err(VectorError::invalid_argument(format!(
                "buffer of {} bytes cannot hold {} bits ({} bytes needed)",
                bits.len(),
                dimension,
                needed
            )));
        }
        Ok(BinaryVector {
            dimension,
            bits: Bits::Borrowed(&bits[..needed]),
        })
    }

    /// Logical bit count
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Length of the packed buffer in bytes
    pub fn byte_len(&self) -> usize {
        bytes_needed(self.dimension)
    }

    /// Packed bytes, exactly `byte_len()` long
    pub fn as_bytes(&self) -> &[u8] {
        match &self.bits {
            Bits::Owned(v) => v,
            Bits::Borrowed(s) => s,
        }
    }

    /// Value of bit `i`, or `None` past the dimension
    pub fn bit(&self, i: usize) -> Option<bool> {
        if i >= self.dimension {
            return None;
        }
        Some(self.as_bytes()[i / 8] & (0x80 >> (i % 8)) != 0)
    }

    /// Whether the bits are owned by this vector
    pub fn is_owned(&self) -> bool {
        matches!(self.bits, Bits::Owned(_))
    }

    /// Detach from any borrowed buffer
    pub fn into_owned(self) -> BinaryVector<'static> {
        let bits = match self.bits {
            Bits::Owned(v) => v,
            Bits::Borrowed(s) => s.to_vec(),
        };
        BinaryVector {
            dimension: self.dimension,
            bits: Bits::Owned(bits),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bytes_needed() {
        assert_eq!(bytes_needed(0), 0);
        assert_eq!(bytes_needed(1), 1);
        assert_eq!(bytes_needed(8), 1);
        assert_eq!(bytes_needed(9), 2);
        assert_eq!(bytes_needed(16), 2);
    }

    #[test]
    fn test_quantize_msb_first() {
        let v = BinaryVector::quantize(&[1.0, -1.0, 0.5, -0.5, 0.0, -2.0, 3.0, -3.0, 1.0]).unwrap();
        assert_eq!(v.dimension(), 9);
        assert_eq!(v.as_bytes(), &[0b1010_1010, 0b1000_0000]);
        assert!(v.is_owned());
    }

    #[test]
    fn test_quantize_zero_and_negative_zero_set_bit() {
        let v = BinaryVector::quantize(&[0.0, -0.0, -1e-30]).unwrap();
        assert_eq!(v.bit(0), Some(true));
        assert_eq!(v.bit(1), Some(true));
        assert_eq!(v.bit(2), Some(false));
        assert_eq!(v.bit(3), None);
    }

    #[test]
    fn test_quantize_empty_fails() {
        let err = BinaryVector::quantize(&[]).unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_trailing_bits_zero() {
        let v = BinaryVector::quantize(&[1.0; 3]).unwrap();
        assert_eq!(v.as_bytes(), &[0b1110_0000]);
    }

    #[test]
    fn test_wrap_borrows() {
        let buf = [0xFFu8, 0x0F, 0xAA];
        let v = BinaryVector::wrap(&buf, 12).unwrap();
        assert!(!v.is_owned());
        assert_eq!(v.byte_len(), 2);
        assert_eq!(v.as_bytes(), &buf[..2]);

        let owned = v.into_owned();
        assert!(owned.is_owned());
        assert_eq!(owned.as_bytes(), &buf[..2]);
    }

    #[test]
    fn test_wrap_rejects_bad_input() {
        let buf = [0u8; 2];
        assert!(BinaryVector::wrap(&buf, 0).is_err());
        assert!(BinaryVector::wrap(&buf, 17).is_err());
        assert!(BinaryVector::wrap(&buf, 16).is_ok());
    }

    proptest! {
        #[test]
        fn prop_bit_matches_sign(data in prop::collection::vec(-10.0f32..10.0, 1..200)) {
            let v = BinaryVector::quantize(&data).unwrap();
            prop_assert_eq!(v.byte_len(), bytes_needed(data.len()));
            for (i, &x) in data.iter().enumerate() {
                prop_assert_eq!(v.bit(i), Some(x >= 0.0));
            }
        }
    }
}
