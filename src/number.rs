//! Consensus number encoding for script arithmetic
//!
//! Script numbers are variable-length little-endian byte strings carrying
//! sign as the high bit of the most significant byte (sign-magnitude, not
//! two's complement). Zero encodes as the empty string. Decoding enforces a
//! caller-supplied width limit and, in strict mode, rejects non-minimal
//! encodings that carry a removable trailing byte.

use crate::error::{Result, ScriptError};
use crate::types::ByteString;

/// The sign bit of the most significant encoded byte.
pub const NEGATIVE_MASK: u8 = 0x80;

/// A bounded-width signed integer with canonical minimal byte encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScriptNum(i64);

impl ScriptNum {
    pub const fn new(value: i64) -> Self {
        ScriptNum(value)
    }

    /// Decode a stack element into a number.
    ///
    /// Fails with `NumberOverflow` if the element is wider than `max_size`
    /// and with `MinimalData` if `require_minimal` is set and the encoding
    /// has a redundant top byte.
    pub fn decode(bytes: &[u8], max_size: usize, require_minimal: bool) -> Result<Self> {
        if bytes.len() > max_size {
            return Err(ScriptError::NumberOverflow);
        }

        if bytes.is_empty() {
            return Ok(ScriptNum(0));
        }

        if require_minimal && !is_minimal(bytes) {
            return Err(ScriptError::MinimalData);
        }

        let mut value: i64 = 0;
        for (i, &byte) in bytes.iter().enumerate() {
            value |= i64::from(byte) << (8 * i);
        }

        // The top encoded bit carries sign, not magnitude.
        if bytes[bytes.len() - 1] & NEGATIVE_MASK != 0 {
            let last_shift = 8 * (bytes.len() - 1);
            let mask = !(i64::from(NEGATIVE_MASK) << last_shift);
            value = -(value & mask);
        }

        Ok(ScriptNum(value))
    }

    /// Produce the minimal encoding.
    ///
    /// Magnitude bytes little-endian; a `0x00` or `0x80` byte is appended
    /// only when the top magnitude byte would otherwise be read as a sign.
    pub fn encode(&self) -> ByteString {
        if self.0 == 0 {
            return ByteString::new();
        }

        let negative = self.0 < 0;
        let mut absolute = self.0.unsigned_abs();
        let mut data = ByteString::new();

        while absolute != 0 {
            data.push(absolute as u8);
            absolute >>= 8;
        }

        let sign_bit_set = data[data.len() - 1] & NEGATIVE_MASK != 0;

        if sign_bit_set && negative {
            data.push(NEGATIVE_MASK);
        } else if sign_bit_set {
            data.push(0);
        } else if negative {
            let last = data.len() - 1;
            data[last] |= NEGATIVE_MASK;
        }

        data
    }

    pub fn to_i64(self) -> i64 {
        self.0
    }

    /// Clamp to the i32 domain, as the classic opcodes operate on 32-bit
    /// results even though 4-byte operands can sum past the boundary.
    pub fn to_i32(self) -> i32 {
        if self.0 > i64::from(i32::MAX) {
            i32::MAX
        } else if self.0 < i64::from(i32::MIN) {
            i32::MIN
        } else {
            self.0 as i32
        }
    }

    pub fn is_true(self) -> bool {
        self.0 != 0
    }
}

impl From<i64> for ScriptNum {
    fn from(value: i64) -> Self {
        ScriptNum(value)
    }
}

impl From<bool> for ScriptNum {
    fn from(value: bool) -> Self {
        ScriptNum(i64::from(value))
    }
}

/// An encoding is minimal unless its top byte contributes nothing beyond
/// sign, and that sign bit could have been carried by the preceding byte.
fn is_minimal(bytes: &[u8]) -> bool {
    match bytes.last() {
        None => true,
        Some(&last) => {
            if last & !NEGATIVE_MASK != 0 {
                return true;
            }
            bytes.len() > 1 && bytes[bytes.len() - 2] & NEGATIVE_MASK != 0
        }
    }
}

/// Reduce an arbitrary (valid-width) encoding to its minimal form.
///
/// Used by tests and by callers normalizing historical data; the
/// interpreter itself rejects non-minimal input in strict mode.
pub fn minimal_form(bytes: &[u8]) -> ByteString {
    match ScriptNum::decode(bytes, bytes.len(), false) {
        Ok(number) => number.encode(),
        Err(_) => bytes.to_vec(),
    }
}
