//! `comp_t` scaled values
//!
//! acct(5) stores wide counters (CPU ticks, memory pages) in a 16-bit
//! pseudo-float:
//!
//! ```text
//!  15    13 12                         0
//! +--------+----------------------------+
//! |  exp   |          mantissa          |
//! +--------+----------------------------+
//! value = mantissa << (exp * 3)
//! ```
//!
//! Encoding truncates the bits shifted out. That loss is part of the on-disk
//! format and must be reproduced exactly.

/// Width of the mantissa field in bits
pub const MANTISSA_BITS: u32 = 13;
/// Mask selecting the mantissa
pub const MANTISSA_MASK: u16 = 0x1FFF;
/// Bits shifted per exponent step
pub const EXPONENT_STEP: u32 = 3;
/// Largest exponent the 3-bit field can hold
pub const MAX_EXPONENT: u32 = 7;
/// Largest value a `ScaledValue` decodes to (8191 << 21)
pub const MAX_DECODED: u64 = (MANTISSA_MASK as u64) << (MAX_EXPONENT * EXPONENT_STEP);

/// A packed `comp_t` word
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ScaledValue(u16);

impl ScaledValue {
    /// The zero word
    pub const ZERO: Self = Self(0);
    /// The largest representable word
    pub const MAX: Self = Self(u16::MAX);

    /// Wrap a raw word as read from disk
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// The raw word as written to disk
    pub const fn to_bits(self) -> u16 {
        self.0
    }

    /// Encode `value`, truncating low-order bits.
    ///
    /// Values too wide for a 3-bit exponent (2^34 and above) saturate to
    /// [`ScaledValue::MAX`]. Use [`ScaledValue::checked_encode`] to detect
    /// that case instead.
    pub fn encode(value: u64) -> Self {
        Self::checked_encode(value).unwrap_or(Self::MAX)
    }

    /// Encode `value`, or `None` if it needs an exponent wider than 3 bits
    pub fn checked_encode(value: u64) -> Option<Self> {
        let bits = u64::BITS - value.leading_zeros();
        if bits <= MANTISSA_BITS {
            return Some(Self(value as u16));
        }

        let exponent = (bits - MANTISSA_BITS).div_ceil(EXPONENT_STEP);
        if exponent > MAX_EXPONENT {
            return None;
        }

        let mantissa = (value >> (exponent * EXPONENT_STEP)) as u16 & MANTISSA_MASK;
        Some(Self(mantissa | (exponent as u16) << MANTISSA_BITS))
    }

    /// Decode to the (possibly truncated) integer value
    pub const fn decode(self) -> u64 {
        let mantissa = (self.0 & MANTISSA_MASK) as u64;
        let exponent = ((self.0 >> MANTISSA_BITS) & 0x7) as u32;
        mantissa << (exponent * EXPONENT_STEP)
    }

    /// Mantissa field
    pub const fn mantissa(self) -> u16 {
        self.0 & MANTISSA_MASK
    }

    /// Exponent field (0-7)
    pub const fn exponent(self) -> u8 {
        (self.0 >> MANTISSA_BITS) as u8
    }
}

impl From<ScaledValue> for u64 {
    fn from(value: ScaledValue) -> Self {
        value.decode()
    }
}
