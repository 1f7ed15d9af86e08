//! This module contains a representation of fixed-width integer values that
//! can be known and manipulated statically.
//!
//! # Semantics
//!
//! All operations follow the SMT-LIB bit-vector semantics so that the concrete
//! and the symbolic interpretation of a program always agree. In particular
//! division by zero and over-wide shifts are defined:
//!
//! - `udiv(x, 0)` is all ones and `urem(x, 0)` is `x`.
//! - `sdiv(x, 0)` is `1` for negative `x` and all ones otherwise, while
//!   `srem(x, 0)` is `x`.
//! - Shifting by at least the width yields zero, or all sign bits for `ashr`.

use std::fmt::{Display, Formatter};

use bitvec::{
    prelude::{BitVec, Lsb0},
    view::BitView,
};
use ethnum::{I256, U256};

use crate::constant::{BYTE_SIZE_BITS, MAX_CONSTANT_WIDTH_BITS};

/// An integer of a fixed bit-width between 1 and [`MAX_CONSTANT_WIDTH_BITS`]
/// whose value is concretely known.
///
/// # Representation
///
/// The value is kept as an unsigned [`U256`] that is always truncated to the
/// width of the integer. Operations may reinterpret the bit pattern as a two's
/// complement signed number where the semantics call for it.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct KnownInt {
    width: u32,
    value: U256,
}

impl KnownInt {
    /// Constructs a new integer of `width` bits, truncating `value` to fit.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero or exceeds [`MAX_CONSTANT_WIDTH_BITS`]. This is
    /// a programmer bug, as callers must check the width first.
    #[must_use]
    pub fn new(width: u32, value: impl Into<U256>) -> Self {
        assert!(
            width > 0 && width <= MAX_CONSTANT_WIDTH_BITS,
            "Integer width {width} is out of range"
        );
        let value = value.into() & Self::mask(width);
        Self { width, value }
    }

    /// Constructs a new integer of `width` bits from the two's complement
    /// representation of `value`, truncating it to fit.
    #[must_use]
    pub fn from_signed(width: u32, value: impl Into<I256>) -> Self {
        let value = U256::from_ne_bytes(value.into().to_ne_bytes());
        Self::new(width, value)
    }

    /// Creates the zero value of `width` bits.
    #[must_use]
    pub fn zero(width: u32) -> Self {
        Self::new(width, 0u8)
    }

    /// Creates the value of `width` bits with every bit set.
    #[must_use]
    pub fn ones(width: u32) -> Self {
        Self::new(width, U256::MAX)
    }

    /// Creates a one-bit integer from a [`bool`].
    #[must_use]
    pub fn from_bool(value: bool) -> Self {
        Self::new(1, u8::from(value))
    }

    /// Constructs an integer of `width` bits from `bytes` in little-endian
    /// order. Missing bytes are treated as zero and extra bits are truncated.
    #[must_use]
    pub fn from_le_bytes(width: u32, bytes: &[u8]) -> Self {
        let mut buffer = [0u8; 32];
        let count = bytes.len().min(buffer.len());
        buffer[..count].copy_from_slice(&bytes[..count]);
        Self::new(width, U256::from_le_bytes(buffer))
    }

    /// Gets the bit-width of the integer.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Gets the unsigned value of the integer.
    #[must_use]
    pub fn value(&self) -> U256 {
        self.value
    }

    /// Gets the value of the integer interpreted as a two's complement signed
    /// number.
    #[must_use]
    pub fn value_signed(&self) -> I256 {
        let extended = if self.is_negative() {
            self.value | !Self::mask(self.width)
        } else {
            self.value
        };
        I256::from_ne_bytes(extended.to_ne_bytes())
    }

    /// Gets the low 64 bits of the integer.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.value.as_u64()
    }

    /// Gets the value as a [`u64`] if it fits without loss.
    #[must_use]
    pub fn to_u64(&self) -> Option<u64> {
        u64::try_from(self.value).ok()
    }

    /// Checks whether the most significant bit is set.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.bit(self.width - 1)
    }

    /// Checks whether the integer is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value == U256::ZERO
    }

    /// Checks whether every bit of the integer is set.
    #[must_use]
    pub fn is_ones(&self) -> bool {
        self.value == Self::mask(self.width)
    }

    /// Gets the bit at position `index`, where zero is the least significant.
    #[must_use]
    pub fn bit(&self, index: u32) -> bool {
        index < self.width && (self.value >> index) & U256::ONE == U256::ONE
    }

    /// Gets the bits of the integer, least significant first.
    #[must_use]
    pub fn bits_le(&self) -> BitVec {
        let mut bits = BitVec::new();
        for byte in self.value.to_le_bytes() {
            bits.extend(byte.view_bits::<Lsb0>());
        }
        bits.truncate(self.width as usize);

        bits
    }

    /// Gets the number of bytes needed to store the integer.
    #[must_use]
    pub fn store_size(&self) -> usize {
        self.width.div_ceil(BYTE_SIZE_BITS) as usize
    }

    /// Gets the bytes of the integer in little-endian order, occupying exactly
    /// [`Self::store_size`] bytes.
    #[must_use]
    pub fn bytes_le(&self) -> Vec<u8> {
        self.value.to_le_bytes()[..self.store_size()].to_vec()
    }

    /// Gets the bytes of the integer in big-endian order, occupying exactly
    /// [`Self::store_size`] bytes.
    #[must_use]
    pub fn bytes_be(&self) -> Vec<u8> {
        let mut bytes = self.bytes_le();
        bytes.reverse();
        bytes
    }

    /// Performs unsigned division.
    #[must_use]
    pub fn udiv(self, rhs: Self) -> Self {
        if rhs.is_zero() {
            Self::ones(self.width)
        } else {
            Self::new(self.width, self.value / rhs.value)
        }
    }

    /// Performs unsigned remainder.
    #[must_use]
    pub fn urem(self, rhs: Self) -> Self {
        if rhs.is_zero() {
            self
        } else {
            Self::new(self.width, self.value % rhs.value)
        }
    }

    /// Performs signed division, rounding towards zero.
    #[must_use]
    pub fn sdiv(self, rhs: Self) -> Self {
        if rhs.is_zero() {
            return if self.is_negative() {
                Self::new(self.width, 1u8)
            } else {
                Self::ones(self.width)
            };
        }

        // Both operands are sign-extended to 256 bits, so only the full-width
        // case can overflow and that wraps as required.
        let result = self.value_signed().wrapping_div(rhs.value_signed());
        Self::from_signed(self.width, result)
    }

    /// Performs signed remainder, where the sign follows the dividend.
    #[must_use]
    pub fn srem(self, rhs: Self) -> Self {
        if rhs.is_zero() {
            return self;
        }

        let result = self.value_signed().wrapping_rem(rhs.value_signed());
        Self::from_signed(self.width, result)
    }

    /// Shifts left by `rhs`.
    #[must_use]
    pub fn shl(self, rhs: Self) -> Self {
        match self.shift_amount(rhs) {
            Some(amount) => Self::new(self.width, self.value << amount),
            None => Self::zero(self.width),
        }
    }

    /// Shifts right by `rhs`, filling with zeroes.
    #[must_use]
    pub fn lshr(self, rhs: Self) -> Self {
        match self.shift_amount(rhs) {
            Some(amount) => Self::new(self.width, self.value >> amount),
            None => Self::zero(self.width),
        }
    }

    /// Shifts right by `rhs`, filling with the sign bit.
    #[must_use]
    pub fn ashr(self, rhs: Self) -> Self {
        match self.shift_amount(rhs) {
            Some(amount) => Self::from_signed(self.width, self.value_signed() >> amount),
            None if self.is_negative() => Self::ones(self.width),
            None => Self::zero(self.width),
        }
    }

    /// Computes unsigned less-than.
    #[must_use]
    pub fn ult(self, rhs: Self) -> bool {
        self.value < rhs.value
    }

    /// Computes unsigned less-than-or-equal.
    #[must_use]
    pub fn ule(self, rhs: Self) -> bool {
        self.value <= rhs.value
    }

    /// Computes signed less-than.
    #[must_use]
    pub fn slt(self, rhs: Self) -> bool {
        self.value_signed() < rhs.value_signed()
    }

    /// Computes signed less-than-or-equal.
    #[must_use]
    pub fn sle(self, rhs: Self) -> bool {
        self.value_signed() <= rhs.value_signed()
    }

    /// Truncates the integer to its low `width` bits.
    #[must_use]
    pub fn trunc(self, width: u32) -> Self {
        Self::new(width, self.value)
    }

    /// Zero-extends the integer to `width` bits.
    #[must_use]
    pub fn zext(self, width: u32) -> Self {
        Self::new(width, self.value)
    }

    /// Sign-extends the integer to `width` bits.
    #[must_use]
    pub fn sext(self, width: u32) -> Self {
        Self::from_signed(width, self.value_signed())
    }

    /// Extracts bits `high` down to `low` inclusive.
    #[must_use]
    pub fn extract(self, high: u32, low: u32) -> Self {
        Self::new(high - low + 1, self.value >> low)
    }

    /// Concatenates `self` as the high part with `low` as the low part.
    ///
    /// # Panics
    ///
    /// Panics if the combined width exceeds [`MAX_CONSTANT_WIDTH_BITS`].
    #[must_use]
    pub fn concat(self, low: Self) -> Self {
        let width = self.width + low.width;
        Self::new(width, (self.value << low.width) | low.value)
    }

    /// Gets the mask with the low `width` bits set.
    fn mask(width: u32) -> U256 {
        if width >= MAX_CONSTANT_WIDTH_BITS {
            U256::MAX
        } else {
            (U256::ONE << width) - U256::ONE
        }
    }

    /// Gets the shift amount encoded by `rhs`, or [`None`] if it shifts out
    /// every bit.
    fn shift_amount(self, rhs: Self) -> Option<u32> {
        if rhs.value >= U256::from(self.width) {
            None
        } else {
            Some(rhs.value.as_u32())
        }
    }
}

impl std::ops::Add<KnownInt> for KnownInt {
    type Output = KnownInt;

    fn add(self, rhs: KnownInt) -> Self::Output {
        KnownInt::new(self.width, self.value.wrapping_add(rhs.value))
    }
}

impl std::ops::Sub<KnownInt> for KnownInt {
    type Output = KnownInt;

    fn sub(self, rhs: KnownInt) -> Self::Output {
        KnownInt::new(self.width, self.value.wrapping_sub(rhs.value))
    }
}

impl std::ops::Mul<KnownInt> for KnownInt {
    type Output = KnownInt;

    fn mul(self, rhs: KnownInt) -> Self::Output {
        KnownInt::new(self.width, self.value.wrapping_mul(rhs.value))
    }
}

impl std::ops::BitAnd<KnownInt> for KnownInt {
    type Output = KnownInt;

    fn bitand(self, rhs: KnownInt) -> Self::Output {
        KnownInt::new(self.width, self.value & rhs.value)
    }
}

impl std::ops::BitOr<KnownInt> for KnownInt {
    type Output = KnownInt;

    fn bitor(self, rhs: KnownInt) -> Self::Output {
        KnownInt::new(self.width, self.value | rhs.value)
    }
}

impl std::ops::BitXor<KnownInt> for KnownInt {
    type Output = KnownInt;

    fn bitxor(self, rhs: KnownInt) -> Self::Output {
        KnownInt::new(self.width, self.value ^ rhs.value)
    }
}

impl std::ops::Not for KnownInt {
    type Output = KnownInt;

    fn not(self) -> Self::Output {
        KnownInt::new(self.width, !self.value)
    }
}

impl std::ops::Neg for KnownInt {
    type Output = KnownInt;

    fn neg(self) -> Self::Output {
        KnownInt::new(self.width, (!self.value).wrapping_add(U256::ONE))
    }
}

impl From<bool> for KnownInt {
    fn from(value: bool) -> Self {
        Self::from_bool(value)
    }
}

/// Prints the integer as an unsigned decimal followed by its width, for
/// example `42:i32`.
impl Display for KnownInt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:i{}", self.value, self.width)
    }
}

#[cfg(test)]
mod test {
    use ethnum::U256;
    use proptest::prelude::*;

    use crate::vm::value::known::KnownInt;

    #[test]
    fn truncates_on_construction() {
        let value = KnownInt::new(8, 0x1ffu32);
        assert_eq!(value.value(), U256::from(0xffu32));
        assert!(value.is_ones());
    }

    #[test]
    fn reinterprets_signed_values() {
        let value = KnownInt::from_signed(16, -2i32);
        assert_eq!(value.value(), U256::from(0xfffeu32));
        assert_eq!(value.value_signed(), -2);
        assert!(value.is_negative());
    }

    #[test]
    fn arithmetic_wraps_around() {
        let max = KnownInt::ones(32);
        let one = KnownInt::new(32, 1u8);

        assert_eq!(max + one, KnownInt::zero(32));
        assert_eq!(KnownInt::zero(32) - one, max);
        assert_eq!(-one, max);
    }

    #[test]
    fn division_by_zero_is_defined() {
        let seven = KnownInt::new(8, 7u8);
        let zero = KnownInt::zero(8);
        let minus_seven = KnownInt::from_signed(8, -7);

        assert_eq!(seven.udiv(zero), KnownInt::ones(8));
        assert_eq!(seven.urem(zero), seven);
        assert_eq!(seven.sdiv(zero), KnownInt::ones(8));
        assert_eq!(minus_seven.sdiv(zero), KnownInt::new(8, 1u8));
        assert_eq!(minus_seven.srem(zero), minus_seven);
    }

    #[test]
    fn signed_division_overflow_wraps() {
        let min = KnownInt::from_signed(8, -128);
        let minus_one = KnownInt::from_signed(8, -1);

        assert_eq!(min.sdiv(minus_one), min);
        assert_eq!(min.srem(minus_one), KnownInt::zero(8));
    }

    #[test]
    fn signed_remainder_follows_the_dividend() {
        let left = KnownInt::from_signed(32, -8);
        let right = KnownInt::new(32, 3u8);

        assert_eq!(left.srem(right), KnownInt::from_signed(32, -2));
        assert_eq!(left.sdiv(right), KnownInt::from_signed(32, -2));
    }

    #[test]
    fn over_wide_shifts_are_defined() {
        let value = KnownInt::from_signed(8, -4);
        let eight = KnownInt::new(8, 8u8);

        assert_eq!(value.shl(eight), KnownInt::zero(8));
        assert_eq!(value.lshr(eight), KnownInt::zero(8));
        assert_eq!(value.ashr(eight), KnownInt::ones(8));
        assert_eq!(value.ashr(KnownInt::new(8, 1u8)), KnownInt::from_signed(8, -2));
    }

    #[test]
    fn can_resize_integers() {
        let value = KnownInt::from_signed(8, -1);

        assert_eq!(value.zext(16), KnownInt::new(16, 0xffu8));
        assert_eq!(value.sext(16), KnownInt::ones(16));
        assert_eq!(KnownInt::new(16, 0x1234u16).trunc(8), KnownInt::new(8, 0x34u8));
        assert_eq!(
            KnownInt::new(16, 0x1234u16).extract(11, 4),
            KnownInt::new(8, 0x23u8)
        );
        assert_eq!(
            KnownInt::new(8, 0x12u8).concat(KnownInt::new(8, 0x34u8)),
            KnownInt::new(16, 0x1234u16)
        );
    }

    #[test]
    fn gets_bytes_in_store_size() {
        let value = KnownInt::new(36, 0x0f_1234_5678u64);

        assert_eq!(value.store_size(), 5);
        assert_eq!(value.bytes_le(), vec![0x78, 0x56, 0x34, 0x12, 0x0f]);
        assert_eq!(value.bytes_be(), vec![0x0f, 0x12, 0x34, 0x56, 0x78]);
        assert_eq!(KnownInt::from_le_bytes(36, &value.bytes_le()), value);
    }

    #[test]
    fn gets_bits_le() {
        let bits = KnownInt::new(4, 0b0101u8).bits_le();

        assert_eq!(bits.len(), 4);
        assert!(bits[0]);
        assert!(!bits[1]);
        assert!(bits[2]);
        assert!(!bits[3]);
    }

    proptest! {
        #[test]
        fn matches_native_wrapping_arithmetic(a in any::<i32>(), b in any::<i32>()) {
            let left = KnownInt::from_signed(32, a);
            let right = KnownInt::from_signed(32, b);

            prop_assert_eq!(left + right, KnownInt::from_signed(32, a.wrapping_add(b)));
            prop_assert_eq!(left - right, KnownInt::from_signed(32, a.wrapping_sub(b)));
            prop_assert_eq!(left * right, KnownInt::from_signed(32, a.wrapping_mul(b)));
            prop_assert_eq!(left.slt(right), a < b);
            prop_assert_eq!(left.ult(right), (a as u32) < (b as u32));
            if b != 0 {
                prop_assert_eq!(left.sdiv(right), KnownInt::from_signed(32, a.wrapping_div(b)));
                prop_assert_eq!(left.srem(right), KnownInt::from_signed(32, a.wrapping_rem(b)));
                prop_assert_eq!(left.udiv(right), KnownInt::new(32, (a as u32) / (b as u32)));
            }
        }
    }
}
