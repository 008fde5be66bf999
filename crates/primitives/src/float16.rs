//! Lossy 16-bit decimal float used to compress amounts in L1 records.
//!
//! Layout, most significant bit first: `[exponent:5][half:1][mantissa:10]`.
//! The decoded value is `mantissa * 10^exponent`, plus `10^exponent / 2`
//! when the half bit is set and the exponent is non-zero.  Decoding is the
//! canonical direction; several encodings may decode to the same amount.

use std::fmt;

use alloy_primitives::U256;
use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::FloatError;

const MANTISSA_MASK: u16 = 0x3ff;
const HALF_BIT: u16 = 1 << 10;
const EXP_SHIFT: u16 = 11;
const MAX_EXP: u32 = 31;

#[derive(
    Copy,
    Clone,
    Default,
    Eq,
    PartialEq,
    Hash,
    Arbitrary,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct Float16(u16);

impl Float16 {
    pub const ZERO: Float16 = Float16(0);

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u16 {
        self.0
    }

    pub fn mantissa(&self) -> u16 {
        self.0 & MANTISSA_MASK
    }

    pub fn exponent(&self) -> u32 {
        (self.0 >> EXP_SHIFT) as u32
    }

    pub fn half(&self) -> bool {
        self.0 & HALF_BIT != 0
    }

    /// Decodes to the fixed amount this float represents.
    pub fn to_fix(&self) -> U256 {
        let exp = pow10(self.exponent());
        let mut fix = U256::from(self.mantissa()) * exp;
        if self.half() && self.exponent() != 0 {
            fix += exp / U256::from(2u8);
        }
        fix
    }

    /// Encodes `fix` by truncating it to a 10 bit mantissa.  The half bit is
    /// never set, so the result may sit below the largest float not above
    /// `fix`.
    pub fn from_fix_floor(fix: U256) -> Result<Self, FloatError> {
        if fix.is_zero() {
            return Ok(Self::ZERO);
        }

        let limit = U256::from(MANTISSA_MASK as u64 + 1);
        let mut e = 0;
        let mut m = fix;
        while m >= limit {
            e += 1;
            if e > MAX_EXP {
                return Err(FloatError::Overflow);
            }
            m /= U256::from(10u8);
        }

        // m < 1024 by construction of the loop above
        let m: u16 = m.to::<u16>();
        Ok(Self(((e as u16) << EXP_SHIFT) | m))
    }

    /// Encodes `fix`, failing if it can't be represented exactly.
    pub fn from_fix_exact(fix: U256) -> Result<Self, FloatError> {
        let f = Self::from_fix_floor(fix)?;
        if f.to_fix() == fix {
            return Ok(f);
        }
        let with_half = Self(f.0 | HALF_BIT);
        if with_half.exponent() != 0 && with_half.to_fix() == fix {
            return Ok(with_half);
        }
        Err(FloatError::NotExact)
    }
}

fn pow10(e: u32) -> U256 {
    U256::from(10u8).pow(U256::from(e))
}

impl fmt::Debug for Float16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Float16({:#06x} = {})", self.0, self.to_fix())
    }
}

impl From<u16> for Float16 {
    fn from(value: u16) -> Self {
        Self(value)
    }
}
