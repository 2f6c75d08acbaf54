//! Fixed-point arithmetic implementation
//!
//! Provides a Fixed structure backed by `rust_decimal`, so prices, quantities
//! and percentages never pass through binary floating point.

use rust_decimal::{Decimal, RoundingStrategy, prelude::*};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Fixed-point decimal type for precise financial calculations
///
/// Division is only available through [`Fixed::checked_div`] so a zero
/// divisor surfaces as an error instead of a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fixed {
    value: Decimal,
}

impl Fixed {
    /// Zero value
    pub const ZERO: Fixed = Fixed {
        value: Decimal::ZERO,
    };

    /// One value
    pub const ONE: Fixed = Fixed {
        value: Decimal::ONE,
    };

    /// One hundred, the percent base
    pub const HUNDRED: Fixed = Fixed {
        value: Decimal::ONE_HUNDRED,
    };

    /// Create a Fixed from an integer
    pub fn from_i64(value: i64) -> Self {
        Fixed {
            value: Decimal::from(value),
        }
    }

    /// Create a Fixed from its exact decimal text, e.g. `"0.00100000"`
    pub fn from_str_exact(s: &str) -> Result<Self, FixedError> {
        let trimmed = s.trim();
        Decimal::from_str_exact(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map(Fixed::from)
            .map_err(|_| FixedError::InvalidValue)
    }

    /// Create a Fixed from `mantissa * 10^-scale`
    pub fn new(mantissa: i64, scale: u32) -> Self {
        Fixed {
            value: Decimal::new(mantissa, scale),
        }
    }

    /// Convert to f64 (may lose precision)
    pub fn to_f64(&self) -> f64 {
        self.value.to_f64().unwrap_or(0.0)
    }

    /// Number of fractional digits as written, trailing zeros included
    pub fn scale(&self) -> u32 {
        self.value.scale()
    }

    /// Number of significant fractional digits (`"0.0100"` -> 2, `"5.0"` -> 0)
    pub fn fractional_digits(&self) -> u32 {
        self.value.normalize().scale()
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.value.is_sign_positive() && !self.value.is_zero()
    }

    /// Round half away from zero to `dp` decimal places (`2.345` -> `2.35`)
    pub fn round_dp(&self, dp: u32) -> Self {
        Fixed {
            value: self
                .value
                .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero),
        }
    }

    /// Truncate toward zero to `scale` decimal places
    pub fn trunc_with_scale(&self, scale: u32) -> Self {
        Fixed {
            value: self.value.trunc_with_scale(scale),
        }
    }

    /// Smallest integer greater than or equal to the value
    pub fn ceil(&self) -> Self {
        Fixed {
            value: self.value.ceil(),
        }
    }

    /// Smallest integer less than or equal to the value
    pub fn floor(&self) -> Self {
        Fixed {
            value: self.value.floor(),
        }
    }

    /// Division that reports zero divisors and overflow
    pub fn checked_div(&self, rhs: Fixed) -> Result<Fixed, FixedError> {
        if rhs.is_zero() {
            return Err(FixedError::DivisionByZero);
        }
        self.value
            .checked_div(rhs.value)
            .map(Fixed::from)
            .ok_or(FixedError::Overflow)
    }

    /// Multiplication that reports overflow
    pub fn checked_mul(&self, rhs: Fixed) -> Result<Fixed, FixedError> {
        self.value
            .checked_mul(rhs.value)
            .map(Fixed::from)
            .ok_or(FixedError::Overflow)
    }

    /// Subtraction that reports overflow
    pub fn checked_sub(&self, rhs: Fixed) -> Result<Fixed, FixedError> {
        self.value
            .checked_sub(rhs.value)
            .map(Fixed::from)
            .ok_or(FixedError::Overflow)
    }
}

/// Fixed-point arithmetic errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FixedError {
    #[error("Invalid value")]
    InvalidValue,
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Overflow in arithmetic operation")]
    Overflow,
}

impl Add for Fixed {
    type Output = Fixed;

    fn add(self, rhs: Self) -> Self::Output {
        Fixed {
            value: self.value + rhs.value,
        }
    }
}

impl Sub for Fixed {
    type Output = Fixed;

    fn sub(self, rhs: Self) -> Self::Output {
        Fixed {
            value: self.value - rhs.value,
        }
    }
}

impl Mul for Fixed {
    type Output = Fixed;

    fn mul(self, rhs: Self) -> Self::Output {
        Fixed {
            value: self.value * rhs.value,
        }
    }
}

impl Neg for Fixed {
    type Output = Fixed;

    fn neg(self) -> Self::Output {
        Fixed { value: -self.value }
    }
}

impl AddAssign for Fixed {
    fn add_assign(&mut self, rhs: Self) {
        self.value += rhs.value;
    }
}

impl SubAssign for Fixed {
    fn sub_assign(&mut self, rhs: Self) {
        self.value -= rhs.value;
    }
}

impl MulAssign for Fixed {
    fn mul_assign(&mut self, rhs: Self) {
        self.value *= rhs.value;
    }
}

impl Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.value, f)
    }
}

impl FromStr for Fixed {
    type Err = FixedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_exact(s)
    }
}

impl From<Decimal> for Fixed {
    fn from(value: Decimal) -> Self {
        Fixed { value }
    }
}

impl From<Fixed> for Decimal {
    fn from(fixed: Fixed) -> Self {
        fixed.value
    }
}

impl From<i64> for Fixed {
    fn from(value: i64) -> Self {
        Fixed::from_i64(value)
    }
}

impl From<u32> for Fixed {
    fn from(value: u32) -> Self {
        Fixed {
            value: Decimal::from(value),
        }
    }
}

/// Convenience macro for creating Fixed values from literals
#[macro_export]
macro_rules! fixed {
    ($value:expr) => {
        $crate::fixed::Fixed::from_str_exact(&stringify!($value).replace(' ', ""))
            .expect("fixed! literal must be a decimal number")
    };
}
