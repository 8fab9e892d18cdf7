use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const UGX_CURRENCY_CODE: &str = "UGX";
pub const UGX_CURRENCY_CODE_LOWER: &str = "ugx";

//--------------------------------------        Ugx         ----------------------------------------------------------
/// An amount of Uganda shillings. UGX has no minor unit, so the wrapped value is whole shillings.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Ugx(i64);

op!(binary Ugx, Add, add);
op!(binary Ugx, Sub, sub);
op!(inplace Ugx, SubAssign, sub_assign);
op!(unary Ugx, Neg, neg);

impl Mul<i64> for Ugx {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Ugx {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in shillings: {0}")]
pub struct UgxConversionError(String);

impl From<i64> for Ugx {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Ugx {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Ugx {}

impl TryFrom<u64> for Ugx {
    type Error = UgxConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(UgxConversionError(format!("Value {} is too large to convert to Ugx", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Ugx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UGX {}", group_thousands(self.0))
    }
}

impl Ugx {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Absolute difference between two amounts.
    pub fn abs_diff(&self, other: Ugx) -> Ugx {
        Ugx((self.0 - other.0).abs())
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

fn group_thousands(v: i64) -> String {
    let (sign, digits) = if v < 0 { ("-", v.unsigned_abs().to_string()) } else { ("", v.to_string()) };
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - offset) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("{sign}{out}")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_groups_thousands() {
        assert_eq!(Ugx::from(300_000).to_string(), "UGX 300,000");
        assert_eq!(Ugx::from(1_250).to_string(), "UGX 1,250");
        assert_eq!(Ugx::from(75).to_string(), "UGX 75");
        assert_eq!(Ugx::from(-4_500_000).to_string(), "UGX -4,500,000");
    }

    #[test]
    fn arithmetic() {
        let rent = Ugx::from(450_000);
        assert_eq!(rent * 3, Ugx::from(1_350_000));
        assert_eq!(rent - Ugx::from(50_000), Ugx::from(400_000));
        assert_eq!(Ugx::from(100).abs_diff(Ugx::from(130)), Ugx::from(30));
        assert_eq!(Ugx::from(130).abs_diff(Ugx::from(100)), Ugx::from(30));
    }
}
