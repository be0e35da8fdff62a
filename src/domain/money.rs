use crate::error::{LibraryError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// A monetary value held as integer cents.
///
/// Every fee, payment and invoice total is computed in cents so that sums never
/// drift. Dollars only show up at the edges, as `rust_decimal::Decimal` with
/// scale 2.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Self = Self(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    /// Converts a dollar amount into cents.
    ///
    /// Rejects amounts carrying fractions of a cent instead of silently rounding
    /// them away.
    pub fn from_dollars(dollars: Decimal) -> Result<Self> {
        let out_of_range =
            || LibraryError::ValidationError(format!("Amount {dollars} is out of range"));
        let cents = dollars
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(out_of_range)?;
        if cents.fract() != Decimal::ZERO {
            return Err(LibraryError::ValidationError(format!(
                "Amount {dollars} has sub-cent precision"
            )));
        }
        cents.to_i64().map(Self).ok_or_else(out_of_range)
    }

    pub fn to_dollars(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// `rate` percent of this amount, rounded to the nearest cent (half away from zero).
    pub fn percent_of(self, rate: Decimal) -> Self {
        let saturated = if self.0.is_negative() != rate.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        };
        Decimal::from(self.0)
            .checked_mul(rate)
            .map(|scaled| {
                (scaled / Decimal::ONE_HUNDRED)
                    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            })
            .and_then(|cents| cents.to_i64())
            .map_or(Self(saturated), Self)
    }

    pub fn times(self, n: u32) -> Self {
        Self(self.0.saturating_mul(i64::from(n)))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dollars())
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl TryFrom<Decimal> for Money {
    type Error = LibraryError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::from_dollars(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.to_dollars()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_cents(1050);
        let b = Money::from_cents(275);
        assert_eq!(a + b, Money::from_cents(1325));
        assert_eq!(a - b, Money::from_cents(775));
        assert_eq!(
            [a, b, Money::from_cents(5)].iter().sum::<Money>(),
            Money::from_cents(1330)
        );
    }

    #[test]
    fn test_from_dollars_exact() {
        assert_eq!(Money::from_dollars(dec!(12.34)).unwrap().cents(), 1234);
        assert_eq!(Money::from_dollars(dec!(7)).unwrap().cents(), 700);
        assert_eq!(Money::from_dollars(dec!(0.50)).unwrap().cents(), 50);
    }

    #[test]
    fn test_from_dollars_rejects_sub_cent() {
        assert!(matches!(
            Money::from_dollars(dec!(0.005)),
            Err(LibraryError::ValidationError(_))
        ));
    }

    #[test]
    fn test_to_dollars_keeps_two_places() {
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(1200).to_string(), "12.00");
        assert_eq!(Money::from_cents(-250).to_dollars(), dec!(-2.50));
    }

    #[test]
    fn test_percent_of_rounds_half_away_from_zero() {
        // 12.5% of 1.00 = 12.5 cents
        assert_eq!(Money::from_cents(100).percent_of(dec!(12.5)).cents(), 13);
        assert_eq!(Money::from_cents(1999).percent_of(dec!(50)).cents(), 1000);
        assert_eq!(Money::from_cents(2000).percent_of(dec!(100)).cents(), 2000);
        assert_eq!(Money::from_cents(2000).percent_of(dec!(0)).cents(), 0);
    }

    #[test]
    fn test_percent_of_saturates_on_huge_rates() {
        let price = Money::from_cents(i64::MAX / 2);
        assert_eq!(price.percent_of(Decimal::MAX).cents(), i64::MAX);
        assert_eq!(price.percent_of(dec!(1000000000)).cents(), i64::MAX);
        assert_eq!(Money::from_cents(-500).percent_of(Decimal::MAX).cents(), i64::MIN);
    }

    #[test]
    fn test_times_saturates() {
        assert_eq!(Money::from_cents(25).times(4).cents(), 100);
        assert_eq!(Money::from_cents(i64::MAX).times(2).cents(), i64::MAX);
    }
}
