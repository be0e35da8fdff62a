//! Fine computation.
//!
//! Everything here is a pure function of the fee schedule, a few dates and a
//! replacement price. Amounts are integer cents throughout.

use super::catalog::BookId;
use super::money::Money;
use super::transaction::{Resolution, Transaction, TransactionItem};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum FeeKind {
    Overdue,
    Lost,
    Damaged,
}

impl std::fmt::Display for FeeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FeeKind::Overdue => "overdue",
            FeeKind::Lost => "lost",
            FeeKind::Damaged => "damaged",
        };
        f.write_str(label)
    }
}

/// One billable line attached to a borrowed item.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Charge {
    pub kind: FeeKind,
    pub book: BookId,
    /// Chargeable days, only set for overdue charges.
    pub days: Option<u32>,
    pub amount: Money,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct OverduePolicy {
    pub enabled: bool,
    pub per_day: Money,
    pub grace_period_days: u32,
    pub max_days: Option<u32>,
    pub max_amount: Option<Money>,
}

impl Default for OverduePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            per_day: Money::from_cents(25),
            grace_period_days: 0,
            max_days: None,
            max_amount: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub enum FineBasis {
    Fixed(Money),
    /// Percent of the book's replacement price, `100` being the full price.
    Percentage(Decimal),
}

/// How a lost or damaged copy is charged.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ReplacementPolicy {
    pub basis: FineBasis,
    pub minimum: Option<Money>,
    pub maximum: Option<Money>,
}

impl ReplacementPolicy {
    pub fn fixed(amount: Money) -> Self {
        Self {
            basis: FineBasis::Fixed(amount),
            minimum: None,
            maximum: None,
        }
    }

    pub fn percentage(rate: Decimal) -> Self {
        Self {
            basis: FineBasis::Percentage(rate),
            minimum: None,
            maximum: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct FeeSchedule {
    pub overdue: OverduePolicy,
    pub lost: ReplacementPolicy,
    pub damaged: ReplacementPolicy,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            overdue: OverduePolicy::default(),
            lost: ReplacementPolicy::percentage(Decimal::ONE_HUNDRED),
            damaged: ReplacementPolicy::percentage(Decimal::from(50)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeeCalculator {
    schedule: FeeSchedule,
}

impl FeeCalculator {
    pub fn new(schedule: FeeSchedule) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }

    /// Whole calendar days strictly after `due`.
    pub fn days_overdue(due: NaiveDate, as_of: NaiveDate) -> u32 {
        let days = (as_of - due).num_days();
        u32::try_from(days.max(0)).unwrap_or(u32::MAX)
    }

    /// Overdue days that are billed: grace days are never charged, and the
    /// remainder is capped at `max_days`.
    pub fn chargeable_days(&self, due: NaiveDate, as_of: NaiveDate) -> u32 {
        let policy = &self.schedule.overdue;
        let days = Self::days_overdue(due, as_of).saturating_sub(policy.grace_period_days);
        match policy.max_days {
            Some(cap) => days.min(cap),
            None => days,
        }
    }

    pub fn overdue_fine(&self, due: NaiveDate, as_of: NaiveDate) -> Money {
        let policy = &self.schedule.overdue;
        if !policy.enabled {
            return Money::ZERO;
        }
        let fine = policy.per_day.times(self.chargeable_days(due, as_of));
        match policy.max_amount {
            Some(cap) => fine.min(cap),
            None => fine,
        }
    }

    pub fn lost_fine(&self, price: Money) -> Money {
        Self::replacement_fine(&self.schedule.lost, price)
    }

    pub fn damaged_fine(&self, price: Money) -> Money {
        Self::replacement_fine(&self.schedule.damaged, price)
    }

    fn replacement_fine(policy: &ReplacementPolicy, price: Money) -> Money {
        let mut fine = match &policy.basis {
            FineBasis::Fixed(amount) => *amount,
            FineBasis::Percentage(rate) => price.percent_of(*rate),
        };
        if let Some(minimum) = policy.minimum {
            fine = fine.max(minimum);
        }
        if let Some(maximum) = policy.maximum {
            fine = fine.min(maximum);
        }
        fine.max(Money::ZERO)
    }

    /// Charges for an item resolved on `on` against a loan due on `due`.
    ///
    /// Zero-amount charges are dropped.
    pub fn assess_item(
        &self,
        item: &TransactionItem,
        due: NaiveDate,
        resolution: Resolution,
        on: NaiveDate,
    ) -> Vec<Charge> {
        let mut charges = Vec::new();

        let overdue = self.overdue_fine(due, on);
        if overdue.is_positive() {
            charges.push(Charge {
                kind: FeeKind::Overdue,
                book: item.book,
                days: Some(self.chargeable_days(due, on)),
                amount: overdue,
            });
        }

        let replacement = match resolution {
            Resolution::Returned => None,
            Resolution::Lost => Some((FeeKind::Lost, self.lost_fine(item.replacement_price))),
            Resolution::Damaged => Some((
                FeeKind::Damaged,
                self.damaged_fine(item.replacement_price),
            )),
        };
        if let Some((kind, amount)) = replacement
            && amount.is_positive()
        {
            charges.push(Charge {
                kind,
                book: item.book,
                days: None,
                amount,
            });
        }

        charges
    }

    /// Overdue fines accrued so far on the items still out.
    pub fn accrued(&self, transaction: &Transaction, as_of: NaiveDate) -> Money {
        transaction
            .items
            .iter()
            .filter(|item| item.is_out())
            .map(|_| self.overdue_fine(transaction.due_on, as_of))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calculator(overdue: OverduePolicy) -> FeeCalculator {
        FeeCalculator::new(FeeSchedule {
            overdue,
            ..FeeSchedule::default()
        })
    }

    #[rstest]
    #[case::before_due(date(2024, 3, 10), 0)]
    #[case::on_due_date(date(2024, 3, 15), 0)]
    #[case::one_day_late(date(2024, 3, 16), 1)]
    #[case::across_month_end(date(2024, 4, 2), 18)]
    fn test_days_overdue(#[case] as_of: NaiveDate, #[case] expected: u32) {
        assert_eq!(FeeCalculator::days_overdue(date(2024, 3, 15), as_of), expected);
    }

    #[test]
    fn test_days_overdue_counts_leap_day() {
        assert_eq!(
            FeeCalculator::days_overdue(date(2024, 2, 28), date(2024, 3, 1)),
            2
        );
        assert_eq!(
            FeeCalculator::days_overdue(date(2023, 2, 28), date(2023, 3, 1)),
            1
        );
    }

    #[rstest]
    // 0.25/day, 3 grace days, cap 10 days, cap 2.00
    #[case::inside_grace(3, 0)]
    #[case::first_charged_day(4, 25)]
    #[case::several_days(7, 100)]
    #[case::amount_cap_hits_first(12, 200)]
    #[case::far_past_due(60, 200)]
    fn test_overdue_fine_with_grace_and_caps(#[case] days_late: i64, #[case] cents: i64) {
        let calc = calculator(OverduePolicy {
            enabled: true,
            per_day: Money::from_cents(25),
            grace_period_days: 3,
            max_days: Some(10),
            max_amount: Some(Money::from_cents(200)),
        });
        let due = date(2024, 1, 10);
        let as_of = due + chrono::Duration::days(days_late);
        assert_eq!(calc.overdue_fine(due, as_of), Money::from_cents(cents));
    }

    #[test]
    fn test_day_cap_without_amount_cap() {
        let calc = calculator(OverduePolicy {
            enabled: true,
            per_day: Money::from_cents(50),
            grace_period_days: 0,
            max_days: Some(5),
            max_amount: None,
        });
        let due = date(2024, 1, 10);
        assert_eq!(calc.chargeable_days(due, date(2024, 2, 10)), 5);
        assert_eq!(calc.overdue_fine(due, date(2024, 2, 10)), Money::from_cents(250));
    }

    #[test]
    fn test_disabled_overdue_policy_charges_nothing() {
        let calc = calculator(OverduePolicy {
            enabled: false,
            ..OverduePolicy::default()
        });
        assert_eq!(
            calc.overdue_fine(date(2024, 1, 1), date(2024, 6, 1)),
            Money::ZERO
        );
    }

    #[rstest]
    #[case::percentage_inside_bounds(ReplacementPolicy {
        basis: FineBasis::Percentage(dec!(100)),
        minimum: Some(Money::from_cents(500)),
        maximum: Some(Money::from_cents(5000)),
    }, 2499, 2499)]
    #[case::raised_to_minimum(ReplacementPolicy {
        basis: FineBasis::Percentage(dec!(50)),
        minimum: Some(Money::from_cents(500)),
        maximum: None,
    }, 600, 500)]
    #[case::lowered_to_maximum(ReplacementPolicy {
        basis: FineBasis::Percentage(dec!(100)),
        minimum: None,
        maximum: Some(Money::from_cents(3000)),
    }, 8000, 3000)]
    #[case::fixed_ignores_price(ReplacementPolicy::fixed(Money::from_cents(1500)), 9999, 1500)]
    #[case::maximum_wins_over_minimum(ReplacementPolicy {
        basis: FineBasis::Fixed(Money::from_cents(100)),
        minimum: Some(Money::from_cents(900)),
        maximum: Some(Money::from_cents(700)),
    }, 0, 700)]
    fn test_lost_fine(
        #[case] policy: ReplacementPolicy,
        #[case] price_cents: i64,
        #[case] expected_cents: i64,
    ) {
        let calc = FeeCalculator::new(FeeSchedule {
            lost: policy,
            ..FeeSchedule::default()
        });
        assert_eq!(
            calc.lost_fine(Money::from_cents(price_cents)),
            Money::from_cents(expected_cents)
        );
    }

    #[test]
    fn test_damaged_fine_uses_its_own_policy() {
        let calc = FeeCalculator::default();
        // default damaged policy is 50% of price
        assert_eq!(
            calc.damaged_fine(Money::from_cents(1999)),
            Money::from_cents(1000)
        );
        assert_eq!(
            calc.lost_fine(Money::from_cents(1999)),
            Money::from_cents(1999)
        );
    }

    #[test]
    fn test_assess_lost_item_includes_overdue_until_declared() {
        let calc = calculator(OverduePolicy {
            per_day: Money::from_cents(10),
            ..OverduePolicy::default()
        });
        let item = TransactionItem::new(4, Money::from_cents(2000));
        let charges = calc.assess_item(&item, date(2024, 5, 1), Resolution::Lost, date(2024, 5, 4));

        assert_eq!(charges.len(), 2);
        assert_eq!(charges[0].kind, FeeKind::Overdue);
        assert_eq!(charges[0].days, Some(3));
        assert_eq!(charges[0].amount, Money::from_cents(30));
        assert_eq!(charges[1].kind, FeeKind::Lost);
        assert_eq!(charges[1].amount, Money::from_cents(2000));
    }

    #[test]
    fn test_assess_late_damaged_item_charges_overdue_and_damage() {
        let calc = calculator(OverduePolicy {
            per_day: Money::from_cents(10),
            grace_period_days: 1,
            ..OverduePolicy::default()
        });
        let item = TransactionItem::new(4, Money::from_cents(2000));
        let charges = calc.assess_item(
            &item,
            date(2024, 5, 1),
            Resolution::Damaged,
            date(2024, 5, 7),
        );

        assert_eq!(charges.len(), 2);
        assert_eq!(charges[0].kind, FeeKind::Overdue);
        assert_eq!(charges[0].book, 4);
        assert_eq!(charges[0].days, Some(5));
        assert_eq!(charges[0].amount, Money::from_cents(50));
        assert_eq!(charges[1].kind, FeeKind::Damaged);
        assert_eq!(charges[1].days, None);
        assert_eq!(charges[1].amount, Money::from_cents(1000));
    }

    #[test]
    fn test_assess_on_time_return_has_no_charges() {
        let calc = FeeCalculator::default();
        let item = TransactionItem::new(4, Money::from_cents(2000));
        let charges = calc.assess_item(
            &item,
            date(2024, 5, 1),
            Resolution::Returned,
            date(2024, 5, 1),
        );
        assert!(charges.is_empty());
    }
}
