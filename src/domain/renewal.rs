use super::catalog::MembershipType;
use super::transaction::{Transaction, TransactionStatus};
use chrono::NaiveDate;
use std::fmt;

/// Why a loan cannot be renewed.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RenewalDenial {
    Closed,
    Overdue,
    LimitReached { limit: u32 },
}

impl fmt::Display for RenewalDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenewalDenial::Closed => f.write_str("transaction is closed"),
            RenewalDenial::Overdue => f.write_str("transaction is overdue"),
            RenewalDenial::LimitReached { limit } => {
                write!(f, "renewal limit of {limit} reached")
            }
        }
    }
}

/// Checks whether `transaction` may be renewed on `on` under `membership`.
pub fn renewal_eligibility(
    transaction: &Transaction,
    membership: &MembershipType,
    on: NaiveDate,
) -> Result<(), RenewalDenial> {
    check_renewal(transaction, membership.renewal_limit, on)
}

pub(crate) fn check_renewal(
    transaction: &Transaction,
    renewal_limit: u32,
    on: NaiveDate,
) -> Result<(), RenewalDenial> {
    if !transaction.status.is_open() {
        return Err(RenewalDenial::Closed);
    }
    if transaction.status == TransactionStatus::Delayed || on > transaction.due_on {
        return Err(RenewalDenial::Overdue);
    }
    if transaction.renewals >= renewal_limit {
        return Err(RenewalDenial::LimitReached {
            limit: renewal_limit,
        });
    }
    Ok(())
}
