use super::catalog::{BookId, BorrowerId};
use super::fees::FeeKind;
use super::money::Money;
use super::transaction::{Transaction, TransactionId};
use crate::error::{LibraryError, Result};
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type InvoiceId = u32;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
    Waived,
}

impl InvoiceStatus {
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Paid | Self::Waived)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unpaid => "unpaid",
            Self::PartiallyPaid => "partially_paid",
            Self::Paid => "paid",
            Self::Waived => "waived",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct InvoiceLine {
    pub kind: FeeKind,
    pub book: BookId,
    pub days: Option<u32>,
    pub amount: Money,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    pub amount: Money,
    pub paid_on: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Waiver {
    pub amount: Money,
    pub reason: String,
    pub waived_on: NaiveDate,
}

/// Numbering and payment terms applied when invoices are issued.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct InvoiceTerms {
    pub number_prefix: String,
    pub payment_terms_days: u32,
}

impl Default for InvoiceTerms {
    fn default() -> Self {
        Self {
            number_prefix: "INV".to_string(),
            payment_terms_days: 14,
        }
    }
}

/// The billable record of a closed transaction's fines.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Invoice {
    pub id: InvoiceId,
    pub number: String,
    pub transaction: TransactionId,
    pub borrower: BorrowerId,
    pub lines: Vec<InvoiceLine>,
    pub total: Money,
    pub paid: Money,
    pub status: InvoiceStatus,
    pub issued_on: NaiveDate,
    pub due_on: NaiveDate,
    #[serde(default)]
    pub payments: Vec<Payment>,
    pub waiver: Option<Waiver>,
}

impl Invoice {
    /// Bills the charges of a closed transaction.
    pub fn issue(
        id: InvoiceId,
        transaction: &Transaction,
        on: NaiveDate,
        terms: &InvoiceTerms,
    ) -> Result<Self> {
        if transaction.status.is_open() {
            return Err(LibraryError::ValidationError(format!(
                "Transaction {} is still open",
                transaction.id
            )));
        }
        let lines: Vec<InvoiceLine> = transaction
            .charges()
            .map(|charge| InvoiceLine {
                kind: charge.kind,
                book: charge.book,
                days: charge.days,
                amount: charge.amount,
            })
            .collect();
        let total: Money = lines.iter().map(|line| line.amount).sum();
        if !total.is_positive() {
            return Err(LibraryError::ValidationError(format!(
                "Transaction {} has no fines to invoice",
                transaction.id
            )));
        }
        let due_on = on
            .checked_add_days(Days::new(u64::from(terms.payment_terms_days)))
            .ok_or_else(|| LibraryError::ValidationError("Invoice due date overflow".to_string()))?;

        Ok(Self {
            id,
            number: format!("{}-{}-{:05}", terms.number_prefix, on.year(), id),
            transaction: transaction.id,
            borrower: transaction.borrower,
            lines,
            total,
            paid: Money::ZERO,
            status: InvoiceStatus::Unpaid,
            issued_on: on,
            due_on,
            payments: Vec::new(),
            waiver: None,
        })
    }

    pub fn outstanding(&self) -> Money {
        match self.status {
            InvoiceStatus::Waived => Money::ZERO,
            _ => self.total - self.paid,
        }
    }

    pub fn is_past_due(&self, as_of: NaiveDate) -> bool {
        !self.status.is_settled() && as_of > self.due_on
    }

    /// Applies a payment. Overpayment is refused rather than left as credit.
    pub fn record_payment(&mut self, amount: Money, on: NaiveDate) -> Result<()> {
        if self.status.is_settled() {
            return Err(self.invalid_transition(InvoiceStatus::Paid));
        }
        if !amount.is_positive() {
            return Err(LibraryError::ValidationError(
                "Payment amount must be positive".to_string(),
            ));
        }
        let outstanding = self.outstanding();
        if amount > outstanding {
            return Err(LibraryError::ValidationError(format!(
                "Payment {amount} exceeds outstanding {outstanding} on invoice {}",
                self.number
            )));
        }

        self.paid += amount;
        self.payments.push(Payment {
            amount,
            paid_on: on,
        });
        self.status = if self.paid == self.total {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::PartiallyPaid
        };
        Ok(())
    }

    /// Forgives whatever is still owed.
    pub fn waive(&mut self, reason: impl Into<String>, on: NaiveDate) -> Result<()> {
        if self.status.is_settled() {
            return Err(self.invalid_transition(InvoiceStatus::Waived));
        }
        self.waiver = Some(Waiver {
            amount: self.outstanding(),
            reason: reason.into(),
            waived_on: on,
        });
        self.status = InvoiceStatus::Waived;
        Ok(())
    }

    fn invalid_transition(&self, to: InvoiceStatus) -> LibraryError {
        LibraryError::InvalidTransition {
            entity: "invoice",
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fees::FeeCalculator;
    use crate::domain::transaction::{Resolution, TransactionItem};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lost_loan() -> Transaction {
        let mut tx = Transaction::open(
            42,
            7,
            date(2024, 3, 1),
            14,
            vec![TransactionItem::new(3, Money::from_cents(1500))],
        )
        .unwrap();
        tx.resolve_items(
            &[],
            Resolution::Lost,
            date(2024, 3, 19),
            &FeeCalculator::default(),
        )
        .unwrap();
        tx
    }

    fn invoice() -> Invoice {
        Invoice::issue(9, &lost_loan(), date(2024, 3, 20), &InvoiceTerms::default()).unwrap()
    }

    #[test]
    fn test_issue_copies_charges() {
        let invoice = invoice();
        assert_eq!(invoice.number, "INV-2024-00009");
        assert_eq!(invoice.lines.len(), 2);
        // 4 days overdue at 0.25 + lost at full price
        assert_eq!(invoice.total, Money::from_cents(100 + 1500));
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
        assert_eq!(invoice.due_on, date(2024, 4, 3));
    }

    #[test]
    fn test_issue_requires_closed_transaction_with_fines() {
        let open = Transaction::open(
            1,
            7,
            date(2024, 3, 1),
            14,
            vec![TransactionItem::new(3, Money::from_cents(1500))],
        )
        .unwrap();
        assert!(Invoice::issue(1, &open, date(2024, 3, 2), &InvoiceTerms::default()).is_err());

        let mut clean = open.clone();
        clean
            .resolve_items(
                &[],
                Resolution::Returned,
                date(2024, 3, 2),
                &FeeCalculator::default(),
            )
            .unwrap();
        assert!(Invoice::issue(1, &clean, date(2024, 3, 2), &InvoiceTerms::default()).is_err());
    }

    #[test]
    fn test_partial_then_full_payment() {
        let mut invoice = invoice();
        invoice
            .record_payment(Money::from_cents(600), date(2024, 3, 21))
            .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::PartiallyPaid);
        assert_eq!(invoice.outstanding(), Money::from_cents(1000));

        invoice
            .record_payment(Money::from_cents(1000), date(2024, 3, 22))
            .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.outstanding(), Money::ZERO);
        assert_eq!(invoice.payments.len(), 2);
    }

    #[test]
    fn test_overpayment_and_non_positive_payment_rejected() {
        let mut invoice = invoice();
        assert!(
            invoice
                .record_payment(Money::from_cents(1601), date(2024, 3, 21))
                .is_err()
        );
        assert!(invoice.record_payment(Money::ZERO, date(2024, 3, 21)).is_err());
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
        assert!(invoice.payments.is_empty());
    }

    #[test]
    fn test_waive_after_partial_payment() {
        let mut invoice = invoice();
        invoice
            .record_payment(Money::from_cents(100), date(2024, 3, 21))
            .unwrap();
        invoice.waive("first offence", date(2024, 3, 25)).unwrap();

        assert_eq!(invoice.status, InvoiceStatus::Waived);
        assert_eq!(invoice.outstanding(), Money::ZERO);
        let waiver = invoice.waiver.as_ref().unwrap();
        assert_eq!(waiver.amount, Money::from_cents(1500));
        assert_eq!(waiver.reason, "first offence");
    }

    #[test]
    fn test_settled_invoices_are_terminal() {
        let mut paid = invoice();
        paid.record_payment(paid.total, date(2024, 3, 21)).unwrap();
        assert!(matches!(
            paid.waive("late", date(2024, 3, 22)),
            Err(LibraryError::InvalidTransition { .. })
        ));

        let mut waived = invoice();
        waived.waive("hardship", date(2024, 3, 21)).unwrap();
        assert!(matches!(
            waived.record_payment(Money::from_cents(1), date(2024, 3, 22)),
            Err(LibraryError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_past_due_only_while_unsettled() {
        let mut invoice = invoice();
        assert!(!invoice.is_past_due(date(2024, 4, 3)));
        assert!(invoice.is_past_due(date(2024, 4, 4)));
        invoice.waive("goodwill", date(2024, 4, 4)).unwrap();
        assert!(!invoice.is_past_due(date(2024, 4, 5)));
    }
}
