use super::catalog::{BookId, BorrowerId};
use super::fees::{Charge, FeeCalculator};
use super::money::Money;
use super::renewal::check_renewal;
use crate::error::{LibraryError, Result};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub type TransactionId = u32;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Open and not yet past due.
    Borrowed,
    /// Open and past due.
    Delayed,
    Returned,
    Lost,
    Damaged,
}

impl TransactionStatus {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Borrowed | Self::Delayed)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Borrowed => "borrowed",
            Self::Delayed => "delayed",
            Self::Returned => "returned",
            Self::Lost => "lost",
            Self::Damaged => "damaged",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Out,
    Returned,
    Lost,
    Damaged,
}

/// How an outstanding item leaves the loan.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Resolution {
    Returned,
    Lost,
    Damaged,
}

impl From<Resolution> for ItemStatus {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Returned => ItemStatus::Returned,
            Resolution::Lost => ItemStatus::Lost,
            Resolution::Damaged => ItemStatus::Damaged,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TransactionItem {
    pub book: BookId,
    /// Book price captured at borrowing time.
    pub replacement_price: Money,
    #[serde(default)]
    pub status: ItemStatus,
    pub resolved_on: Option<NaiveDate>,
    #[serde(default)]
    pub charges: Vec<Charge>,
}

impl TransactionItem {
    pub fn new(book: BookId, replacement_price: Money) -> Self {
        Self {
            book,
            replacement_price,
            status: ItemStatus::Out,
            resolved_on: None,
            charges: Vec::new(),
        }
    }

    pub fn is_out(&self) -> bool {
        self.status == ItemStatus::Out
    }

    pub fn fine(&self) -> Money {
        self.charges.iter().map(|charge| charge.amount).sum()
    }
}

/// A borrowing event: one borrower, one due date, one or more books.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub borrower: BorrowerId,
    pub borrowed_on: NaiveDate,
    pub due_on: NaiveDate,
    pub status: TransactionStatus,
    #[serde(default)]
    pub renewals: u32,
    pub items: Vec<TransactionItem>,
    pub closed_on: Option<NaiveDate>,
}

impl Transaction {
    pub fn open(
        id: TransactionId,
        borrower: BorrowerId,
        borrowed_on: NaiveDate,
        loan_period_days: u32,
        items: Vec<TransactionItem>,
    ) -> Result<Self> {
        if items.is_empty() {
            return Err(LibraryError::ValidationError(format!(
                "Transaction {id} has no books"
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = items.iter().find(|item| !seen.insert(item.book)) {
            return Err(LibraryError::ValidationError(format!(
                "Book {} listed twice in transaction {id}",
                dup.book
            )));
        }
        let due_on = add_days(borrowed_on, loan_period_days)?;
        Ok(Self {
            id,
            borrower,
            borrowed_on,
            due_on,
            status: TransactionStatus::Borrowed,
            renewals: 0,
            items,
            closed_on: None,
        })
    }

    pub fn is_overdue(&self, as_of: NaiveDate) -> bool {
        self.status.is_open() && as_of > self.due_on
    }

    pub fn outstanding_books(&self) -> Vec<BookId> {
        self.items
            .iter()
            .filter(|item| item.is_out())
            .map(|item| item.book)
            .collect()
    }

    pub fn total_fines(&self) -> Money {
        self.items.iter().map(TransactionItem::fine).sum()
    }

    pub fn charges(&self) -> impl Iterator<Item = &Charge> {
        self.items.iter().flat_map(|item| item.charges.iter())
    }

    /// Moves an open loan to `Delayed` once past due. Returns whether it changed.
    pub fn mark_overdue(&mut self, as_of: NaiveDate) -> bool {
        if self.status == TransactionStatus::Borrowed && as_of > self.due_on {
            self.status = TransactionStatus::Delayed;
            true
        } else {
            false
        }
    }

    /// Resolves the listed books, or every outstanding book when `books` is empty.
    ///
    /// The whole call is rejected if any listed book is not out on this loan, so
    /// a failed call leaves the transaction untouched. Returns the resolved books.
    pub fn resolve_items(
        &mut self,
        books: &[BookId],
        resolution: Resolution,
        on: NaiveDate,
        calculator: &FeeCalculator,
    ) -> Result<Vec<BookId>> {
        if !self.status.is_open() {
            return Err(self.invalid_transition(resolution));
        }
        if on < self.borrowed_on {
            return Err(LibraryError::ValidationError(format!(
                "Transaction {} cannot be resolved on {on}, before it was borrowed",
                self.id
            )));
        }

        let targets = if books.is_empty() {
            self.outstanding_books()
        } else {
            let mut seen = HashSet::new();
            for book in books {
                let out = self
                    .items
                    .iter()
                    .any(|item| item.book == *book && item.is_out());
                if !out || !seen.insert(*book) {
                    return Err(LibraryError::ValidationError(format!(
                        "Book {book} is not out on transaction {}",
                        self.id
                    )));
                }
            }
            books.to_vec()
        };

        let due_on = self.due_on;
        for item in self.items.iter_mut().filter(|i| targets.contains(&i.book)) {
            item.charges = calculator.assess_item(item, due_on, resolution, on);
            item.status = resolution.into();
            item.resolved_on = Some(on);
        }

        self.mark_overdue(on);
        if self.items.iter().all(|item| !item.is_out()) {
            self.close(on);
        }
        Ok(targets)
    }

    fn close(&mut self, on: NaiveDate) {
        let any = |status: ItemStatus| self.items.iter().any(|item| item.status == status);
        self.status = if any(ItemStatus::Lost) {
            TransactionStatus::Lost
        } else if any(ItemStatus::Damaged) {
            TransactionStatus::Damaged
        } else {
            TransactionStatus::Returned
        };
        self.closed_on = Some(on);
    }

    /// Pushes the due date forward by `extension_days`, counted from the
    /// current due date. Refused once closed, overdue, or out of renewals.
    pub fn renew(&mut self, extension_days: u32, renewal_limit: u32, on: NaiveDate) -> Result<()> {
        check_renewal(self, renewal_limit, on).map_err(|reason| LibraryError::RenewalDenied {
            transaction: self.id,
            reason,
        })?;
        self.due_on = add_days(self.due_on, extension_days)?;
        self.renewals += 1;
        Ok(())
    }

    fn invalid_transition(&self, resolution: Resolution) -> LibraryError {
        LibraryError::InvalidTransition {
            entity: "transaction",
            from: self.status.to_string(),
            to: format!("{:?}", resolution).to_lowercase(),
        }
    }
}

fn add_days(date: NaiveDate, days: u32) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(u64::from(days)))
        .ok_or_else(|| {
            LibraryError::ValidationError(format!("Date overflow adding {days} days to {date}"))
        })
}
