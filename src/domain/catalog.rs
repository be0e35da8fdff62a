use super::money::Money;
use crate::error::{LibraryError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type BookId = u32;
pub type BorrowerId = u32;
pub type MembershipTypeId = u32;

/// A catalogued title and the number of copies currently on the shelf.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub isbn: Option<String>,
    /// Replacement price, the base for percentage fines.
    pub price: Money,
    pub copies_available: u32,
}

impl Book {
    pub fn new(id: BookId, title: impl Into<String>, price: Money, copies: u32) -> Self {
        Self {
            id,
            title: title.into(),
            isbn: None,
            price,
            copies_available: copies,
        }
    }

    /// Takes one copy off the shelf.
    pub fn check_out(&mut self) -> Result<()> {
        if self.copies_available == 0 {
            return Err(LibraryError::BookUnavailable(self.id));
        }
        self.copies_available -= 1;
        Ok(())
    }

    pub fn restock(&mut self) {
        self.copies_available = self.copies_available.saturating_add(1);
    }
}

/// Borrowing rules shared by every borrower of a given tier.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct MembershipType {
    pub id: MembershipTypeId,
    pub name: String,
    /// Books a borrower may hold at once, across all open transactions.
    pub max_books: u32,
    /// Loan length at borrowing time, and the extension granted per renewal.
    pub loan_period_days: u32,
    pub renewal_limit: u32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Borrower {
    pub id: BorrowerId,
    pub name: String,
    pub membership_type: MembershipTypeId,
    pub membership_expires: Option<NaiveDate>,
}

impl Borrower {
    /// A membership stays valid through its expiry date.
    pub fn membership_valid_on(&self, date: NaiveDate) -> bool {
        self.membership_expires.is_none_or(|expires| date <= expires)
    }
}
