use super::catalog::{BookId, BorrowerId};
use super::transaction::TransactionId;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::fmt;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Borrow,
    Return,
    Lost,
    Damaged,
    Renew,
    Pay,
    Waive,
    Sweep,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format!("{self:?}").to_lowercase())
    }
}

/// One row of the circulation log.
///
/// Which fields matter depends on `kind`: `pay` needs an `amount` in dollars,
/// `borrow` needs a borrower and books, `sweep` needs only a date.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CirculationEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub transaction: Option<TransactionId>,
    pub borrower: Option<BorrowerId>,
    #[serde(default, deserialize_with = "deserialize_books")]
    pub books: Vec<BookId>,
    pub date: NaiveDate,
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub note: Option<String>,
}

impl CirculationEvent {
    pub fn new(kind: EventKind, date: NaiveDate) -> Self {
        Self {
            kind,
            transaction: None,
            borrower: None,
            books: Vec::new(),
            date,
            amount: None,
            note: None,
        }
    }

    pub fn with_transaction(mut self, id: TransactionId) -> Self {
        self.transaction = Some(id);
        self
    }

    pub fn with_borrower(mut self, id: BorrowerId) -> Self {
        self.borrower = Some(id);
        self
    }

    pub fn with_books(mut self, books: Vec<BookId>) -> Self {
        self.books = books;
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Book ids separated by `|`, e.g. `3|7|12`. An empty field means no books.
fn deserialize_books<'de, D>(deserializer: D) -> Result<Vec<BookId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    raw.split('|')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<BookId>().map_err(serde::de::Error::custom))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn parse(csv: &str) -> Vec<Result<CirculationEvent, csv::Error>> {
        csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(csv.as_bytes())
            .into_deserialize()
            .collect()
    }

    #[test]
    fn test_borrow_row_with_several_books() {
        let rows = parse(
            "type, transaction, borrower, books, date, amount, note\n\
             borrow, 1, 4, 3|7|12, 2024-03-01, , ",
        );
        let event = rows[0].as_ref().unwrap();
        assert_eq!(event.kind, EventKind::Borrow);
        assert_eq!(event.borrower, Some(4));
        assert_eq!(event.books, vec![3, 7, 12]);
        assert_eq!(event.amount, None);
        assert_eq!(event.note, None);
    }

    #[test]
    fn test_pay_row_amount_in_dollars() {
        let rows = parse(
            "type, transaction, borrower, books, date, amount, note\n\
             pay, 1, , , 2024-03-20, 2.75, cash",
        );
        let event = rows[0].as_ref().unwrap();
        assert_eq!(event.kind, EventKind::Pay);
        assert!(event.books.is_empty());
        assert_eq!(event.amount, Some(dec!(2.75)));
        assert_eq!(event.note.as_deref(), Some("cash"));
    }

    #[test]
    fn test_bad_book_list_is_an_error() {
        let rows = parse(
            "type, transaction, borrower, books, date, amount, note\n\
             borrow, 1, 4, 3|x, 2024-03-01, , ",
        );
        assert!(rows[0].is_err());
    }
}
