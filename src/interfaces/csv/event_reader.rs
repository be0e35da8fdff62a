use crate::domain::event::CirculationEvent;
use crate::error::{LibraryError, Result};
use std::io::Read;

/// Reads circulation events from a CSV source.
///
/// Expected header: `type,transaction,borrower,books,date,amount,note`.
/// Whitespace is trimmed and short rows are accepted, so trailing empty
/// columns may be left out.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    /// Creates a new `EventReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes events; a malformed row yields an error for that row only.
    pub fn events(self) -> impl Iterator<Item = Result<CirculationEvent>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LibraryError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::EventKind;

    #[test]
    fn test_reader_valid_stream() {
        let data = "type, transaction, borrower, books, date, amount, note\n\
                    borrow, 1, 1, 1|2, 2024-03-01, ,\n\
                    return, 1, , 2, 2024-03-10, ,\n\
                    sweep, , , , 2024-03-20";
        let reader = EventReader::new(data.as_bytes());
        let results: Vec<Result<CirculationEvent>> = reader.events().collect();

        assert_eq!(results.len(), 3);
        let borrow = results[0].as_ref().unwrap();
        assert_eq!(borrow.books, vec![1, 2]);
        let sweep = results[2].as_ref().unwrap();
        assert_eq!(sweep.kind, EventKind::Sweep);
        assert_eq!(sweep.transaction, None);
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "type, transaction, borrower, books, date, amount, note\n\
                    invalid, 1, 1, 1, 2024-03-01, ,\n\
                    return, 1, , , 31/03/2024, ,\n\
                    renew, 1, , , 2024-03-05, ,";
        let reader = EventReader::new(data.as_bytes());
        let results: Vec<Result<CirculationEvent>> = reader.events().collect();

        assert!(results[0].is_err());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }
}
