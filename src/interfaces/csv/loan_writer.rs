use crate::domain::fees::FeeCalculator;
use crate::domain::transaction::Transaction;
use crate::error::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct LoanRow {
    transaction: u32,
    borrower: u32,
    status: String,
    due: NaiveDate,
    renewals: u32,
    fines: Decimal,
    accrued: Decimal,
}

/// Writes the loan report as CSV. `accrued` previews the overdue fines of
/// items still out as of the report date.
pub struct LoanWriter<'a, W: Write> {
    writer: csv::Writer<W>,
    calculator: &'a FeeCalculator,
    as_of: NaiveDate,
}

impl<'a, W: Write> LoanWriter<'a, W> {
    pub fn new(sink: W, calculator: &'a FeeCalculator, as_of: NaiveDate) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
            calculator,
            as_of,
        }
    }

    pub fn write_loans(&mut self, loans: &[Transaction]) -> Result<()> {
        if loans.is_empty() {
            self.writer.write_record([
                "transaction",
                "borrower",
                "status",
                "due",
                "renewals",
                "fines",
                "accrued",
            ])?;
        }
        for loan in loans {
            self.writer.serialize(LoanRow {
                transaction: loan.id,
                borrower: loan.borrower,
                status: loan.status.to_string(),
                due: loan.due_on,
                renewals: loan.renewals,
                fines: loan.total_fines().to_dollars(),
                accrued: self.calculator.accrued(loan, self.as_of).to_dollars(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Money;
    use crate::domain::transaction::TransactionItem;

    #[test]
    fn test_write_loans_with_accrual() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let loan = Transaction::open(
            3,
            1,
            start,
            14,
            vec![
                TransactionItem::new(1, Money::from_cents(1000)),
                TransactionItem::new(2, Money::from_cents(1000)),
            ],
        )
        .unwrap();
        let calc = FeeCalculator::default();
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();

        let mut buffer = Vec::new();
        LoanWriter::new(&mut buffer, &calc, as_of)
            .write_loans(&[loan])
            .unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "transaction,borrower,status,due,renewals,fines,accrued\n\
             3,1,borrowed,2024-03-15,0,0.00,1.00\n"
        );
    }
}
