use crate::domain::invoice::Invoice;
use crate::error::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// Flat view of an invoice with amounts in dollars.
#[derive(Debug, Serialize)]
struct InvoiceRow<'a> {
    invoice: u32,
    number: &'a str,
    transaction: u32,
    borrower: u32,
    status: String,
    total: Decimal,
    paid: Decimal,
    outstanding: Decimal,
    due: NaiveDate,
}

impl<'a> From<&'a Invoice> for InvoiceRow<'a> {
    fn from(invoice: &'a Invoice) -> Self {
        Self {
            invoice: invoice.id,
            number: &invoice.number,
            transaction: invoice.transaction,
            borrower: invoice.borrower,
            status: invoice.status.to_string(),
            total: invoice.total.to_dollars(),
            paid: invoice.paid.to_dollars(),
            outstanding: invoice.outstanding().to_dollars(),
            due: invoice.due_on,
        }
    }
}

/// Writes the invoice report as CSV.
pub struct InvoiceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> InvoiceWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_invoices(&mut self, invoices: &[Invoice]) -> Result<()> {
        if invoices.is_empty() {
            // serialize() only emits the header alongside the first row
            self.writer.write_record([
                "invoice",
                "number",
                "transaction",
                "borrower",
                "status",
                "total",
                "paid",
                "outstanding",
                "due",
            ])?;
        }
        for invoice in invoices {
            self.writer.serialize(InvoiceRow::from(invoice))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
