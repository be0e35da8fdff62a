pub mod event_reader;
pub mod invoice_writer;
pub mod loan_writer;
