//! Domain model: money, catalog, fees, loans, renewals and invoices, plus the
//! storage ports the application layer depends on.

pub mod catalog;
pub mod event;
pub mod fees;
pub mod invoice;
pub mod money;
pub mod ports;
pub mod renewal;
pub mod transaction;
