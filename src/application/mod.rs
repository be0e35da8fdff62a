//! Application layer containing the back office orchestration.
//!
//! `LibraryDesk` is the entry point: it applies circulation events through the
//! `CirculationService` (loans, renewals) and the `InvoiceService` (billing,
//! payments, waivers), both of which work against the storage ports.

pub mod circulation;
pub mod desk;
pub mod invoicing;
