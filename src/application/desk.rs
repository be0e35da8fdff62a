use super::circulation::{BorrowRequest, CirculationService};
use super::invoicing::InvoiceService;
use crate::config::{CirculationPolicy, LibraryConfig};
use crate::domain::event::{CirculationEvent, EventKind};
use crate::domain::fees::FeeCalculator;
use crate::domain::invoice::{Invoice, InvoiceTerms};
use crate::domain::money::Money;
use crate::domain::ports::Stores;
use crate::domain::transaction::{Resolution, Transaction, TransactionId};
use crate::error::{LibraryError, Result};
use tracing::debug;

/// The main entry point for the back office.
///
/// `LibraryDesk` owns the storage backends and the fee rules, and applies
/// circulation events one at a time. Closing a loan with fines issues its
/// invoice in the same step.
pub struct LibraryDesk {
    stores: Stores,
    calculator: FeeCalculator,
    terms: InvoiceTerms,
    policy: CirculationPolicy,
}

impl LibraryDesk {
    /// Creates a desk over `stores` using the fee, invoicing and circulation
    /// rules from `config`. The catalog is not touched, see [`Self::seed`].
    pub fn new(stores: Stores, config: &LibraryConfig) -> Self {
        Self {
            stores,
            calculator: FeeCalculator::new(config.fees.clone()),
            terms: config.invoicing.clone(),
            policy: config.circulation.clone(),
        }
    }

    /// Loads the catalog from `config` into the stores.
    ///
    /// Rows already present are left alone, so a persistent store keeps its
    /// stock levels across runs.
    pub async fn seed(&self, config: &LibraryConfig) -> Result<()> {
        for membership in &config.membership_types {
            if self.stores.memberships.get(membership.id).await?.is_none() {
                self.stores.memberships.store(membership.clone()).await?;
            }
        }
        for borrower in &config.borrowers {
            if self.stores.borrowers.get(borrower.id).await?.is_none() {
                self.stores.borrowers.store(borrower.clone()).await?;
            }
        }
        for book in &config.books {
            if self.stores.books.get(book.id).await?.is_none() {
                self.stores.books.store(book.clone()).await?;
            }
        }
        debug!(
            memberships = config.membership_types.len(),
            borrowers = config.borrowers.len(),
            books = config.books.len(),
            "catalog seeded"
        );
        Ok(())
    }

    pub fn circulation(&self) -> CirculationService<'_> {
        CirculationService::new(&self.stores, &self.calculator, &self.policy)
    }

    pub fn invoicing(&self) -> InvoiceService<'_> {
        InvoiceService::new(&self.stores, &self.terms)
    }

    pub fn calculator(&self) -> &FeeCalculator {
        &self.calculator
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Applies one event. A rejected event leaves the stores untouched.
    pub async fn process_event(&self, event: CirculationEvent) -> Result<()> {
        let on = event.date;
        match event.kind {
            EventKind::Borrow => {
                let borrower = event.borrower.ok_or_else(|| missing(event.kind, "borrower"))?;
                self.circulation()
                    .borrow(BorrowRequest {
                        transaction: require_transaction(&event)?,
                        borrower,
                        books: event.books,
                        on,
                    })
                    .await?;
            }
            EventKind::Return | EventKind::Lost | EventKind::Damaged => {
                let id = require_transaction(&event)?;
                let resolution = match event.kind {
                    EventKind::Return => Resolution::Returned,
                    EventKind::Lost => Resolution::Lost,
                    _ => Resolution::Damaged,
                };
                // The invoice is built before anything is written, so a loan
                // never closes without the bill for its fines.
                let circulation = self.circulation();
                let pending = circulation
                    .prepare_resolution(id, &event.books, resolution, on)
                    .await?;
                let invoicing = self.invoicing();
                let invoice = invoicing.draft(&pending.transaction, on).await?;
                circulation.commit(&pending).await?;
                if let Some(invoice) = invoice {
                    invoicing.file(invoice).await?;
                }
            }
            EventKind::Renew => {
                self.circulation()
                    .renew(require_transaction(&event)?, on)
                    .await?;
            }
            EventKind::Pay => {
                let amount = event.amount.ok_or_else(|| missing(event.kind, "amount"))?;
                let amount = Money::from_dollars(amount)?;
                let invoice = self.invoice_of(require_transaction(&event)?).await?;
                self.invoicing()
                    .record_payment(invoice.id, amount, on)
                    .await?;
            }
            EventKind::Waive => {
                let reason = event.note.as_deref().unwrap_or("waived at desk");
                let invoice = self.invoice_of(require_transaction(&event)?).await?;
                self.invoicing().waive(invoice.id, reason, on).await?;
            }
            EventKind::Sweep => {
                self.circulation().sweep_overdue(on).await?;
            }
        }
        Ok(())
    }

    pub async fn invoices(&self) -> Result<Vec<Invoice>> {
        self.stores.invoices.get_all().await
    }

    pub async fn transactions(&self) -> Result<Vec<Transaction>> {
        self.stores.transactions.get_all().await
    }

    async fn invoice_of(&self, transaction: TransactionId) -> Result<Invoice> {
        self.invoicing()
            .invoice_for_transaction(transaction)
            .await?
            .ok_or_else(|| {
                LibraryError::ValidationError(format!(
                    "Transaction {transaction} has no invoice"
                ))
            })
    }
}

fn require_transaction(event: &CirculationEvent) -> Result<TransactionId> {
    event
        .transaction
        .ok_or_else(|| missing(event.kind, "transaction"))
}

fn missing(kind: EventKind, field: &str) -> LibraryError {
    LibraryError::ValidationError(format!("{kind} event requires a {field}"))
}
