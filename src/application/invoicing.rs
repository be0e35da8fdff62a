use crate::domain::catalog::BorrowerId;
use crate::domain::invoice::{Invoice, InvoiceId, InvoiceTerms};
use crate::domain::money::Money;
use crate::domain::ports::Stores;
use crate::domain::transaction::{Transaction, TransactionId};
use crate::error::{LibraryError, Result};
use chrono::NaiveDate;
use tracing::info;

/// Issues invoices for closed loans and records what happens to them afterwards.
pub struct InvoiceService<'a> {
    stores: &'a Stores,
    terms: &'a InvoiceTerms,
}

impl<'a> InvoiceService<'a> {
    pub fn new(stores: &'a Stores, terms: &'a InvoiceTerms) -> Self {
        Self { stores, terms }
    }

    /// Bills a closed transaction's fines.
    ///
    /// Returns the existing invoice if one was already issued, and `None` when
    /// the loan is still open or closed without fines.
    pub async fn issue_for_transaction(
        &self,
        transaction_id: TransactionId,
        on: NaiveDate,
    ) -> Result<Option<Invoice>> {
        if let Some(existing) = self.stores.invoices.for_transaction(transaction_id).await? {
            return Ok(Some(existing));
        }
        let transaction = self
            .stores
            .transactions
            .get(transaction_id)
            .await?
            .ok_or(LibraryError::NotFound {
                entity: "transaction",
                id: transaction_id,
            })?;
        match self.draft(&transaction, on).await? {
            Some(invoice) => self.file(invoice).await.map(Some),
            None => Ok(None),
        }
    }

    /// Builds the invoice `transaction` would get, without storing it.
    ///
    /// `None` when the loan is open, closed without fines, or already billed.
    pub async fn draft(&self, transaction: &Transaction, on: NaiveDate) -> Result<Option<Invoice>> {
        if transaction.status.is_open() || !transaction.total_fines().is_positive() {
            return Ok(None);
        }
        if self
            .stores
            .invoices
            .for_transaction(transaction.id)
            .await?
            .is_some()
        {
            return Ok(None);
        }
        let id = self.next_id().await?;
        Invoice::issue(id, transaction, on, self.terms).map(Some)
    }

    /// Stores a drafted invoice.
    pub async fn file(&self, invoice: Invoice) -> Result<Invoice> {
        self.stores.invoices.store(invoice.clone()).await?;

        info!(
            invoice = %invoice.number,
            transaction = invoice.transaction,
            borrower = invoice.borrower,
            total = %invoice.total,
            "invoice issued"
        );
        Ok(invoice)
    }

    pub async fn record_payment(
        &self,
        invoice_id: InvoiceId,
        amount: Money,
        on: NaiveDate,
    ) -> Result<Invoice> {
        let mut invoice = self.load(invoice_id).await?;
        invoice.record_payment(amount, on)?;
        self.stores.invoices.store(invoice.clone()).await?;

        info!(
            invoice = %invoice.number,
            amount = %amount,
            outstanding = %invoice.outstanding(),
            status = %invoice.status,
            "payment recorded"
        );
        Ok(invoice)
    }

    pub async fn waive(&self, invoice_id: InvoiceId, reason: &str, on: NaiveDate) -> Result<Invoice> {
        let mut invoice = self.load(invoice_id).await?;
        invoice.waive(reason, on)?;
        self.stores.invoices.store(invoice.clone()).await?;

        info!(invoice = %invoice.number, reason, "invoice waived");
        Ok(invoice)
    }

    pub async fn invoice_for_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Option<Invoice>> {
        self.stores.invoices.for_transaction(transaction_id).await
    }

    /// What a borrower still owes across all invoices.
    pub async fn outstanding_balance(&self, borrower: BorrowerId) -> Result<Money> {
        Ok(self
            .stores
            .invoices
            .for_borrower(borrower)
            .await?
            .iter()
            .map(Invoice::outstanding)
            .sum())
    }

    async fn next_id(&self) -> Result<InvoiceId> {
        let last = self
            .stores
            .invoices
            .get_all()
            .await?
            .iter()
            .map(|invoice| invoice.id)
            .max()
            .unwrap_or(0);
        Ok(last + 1)
    }

    async fn load(&self, id: InvoiceId) -> Result<Invoice> {
        self.stores
            .invoices
            .get(id)
            .await?
            .ok_or(LibraryError::NotFound {
                entity: "invoice",
                id,
            })
    }
}
