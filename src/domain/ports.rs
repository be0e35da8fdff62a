use super::catalog::{Book, BookId, Borrower, BorrowerId, MembershipType, MembershipTypeId};
use super::invoice::{Invoice, InvoiceId};
use super::transaction::{Transaction, TransactionId};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait BookStore: Send + Sync {
    async fn store(&self, book: Book) -> Result<()>;
    async fn get(&self, id: BookId) -> Result<Option<Book>>;
    async fn get_all(&self) -> Result<Vec<Book>>;
}

#[async_trait]
pub trait BorrowerStore: Send + Sync {
    async fn store(&self, borrower: Borrower) -> Result<()>;
    async fn get(&self, id: BorrowerId) -> Result<Option<Borrower>>;
}

#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn store(&self, membership: MembershipType) -> Result<()>;
    async fn get(&self, id: MembershipTypeId) -> Result<Option<MembershipType>>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn store(&self, tx: Transaction) -> Result<()>;
    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>>;
    async fn exists(&self, id: TransactionId) -> Result<bool>;
    async fn get_all(&self) -> Result<Vec<Transaction>>;

    /// Open loans of one borrower.
    async fn open_for_borrower(&self, borrower: BorrowerId) -> Result<Vec<Transaction>> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .filter(|tx| tx.borrower == borrower && tx.status.is_open())
            .collect())
    }
}

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn store(&self, invoice: Invoice) -> Result<()>;
    async fn get(&self, id: InvoiceId) -> Result<Option<Invoice>>;
    async fn get_all(&self) -> Result<Vec<Invoice>>;

    async fn for_transaction(&self, transaction: TransactionId) -> Result<Option<Invoice>> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .find(|invoice| invoice.transaction == transaction))
    }

    async fn for_borrower(&self, borrower: BorrowerId) -> Result<Vec<Invoice>> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .filter(|invoice| invoice.borrower == borrower)
            .collect())
    }
}

pub type BookStoreBox = Box<dyn BookStore>;
pub type BorrowerStoreBox = Box<dyn BorrowerStore>;
pub type MembershipStoreBox = Box<dyn MembershipStore>;
pub type TransactionStoreBox = Box<dyn TransactionStore>;
pub type InvoiceStoreBox = Box<dyn InvoiceStore>;

/// Builds a fresh transaction store, e.g. one per test or per run.
pub type TransactionStoreFactory = Box<dyn Fn() -> TransactionStoreBox + Send + Sync>;

/// The full set of stores a desk runs against.
pub struct Stores {
    pub books: BookStoreBox,
    pub borrowers: BorrowerStoreBox,
    pub memberships: MembershipStoreBox,
    pub transactions: TransactionStoreBox,
    pub invoices: InvoiceStoreBox,
}
