use crate::domain::catalog::{Book, BookId, Borrower, BorrowerId, MembershipType, MembershipTypeId};
use crate::domain::invoice::{Invoice, InvoiceId};
use crate::domain::ports::{
    BookStore, BorrowerStore, InvoiceStore, MembershipStore, Stores, TransactionStore,
};
use crate::domain::transaction::{Transaction, TransactionId};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A shared, ordered map behind an async `RwLock`.
///
/// `BTreeMap` keeps `get_all` in id order, which keeps reports stable.
#[derive(Clone)]
struct Table<V> {
    rows: Arc<RwLock<BTreeMap<u32, V>>>,
}

impl<V> Default for Table<V> {
    fn default() -> Self {
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl<V: Clone> Table<V> {
    async fn put(&self, id: u32, value: V) {
        self.rows.write().await.insert(id, value);
    }

    async fn get(&self, id: u32) -> Option<V> {
        self.rows.read().await.get(&id).cloned()
    }

    async fn contains(&self, id: u32) -> bool {
        self.rows.read().await.contains_key(&id)
    }

    async fn all(&self) -> Vec<V> {
        self.rows.read().await.values().cloned().collect()
    }
}

#[derive(Default, Clone)]
pub struct InMemoryBookStore {
    books: Table<Book>,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn store(&self, book: Book) -> Result<()> {
        self.books.put(book.id, book).await;
        Ok(())
    }

    async fn get(&self, id: BookId) -> Result<Option<Book>> {
        Ok(self.books.get(id).await)
    }

    async fn get_all(&self) -> Result<Vec<Book>> {
        Ok(self.books.all().await)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryBorrowerStore {
    borrowers: Table<Borrower>,
}

impl InMemoryBorrowerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BorrowerStore for InMemoryBorrowerStore {
    async fn store(&self, borrower: Borrower) -> Result<()> {
        self.borrowers.put(borrower.id, borrower).await;
        Ok(())
    }

    async fn get(&self, id: BorrowerId) -> Result<Option<Borrower>> {
        Ok(self.borrowers.get(id).await)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryMembershipStore {
    memberships: Table<MembershipType>,
}

impl InMemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MembershipStore for InMemoryMembershipStore {
    async fn store(&self, membership: MembershipType) -> Result<()> {
        self.memberships.put(membership.id, membership).await;
        Ok(())
    }

    async fn get(&self, id: MembershipTypeId) -> Result<Option<MembershipType>> {
        Ok(self.memberships.get(id).await)
    }
}

/// Loan history, needed for returns, renewals and invoicing.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Table<Transaction>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn store(&self, tx: Transaction) -> Result<()> {
        self.transactions.put(tx.id, tx).await;
        Ok(())
    }

    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>> {
        Ok(self.transactions.get(id).await)
    }

    async fn exists(&self, id: TransactionId) -> Result<bool> {
        Ok(self.transactions.contains(id).await)
    }

    async fn get_all(&self) -> Result<Vec<Transaction>> {
        Ok(self.transactions.all().await)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryInvoiceStore {
    invoices: Table<Invoice>,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceStore for InMemoryInvoiceStore {
    async fn store(&self, invoice: Invoice) -> Result<()> {
        self.invoices.put(invoice.id, invoice).await;
        Ok(())
    }

    async fn get(&self, id: InvoiceId) -> Result<Option<Invoice>> {
        Ok(self.invoices.get(id).await)
    }

    async fn get_all(&self) -> Result<Vec<Invoice>> {
        Ok(self.invoices.all().await)
    }
}

impl Stores {
    /// A complete set of empty in-memory stores.
    pub fn in_memory() -> Self {
        Self {
            books: Box::new(InMemoryBookStore::new()),
            borrowers: Box::new(InMemoryBorrowerStore::new()),
            memberships: Box::new(InMemoryMembershipStore::new()),
            transactions: Box::new(InMemoryTransactionStore::new()),
            invoices: Box::new(InMemoryInvoiceStore::new()),
        }
    }
}
