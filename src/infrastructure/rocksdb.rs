use crate::domain::catalog::{Book, BookId, Borrower, BorrowerId, MembershipType, MembershipTypeId};
use crate::domain::invoice::{Invoice, InvoiceId};
use crate::domain::ports::{
    BookStore, BorrowerStore, InvoiceStore, MembershipStore, Stores, TransactionStore,
};
use crate::domain::transaction::{Transaction, TransactionId};
use crate::error::{LibraryError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

pub const CF_BOOKS: &str = "books";
pub const CF_BORROWERS: &str = "borrowers";
pub const CF_MEMBERSHIPS: &str = "memberships";
pub const CF_TRANSACTIONS: &str = "transactions";
pub const CF_INVOICES: &str = "invoices";

const COLUMN_FAMILIES: [&str; 5] = [
    CF_BOOKS,
    CF_BORROWERS,
    CF_MEMBERSHIPS,
    CF_TRANSACTIONS,
    CF_INVOICES,
];

/// A persistent store implementation using RocksDB.
///
/// Every entity lives in its own column family, keyed by its big-endian id and
/// stored as JSON. Big-endian keys make iteration come back in id order.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at `path`, creating missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Every port backed by the same database.
    pub fn stores(&self) -> Stores {
        Stores {
            books: Box::new(self.clone()),
            borrowers: Box::new(self.clone()),
            memberships: Box::new(self.clone()),
            transactions: Box::new(self.clone()),
            invoices: Box::new(self.clone()),
        }
    }

    fn put<V: Serialize>(&self, cf_name: &str, id: u32, value: &V) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value)
            .map_err(|e| internal(format!("Serialization error: {e}")))?;
        self.db.put_cf(cf, id.to_be_bytes(), bytes)?;
        Ok(())
    }

    fn fetch<V: DeserializeOwned>(&self, cf_name: &str, id: u32) -> Result<Option<V>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, id.to_be_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| internal(format!("Deserialization error: {e}"))),
            None => Ok(None),
        }
    }

    fn contains(&self, cf_name: &str, id: u32) -> Result<bool> {
        let cf = self.cf(cf_name)?;
        Ok(self.db.get_pinned_cf(cf, id.to_be_bytes())?.is_some())
    }

    fn scan<V: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<V>> {
        let cf = self.cf(cf_name)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let row = serde_json::from_slice(&value)
                .map_err(|e| internal(format!("Failed to deserialize {cf_name} row: {e}")))?;
            rows.push(row);
        }
        Ok(rows)
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| internal(format!("Column family '{name}' not found")))
    }
}

fn internal(message: String) -> LibraryError {
    LibraryError::InternalError(Box::new(std::io::Error::other(message)))
}

#[async_trait]
impl BookStore for RocksDBStore {
    async fn store(&self, book: Book) -> Result<()> {
        self.put(CF_BOOKS, book.id, &book)
    }

    async fn get(&self, id: BookId) -> Result<Option<Book>> {
        self.fetch(CF_BOOKS, id)
    }

    async fn get_all(&self) -> Result<Vec<Book>> {
        self.scan(CF_BOOKS)
    }
}

#[async_trait]
impl BorrowerStore for RocksDBStore {
    async fn store(&self, borrower: Borrower) -> Result<()> {
        self.put(CF_BORROWERS, borrower.id, &borrower)
    }

    async fn get(&self, id: BorrowerId) -> Result<Option<Borrower>> {
        self.fetch(CF_BORROWERS, id)
    }
}

#[async_trait]
impl MembershipStore for RocksDBStore {
    async fn store(&self, membership: MembershipType) -> Result<()> {
        self.put(CF_MEMBERSHIPS, membership.id, &membership)
    }

    async fn get(&self, id: MembershipTypeId) -> Result<Option<MembershipType>> {
        self.fetch(CF_MEMBERSHIPS, id)
    }
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn store(&self, tx: Transaction) -> Result<()> {
        self.put(CF_TRANSACTIONS, tx.id, &tx)
    }

    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>> {
        self.fetch(CF_TRANSACTIONS, id)
    }

    async fn exists(&self, id: TransactionId) -> Result<bool> {
        self.contains(CF_TRANSACTIONS, id)
    }

    async fn get_all(&self) -> Result<Vec<Transaction>> {
        self.scan(CF_TRANSACTIONS)
    }
}

#[async_trait]
impl InvoiceStore for RocksDBStore {
    async fn store(&self, invoice: Invoice) -> Result<()> {
        self.put(CF_INVOICES, invoice.id, &invoice)
    }

    async fn get(&self, id: InvoiceId) -> Result<Option<Invoice>> {
        self.fetch(CF_INVOICES, id)
    }

    async fn get_all(&self) -> Result<Vec<Invoice>> {
        self.scan(CF_INVOICES)
    }
}
