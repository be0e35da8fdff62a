use crate::config::CirculationPolicy;
use crate::domain::catalog::{BookId, BorrowerId};
use crate::domain::fees::FeeCalculator;
use crate::domain::money::Money;
use crate::domain::ports::Stores;
use crate::domain::transaction::{Resolution, Transaction, TransactionId, TransactionItem};
use crate::error::{LibraryError, Result};
use chrono::NaiveDate;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct BorrowRequest {
    pub transaction: TransactionId,
    pub borrower: BorrowerId,
    pub books: Vec<BookId>,
    pub on: NaiveDate,
}

/// A resolved loan that has not been written back yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingResolution {
    pub transaction: Transaction,
    pub resolution: Resolution,
    /// Books resolved by this step.
    pub books: Vec<BookId>,
}

/// Loan lifecycle: borrowing, returns, lost and damaged copies, renewals.
///
/// Every operation validates fully before writing anything, so a rejected
/// call leaves the stores as they were.
pub struct CirculationService<'a> {
    stores: &'a Stores,
    calculator: &'a FeeCalculator,
    policy: &'a CirculationPolicy,
}

impl<'a> CirculationService<'a> {
    pub fn new(
        stores: &'a Stores,
        calculator: &'a FeeCalculator,
        policy: &'a CirculationPolicy,
    ) -> Self {
        Self {
            stores,
            calculator,
            policy,
        }
    }

    pub async fn borrow(&self, request: BorrowRequest) -> Result<Transaction> {
        if self.stores.transactions.exists(request.transaction).await? {
            return Err(LibraryError::Duplicate {
                entity: "transaction",
                id: request.transaction,
            });
        }

        let borrower = self
            .stores
            .borrowers
            .get(request.borrower)
            .await?
            .ok_or(LibraryError::NotFound {
                entity: "borrower",
                id: request.borrower,
            })?;
        let membership = self
            .stores
            .memberships
            .get(borrower.membership_type)
            .await?
            .ok_or(LibraryError::NotFound {
                entity: "membership type",
                id: borrower.membership_type,
            })?;
        if !borrower.membership_valid_on(request.on) {
            return Err(LibraryError::ValidationError(format!(
                "Membership of borrower {} is not valid on {}",
                borrower.id, request.on
            )));
        }

        let mut books = Vec::with_capacity(request.books.len());
        for id in &request.books {
            let book = self
                .stores
                .books
                .get(*id)
                .await?
                .ok_or(LibraryError::NotFound {
                    entity: "book",
                    id: *id,
                })?;
            books.push(book);
        }
        let items = books
            .iter()
            .map(|book| TransactionItem::new(book.id, book.price))
            .collect();
        let transaction = Transaction::open(
            request.transaction,
            borrower.id,
            request.on,
            membership.loan_period_days,
            items,
        )?;

        let held: usize = self
            .stores
            .transactions
            .open_for_borrower(borrower.id)
            .await?
            .iter()
            .map(|tx| tx.outstanding_books().len())
            .sum();
        let requested = u32::try_from(held + books.len()).unwrap_or(u32::MAX);
        if requested > membership.max_books {
            return Err(LibraryError::BorrowLimitExceeded {
                borrower: borrower.id,
                limit: membership.max_books,
                requested,
            });
        }

        if let Some(limit) = self.policy.max_outstanding_balance {
            let owed: Money = self
                .stores
                .invoices
                .for_borrower(borrower.id)
                .await?
                .iter()
                .map(|invoice| invoice.outstanding())
                .sum();
            if owed > limit {
                return Err(LibraryError::ValidationError(format!(
                    "Borrower {} owes {owed}, above the limit of {limit}",
                    borrower.id
                )));
            }
        }

        for book in &mut books {
            book.check_out()?;
        }
        for book in books {
            self.stores.books.store(book).await?;
        }
        self.stores.transactions.store(transaction.clone()).await?;

        info!(
            transaction = transaction.id,
            borrower = transaction.borrower,
            books = transaction.items.len(),
            due = %transaction.due_on,
            "books borrowed"
        );
        Ok(transaction)
    }

    pub async fn return_books(
        &self,
        id: TransactionId,
        books: &[BookId],
        on: NaiveDate,
    ) -> Result<Transaction> {
        self.resolve(id, books, Resolution::Returned, on).await
    }

    pub async fn mark_lost(
        &self,
        id: TransactionId,
        books: &[BookId],
        on: NaiveDate,
    ) -> Result<Transaction> {
        self.resolve(id, books, Resolution::Lost, on).await
    }

    pub async fn mark_damaged(
        &self,
        id: TransactionId,
        books: &[BookId],
        on: NaiveDate,
    ) -> Result<Transaction> {
        self.resolve(id, books, Resolution::Damaged, on).await
    }

    async fn resolve(
        &self,
        id: TransactionId,
        books: &[BookId],
        resolution: Resolution,
        on: NaiveDate,
    ) -> Result<Transaction> {
        let pending = self.prepare_resolution(id, books, resolution, on).await?;
        self.commit(&pending).await?;
        Ok(pending.transaction)
    }

    /// Applies a return, loss or damage to a copy of the loan without writing it.
    ///
    /// Callers that have more checks to run on the outcome, such as billing a
    /// loan that just closed, do so before handing it to [`Self::commit`].
    pub async fn prepare_resolution(
        &self,
        id: TransactionId,
        books: &[BookId],
        resolution: Resolution,
        on: NaiveDate,
    ) -> Result<PendingResolution> {
        let mut transaction = self.load(id).await?;
        let books = transaction.resolve_items(books, resolution, on, self.calculator)?;
        Ok(PendingResolution {
            transaction,
            resolution,
            books,
        })
    }

    pub async fn commit(&self, pending: &PendingResolution) -> Result<()> {
        let transaction = &pending.transaction;
        // Lost and damaged copies stay off the shelf.
        if pending.resolution == Resolution::Returned {
            for book_id in &pending.books {
                match self.stores.books.get(*book_id).await? {
                    Some(mut book) => {
                        book.restock();
                        self.stores.books.store(book).await?;
                    }
                    None => debug!(book = book_id, "returned book no longer catalogued"),
                }
            }
        }
        self.stores.transactions.store(transaction.clone()).await?;

        info!(
            transaction = transaction.id,
            resolution = ?pending.resolution,
            books = ?pending.books,
            status = %transaction.status,
            fines = %transaction.total_fines(),
            "items resolved"
        );
        Ok(())
    }

    pub async fn renew(&self, id: TransactionId, on: NaiveDate) -> Result<Transaction> {
        let mut transaction = self.load(id).await?;
        let borrower = self
            .stores
            .borrowers
            .get(transaction.borrower)
            .await?
            .ok_or(LibraryError::NotFound {
                entity: "borrower",
                id: transaction.borrower,
            })?;
        let membership = self
            .stores
            .memberships
            .get(borrower.membership_type)
            .await?
            .ok_or(LibraryError::NotFound {
                entity: "membership type",
                id: borrower.membership_type,
            })?;

        transaction.renew(membership.loan_period_days, membership.renewal_limit, on)?;
        self.stores.transactions.store(transaction.clone()).await?;

        info!(
            transaction = id,
            renewals = transaction.renewals,
            due = %transaction.due_on,
            "loan renewed"
        );
        Ok(transaction)
    }

    /// Flags every open loan that is past due on `as_of`.
    pub async fn sweep_overdue(&self, as_of: NaiveDate) -> Result<Vec<TransactionId>> {
        let mut flagged = Vec::new();
        for mut transaction in self.stores.transactions.get_all().await? {
            if transaction.mark_overdue(as_of) {
                flagged.push(transaction.id);
                self.stores.transactions.store(transaction).await?;
            }
        }
        if !flagged.is_empty() {
            info!(as_of = %as_of, count = flagged.len(), "loans marked delayed");
        }
        Ok(flagged)
    }

    /// Overdue fines the items still out would owe if returned on `as_of`.
    pub async fn accrued_fines(&self, id: TransactionId, as_of: NaiveDate) -> Result<Money> {
        let transaction = self.load(id).await?;
        Ok(self.calculator.accrued(&transaction, as_of))
    }

    async fn load(&self, id: TransactionId) -> Result<Transaction> {
        self.stores
            .transactions
            .get(id)
            .await?
            .ok_or(LibraryError::NotFound {
                entity: "transaction",
                id,
            })
    }
}
