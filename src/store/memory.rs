use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::customer::Customer;
use crate::errors::{BillingError, Result};
use crate::obligations::{EmiObligation, Obligation, RentObligation};
use crate::records::Transaction;
use crate::types::{CustomerId, ObligationId};

use super::{BillingStore, CustomerBook, PaymentChangeSet};

/// in-process store; one book per customer behind a single lock
#[derive(Debug)]
pub struct MemoryStore {
    books: RwLock<HashMap<CustomerId, CustomerBook>>,
    available: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            latency: Mutex::new(None),
        }
    }

    /// fault injection: while unavailable every call fails with `StoreUnavailable`
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// fault injection: delay every call by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    async fn gate(&self) -> Result<()> {
        let latency = *self.latency.lock();
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(BillingError::StoreUnavailable {
                message: "memory store switched off".to_string(),
            });
        }
        Ok(())
    }

    fn with_book_mut<T>(
        &self,
        customer_id: CustomerId,
        f: impl FnOnce(&mut CustomerBook) -> Result<T>,
    ) -> Result<T> {
        let mut books = self.books.write();
        let book = books
            .get_mut(&customer_id)
            .ok_or(BillingError::CustomerNotFound { customer_id })?;
        f(book)
    }
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn insert_customer(&self, customer: Customer) -> Result<()> {
        self.gate().await?;
        self.books
            .write()
            .entry(customer.id)
            .or_insert_with(|| CustomerBook::new(customer));
        Ok(())
    }

    async fn customer_ids(&self) -> Result<Vec<CustomerId>> {
        self.gate().await?;
        let books = self.books.read();
        let mut ids: Vec<(NaiveDate, CustomerId)> = books
            .values()
            .map(|b| (b.customer.join_date, b.customer.id))
            .collect();
        ids.sort();
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    async fn book(&self, customer_id: CustomerId) -> Result<CustomerBook> {
        self.gate().await?;
        self.books
            .read()
            .get(&customer_id)
            .cloned()
            .ok_or(BillingError::CustomerNotFound { customer_id })
    }

    async fn insert_emis(
        &self,
        customer_id: CustomerId,
        rows: Vec<EmiObligation>,
    ) -> Result<Vec<EmiObligation>> {
        self.gate().await?;
        self.with_book_mut(customer_id, |book| {
            let mut inserted = Vec::new();
            for row in rows {
                if book.emis.iter().any(|e| e.emi_number == row.emi_number) {
                    continue;
                }
                book.emis.push(row.clone());
                inserted.push(row);
            }
            if !inserted.is_empty() {
                book.emis.sort_by_key(|e| e.emi_number);
                book.version += 1;
            }
            Ok(inserted)
        })
    }

    async fn insert_rent(
        &self,
        customer_id: CustomerId,
        row: RentObligation,
    ) -> Result<Option<RentObligation>> {
        self.gate().await?;
        self.with_book_mut(customer_id, |book| {
            if book.rents.iter().any(|r| r.rent_month == row.rent_month) {
                return Ok(None);
            }
            book.rents.push(row.clone());
            book.rents.sort_by_key(|r| r.rent_month);
            book.version += 1;
            Ok(Some(row))
        })
    }

    async fn set_next_due_date(&self, customer_id: CustomerId, date: Option<NaiveDate>) -> Result<()> {
        self.gate().await?;
        self.with_book_mut(customer_id, |book| {
            book.customer.next_due_date = date;
            Ok(())
        })
    }

    async fn mark_overdue(
        &self,
        customer_id: CustomerId,
        obligation_ids: &[ObligationId],
        today: NaiveDate,
    ) -> Result<usize> {
        self.gate().await?;
        // status-only transition: the version is left alone so in-flight commits stay valid
        self.with_book_mut(customer_id, |book| {
            let mut moved = 0;
            for emi in book.emis.iter_mut().filter(|e| obligation_ids.contains(&e.id)) {
                if emi.mark_overdue_if_elapsed(today) {
                    moved += 1;
                }
            }
            for rent in book.rents.iter_mut().filter(|r| obligation_ids.contains(&r.id)) {
                if rent.mark_overdue_if_elapsed(today) {
                    moved += 1;
                }
            }
            Ok(moved)
        })
    }

    async fn append_transaction(&self, transaction: Transaction) -> Result<()> {
        self.gate().await?;
        self.with_book_mut(transaction.customer_id, |book| {
            book.transactions.push(transaction);
            Ok(())
        })
    }

    async fn commit_payment(&self, changes: PaymentChangeSet) -> Result<()> {
        self.gate().await?;
        self.with_book_mut(changes.customer_id, |book| {
            if book.version != changes.expected_version {
                return Err(BillingError::ConcurrentModification {
                    customer_id: changes.customer_id,
                    expected: changes.expected_version,
                    found: book.version,
                });
            }

            // resolve every row before touching anything
            let mut emi_slots = Vec::with_capacity(changes.emis.len());
            for row in &changes.emis {
                let slot = book
                    .emis
                    .iter()
                    .position(|e| e.id == row.id)
                    .ok_or(BillingError::ObligationNotFound { obligation_id: row.id })?;
                emi_slots.push(slot);
            }
            let mut rent_slots = Vec::with_capacity(changes.rents.len());
            for row in &changes.rents {
                let slot = book
                    .rents
                    .iter()
                    .position(|r| r.id == row.id)
                    .ok_or(BillingError::ObligationNotFound { obligation_id: row.id })?;
                rent_slots.push(slot);
            }

            for (slot, row) in emi_slots.into_iter().zip(changes.emis) {
                book.emis[slot] = row;
            }
            for (slot, row) in rent_slots.into_iter().zip(changes.rents) {
                book.rents[slot] = row;
            }
            book.transactions.push(changes.transaction);
            book.ledger.push(changes.ledger_entry);
            book.credit = changes.credit;
            book.customer.next_due_date = changes.next_due_date;
            book.version += 1;
            Ok(())
        })
    }
}
