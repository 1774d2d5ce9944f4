//! Record-store seam.
//!
//! The engine never owns persistence. It talks to a [`BillingStore`], which must offer
//! per-customer reads, idempotent obligation inserts, a conditional overdue transition
//! and one atomic, version-checked write for a committed payment.
//! [`MemoryStore`] is the in-process implementation used by tests and demos.

pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::customer::Customer;
use crate::errors::Result;
use crate::obligations::{EmiObligation, RentObligation};
use crate::records::{CreditBalance, LedgerEntry, Transaction};
use crate::types::{CustomerId, ObligationId};

pub use memory::MemoryStore;

/// everything billing holds for one customer, as of `version`
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerBook {
    pub customer: Customer,
    /// ordered by `emi_number`
    pub emis: Vec<EmiObligation>,
    /// ordered by `rent_month`
    pub rents: Vec<RentObligation>,
    /// insertion order (oldest first)
    pub transactions: Vec<Transaction>,
    /// insertion order (oldest first)
    pub ledger: Vec<LedgerEntry>,
    pub credit: CreditBalance,
    /// bumped by every write that changes amounts or adds obligations
    pub version: u64,
}

impl CustomerBook {
    pub fn new(customer: Customer) -> Self {
        let credit = CreditBalance::empty(customer.id);
        Self {
            customer,
            emis: Vec::new(),
            rents: Vec::new(),
            transactions: Vec::new(),
            ledger: Vec::new(),
            credit,
            version: 0,
        }
    }

    pub fn latest_rent_month(&self) -> Option<NaiveDate> {
        self.rents.iter().map(|r| r.rent_month).max()
    }
}

/// the atomic unit written when a payment is committed
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentChangeSet {
    pub customer_id: CustomerId,
    /// book version the distribution was computed against
    pub expected_version: u64,
    /// full replacement rows for every touched obligation
    pub emis: Vec<EmiObligation>,
    pub rents: Vec<RentObligation>,
    pub transaction: Transaction,
    pub ledger_entry: LedgerEntry,
    pub credit: CreditBalance,
    pub next_due_date: Option<NaiveDate>,
}

#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn insert_customer(&self, customer: Customer) -> Result<()>;

    async fn customer_ids(&self) -> Result<Vec<CustomerId>>;

    /// `CustomerNotFound` when the id is unknown
    async fn book(&self, customer_id: CustomerId) -> Result<CustomerBook>;

    /// insert the rows whose `emi_number` is not present yet; returns what was inserted
    async fn insert_emis(
        &self,
        customer_id: CustomerId,
        rows: Vec<EmiObligation>,
    ) -> Result<Vec<EmiObligation>>;

    /// insert unless the customer already has a row for `rent_month`
    async fn insert_rent(
        &self,
        customer_id: CustomerId,
        row: RentObligation,
    ) -> Result<Option<RentObligation>>;

    async fn set_next_due_date(&self, customer_id: CustomerId, date: Option<NaiveDate>) -> Result<()>;

    /// move the given obligations to overdue if, under the store's own lock, they are
    /// still due/partial and their due date is before `today`; returns how many moved
    async fn mark_overdue(
        &self,
        customer_id: CustomerId,
        obligation_ids: &[ObligationId],
        today: NaiveDate,
    ) -> Result<usize>;

    async fn append_transaction(&self, transaction: Transaction) -> Result<()>;

    /// all-or-nothing; `ConcurrentModification` if the book moved past `expected_version`
    async fn commit_payment(&self, changes: PaymentChangeSet) -> Result<()>;
}
