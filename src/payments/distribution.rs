use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::Result;
use crate::obligations::Obligation;
use crate::store::CustomerBook;
use crate::types::{CustomerId, DistributionMode, ObligationId, ObligationKind, PaymentStatus};

use super::validate_amount;

/// share of a payment applied to one obligation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub obligation_id: ObligationId,
    pub kind: ObligationKind,
    pub due_date: NaiveDate,
    pub previous_status: PaymentStatus,
    pub applied_amount: Money,
    pub new_status: PaymentStatus,
    pub remaining_after: Money,
}

/// computed, not yet committed, mapping of a payment onto obligations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionPlan {
    pub customer_id: CustomerId,
    pub mode: DistributionMode,
    pub amount: Money,
    /// in application order
    pub allocations: Vec<Allocation>,
    /// remainder credited to the customer
    pub excess_amount: Money,
    /// always equals `amount`
    pub total_processed: Money,
    pub previous_credit: Money,
    /// book version this plan was computed against
    pub based_on_version: u64,
}

impl DistributionPlan {
    pub fn total_applied(&self) -> Money {
        self.allocations.iter().map(|a| a.applied_amount).sum()
    }

    pub fn new_credit_balance(&self) -> Money {
        self.previous_credit + self.excess_amount
    }

    /// applied + excess == amount
    pub fn is_fully_accounted(&self) -> bool {
        self.total_applied() + self.excess_amount == self.amount && self.total_processed == self.amount
    }

    pub fn applied_to(&self, kind: ObligationKind) -> Money {
        self.allocations
            .iter()
            .filter(|a| a.kind == kind)
            .map(|a| a.applied_amount)
            .sum()
    }

    /// same money moved to the same obligations; `previous_status` is ignored since an
    /// overdue transition between preview and commit changes labels, not amounts
    pub fn matches_distribution(&self, other: &DistributionPlan) -> bool {
        self.customer_id == other.customer_id
            && self.mode == other.mode
            && self.amount == other.amount
            && self.excess_amount == other.excess_amount
            && self.total_processed == other.total_processed
            && self.previous_credit == other.previous_credit
            && self.based_on_version == other.based_on_version
            && self.allocations.len() == other.allocations.len()
            && self.allocations.iter().zip(&other.allocations).all(|(a, b)| {
                a.obligation_id == b.obligation_id
                    && a.kind == b.kind
                    && a.applied_amount == b.applied_amount
                    && a.new_status == b.new_status
                    && a.remaining_after == b.remaining_after
            })
    }
}

/// decides how much of a payment goes to which obligation
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentDistributor;

impl PaymentDistributor {
    pub fn new() -> Self {
        Self
    }

    /// distribute `amount` over the customer's outstanding obligations
    ///
    /// order: overdue first, then ascending due date, EMI before rent on equal dates.
    /// Read-only: the book is not modified.
    pub fn plan(&self, book: &CustomerBook, amount: Money, mode: DistributionMode) -> Result<DistributionPlan> {
        validate_amount(amount)?;

        let mut remaining = amount;
        let mut allocations = Vec::new();

        for obligation in self.candidates(book, mode) {
            if remaining.is_zero() {
                break;
            }

            let owed = obligation.remaining_amount();
            let applied = remaining.min(owed);
            if applied.is_zero() {
                continue;
            }
            remaining -= applied;

            let remaining_after = owed - applied;
            allocations.push(Allocation {
                obligation_id: obligation.id(),
                kind: obligation.kind(),
                due_date: obligation.due_date(),
                previous_status: obligation.payment_status(),
                applied_amount: applied,
                new_status: if remaining_after.is_zero() {
                    PaymentStatus::Paid
                } else {
                    PaymentStatus::Partial
                },
                remaining_after,
            });
        }

        Ok(DistributionPlan {
            customer_id: book.customer.id,
            mode,
            amount,
            allocations,
            excess_amount: remaining,
            total_processed: amount,
            previous_credit: book.credit.credit_balance,
            based_on_version: book.version,
        })
    }

    /// outstanding obligations of the kinds `mode` covers, in application order
    pub fn candidates<'a>(&self, book: &'a CustomerBook, mode: DistributionMode) -> Vec<&'a dyn Obligation> {
        let emis = book.emis.iter().map(|o| o as &dyn Obligation);
        let rents = book.rents.iter().map(|o| o as &dyn Obligation);

        let mut candidates: Vec<&dyn Obligation> = emis
            .chain(rents)
            .filter(|o| o.is_outstanding() && mode.covers(o.kind()))
            .collect();

        // stable: equal keys keep emi_number / rent_month order
        candidates.sort_by_key(|o| (o.payment_status().priority(), o.due_date(), o.kind()));
        candidates
    }
}
