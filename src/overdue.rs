use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::obligations::Obligation;
use crate::store::CustomerBook;
use crate::types::ObligationId;

/// finds obligations whose due date passed without full payment
#[derive(Debug, Clone, Copy, Default)]
pub struct OverdueMonitor;

impl OverdueMonitor {
    pub fn new() -> Self {
        Self
    }

    /// due/partial obligations with `due_date < today`
    pub fn elapsed(&self, book: &CustomerBook, today: NaiveDate) -> Vec<ObligationId> {
        let emis = book.emis.iter().map(|o| o as &dyn Obligation);
        let rents = book.rents.iter().map(|o| o as &dyn Obligation);

        emis.chain(rents)
            .filter(|o| o.payment_status().can_become_overdue() && o.due_date() < today)
            .map(|o| o.id())
            .collect()
    }
}

/// outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub customers_scanned: usize,
    pub obligations_marked: usize,
}
