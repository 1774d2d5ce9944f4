use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// unique identifier for a customer
pub type CustomerId = Uuid;

/// unique identifier for an EMI or rent obligation
pub type ObligationId = Uuid;

/// unique identifier for a leasing partner
pub type PartnerId = Uuid;

/// plan a customer is billed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// battery financed through equated monthly installments
    Emi,
    /// battery rented month to month
    MonthlyRent,
    /// battery bought outright
    OneTimePurchase,
}

/// settlement status of an obligation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// nothing paid yet, due date not passed
    Due,
    /// partly paid, due date not passed
    Partial,
    /// fully settled
    Paid,
    /// due date passed without full payment
    Overdue,
}

impl PaymentStatus {
    /// still carries a remaining amount
    pub fn is_outstanding(&self) -> bool {
        !matches!(self, PaymentStatus::Paid)
    }

    /// eligible for the due/partial -> overdue transition
    pub fn can_become_overdue(&self) -> bool {
        matches!(self, PaymentStatus::Due | PaymentStatus::Partial)
    }

    /// ordering rank used by the distributor: overdue first, then everything else
    pub(crate) fn priority(&self) -> u8 {
        match self {
            PaymentStatus::Overdue => 0,
            PaymentStatus::Partial | PaymentStatus::Due => 1,
            PaymentStatus::Paid => 2,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Due => "due",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Overdue => "overdue",
        };
        f.write_str(s)
    }
}

/// kind of obligation a payment was applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationKind {
    // declaration order is the tie-break on equal due dates
    Emi,
    Rent,
}

/// type recorded on a transaction / ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Emi,
    Rent,
    Purchase,
}

impl From<ObligationKind> for TransactionType {
    fn from(kind: ObligationKind) -> Self {
        match kind {
            ObligationKind::Emi => TransactionType::Emi,
            ObligationKind::Rent => TransactionType::Rent,
        }
    }
}

/// how the customer handed over the money
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Cash,
    Upi,
    BankTransfer,
    Card,
    Cheque,
}

/// which obligations a payment may be distributed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionMode {
    Emi,
    Rent,
    Auto,
}

impl DistributionMode {
    pub fn covers(&self, kind: ObligationKind) -> bool {
        match self {
            DistributionMode::Emi => kind == ObligationKind::Emi,
            DistributionMode::Rent => kind == ObligationKind::Rent,
            DistributionMode::Auto => true,
        }
    }
}
