use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{CustomerId, PaymentMode, PaymentStatus, TransactionType};

/// immutable audit record of a payment event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub customer_id: CustomerId,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub transaction_date: NaiveDate,
    /// status of the obligation(s) this payment settled, not of the transaction
    pub payment_status: PaymentStatus,
    pub remarks: String,
}

impl Transaction {
    pub fn new(
        customer_id: CustomerId,
        transaction_type: TransactionType,
        amount: Money,
        transaction_date: NaiveDate,
        payment_status: PaymentStatus,
        remarks: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            transaction_type,
            amount,
            transaction_date,
            payment_status,
            remarks: remarks.into(),
        }
    }
}

/// append-only ledger line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub customer_id: CustomerId,
    pub payment_date: NaiveDate,
    pub payment_type: TransactionType,
    pub payment_mode: PaymentMode,
    pub amount_paid: Money,
    /// credit balance after this entry
    pub running_balance: Money,
    pub reference_number: Option<String>,
    pub remarks: Option<String>,
}

/// customer credit held against future dues
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreditBalance {
    pub customer_id: CustomerId,
    pub credit_balance: Money,
}

impl CreditBalance {
    pub fn empty(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            credit_balance: Money::ZERO,
        }
    }

    /// balance after crediting a non-negative excess
    pub fn credited(&self, excess: Money) -> Self {
        Self {
            customer_id: self.customer_id,
            credit_balance: self.credit_balance + excess.max(Money::ZERO),
        }
    }
}
