pub mod distribution;
pub mod ledger;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::types::{CustomerId, DistributionMode, PaymentMode};

pub use distribution::{Allocation, DistributionPlan, PaymentDistributor};
pub use ledger::LedgerWriter;

/// an incoming payment as entered by the back office
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub customer_id: CustomerId,
    pub amount: Money,
    pub mode: DistributionMode,
    pub payment_mode: PaymentMode,
    pub payment_date: NaiveDate,
    pub remarks: String,
    pub reference_number: Option<String>,
}

impl PaymentRequest {
    pub fn new(
        customer_id: CustomerId,
        amount: Money,
        mode: DistributionMode,
        payment_mode: PaymentMode,
        payment_date: NaiveDate,
    ) -> Self {
        Self {
            customer_id,
            amount,
            mode,
            payment_mode,
            payment_date,
            remarks: String::new(),
            reference_number: None,
        }
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = remarks.into();
        self
    }

    /// UPI/cheque/bank reference recorded on the ledger entry
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference_number = Some(reference.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_amount(self.amount)
    }
}

pub(crate) fn validate_amount(amount: Money) -> Result<()> {
    if !amount.is_positive() {
        return Err(BillingError::InvalidAmount { amount });
    }
    Ok(())
}
