use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::CustomerId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BillingError {
    #[error("invalid payment amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("customer not found: {customer_id}")]
    CustomerNotFound {
        customer_id: CustomerId,
    },

    #[error("obligation not found: {obligation_id}")]
    ObligationNotFound {
        obligation_id: Uuid,
    },

    #[error("concurrent modification of customer {customer_id}: planned against version {expected}, store is at {found}")]
    ConcurrentModification {
        customer_id: CustomerId,
        expected: u64,
        found: u64,
    },

    #[error("record store unavailable: {message}")]
    StoreUnavailable {
        message: String,
    },

    #[error("invalid plan parameters: {message}")]
    InvalidPlanParameters {
        message: String,
    },
}

impl BillingError {
    /// whether the caller may retry the same operation (with a fresh preview for commits)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BillingError::StoreUnavailable { .. } | BillingError::ConcurrentModification { .. }
        )
    }

    pub(crate) fn invalid_plan(message: impl Into<String>) -> Self {
        BillingError::InvalidPlanParameters {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BillingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let id = Uuid::new_v4();

        assert!(BillingError::StoreUnavailable { message: "timeout".into() }.is_retryable());
        assert!(BillingError::ConcurrentModification { customer_id: id, expected: 1, found: 2 }
            .is_retryable());

        assert!(!BillingError::InvalidAmount { amount: Money::ZERO }.is_retryable());
        assert!(!BillingError::CustomerNotFound { customer_id: id }.is_retryable());
        assert!(!BillingError::ObligationNotFound { obligation_id: id }.is_retryable());
        assert!(!BillingError::invalid_plan("emi_count must be at least 1").is_retryable());
    }

    #[test]
    fn test_messages_carry_values() {
        let err = BillingError::InvalidAmount { amount: Money::from_major(-5) };
        assert_eq!(err.to_string(), "invalid payment amount: -5.00");
    }
}
