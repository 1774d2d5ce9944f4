use chrono::NaiveDate;

use crate::customer::validate_emi_terms;
use crate::decimal::Money;
use crate::errors::Result;
use crate::obligations::EmiObligation;
use crate::types::CustomerId;

use super::add_months;

/// EMI installment schedule for one financed battery
#[derive(Debug, Clone, PartialEq)]
pub struct EmiScheduler {
    pub total_amount: Money,
    pub down_payment: Money,
    pub emi_count: u32,
    pub start_date: NaiveDate,
}

impl EmiScheduler {
    pub fn new(total_amount: Money, down_payment: Money, emi_count: u32, start_date: NaiveDate) -> Self {
        Self {
            total_amount,
            down_payment,
            emi_count,
            start_date,
        }
    }

    pub fn loan_amount(&self) -> Money {
        self.total_amount - self.down_payment
    }

    /// generate all `emi_count` installments
    ///
    /// installment `i` (1-based) falls due `i` months after the start date; every
    /// installment is `round2(loan / n)` except the last, which absorbs the remainder
    pub fn generate(&self, customer_id: CustomerId) -> Result<Vec<EmiObligation>> {
        let installments = validate_emi_terms(self.total_amount, self.down_payment, self.emi_count)?;

        installments
            .into_iter()
            .zip(1..=self.emi_count)
            .map(|(amount, emi_number)| {
                let due_date = add_months(self.start_date, emi_number)?;
                Ok(EmiObligation::new(customer_id, emi_number, self.emi_count, amount, due_date))
            })
            .collect()
    }
}
