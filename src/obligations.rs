use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::types::{CustomerId, ObligationId, ObligationKind, PaymentStatus};

/// one installment of an EMI schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmiObligation {
    pub id: ObligationId,
    pub customer_id: CustomerId,
    /// 1-based, unique per customer
    pub emi_number: u32,
    pub total_emi_count: u32,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub paid_amount: Money,
    pub remaining_amount: Money,
    pub payment_status: PaymentStatus,
}

impl EmiObligation {
    pub fn new(
        customer_id: CustomerId,
        emi_number: u32,
        total_emi_count: u32,
        amount: Money,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            emi_number,
            total_emi_count,
            amount,
            due_date,
            paid_amount: Money::ZERO,
            remaining_amount: amount,
            payment_status: PaymentStatus::Due,
        }
    }
}

/// rent owed for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentObligation {
    pub id: ObligationId,
    pub customer_id: CustomerId,
    /// first day of the month, unique per customer
    pub rent_month: NaiveDate,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub paid_amount: Money,
    pub remaining_amount: Money,
    pub payment_status: PaymentStatus,
}

impl RentObligation {
    pub fn new(customer_id: CustomerId, rent_month: NaiveDate, amount: Money, due_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            rent_month,
            amount,
            due_date,
            paid_amount: Money::ZERO,
            remaining_amount: amount,
            payment_status: PaymentStatus::Due,
        }
    }
}

/// amount/status bookkeeping shared by EMI and rent rows
pub trait Obligation {
    fn id(&self) -> ObligationId;
    fn kind(&self) -> ObligationKind;
    fn due_date(&self) -> NaiveDate;
    fn amount(&self) -> Money;
    fn paid_amount(&self) -> Money;
    fn remaining_amount(&self) -> Money;
    fn payment_status(&self) -> PaymentStatus;

    #[doc(hidden)]
    fn balances_mut(&mut self) -> (&mut Money, &mut Money, &mut PaymentStatus);

    fn is_outstanding(&self) -> bool {
        self.payment_status().is_outstanding()
    }

    /// apply part of a payment; the new status is derived from what remains
    fn apply_payment(&mut self, applied: Money) -> Result<PaymentStatus> {
        let id = self.id();
        if !applied.is_positive() {
            return Err(BillingError::InvalidAmount { amount: applied });
        }
        if applied > self.remaining_amount() {
            return Err(BillingError::InvalidAmount { amount: applied });
        }

        let (paid, remaining, status) = self.balances_mut();
        *paid += applied;
        *remaining -= applied;
        *status = if remaining.is_zero() {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Partial
        };
        let new_status = *status;

        tracing::trace!(obligation_id = %id, %applied, status = %new_status, "payment applied");
        Ok(new_status)
    }

    /// due/partial -> overdue once the due date has passed; amounts untouched
    fn mark_overdue_if_elapsed(&mut self, today: NaiveDate) -> bool {
        if self.payment_status().can_become_overdue() && self.due_date() < today {
            let (_, _, status) = self.balances_mut();
            *status = PaymentStatus::Overdue;
            return true;
        }
        false
    }

    /// `paid + remaining == amount` and `remaining == 0 <=> paid`
    fn check_invariants(&self) -> bool {
        self.paid_amount() + self.remaining_amount() == self.amount()
            && !self.remaining_amount().is_negative()
            && (self.remaining_amount().is_zero() == (self.payment_status() == PaymentStatus::Paid))
    }
}

macro_rules! impl_obligation {
    ($ty:ty, $kind:expr) => {
        impl Obligation for $ty {
            fn id(&self) -> ObligationId {
                self.id
            }
            fn kind(&self) -> ObligationKind {
                $kind
            }
            fn due_date(&self) -> NaiveDate {
                self.due_date
            }
            fn amount(&self) -> Money {
                self.amount
            }
            fn paid_amount(&self) -> Money {
                self.paid_amount
            }
            fn remaining_amount(&self) -> Money {
                self.remaining_amount
            }
            fn payment_status(&self) -> PaymentStatus {
                self.payment_status
            }
            fn balances_mut(&mut self) -> (&mut Money, &mut Money, &mut PaymentStatus) {
                (&mut self.paid_amount, &mut self.remaining_amount, &mut self.payment_status)
            }
        }
    };
}

impl_obligation!(EmiObligation, ObligationKind::Emi);
impl_obligation!(RentObligation, ObligationKind::Rent);

/// earliest due date among unpaid obligations
pub fn next_due_date(emis: &[EmiObligation], rents: &[RentObligation]) -> Option<NaiveDate> {
    let emi_dates = emis.iter().filter(|o| o.is_outstanding()).map(|o| o.due_date);
    let rent_dates = rents.iter().filter(|o| o.is_outstanding()).map(|o| o.due_date);
    emi_dates.chain(rent_dates).min()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn emi(amount: i64, due: NaiveDate) -> EmiObligation {
        EmiObligation::new(Uuid::new_v4(), 1, 10, Money::from_major(amount), due)
    }

    #[test]
    fn test_partial_then_full_payment() {
        let mut o = emi(5_000, date(2024, 2, 10));

        assert_eq!(o.apply_payment(Money::from_major(2_000)).unwrap(), PaymentStatus::Partial);
        assert_eq!(o.remaining_amount, Money::from_major(3_000));
        assert!(o.check_invariants());

        assert_eq!(o.apply_payment(Money::from_major(3_000)).unwrap(), PaymentStatus::Paid);
        assert!(o.remaining_amount.is_zero());
        assert!(o.check_invariants());
    }

    #[test]
    fn test_rejects_overapplication() {
        let mut o = emi(5_000, date(2024, 2, 10));
        assert!(o.apply_payment(Money::from_major(5_001)).is_err());
        assert!(o.apply_payment(Money::ZERO).is_err());
        assert_eq!(o.paid_amount, Money::ZERO);
    }

    #[test]
    fn test_overdue_transition_only_after_due_date() {
        let mut o = emi(5_000, date(2024, 2, 10));

        assert!(!o.mark_overdue_if_elapsed(date(2024, 2, 10)));
        assert_eq!(o.payment_status, PaymentStatus::Due);

        assert!(o.mark_overdue_if_elapsed(date(2024, 2, 11)));
        assert_eq!(o.payment_status, PaymentStatus::Overdue);
        // second pass is a no-op
        assert!(!o.mark_overdue_if_elapsed(date(2024, 2, 11)));
        assert_eq!(o.remaining_amount, Money::from_major(5_000));
    }

    #[test]
    fn test_paying_overdue_moves_it_out_of_overdue() {
        let mut o = emi(5_000, date(2024, 2, 10));
        o.mark_overdue_if_elapsed(date(2024, 3, 1));

        assert_eq!(o.apply_payment(Money::from_major(1_000)).unwrap(), PaymentStatus::Partial);
        assert!(o.check_invariants());
    }

    #[test]
    fn test_next_due_date_skips_paid() {
        let mut first = emi(100, date(2024, 2, 10));
        let second = emi(100, date(2024, 3, 10));
        let rent = RentObligation::new(Uuid::new_v4(), date(2024, 3, 1), Money::from_major(50), date(2024, 3, 1));

        first.apply_payment(Money::from_major(100)).unwrap();
        let emis = vec![first, second];
        assert_eq!(next_due_date(&emis, std::slice::from_ref(&rent)), Some(date(2024, 3, 1)));
        assert_eq!(next_due_date(&emis[..1], &[]), None);
    }
}
