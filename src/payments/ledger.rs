use uuid::Uuid;

use crate::customer::PaymentPlan;
use crate::errors::{BillingError, Result};
use crate::obligations::{next_due_date, Obligation};
use crate::records::{LedgerEntry, Transaction};
use crate::store::{CustomerBook, PaymentChangeSet};
use crate::types::{DistributionMode, ObligationKind, PaymentStatus, TransactionType};

use super::{DistributionPlan, PaymentRequest};

/// turns a distribution plan into the atomic change set the store commits
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerWriter;

impl LedgerWriter {
    pub fn new() -> Self {
        Self
    }

    /// build every write for `plan`: updated obligations, one transaction, one ledger
    /// entry, the new credit balance and the recomputed next due date
    pub fn apply(
        &self,
        book: &CustomerBook,
        plan: &DistributionPlan,
        request: &PaymentRequest,
    ) -> Result<PaymentChangeSet> {
        let customer_id = book.customer.id;
        if plan.customer_id != customer_id {
            return Err(BillingError::CustomerNotFound {
                customer_id: plan.customer_id,
            });
        }
        if !plan.is_fully_accounted() {
            return Err(BillingError::InvalidAmount { amount: plan.amount });
        }
        if plan.based_on_version != book.version {
            return Err(BillingError::ConcurrentModification {
                customer_id,
                expected: plan.based_on_version,
                found: book.version,
            });
        }

        let mut emis = book.emis.clone();
        let mut rents = book.rents.clone();
        let mut touched_emis = Vec::new();
        let mut touched_rents = Vec::new();

        for allocation in &plan.allocations {
            let not_found = BillingError::ObligationNotFound {
                obligation_id: allocation.obligation_id,
            };
            let status = match allocation.kind {
                ObligationKind::Emi => {
                    let row = emis
                        .iter_mut()
                        .find(|e| e.id == allocation.obligation_id)
                        .ok_or(not_found)?;
                    let status = row.apply_payment(allocation.applied_amount)?;
                    touched_emis.push(row.clone());
                    status
                }
                ObligationKind::Rent => {
                    let row = rents
                        .iter_mut()
                        .find(|r| r.id == allocation.obligation_id)
                        .ok_or(not_found)?;
                    let status = row.apply_payment(allocation.applied_amount)?;
                    touched_rents.push(row.clone());
                    status
                }
            };
            debug_assert_eq!(status, allocation.new_status);
        }

        let transaction_type = transaction_type_for(book, plan);
        let payment_status = plan
            .allocations
            .last()
            .filter(|_| plan.excess_amount.is_zero())
            .map(|a| a.new_status)
            .unwrap_or(PaymentStatus::Paid);

        let credit = book.credit.credited(plan.excess_amount);

        let transaction = Transaction::new(
            customer_id,
            transaction_type,
            plan.total_processed,
            request.payment_date,
            payment_status,
            request.remarks.clone(),
        );

        let ledger_entry = LedgerEntry {
            id: Uuid::new_v4(),
            customer_id,
            payment_date: request.payment_date,
            payment_type: transaction_type,
            payment_mode: request.payment_mode,
            amount_paid: plan.total_processed,
            running_balance: credit.credit_balance,
            reference_number: request.reference_number.clone(),
            remarks: Some(request.remarks.clone()).filter(|r| !r.is_empty()),
        };

        Ok(PaymentChangeSet {
            customer_id,
            expected_version: plan.based_on_version,
            next_due_date: next_due_date(&emis, &rents),
            emis: touched_emis,
            rents: touched_rents,
            transaction,
            ledger_entry,
            credit,
        })
    }
}

/// emi/rent per mode; for `auto` the kind that received more money (EMI on ties);
/// with nothing applied, the customer's plan decides
fn transaction_type_for(book: &CustomerBook, plan: &DistributionPlan) -> TransactionType {
    match plan.mode {
        DistributionMode::Emi => TransactionType::Emi,
        DistributionMode::Rent => TransactionType::Rent,
        DistributionMode::Auto if plan.allocations.is_empty() => match book.customer.plan {
            PaymentPlan::Emi { .. } => TransactionType::Emi,
            PaymentPlan::MonthlyRent { .. } => TransactionType::Rent,
            PaymentPlan::OneTimePurchase { .. } => TransactionType::Purchase,
        },
        DistributionMode::Auto => {
            if plan.applied_to(ObligationKind::Rent) > plan.applied_to(ObligationKind::Emi) {
                TransactionType::Rent
            } else {
                TransactionType::Emi
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::NewCustomer;
    use crate::decimal::Money;
    use crate::obligations::{EmiObligation, RentObligation};
    use crate::payments::PaymentDistributor;
    use crate::types::PaymentMode;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn mixed_book() -> CustomerBook {
        let customer = NewCustomer {
            name: "Sunil".to_string(),
            partner_id: None,
            plan: PaymentPlan::emi(Money::from_major(12_000), Money::from_major(2_000), 2, date(2024, 1, 1))
                .unwrap(),
            join_date: date(2024, 1, 1),
        }
        .into_customer()
        .unwrap();
        let id = customer.id;
        let mut book = CustomerBook::new(customer);
        book.emis = vec![
            EmiObligation::new(id, 1, 2, Money::from_major(5_000), date(2024, 2, 1)),
            EmiObligation::new(id, 2, 2, Money::from_major(5_000), date(2024, 3, 1)),
        ];
        book.rents = vec![RentObligation::new(id, date(2024, 2, 1), Money::from_major(800), date(2024, 2, 5))];
        book.credit.credit_balance = Money::from_major(100);
        book.version = 3;
        book
    }

    fn request(book: &CustomerBook, amount: i64, mode: DistributionMode) -> PaymentRequest {
        PaymentRequest::new(book.customer.id, Money::from_major(amount), mode, PaymentMode::Upi, date(2024, 2, 6))
            .with_reference("UTR-99")
    }

    #[test]
    fn test_partial_payment_change_set() {
        let book = mixed_book();
        let req = request(&book, 5_500, DistributionMode::Auto);
        let plan = PaymentDistributor::new().plan(&book, req.amount, req.mode).unwrap();

        let changes = LedgerWriter::new().apply(&book, &plan, &req).unwrap();

        assert_eq!(changes.expected_version, 3);
        assert_eq!(changes.emis.len(), 1);
        assert_eq!(changes.emis[0].payment_status, PaymentStatus::Paid);
        assert_eq!(changes.rents.len(), 1);
        assert_eq!(changes.rents[0].paid_amount, Money::from_major(500));
        assert_eq!(changes.rents[0].payment_status, PaymentStatus::Partial);

        assert_eq!(changes.transaction.transaction_type, TransactionType::Emi);
        assert_eq!(changes.transaction.payment_status, PaymentStatus::Partial);
        assert_eq!(changes.transaction.amount, Money::from_major(5_500));

        assert_eq!(changes.ledger_entry.amount_paid, Money::from_major(5_500));
        assert_eq!(changes.ledger_entry.running_balance, Money::from_major(100));
        assert_eq!(changes.ledger_entry.reference_number.as_deref(), Some("UTR-99"));
        assert_eq!(changes.ledger_entry.remarks, None);

        // rent for Feb still open, due 2024-02-05
        assert_eq!(changes.next_due_date, Some(date(2024, 2, 5)));
    }

    #[test]
    fn test_overpayment_credits_excess() {
        let book = mixed_book();
        let req = request(&book, 11_000, DistributionMode::Auto);
        let plan = PaymentDistributor::new().plan(&book, req.amount, req.mode).unwrap();

        let changes = LedgerWriter::new().apply(&book, &plan, &req).unwrap();

        assert_eq!(changes.credit.credit_balance, Money::from_major(300));
        assert_eq!(changes.ledger_entry.running_balance, Money::from_major(300));
        assert_eq!(changes.transaction.payment_status, PaymentStatus::Paid);
        assert_eq!(changes.next_due_date, None);
        assert!(changes.emis.iter().all(|e| e.check_invariants()));
    }

    #[test]
    fn test_rent_dominant_auto_payment() {
        let mut book = mixed_book();
        book.emis[0].apply_payment(Money::from_major(4_900)).unwrap();
        let req = request(&book, 700, DistributionMode::Auto);
        let plan = PaymentDistributor::new().plan(&book, req.amount, req.mode).unwrap();

        let changes = LedgerWriter::new().apply(&book, &plan, &req).unwrap();
        // 100 to EMI #1, 600 to the rent
        assert_eq!(changes.transaction.transaction_type, TransactionType::Rent);
    }

    #[test]
    fn test_stale_plan_is_rejected() {
        let mut book = mixed_book();
        let req = request(&book, 1_000, DistributionMode::Emi);
        let plan = PaymentDistributor::new().plan(&book, req.amount, req.mode).unwrap();
        book.version += 1;

        let err = LedgerWriter::new().apply(&book, &plan, &req).unwrap_err();
        assert!(matches!(err, BillingError::ConcurrentModification { expected: 3, found: 4, .. }));
    }

    #[test]
    fn test_unbalanced_plan_is_rejected() {
        let book = mixed_book();
        let req = request(&book, 5_500, DistributionMode::Auto);
        let mut plan = PaymentDistributor::new().plan(&book, req.amount, req.mode).unwrap();
        plan.excess_amount = Money::from_major(1_000_000);

        let err = LedgerWriter::new().apply(&book, &plan, &req).unwrap_err();
        assert_eq!(err, BillingError::InvalidAmount { amount: Money::from_major(5_500) });
    }

    #[test]
    fn test_unknown_obligation() {
        let book = mixed_book();
        let req = request(&book, 1_000, DistributionMode::Emi);
        let mut plan = PaymentDistributor::new().plan(&book, req.amount, req.mode).unwrap();
        plan.allocations[0].obligation_id = Uuid::new_v4();

        let err = LedgerWriter::new().apply(&book, &plan, &req).unwrap_err();
        assert!(matches!(err, BillingError::ObligationNotFound { .. }));
    }
}
