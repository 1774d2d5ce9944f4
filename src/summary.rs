//! read-side view of a customer's billing state
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::customer::PaymentPlan;
use crate::decimal::{whole_percentage, Money};
use crate::obligations::{EmiObligation, RentObligation};
use crate::records::{CreditBalance, LedgerEntry, Transaction};
use crate::store::CustomerBook;
use crate::types::{CustomerId, PaymentStatus, PaymentType};

/// how far through the EMI schedule the customer is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmiProgress {
    pub paid: u32,
    pub total: u32,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingDetails {
    pub customer_id: CustomerId,
    pub payment_type: PaymentType,
    pub total_paid: Money,
    pub total_due: Money,
    pub credits: CreditBalance,
    pub next_due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emi_progress: Option<EmiProgress>,
    pub emis: Vec<EmiObligation>,
    pub rents: Vec<RentObligation>,
    /// most recent first
    pub transactions: Vec<Transaction>,
    /// most recent first
    pub ledger: Vec<LedgerEntry>,
}

impl BillingDetails {
    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// aggregates a customer book into [`BillingDetails`]
#[derive(Debug, Clone, Copy, Default)]
pub struct BillingSummaryReader;

impl BillingSummaryReader {
    pub fn new() -> Self {
        Self
    }

    pub fn details(&self, book: &CustomerBook) -> BillingDetails {
        let customer = &book.customer;
        let payment_type = customer.payment_type();

        let (emis, rents) = match payment_type {
            PaymentType::OneTimePurchase => (Vec::new(), Vec::new()),
            _ => (book.emis.clone(), book.rents.clone()),
        };

        let purchase_paid = match customer.plan {
            PaymentPlan::OneTimePurchase { purchase_amount } => purchase_amount,
            _ => Money::ZERO,
        };
        let total_paid = emis.iter().map(|e| e.paid_amount).sum::<Money>()
            + rents.iter().map(|r| r.paid_amount).sum::<Money>()
            + purchase_paid;

        let total_due = emis
            .iter()
            .filter(|e| e.payment_status != PaymentStatus::Paid)
            .map(|e| e.remaining_amount)
            .sum::<Money>()
            + rents
                .iter()
                .filter(|r| r.payment_status != PaymentStatus::Paid)
                .map(|r| r.remaining_amount)
                .sum::<Money>();

        let emi_progress = match customer.plan {
            PaymentPlan::Emi { emi_count, .. } => {
                let paid = emis
                    .iter()
                    .filter(|e| e.payment_status == PaymentStatus::Paid)
                    .count() as u32;
                Some(EmiProgress {
                    paid,
                    total: emi_count,
                    percentage: whole_percentage(paid, emi_count),
                })
            }
            _ => None,
        };

        BillingDetails {
            customer_id: customer.id,
            payment_type,
            total_paid,
            total_due,
            credits: book.credit,
            next_due_date: customer.next_due_date,
            emi_progress,
            emis,
            rents,
            transactions: most_recent_first(&book.transactions, |t| t.transaction_date),
            ledger: most_recent_first(&book.ledger, |l| l.payment_date),
        }
    }
}

/// newest date first; rows on the same date keep latest-written first
fn most_recent_first<T: Clone>(rows: &[T], date: impl Fn(&T) -> NaiveDate) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().rev().cloned().collect();
    out.sort_by(|a, b| date(b).cmp(&date(a)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::NewCustomer;
    use crate::obligations::Obligation;
    use crate::schedule::EmiScheduler;
    use crate::types::TransactionType;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_emi_progress_and_totals() {
        let plan = PaymentPlan::emi(Money::from_major(60_000), Money::from_major(10_000), 10, date(2024, 1, 10))
            .unwrap();
        let customer = NewCustomer {
            name: "Farah".to_string(),
            partner_id: None,
            plan,
            join_date: date(2024, 1, 10),
        }
        .into_customer()
        .unwrap();
        let mut book = CustomerBook::new(customer);
        book.emis = EmiScheduler::new(Money::from_major(60_000), Money::from_major(10_000), 10, date(2024, 1, 10))
            .generate(book.customer.id)
            .unwrap();
        book.emis[0].apply_payment(Money::from_major(5_000)).unwrap();
        book.emis[1].apply_payment(Money::from_major(5_000)).unwrap();
        book.emis[2].apply_payment(Money::from_major(1_000)).unwrap();

        let details = BillingSummaryReader::new().details(&book);

        assert_eq!(details.total_paid, Money::from_major(11_000));
        assert_eq!(details.total_due, Money::from_major(39_000));
        assert_eq!(details.emi_progress, Some(EmiProgress { paid: 2, total: 10, percentage: 20 }));
        assert_eq!(details.emis.len(), 10);
    }

    #[test]
    fn test_transactions_most_recent_first() {
        let customer = NewCustomer {
            name: "Joseph".to_string(),
            partner_id: None,
            plan: PaymentPlan::monthly_rent(Money::from_major(2_000), Money::ZERO).unwrap(),
            join_date: date(2024, 1, 1),
        }
        .into_customer()
        .unwrap();
        let id = customer.id;
        let mut book = CustomerBook::new(customer);
        let t = |d: NaiveDate, remarks: &str| {
            Transaction::new(id, TransactionType::Rent, Money::from_major(2_000), d, PaymentStatus::Paid, remarks)
        };
        book.transactions = vec![
            t(date(2024, 1, 3), "jan"),
            t(date(2024, 3, 2), "mar-a"),
            t(date(2024, 2, 4), "feb"),
            t(date(2024, 3, 2), "mar-b"),
        ];

        let details = BillingSummaryReader::new().details(&book);
        let order: Vec<&str> = details.transactions.iter().map(|t| t.remarks.as_str()).collect();

        assert_eq!(order, vec!["mar-b", "mar-a", "feb", "jan"]);
        assert!(details.emi_progress.is_none());
    }

    #[test]
    fn test_json_omits_progress_for_rent() {
        let customer = NewCustomer {
            name: "Lata".to_string(),
            partner_id: None,
            plan: PaymentPlan::monthly_rent(Money::from_major(2_000), Money::ZERO).unwrap(),
            join_date: date(2024, 1, 1),
        }
        .into_customer()
        .unwrap();
        let details = BillingSummaryReader::new().details(&CustomerBook::new(customer));

        let json = details.to_json_pretty().unwrap();
        assert!(json.contains("\"totalDue\""));
        assert!(!json.contains("emiProgress"));
    }
}
