use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::types::{CustomerId, PartnerId, PaymentType};

/// billing plan; exactly one parameter group exists per customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "payment_type", rename_all = "snake_case")]
pub enum PaymentPlan {
    Emi {
        total_amount: Money,
        down_payment: Money,
        emi_count: u32,
        /// regular installment; the final one may differ by the rounding remainder
        emi_amount: Money,
        emi_start_date: NaiveDate,
    },
    MonthlyRent {
        monthly_rent: Money,
        security_deposit: Money,
    },
    OneTimePurchase {
        purchase_amount: Money,
    },
}

impl PaymentPlan {
    /// EMI plan with the installment derived from the loan amount
    pub fn emi(
        total_amount: Money,
        down_payment: Money,
        emi_count: u32,
        emi_start_date: NaiveDate,
    ) -> Result<Self> {
        let installments = validate_emi_terms(total_amount, down_payment, emi_count)?;
        Ok(PaymentPlan::Emi {
            total_amount,
            down_payment,
            emi_count,
            emi_amount: installments[0],
            emi_start_date,
        })
    }

    pub fn monthly_rent(monthly_rent: Money, security_deposit: Money) -> Result<Self> {
        let plan = PaymentPlan::MonthlyRent {
            monthly_rent,
            security_deposit,
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn one_time_purchase(purchase_amount: Money) -> Result<Self> {
        let plan = PaymentPlan::OneTimePurchase { purchase_amount };
        plan.validate()?;
        Ok(plan)
    }

    pub fn payment_type(&self) -> PaymentType {
        match self {
            PaymentPlan::Emi { .. } => PaymentType::Emi,
            PaymentPlan::MonthlyRent { .. } => PaymentType::MonthlyRent,
            PaymentPlan::OneTimePurchase { .. } => PaymentType::OneTimePurchase,
        }
    }

    /// check the parameters of whichever group is populated
    pub fn validate(&self) -> Result<()> {
        match self {
            PaymentPlan::Emi {
                total_amount,
                down_payment,
                emi_count,
                ..
            } => validate_emi_terms(*total_amount, *down_payment, *emi_count).map(|_| ()),
            PaymentPlan::MonthlyRent {
                monthly_rent,
                security_deposit,
            } => {
                if !monthly_rent.is_positive() {
                    return Err(BillingError::invalid_plan(format!(
                        "monthly_rent must be positive, got {}",
                        monthly_rent
                    )));
                }
                if security_deposit.is_negative() {
                    return Err(BillingError::invalid_plan(format!(
                        "security_deposit cannot be negative, got {}",
                        security_deposit
                    )));
                }
                Ok(())
            }
            PaymentPlan::OneTimePurchase { purchase_amount } => {
                if !purchase_amount.is_positive() {
                    return Err(BillingError::invalid_plan(format!(
                        "purchase_amount must be positive, got {}",
                        purchase_amount
                    )));
                }
                Ok(())
            }
        }
    }
}

/// longest EMI schedule accepted (50 years of monthly installments)
pub const MAX_EMI_COUNT: u32 = 600;

/// validate EMI terms and return the installment split of the loan amount
pub(crate) fn validate_emi_terms(
    total_amount: Money,
    down_payment: Money,
    emi_count: u32,
) -> Result<Vec<Money>> {
    if emi_count < 1 {
        return Err(BillingError::invalid_plan("emi_count must be at least 1"));
    }
    if emi_count > MAX_EMI_COUNT {
        return Err(BillingError::invalid_plan(format!(
            "emi_count {} exceeds the maximum of {}",
            emi_count, MAX_EMI_COUNT
        )));
    }
    if !down_payment.is_positive() {
        return Err(BillingError::invalid_plan(format!(
            "down_payment must be positive, got {}",
            down_payment
        )));
    }
    if down_payment >= total_amount {
        return Err(BillingError::invalid_plan(format!(
            "down_payment {} must be below total_amount {}",
            down_payment, total_amount
        )));
    }

    let loan_amount = total_amount - down_payment;
    loan_amount.split_installments(emi_count).ok_or_else(|| {
        BillingError::invalid_plan(format!(
            "loan amount {} cannot be split into {} installments",
            loan_amount, emi_count
        ))
    })
}

/// leasing customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub partner_id: Option<PartnerId>,
    #[serde(flatten)]
    pub plan: PaymentPlan,
    pub next_due_date: Option<NaiveDate>,
    pub join_date: NaiveDate,
    pub active: bool,
}

impl Customer {
    pub fn payment_type(&self) -> PaymentType {
        self.plan.payment_type()
    }
}

/// onboarding payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub partner_id: Option<PartnerId>,
    #[serde(flatten)]
    pub plan: PaymentPlan,
    pub join_date: NaiveDate,
}

impl NewCustomer {
    pub fn into_customer(self) -> Result<Customer> {
        self.plan.validate()?;
        Ok(Customer {
            id: Uuid::new_v4(),
            name: self.name,
            partner_id: self.partner_id,
            plan: self.plan,
            next_due_date: None,
            join_date: self.join_date,
            active: true,
        })
    }
}

/// identity supplied by the (external) auth layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Caller {
    Admin,
    Partner { partner_id: PartnerId },
}

impl Caller {
    pub fn can_access(&self, customer: &Customer) -> bool {
        match self {
            Caller::Admin => true,
            Caller::Partner { partner_id } => customer.partner_id == Some(*partner_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_emi_plan_derives_installment() {
        let plan = PaymentPlan::emi(
            Money::from_major(60_000),
            Money::from_major(10_000),
            10,
            date(2024, 1, 10),
        )
        .unwrap();

        match plan {
            PaymentPlan::Emi { emi_amount, .. } => assert_eq!(emi_amount, Money::from_major(5_000)),
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_emi_plan_rejects_bad_terms() {
        let start = date(2024, 1, 1);
        let err = PaymentPlan::emi(Money::from_major(1_000), Money::from_major(1_000), 5, start)
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidPlanParameters { .. }));

        assert!(PaymentPlan::emi(Money::from_major(1_000), Money::ZERO, 5, start).is_err());
        assert!(PaymentPlan::emi(Money::from_major(1_000), Money::from_major(100), 0, start).is_err());
    }

    #[test]
    fn test_emi_count_is_bounded() {
        let start = date(2024, 1, 1);
        let loan = Money::from_major(10_000_000);

        assert!(PaymentPlan::emi(loan, Money::from_major(1_000), MAX_EMI_COUNT, start).is_ok());
        let err = PaymentPlan::emi(loan, Money::from_major(1_000), 1_000_000_000, start).unwrap_err();
        assert!(matches!(err, BillingError::InvalidPlanParameters { .. }));
    }

    #[test]
    fn test_plan_is_tagged_by_payment_type() {
        let plan = PaymentPlan::monthly_rent(Money::from_major(3_000), Money::from_major(5_000)).unwrap();
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["payment_type"], "monthly_rent");
        assert!(json.get("emi_count").is_none());

        let back: PaymentPlan = serde_json::from_value(json).unwrap();
        assert_eq!(back.payment_type(), PaymentType::MonthlyRent);
    }

    #[test]
    fn test_partner_scope() {
        let partner = Uuid::new_v4();
        let customer = NewCustomer {
            name: "Ravi".to_string(),
            partner_id: Some(partner),
            plan: PaymentPlan::one_time_purchase(Money::from_major(45_000)).unwrap(),
            join_date: date(2024, 2, 1),
        }
        .into_customer()
        .unwrap();

        assert!(Caller::Admin.can_access(&customer));
        assert!(Caller::Partner { partner_id: partner }.can_access(&customer));
        assert!(!Caller::Partner { partner_id: Uuid::new_v4() }.can_access(&customer));
    }
}
