use chrono::{Datelike, NaiveDate};

use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::obligations::RentObligation;
use crate::types::CustomerId;

use super::{add_months, first_of_month};

/// monthly rent schedule for one rented battery
#[derive(Debug, Clone, PartialEq)]
pub struct RentScheduler {
    pub monthly_rent: Money,
    /// day of the rent month the rent falls due
    pub due_day: u32,
}

impl RentScheduler {
    pub fn new(monthly_rent: Money, due_day: u32) -> Result<Self> {
        if !monthly_rent.is_positive() {
            return Err(BillingError::invalid_plan(format!(
                "monthly_rent must be positive, got {}",
                monthly_rent
            )));
        }
        Ok(Self { monthly_rent, due_day })
    }

    /// obligation for the month starting at `rent_month`
    pub fn obligation_for(&self, customer_id: CustomerId, rent_month: NaiveDate) -> Result<RentObligation> {
        let rent_month = first_of_month(rent_month);
        let due_date = rent_month.with_day(self.due_day).ok_or_else(|| {
            BillingError::invalid_plan(format!("rent due day {} not in {}", self.due_day, rent_month))
        })?;
        Ok(RentObligation::new(customer_id, rent_month, self.monthly_rent, due_date))
    }

    /// first calendar month at or after `start` with no rent row yet
    pub fn next_uncovered_month(existing: &[RentObligation], start: NaiveDate) -> Result<NaiveDate> {
        let mut month = first_of_month(start);
        while existing.iter().any(|r| r.rent_month == month) {
            month = add_months(month, 1)?;
        }
        Ok(month)
    }

    /// every missing month after the latest covered one, up to and including the month of `today`
    ///
    /// with no rows yet coverage starts from the month of `start`
    pub fn catch_up(
        &self,
        customer_id: CustomerId,
        existing: &[RentObligation],
        start: NaiveDate,
        today: NaiveDate,
    ) -> Result<Vec<RentObligation>> {
        let target = first_of_month(today);
        let mut month = match existing.iter().map(|r| r.rent_month).max() {
            Some(latest) => add_months(latest, 1)?,
            None => first_of_month(start),
        };

        let mut rows = Vec::new();
        while month <= target {
            rows.push(self.obligation_for(customer_id, month)?);
            month = add_months(month, 1)?;
        }
        Ok(rows)
    }
}
