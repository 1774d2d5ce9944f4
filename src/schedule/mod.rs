pub mod emi;
pub mod rent;

use chrono::{Datelike, Months, NaiveDate};

use crate::errors::{BillingError, Result};

pub use emi::EmiScheduler;
pub use rent::RentScheduler;

/// add calendar months, clamping to the last day of shorter months (Jan 31 + 1 = Feb 29)
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| BillingError::invalid_plan(format!("date overflow: {} + {} months", date, months)))
}

/// first day of the month containing `date`
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    // day 1 exists in every month
    date.with_day(1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_add_months_keeps_day() {
        assert_eq!(add_months(date(2024, 1, 10), 1).unwrap(), date(2024, 2, 10));
        assert_eq!(add_months(date(2024, 1, 10), 10).unwrap(), date(2024, 11, 10));
        assert_eq!(add_months(date(2024, 11, 10), 3).unwrap(), date(2025, 2, 10));
    }

    #[test]
    fn test_add_months_clamps_month_end() {
        assert_eq!(add_months(date(2024, 1, 31), 1).unwrap(), date(2024, 2, 29));
        assert_eq!(add_months(date(2023, 1, 31), 1).unwrap(), date(2023, 2, 28));
        assert_eq!(add_months(date(2024, 1, 31), 2).unwrap(), date(2024, 3, 31));
    }

    #[test]
    fn test_first_of_month() {
        assert_eq!(first_of_month(date(2024, 7, 19)), date(2024, 7, 1));
        assert_eq!(first_of_month(date(2024, 7, 1)), date(2024, 7, 1));
    }
}
