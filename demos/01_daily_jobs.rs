/// daily jobs - the host fires `run_daily_jobs` once a day; here a test clock stands in
use lease_billing_rs::chrono::{Duration, NaiveDate, TimeZone, Utc};
use lease_billing_rs::{
    BillingConfig, BillingEngine, Caller, MemoryStore, Money, NewCustomer, PaymentPlan,
    SafeTimeProvider, TimeSource,
};
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let start = Utc
        .with_ymd_and_hms(2024, 1, 1, 6, 0, 0)
        .single()
        .ok_or("bad start time")?;
    let time = SafeTimeProvider::new(TimeSource::Test(start));

    // rent falls due on the 5th
    let config = BillingConfig::from_json(r#"{ "rent_due_day": 5 }"#)?;
    let engine = BillingEngine::new(Arc::new(MemoryStore::new()), time.clone(), config)?;

    let customer = engine
        .onboard_customer(NewCustomer {
            name: "Sita Devi".to_string(),
            partner_id: None,
            plan: PaymentPlan::monthly_rent(Money::from_major(3_000), Money::from_major(5_000))?,
            join_date: NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("bad date")?,
        })
        .await?;

    let control = time.test_control().ok_or("test clock required")?;
    for _ in 0..4 {
        control.advance(Duration::days(30));
        let report = engine.run_daily_jobs().await?;
        println!(
            "{:?}: {} rent(s) created, {} obligation(s) now overdue",
            report.run_date, report.rents_created, report.overdue.obligations_marked
        );
    }

    let details = engine.billing_details(&Caller::Admin, customer.id).await?;
    println!("due {} next on {:?}", details.total_due, details.next_due_date);

    Ok(())
}
