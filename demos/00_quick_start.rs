/// quick start - onboard an EMI customer and take a payment
use lease_billing_rs::chrono::NaiveDate;
use lease_billing_rs::{
    BillingConfig, BillingEngine, Caller, DistributionMode, MemoryStore, Money, NewCustomer,
    PaymentMode, PaymentPlan, PaymentRequest, SafeTimeProvider, TimeSource,
};
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let engine = BillingEngine::new(
        Arc::new(MemoryStore::new()),
        SafeTimeProvider::new(TimeSource::System),
        BillingConfig::standard(),
    )?;

    let start = NaiveDate::from_ymd_opt(2024, 1, 10).ok_or("bad date")?;

    // 60,000 battery, 10,000 down, 10 monthly installments
    let customer = engine
        .onboard_customer(NewCustomer {
            name: "Ramesh Iyer".to_string(),
            partner_id: None,
            plan: PaymentPlan::emi(Money::from_major(60_000), Money::from_major(10_000), 10, start)?,
            join_date: start,
        })
        .await?;

    // see where 12,000 would go before taking it
    let plan = engine
        .preview(&Caller::Admin, customer.id, Money::from_major(12_000), DistributionMode::Emi)
        .await?;
    for allocation in &plan.allocations {
        println!(
            "{} due {}: {} -> {}",
            allocation.obligation_id, allocation.due_date, allocation.applied_amount, allocation.new_status
        );
    }

    let request = PaymentRequest::new(
        customer.id,
        Money::from_major(12_000),
        DistributionMode::Emi,
        PaymentMode::Upi,
        NaiveDate::from_ymd_opt(2024, 3, 15).ok_or("bad date")?,
    )
    .with_reference("UPI-20240315-001");
    let outcome = engine.commit_plan(&Caller::Admin, plan, request).await?;

    println!("{}", outcome.details.to_json_pretty()?);

    Ok(())
}
