use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::BillingConfig;
use crate::customer::{Caller, Customer, NewCustomer, PaymentPlan};
use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::obligations::{next_due_date, EmiObligation, RentObligation};
use crate::overdue::{OverdueMonitor, ReconcileReport};
use crate::payments::{DistributionPlan, LedgerWriter, PaymentDistributor, PaymentRequest};
use crate::records::{LedgerEntry, Transaction};
use crate::schedule::{EmiScheduler, RentScheduler};
use crate::store::{BillingStore, CustomerBook};
use crate::summary::{BillingDetails, BillingSummaryReader};
use crate::types::{CustomerId, DistributionMode, PaymentStatus, PaymentType, TransactionType};

/// result of a committed payment, with the customer's refreshed billing view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub plan: DistributionPlan,
    pub transaction: Transaction,
    pub ledger_entry: LedgerEntry,
    pub details: BillingDetails,
}

/// what one run of the periodic job did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DailyRunReport {
    pub run_date: Option<NaiveDate>,
    pub rents_created: usize,
    pub overdue: ReconcileReport,
}

/// billing engine: wires the record store, the clock and the pure billing components
pub struct BillingEngine<S: BillingStore> {
    store: Arc<S>,
    time: SafeTimeProvider,
    config: BillingConfig,
    distributor: PaymentDistributor,
    writer: LedgerWriter,
    monitor: OverdueMonitor,
    reader: BillingSummaryReader,
}

impl<S: BillingStore> Clone for BillingEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            time: self.time.clone(),
            config: self.config.clone(),
            distributor: self.distributor,
            writer: self.writer,
            monitor: self.monitor,
            reader: self.reader,
        }
    }
}

impl<S: BillingStore> BillingEngine<S> {
    pub fn new(store: Arc<S>, time: SafeTimeProvider, config: BillingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            time,
            config,
            distributor: PaymentDistributor::new(),
            writer: LedgerWriter::new(),
            monitor: OverdueMonitor::new(),
            reader: BillingSummaryReader::new(),
        })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    /// current date according to the injected clock
    pub fn today(&self) -> NaiveDate {
        self.time.now().date_naive()
    }

    /// persist a new customer and run the schedule its plan calls for
    #[instrument(skip_all, fields(name = %new_customer.name))]
    pub async fn onboard_customer(&self, new_customer: NewCustomer) -> Result<Customer> {
        let customer = new_customer.into_customer()?;
        let customer_id = customer.id;
        let plan = customer.plan.clone();
        let join_date = customer.join_date;

        self.call("insert_customer", self.store.insert_customer(customer)).await?;
        info!(%customer_id, payment_type = ?plan.payment_type(), "customer onboarded");

        match plan {
            PaymentPlan::Emi {
                total_amount,
                down_payment,
                emi_count,
                emi_start_date,
                ..
            } => {
                self.schedule_emi(customer_id, total_amount, down_payment, emi_count, emi_start_date)
                    .await?;
            }
            PaymentPlan::MonthlyRent { monthly_rent, .. } => {
                self.schedule_rent(customer_id, monthly_rent, join_date).await?;
            }
            PaymentPlan::OneTimePurchase { purchase_amount } => {
                if self.config.record_purchase_on_onboarding {
                    let transaction = Transaction::new(
                        customer_id,
                        TransactionType::Purchase,
                        purchase_amount,
                        join_date,
                        PaymentStatus::Paid,
                        "one-time purchase",
                    );
                    self.call("append_transaction", self.store.append_transaction(transaction))
                        .await?;
                    debug!(%customer_id, amount = %purchase_amount, "purchase recorded");
                }
            }
        }

        Ok(self.call("book", self.store.book(customer_id)).await?.customer)
    }

    /// write EMI installments 1..=emi_count; numbers already present are left alone
    ///
    /// returns only the rows this call inserted
    #[instrument(skip(self))]
    pub async fn schedule_emi(
        &self,
        customer_id: CustomerId,
        total_amount: Money,
        down_payment: Money,
        emi_count: u32,
        start_date: NaiveDate,
    ) -> Result<Vec<EmiObligation>> {
        let book = self.call("book", self.store.book(customer_id)).await?;
        ensure_plan(&book, PaymentType::Emi)?;

        let rows = EmiScheduler::new(total_amount, down_payment, emi_count, start_date)
            .generate(customer_id)
            .map_err(|e| {
                warn!(%customer_id, error = %e, "emi schedule rejected");
                e
            })?;

        let inserted = self
            .call("insert_emis", self.store.insert_emis(customer_id, rows))
            .await?;
        if inserted.is_empty() {
            debug!(%customer_id, "emi schedule already present");
        } else {
            info!(%customer_id, created = inserted.len(), "emi schedule written");
        }

        self.refresh_next_due_date(customer_id).await?;
        Ok(inserted)
    }

    /// create the rent for the first uncovered month at or after `start_date`
    #[instrument(skip(self))]
    pub async fn schedule_rent(
        &self,
        customer_id: CustomerId,
        monthly_rent: Money,
        start_date: NaiveDate,
    ) -> Result<Option<RentObligation>> {
        let scheduler = RentScheduler::new(monthly_rent, self.config.rent_due_day)?;
        let book = self.call("book", self.store.book(customer_id)).await?;
        ensure_plan(&book, PaymentType::MonthlyRent)?;

        let month = RentScheduler::next_uncovered_month(&book.rents, start_date)?;
        let row = scheduler.obligation_for(customer_id, month)?;

        let inserted = self
            .call("insert_rent", self.store.insert_rent(customer_id, row))
            .await?;
        match &inserted {
            Some(rent) => info!(%customer_id, rent_month = %rent.rent_month, "rent scheduled"),
            None => debug!(%customer_id, rent_month = %month, "rent month already covered"),
        }

        self.refresh_next_due_date(customer_id).await?;
        Ok(inserted)
    }

    /// extend rent coverage up to the current month for every active rent customer
    pub async fn generate_monthly_rents(&self) -> Result<usize> {
        self.generate_monthly_rents_at(self.today()).await
    }

    #[instrument(skip(self))]
    pub async fn generate_monthly_rents_at(&self, today: NaiveDate) -> Result<usize> {
        let mut created = 0;

        for customer_id in self.call("customer_ids", self.store.customer_ids()).await? {
            let book = self.call("book", self.store.book(customer_id)).await?;
            let monthly_rent = match book.customer.plan {
                PaymentPlan::MonthlyRent { monthly_rent, .. } if book.customer.active => monthly_rent,
                _ => continue,
            };

            let scheduler = RentScheduler::new(monthly_rent, self.config.rent_due_day)?;
            let rows = scheduler.catch_up(customer_id, &book.rents, book.customer.join_date, today)?;
            if rows.is_empty() {
                continue;
            }

            let mut added = 0;
            for row in rows {
                if self
                    .call("insert_rent", self.store.insert_rent(customer_id, row))
                    .await?
                    .is_some()
                {
                    added += 1;
                }
            }
            if added > 0 {
                debug!(%customer_id, added, "rent coverage extended");
                self.refresh_next_due_date(customer_id).await?;
            }
            created += added;
        }

        info!(%today, created, "monthly rents generated");
        Ok(created)
    }

    /// move every due/partial obligation past its due date to overdue
    pub async fn reconcile_overdue(&self) -> Result<ReconcileReport> {
        self.reconcile_overdue_at(self.today()).await
    }

    #[instrument(skip(self))]
    pub async fn reconcile_overdue_at(&self, today: NaiveDate) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for customer_id in self.call("customer_ids", self.store.customer_ids()).await? {
            report.customers_scanned += 1;
            let book = self.call("book", self.store.book(customer_id)).await?;

            let elapsed = self.monitor.elapsed(&book, today);
            if elapsed.is_empty() {
                continue;
            }
            let moved = self
                .call("mark_overdue", self.store.mark_overdue(customer_id, &elapsed, today))
                .await?;
            if moved > 0 {
                debug!(%customer_id, moved, "obligations now overdue");
            }
            report.obligations_marked += moved;
        }

        info!(
            %today,
            customers = report.customers_scanned,
            marked = report.obligations_marked,
            "overdue reconciliation finished"
        );
        Ok(report)
    }

    /// rent generation followed by overdue reconciliation, both as of today
    pub async fn run_daily_jobs(&self) -> Result<DailyRunReport> {
        let today = self.today();
        let rents_created = self.generate_monthly_rents_at(today).await?;
        let overdue = self.reconcile_overdue_at(today).await?;
        Ok(DailyRunReport {
            run_date: Some(today),
            rents_created,
            overdue,
        })
    }

    /// compute how `amount` would be distributed; nothing is written
    #[instrument(skip(self, caller))]
    pub async fn preview(
        &self,
        caller: &Caller,
        customer_id: CustomerId,
        amount: Money,
        mode: DistributionMode,
    ) -> Result<DistributionPlan> {
        let book = self.scoped_book(caller, customer_id).await?;
        let plan = self.distributor.plan(&book, amount, mode)?;
        debug!(
            %customer_id,
            allocations = plan.allocations.len(),
            excess = %plan.excess_amount,
            "distribution previewed"
        );
        Ok(plan)
    }

    /// preview and commit in one step
    pub async fn commit(&self, caller: &Caller, request: PaymentRequest) -> Result<CommitOutcome> {
        request.validate()?;
        let plan = self
            .preview(caller, request.customer_id, request.amount, request.mode)
            .await?;
        self.commit_plan(caller, plan, request).await
    }

    /// commit a previously previewed plan
    ///
    /// fails with `ConcurrentModification` if the customer's book changed since the
    /// preview or the plan is not what the book distributes to; the caller should
    /// preview again and retry
    #[instrument(skip_all, fields(customer_id = %request.customer_id, amount = %request.amount))]
    pub async fn commit_plan(
        &self,
        caller: &Caller,
        plan: DistributionPlan,
        request: PaymentRequest,
    ) -> Result<CommitOutcome> {
        request.validate()?;
        if plan.amount != request.amount {
            warn!(planned = %plan.amount, "request amount differs from the previewed plan");
            return Err(BillingError::InvalidAmount {
                amount: request.amount,
            });
        }

        let customer_id = request.customer_id;
        let book = self.scoped_book(caller, customer_id).await?;

        // the plan is caller input: it must be exactly what this book distributes to
        let expected = self.distributor.plan(&book, plan.amount, plan.mode)?;
        if !plan.matches_distribution(&expected) {
            warn!(%customer_id, "plan does not match the current distribution");
            return Err(BillingError::ConcurrentModification {
                customer_id,
                expected: plan.based_on_version,
                found: book.version,
            });
        }

        let changes = self.writer.apply(&book, &plan, &request).map_err(|e| {
            warn!(%customer_id, error = %e, "payment rejected");
            e
        })?;

        let transaction = changes.transaction.clone();
        let ledger_entry = changes.ledger_entry.clone();

        self.call("commit_payment", self.store.commit_payment(changes))
            .await
            .map_err(|e| {
                warn!(%customer_id, error = %e, "payment commit failed");
                e
            })?;

        info!(
            %customer_id,
            transaction_type = ?transaction.transaction_type,
            applied = %plan.total_applied(),
            excess = %plan.excess_amount,
            credit = %ledger_entry.running_balance,
            "payment committed"
        );

        let refreshed = self.call("book", self.store.book(customer_id)).await?;
        Ok(CommitOutcome {
            details: self.reader.details(&refreshed),
            plan,
            transaction,
            ledger_entry,
        })
    }

    #[instrument(skip(self, caller))]
    pub async fn billing_details(&self, caller: &Caller, customer_id: CustomerId) -> Result<BillingDetails> {
        let book = self.scoped_book(caller, customer_id).await?;
        Ok(self.reader.details(&book))
    }

    /// the customer's book, or `CustomerNotFound` if the caller may not see it
    async fn scoped_book(&self, caller: &Caller, customer_id: CustomerId) -> Result<CustomerBook> {
        let book = self.call("book", self.store.book(customer_id)).await?;
        if !caller.can_access(&book.customer) {
            warn!(%customer_id, ?caller, "customer outside caller scope");
            return Err(BillingError::CustomerNotFound { customer_id });
        }
        Ok(book)
    }

    async fn refresh_next_due_date(&self, customer_id: CustomerId) -> Result<()> {
        let book = self.call("book", self.store.book(customer_id)).await?;
        let next = next_due_date(&book.emis, &book.rents);
        if next != book.customer.next_due_date {
            self.call("set_next_due_date", self.store.set_next_due_date(customer_id, next))
                .await?;
        }
        Ok(())
    }

    /// bound a store call by the configured timeout
    async fn call<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.config.store_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout_ms = self.config.store_timeout_ms, "store call timed out");
                Err(BillingError::StoreUnavailable {
                    message: format!(
                        "{} timed out after {}ms",
                        operation, self.config.store_timeout_ms
                    ),
                })
            }
        }
    }
}

/// obligations may only be scheduled for the customer's own plan
fn ensure_plan(book: &CustomerBook, wanted: PaymentType) -> Result<()> {
    let actual = book.customer.payment_type();
    if actual != wanted {
        warn!(customer_id = %book.customer.id, ?actual, ?wanted, "schedule does not fit the plan");
        return Err(BillingError::invalid_plan(format!(
            "customer {} is billed as {:?}, cannot schedule {:?} obligations",
            book.customer.id, actual, wanted
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use std::time::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn engine(config: BillingConfig) -> BillingEngine<MemoryStore> {
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap(),
        ));
        BillingEngine::new(Arc::new(MemoryStore::new()), time, config).unwrap()
    }

    fn rent_customer() -> NewCustomer {
        NewCustomer {
            name: "Ravi".to_string(),
            partner_id: None,
            plan: PaymentPlan::monthly_rent(Money::from_major(3_000), Money::from_major(5_000)).unwrap(),
            join_date: date(2024, 1, 1),
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let config = BillingConfig::standard().with_rent_due_day(31);
        assert!(BillingEngine::new(Arc::new(MemoryStore::new()), time, config).is_err());
    }

    #[tokio::test]
    async fn test_today_follows_injected_clock() {
        let engine = engine(BillingConfig::standard());
        assert_eq!(engine.today(), date(2024, 3, 15));
    }

    #[tokio::test]
    async fn test_onboarding_rent_sets_next_due_date() {
        let engine = engine(BillingConfig::standard().with_rent_due_day(5));
        let customer = engine.onboard_customer(rent_customer()).await.unwrap();

        assert_eq!(customer.next_due_date, Some(date(2024, 1, 5)));
        let book = engine.store().book(customer.id).await.unwrap();
        assert_eq!(book.rents.len(), 1);
        assert_eq!(book.rents[0].rent_month, date(2024, 1, 1));
    }

    #[tokio::test]
    async fn test_slow_store_surfaces_as_unavailable() {
        let engine = engine(BillingConfig::standard().with_store_timeout(Duration::from_millis(20)));
        let customer = engine.onboard_customer(rent_customer()).await.unwrap();

        engine.store().set_latency(Some(Duration::from_millis(200)));
        let err = engine
            .billing_details(&Caller::Admin, customer.id)
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::StoreUnavailable { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_plan_amount_must_match_request() {
        let engine = engine(BillingConfig::standard());
        let customer = engine.onboard_customer(rent_customer()).await.unwrap();

        let plan = engine
            .preview(&Caller::Admin, customer.id, Money::from_major(3_000), DistributionMode::Rent)
            .await
            .unwrap();
        let request = PaymentRequest::new(
            customer.id,
            Money::from_major(2_000),
            DistributionMode::Rent,
            crate::types::PaymentMode::Cash,
            date(2024, 1, 3),
        );

        let err = engine.commit_plan(&Caller::Admin, plan, request).await.unwrap_err();
        assert!(matches!(err, BillingError::InvalidAmount { .. }));
    }
}
