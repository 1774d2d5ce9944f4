pub mod config;
pub mod customer;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod obligations;
pub mod overdue;
pub mod payments;
pub mod records;
pub mod schedule;
pub mod store;
pub mod summary;
pub mod types;

// re-export key types
pub use config::BillingConfig;
pub use customer::{Caller, Customer, NewCustomer, PaymentPlan};
pub use decimal::Money;
pub use engine::{BillingEngine, CommitOutcome, DailyRunReport};
pub use errors::{BillingError, Result};
pub use obligations::{EmiObligation, Obligation, RentObligation};
pub use overdue::{OverdueMonitor, ReconcileReport};
pub use payments::{Allocation, DistributionPlan, LedgerWriter, PaymentDistributor, PaymentRequest};
pub use records::{CreditBalance, LedgerEntry, Transaction};
pub use schedule::{EmiScheduler, RentScheduler};
pub use store::{BillingStore, CustomerBook, MemoryStore, PaymentChangeSet};
pub use summary::{BillingDetails, BillingSummaryReader, EmiProgress};
pub use types::{
    CustomerId, DistributionMode, ObligationId, ObligationKind, PartnerId, PaymentMode,
    PaymentStatus, PaymentType, TransactionType,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
