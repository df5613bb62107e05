pub mod billing;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod idgen;
pub mod model;
pub mod payments;
pub mod reporting;
pub mod store;
pub mod types;

// re-export key types
pub use billing::{InvoiceGenerator, InvoiceRun, PenaltyEnforcer};
pub use config::BillingConfig;
pub use decimal::Money;
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use idgen::{ReceiptIdGenerator, ShortUuidReceipts};
pub use model::{Contract, LedgerEntry, RefundRequest, Room};
pub use payments::{
    NewPayment, PaymentLedger, PaymentUpdate, RefundInput, RefundProcessor, SettlementEngine,
    SettlementOutcome,
};
pub use reporting::{FinancialAggregator, FinancialSummary};
pub use store::{ContractTxn, EntryFilter, LedgerStore, MemoryStore};
pub use types::{
    BillingPeriod, ContractId, ContractStatus, EntryId, EntryStatus, EntryType, ObligationClass,
    OccupantId, PaymentMethod, PropertyId, RefundStatus, RoomId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
