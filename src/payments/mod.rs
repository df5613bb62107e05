pub mod refund;
pub mod settlement;

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::info;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::idgen::ReceiptIdGenerator;
use crate::model::LedgerEntry;
use crate::store::{EntryFilter, LedgerStore};
use crate::types::{
    BillingPeriod, ContractId, EntryId, EntryStatus, EntryType, OccupantId, PaymentMethod,
};

pub use refund::{RefundInput, RefundProcessor};
pub use settlement::{SettlementEngine, SettlementOutcome};

/// request to record one ledger entry
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub occupant_id: OccupantId,
    pub contract_id: Option<ContractId>,
    pub amount: Money,
    pub entry_type: EntryType,
    /// Pending for an obligation, Paid for a direct payment
    pub status: EntryStatus,
    pub method: PaymentMethod,
    pub due_date: Option<NaiveDate>,
    /// required for obligation-class types
    pub period: Option<BillingPeriod>,
    pub external_ref: Option<String>,
    pub notes: Option<String>,
    /// bypass the one-open-obligation-per-month guard
    pub allow_duplicate: bool,
}

/// typed field update for an existing entry; None leaves the field alone
#[derive(Debug, Clone, Default)]
pub struct PaymentUpdate {
    pub amount: Option<Money>,
    pub status: Option<EntryStatus>,
    pub method: Option<PaymentMethod>,
    pub due_date: Option<NaiveDate>,
    pub external_ref: Option<String>,
    pub notes: Option<String>,
}

/// create/read/update of individual ledger entries
///
/// Updates are direct field mutations with no cross-field reconciliation:
/// flipping a status to Paid does not touch the contract's liability.
/// Deletion does not exist; entries are voided instead.
pub struct PaymentLedger<'a, S: LedgerStore> {
    store: &'a S,
    receipts: &'a dyn ReceiptIdGenerator,
    time: &'a SafeTimeProvider,
}

impl<'a, S: LedgerStore> PaymentLedger<'a, S> {
    pub fn new(store: &'a S, receipts: &'a dyn ReceiptIdGenerator, time: &'a SafeTimeProvider) -> Self {
        Self {
            store,
            receipts,
            time,
        }
    }

    /// record a new entry, enforcing the duplicate-obligation guard
    ///
    /// The receipt id is computed up front so the row is inserted once,
    /// complete. A Pending entry tied to a contract raises that contract's
    /// liability in the same transaction as the insert.
    pub fn create_payment(&self, payment: NewPayment, events: &mut EventStore) -> Result<LedgerEntry> {
        if !payment.amount.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: payment.amount,
            });
        }

        let class = payment.entry_type.obligation_class();
        let period = match (class, payment.period) {
            (Some(_), None) => return Err(LedgerError::PeriodRequired),
            (_, period) => period,
        };

        let now = self.time.now();
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            receipt_id: self.receipts.generate(payment.entry_type, now.date_naive()),
            occupant_id: payment.occupant_id,
            contract_id: payment.contract_id,
            amount: payment.amount,
            transaction_date: now,
            due_date: payment.due_date,
            entry_type: payment.entry_type,
            status: payment.status,
            method: payment.method,
            external_ref: payment.external_ref,
            notes: payment.notes,
            period,
            source_entry: None,
            created_at: now,
            updated_at: now,
        };

        match payment.contract_id {
            Some(contract_id) => {
                let stored = entry.clone();
                self.store.with_contract(contract_id, |txn| {
                    if let (Some(class), Some(period), false) = (class, period, payment.allow_duplicate) {
                        let duplicate = txn.entries().any(|e| {
                            e.blocks_duplicate(payment.occupant_id, Some(contract_id), class, period)
                        });
                        if duplicate {
                            return Err(LedgerError::DuplicateObligation {
                                entry_type: format!("{:?}", payment.entry_type),
                                period: period.label(),
                            });
                        }
                    }
                    if stored.status == EntryStatus::Pending {
                        txn.contract_mut().raise_liability(stored.amount, now);
                    }
                    txn.insert(stored);
                    Ok(())
                })?;
            }
            None => {
                if let (Some(class), Some(period), false) = (class, period, payment.allow_duplicate) {
                    let duplicate = self
                        .store
                        .entries(&EntryFilter {
                            occupant_id: Some(payment.occupant_id),
                            period: Some(period),
                            ..EntryFilter::default()
                        })?
                        .iter()
                        .any(|e| e.blocks_duplicate(payment.occupant_id, None, class, period));
                    if duplicate {
                        return Err(LedgerError::DuplicateObligation {
                            entry_type: format!("{:?}", payment.entry_type),
                            period: period.label(),
                        });
                    }
                }
                self.store.insert_entry(entry.clone())?;
            }
        }

        info!(entry_id = %entry.id, receipt = %entry.receipt_id, "ledger entry recorded");
        events.emit(Event::PaymentRecorded {
            entry_id: entry.id,
            contract_id: entry.contract_id,
            amount: entry.amount,
            status: entry.status,
            timestamp: now,
        });
        Ok(entry)
    }

    /// direct status mutation, no cross-field reconciliation
    pub fn update_status(&self, id: EntryId, status: EntryStatus, events: &mut EventStore) -> Result<LedgerEntry> {
        let mut entry = self.store.entry(id)?;
        let old_status = entry.status;
        let now = self.time.now();
        entry.status = status;
        entry.updated_at = now;
        self.store.update_entry(entry.clone())?;

        events.emit(Event::StatusChanged {
            entry_id: id,
            old_status,
            new_status: status,
            timestamp: now,
        });
        Ok(entry)
    }

    /// direct field mutation through a typed update structure
    pub fn update_payment(
        &self,
        id: EntryId,
        update: PaymentUpdate,
        events: &mut EventStore,
    ) -> Result<LedgerEntry> {
        let mut entry = self.store.entry(id)?;
        let old_status = entry.status;
        if let Some(amount) = update.amount {
            if !amount.is_positive() {
                return Err(LedgerError::InvalidAmount { amount });
            }
            entry.amount = amount;
        }
        if let Some(status) = update.status {
            entry.status = status;
        }
        if let Some(method) = update.method {
            entry.method = method;
        }
        if let Some(due_date) = update.due_date {
            entry.due_date = Some(due_date);
        }
        if let Some(external_ref) = update.external_ref {
            entry.external_ref = Some(external_ref);
        }
        if let Some(notes) = update.notes {
            entry.notes = Some(notes);
        }
        let now = self.time.now();
        entry.updated_at = now;
        self.store.update_entry(entry.clone())?;

        if entry.status != old_status {
            events.emit(Event::StatusChanged {
                entry_id: id,
                old_status,
                new_status: entry.status,
                timestamp: now,
            });
        }
        Ok(entry)
    }

    /// administrative cancellation: a Voided transition, never a hard delete
    pub fn void_payment(&self, id: EntryId, events: &mut EventStore) -> Result<LedgerEntry> {
        let mut entry = self.store.entry(id)?;
        if entry.status == EntryStatus::Voided {
            return Err(LedgerError::InvalidStatusTransition {
                from: EntryStatus::Voided,
                to: EntryStatus::Voided,
            });
        }
        let now = self.time.now();
        entry.status = EntryStatus::Voided;
        entry.updated_at = now;
        self.store.update_entry(entry.clone())?;

        events.emit(Event::PaymentVoided {
            entry_id: id,
            timestamp: now,
        });
        Ok(entry)
    }
}
