use chrono::{Duration, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::BillingConfig;
use crate::errors::Result;
use crate::events::{Event, EventStore};
use crate::idgen::ReceiptIdGenerator;
use crate::model::LedgerEntry;
use crate::store::{EntryFilter, LedgerStore};
use crate::types::{EntryId, EntryStatus, EntryType, PaymentMethod};

/// grace-period-based late-fee application
///
/// A fee is a one-time charge per obligation: the fee entry carries the
/// obligation's id in `source_entry`, and enforcement skips any obligation
/// that already has such a fee, no matter how many cycles have run since.
pub struct PenaltyEnforcer<'a, S: LedgerStore> {
    store: &'a S,
    receipts: &'a dyn ReceiptIdGenerator,
    time: &'a SafeTimeProvider,
    config: BillingConfig,
}

impl<'a, S: LedgerStore> PenaltyEnforcer<'a, S> {
    pub fn new(
        store: &'a S,
        receipts: &'a dyn ReceiptIdGenerator,
        time: &'a SafeTimeProvider,
        config: BillingConfig,
    ) -> Self {
        Self {
            store,
            receipts,
            time,
            config,
        }
    }

    /// apply late fees to rent obligations past their grace period
    ///
    /// Best effort: a failure on one obligation is logged and skipped, and
    /// never propagates to the caller.
    pub fn apply_late_fees(&self, as_of: NaiveDate, events: &mut EventStore) -> Result<Vec<EntryId>> {
        let cutoff = as_of - Duration::days(self.config.grace_period_days as i64);
        let candidates = self.store.entries(&EntryFilter {
            due_before: Some(cutoff),
            ..EntryFilter::default()
        })?;

        let mut applied = Vec::new();
        for obligation in candidates {
            if !obligation.entry_type.is_rent_class() || !obligation.status.is_outstanding() {
                continue;
            }
            match self.apply_fee(&obligation, as_of, events) {
                Ok(Some(fee_id)) => applied.push(fee_id),
                Ok(None) => {}
                Err(err) => {
                    warn!(obligation_id = %obligation.id, error = %err, "late fee application failed, skipping");
                }
            }
        }

        debug!(applied = applied.len(), "penalty enforcement pass complete");
        Ok(applied)
    }

    fn apply_fee(
        &self,
        obligation: &LedgerEntry,
        as_of: NaiveDate,
        events: &mut EventStore,
    ) -> Result<Option<EntryId>> {
        let now = self.time.now();
        let fee_amount = self.config.late_fee_amount;
        let obligation_id = obligation.id;

        let contract_id = match obligation.contract_id {
            Some(id) => id,
            None => {
                // the fee and the liability bump must commit together, which
                // needs a contract to carry the liability
                warn!(obligation_id = %obligation.id, "rent obligation has no contract, skipping late fee");
                return Ok(None);
            }
        };

        let fee_entry = self.build_fee(obligation, as_of);
        let fee_id = fee_entry.id;

        let raised = self.store.with_contract(contract_id, |txn| {
            let already_charged = txn.entries().any(|e| {
                e.entry_type == EntryType::LateFee && e.source_entry == Some(obligation_id)
            });
            if already_charged {
                return Ok(false);
            }

            let staged = txn
                .entry_mut(obligation_id)
                .ok_or(crate::errors::LedgerError::EntryNotFound { id: obligation_id })?;
            // the candidate scan ran outside this lock; the obligation may
            // have been settled in the meantime
            if !staged.status.is_outstanding() {
                return Ok(false);
            }
            if staged.status != EntryStatus::Overdue {
                staged.status = EntryStatus::Overdue;
                staged.updated_at = now;
            }

            txn.insert(fee_entry);
            txn.contract_mut().raise_liability(fee_amount, now);
            Ok(true)
        })?;

        if raised {
            events.emit(Event::LateFeeApplied {
                contract_id,
                obligation_id,
                fee_entry_id: fee_id,
                amount: fee_amount,
                timestamp: now,
            });
            Ok(Some(fee_id))
        } else {
            Ok(None)
        }
    }

    fn build_fee(&self, obligation: &LedgerEntry, as_of: NaiveDate) -> LedgerEntry {
        let now = self.time.now();
        LedgerEntry {
            id: Uuid::new_v4(),
            receipt_id: self.receipts.generate(EntryType::LateFee, as_of),
            occupant_id: obligation.occupant_id,
            contract_id: obligation.contract_id,
            amount: self.config.late_fee_amount,
            transaction_date: now,
            due_date: Some(as_of),
            entry_type: EntryType::LateFee,
            status: EntryStatus::Pending,
            method: PaymentMethod::Other,
            external_ref: None,
            notes: obligation
                .period
                .map(|p| format!("Late fee for {}", p.label())),
            period: None,
            source_entry: Some(obligation.id),
            created_at: now,
            updated_at: now,
        }
    }
}
