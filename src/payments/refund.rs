use hourglass_rs::SafeTimeProvider;
use tracing::info;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::idgen::ReceiptIdGenerator;
use crate::model::{LedgerEntry, RefundRequest};
use crate::store::LedgerStore;
use crate::types::{ContractId, EntryId, EntryStatus, EntryType, PaymentMethod, RefundStatus};

/// request to raise a refund against a paid entry
#[derive(Debug, Clone)]
pub struct RefundInput {
    pub entry_id: EntryId,
    /// defaults to the full entry amount
    pub amount: Option<Money>,
    pub reason: String,
}

/// refund requests and security-deposit payouts
///
/// `request_refund` only records intent; the source entry keeps its Paid
/// status and approval happens outside this engine. `refund_security` is an
/// immediate payout, not a request.
pub struct RefundProcessor<'a, S: LedgerStore> {
    store: &'a S,
    receipts: &'a dyn ReceiptIdGenerator,
    time: &'a SafeTimeProvider,
}

impl<'a, S: LedgerStore> RefundProcessor<'a, S> {
    pub fn new(store: &'a S, receipts: &'a dyn ReceiptIdGenerator, time: &'a SafeTimeProvider) -> Self {
        Self {
            store,
            receipts,
            time,
        }
    }

    /// record a refund request against a Paid entry
    pub fn request_refund(&self, input: RefundInput, events: &mut EventStore) -> Result<RefundRequest> {
        let entry = self.store.entry(input.entry_id)?;
        if entry.status != EntryStatus::Paid {
            return Err(LedgerError::RefundTargetNotPaid {
                status: entry.status,
            });
        }

        let amount = input.amount.unwrap_or(entry.amount);
        if !amount.is_positive() || amount > entry.amount {
            return Err(LedgerError::InvalidAmount { amount });
        }

        // property context comes from the entry's contract -> room relation
        let contract_id = entry
            .contract_id
            .ok_or(LedgerError::EntryWithoutContract { id: entry.id })?;
        let contract = self.store.contract(contract_id)?;
        let room = self.store.room(contract.room_id)?;

        let now = self.time.now();
        let request = RefundRequest {
            id: Uuid::new_v4(),
            entry_id: entry.id,
            occupant_id: entry.occupant_id,
            property_id: room.property_id,
            amount,
            reason: input.reason,
            status: RefundStatus::Pending,
            created_at: now,
        };
        self.store.insert_refund_request(request.clone())?;

        info!(entry_id = %entry.id, amount = %amount, "refund requested");
        events.emit(Event::RefundRequested {
            entry_id: entry.id,
            amount,
            timestamp: now,
        });
        Ok(request)
    }

    /// pay out part of the security deposit immediately
    ///
    /// Fails with no mutation when the amount exceeds the current balance;
    /// otherwise the SecurityRefund entry and the balance decrement commit
    /// together.
    pub fn refund_security(
        &self,
        contract_id: ContractId,
        amount: Money,
        notes: Option<String>,
        events: &mut EventStore,
    ) -> Result<LedgerEntry> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount { amount });
        }

        let now = self.time.now();
        let (entry, remaining) = self.store.with_contract(contract_id, |txn| {
            let balance = txn.contract().security_deposit;
            if amount > balance {
                return Err(LedgerError::RefundExceedsDeposit {
                    balance,
                    requested: amount,
                });
            }

            let occupant_id = txn.contract().occupant_id;
            let entry = LedgerEntry {
                id: Uuid::new_v4(),
                receipt_id: self.receipts.generate(EntryType::SecurityRefund, now.date_naive()),
                occupant_id,
                contract_id: Some(contract_id),
                amount,
                transaction_date: now,
                due_date: None,
                entry_type: EntryType::SecurityRefund,
                status: EntryStatus::Paid,
                method: PaymentMethod::Other,
                external_ref: None,
                notes,
                period: None,
                source_entry: None,
                created_at: now,
                updated_at: now,
            };

            let contract = txn.contract_mut();
            contract.security_deposit -= amount;
            contract.updated_at = now;
            let remaining = contract.security_deposit;

            txn.insert(entry.clone());
            Ok((entry, remaining))
        })?;

        info!(contract_id = %contract_id, amount = %amount, remaining = %remaining, "security deposit refunded");
        events.emit(Event::SecurityRefunded {
            contract_id,
            entry_id: entry.id,
            amount,
            remaining_deposit: remaining,
            timestamp: now,
        });
        Ok(entry)
    }
}
