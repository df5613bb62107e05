use hourglass_rs::SafeTimeProvider;
use tracing::info;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::idgen::ReceiptIdGenerator;
use crate::model::LedgerEntry;
use crate::store::LedgerStore;
use crate::types::{ContractId, EntryId, EntryStatus, EntryType, OccupantId, PaymentMethod};

/// result of one waterfall allocation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SettlementOutcome {
    /// obligations fully settled
    pub settled: u32,
    /// obligations reduced but still outstanding
    pub partially_settled: u32,
    /// whether a surplus Advance entry was recorded
    pub excess_applied: bool,
    /// the surplus amount, zero unless `excess_applied`
    pub advance: Money,
    /// ids of the Paid entries created by this allocation
    pub receipts: Vec<EntryId>,
}

/// waterfall allocation of one incoming amount across a contract's
/// outstanding obligations, oldest due date first
///
/// Obligations with no due date are treated as due immediately and sort
/// first. The whole allocation commits or rolls back as one unit; the store
/// serializes concurrent allocations against the same contract.
pub struct SettlementEngine<'a, S: LedgerStore> {
    store: &'a S,
    receipts: &'a dyn ReceiptIdGenerator,
    time: &'a SafeTimeProvider,
}

impl<'a, S: LedgerStore> SettlementEngine<'a, S> {
    pub fn new(store: &'a S, receipts: &'a dyn ReceiptIdGenerator, time: &'a SafeTimeProvider) -> Self {
        Self {
            store,
            receipts,
            time,
        }
    }

    pub fn reconcile(
        &self,
        contract_id: ContractId,
        incoming: Money,
        payer: OccupantId,
        method: PaymentMethod,
        notes: Option<String>,
        events: &mut EventStore,
    ) -> Result<SettlementOutcome> {
        if !incoming.is_positive() {
            return Err(LedgerError::InvalidAmount { amount: incoming });
        }

        let now = self.time.now();
        let (outcome, emitted) = self.store.with_contract(contract_id, |txn| {
            let mut outcome = SettlementOutcome::default();
            let mut emitted: Vec<Event> = Vec::new();
            let mut pool = incoming;

            // oldest due date first; no due date means due immediately
            let mut obligations: Vec<(EntryId, Option<chrono::NaiveDate>, chrono::DateTime<chrono::Utc>)> = txn
                .entries()
                .filter(|e| e.is_outstanding_obligation())
                .map(|e| (e.id, e.due_date, e.created_at))
                .collect();
            obligations.sort_by_key(|(_, due, created)| (due.is_some(), *due, *created));

            for (obligation_id, _, _) in obligations {
                if pool.is_zero() {
                    break;
                }
                let obligation = txn
                    .entry_mut(obligation_id)
                    .ok_or(LedgerError::EntryNotFound { id: obligation_id })?;

                if pool >= obligation.amount {
                    let amount = obligation.amount;
                    obligation.status = EntryStatus::Paid;
                    obligation.updated_at = now;
                    pool -= amount;
                    outcome.settled += 1;
                    emitted.push(Event::ObligationSettled {
                        contract_id,
                        entry_id: obligation_id,
                        amount,
                        timestamp: now,
                    });
                } else {
                    // residual debt stays on the obligation; the consumed
                    // portion becomes its own Paid entry
                    let applied = pool;
                    obligation.amount -= applied;
                    obligation.updated_at = now;
                    let residual = obligation.amount;
                    let entry_type = obligation.entry_type;
                    let period = obligation.period;

                    let receipt = LedgerEntry {
                        id: Uuid::new_v4(),
                        receipt_id: self.receipts.generate(entry_type, now.date_naive()),
                        occupant_id: payer,
                        contract_id: Some(contract_id),
                        amount: applied,
                        transaction_date: now,
                        due_date: None,
                        entry_type,
                        status: EntryStatus::Paid,
                        method,
                        external_ref: None,
                        notes: notes.clone(),
                        period,
                        source_entry: Some(obligation_id),
                        created_at: now,
                        updated_at: now,
                    };
                    outcome.receipts.push(receipt.id);
                    outcome.partially_settled += 1;
                    emitted.push(Event::PartiallySettled {
                        contract_id,
                        entry_id: obligation_id,
                        applied,
                        residual,
                        timestamp: now,
                    });
                    txn.insert(receipt);
                    pool = Money::ZERO;
                    break;
                }
            }

            if pool.is_positive() {
                let advance = LedgerEntry {
                    id: Uuid::new_v4(),
                    receipt_id: self.receipts.generate(EntryType::Advance, now.date_naive()),
                    occupant_id: payer,
                    contract_id: Some(contract_id),
                    amount: pool,
                    transaction_date: now,
                    due_date: None,
                    entry_type: EntryType::Advance,
                    status: EntryStatus::Paid,
                    method,
                    external_ref: None,
                    notes: notes.clone(),
                    period: None,
                    source_entry: None,
                    created_at: now,
                    updated_at: now,
                };
                outcome.excess_applied = true;
                outcome.advance = pool;
                outcome.receipts.push(advance.id);
                emitted.push(Event::AdvanceRecorded {
                    contract_id,
                    entry_id: advance.id,
                    amount: pool,
                    timestamp: now,
                });
                txn.insert(advance);
            }

            Ok((outcome, emitted))
        })?;

        for event in emitted {
            events.emit(event);
        }
        info!(
            contract_id = %contract_id,
            settled = outcome.settled,
            partially_settled = outcome.partially_settled,
            excess = %outcome.advance,
            "settlement applied"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use hourglass_rs::TimeSource;

    use crate::idgen::ShortUuidReceipts;
    use crate::model::{Contract, Room};
    use crate::store::{EntryFilter, MemoryStore};
    use crate::types::{BillingPeriod, ContractStatus};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed(store: &MemoryStore) -> Contract {
        let room = Room::new(Uuid::new_v4(), Some(Money::from_major(10_000)), Money::from_major(12_000));
        let contract = Contract::new(
            Uuid::new_v4(),
            room.id,
            date(2026, 1, 1),
            None,
            Money::from_major(20_000),
            ContractStatus::CheckedIn,
            Utc::now(),
        );
        store.insert_room(room).unwrap();
        store.insert_contract(contract.clone()).unwrap();
        contract
    }

    fn obligation(contract: &Contract, amount: i64, due: Option<NaiveDate>) -> LedgerEntry {
        let now = Utc::now();
        LedgerEntry {
            id: Uuid::new_v4(),
            receipt_id: "RENT-TEST".into(),
            occupant_id: contract.occupant_id,
            contract_id: Some(contract.id),
            amount: Money::from_major(amount),
            transaction_date: now,
            due_date: due,
            entry_type: EntryType::MonthlyRent,
            status: EntryStatus::Pending,
            method: PaymentMethod::Other,
            external_ref: None,
            notes: None,
            period: due.map(BillingPeriod::from_date),
            source_entry: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn engine<'a>(
        store: &'a MemoryStore,
        receipts: &'a ShortUuidReceipts,
        time: &'a SafeTimeProvider,
    ) -> SettlementEngine<'a, MemoryStore> {
        SettlementEngine::new(store, receipts, time)
    }

    /// outstanding obligations [10000, 8000, 12000] oldest to newest
    fn seed_three(store: &MemoryStore) -> (Contract, Vec<LedgerEntry>) {
        let contract = seed(store);
        let entries = vec![
            obligation(&contract, 10_000, Some(date(2026, 1, 1))),
            obligation(&contract, 8_000, Some(date(2026, 2, 1))),
            obligation(&contract, 12_000, Some(date(2026, 3, 1))),
        ];
        for e in &entries {
            store.insert_entry(e.clone()).unwrap();
        }
        (contract, entries)
    }

    #[test]
    fn test_exact_amount_settles_all_without_advance() {
        let store = MemoryStore::new();
        let (contract, entries) = seed_three(&store);
        let receipts = ShortUuidReceipts;
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let mut events = EventStore::new();

        let outcome = engine(&store, &receipts, &time)
            .reconcile(
                contract.id,
                Money::from_major(30_000),
                contract.occupant_id,
                PaymentMethod::BankTransfer,
                None,
                &mut events,
            )
            .unwrap();

        assert_eq!(outcome.settled, 3);
        assert_eq!(outcome.partially_settled, 0);
        assert!(!outcome.excess_applied);
        assert!(outcome.receipts.is_empty());

        for e in &entries {
            assert_eq!(store.entry(e.id).unwrap().status, EntryStatus::Paid);
        }
        let advances = store
            .entries(&EntryFilter {
                entry_type: Some(EntryType::Advance),
                ..EntryFilter::default()
            })
            .unwrap();
        assert!(advances.is_empty());
    }

    #[test]
    fn test_partial_settlement() {
        let store = MemoryStore::new();
        let (contract, entries) = seed_three(&store);
        let receipts = ShortUuidReceipts;
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let mut events = EventStore::new();

        let outcome = engine(&store, &receipts, &time)
            .reconcile(
                contract.id,
                Money::from_major(25_000),
                contract.occupant_id,
                PaymentMethod::Upi,
                None,
                &mut events,
            )
            .unwrap();

        assert_eq!(outcome.settled, 2);
        assert_eq!(outcome.partially_settled, 1);
        assert!(!outcome.excess_applied);

        // first two fully settled
        assert_eq!(store.entry(entries[0].id).unwrap().status, EntryStatus::Paid);
        assert_eq!(store.entry(entries[1].id).unwrap().status, EntryStatus::Paid);

        // third remains pending with the residual 7000
        let third = store.entry(entries[2].id).unwrap();
        assert_eq!(third.status, EntryStatus::Pending);
        assert_eq!(third.amount, Money::from_major(7_000));

        // exactly one new paid entry of 5000, no advance
        assert_eq!(outcome.receipts.len(), 1);
        let receipt = store.entry(outcome.receipts[0]).unwrap();
        assert_eq!(receipt.amount, Money::from_major(5_000));
        assert_eq!(receipt.status, EntryStatus::Paid);
        assert_eq!(receipt.source_entry, Some(entries[2].id));
        let advances = store
            .entries(&EntryFilter {
                entry_type: Some(EntryType::Advance),
                ..EntryFilter::default()
            })
            .unwrap();
        assert!(advances.is_empty());
    }

    #[test]
    fn test_overpayment_creates_single_advance() {
        let store = MemoryStore::new();
        let (contract, entries) = seed_three(&store);
        let receipts = ShortUuidReceipts;
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let mut events = EventStore::new();

        let outcome = engine(&store, &receipts, &time)
            .reconcile(
                contract.id,
                Money::from_major(40_000),
                contract.occupant_id,
                PaymentMethod::Card,
                None,
                &mut events,
            )
            .unwrap();

        assert_eq!(outcome.settled, 3);
        assert_eq!(outcome.partially_settled, 0);
        assert!(outcome.excess_applied);
        assert_eq!(outcome.advance, Money::from_major(10_000));

        for e in &entries {
            assert_eq!(store.entry(e.id).unwrap().status, EntryStatus::Paid);
        }
        let advances = store
            .entries(&EntryFilter {
                entry_type: Some(EntryType::Advance),
                ..EntryFilter::default()
            })
            .unwrap();
        assert_eq!(advances.len(), 1);
        assert_eq!(advances[0].amount, Money::from_major(10_000));
        assert_eq!(advances[0].status, EntryStatus::Paid);
    }

    #[test]
    fn test_no_obligations_means_pure_advance() {
        let store = MemoryStore::new();
        let contract = seed(&store);
        let receipts = ShortUuidReceipts;
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let mut events = EventStore::new();

        let outcome = engine(&store, &receipts, &time)
            .reconcile(
                contract.id,
                Money::from_major(5_000),
                contract.occupant_id,
                PaymentMethod::Cash,
                None,
                &mut events,
            )
            .unwrap();

        assert_eq!(outcome.settled, 0);
        assert!(outcome.excess_applied);
        assert_eq!(outcome.advance, Money::from_major(5_000));
    }

    #[test]
    fn test_null_due_date_sorts_first() {
        let store = MemoryStore::new();
        let contract = seed(&store);
        let dated = obligation(&contract, 10_000, Some(date(2026, 1, 1)));
        let undated = obligation(&contract, 4_000, None);
        store.insert_entry(dated.clone()).unwrap();
        store.insert_entry(undated.clone()).unwrap();

        let receipts = ShortUuidReceipts;
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let mut events = EventStore::new();

        engine(&store, &receipts, &time)
            .reconcile(
                contract.id,
                Money::from_major(4_000),
                contract.occupant_id,
                PaymentMethod::Cash,
                None,
                &mut events,
            )
            .unwrap();

        // the undated obligation is consumed before the dated one
        assert_eq!(store.entry(undated.id).unwrap().status, EntryStatus::Paid);
        assert_eq!(store.entry(dated.id).unwrap().status, EntryStatus::Pending);
    }

    #[test]
    fn test_overdue_obligations_are_settled_too() {
        let store = MemoryStore::new();
        let contract = seed(&store);
        let mut overdue = obligation(&contract, 10_000, Some(date(2026, 1, 1)));
        overdue.status = EntryStatus::Overdue;
        store.insert_entry(overdue.clone()).unwrap();

        let receipts = ShortUuidReceipts;
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let mut events = EventStore::new();

        let outcome = engine(&store, &receipts, &time)
            .reconcile(
                contract.id,
                Money::from_major(10_000),
                contract.occupant_id,
                PaymentMethod::Cash,
                None,
                &mut events,
            )
            .unwrap();

        assert_eq!(outcome.settled, 1);
        assert_eq!(store.entry(overdue.id).unwrap().status, EntryStatus::Paid);
    }

    #[test]
    fn test_settlement_never_touches_liability() {
        let store = MemoryStore::new();
        let (contract, _) = seed_three(&store);
        // simulate the liability raised when the obligations were created
        store
            .with_contract(contract.id, |txn| {
                txn.contract_mut().raise_liability(Money::from_major(30_000), Utc::now());
                Ok(())
            })
            .unwrap();

        let receipts = ShortUuidReceipts;
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let mut events = EventStore::new();

        engine(&store, &receipts, &time)
            .reconcile(
                contract.id,
                Money::from_major(30_000),
                contract.occupant_id,
                PaymentMethod::Cash,
                None,
                &mut events,
            )
            .unwrap();

        assert_eq!(
            store.contract(contract.id).unwrap().total_liability,
            Money::from_major(30_000)
        );
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        let store = MemoryStore::new();
        let contract = seed(&store);
        let receipts = ShortUuidReceipts;
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let mut events = EventStore::new();

        let result = engine(&store, &receipts, &time).reconcile(
            contract.id,
            Money::ZERO,
            contract.occupant_id,
            PaymentMethod::Cash,
            None,
            &mut events,
        );
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
    }

    #[test]
    fn test_unknown_contract() {
        let store = MemoryStore::new();
        let receipts = ShortUuidReceipts;
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let mut events = EventStore::new();

        let result = engine(&store, &receipts, &time).reconcile(
            Uuid::new_v4(),
            Money::from_major(100),
            Uuid::new_v4(),
            PaymentMethod::Cash,
            None,
            &mut events,
        );
        assert!(matches!(result, Err(LedgerError::ContractNotFound { .. })));
    }
}
