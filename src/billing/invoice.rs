use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::billing::resolve_monthly_rent;
use crate::errors::Result;
use crate::events::{Event, EventStore};
use crate::idgen::ReceiptIdGenerator;
use crate::model::{Contract, LedgerEntry};
use crate::store::LedgerStore;
use crate::types::{
    BillingPeriod, ContractId, EntryId, EntryStatus, EntryType, ObligationClass, PaymentMethod,
};

/// outcome of one generation pass
#[derive(Debug, Default)]
pub struct InvoiceRun {
    /// ids of the obligations raised in this pass
    pub created: Vec<EntryId>,
    /// contracts skipped because their processing failed
    pub failed: Vec<ContractId>,
}

/// recurring scan that materializes monthly rent obligations
///
/// Each billable contract is processed in its own transaction: every missing
/// month gets a Pending MonthlyRent entry and the contract's liability is
/// raised by the same amount, committed together. Re-running for the same
/// `as_of` creates nothing new.
pub struct InvoiceGenerator<'a, S: LedgerStore> {
    store: &'a S,
    receipts: &'a dyn ReceiptIdGenerator,
    time: &'a SafeTimeProvider,
}

impl<'a, S: LedgerStore> InvoiceGenerator<'a, S> {
    pub fn new(store: &'a S, receipts: &'a dyn ReceiptIdGenerator, time: &'a SafeTimeProvider) -> Self {
        Self {
            store,
            receipts,
            time,
        }
    }

    /// raise rent obligations for every whole month from check-in through
    /// `as_of` inclusive, for all billable contracts
    ///
    /// One contract's failure never aborts the run; failures are logged and
    /// the contract is reported in `InvoiceRun::failed`.
    pub fn generate_due_invoices(&self, as_of: NaiveDate, events: &mut EventStore) -> Result<InvoiceRun> {
        let mut run = InvoiceRun::default();

        for contract in self.store.billable_contracts()? {
            match self.generate_for_contract(&contract, as_of, events) {
                Ok(mut ids) => run.created.append(&mut ids),
                Err(err) => {
                    warn!(contract_id = %contract.id, error = %err, "invoice generation failed for contract");
                    run.failed.push(contract.id);
                }
            }
        }

        debug!(created = run.created.len(), failed = run.failed.len(), "invoice generation pass complete");
        Ok(run)
    }

    fn generate_for_contract(
        &self,
        contract: &Contract,
        as_of: NaiveDate,
        events: &mut EventStore,
    ) -> Result<Vec<EntryId>> {
        if contract.check_in > as_of {
            return Ok(Vec::new());
        }

        let room = self.store.room(contract.room_id)?;
        let rent = match resolve_monthly_rent(contract, &room) {
            Some(rent) => rent,
            None => {
                debug!(contract_id = %contract.id, "no rent value resolvable, skipping contract");
                return Ok(Vec::new());
            }
        };

        let periods = BillingPeriod::span(contract.check_in, as_of);
        let now = self.time.now();
        let occupant = contract.occupant_id;
        let contract_id = contract.id;

        let created = self.store.with_contract(contract_id, |txn| {
            let mut created = Vec::new();
            for period in periods {
                let already_billed = txn.entries().any(|e| {
                    e.blocks_duplicate(occupant, Some(contract_id), ObligationClass::Rent, period)
                });
                if already_billed {
                    continue;
                }

                let entry = LedgerEntry {
                    id: Uuid::new_v4(),
                    receipt_id: self.receipts.generate(EntryType::MonthlyRent, period.first_day()),
                    occupant_id: occupant,
                    contract_id: Some(contract_id),
                    amount: rent,
                    transaction_date: now,
                    due_date: Some(period.first_day()),
                    entry_type: EntryType::MonthlyRent,
                    status: EntryStatus::Pending,
                    method: PaymentMethod::Other,
                    external_ref: None,
                    notes: Some(format!("Monthly rent for {}", period.label())),
                    period: Some(period),
                    source_entry: None,
                    created_at: now,
                    updated_at: now,
                };
                created.push((entry.id, period));
                txn.contract_mut().raise_liability(rent, now);
                txn.insert(entry);
            }
            Ok(created)
        })?;

        for (entry_id, period) in &created {
            events.emit(Event::ObligationRaised {
                contract_id,
                entry_id: *entry_id,
                amount: rent,
                period_label: period.label(),
                due_date: period.first_day(),
            });
        }

        Ok(created.into_iter().map(|(id, _)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hourglass_rs::TimeSource;

    use crate::decimal::Money;
    use crate::idgen::ShortUuidReceipts;
    use crate::model::Room;
    use crate::store::{EntryFilter, MemoryStore};
    use crate::types::ContractStatus;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed(store: &MemoryStore, check_in: NaiveDate, rent: Option<Money>) -> Contract {
        let room = Room::new(Uuid::new_v4(), Some(Money::from_major(10_000)), Money::from_major(12_000));
        let contract = Contract::new(
            Uuid::new_v4(),
            room.id,
            check_in,
            rent,
            Money::from_major(20_000),
            ContractStatus::CheckedIn,
            Utc::now(),
        );
        store.insert_room(room).unwrap();
        store.insert_contract(contract.clone()).unwrap();
        contract
    }

    fn generator<'a>(
        store: &'a MemoryStore,
        receipts: &'a ShortUuidReceipts,
        time: &'a SafeTimeProvider,
    ) -> InvoiceGenerator<'a, MemoryStore> {
        InvoiceGenerator::new(store, receipts, time)
    }

    #[test]
    fn test_generates_one_obligation_per_elapsed_month() {
        let store = MemoryStore::new();
        let contract = seed(&store, date(2026, 1, 15), None);
        let receipts = ShortUuidReceipts;
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let mut events = EventStore::new();

        let run = generator(&store, &receipts, &time)
            .generate_due_invoices(date(2026, 3, 10), &mut events)
            .unwrap();

        // january, february, march
        assert_eq!(run.created.len(), 3);
        assert!(run.failed.is_empty());

        let entries = store.entries(&EntryFilter::for_contract(contract.id)).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.status == EntryStatus::Pending));
        assert!(entries.iter().all(|e| e.amount == Money::from_major(10_000)));
        assert_eq!(entries[0].due_date, Some(date(2026, 1, 1)));

        // liability raised once per month
        let contract = store.contract(contract.id).unwrap();
        assert_eq!(contract.total_liability, Money::from_major(30_000));
    }

    #[test]
    fn test_generation_is_idempotent() {
        let store = MemoryStore::new();
        let contract = seed(&store, date(2026, 1, 15), None);
        let receipts = ShortUuidReceipts;
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let mut events = EventStore::new();

        let gen = generator(&store, &receipts, &time);
        let first = gen.generate_due_invoices(date(2026, 3, 10), &mut events).unwrap();
        let second = gen.generate_due_invoices(date(2026, 3, 10), &mut events).unwrap();

        assert_eq!(first.created.len(), 3);
        assert!(second.created.is_empty());
        assert_eq!(store.entries(&EntryFilter::for_contract(contract.id)).unwrap().len(), 3);
        assert_eq!(
            store.contract(contract.id).unwrap().total_liability,
            Money::from_major(30_000)
        );
    }

    #[test]
    fn test_later_as_of_fills_only_new_months() {
        let store = MemoryStore::new();
        let contract = seed(&store, date(2026, 1, 15), None);
        let receipts = ShortUuidReceipts;
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let mut events = EventStore::new();

        let gen = generator(&store, &receipts, &time);
        gen.generate_due_invoices(date(2026, 2, 28), &mut events).unwrap();
        let follow_up = gen.generate_due_invoices(date(2026, 4, 1), &mut events).unwrap();

        assert_eq!(follow_up.created.len(), 2); // march and april
        assert_eq!(store.entries(&EntryFilter::for_contract(contract.id)).unwrap().len(), 4);
    }

    #[test]
    fn test_contract_rent_overrides_room_rent() {
        let store = MemoryStore::new();
        let contract = seed(&store, date(2026, 4, 1), Some(Money::from_major(8_500)));
        let receipts = ShortUuidReceipts;
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let mut events = EventStore::new();

        generator(&store, &receipts, &time)
            .generate_due_invoices(date(2026, 4, 20), &mut events)
            .unwrap();

        let entries = store.entries(&EntryFilter::for_contract(contract.id)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount, Money::from_major(8_500));
    }

    #[test]
    fn test_skips_contract_without_any_rent_value() {
        let store = MemoryStore::new();
        let room = Room::new(Uuid::new_v4(), None, Money::ZERO);
        let contract = Contract::new(
            Uuid::new_v4(),
            room.id,
            date(2026, 1, 1),
            None,
            Money::ZERO,
            ContractStatus::CheckedIn,
            Utc::now(),
        );
        store.insert_room(room).unwrap();
        store.insert_contract(contract.clone()).unwrap();

        let receipts = ShortUuidReceipts;
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let mut events = EventStore::new();

        let run = generator(&store, &receipts, &time)
            .generate_due_invoices(date(2026, 3, 1), &mut events)
            .unwrap();

        assert!(run.created.is_empty());
        assert!(run.failed.is_empty());
        assert!(store.entries(&EntryFilter::for_contract(contract.id)).unwrap().is_empty());
    }

    #[test]
    fn test_future_check_in_is_not_billed() {
        let store = MemoryStore::new();
        let contract = seed(&store, date(2026, 9, 1), None);
        let receipts = ShortUuidReceipts;
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let mut events = EventStore::new();

        let run = generator(&store, &receipts, &time)
            .generate_due_invoices(date(2026, 8, 15), &mut events)
            .unwrap();

        assert!(run.created.is_empty());
        assert!(store.entries(&EntryFilter::for_contract(contract.id)).unwrap().is_empty());
    }

    #[test]
    fn test_missing_room_isolates_contract_failure() {
        let store = MemoryStore::new();
        // healthy contract
        let healthy = seed(&store, date(2026, 5, 1), None);
        // contract pointing at a room that was never seeded
        let broken = Contract::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            date(2026, 5, 1),
            None,
            Money::ZERO,
            ContractStatus::CheckedIn,
            Utc::now(),
        );
        store.insert_contract(broken.clone()).unwrap();

        let receipts = ShortUuidReceipts;
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let mut events = EventStore::new();

        let run = generator(&store, &receipts, &time)
            .generate_due_invoices(date(2026, 5, 20), &mut events)
            .unwrap();

        assert_eq!(run.created.len(), 1);
        assert_eq!(run.failed, vec![broken.id]);
        assert_eq!(store.entries(&EntryFilter::for_contract(healthy.id)).unwrap().len(), 1);
    }

    #[test]
    fn test_emits_obligation_raised_events() {
        let store = MemoryStore::new();
        seed(&store, date(2026, 6, 1), None);
        let receipts = ShortUuidReceipts;
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let mut events = EventStore::new();

        generator(&store, &receipts, &time)
            .generate_due_invoices(date(2026, 7, 2), &mut events)
            .unwrap();

        let labels: Vec<String> = events
            .events()
            .iter()
            .filter_map(|e| match e {
                Event::ObligationRaised { period_label, .. } => Some(period_label.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["June 2026", "July 2026"]);
    }
}
