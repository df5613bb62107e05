use std::collections::HashMap;

use parking_lot::Mutex;

use crate::errors::{LedgerError, Result};
use crate::model::{Contract, LedgerEntry, RefundRequest, Room};
use crate::store::{ContractTxn, EntryFilter, LedgerStore};
use crate::types::{ContractId, EntryId, RoomId};

#[derive(Debug, Default)]
struct Inner {
    contracts: HashMap<ContractId, Contract>,
    rooms: HashMap<RoomId, Room>,
    // insertion-ordered so reads are deterministic
    entries: Vec<LedgerEntry>,
    refund_requests: Vec<RefundRequest>,
}

impl Inner {
    fn entry_index(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }
}

/// in-memory ledger store
///
/// One mutex guards the whole store, so every contract transaction runs
/// under exclusion and commits or discards as a unit. Intended for tests
/// and prototyping; production hosts supply a database-backed store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryStore {
    fn insert_contract(&self, contract: Contract) -> Result<()> {
        self.inner.lock().contracts.insert(contract.id, contract);
        Ok(())
    }

    fn insert_room(&self, room: Room) -> Result<()> {
        self.inner.lock().rooms.insert(room.id, room);
        Ok(())
    }

    fn contract(&self, id: ContractId) -> Result<Contract> {
        self.inner
            .lock()
            .contracts
            .get(&id)
            .cloned()
            .ok_or(LedgerError::ContractNotFound { id })
    }

    fn room(&self, id: RoomId) -> Result<Room> {
        self.inner
            .lock()
            .rooms
            .get(&id)
            .cloned()
            .ok_or(LedgerError::RoomNotFound { id })
    }

    fn billable_contracts(&self) -> Result<Vec<Contract>> {
        let inner = self.inner.lock();
        let mut contracts: Vec<Contract> = inner
            .contracts
            .values()
            .filter(|c| c.status.is_billable())
            .cloned()
            .collect();
        contracts.sort_by_key(|c| c.created_at);
        Ok(contracts)
    }

    fn contracts(&self) -> Result<Vec<Contract>> {
        let inner = self.inner.lock();
        let mut contracts: Vec<Contract> = inner.contracts.values().cloned().collect();
        contracts.sort_by_key(|c| c.created_at);
        Ok(contracts)
    }

    fn entry(&self, id: EntryId) -> Result<LedgerEntry> {
        let inner = self.inner.lock();
        inner
            .entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(LedgerError::EntryNotFound { id })
    }

    fn entries(&self, filter: &EntryFilter) -> Result<Vec<LedgerEntry>> {
        let inner = self.inner.lock();
        Ok(inner
            .entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    fn insert_entry(&self, entry: LedgerEntry) -> Result<()> {
        self.inner.lock().entries.push(entry);
        Ok(())
    }

    fn update_entry(&self, entry: LedgerEntry) -> Result<()> {
        let mut inner = self.inner.lock();
        let idx = inner
            .entry_index(entry.id)
            .ok_or(LedgerError::EntryNotFound { id: entry.id })?;
        inner.entries[idx] = entry;
        Ok(())
    }

    fn insert_refund_request(&self, request: RefundRequest) -> Result<()> {
        self.inner.lock().refund_requests.push(request);
        Ok(())
    }

    fn refund_requests(&self) -> Result<Vec<RefundRequest>> {
        Ok(self.inner.lock().refund_requests.clone())
    }

    fn with_contract<T, F>(&self, id: ContractId, f: F) -> Result<T>
    where
        F: FnOnce(&mut ContractTxn) -> Result<T>,
    {
        // lock held across the whole read-modify-write sequence
        let mut inner = self.inner.lock();
        let contract = inner
            .contracts
            .get(&id)
            .cloned()
            .ok_or(LedgerError::ContractNotFound { id })?;
        let entries: Vec<LedgerEntry> = inner
            .entries
            .iter()
            .filter(|e| e.contract_id == Some(id))
            .cloned()
            .collect();

        let mut txn = ContractTxn::new(contract, entries);
        let outcome = f(&mut txn)?;

        let (contract, updated, inserted) = txn.into_parts();
        inner.contracts.insert(id, contract);
        for entry in updated {
            if let Some(idx) = inner.entry_index(entry.id) {
                inner.entries[idx] = entry;
            }
        }
        inner.entries.extend(inserted);
        Ok(outcome)
    }
}
