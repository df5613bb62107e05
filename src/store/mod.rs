pub mod memory;

use chrono::NaiveDate;

use crate::errors::Result;
use crate::model::{Contract, LedgerEntry, RefundRequest, Room};
use crate::types::{BillingPeriod, ContractId, EntryId, EntryStatus, EntryType, OccupantId, RoomId};

pub use memory::MemoryStore;

/// typed filter over ledger entries
///
/// Every supported filter key is an explicit field; there is no free-form
/// filter surface.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub contract_id: Option<ContractId>,
    pub occupant_id: Option<OccupantId>,
    pub entry_type: Option<EntryType>,
    pub status: Option<EntryStatus>,
    pub period: Option<BillingPeriod>,
    /// strictly-before cutoff on due date; entries with no due date never match
    pub due_before: Option<NaiveDate>,
}

impl EntryFilter {
    pub fn for_contract(contract_id: ContractId) -> Self {
        Self {
            contract_id: Some(contract_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        if let Some(contract_id) = self.contract_id {
            if entry.contract_id != Some(contract_id) {
                return false;
            }
        }
        if let Some(occupant_id) = self.occupant_id {
            if entry.occupant_id != occupant_id {
                return false;
            }
        }
        if let Some(entry_type) = self.entry_type {
            if entry.entry_type != entry_type {
                return false;
            }
        }
        if let Some(status) = self.status {
            if entry.status != status {
                return false;
            }
        }
        if let Some(period) = self.period {
            if entry.period != Some(period) {
                return false;
            }
        }
        if let Some(cutoff) = self.due_before {
            match entry.due_date {
                Some(due) if due < cutoff => {}
                _ => return false,
            }
        }
        true
    }
}

/// staged working copy of one contract and its ledger slice
///
/// All mutations are buffered; the store applies them only when the
/// transaction closure returns Ok. On Err the working copy is discarded and
/// nothing is written.
#[derive(Debug)]
pub struct ContractTxn {
    contract: Contract,
    entries: Vec<LedgerEntry>,
    inserted: Vec<LedgerEntry>,
}

impl ContractTxn {
    pub fn new(contract: Contract, entries: Vec<LedgerEntry>) -> Self {
        Self {
            contract,
            entries,
            inserted: Vec::new(),
        }
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn contract_mut(&mut self) -> &mut Contract {
        &mut self.contract
    }

    /// pre-existing entries of this contract, plus any staged inserts
    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().chain(self.inserted.iter())
    }

    pub fn entry_mut(&mut self, id: EntryId) -> Option<&mut LedgerEntry> {
        self.entries
            .iter_mut()
            .chain(self.inserted.iter_mut())
            .find(|e| e.id == id)
    }

    pub fn insert(&mut self, entry: LedgerEntry) {
        self.inserted.push(entry);
    }

    pub fn into_parts(self) -> (Contract, Vec<LedgerEntry>, Vec<LedgerEntry>) {
        (self.contract, self.entries, self.inserted)
    }
}

/// persistence abstraction over contracts, rooms, ledger entries, and
/// refund requests
///
/// Implementations must serialize `with_contract` calls touching the same
/// contract, so read-modify-write sequences never interleave. The in-memory
/// implementation holds a single lock for the duration of the closure; a
/// database-backed implementation would take a row lock on the contract.
pub trait LedgerStore {
    fn insert_contract(&self, contract: Contract) -> Result<()>;
    fn insert_room(&self, room: Room) -> Result<()>;

    fn contract(&self, id: ContractId) -> Result<Contract>;
    fn room(&self, id: RoomId) -> Result<Room>;
    /// contracts whose status accrues rent
    fn billable_contracts(&self) -> Result<Vec<Contract>>;
    /// every contract regardless of status, for read-side aggregation
    fn contracts(&self) -> Result<Vec<Contract>>;

    fn entry(&self, id: EntryId) -> Result<LedgerEntry>;
    fn entries(&self, filter: &EntryFilter) -> Result<Vec<LedgerEntry>>;
    /// insert outside any contract transaction (entries with no contract)
    fn insert_entry(&self, entry: LedgerEntry) -> Result<()>;
    /// replace an entry by id
    fn update_entry(&self, entry: LedgerEntry) -> Result<()>;

    fn insert_refund_request(&self, request: RefundRequest) -> Result<()>;
    fn refund_requests(&self) -> Result<Vec<RefundRequest>>;

    /// run `f` against a staged copy of the contract and its entries,
    /// committing every buffered mutation atomically on Ok and discarding
    /// all of them on Err
    fn with_contract<T, F>(&self, id: ContractId, f: F) -> Result<T>
    where
        F: FnOnce(&mut ContractTxn) -> Result<T>;
}
