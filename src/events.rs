use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{ContractId, EntryId, EntryStatus};

/// all events that can be emitted by the billing engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // obligation events
    ObligationRaised {
        contract_id: ContractId,
        entry_id: EntryId,
        amount: Money,
        period_label: String,
        due_date: NaiveDate,
    },
    LateFeeApplied {
        contract_id: ContractId,
        obligation_id: EntryId,
        fee_entry_id: EntryId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },

    // settlement events
    ObligationSettled {
        contract_id: ContractId,
        entry_id: EntryId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    PartiallySettled {
        contract_id: ContractId,
        entry_id: EntryId,
        applied: Money,
        residual: Money,
        timestamp: DateTime<Utc>,
    },
    AdvanceRecorded {
        contract_id: ContractId,
        entry_id: EntryId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },

    // direct ledger events
    PaymentRecorded {
        entry_id: EntryId,
        contract_id: Option<ContractId>,
        amount: Money,
        status: EntryStatus,
        timestamp: DateTime<Utc>,
    },
    PaymentVoided {
        entry_id: EntryId,
        timestamp: DateTime<Utc>,
    },
    StatusChanged {
        entry_id: EntryId,
        old_status: EntryStatus,
        new_status: EntryStatus,
        timestamp: DateTime<Utc>,
    },

    // refund events
    RefundRequested {
        entry_id: EntryId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    SecurityRefunded {
        contract_id: ContractId,
        entry_id: EntryId,
        amount: Money,
        remaining_deposit: Money,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
