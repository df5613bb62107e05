use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{
    BillingPeriod, ContractId, ContractStatus, EntryId, EntryStatus, EntryType, ObligationClass,
    OccupantId, PaymentMethod, PropertyId, RefundStatus, RoomId,
};

/// tenancy contract (booking)
///
/// `total_liability` is the running sum of every amount ever raised against
/// this contract. It is incremented by invoice generation, penalty
/// application, and pending payment creation. Settlement changes entry
/// status, never this total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub occupant_id: OccupantId,
    pub room_id: RoomId,
    pub check_in: NaiveDate,
    /// contract-level rent; falls back to room rent, then room base price
    pub monthly_rent: Option<Money>,
    pub security_deposit: Money,
    pub total_liability: Money,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    pub fn new(
        occupant_id: OccupantId,
        room_id: RoomId,
        check_in: NaiveDate,
        monthly_rent: Option<Money>,
        security_deposit: Money,
        status: ContractStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            occupant_id,
            room_id,
            check_in,
            monthly_rent,
            security_deposit,
            total_liability: Money::ZERO,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// raise liability when a new obligation or penalty is recorded
    pub fn raise_liability(&mut self, amount: Money, now: DateTime<Utc>) {
        self.total_liability += amount;
        self.updated_at = now;
    }
}

/// room master data, read-only from the engine's perspective
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub property_id: PropertyId,
    pub monthly_rent: Option<Money>,
    pub base_price: Money,
}

impl Room {
    pub fn new(property_id: PropertyId, monthly_rent: Option<Money>, base_price: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            property_id,
            monthly_rent,
            base_price,
        }
    }
}

/// a single ledger entry: an obligation (money owed) or a settled receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    /// human-readable secondary id, assigned before insert
    pub receipt_id: String,
    pub occupant_id: OccupantId,
    pub contract_id: Option<ContractId>,
    pub amount: Money,
    pub transaction_date: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub entry_type: EntryType,
    pub status: EntryStatus,
    pub method: PaymentMethod,
    pub external_ref: Option<String>,
    pub notes: Option<String>,
    /// billing month for obligation-class entries
    pub period: Option<BillingPeriod>,
    /// the obligation this entry derives from (late fee or partial receipt)
    pub source_entry: Option<EntryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// an open obligation awaiting settlement
    pub fn is_outstanding_obligation(&self) -> bool {
        self.status.is_outstanding()
            && (self.entry_type.is_obligation_class() || self.entry_type == EntryType::LateFee)
    }

    /// counts toward the one-open-obligation-per-month guard
    pub fn blocks_duplicate(
        &self,
        occupant: OccupantId,
        contract: Option<ContractId>,
        class: ObligationClass,
        period: BillingPeriod,
    ) -> bool {
        !self.status.is_terminal()
            && self.occupant_id == occupant
            && self.contract_id == contract
            && self.entry_type.obligation_class() == Some(class)
            && self.period == Some(period)
    }
}

/// refund request raised against a paid entry; approval is external
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub id: Uuid,
    pub entry_id: EntryId,
    pub occupant_id: OccupantId,
    pub property_id: PropertyId,
    pub amount: Money,
    pub reason: String,
    pub status: RefundStatus,
    pub created_at: DateTime<Utc>,
}
