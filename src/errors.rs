use thiserror::Error;

use crate::decimal::Money;
use crate::types::{ContractId, EntryId, EntryStatus, RoomId};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("duplicate obligation: an open {entry_type} entry already exists for {period} on this contract")]
    DuplicateObligation {
        entry_type: String,
        period: String,
    },

    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("refund target not paid: entry is {status:?}")]
    RefundTargetNotPaid {
        status: EntryStatus,
    },

    #[error("refund exceeds deposit: balance {balance}, requested {requested}")]
    RefundExceedsDeposit {
        balance: Money,
        requested: Money,
    },

    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidStatusTransition {
        from: EntryStatus,
        to: EntryStatus,
    },

    #[error("billing period required for obligation entries")]
    PeriodRequired,

    #[error("invalid billing period: month {month} of year {year}")]
    InvalidPeriod {
        year: i32,
        month: u32,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("contract not found: {id}")]
    ContractNotFound {
        id: ContractId,
    },

    #[error("ledger entry not found: {id}")]
    EntryNotFound {
        id: EntryId,
    },

    #[error("room not found: {id}")]
    RoomNotFound {
        id: RoomId,
    },

    #[error("entry has no contract: {id}")]
    EntryWithoutContract {
        id: EntryId,
    },

    #[error("transaction failed: {message}")]
    TransactionFailed {
        message: String,
    },

    #[error("aggregation failed: {message}")]
    AggregationFailed {
        message: String,
    },
}

impl LedgerError {
    /// validation errors are surfaced to callers as user-facing messages
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::DuplicateObligation { .. }
                | LedgerError::InvalidAmount { .. }
                | LedgerError::RefundTargetNotPaid { .. }
                | LedgerError::RefundExceedsDeposit { .. }
                | LedgerError::InvalidStatusTransition { .. }
                | LedgerError::PeriodRequired
                | LedgerError::InvalidPeriod { .. }
                | LedgerError::InvalidConfiguration { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
