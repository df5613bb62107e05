pub mod invoice;
pub mod penalty;

use crate::decimal::Money;
use crate::model::{Contract, Room};

pub use invoice::{InvoiceGenerator, InvoiceRun};
pub use penalty::PenaltyEnforcer;

/// resolve the monthly rent for a contract: contract-level rent, then
/// room-level rent, then room base price; first non-zero value wins
pub fn resolve_monthly_rent(contract: &Contract, room: &Room) -> Option<Money> {
    [contract.monthly_rent, room.monthly_rent, Some(room.base_price)]
        .into_iter()
        .flatten()
        .find(|amount| amount.is_positive())
}
