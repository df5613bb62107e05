use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::model::LedgerEntry;
use crate::store::{EntryFilter, LedgerStore};
use crate::types::{ContractId, EntryStatus, OccupantId, PropertyId};

/// read-side totals over the ledger
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FinancialSummary {
    /// all money ever received (Paid entries)
    pub total_revenue: Money,
    /// Paid entries dated within the `as_of` month
    pub period_revenue: Money,
    /// open Pending obligations
    pub pending_receivables: Money,
    /// open Overdue obligations
    pub overdue_liability: Money,
}

/// pure read-side summation over ledger entries, optionally scoped to a
/// property
///
/// Totals are recomputed per call by summing matching entries in memory; no
/// caching. Production hosts with large ledgers would push these sums into
/// the database instead.
pub struct FinancialAggregator<'a, S: LedgerStore> {
    store: &'a S,
}

impl<'a, S: LedgerStore> FinancialAggregator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn summary(&self, property: Option<PropertyId>, as_of: NaiveDate) -> Result<FinancialSummary> {
        let entries = self.scoped_entries(property)?;
        let mut summary = FinancialSummary::default();

        for entry in &entries {
            match entry.status {
                EntryStatus::Paid => {
                    summary.total_revenue += entry.amount;
                    let txn_date = entry.transaction_date.date_naive();
                    if txn_date.year() == as_of.year() && txn_date.month() == as_of.month() {
                        summary.period_revenue += entry.amount;
                    }
                }
                EntryStatus::Pending => summary.pending_receivables += entry.amount,
                EntryStatus::Overdue => summary.overdue_liability += entry.amount,
                _ => {}
            }
        }
        Ok(summary)
    }

    /// outstanding (Pending + Overdue) balance per occupant
    pub fn occupant_outstanding(&self, property: Option<PropertyId>) -> Result<HashMap<OccupantId, Money>> {
        let entries = self.scoped_entries(property)?;
        let mut balances: HashMap<OccupantId, Money> = HashMap::new();
        for entry in entries {
            if entry.status.is_outstanding() {
                *balances.entry(entry.occupant_id).or_insert(Money::ZERO) += entry.amount;
            }
        }
        Ok(balances)
    }

    /// entries in scope; a property scope keeps only entries whose contract
    /// belongs to a room of that property (contract-less entries drop out)
    fn scoped_entries(&self, property: Option<PropertyId>) -> Result<Vec<LedgerEntry>> {
        let entries = self
            .store
            .entries(&EntryFilter::default())
            .map_err(aggregation)?;

        let Some(property) = property else {
            return Ok(entries);
        };

        let mut in_scope: HashSet<ContractId> = HashSet::new();
        for contract in self.store.contracts().map_err(aggregation)? {
            let room = self.store.room(contract.room_id).map_err(aggregation)?;
            if room.property_id == property {
                in_scope.insert(contract.id);
            }
        }

        Ok(entries
            .into_iter()
            .filter(|e| e.contract_id.is_some_and(|id| in_scope.contains(&id)))
            .collect())
    }
}

fn aggregation(err: LedgerError) -> LedgerError {
    LedgerError::AggregationFailed {
        message: err.to_string(),
    }
}
