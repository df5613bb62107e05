use chrono::NaiveDate;
use uuid::Uuid;

use crate::types::EntryType;

/// generator for the human-readable secondary id carried by every ledger
/// entry, pluggable so hosts can keep their own numbering scheme
///
/// The id is computed before the entry is inserted, so no row ever exists
/// without its public identifier.
pub trait ReceiptIdGenerator: Send + Sync {
    fn generate(&self, entry_type: EntryType, on: NaiveDate) -> String;
}

/// default generator: type prefix, date, and a short random suffix,
/// e.g. "RENT-20260826-9F3A2C1B"
#[derive(Debug, Clone, Default)]
pub struct ShortUuidReceipts;

fn type_prefix(entry_type: EntryType) -> &'static str {
    match entry_type {
        EntryType::Rent | EntryType::MonthlyRent => "RENT",
        EntryType::SecurityDeposit => "DEP",
        EntryType::SecurityRefund => "REF",
        EntryType::LateFee => "FEE",
        EntryType::Advance => "ADV",
        EntryType::Maintenance => "MNT",
        EntryType::Other => "PAY",
    }
}

impl ReceiptIdGenerator for ShortUuidReceipts {
    fn generate(&self, entry_type: EntryType, on: NaiveDate) -> String {
        let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
        format!(
            "{}-{}-{}",
            type_prefix(entry_type),
            on.format("%Y%m%d"),
            suffix
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_shape() {
        let gen = ShortUuidReceipts;
        let on = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        let id = gen.generate(EntryType::MonthlyRent, on);
        assert!(id.starts_with("RENT-20260826-"));
        assert_eq!(id.len(), "RENT-20260826-".len() + 8);
    }

    #[test]
    fn test_receipts_are_distinct() {
        let gen = ShortUuidReceipts;
        let on = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        let a = gen.generate(EntryType::Advance, on);
        let b = gen.generate(EntryType::Advance, on);
        assert_ne!(a, b);
    }
}
