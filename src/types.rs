use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for a tenancy contract (booking)
pub type ContractId = Uuid;
/// unique identifier for a ledger entry
pub type EntryId = Uuid;
/// unique identifier for an occupant
pub type OccupantId = Uuid;
/// unique identifier for a room
pub type RoomId = Uuid;
/// unique identifier for a property
pub type PropertyId = Uuid;

/// tenancy contract status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractStatus {
    /// contract agreed, occupant not yet moved in
    Confirmed,
    /// occupant currently resident, rent accrues
    CheckedIn,
    /// tenancy ended
    CheckedOut,
    /// contract cancelled before check-in
    Cancelled,
}

impl ContractStatus {
    /// statuses for which monthly rent obligations are raised
    pub fn is_billable(&self) -> bool {
        matches!(self, ContractStatus::Confirmed | ContractStatus::CheckedIn)
    }
}

/// ledger entry type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    /// manually raised rent charge
    Rent,
    /// system-generated monthly rent obligation
    MonthlyRent,
    SecurityDeposit,
    SecurityRefund,
    LateFee,
    /// surplus received beyond all outstanding obligations
    Advance,
    Maintenance,
    Other,
}

/// duplicate-guard bucket for obligation-class entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObligationClass {
    Rent,
    Deposit,
}

impl EntryType {
    /// rent-class entries share one duplicate-guard bucket and are the
    /// only entries eligible for late fees
    pub fn is_rent_class(&self) -> bool {
        matches!(self, EntryType::Rent | EntryType::MonthlyRent)
    }

    /// duplicate-guard bucket, if this type is subject to the
    /// one-open-obligation-per-month rule
    pub fn obligation_class(&self) -> Option<ObligationClass> {
        match self {
            EntryType::Rent | EntryType::MonthlyRent => Some(ObligationClass::Rent),
            EntryType::SecurityDeposit => Some(ObligationClass::Deposit),
            _ => None,
        }
    }

    /// obligation-class entries are subject to the one-per-month guard
    pub fn is_obligation_class(&self) -> bool {
        self.obligation_class().is_some()
    }
}

/// ledger entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    /// obligation raised, money not yet received
    Pending,
    /// past grace period, late fee applied
    Overdue,
    Paid,
    Rejected,
    Failed,
    Refunded,
    /// administratively cancelled, replaces physical deletion
    Voided,
}

impl EntryStatus {
    /// terminal entries no longer count toward duplicate guards or balances
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EntryStatus::Rejected | EntryStatus::Failed | EntryStatus::Refunded | EntryStatus::Voided
        )
    }

    /// an outstanding obligation still awaits settlement
    pub fn is_outstanding(&self) -> bool {
        matches!(self, EntryStatus::Pending | EntryStatus::Overdue)
    }
}

/// payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Upi,
    Card,
    Online,
    Other,
}

/// refund request status (lifecycle beyond Pending is handled externally)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefundStatus {
    Pending,
    Approved,
    Rejected,
}

/// canonical billing month for an obligation
///
/// Fields are private so every instance passes through a validating
/// constructor; `label` and `first_day` rely on that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawBillingPeriod")]
pub struct BillingPeriod {
    year: i32,
    month: u32,
}

/// wire shape of a billing period, revalidated on deserialization
#[derive(Deserialize)]
struct RawBillingPeriod {
    year: i32,
    month: u32,
}

impl TryFrom<RawBillingPeriod> for BillingPeriod {
    type Error = crate::errors::LedgerError;

    fn try_from(raw: RawBillingPeriod) -> crate::errors::Result<Self> {
        Self::new(raw.year, raw.month)
    }
}

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

impl BillingPeriod {
    /// validated constructor; rejects months outside 1..=12 and years the
    /// calendar cannot represent
    pub fn new(year: i32, month: u32) -> crate::errors::Result<Self> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(crate::errors::LedgerError::InvalidPeriod { year, month });
        }
        Ok(Self { year, month })
    }

    /// period containing the given date
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// canonical "Month Year" label, e.g. "January 2026"
    pub fn label(&self) -> String {
        format!("{} {}", MONTH_NAMES[(self.month - 1) as usize], self.year)
    }

    /// the 1st of the billing month, used as obligation due date
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .expect("billing period holds a representable year and month")
    }

    /// following calendar month, saturating at the last month the calendar
    /// can represent
    pub fn next(&self) -> Self {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        if NaiveDate::from_ymd_opt(year, month, 1).is_some() {
            Self { year, month }
        } else {
            *self
        }
    }

    /// all whole calendar months from `start` through `end` inclusive
    pub fn span(start: NaiveDate, end: NaiveDate) -> Vec<BillingPeriod> {
        let mut periods = Vec::new();
        let mut current = BillingPeriod::from_date(start);
        let last = BillingPeriod::from_date(end);
        while current <= last {
            periods.push(current);
            let following = current.next();
            if following == current {
                break;
            }
            current = following;
        }
        periods
    }
}
