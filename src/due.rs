//! Rent due dates and lease renewal dates.
//!
//! Everything here is pure: callers supply the tenancy, its latest payment
//! (if any) and the reference time.

use chrono::{Datelike, Duration, Months, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::models::{DueDay, RentPayment, Tenancy};

/// Months after signing at which the renewal notice window opens.
pub const RENEWAL_AFTER_MONTHS: u32 = 11;

/// Moves one calendar month past `reference` and lands on `due_day` at
/// midnight.
///
/// Adding a month clamps to the end of shorter months (Jan 31 becomes the
/// last day of February). If a step cannot produce a valid date the last
/// valid value is returned instead.
pub fn next_due_after(reference: NaiveDateTime, due_day: DueDay) -> NaiveDateTime {
    let stepped = reference
        .checked_add_months(Months::new(1))
        .unwrap_or(reference);
    stepped
        .date()
        .with_day(due_day.get())
        .map(|day| day.and_time(NaiveTime::MIN))
        .unwrap_or(stepped)
}

/// The date the next installment is due: one cycle after the latest
/// payment, or after the lease start when nothing has been paid.
pub fn next_rent_due_date(tenancy: &Tenancy, last_payment: Option<&RentPayment>) -> NaiveDateTime {
    let reference = last_payment
        .map(|payment| payment.paid_on)
        .unwrap_or(tenancy.lease_start_date);
    next_due_after(reference, tenancy.monthly_due_date)
}

pub fn is_overdue(tenancy: &Tenancy, last_payment: Option<&RentPayment>, as_of: NaiveDateTime) -> bool {
    next_rent_due_date(tenancy, last_payment) < as_of
}

pub fn lease_renewal_due_date(tenancy: &Tenancy) -> NaiveDateTime {
    tenancy
        .agreement_signed_date
        .checked_add_months(Months::new(RENEWAL_AFTER_MONTHS))
        .unwrap_or(tenancy.agreement_signed_date)
}

/// Early-warning date `lead` ahead of the renewal due date.
pub fn renewal_reminder_date(tenancy: &Tenancy, lead: Duration) -> NaiveDateTime {
    let due = lease_renewal_due_date(tenancy);
    due.checked_sub_signed(lead).unwrap_or(due)
}

pub fn is_renewal_due(tenancy: &Tenancy, today: NaiveDateTime) -> bool {
    today >= lease_renewal_due_date(tenancy)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RentStatus {
    Upcoming { due: NaiveDateTime, days_until: i64 },
    Overdue { due: NaiveDateTime, days_overdue: i64 },
}

impl RentStatus {
    pub fn due(&self) -> NaiveDateTime {
        match *self {
            RentStatus::Upcoming { due, .. } | RentStatus::Overdue { due, .. } => due,
        }
    }

    pub fn is_overdue(&self) -> bool {
        matches!(self, RentStatus::Overdue { .. })
    }
}

pub fn rent_status(tenancy: &Tenancy, last_payment: Option<&RentPayment>, as_of: NaiveDateTime) -> RentStatus {
    let due = next_rent_due_date(tenancy, last_payment);
    if due < as_of {
        RentStatus::Overdue {
            due,
            days_overdue: (as_of.date() - due.date()).num_days(),
        }
    } else {
        RentStatus::Upcoming {
            due,
            days_until: (due.date() - as_of.date()).num_days(),
        }
    }
}
