//! Rent and renewal reminders.
//!
//! Reminders are handed to a [`NotificationCenter`], which fires them at
//! some later wall-clock time. Each carries a [`ReminderId`] naming its
//! kind, tenancy and due date, so reminders of one tenancy can be found
//! and revoked without touching any other.

mod center;
mod scheduler;

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use center::{InMemoryCenter, JournalCenter, NotificationCenter, PendingReminder};
pub use scheduler::{spawn_logged, ReminderPolicy, ReminderScheduler, ReminderState, RentPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    RentReminder,
    RentOverdue,
    RenewalReminder,
    RenewalDue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderFamily {
    Rent,
    Renewal,
}

impl ReminderKind {
    pub const ALL: [ReminderKind; 4] = [
        ReminderKind::RentReminder,
        ReminderKind::RentOverdue,
        ReminderKind::RenewalReminder,
        ReminderKind::RenewalDue,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::RentReminder => "rent_reminder",
            ReminderKind::RentOverdue => "rent_overdue",
            ReminderKind::RenewalReminder => "renewal_reminder",
            ReminderKind::RenewalDue => "renewal_due",
        }
    }

    pub fn family(&self) -> ReminderFamily {
        match self {
            ReminderKind::RentReminder | ReminderKind::RentOverdue => ReminderFamily::Rent,
            ReminderKind::RenewalReminder | ReminderKind::RenewalDue => ReminderFamily::Renewal,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("not a reminder identifier: '{0}'")]
pub struct ParseReminderIdError(String);

/// Identifier of a scheduled reminder, rendered as
/// `kind:tenancy_id:due_epoch`.
///
/// Parsing is exact: three fields, a known kind and two integers. Anything
/// else is treated as belonging to another application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReminderId {
    pub kind: ReminderKind,
    pub tenancy_id: i64,
    /// Due date as seconds since the epoch, reading the local date-time as
    /// if it were UTC.
    pub due_epoch: i64,
}

impl ReminderId {
    pub fn new(kind: ReminderKind, tenancy_id: i64, due: NaiveDateTime) -> Self {
        Self {
            kind,
            tenancy_id,
            due_epoch: due.and_utc().timestamp(),
        }
    }

    pub fn belongs_to(&self, tenancy_id: i64, family: ReminderFamily) -> bool {
        self.tenancy_id == tenancy_id && self.kind.family() == family
    }
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind.as_str(), self.tenancy_id, self.due_epoch)
    }
}

impl FromStr for ReminderId {
    type Err = ParseReminderIdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseReminderIdError(raw.to_string());

        let mut fields = raw.split(':');
        let (Some(kind), Some(tenancy_id), Some(due_epoch), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(invalid());
        };

        let kind = ReminderKind::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == kind)
            .ok_or_else(invalid)?;
        let tenancy_id = parse_field(tenancy_id).ok_or_else(invalid)?;
        let due_epoch = parse_field(due_epoch).ok_or_else(invalid)?;

        Ok(Self {
            kind,
            tenancy_id,
            due_epoch,
        })
    }
}

// Rejects the "+7" and "007" spellings `i64::from_str` would accept, so each
// id has exactly one textual form.
fn parse_field(raw: &str) -> Option<i64> {
    let value: i64 = raw.parse().ok()?;
    (value.to_string() == raw).then_some(value)
}

/// A reminder request for the notification center.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    #[serde(serialize_with = "serialize_id")]
    pub id: ReminderId,
    pub fire_at: NaiveDateTime,
    pub title: String,
    pub body: String,
}

fn serialize_id<S: serde::Serializer>(id: &ReminderId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_input;

    #[test]
    fn renders_and_parses() {
        let due = parse_input("2024-03-05").expect("date");
        let id = ReminderId::new(ReminderKind::RentOverdue, 12, due);
        let rendered = id.to_string();
        assert_eq!(rendered, format!("rent_overdue:12:{}", due.and_utc().timestamp()));
        assert_eq!(rendered.parse::<ReminderId>().expect("parse"), id);
    }

    #[test]
    fn tenancy_prefix_does_not_collide() {
        let due = parse_input("2024-03-05").expect("date");
        let one = ReminderId::new(ReminderKind::RentReminder, 1, due);
        let twelve = ReminderId::new(ReminderKind::RentReminder, 12, due);
        assert!(one.belongs_to(1, ReminderFamily::Rent));
        assert!(!twelve.belongs_to(1, ReminderFamily::Rent));
        assert!(!one.belongs_to(1, ReminderFamily::Renewal));
    }

    #[test]
    fn rejects_foreign_identifiers() {
        for raw in [
            "",
            "rent_reminder_1_1709596800.0",
            "rent_reminder:1",
            "rent_reminder:1:2:3",
            "rent_reminders:1:2",
            "rent_reminder:x:2",
            "rent_reminder:01:2",
            "rent_reminder:+1:2",
            "test_overdue:1:2",
        ] {
            assert!(raw.parse::<ReminderId>().is_err(), "{raw}");
        }
    }

    #[test]
    fn negative_epochs_round_trip() {
        let raw = "renewal_due:3:-86400";
        assert_eq!(raw.parse::<ReminderId>().expect("parse").to_string(), raw);
    }
}
