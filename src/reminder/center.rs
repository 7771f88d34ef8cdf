use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::Notification;
use crate::dates::{format_stored, DatePolicy};
use crate::error::NotifyError;
use crate::store::read_date;

pub const JOURNAL_FILE_NAME: &str = "reminders.sqlite3";

/// The service that delivers reminders at their fire time.
///
/// Identifiers are opaque strings to the center; it may hold requests
/// from other applications too.
#[async_trait]
pub trait NotificationCenter: Send + Sync {
    /// Adds a request, replacing any pending one with the same identifier.
    async fn schedule(&self, notification: Notification) -> Result<(), NotifyError>;

    /// Removes pending requests. Unknown identifiers are ignored.
    async fn cancel(&self, ids: &[String]) -> Result<(), NotifyError>;

    /// Identifiers of every pending request.
    async fn pending(&self) -> Result<Vec<String>, NotifyError>;
}

/// A request as held by a center, keyed by its raw identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingReminder {
    pub id: String,
    pub fire_at: NaiveDateTime,
    pub title: String,
    pub body: String,
}

impl From<Notification> for PendingReminder {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id.to_string(),
            fire_at: notification.fire_at,
            title: notification.title,
            body: notification.body,
        }
    }
}

/// Process-local center. `denied()` builds one that rejects every request,
/// as a device without notification permission would.
#[derive(Debug, Default)]
pub struct InMemoryCenter {
    pending: tokio::sync::Mutex<BTreeMap<String, PendingReminder>>,
    denied: bool,
}

impl InMemoryCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn denied() -> Self {
        Self {
            denied: true,
            ..Self::default()
        }
    }

    /// Adds a request under an arbitrary identifier.
    pub async fn schedule_raw(&self, reminder: PendingReminder) {
        self.pending.lock().await.insert(reminder.id.clone(), reminder);
    }

    pub async fn notifications(&self) -> Vec<PendingReminder> {
        self.pending.lock().await.values().cloned().collect()
    }

    /// Removes and returns every request whose fire time has passed.
    pub async fn deliver_due(&self, now: NaiveDateTime) -> Vec<PendingReminder> {
        let mut pending = self.pending.lock().await;
        let due: Vec<String> = pending
            .values()
            .filter(|reminder| reminder.fire_at <= now)
            .map(|reminder| reminder.id.clone())
            .collect();
        due.iter().filter_map(|id| pending.remove(id)).collect()
    }
}

#[async_trait]
impl NotificationCenter for InMemoryCenter {
    async fn schedule(&self, notification: Notification) -> Result<(), NotifyError> {
        if self.denied {
            return Err(NotifyError::Rejected("notifications are not authorized".to_string()));
        }
        let reminder = PendingReminder::from(notification);
        self.pending.lock().await.insert(reminder.id.clone(), reminder);
        Ok(())
    }

    async fn cancel(&self, ids: &[String]) -> Result<(), NotifyError> {
        let mut pending = self.pending.lock().await;
        for id in ids {
            pending.remove(id);
        }
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<String>, NotifyError> {
        Ok(self.pending.lock().await.keys().cloned().collect())
    }
}

/// Center backed by a small SQLite journal, so pending reminders survive
/// between runs of the command line tool.
#[derive(Clone)]
pub struct JournalCenter {
    conn: Arc<Mutex<Connection>>,
}

impl JournalCenter {
    pub fn open(dir: &Path) -> Result<Self, NotifyError> {
        Self::with_connection(open_journal(dir)?)
    }

    pub fn open_in_memory() -> Result<Self, NotifyError> {
        let conn = Connection::open_in_memory()?;
        init_journal(&conn)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, NotifyError> {
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Switches every clone of this center to the journal inside `dir`.
    /// Requests pending in the old journal stay there.
    pub fn relocate(&self, dir: &Path) -> Result<(), NotifyError> {
        let conn = open_journal(dir)?;
        let mut guard = self.conn.lock().map_err(|_| NotifyError::Poisoned)?;
        let previous = std::mem::replace(&mut *guard, conn);
        if let Err((_, err)) = previous.close() {
            warn!(error = %err, "failed to close previous reminder journal");
        }
        info!(path = %dir.display(), "relocated reminder journal");
        Ok(())
    }

    async fn with_conn<T, F>(&self, op_name: &'static str, f: F) -> Result<T, NotifyError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| NotifyError::Poisoned)?;
            f(&guard).map_err(|err| {
                warn!(op = op_name, error = %err, "reminder journal operation failed");
                NotifyError::Journal(err)
            })
        })
        .await?
    }

    pub async fn notifications(&self) -> Result<Vec<PendingReminder>, NotifyError> {
        self.with_conn("notifications", |conn| {
            let mut stmt = conn.prepare("SELECT id, fireAt, title, body FROM reminders ORDER BY fireAt, id")?;
            let rows = stmt.query_map([], |row| {
                Ok(PendingReminder {
                    id: row.get(0)?,
                    fire_at: read_date(row, 1, DatePolicy::Lenient)?,
                    title: row.get(2)?,
                    body: row.get(3)?,
                })
            })?;
            let reminders = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(reminders)
        })
        .await
    }
}

#[async_trait]
impl NotificationCenter for JournalCenter {
    async fn schedule(&self, notification: Notification) -> Result<(), NotifyError> {
        let reminder = PendingReminder::from(notification);
        debug!(id = %reminder.id, fire_at = %reminder.fire_at, "journaling reminder");
        self.with_conn("schedule", move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO reminders (id, fireAt, title, body) VALUES (?1, ?2, ?3, ?4)",
                params![
                    reminder.id,
                    format_stored(&reminder.fire_at),
                    reminder.title,
                    reminder.body
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn cancel(&self, ids: &[String]) -> Result<(), NotifyError> {
        let ids = ids.to_vec();
        self.with_conn("cancel", move |conn| {
            let mut stmt = conn.prepare("DELETE FROM reminders WHERE id = ?1")?;
            for id in &ids {
                stmt.execute([id])?;
            }
            Ok(())
        })
        .await
    }

    async fn pending(&self) -> Result<Vec<String>, NotifyError> {
        self.with_conn("pending", |conn| {
            let mut stmt = conn.prepare("SELECT id FROM reminders ORDER BY id")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let ids = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids)
        })
        .await
    }
}

fn open_journal(dir: &Path) -> Result<Connection, NotifyError> {
    fs::create_dir_all(dir)?;
    let conn = Connection::open(dir.join(JOURNAL_FILE_NAME))?;
    init_journal(&conn)?;
    Ok(conn)
}

fn init_journal(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS reminders (
          id TEXT PRIMARY KEY NOT NULL,
          fireAt TEXT NOT NULL,
          title TEXT NOT NULL,
          body TEXT NOT NULL
        );",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_input;
    use crate::reminder::{ReminderId, ReminderKind};

    fn notification(tenancy_id: i64, due: &str) -> Notification {
        let due = parse_input(due).expect("date");
        Notification {
            id: ReminderId::new(ReminderKind::RentOverdue, tenancy_id, due),
            fire_at: due,
            title: "Rent Payment Overdue".to_string(),
            body: "Rent payment for A is now overdue".to_string(),
        }
    }

    #[tokio::test]
    async fn journal_schedules_and_cancels() {
        let center = JournalCenter::open_in_memory().expect("journal");
        let first = notification(1, "2024-03-05");
        let second = notification(2, "2024-03-10");
        center.schedule(first.clone()).await.expect("schedule");
        center.schedule(second.clone()).await.expect("schedule");
        center.schedule(first.clone()).await.expect("reschedule");

        assert_eq!(center.pending().await.expect("pending").len(), 2);

        center
            .cancel(&[first.id.to_string(), "unknown".to_string()])
            .await
            .expect("cancel");
        let remaining = center.notifications().await.expect("notifications");
        assert_eq!(remaining, vec![PendingReminder::from(second)]);
    }

    #[tokio::test]
    async fn journal_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let center = JournalCenter::open(dir.path()).expect("journal");
            center.schedule(notification(7, "2024-05-01")).await.expect("schedule");
        }
        let reopened = JournalCenter::open(dir.path()).expect("reopen");
        assert_eq!(reopened.pending().await.expect("pending").len(), 1);
    }

    #[tokio::test]
    async fn relocated_journal_is_shared_by_clones() {
        let first = tempfile::tempdir().expect("tempdir");
        let second = tempfile::tempdir().expect("tempdir");
        let center = JournalCenter::open(first.path()).expect("journal");
        let clone = center.clone();
        center.schedule(notification(1, "2024-03-05")).await.expect("schedule");

        center.relocate(second.path()).expect("relocate");
        assert!(second.path().join(JOURNAL_FILE_NAME).exists());
        assert!(clone.pending().await.expect("pending").is_empty());

        clone.schedule(notification(2, "2024-03-10")).await.expect("schedule");
        let moved = JournalCenter::open(second.path()).expect("reopen second");
        assert_eq!(moved.pending().await.expect("pending").len(), 1);
        let original = JournalCenter::open(first.path()).expect("reopen first");
        assert_eq!(original.pending().await.expect("pending").len(), 1);
    }

    #[tokio::test]
    async fn unreadable_fire_time_still_lists() {
        let center = JournalCenter::open_in_memory().expect("journal");
        {
            let conn = center.conn.lock().expect("lock");
            conn.execute(
                "INSERT INTO reminders (id, fireAt, title, body) VALUES ('x', 'not a date', 't', 'b')",
                [],
            )
            .expect("insert");
        }
        let listed = center.notifications().await.expect("notifications");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "x");
    }

    #[tokio::test]
    async fn in_memory_delivers_due_requests() {
        let center = InMemoryCenter::new();
        center.schedule(notification(1, "2024-03-05")).await.expect("schedule");
        center.schedule(notification(1, "2024-04-05")).await.expect("schedule");

        let delivered = center.deliver_due(parse_input("2024-03-06").expect("date")).await;
        assert_eq!(delivered.len(), 1);
        assert_eq!(center.notifications().await.len(), 1);
    }

    #[tokio::test]
    async fn denied_center_rejects() {
        let center = InMemoryCenter::denied();
        assert!(matches!(
            center.schedule(notification(1, "2024-03-05")).await,
            Err(NotifyError::Rejected(_))
        ));
        assert!(center.pending().await.expect("pending").is_empty());
    }
}
