use std::future::Future;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Notification, NotificationCenter, ReminderFamily, ReminderId, ReminderKind};
use crate::due;
use crate::error::NotifyError;
use crate::models::{format_rupees, RentPayment, Tenancy};

/// Lifecycle of the reminders for one tenancy's current due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderState {
    None,
    ReminderScheduled,
    OverdueScheduled,
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderPolicy {
    /// How long before a rent due date the reminder fires.
    pub rent_lead: Duration,
    /// How long before the renewal date the early warning fires.
    pub renewal_lead: Duration,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            rent_lead: Duration::days(3),
            renewal_lead: Duration::days(7),
        }
    }
}

/// Requests to submit for one rent due date, and the state they put the
/// tenancy in.
#[derive(Debug, Clone, PartialEq)]
pub struct RentPlan {
    pub state: ReminderState,
    pub notifications: Vec<Notification>,
}

/// Turns due dates into notification requests and keeps at most one set of
/// pending requests per tenancy and family.
pub struct ReminderScheduler<C> {
    center: Arc<C>,
    policy: ReminderPolicy,
}

impl<C> Clone for ReminderScheduler<C> {
    fn clone(&self) -> Self {
        Self {
            center: Arc::clone(&self.center),
            policy: self.policy,
        }
    }
}

impl<C: NotificationCenter> ReminderScheduler<C> {
    pub fn new(center: Arc<C>, policy: ReminderPolicy) -> Self {
        Self { center, policy }
    }

    pub fn center(&self) -> &Arc<C> {
        &self.center
    }

    pub fn policy(&self) -> ReminderPolicy {
        self.policy
    }

    /// Works out which requests a due date needs as of `as_of`.
    ///
    /// Before the due date: a reminder `rent_lead` ahead (dropped if that
    /// moment has already passed) plus an overdue signal at the due date.
    /// On or after it: a single overdue signal firing at `as_of`.
    pub fn plan_rent(&self, tenancy_id: i64, tenancy: &Tenancy, due: NaiveDateTime, as_of: NaiveDateTime) -> RentPlan {
        let amount = format_rupees(tenancy.agreed_rent);

        if as_of < due {
            let mut notifications = Vec::with_capacity(2);
            let remind_at = due.checked_sub_signed(self.policy.rent_lead).unwrap_or(due);
            if remind_at > as_of {
                notifications.push(Notification {
                    id: ReminderId::new(ReminderKind::RentReminder, tenancy_id, due),
                    fire_at: remind_at,
                    title: "Rent Payment Due".to_string(),
                    body: format!("Rent payment of {amount} is due for {}", tenancy.name),
                });
            }
            notifications.push(Notification {
                id: ReminderId::new(ReminderKind::RentOverdue, tenancy_id, due),
                fire_at: due,
                title: "Rent Payment Overdue".to_string(),
                body: format!("Rent payment for {} is now overdue", tenancy.name),
            });
            return RentPlan {
                state: ReminderState::ReminderScheduled,
                notifications,
            };
        }

        RentPlan {
            state: ReminderState::OverdueScheduled,
            notifications: vec![Notification {
                id: ReminderId::new(ReminderKind::RentOverdue, tenancy_id, due),
                fire_at: as_of,
                title: "Rent Payment Overdue!".to_string(),
                body: format!(
                    "Rent payment of {amount} for {} was due on {}",
                    tenancy.name,
                    due.format("%d %b %Y")
                ),
            }],
        }
    }

    /// Replaces the tenancy's pending rent requests with those for `due`.
    pub async fn schedule_rent(
        &self,
        tenancy: &Tenancy,
        due: NaiveDateTime,
        as_of: NaiveDateTime,
    ) -> Result<ReminderState, NotifyError> {
        let tenancy_id = require_saved(tenancy)?;
        self.clear_rent(tenancy_id).await?;

        let plan = self.plan_rent(tenancy_id, tenancy, due, as_of);
        for notification in plan.notifications {
            debug!(id = %notification.id, fire_at = %notification.fire_at, "scheduling rent notification");
            self.center.schedule(notification).await?;
        }
        info!(tenancy_id, due = %due, state = ?plan.state, "scheduled rent reminders");
        Ok(plan.state)
    }

    /// A payment settles the current cycle: its requests are revoked and the
    /// next cycle, counted from the payment date, is scheduled.
    pub async fn on_payment_recorded(
        &self,
        tenancy: &Tenancy,
        payment: &RentPayment,
        as_of: NaiveDateTime,
    ) -> Result<ReminderState, NotifyError> {
        let tenancy_id = require_saved(tenancy)?;
        let cleared = self.clear_rent(tenancy_id).await?;
        debug!(tenancy_id, cleared, state = ?ReminderState::Cleared, "payment recorded");

        let next_due = due::next_due_after(payment.paid_on, tenancy.monthly_due_date);
        self.schedule_rent(tenancy, next_due, as_of).await
    }

    /// Replaces the tenancy's renewal requests: an early warning
    /// `renewal_lead` ahead of the renewal date and a signal on the date
    /// itself, or immediately once it has passed.
    pub async fn schedule_renewal(&self, tenancy: &Tenancy, today: NaiveDateTime) -> Result<usize, NotifyError> {
        let tenancy_id = require_saved(tenancy)?;
        self.clear_renewal(tenancy_id).await?;

        let renewal = due::lease_renewal_due_date(tenancy);
        let remind_at = due::renewal_reminder_date(tenancy, self.policy.renewal_lead);
        let mut scheduled = 0;

        if remind_at > today {
            self.center
                .schedule(Notification {
                    id: ReminderId::new(ReminderKind::RenewalReminder, tenancy_id, renewal),
                    fire_at: remind_at,
                    title: "Tenancy Renewal Approaching".to_string(),
                    body: format!(
                        "Tenancy agreement for {} is due for renewal in {} days.",
                        tenancy.name,
                        self.policy.renewal_lead.num_days()
                    ),
                })
                .await?;
            scheduled += 1;
        }

        self.center
            .schedule(Notification {
                id: ReminderId::new(ReminderKind::RenewalDue, tenancy_id, renewal),
                fire_at: renewal.max(today),
                title: "Tenancy Renewal Due".to_string(),
                body: format!(
                    "Tenancy agreement for {} expires in 1 month. Consider renewal urgently!",
                    tenancy.name
                ),
            })
            .await?;
        scheduled += 1;

        info!(tenancy_id, renewal = %renewal, scheduled, "scheduled renewal reminders");
        Ok(scheduled)
    }

    pub async fn clear_rent(&self, tenancy_id: i64) -> Result<usize, NotifyError> {
        self.clear_matching(|id| id.belongs_to(tenancy_id, ReminderFamily::Rent))
            .await
    }

    pub async fn clear_renewal(&self, tenancy_id: i64) -> Result<usize, NotifyError> {
        self.clear_matching(|id| id.belongs_to(tenancy_id, ReminderFamily::Renewal))
            .await
    }

    pub async fn clear_tenancy(&self, tenancy_id: i64) -> Result<usize, NotifyError> {
        self.clear_matching(|id| id.tenancy_id == tenancy_id).await
    }

    /// Clears every request this application scheduled. Foreign
    /// identifiers are left alone.
    pub async fn clear_all(&self) -> Result<usize, NotifyError> {
        self.clear_matching(|_| true).await
    }

    async fn clear_matching<F>(&self, matches: F) -> Result<usize, NotifyError>
    where
        F: Fn(&ReminderId) -> bool,
    {
        let doomed: Vec<String> = self
            .center
            .pending()
            .await?
            .into_iter()
            .filter(|raw| raw.parse::<ReminderId>().is_ok_and(|id| matches(&id)))
            .collect();

        if doomed.is_empty() {
            return Ok(0);
        }

        self.center.cancel(&doomed).await?;
        debug!(count = doomed.len(), "cleared notifications");
        Ok(doomed.len())
    }
}

fn require_saved(tenancy: &Tenancy) -> Result<i64, NotifyError> {
    tenancy
        .id
        .saved()
        .ok_or_else(|| NotifyError::Rejected(format!("tenancy '{}' has not been saved", tenancy.name)))
}

/// Runs a scheduling call in the background. A failure is logged at `warn`
/// and goes no further.
pub fn spawn_logged<F, T>(label: &'static str, task: F) -> JoinHandle<()>
where
    F: Future<Output = Result<T, NotifyError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(async move {
        if let Err(err) = task.await {
            warn!(task = label, error = %err, "reminder scheduling failed");
        }
    })
}
