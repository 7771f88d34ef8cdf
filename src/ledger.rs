//! Application service: the commands and read models a front end uses.
//!
//! Store failures are returned to the caller. Reminder failures are logged
//! and dropped; a missing reminder never fails a save.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};

use crate::due::{self, RentStatus};
use crate::error::{NotifyError, StoreResult};
use crate::models::{Address, RentPayment, Tenancy};
use crate::reminder::{NotificationCenter, ReminderScheduler, ReminderState};
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct TenancyOverview {
    pub tenancy: Tenancy,
    pub latest_payment: Option<RentPayment>,
    pub rent: RentStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct RentCheck {
    pub tenancy_id: i64,
    pub name: String,
    pub next_due: NaiveDateTime,
    pub overdue: bool,
    /// `None` when the reminders could not be scheduled.
    pub reminders: Option<ReminderState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewalStage {
    /// The renewal date has been reached.
    Due,
    /// Inside the early-warning window before the renewal date.
    Approaching,
    /// Both reminders still lie in the future.
    Scheduled,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenewalCheck {
    pub tenancy_id: i64,
    pub name: String,
    pub agreement_signed: NaiveDateTime,
    pub renewal_due: NaiveDateTime,
    pub reminder_at: NaiveDateTime,
    pub stage: RenewalStage,
}

pub struct Ledger<C> {
    store: Store,
    scheduler: ReminderScheduler<C>,
}

impl<C: NotificationCenter> Ledger<C> {
    pub fn new(store: Store, scheduler: ReminderScheduler<C>) -> Self {
        Self { store, scheduler }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn scheduler(&self) -> &ReminderScheduler<C> {
        &self.scheduler
    }

    pub fn relocate(&mut self, dir: &Path) -> StoreResult<()> {
        self.store.relocate(dir)
    }

    // Addresses

    pub fn save_address(&self, address: &mut Address) -> StoreResult<i64> {
        self.store.save_address(address)
    }

    pub fn update_address(&self, address: &Address) -> StoreResult<()> {
        self.store.update_address(address)
    }

    pub fn delete_address(&self, id: i64) -> StoreResult<()> {
        self.store.delete_address(id)
    }

    pub fn addresses(&self) -> StoreResult<Vec<Address>> {
        self.store.get_all_addresses()
    }

    pub fn address(&self, id: i64) -> StoreResult<Option<Address>> {
        self.store.get_address(id)
    }

    // Tenancies

    /// Saves a new tenancy and schedules its first rent cycle and its
    /// renewal reminders.
    pub async fn save_tenancy(&self, tenancy: &mut Tenancy, as_of: NaiveDateTime) -> StoreResult<i64> {
        let id = self.store.save_tenancy(tenancy)?;
        self.refresh_reminders(tenancy, None, as_of).await;
        Ok(id)
    }

    /// Updates a tenancy. The due day or signing date may have moved, so
    /// both reminder families are rebuilt.
    pub async fn update_tenancy(&self, tenancy: &Tenancy, as_of: NaiveDateTime) -> StoreResult<()> {
        self.store.update_tenancy(tenancy)?;
        let id = tenancy.id.require("tenancy")?;
        let latest = self.store.get_latest_rent_payment(id)?;
        self.refresh_reminders(tenancy, latest.as_ref(), as_of).await;
        Ok(())
    }

    pub async fn delete_tenancy(&self, id: i64) -> StoreResult<()> {
        self.store.delete_tenancy(id)?;
        log_outcome("clear_tenancy", id, self.scheduler.clear_tenancy(id).await);
        Ok(())
    }

    pub fn tenancies(&self) -> StoreResult<Vec<Tenancy>> {
        self.store.get_all_tenancies()
    }

    pub fn tenancy(&self, id: i64) -> StoreResult<Option<Tenancy>> {
        self.store.get_tenancy(id)
    }

    // Rent

    /// Appends a payment, then revokes the tenancy's pending rent reminders
    /// and schedules the next cycle. The cycle runs from the latest payment
    /// on file, so a back-dated entry leaves it unchanged.
    pub async fn record_rent_payment(&self, payment: &mut RentPayment, as_of: NaiveDateTime) -> StoreResult<i64> {
        let id = self.store.save_rent_payment(payment)?;

        match self.store.get_tenancy(payment.tenancy_id)? {
            Some(tenancy) => {
                let latest = self.store.get_latest_rent_payment(payment.tenancy_id)?;
                let settled_by = latest.as_ref().unwrap_or(&*payment);
                log_outcome(
                    "on_payment_recorded",
                    payment.tenancy_id,
                    self.scheduler.on_payment_recorded(&tenancy, settled_by, as_of).await,
                );
            }
            None => warn!(tenancy_id = payment.tenancy_id, "payment saved for missing tenancy"),
        }

        Ok(id)
    }

    pub fn rent_payments(&self, tenancy_id: i64) -> StoreResult<Vec<RentPayment>> {
        self.store.get_rent_payments(tenancy_id)
    }

    pub fn all_rent_payments(&self) -> StoreResult<Vec<RentPayment>> {
        self.store.get_all_rent_payments()
    }

    pub fn latest_rent_payment(&self, tenancy_id: i64) -> StoreResult<Option<RentPayment>> {
        self.store.get_latest_rent_payment(tenancy_id)
    }

    pub fn latest_rent_payments(&self) -> StoreResult<Vec<RentPayment>> {
        self.store.get_latest_rent_payments()
    }

    pub fn next_rent_due_date(&self, tenancy: &Tenancy) -> StoreResult<NaiveDateTime> {
        let id = tenancy.id.require("tenancy")?;
        let latest = self.store.get_latest_rent_payment(id)?;
        Ok(due::next_rent_due_date(tenancy, latest.as_ref()))
    }

    /// Every tenancy with its latest payment and rent status.
    pub fn rent_overview(&self, as_of: NaiveDateTime) -> StoreResult<Vec<TenancyOverview>> {
        let mut latest: HashMap<i64, RentPayment> = self
            .store
            .get_latest_rent_payments()?
            .into_iter()
            .map(|payment| (payment.tenancy_id, payment))
            .collect();

        Ok(self
            .store
            .get_all_tenancies()?
            .into_iter()
            .map(|tenancy| {
                let latest_payment = tenancy.id.saved().and_then(|id| latest.remove(&id));
                let rent = due::rent_status(&tenancy, latest_payment.as_ref(), as_of);
                TenancyOverview {
                    tenancy,
                    latest_payment,
                    rent,
                }
            })
            .collect())
    }

    /// Re-reads every tenancy and its latest payment and reschedules its
    /// rent reminders. Safe to run at any time, e.g. when a delivered
    /// reminder wakes the app.
    pub async fn check_overdue_rent(&self, as_of: NaiveDateTime) -> StoreResult<Vec<RentCheck>> {
        let mut checks = Vec::new();
        for tenancy in self.store.get_all_tenancies()? {
            let Some(id) = tenancy.id.saved() else { continue };
            let latest = self.store.get_latest_rent_payment(id)?;
            let next_due = due::next_rent_due_date(&tenancy, latest.as_ref());
            let reminders = log_outcome(
                "schedule_rent",
                id,
                self.scheduler.schedule_rent(&tenancy, next_due, as_of).await,
            );
            checks.push(RentCheck {
                tenancy_id: id,
                name: tenancy.name,
                next_due,
                overdue: next_due < as_of,
                reminders,
            });
        }

        let overdue = checks.iter().filter(|check| check.overdue).count();
        info!(tenancies = checks.len(), overdue, "checked rent");
        Ok(checks)
    }

    /// Reschedules renewal reminders for every tenancy and reports where
    /// each one stands.
    pub async fn check_renewals(&self, today: NaiveDateTime) -> StoreResult<Vec<RenewalCheck>> {
        let lead = self.scheduler.policy().renewal_lead;
        let mut checks = Vec::new();
        for tenancy in self.store.get_all_tenancies()? {
            let Some(id) = tenancy.id.saved() else { continue };
            log_outcome("schedule_renewal", id, self.scheduler.schedule_renewal(&tenancy, today).await);

            let renewal_due = due::lease_renewal_due_date(&tenancy);
            let reminder_at = due::renewal_reminder_date(&tenancy, lead);
            let stage = if renewal_due <= today {
                RenewalStage::Due
            } else if reminder_at <= today {
                RenewalStage::Approaching
            } else {
                RenewalStage::Scheduled
            };
            info!(tenancy_id = id, renewal_due = %renewal_due, stage = ?stage, "checked renewal");

            checks.push(RenewalCheck {
                tenancy_id: id,
                agreement_signed: tenancy.agreement_signed_date,
                name: tenancy.name,
                renewal_due,
                reminder_at,
                stage,
            });
        }
        Ok(checks)
    }

    async fn refresh_reminders(&self, tenancy: &Tenancy, latest: Option<&RentPayment>, as_of: NaiveDateTime) {
        let Some(id) = tenancy.id.saved() else { return };
        let next_due = due::next_rent_due_date(tenancy, latest);
        log_outcome("schedule_rent", id, self.scheduler.schedule_rent(tenancy, next_due, as_of).await);
        log_outcome("schedule_renewal", id, self.scheduler.schedule_renewal(tenancy, as_of).await);
    }
}

fn log_outcome<T: Debug>(label: &'static str, tenancy_id: i64, result: Result<T, NotifyError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(task = label, tenancy_id, error = %err, "reminder scheduling failed");
            None
        }
    }
}
