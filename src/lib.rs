//! Landlord's ledger: properties, tenancies and rent payments in a local
//! SQLite database, with rent due-date and lease renewal reminders.

pub mod cli;
pub mod dates;
pub mod db;
pub mod due;
pub mod error;
pub mod ledger;
pub mod models;
pub mod reminder;
pub mod settings;
pub mod store;

pub use dates::DatePolicy;
pub use error::{ModelError, NotifyError, SettingsError, StoreError, StoreResult};
pub use ledger::{Ledger, RenewalCheck, RenewalStage, RentCheck, TenancyOverview};
pub use models::{Address, DueDay, RecordId, RentPayment, Tenancy};
pub use reminder::{
    InMemoryCenter, JournalCenter, NotificationCenter, PendingReminder, ReminderPolicy, ReminderScheduler,
    ReminderState,
};
pub use settings::Settings;
pub use store::Store;
