pub mod address;
pub mod check;
pub mod reminders;
pub mod rent;
pub mod settings;
pub mod tenancy;
