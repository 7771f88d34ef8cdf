use chrono::NaiveDateTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::dates;
use crate::error::{ModelError, StoreError};

/// Identity of a record: assigned by the store on first save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "id", rename_all = "lowercase")]
pub enum RecordId {
    #[default]
    Unsaved,
    Saved(i64),
}

impl RecordId {
    pub fn saved(self) -> Option<i64> {
        match self {
            RecordId::Saved(id) => Some(id),
            RecordId::Unsaved => None,
        }
    }

    /// Returns the assigned id, or `InvalidId` for a record that was never
    /// saved.
    pub fn require(self, entity: &'static str) -> Result<i64, StoreError> {
        self.saved().ok_or(StoreError::InvalidId { entity })
    }
}

/// Day of the month rent falls due. Capped at 28 so every month has it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct DueDay(u8);

impl DueDay {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 28;

    pub fn new(day: i64) -> Result<Self, ModelError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&day) {
            Ok(Self(day as u8))
        } else {
            Err(ModelError::DueDayOutOfRange(day))
        }
    }

    pub fn get(self) -> u32 {
        u32::from(self.0)
    }
}

impl Default for DueDay {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<i64> for DueDay {
    type Error = ModelError;

    fn try_from(day: i64) -> Result<Self, Self::Error> {
        Self::new(day)
    }
}

impl From<DueDay> for i64 {
    fn from(day: DueDay) -> Self {
        i64::from(day.0)
    }
}

impl ToSql for DueDay {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(*self)))
    }
}

impl FromSql for DueDay {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = i64::column_result(value)?;
        DueDay::new(raw).map_err(|_| FromSqlError::OutOfRange(raw))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: RecordId,
    pub title: String,
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub state: String,
    pub pin_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenancy {
    pub id: RecordId,
    pub name: String,
    pub contact: String,
    pub address: Option<Address>,
    pub lease_start_date: NaiveDateTime,
    pub lease_agreement_signed: bool,
    pub advance_amount: f64,
    pub agreed_rent: f64,
    pub monthly_due_date: DueDay,
    pub agreement_signed_date: NaiveDateTime,
    pub comments: String,
}

impl Tenancy {
    /// A new unsaved tenancy whose lease starts and is signed now.
    pub fn new(name: impl Into<String>, agreed_rent: f64, monthly_due_date: DueDay) -> Self {
        let now = dates::now();
        Self {
            id: RecordId::Unsaved,
            name: name.into(),
            contact: String::new(),
            address: None,
            lease_start_date: now,
            lease_agreement_signed: false,
            advance_amount: 0.0,
            agreed_rent,
            monthly_due_date,
            agreement_signed_date: now,
            comments: String::new(),
        }
    }

    pub fn address_id(&self) -> Option<i64> {
        self.address.as_ref().and_then(|address| address.id.saved())
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        check_non_negative("advance amount", self.advance_amount)?;
        check_non_negative("agreed rent", self.agreed_rent)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentPayment {
    pub id: RecordId,
    pub tenancy_id: i64,
    pub amount: f64,
    pub paid_on: NaiveDateTime,
    pub notes: String,
}

impl RentPayment {
    /// A new unsaved payment dated now.
    pub fn new(tenancy_id: i64, amount: f64) -> Self {
        Self {
            id: RecordId::Unsaved,
            tenancy_id,
            amount,
            paid_on: dates::now(),
            notes: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(StoreError::Validation(format!(
                "payment amount must be positive, got {}",
                self.amount
            )));
        }
        Ok(())
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<(), StoreError> {
    if !value.is_finite() || value < 0.0 {
        return Err(StoreError::Validation(format!(
            "{field} must be a non-negative amount, got {value}"
        )));
    }
    Ok(())
}

/// Parses a typed amount the way the entry forms do: everything except
/// digits and the decimal point is dropped, and junk reads as zero.
pub fn parse_amount(text: &str) -> f64 {
    let filtered: String = text
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '.')
        .collect();
    filtered.parse().unwrap_or(0.0)
}

pub fn format_rupees(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (index, ch) in int_part.chars().enumerate() {
        if index > 0 && (int_part.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}₹{grouped}.{dec_part}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_day_bounds() {
        assert!(DueDay::new(0).is_err());
        assert!(DueDay::new(29).is_err());
        assert_eq!(DueDay::new(1).expect("min").get(), 1);
        assert_eq!(DueDay::new(28).expect("max").get(), 28);
    }

    #[test]
    fn due_day_rejects_out_of_range_json() {
        let parsed: Result<DueDay, _> = serde_json::from_str("31");
        assert!(parsed.is_err());
        let parsed: DueDay = serde_json::from_str("15").expect("in range");
        assert_eq!(parsed.get(), 15);
    }

    #[test]
    fn unsaved_record_has_no_id() {
        assert!(matches!(
            RecordId::Unsaved.require("address"),
            Err(StoreError::InvalidId { entity: "address" })
        ));
        assert_eq!(RecordId::Saved(7).require("address").expect("saved"), 7);
    }

    #[test]
    fn parse_amount_drops_formatting() {
        assert_eq!(parse_amount("₹12,500.50"), 12500.5);
        assert_eq!(parse_amount("abc"), 0.0);
        assert_eq!(parse_amount(""), 0.0);
    }

    #[test]
    fn format_rupees_groups_thousands() {
        assert_eq!(format_rupees(0.0), "₹0.00");
        assert_eq!(format_rupees(950.0), "₹950.00");
        assert_eq!(format_rupees(12500.0), "₹12,500.00");
        assert_eq!(format_rupees(1234567.891), "₹1,234,567.89");
    }

    #[test]
    fn payment_amount_must_be_positive() {
        let mut payment = RentPayment::new(1, 0.0);
        assert!(payment.validate().is_err());
        payment.amount = f64::NAN;
        assert!(payment.validate().is_err());
        payment.amount = 1000.0;
        assert!(payment.validate().is_ok());
    }

    #[test]
    fn tenancy_rejects_negative_rent() {
        let mut tenancy = Tenancy::new("A", -1.0, DueDay::default());
        assert!(tenancy.validate().is_err());
        tenancy.agreed_rent = 0.0;
        assert!(tenancy.validate().is_ok());
    }
}
