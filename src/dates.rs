//! Date text formats shared by the store and the command line.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::error::ModelError;

/// Storage format for every date column.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DAY_FORMAT: &str = "%Y-%m-%d";

/// A stored date string that does not match [`DATE_FORMAT`].
#[derive(Debug, Error)]
#[error("invalid stored date '{0}'")]
pub struct StoredDateError(pub String);

/// How to treat stored date text that fails to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePolicy {
    /// Substitute the current local time and log a warning.
    #[default]
    Lenient,
    /// Fail the read.
    Strict,
}

impl DatePolicy {
    pub fn resolve(self, raw: &str) -> Result<NaiveDateTime, StoredDateError> {
        match parse_stored(raw) {
            Ok(value) => Ok(value),
            Err(err) => match self {
                DatePolicy::Lenient => {
                    warn!(value = raw, "unparseable stored date, substituting now");
                    Ok(now())
                }
                DatePolicy::Strict => Err(err),
            },
        }
    }
}

pub fn now() -> NaiveDateTime {
    truncate_to_second(Local::now().naive_local())
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn format_stored(value: &NaiveDateTime) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub fn parse_stored(raw: &str) -> Result<NaiveDateTime, StoredDateError> {
    NaiveDateTime::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| StoredDateError(raw.to_string()))
}

/// Parses user input: either a full stored timestamp or a bare day, which
/// is taken as midnight.
pub fn parse_input(raw: &str) -> Result<NaiveDateTime, ModelError> {
    let raw = raw.trim();
    if let Ok(value) = NaiveDateTime::parse_from_str(raw, DATE_FORMAT) {
        return Ok(value);
    }
    NaiveDate::parse_from_str(raw, DAY_FORMAT)
        .map(|day| day.and_time(NaiveTime::MIN))
        .map_err(|_| ModelError::InvalidDate(raw.to_string()))
}

pub fn truncate_to_second(value: NaiveDateTime) -> NaiveDateTime {
    value.with_nanosecond(0).unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_format_is_fixed_width() {
        let value = parse_input("2024-02-05").expect("day input");
        assert_eq!(format_stored(&value), "2024-02-05 00:00:00");
        assert_eq!(parse_stored("2024-02-05 00:00:00").expect("stored"), value);
    }

    #[test]
    fn lenient_policy_substitutes_now() {
        let before = now();
        let resolved = DatePolicy::Lenient.resolve("not a date").expect("lenient");
        assert!(resolved >= before);
    }

    #[test]
    fn strict_policy_rejects_garbage() {
        let err = DatePolicy::Strict.resolve("2024-13-40").unwrap_err();
        assert_eq!(err.0, "2024-13-40");
    }

    #[test]
    fn input_rejects_other_formats() {
        assert!(matches!(
            parse_input("05/02/2024"),
            Err(ModelError::InvalidDate(_))
        ));
    }
}
