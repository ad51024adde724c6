//! Calendar due date.
//!
//! # Responsibility
//! - Represent a task due day as a local calendar date, never a timestamp.
//! - Own the single `YYYY-MM-DD` text form used by storage, snapshots and
//!   the day filter.
//!
//! # Invariants
//! - Text form is always zero-padded `YYYY-MM-DD`.
//! - Parsing rejects anything that does not round-trip to the same text.

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Error returned when text is not a valid `YYYY-MM-DD` calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueDateParseError {
    input: String,
}

impl Display for DueDateParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid due date `{}`; expected YYYY-MM-DD", self.input)
    }
}

impl Error for DueDateParseError {}

/// Local calendar day a task is due on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DueDate(NaiveDate);

impl DueDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Builds a date from components, `None` when the day does not exist.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Parses strict zero-padded `YYYY-MM-DD` text.
    pub fn parse(value: &str) -> Result<Self, DueDateParseError> {
        let trimmed = value.trim();
        let err = || DueDateParseError {
            input: value.to_string(),
        };
        let bytes = trimmed.as_bytes();
        if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return Err(err());
        }
        NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .map(Self)
            .map_err(|_| err())
    }

    /// Current day on the local calendar.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// Returns whether this date falls in the given year/month.
    pub fn is_in_month(&self, year: i32, month: u32) -> bool {
        self.year() == year && self.month() == month
    }
}

impl Display for DueDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for DueDate {
    type Err = DueDateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NaiveDate> for DueDate {
    fn from(value: NaiveDate) -> Self {
        Self(value)
    }
}

impl Serialize for DueDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DueDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Reads an optional due date, treating `null` and `""` as "no due date".
pub(crate) fn deserialize_optional_due<'de, D>(deserializer: D) -> Result<Option<DueDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => DueDate::parse(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
