//! Day bucketing at the provider's quota-reset boundary.
//!
//! The daily budget resets at a provider-fixed UTC offset, not at the
//! caller's local midnight. The offset is fixed year-round: daylight-saving
//! transitions are deliberately not modeled, so for providers that reset at
//! a civil local time the computed boundary can be off by an hour part of
//! the year.

use std::fmt;
use std::str::FromStr;

use chrono::{FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Default reset boundary: midnight at UTC-8 (Pacific, ignoring DST).
pub const DEFAULT_RESET_OFFSET_HOURS: i32 = -8;

/// A `FixedOffset` for a whole-hour reset boundary. Out-of-range values
/// fall back to UTC.
pub fn reset_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours.saturating_mul(3600))
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is always valid"))
}

/// The date bucket under which usage accumulates, formatted `YYYY-MM-DD`.
///
/// Usage never aggregates across day keys: each key owns an independent
/// usage record in the ledger.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DayKey(NaiveDate);

impl DayKey {
    /// The current day at the provider's reset boundary.
    pub fn today(reset_offset: FixedOffset) -> Self {
        Self(Utc::now().with_timezone(&reset_offset).date_naive())
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for DayKey {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Self)
    }
}
