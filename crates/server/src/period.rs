// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! "Today" boundaries in local time.
//!
//! Adapters pass the local date to their tools (`--since YYYYMMDD`) and the
//! aggregator reports the same day as `periodStart`/`periodEnd`, so both are
//! derived from one [`Period`] value.

use chrono::{DateTime, Days, Local, LocalResult, NaiveDate, SecondsFormat, TimeZone, Utc};

/// A local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    day: NaiveDate,
}

impl Period {
    /// The current local day.
    pub fn today() -> Self {
        Self { day: Local::now().date_naive() }
    }

    pub fn from_date(day: NaiveDate) -> Self {
        Self { day }
    }

    /// `YYYYMMDD`, the format ccusage-style tools accept for `--since`.
    pub fn since_arg(&self) -> String {
        self.day.format("%Y%m%d").to_string()
    }

    /// Local midnight at the start of the day, as an RFC 3339 UTC instant.
    pub fn start(&self) -> String {
        iso(local_midnight(self.day))
    }

    /// Local midnight at the start of the next day (exclusive end).
    pub fn end(&self) -> String {
        let next = self.day.checked_add_days(Days::new(1)).unwrap_or(self.day);
        iso(local_midnight(next))
    }
}

/// Current instant formatted like [`Period::start`].
pub fn now_iso() -> String {
    iso(Utc::now())
}

fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// Midnight can be skipped or repeated by a DST change; take the earliest
// valid instant, falling back to treating the naive time as UTC.
fn local_midnight(day: NaiveDate) -> DateTime<Utc> {
    let naive = day.and_time(chrono::NaiveTime::MIN);
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(at) | LocalResult::Ambiguous(at, _) => at.with_timezone(&Utc),
        LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}

#[cfg(test)]
#[path = "period_tests.rs"]
mod tests;
