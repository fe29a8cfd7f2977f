use chrono::{DateTime, Duration, Local, SecondsFormat, Utc};

/// Half-open query window, both ends UTC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn last_minutes(minutes: u32) -> Self {
        let end = Utc::now();
        Self {
            start: end - Duration::minutes(i64::from(minutes)),
            end,
        }
    }

    /// Renders the provider timespan parameter, `startIso/endIso`.
    pub fn timespan(&self) -> String {
        format!(
            "{}/{}",
            self.start.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.end.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

/// Local-time `HH:MM` chart label for a sample instant.
pub fn hhmm_label(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%H:%M").to_string()
}
