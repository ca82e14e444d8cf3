//! Typed coercion of raw table cell text.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Local timestamp format of the portal's table cells.
pub const PORTAL_TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M";

/// A table cell after coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Number(f64),
    Timestamp(DateTime<Utc>),
    /// A local time that occurs twice when DST ends, as its first and
    /// second instant.
    AmbiguousTimestamp(DateTime<Utc>, DateTime<Utc>),
    Text(String),
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            CellValue::Timestamp(ts) => Some(*ts),
            CellValue::AmbiguousTimestamp(first, _) => Some(*first),
            _ => None,
        }
    }

    /// Timestamp of the cell given the instant of the preceding row.
    ///
    /// A repeated local time takes its second instant once the first one is
    /// no longer after `previous`, so both copies of the repeated hour stay
    /// distinct.
    pub fn resolve_timestamp(&self, previous: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        match self {
            CellValue::AmbiguousTimestamp(first, second) => match previous {
                Some(previous) if *first <= previous => Some(*second),
                _ => Some(*first),
            },
            _ => self.as_timestamp(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

/// Coerces one cell: empty, then number, then timestamp, then text.
///
/// Numbers are tried before timestamps, so text accepted by both parsers is
/// a number.
pub fn coerce_cell(raw: &str, tz: Tz) -> CellValue {
    let text = raw.trim();
    if text.is_empty() {
        return CellValue::Null;
    }
    if let Some(value) = parse_decimal(text) {
        return CellValue::Number(value);
    }
    if let Some(timestamp) = parse_timestamp(text, tz) {
        return timestamp;
    }
    CellValue::Text(raw.to_string())
}

/// Parses a decimal that uses a comma as decimal separator.
pub fn parse_decimal(text: &str) -> Option<f64> {
    text.replacen(',', ".", 1)
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parses `DD.MM.YYYY HH:mm` as local time of `tz`.
///
/// Local times of the repeated hour when DST ends keep both instants; local
/// times skipped by DST do not parse.
pub fn parse_timestamp(text: &str, tz: Tz) -> Option<CellValue> {
    let naive = NaiveDateTime::parse_from_str(text, PORTAL_TIMESTAMP_FORMAT).ok()?;
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(local) => Some(CellValue::Timestamp(local.with_timezone(&Utc))),
        LocalResult::Ambiguous(first, second) => Some(CellValue::AmbiguousTimestamp(
            first.with_timezone(&Utc),
            second.with_timezone(&Utc),
        )),
        LocalResult::None => None,
    }
}
