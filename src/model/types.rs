use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt;

/// Portal date format, used only at the portal boundary.
pub const PORTAL_DATE_FORMAT: &str = "%d.%m.%Y";

/// Represents the type of measurement being collected.
///
/// Each measurement type corresponds to a different InfluxDB measurement
/// (table) where the data will be stored.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Measurement {
    /// Quarter-hourly energy consumption in kWh
    MeteredValues,
    /// Quarter-hourly peak power demand in kW
    MeteredPeakDemands,
}

impl Measurement {
    pub const ALL: [Measurement; 2] = [Measurement::MeteredValues, Measurement::MeteredPeakDemands];

    /// The measurement used to locate stored history and to audit.
    pub fn primary() -> Self {
        Measurement::MeteredValues
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Measurement::MeteredValues => write!(f, "meteredValues"),
            Measurement::MeteredPeakDemands => write!(f, "meteredPeakDemands"),
        }
    }
}

/// A calendar date in the meter's timezone; the unit of fetch and backfill work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Day {
    date: NaiveDate,
    tz: Tz,
}

impl Day {
    pub fn new(date: NaiveDate, tz: Tz) -> Self {
        Self { date, tz }
    }

    /// The day an instant falls on in the given timezone.
    pub fn containing(instant: DateTime<Utc>, tz: Tz) -> Self {
        Self::new(instant.with_timezone(&tz).date_naive(), tz)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn minus_days(&self, days: u32) -> Self {
        Self::new(self.date - Days::new(u64::from(days)), self.tz)
    }

    pub fn plus_days(&self, days: u32) -> Self {
        Self::new(self.date + Days::new(u64::from(days)), self.tz)
    }

    /// Monday of the week this day belongs to.
    pub fn week_start(&self) -> Self {
        self.minus_days(self.date.weekday().num_days_from_monday())
    }

    /// Local midnight of this day as a UTC instant.
    pub fn start(&self) -> DateTime<Utc> {
        let midnight = self.date.and_time(NaiveTime::MIN);
        match self.tz.from_local_datetime(&midnight).earliest() {
            Some(local) => local.with_timezone(&Utc),
            // midnight skipped by a DST jump
            None => self.tz.from_utc_datetime(&midnight).with_timezone(&Utc),
        }
    }

    pub fn to_portal_string(&self) -> String {
        self.date.format(PORTAL_DATE_FORMAT).to_string()
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.date.format("%Y-%m-%d"))
    }
}

/// One aggregated value as reported by the store, keyed by window start.
///
/// The value is kept in the store's own textual rendering so the auditor can
/// compare it verbatim against freshly fetched readings.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSample {
    pub time: DateTime<Utc>,
    pub value: String,
}
