//! Weekly consumption summary.
//!
//! Mean consumption per weekday and six-hour day part, in Wh, for the current
//! week and the weeks before it. Day parts follow local time, so DST days keep
//! their parts aligned to the wall clock.

use super::Engine;
use crate::error::StorageError;
use crate::model::{Day, Measurement, WindowSample};
use chrono::{Datelike, Timelike};
use chrono_tz::Tz;
use std::fmt;
use std::time::Duration;

const SLOT: Duration = Duration::from_secs(15 * 60);
const WEEK_DAYS: u32 = 7;
const DAY_PARTS: usize = 4;

const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const DAY_PART_LABELS: [&str; DAY_PARTS] = ["00-06", "06-12", "12-18", "18-24"];

/// Mean Wh per quarter hour for each weekday (Monday first) and day part.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekConsumption {
    pub week_start: Day,
    pub means: [[Option<f64>; DAY_PARTS]; 7],
}

impl WeekConsumption {
    fn from_samples(week_start: Day, samples: &[WindowSample], tz: Tz) -> Self {
        let mut sums = [[(0.0f64, 0usize); DAY_PARTS]; 7];
        for sample in samples {
            let Ok(kwh) = sample.value.parse::<f64>() else {
                tracing::debug!(time = %sample.time, value = %sample.value, "Skipping unparsable aggregate");
                continue;
            };
            let local = sample.time.with_timezone(&tz);
            let weekday = local.weekday().num_days_from_monday() as usize;
            let part = local.hour() as usize / 6;
            let (sum, count) = &mut sums[weekday][part];
            *sum += kwh * 1000.0;
            *count += 1;
        }

        let means = sums.map(|parts| {
            parts.map(|(sum, count)| (count > 0).then(|| sum / count as f64))
        });
        Self { week_start, means }
    }

    pub fn has_data(&self) -> bool {
        self.means.iter().flatten().any(Option::is_some)
    }
}

impl fmt::Display for WeekConsumption {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Week of {} (Wh)", self.week_start)?;
        write!(f, "     ")?;
        for label in DAY_PART_LABELS {
            write!(f, " {:>7}", label)?;
        }
        writeln!(f)?;
        for (label, parts) in WEEKDAY_LABELS.iter().zip(&self.means) {
            write!(f, "{:<5}", label)?;
            for mean in parts {
                match mean {
                    Some(wh) => write!(f, " {:>7.0}", wh)?,
                    None => write!(f, " {:>7}", "-")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Newest week first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsumptionReport {
    pub weeks: Vec<WeekConsumption>,
}

impl ConsumptionReport {
    pub fn has_data(&self) -> bool {
        self.weeks.iter().any(WeekConsumption::has_data)
    }
}

impl fmt::Display for ConsumptionReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (index, week) in self.weeks.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", week)?;
        }
        Ok(())
    }
}

impl Engine {
    /// Summarizes stored `meteredValues` of the current week and the
    /// `weeks - 1` weeks before it.
    pub async fn consumption_report(&self, weeks: u32) -> Result<ConsumptionReport, StorageError> {
        let tz = self.settings.tz;
        let current = self.today().week_start();
        let mut report = ConsumptionReport::default();

        for weeks_back in 0..weeks {
            let week_start = current.minus_days(weeks_back * WEEK_DAYS);
            let samples = self
                .store
                .aggregated_window(
                    Measurement::primary(),
                    self.meter_id(),
                    week_start.start(),
                    week_start.plus_days(WEEK_DAYS).start(),
                    SLOT,
                )
                .await?;
            tracing::debug!(week = %week_start, slots = samples.len(), "Summarizing week");
            report
                .weeks
                .push(WeekConsumption::from_samples(week_start, &samples, tz));
        }
        Ok(report)
    }
}
