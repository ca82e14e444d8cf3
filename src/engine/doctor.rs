//! Read-only integrity audit.
//!
//! Walks backward in Monday-aligned weeks from the week of the latest stored
//! day. Each week's stored quarter-hour means are compared slot by slot with
//! values fetched fresh from the portal. Findings are reported, never repaired.

use super::Engine;
use crate::error::StorageError;
use crate::model::{slot_key, Day, Measurement, MeterPoint, WindowSample};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

const SLOT: Duration = Duration::from_secs(15 * 60);
const WEEK_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq)]
pub enum AuditFinding {
    /// Both sides have the slot but the values differ.
    Mismatch {
        slot: String,
        stored: String,
        fetched: String,
    },
    /// The source has a slot the store lacks.
    MissingInStore { slot: String, fetched: String },
    /// The source returned nothing for a day with stored slots.
    NoSourceData { day: Day, stored_slots: usize },
}

impl fmt::Display for AuditFinding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuditFinding::Mismatch {
                slot,
                stored,
                fetched,
            } => write!(f, "{}: stored {} but source has {}", slot, stored, fetched),
            AuditFinding::MissingInStore { slot, fetched } => {
                write!(f, "{}: missing in store, source has {}", slot, fetched)
            }
            AuditFinding::NoSourceData { day, stored_slots } => write!(
                f,
                "{}: source returned no data, store has {} slots",
                day, stored_slots
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditReport {
    pub windows_checked: usize,
    pub days_checked: usize,
    /// Days whose fetch kept failing past the audit ceiling.
    pub days_unverified: Vec<Day>,
    pub findings: Vec<AuditFinding>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty() && self.days_unverified.is_empty()
    }
}

impl Engine {
    /// Audits stored `meteredValues` against the source, newest week first.
    ///
    /// Stops at the first week without stored aggregates or once `day_limit`
    /// days were checked. Fetch failures never abort the audit.
    pub async fn doctor(&self, day_limit: Option<usize>) -> Result<AuditReport, StorageError> {
        let measurement = Measurement::primary();
        let mut report = AuditReport::default();

        let latest = self
            .store
            .latest_point(measurement, self.meter_id())
            .await?;
        let Some(latest) = latest else {
            tracing::info!("No stored data found, nothing to audit");
            return Ok(report);
        };

        let latest_day = Day::containing(latest, self.settings.tz);
        let mut week = latest_day.week_start();

        'weeks: loop {
            let week_end = week.plus_days(WEEK_DAYS);
            let samples = self
                .store
                .aggregated_window(
                    measurement,
                    self.meter_id(),
                    week.start(),
                    week_end.start(),
                    SLOT,
                )
                .await?;
            if samples.is_empty() {
                tracing::info!(week = %week, "No stored aggregates, audit finished");
                break;
            }
            report.windows_checked += 1;

            let stored = StoredWeek::new(samples);
            tracing::debug!(week = %week, slots = stored.by_slot.len(), "Auditing week");

            for offset in (0..WEEK_DAYS).rev() {
                let day = week.plus_days(offset);
                if day.date() > latest_day.date() {
                    continue;
                }
                if day_limit.is_some_and(|limit| report.days_checked >= limit) {
                    break 'weeks;
                }
                report.days_checked += 1;

                match self.fetch_for_audit(&day).await {
                    Some(points) => {
                        let findings = compare_day(&day, &points, &stored);
                        for finding in &findings {
                            tracing::warn!(%day, "Integrity issue: {}", finding);
                        }
                        report.findings.extend(findings);
                    }
                    None => {
                        tracing::error!(%day, "Giving up on day, it stays unverified");
                        report.days_unverified.push(day);
                    }
                }
            }

            week = week.minus_days(WEEK_DAYS);
        }

        tracing::info!(
            windows = report.windows_checked,
            days = report.days_checked,
            findings = report.findings.len(),
            unverified = report.days_unverified.len(),
            "Audit finished"
        );
        Ok(report)
    }

    /// Fetches a day with local retries under the audit ceiling.
    async fn fetch_for_audit(&self, day: &Day) -> Option<Vec<MeterPoint>> {
        let ceiling = self.policy().audit_failure_ceiling;
        let mut failed_attempts = 0u32;
        loop {
            self.pause(failed_attempts > 0).await;
            if let Some(points) = self.fetch_points(day).await {
                return Some(points);
            }
            failed_attempts += 1;
            if failed_attempts > ceiling {
                return None;
            }
        }
    }
}

/// A week's stored aggregates, keyed by UTC slot key.
struct StoredWeek {
    by_slot: HashMap<String, String>,
    times: Vec<DateTime<Utc>>,
}

impl StoredWeek {
    fn new(samples: Vec<WindowSample>) -> Self {
        let times = samples.iter().map(|s| s.time).collect();
        let by_slot = samples
            .into_iter()
            .map(|s| (slot_key(&s.time), s.value.trim().to_string()))
            .collect();
        Self { by_slot, times }
    }

    fn slots_on(&self, day: &Day) -> usize {
        let (start, end) = (day.start(), day.plus_days(1).start());
        self.times.iter().filter(|t| **t >= start && **t < end).count()
    }
}

/// Compares one day's fetched primary readings with the week's stored slots.
fn compare_day(day: &Day, points: &[MeterPoint], stored: &StoredWeek) -> Vec<AuditFinding> {
    let fetched: Vec<&MeterPoint> = points
        .iter()
        .filter(|p| p.measurement == Measurement::primary())
        .collect();

    if fetched.is_empty() {
        let stored_slots = stored.slots_on(day);
        return if stored_slots > 0 {
            vec![AuditFinding::NoSourceData {
                day: *day,
                stored_slots,
            }]
        } else {
            Vec::new()
        };
    }

    fetched
        .into_iter()
        .filter_map(|point| {
            let slot = point.slot_key();
            let value = point.value.to_string();
            match stored.by_slot.get(&slot) {
                Some(stored) if stored != value.trim() => Some(AuditFinding::Mismatch {
                    slot,
                    stored: stored.clone(),
                    fetched: value,
                }),
                Some(_) => None,
                None => Some(AuditFinding::MissingInStore {
                    slot,
                    fetched: value,
                }),
            }
        })
        .collect()
}
