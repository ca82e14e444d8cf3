//! In-process collaborators for engine tests.
//!
//! - [`ScriptedSource`]: a day source answering from a per-day script
//! - [`InMemoryStore`]: a point store with upsert semantics and mean windows
//! - [`FixedClock`]: a clock frozen at a chosen instant

use crate::config::PolicyConfig;
use crate::engine::Engine;
use crate::error::{PortalError, StorageError};
use crate::model::{Clock, Day, DaySource, Measurement, MeterPoint, PointStore, WindowSample};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use chrono_tz::Europe::Vienna;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::config::{test_settings, test_settings_with_policy, TEST_METER_ID};

/// A day in the test timezone.
pub fn day(year: i32, month: u32, date: u32) -> Day {
    Day::new(NaiveDate::from_ymd_opt(year, month, date).unwrap(), Vienna)
}

/// A primary-measurement point of the test meter.
pub fn point_at(timestamp: DateTime<Utc>, value: f64) -> MeterPoint {
    MeterPoint {
        measurement: Measurement::primary(),
        meter_id: TEST_METER_ID.to_string(),
        timestamp,
        value,
    }
}

/// `slots` quarter-hour points per measurement from the start of `day`.
pub fn day_points(day: &Day, slots: usize, value: f64) -> Vec<MeterPoint> {
    Measurement::ALL
        .iter()
        .flat_map(|measurement| {
            (0..slots).map(move |slot| MeterPoint {
                measurement: *measurement,
                meter_id: TEST_METER_ID.to_string(),
                timestamp: day.start() + ChronoDuration::minutes(15 * slot as i64),
                value,
            })
        })
        .collect()
}

pub fn engine(source: Arc<ScriptedSource>, store: Arc<InMemoryStore>, clock: FixedClock) -> Engine {
    Engine::new(source, store, Arc::new(clock), test_settings())
}

pub fn engine_with_policy(
    source: Arc<ScriptedSource>,
    store: Arc<InMemoryStore>,
    clock: FixedClock,
    policy: PolicyConfig,
) -> Engine {
    Engine::new(source, store, Arc::new(clock), test_settings_with_policy(policy))
}

/// What the scripted source answers for a day.
#[derive(Debug, Clone)]
pub enum ScriptedDay {
    /// 96 slots of both measurements.
    Complete(f64),
    /// The given number of slots of both measurements.
    Partial(f64, usize),
    Points(Vec<MeterPoint>),
    Empty,
    Fail,
}

#[derive(Debug, Clone)]
struct Script {
    failures_first: usize,
    then: ScriptedDay,
}

/// Day source answering from a script and recording every requested day.
pub struct ScriptedSource {
    default: ScriptedDay,
    days: HashMap<NaiveDate, Script>,
    attempts: Mutex<HashMap<NaiveDate, usize>>,
    calls: Mutex<Vec<Day>>,
}

impl ScriptedSource {
    pub fn new(default: ScriptedDay) -> Self {
        Self {
            default,
            days: HashMap::new(),
            attempts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_day(self, day: Day, answer: ScriptedDay) -> Self {
        self.with_failures(day, 0, answer)
    }

    /// Fails `failures` times for `day` before answering.
    pub fn with_failures(mut self, day: Day, failures: usize, then: ScriptedDay) -> Self {
        self.days.insert(
            day.date(),
            Script {
                failures_first: failures,
                then,
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<Day> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DaySource for ScriptedSource {
    async fn fetch_day(&self, day: &Day) -> Result<Vec<MeterPoint>, PortalError> {
        self.calls.lock().unwrap().push(*day);
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let counter = attempts.entry(day.date()).or_insert(0);
            *counter += 1;
            *counter
        };

        let answer = match self.days.get(&day.date()) {
            Some(script) if attempt <= script.failures_first => ScriptedDay::Fail,
            Some(script) => script.then.clone(),
            None => self.default.clone(),
        };

        match answer {
            ScriptedDay::Complete(value) => Ok(day_points(day, 96, value)),
            ScriptedDay::Partial(value, slots) => Ok(day_points(day, slots, value)),
            ScriptedDay::Points(points) => Ok(points),
            ScriptedDay::Empty => Ok(Vec::new()),
            ScriptedDay::Fail => Err(PortalError::ServerError {
                status: 503,
                message: "scripted failure".to_string(),
            }),
        }
    }
}

type SeriesKey = (Measurement, String, DateTime<Utc>);

/// Point store keeping one value per measurement, meter and timestamp.
#[derive(Default)]
pub struct InMemoryStore {
    points: Mutex<BTreeMap<SeriesKey, f64>>,
    write_batches: AtomicUsize,
    fail_writes: AtomicBool,
    fail_queries: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_writes(self) -> Self {
        self.fail_writes.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_queries(self) -> Self {
        self.fail_queries.store(true, Ordering::SeqCst);
        self
    }

    /// Seeds a point without counting as a write.
    pub fn insert(&self, point: MeterPoint) {
        self.points
            .lock()
            .unwrap()
            .insert((point.measurement, point.meter_id, point.timestamp), point.value);
    }

    pub fn len(&self) -> usize {
        self.points.lock().unwrap().len()
    }

    pub fn value(&self, measurement: Measurement, timestamp: DateTime<Utc>) -> Option<f64> {
        self.points
            .lock()
            .unwrap()
            .get(&(measurement, TEST_METER_ID.to_string(), timestamp))
            .copied()
    }

    pub fn write_batches(&self) -> usize {
        self.write_batches.load(Ordering::SeqCst)
    }

    fn check_queries(&self) -> Result<(), StorageError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            Err(StorageError::query_failed(500, "scripted query failure"))
        } else {
            Ok(())
        }
    }

    fn series_times(&self, measurement: Measurement, meter_id: &str) -> Vec<DateTime<Utc>> {
        self.points
            .lock()
            .unwrap()
            .keys()
            .filter(|(m, id, _)| *m == measurement && id == meter_id)
            .map(|(_, _, time)| *time)
            .collect()
    }
}

#[async_trait]
impl PointStore for InMemoryStore {
    async fn write_points(&self, points: Vec<MeterPoint>) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::write_failed(points.len(), "scripted write failure"));
        }
        self.write_batches.fetch_add(1, Ordering::SeqCst);
        for point in points {
            self.insert(point);
        }
        Ok(())
    }

    async fn earliest_point(
        &self,
        measurement: Measurement,
        meter_id: &str,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        self.check_queries()?;
        Ok(self.series_times(measurement, meter_id).into_iter().min())
    }

    async fn latest_point(
        &self,
        measurement: Measurement,
        meter_id: &str,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        self.check_queries()?;
        Ok(self.series_times(measurement, meter_id).into_iter().max())
    }

    async fn aggregated_window(
        &self,
        measurement: Measurement,
        meter_id: &str,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
        every: Duration,
    ) -> Result<Vec<WindowSample>, StorageError> {
        self.check_queries()?;
        let every = every.as_secs() as i64;
        let mut windows: BTreeMap<DateTime<Utc>, Vec<f64>> = BTreeMap::new();
        for ((m, id, time), value) in self.points.lock().unwrap().iter() {
            if *m != measurement || id != meter_id || *time < start || *time >= stop {
                continue;
            }
            let offset = (*time - start).num_seconds();
            let window = start + ChronoDuration::seconds(offset - offset % every);
            windows.entry(window).or_default().push(*value);
        }
        Ok(windows
            .into_iter()
            .map(|(time, values)| WindowSample {
                time,
                value: (values.iter().sum::<f64>() / values.len() as f64).to_string(),
            })
            .collect())
    }
}

/// Clock frozen at an instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Noon UTC on the given date.
    pub fn at(year: i32, month: u32, date: u32) -> Self {
        Self(Utc.with_ymd_and_hms(year, month, date, 12, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_upsert_is_idempotent() {
        let store = InMemoryStore::new();
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        store.write_points(vec![point_at(time, 1.25)]).await.unwrap();
        store.write_points(vec![point_at(time, 1.25)]).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.value(Measurement::MeteredValues, time), Some(1.25));
    }

    #[tokio::test]
    async fn test_store_windows_average_by_slot() {
        let store = InMemoryStore::new();
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        store.insert(point_at(start, 1.0));
        store.insert(point_at(start + ChronoDuration::minutes(5), 2.0));
        store.insert(point_at(start + ChronoDuration::minutes(30), 4.0));

        let samples = store
            .aggregated_window(
                Measurement::MeteredValues,
                TEST_METER_ID,
                start,
                start + ChronoDuration::days(1),
                Duration::from_secs(900),
            )
            .await
            .unwrap();

        assert_eq!(
            samples,
            vec![
                WindowSample { time: start, value: "1.5".to_string() },
                WindowSample { time: start + ChronoDuration::minutes(30), value: "4".to_string() },
            ]
        );
    }

    #[tokio::test]
    async fn test_scripted_source_fails_then_answers() {
        let source = ScriptedSource::new(ScriptedDay::Empty).with_failures(
            day(2024, 3, 1),
            1,
            ScriptedDay::Complete(0.5),
        );

        assert!(source.fetch_day(&day(2024, 3, 1)).await.is_err());
        assert_eq!(source.fetch_day(&day(2024, 3, 1)).await.unwrap().len(), 192);
        assert!(source.fetch_day(&day(2024, 3, 2)).await.unwrap().is_empty());
        assert_eq!(source.calls().len(), 3);
    }
}
