use crate::error::{PortalError, Result, StorageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use influxdb2::models::DataPoint;
use std::time::Duration;

use super::point::MeterPoint;
use super::types::{Day, Measurement, WindowSample};

/// Trait for types that can be converted to InfluxDB data points.
///
/// Implementors must be thread-safe (Send + Sync) so points can be handed
/// to the async write path.
pub trait DataPointBuilder: Send + Sync {
    /// Converts the value into an InfluxDB DataPoint.
    ///
    /// # Returns
    /// - `Ok(DataPoint)` if conversion succeeds
    /// - `Err` if the data cannot be converted to a valid DataPoint
    fn to_point(&self) -> Result<DataPoint, StorageError>;
}

/// Source of one calendar day's meter readings.
///
/// Fetching may take seconds to minutes and fails intermittently; every error
/// is reported through the returned `Result`. An empty vector means the source
/// answered but published no readings for that day.
#[async_trait]
pub trait DaySource: Send + Sync {
    async fn fetch_day(&self, day: &Day) -> Result<Vec<MeterPoint>, PortalError>;
}

/// Time-series store holding the durable state of the backfill.
#[async_trait]
pub trait PointStore: Send + Sync {
    /// Upserts the points; completes only once the store accepted the batch.
    async fn write_points(&self, points: Vec<MeterPoint>) -> Result<(), StorageError>;

    /// Timestamp of the oldest stored point of a measurement for a meter.
    async fn earliest_point(
        &self,
        measurement: Measurement,
        meter_id: &str,
    ) -> Result<Option<DateTime<Utc>>, StorageError>;

    /// Timestamp of the newest stored point of a measurement for a meter.
    async fn latest_point(
        &self,
        measurement: Measurement,
        meter_id: &str,
    ) -> Result<Option<DateTime<Utc>>, StorageError>;

    /// Mean values per `every`-sized window in `[start, stop)`, stamped at
    /// window start. Windows without data are omitted.
    async fn aggregated_window(
        &self,
        measurement: Measurement,
        meter_id: &str,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
        every: Duration,
    ) -> Result<Vec<WindowSample>, StorageError>;
}

/// Wall clock, injectable so day anchoring is deterministic in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
