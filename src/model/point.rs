use crate::error::{Result, StorageError};
use chrono::{DateTime, Utc};
use influxdb2::models::DataPoint;

use super::traits::DataPointBuilder;
use super::types::Measurement;

/// Tag key carrying the meter identifier.
pub const METER_TAG: &str = "meterId";

/// A single quarter-hour reading of one meter.
///
/// Two points are the same store slot when measurement, meter and timestamp
/// agree; writing such a point again overwrites the earlier value.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterPoint {
    pub measurement: Measurement,
    pub meter_id: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl MeterPoint {
    /// UTC slot identifier shared by stored aggregates and fetched readings.
    pub fn slot_key(&self) -> String {
        slot_key(&self.timestamp)
    }
}

pub fn slot_key(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%MZ").to_string()
}

impl DataPointBuilder for MeterPoint {
    fn to_point(&self) -> Result<DataPoint, StorageError> {
        if !self.value.is_finite() {
            return Err(StorageError::InvalidDataPoint(format!(
                "non-finite value {} at {}",
                self.value, self.timestamp
            )));
        }
        let timestamp = self
            .timestamp
            .timestamp_nanos_opt()
            .ok_or_else(|| StorageError::InvalidDataPoint("Timestamp overflow".to_string()))?;

        DataPoint::builder(self.measurement.to_string().as_str())
            .tag(METER_TAG, self.meter_id.clone())
            .field("value", self.value)
            .timestamp(timestamp)
            .build()
            .map_err(|e| {
                StorageError::InvalidDataPoint(format!("Failed to build MeterPoint: {}", e))
            })
    }
}
