//! Model definitions for meter readings and their InfluxDB representation.
//!
//! This module provides the core data structures and the collaborator traits
//! (portal source, point store, clock) the backfill engine is written against.

pub mod point;
pub mod traits;
pub mod types;

// Re-export commonly used items at the module level
pub use point::{slot_key, MeterPoint, METER_TAG};
pub use traits::{Clock, DataPointBuilder, DaySource, PointStore, SystemClock};
pub use types::{Day, Measurement, WindowSample};

/// Converts readings into InfluxDB data points.
///
/// A day's batch is written as a unit, so a single invalid point rejects the
/// whole batch instead of silently shrinking it.
pub fn to_data_points(
    points: &[MeterPoint],
) -> Result<Vec<influxdb2::models::DataPoint>, crate::error::StorageError> {
    points.iter().map(|p| p.to_point()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn point(measurement: Measurement, minute: u32, value: f64) -> MeterPoint {
        MeterPoint {
            measurement,
            meter_id: "meter-1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 0, minute, 0).unwrap(),
            value,
        }
    }

    mod succeeds {
        use super::*;

        #[test]
        fn test_to_data_points_converts_every_point() {
            let points = vec![
                point(Measurement::MeteredValues, 0, 0.1),
                point(Measurement::MeteredPeakDemands, 0, 0.4),
                point(Measurement::MeteredValues, 15, 0.2),
            ];
            assert_eq!(to_data_points(&points).unwrap().len(), 3);
        }

        #[test]
        fn test_to_data_points_empty() {
            assert!(to_data_points(&[]).unwrap().is_empty());
        }
    }

    mod fails {
        use super::*;

        #[test]
        fn test_to_data_points_rejects_batch_with_invalid_point() {
            let points = vec![
                point(Measurement::MeteredValues, 0, 0.1),
                point(Measurement::MeteredValues, 15, f64::INFINITY),
            ];
            assert!(to_data_points(&points).is_err());
        }
    }
}
