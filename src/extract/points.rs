use super::{CellValue, TableRow};
use crate::model::{Measurement, MeterPoint};

/// Maps measurement table rows to meter points.
///
/// Column one holds the timestamp, column two the reading and column three a
/// substitute reading the portal fills in when column two is empty. Rows
/// without a timestamp (footer and summary lines) or without any reading are
/// skipped. Rows arrive in time order, which places each copy of the repeated
/// local hour at the end of DST on its own instant.
pub fn rows_to_points(
    rows: &[TableRow],
    measurement: Measurement,
    meter_id: &str,
) -> Vec<MeterPoint> {
    let mut points = Vec::with_capacity(rows.len());
    let mut previous = None;
    for row in rows {
        let Some(timestamp) = row
            .column(0)
            .and_then(|cell| cell.resolve_timestamp(previous))
        else {
            continue;
        };
        previous = Some(timestamp);

        let value = match row.column(1) {
            Some(CellValue::Number(v)) => Some(*v),
            Some(cell) if !cell.is_null() => None,
            _ => row.column(2).and_then(CellValue::as_number),
        };
        match value {
            Some(value) => points.push(MeterPoint {
                measurement,
                meter_id: meter_id.to_string(),
                timestamp,
                value,
            }),
            None => tracing::debug!(%measurement, %timestamp, "Skipping row without a reading"),
        }
    }
    points
}
