//! InfluxDB 2 point store.
//!
//! Writes go through the `influxdb2` client. Reads use the Flux HTTP query API
//! directly and decode its CSV response, which keeps stored values in the exact
//! text form the server renders them in.

use crate::config::InfluxConfig;
use crate::error::StorageError;
use crate::model::{to_data_points, Measurement, MeterPoint, PointStore, WindowSample, METER_TAG};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::prelude::stream;
use reqwest::Client as HttpClient;
use std::time::Duration;

const QUERY_PATH: &str = "/api/v2/query";
const RANGE_ORIGIN: &str = "1970-01-01T00:00:00Z";

pub struct Client {
    client: influxdb2::Client,
    http_client: HttpClient,
    url: String,
    org: String,
    token: String,
    bucket: String,
}

impl Client {
    pub(crate) fn new(config: InfluxConfig) -> Self {
        let client = influxdb2::Client::new(&config.url, &config.org, &config.token);
        Self {
            client,
            http_client: HttpClient::new(),
            url: config.url.trim_end_matches('/').to_string(),
            org: config.org,
            token: config.token,
            bucket: config.bucket,
        }
    }

    /// Runs a Flux query and returns `(_time, _value)` of every result row.
    async fn query(&self, flux: String) -> Result<Vec<(DateTime<Utc>, String)>, StorageError> {
        tracing::debug!("Running Flux query: {}", flux);
        let response = self
            .http_client
            .post(format!("{}{}", self.url, QUERY_PATH))
            .query(&[("org", self.org.as_str())])
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "application/vnd.flux")
            .header("Accept", "application/csv")
            .body(flux)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StorageError::query_failed(status.as_u16(), body));
        }
        parse_query_csv(&body)
    }

    /// One meter's `value` series of a measurement within `[start, stop)`.
    fn bounded_series(
        &self,
        measurement: Measurement,
        meter_id: &str,
        start: &str,
        stop: &str,
    ) -> String {
        format!(
            r#"from(bucket: "{}")
  |> range(start: {}, stop: {})
  |> filter(fn: (r) => r._measurement == "{}" and r._field == "value" and r.{} == "{}")"#,
            flux_string(&self.bucket),
            start,
            stop,
            measurement,
            METER_TAG,
            flux_string(meter_id)
        )
    }
}

#[async_trait]
impl PointStore for Client {
    async fn write_points(&self, points: Vec<MeterPoint>) -> Result<(), StorageError> {
        let count = points.len();
        let data_points = to_data_points(&points)?;
        self.client
            .write(self.bucket.as_str(), stream::iter(data_points))
            .await
            .map_err(|e| StorageError::write_failed(count, e))?;
        tracing::debug!(count, bucket = %self.bucket, "Wrote points");
        Ok(())
    }

    async fn earliest_point(
        &self,
        measurement: Measurement,
        meter_id: &str,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        let flux = format!(
            "{}\n  |> first()",
            self.bounded_series(measurement, meter_id, RANGE_ORIGIN, "now()")
        );
        let rows = self.query(flux).await?;
        Ok(rows.into_iter().map(|(time, _)| time).min())
    }

    async fn latest_point(
        &self,
        measurement: Measurement,
        meter_id: &str,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        let flux = format!(
            "{}\n  |> last()",
            self.bounded_series(measurement, meter_id, RANGE_ORIGIN, "now()")
        );
        let rows = self.query(flux).await?;
        Ok(rows.into_iter().map(|(time, _)| time).max())
    }

    async fn aggregated_window(
        &self,
        measurement: Measurement,
        meter_id: &str,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
        every: Duration,
    ) -> Result<Vec<WindowSample>, StorageError> {
        let flux = format!(
            "{}\n  |> aggregateWindow(every: {}s, fn: mean, createEmpty: false, timeSrc: \"_start\")",
            self.bounded_series(
                measurement,
                meter_id,
                &start.to_rfc3339_opts(SecondsFormat::Secs, true),
                &stop.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            every.as_secs()
        );
        let mut samples: Vec<WindowSample> = self
            .query(flux)
            .await?
            .into_iter()
            .map(|(time, value)| WindowSample { time, value })
            .collect();
        samples.sort_by_key(|s| s.time);
        Ok(samples)
    }
}

/// Escapes a value for use inside a Flux string literal.
fn flux_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Decodes a Flux CSV response into `(_time, _value)` pairs.
///
/// Annotation rows are skipped. Each table starts with its own header row,
/// which is detected by its `_time` column.
fn parse_query_csv(body: &str) -> Result<Vec<(DateTime<Utc>, String)>, StorageError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(body.as_bytes());

    let mut columns: Option<(usize, usize)> = None;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| StorageError::MalformedResponse(e.to_string()))?;
        let time_column = record.iter().position(|field| field == "_time");
        let value_column = record.iter().position(|field| field == "_value");
        if let (Some(time), Some(value)) = (time_column, value_column) {
            columns = Some((time, value));
            continue;
        }

        let Some((time_column, value_column)) = columns else {
            continue;
        };
        let (Some(time), Some(value)) = (record.get(time_column), record.get(value_column)) else {
            continue;
        };
        let time = DateTime::parse_from_rfc3339(time)
            .map_err(|e| StorageError::MalformedResponse(format!("bad _time '{}': {}", time, e)))?
            .with_timezone(&Utc);
        rows.push((time, value.to_string()));
    }
    Ok(rows)
}
