use async_trait::async_trait;
use chrono_tz::Tz;
use std::sync::Arc;

use crate::error::PortalError;
use crate::extract::{collect_pages, rows_to_points};
use crate::model::{Day, DaySource, Measurement, MeterPoint};

use super::client::{Client, Session};
use super::pagination::{table_pages, TableRequest};

/// Fetches a day's quarter-hour readings of one meter from the portal.
pub struct PortalSource {
    client: Arc<Client>,
    meter_id: String,
    tz: Tz,
}

impl PortalSource {
    pub fn new(client: Arc<Client>, meter_id: impl Into<String>, tz: Tz) -> Self {
        Self {
            client,
            meter_id: meter_id.into(),
            tz,
        }
    }

    async fn load_day(&self, session: &Session, day: &Day) -> Result<Vec<MeterPoint>, PortalError> {
        let mut points = Vec::new();
        for measurement in Measurement::ALL {
            let request = TableRequest::new(&self.meter_id, day, measurement);
            let table =
                collect_pages(table_pages(session, request, self.client.max_pages())).await?;
            let rows = table.to_rows(self.tz);
            let measured = rows_to_points(&rows, measurement, &self.meter_id);
            tracing::debug!(
                %day,
                %measurement,
                rows = rows.len(),
                points = measured.len(),
                "Received table"
            );
            points.extend(measured);
        }
        Ok(points)
    }
}

#[async_trait]
impl DaySource for PortalSource {
    /// Runs the whole day inside one session. Once logged in, the session is
    /// logged out on every return path, whatever the day's outcome.
    async fn fetch_day(&self, day: &Day) -> Result<Vec<MeterPoint>, PortalError> {
        let session = self.client.login().await?;
        let result = self.load_day(&session, day).await;
        session.logout().await;
        result
    }
}
