use super::{classify, DayOutcome, Engine};
use crate::error::StorageError;
use crate::model::{Day, MeterPoint};

impl Engine {
    /// Fetches a day without writing. A source failure is logged with the day
    /// and reported as `None`.
    pub(crate) async fn fetch_points(&self, day: &Day) -> Option<Vec<MeterPoint>> {
        match self.source.fetch_day(day).await {
            Ok(points) => Some(points),
            Err(e) => {
                tracing::warn!(%day, "Failed to fetch day: {}", e);
                None
            }
        }
    }

    /// The only write path: fetch a day and upsert whatever it returned.
    ///
    /// Empty days and failed fetches write nothing. A store error is returned
    /// as-is and aborts the calling operation.
    pub(crate) async fn fetch_and_store(&self, day: &Day) -> Result<DayOutcome, StorageError> {
        let Some(points) = self.fetch_points(day).await else {
            return Ok(DayOutcome::Failed);
        };

        let count = points.len();
        if count > 0 {
            self.store.write_points(points).await.map_err(|e| {
                tracing::error!(%day, count, "Failed to store day: {}", e);
                e
            })?;
        }

        let completeness = classify(count, self.policy().expected_daily_count);
        tracing::info!(%day, count, %completeness, "Fetched day");
        Ok(DayOutcome::Stored { count })
    }
}
