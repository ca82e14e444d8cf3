use super::{Engine, WalkReport};
use crate::error::StorageError;
use crate::model::{Day, Measurement};
use chrono::Duration;

/// Days re-fetched above the earliest stored point when resuming.
///
/// A young frontier may still be incomplete at the source, so recent resumes
/// start a little later than the stored edge.
pub fn buffer_days(age: Duration) -> u32 {
    if age <= Duration::days(1) {
        0
    } else if age <= Duration::days(2) {
        1
    } else {
        2
    }
}

impl Engine {
    /// Resumes the backward walk from just above the earliest stored point,
    /// or runs a full backfill when the store has nothing for the meter.
    pub async fn continue_migration(&self) -> Result<WalkReport, StorageError> {
        let earliest = self
            .store
            .earliest_point(Measurement::primary(), self.meter_id())
            .await?;

        let Some(earliest) = earliest else {
            tracing::info!("No stored data found, starting full backfill");
            return self.migrate_full(None).await;
        };

        let buffer = buffer_days(self.clock.now() - earliest);
        let anchor = Day::containing(earliest, self.settings.tz).plus_days(buffer);
        tracing::info!(%earliest, buffer, %anchor, "Continuing backfill");
        self.migrate(anchor, 0, None).await
    }
}
