use super::{DayOutcome, Engine, WalkReport};
use crate::error::StorageError;
use crate::model::{Day, Measurement};

/// Outcome of the forward walk from the latest stored day to today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardReport {
    pub from: Day,
    pub to: Day,
    pub days_fetched: usize,
    /// Last day reached; equals `to` when the walk completed.
    pub last_day: Day,
    pub reached_today: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateReport {
    /// The store was empty, so the update ran a full backfill instead.
    FullBackfill(WalkReport),
    Forward {
        forward: ForwardReport,
        /// Present only when the forward walk reached today.
        revalidation: Option<WalkReport>,
    },
}

impl UpdateReport {
    /// True when some day was given up on, either by the forward walk before
    /// reaching today or by the backward walk it fell back to.
    pub fn left_day_unresolved(&self) -> bool {
        match self {
            UpdateReport::FullBackfill(report) => report.left_day_unresolved(),
            UpdateReport::Forward {
                forward,
                revalidation,
            } => {
                !forward.reached_today
                    || revalidation
                        .as_ref()
                        .is_some_and(WalkReport::left_day_unresolved)
            }
        }
    }
}

impl Engine {
    /// Brings the store up to today and re-checks the trailing window below the
    /// previous latest point for corrections published after the fact.
    pub async fn update(&self) -> Result<UpdateReport, StorageError> {
        let latest = self
            .store
            .latest_point(Measurement::primary(), self.meter_id())
            .await?;

        let Some(latest) = latest else {
            tracing::info!("No stored data found, starting full backfill");
            return Ok(UpdateReport::FullBackfill(self.migrate_full(None).await?));
        };

        let latest_day = Day::containing(latest, self.settings.tz);
        let forward = self.walk_forward(latest_day, self.today()).await?;
        if !forward.reached_today {
            tracing::error!(
                day = %forward.last_day,
                "Forward walk stopped before today, skipping revalidation"
            );
            return Ok(UpdateReport::Forward {
                forward,
                revalidation: None,
            });
        }

        let revalidation_days = self.policy().revalidation_days;
        tracing::info!(anchor = %latest_day, revalidation_days, "Revalidating trailing window");
        let revalidation = self
            .migrate(latest_day, 1, Some(revalidation_days + 1))
            .await?;

        Ok(UpdateReport::Forward {
            forward,
            revalidation: Some(revalidation),
        })
    }

    /// Fetches every day from `from` to `to` inclusive. Empty days do not stop
    /// the walk; more than `forward_failure_ceiling` consecutive failures on one
    /// day do.
    async fn walk_forward(&self, from: Day, to: Day) -> Result<ForwardReport, StorageError> {
        let ceiling = self.policy().forward_failure_ceiling;
        let mut day = from;
        let mut failed_attempts = 0u32;
        let mut days_fetched = 0usize;

        tracing::info!(%from, %to, "Starting forward walk");
        while day.date() <= to.date() {
            self.pause(failed_attempts > 0).await;
            match self.fetch_and_store(&day).await? {
                DayOutcome::Failed => {
                    failed_attempts += 1;
                    if failed_attempts > ceiling {
                        return Ok(ForwardReport {
                            from,
                            to,
                            days_fetched,
                            last_day: day,
                            reached_today: false,
                        });
                    }
                    tracing::warn!(%day, failed_attempts, "Retrying day after failure");
                }
                DayOutcome::Stored { .. } => {
                    days_fetched += 1;
                    failed_attempts = 0;
                    day = day.plus_days(1);
                }
            }
        }

        Ok(ForwardReport {
            from,
            to,
            days_fetched,
            last_day: to,
            reached_today: true,
        })
    }
}
