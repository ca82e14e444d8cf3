//! Retry-bounded backward day walker.
//!
//! The walker fetches `anchor - delta_days` one day at a time. A failed fetch
//! retries the same day; any answer from the source moves one day further
//! back and resets the failure count. Empty days draw on a budget so the walk
//! ends once the portal's history runs out.

use super::{classify, Completeness, DayOutcome, Engine};
use crate::config::PolicyConfig;
use crate::error::StorageError;
use crate::model::Day;
use std::fmt;

/// Why a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// More consecutive failures on one day than the ceiling allows.
    FailureCeiling,
    /// More empty days than the budget allows.
    EmptyBudgetExhausted,
    /// The walk reached `max_days_back`.
    MaxDaysBack,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StopReason::FailureCeiling => write!(f, "failure ceiling exceeded"),
            StopReason::EmptyBudgetExhausted => write!(f, "empty day budget exhausted"),
            StopReason::MaxDaysBack => write!(f, "maximum days back reached"),
        }
    }
}

/// Mutable state of one walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkState {
    pub delta_days: u32,
    pub failed_attempts: u32,
    pub empty_budget: i64,
}

impl WalkState {
    pub fn new(start_delta: u32, empty_budget: i64) -> Self {
        Self {
            delta_days: start_delta,
            failed_attempts: 0,
            empty_budget,
        }
    }

    /// Applies one attempt's outcome. A failure keeps the day; every other
    /// outcome advances by exactly one day and clears the failure count.
    pub fn record(&mut self, outcome: DayOutcome, expected_daily_count: usize) {
        match outcome {
            DayOutcome::Failed => self.failed_attempts += 1,
            DayOutcome::Stored { count } => {
                if classify(count, expected_daily_count) == Completeness::Empty {
                    self.empty_budget -= 1;
                }
                self.delta_days += 1;
                self.failed_attempts = 0;
            }
        }
    }

    pub fn stop_reason(
        &self,
        policy: &PolicyConfig,
        max_days_back: Option<u32>,
    ) -> Option<StopReason> {
        if self.failed_attempts > policy.failure_ceiling {
            Some(StopReason::FailureCeiling)
        } else if self.empty_budget < 0 {
            Some(StopReason::EmptyBudgetExhausted)
        } else if max_days_back.is_some_and(|max| self.delta_days >= max) {
            Some(StopReason::MaxDaysBack)
        } else {
            None
        }
    }
}

/// One iteration of a walk, as seen after its outcome was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayVisit {
    pub day: Day,
    /// Offset from the anchor the day was fetched at.
    pub delta_days: u32,
    pub outcome: DayOutcome,
    /// Budget left after this visit.
    pub empty_budget: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkReport {
    pub anchor: Day,
    pub visits: Vec<DayVisit>,
    pub final_state: WalkState,
    pub stop: StopReason,
}

impl WalkReport {
    pub fn iterations(&self) -> usize {
        self.visits.len()
    }

    pub fn days_stored(&self) -> usize {
        self.visits
            .iter()
            .filter(|v| matches!(v.outcome, DayOutcome::Stored { count } if count > 0))
            .count()
    }

    /// True when the walk gave up on a day the source never answered.
    pub fn left_day_unresolved(&self) -> bool {
        self.stop == StopReason::FailureCeiling
    }
}

impl Engine {
    /// Walks backward from `anchor`, starting `start_delta` days before it.
    ///
    /// Returns once a stop condition holds. Only a store failure ends the
    /// walk early, as an error.
    pub async fn migrate(
        &self,
        anchor: Day,
        start_delta: u32,
        max_days_back: Option<u32>,
    ) -> Result<WalkReport, StorageError> {
        let policy = self.policy();
        let mut state = WalkState::new(start_delta, policy.empty_day_budget);
        let mut visits = Vec::new();

        tracing::info!(
            %anchor,
            start_delta,
            ?max_days_back,
            "Starting backward walk"
        );

        let stop = loop {
            if let Some(reason) = state.stop_reason(policy, max_days_back) {
                break reason;
            }

            let day = anchor.minus_days(state.delta_days);
            let delta_days = state.delta_days;
            self.pause(state.failed_attempts > 0).await;

            let outcome = self.fetch_and_store(&day).await?;
            state.record(outcome, policy.expected_daily_count);
            if outcome == DayOutcome::Failed {
                tracing::warn!(
                    %day,
                    failed_attempts = state.failed_attempts,
                    "Retrying day after failure"
                );
            }

            visits.push(DayVisit {
                day,
                delta_days,
                outcome,
                empty_budget: state.empty_budget,
            });
        };

        match stop {
            StopReason::FailureCeiling => tracing::error!(
                day = %anchor.minus_days(state.delta_days),
                "Backward walk stopped: {}",
                stop
            ),
            _ => tracing::info!(
                delta_days = state.delta_days,
                iterations = visits.len(),
                "Backward walk finished: {}",
                stop
            ),
        }

        Ok(WalkReport {
            anchor,
            visits,
            final_state: state,
            stop,
        })
    }

    /// Backfills everything before today.
    pub async fn migrate_full(&self, max_days_back: Option<u32>) -> Result<WalkReport, StorageError> {
        self.migrate(self.today(), 1, max_days_back).await
    }
}
