//! Temporal backfill and reconciliation engine.
//!
//! The engine decides which day to fetch next and when to stop. It talks to
//! the portal through [`DaySource`] and to InfluxDB through [`PointStore`];
//! the store is the only durable state and is queried at the start of every
//! operation. All days are processed strictly one after another.
//!
//! Operations:
//! - [`Engine::migrate`]: retry-bounded backward walk from an anchor day
//! - [`Engine::continue_migration`]: resume the backward walk below the
//!   earliest stored point
//! - [`Engine::update`]: forward walk up to today, then revalidation of a
//!   trailing window
//! - [`Engine::doctor`]: read-only weekly audit of stored against fetched values
//! - [`Engine::consumption_report`]: weekly consumption summary from the store

mod completeness;
mod continuation;
mod doctor;
mod fetch;
mod report;
mod updater;
mod walker;

pub use completeness::{classify, Completeness};
pub use updater::UpdateReport;
pub use walker::WalkReport;

use crate::config::PolicyConfig;
use crate::model::{Clock, Day, DaySource, PointStore};
use chrono_tz::Tz;
use std::sync::Arc;

/// Meter identity and policy the engine runs with.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub meter_id: String,
    pub tz: Tz,
    pub policy: PolicyConfig,
}

/// Result of one fetch-and-store attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayOutcome {
    /// The source answered; `count` points were written (zero means empty).
    Stored { count: usize },
    /// The source failed; nothing was written.
    Failed,
}

pub struct Engine {
    source: Arc<dyn DaySource>,
    store: Arc<dyn PointStore>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(
        source: Arc<dyn DaySource>,
        store: Arc<dyn PointStore>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            source,
            store,
            clock,
            settings,
        }
    }

    fn policy(&self) -> &PolicyConfig {
        &self.settings.policy
    }

    fn meter_id(&self) -> &str {
        &self.settings.meter_id
    }

    fn today(&self) -> Day {
        Day::containing(self.clock.now(), self.settings.tz)
    }

    /// Mandatory pause before every fetch; longer after a failed attempt.
    async fn pause(&self, after_failure: bool) {
        let delay = if after_failure {
            self.policy().failure_delay()
        } else {
            self.policy().delay()
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
