//! Cron-driven retraining loop for running the Retrainer outside the
//! Functions runtime.

use chrono::{DateTime, Utc};
use cron::Schedule;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use spamguard_core::{Result, SpamError};

use crate::retrainer::Retrainer;

/// A parsed retraining schedule (`cron` crate syntax, seconds first).
#[derive(Debug, Clone)]
pub struct RetrainSchedule {
    expression: String,
    schedule: Schedule,
}

impl RetrainSchedule {
    pub fn parse(expression: &str) -> Result<Self> {
        let schedule = Schedule::from_str(expression).map_err(|e| {
            SpamError::config(format!("invalid cron expression '{expression}': {e}"))
        })?;
        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `from`.
    pub fn next_after(&self, from: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(from).next()
    }

    /// How long to wait from `now` until the next fire time.
    pub fn delay_from(&self, now: DateTime<Utc>) -> Option<Duration> {
        let next = self.next_after(&now)?;
        Some((next - now).to_std().unwrap_or(Duration::ZERO))
    }
}

/// Run retraining cycles on `schedule` until `shutdown` resolves.
///
/// A failed cycle is logged and the loop waits for the next fire time.
/// Returns the number of cycles attempted.
pub async fn run_scheduled<F>(retrainer: &Retrainer, schedule: &RetrainSchedule, shutdown: F) -> usize
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut cycles = 0usize;
    loop {
        let Some(delay) = schedule.delay_from(Utc::now()) else {
            tracing::warn!(schedule = %schedule.expression(), "Schedule has no upcoming fire times");
            return cycles;
        };
        tracing::info!(
            schedule = %schedule.expression(),
            in_secs = delay.as_secs(),
            "Next retraining scheduled"
        );

        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!(cycles, "Retraining schedule stopped");
                return cycles;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        cycles += 1;
        if let Err(e) = retrainer.run().await {
            tracing::warn!(error = %e, cycle = cycles, "Retraining cycle failed; waiting for next run");
        }
    }
}
