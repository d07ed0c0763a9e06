//! Wall-clock driver: one controller round per tick

use std::time::Duration;

use entroswarm_common::Result;
use entroswarm_darwinian::{CancellationFlag, RoundOutcome, SwarmController};
use tokio::time::MissedTickBehavior;
use tracing::info;

/// What a driver run did before it stopped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub ticks: u64,
    pub rounds_finalized: u64,
    pub attempts: u64,
    pub cancelled: bool,
}

pub struct TickDriver {
    interval: Duration,
    max_rounds: Option<u64>,
}

impl TickDriver {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_rounds: None,
        }
    }

    /// Stop after `max_rounds` finalized rounds
    pub fn with_max_rounds(mut self, max_rounds: Option<u64>) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Tick until cancelled, a round fails, or the round limit is reached.
    ///
    /// A round longer than the interval delays the next tick; missed ticks
    /// are never replayed in a burst.
    pub async fn run(
        &self,
        controller: &mut SwarmController,
        cancel: &CancellationFlag,
    ) -> Result<TickSummary> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut summary = TickSummary::default();

        loop {
            ticker.tick().await;
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            summary.ticks += 1;

            match controller.run_round(cancel).await? {
                RoundOutcome::Finalized { attempts, report } => {
                    summary.attempts += attempts;
                    summary.rounds_finalized += 1;
                    info!(
                        round = summary.rounds_finalized,
                        attempts,
                        winner = %report.winner_name,
                        record = report.record,
                        "Round finalized"
                    );
                }
                RoundOutcome::Cancelled { attempts } => {
                    summary.attempts += attempts;
                    summary.cancelled = true;
                    break;
                }
            }

            if self
                .max_rounds
                .is_some_and(|max| summary.rounds_finalized >= max)
            {
                info!(rounds = summary.rounds_finalized, "Round limit reached");
                break;
            }
        }

        Ok(summary)
    }
}
