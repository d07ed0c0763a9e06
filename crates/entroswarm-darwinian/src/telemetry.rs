//! Prometheus metrics for the swarm controller

use prometheus::{Gauge, Histogram, HistogramOpts, IntCounter, Registry};

/// Prometheus metrics for the search loop
pub struct SwarmMetrics {
    pub rounds_finalized: IntCounter,
    pub round_retries: IntCounter,
    pub actions_dispatched: IntCounter,
    pub best_fitness: Gauge,
    pub scoring_duration_seconds: Histogram,
}

impl SwarmMetrics {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            rounds_finalized: IntCounter::new(
                "entroswarm_rounds_finalized_total",
                "Rounds that improved the best record and propagated",
            )?,
            round_retries: IntCounter::new(
                "entroswarm_round_retries_total",
                "Round attempts retried after stagnation",
            )?,
            actions_dispatched: IntCounter::new(
                "entroswarm_actions_dispatched_total",
                "Distinct actions dispatched across the population",
            )?,
            best_fitness: Gauge::new(
                "entroswarm_best_fitness",
                "Best comparison value recorded so far",
            )?,
            scoring_duration_seconds: Histogram::with_opts(
                HistogramOpts::new(
                    "entroswarm_scoring_duration_seconds",
                    "Time spent scoring one snapshot",
                )
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
            )?,
        })
    }

    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.rounds_finalized.clone()))?;
        registry.register(Box::new(self.round_retries.clone()))?;
        registry.register(Box::new(self.actions_dispatched.clone()))?;
        registry.register(Box::new(self.best_fitness.clone()))?;
        registry.register(Box::new(self.scoring_duration_seconds.clone()))?;
        Ok(())
    }
}
