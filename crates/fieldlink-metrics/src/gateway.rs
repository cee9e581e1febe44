//! ---
//! fl_section: "03-logging-metrics"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Metric families recorded by the gateway."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use prometheus::{GaugeVec, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts};

use crate::SharedRegistry;

/// Metrics recorded across bring-up and the publish loop.
#[derive(Clone, Debug)]
pub struct GatewayMetrics {
    registry: SharedRegistry,
    stage_outcomes: IntCounterVec,
    publishes: IntCounterVec,
    publish_counter: IntGauge,
    registration_attempts: IntGauge,
    bringup_seconds: Histogram,
    build_info: GaugeVec,
}

impl GatewayMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let stage_outcomes = IntCounterVec::new(
            Opts::new(
                "fieldlink_stage_outcomes_total",
                "Bring-up and session stage results by stage and outcome",
            ),
            &["stage", "outcome"],
        )?;
        registry.register(Box::new(stage_outcomes.clone()))?;

        let publishes = IntCounterVec::new(
            Opts::new(
                "fieldlink_publishes_total",
                "Publish attempts by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(publishes.clone()))?;

        let publish_counter = IntGauge::with_opts(Opts::new(
            "fieldlink_publish_counter",
            "Current value of the publish sequence counter",
        ))?;
        registry.register(Box::new(publish_counter.clone()))?;

        let registration_attempts = IntGauge::with_opts(Opts::new(
            "fieldlink_registration_attempts",
            "Registration queries issued during the last bring-up",
        ))?;
        registry.register(Box::new(registration_attempts.clone()))?;

        let buckets = prometheus::exponential_buckets(5.0, 1.5, 10)
            .context("failed to construct histogram buckets")?;
        let bringup_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "fieldlink_bringup_seconds",
                "Time from boot to an established broker session",
            )
            .buckets(buckets),
        )?;
        registry.register(Box::new(bringup_seconds.clone()))?;

        let build_info = GaugeVec::new(
            Opts::new("fieldlink_build_info", "Build metadata for the running binary"),
            &["version", "target"],
        )?;
        registry.register(Box::new(build_info.clone()))?;

        Ok(Self {
            registry,
            stage_outcomes,
            publishes,
            publish_counter,
            registration_attempts,
            bringup_seconds,
            build_info,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn record_stage(&self, stage: &str, outcome: &str) {
        self.stage_outcomes.with_label_values(&[stage, outcome]).inc();
    }

    pub fn record_publish(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.publishes.with_label_values(&[outcome]).inc();
    }

    pub fn set_publish_counter(&self, value: u64) {
        self.publish_counter.set(i64::try_from(value).unwrap_or(i64::MAX));
    }

    pub fn set_registration_attempts(&self, attempts: u32) {
        self.registration_attempts.set(i64::from(attempts));
    }

    pub fn observe_bringup(&self, seconds: f64) {
        self.bringup_seconds.observe(seconds);
    }

    pub fn set_build_info(&self, version: &str, target: &str) {
        self.build_info.with_label_values(&[version, target]).set(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::new_registry;

    #[test]
    fn stage_outcomes_are_labelled() {
        let metrics = GatewayMetrics::new(new_registry()).unwrap();
        metrics.record_stage("data", "degraded");
        metrics.record_stage("data", "degraded");
        metrics.record_stage("registration", "success");
        assert_eq!(
            metrics
                .stage_outcomes
                .with_label_values(&["data", "degraded"])
                .get(),
            2
        );
    }

    #[test]
    fn gauges_track_latest_values() {
        let metrics = GatewayMetrics::new(new_registry()).unwrap();
        metrics.set_publish_counter(7);
        metrics.set_registration_attempts(3);
        assert_eq!(metrics.publish_counter.get(), 7);
        assert_eq!(metrics.registration_attempts.get(), 3);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = new_registry();
        let _first = GatewayMetrics::new(registry.clone()).unwrap();
        assert!(GatewayMetrics::new(registry).is_err());
    }
}
