use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::{error, warn};

use crate::reconcile::PolicyViolation;

pub struct LicenceMetrics {
    pub reconciliations: IntCounter,
    pub policy_violations: IntCounter,
    pub persistence_failures: IntCounter,
    pub notifications: IntCounter,
    pub purchase_flows: IntCounterVec,
    pub reported_errors: IntCounterVec,
    registry: Registry,
}

impl LicenceMetrics {
    fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let reconciliations = IntCounter::new(
            "licence_reconciliations_total",
            "Reconciliation passes over the purchase inventory",
        )?;
        let policy_violations = IntCounter::new(
            "licence_policy_violations_total",
            "Purchases found in an unexpected state",
        )?;
        let persistence_failures = IntCounter::new(
            "licence_persistence_failures_total",
            "Entitlement state writes that failed",
        )?;
        let notifications = IntCounter::new(
            "licence_notifications_total",
            "Licence notifications sent to the UI",
        )?;
        let purchase_flows = IntCounterVec::new(
            Opts::new("licence_purchase_flows_total", "Purchase flows by outcome"),
            &["outcome"],
        )?;
        let reported_errors = IntCounterVec::new(
            Opts::new("licence_reported_errors_total", "Non-fatal errors by context"),
            &["context"],
        )?;

        registry.register(Box::new(reconciliations.clone()))?;
        registry.register(Box::new(policy_violations.clone()))?;
        registry.register(Box::new(persistence_failures.clone()))?;
        registry.register(Box::new(notifications.clone()))?;
        registry.register(Box::new(purchase_flows.clone()))?;
        registry.register(Box::new(reported_errors.clone()))?;

        Ok(Self {
            reconciliations,
            policy_violations,
            persistence_failures,
            notifications,
            purchase_flows,
            reported_errors,
            registry,
        })
    }

    pub fn encode(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        encoder.encode_to_string(&families).unwrap_or_default()
    }
}

/// `None` only if the metric definitions are rejected by prometheus.
pub static METRICS: Lazy<Option<LicenceMetrics>> = Lazy::new(|| match LicenceMetrics::new() {
    Ok(metrics) => Some(metrics),
    Err(e) => {
        error!(error = %e, "Failed to register licence metrics");
        None
    }
});

pub fn with_metrics(f: impl FnOnce(&LicenceMetrics)) {
    if let Some(metrics) = METRICS.as_ref() {
        f(metrics);
    }
}

pub async fn metrics_handler() -> String {
    METRICS.as_ref().map(LicenceMetrics::encode).unwrap_or_default()
}

/// Where non-fatal problems of the licence handler go.
pub trait ObservabilitySink: Send + Sync {
    fn report_violation(&self, violation: &PolicyViolation);

    fn report_error(&self, context: &str, error: &dyn std::error::Error);
}

/// Logs through tracing and counts in the prometheus registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsSink;

impl ObservabilitySink for MetricsSink {
    fn report_violation(&self, violation: &PolicyViolation) {
        warn!(
            product = violation.product.as_deref().unwrap_or("<none>"),
            order_id = violation.order_id.as_deref().unwrap_or("<none>"),
            state = ?violation.state,
            "{}",
            violation
        );
        with_metrics(|m| m.policy_violations.inc());
    }

    fn report_error(&self, context: &str, error: &dyn std::error::Error) {
        error!(context = context, error = %error, "Non-fatal licence error");
        with_metrics(|m| m.reported_errors.with_label_values(&[context]).inc());
    }
}
