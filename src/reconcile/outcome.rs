use std::fmt;

use chrono::Duration;
use serde::Serialize;

use crate::{
    catalog::features::ContribFeature,
    types::{
        purchase::{PurchaseRecord, PurchaseState},
        state::EntitlementState,
    },
};

/// What happens to a held licence once no purchase backs it anymore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GracePolicy {
    #[default]
    Immediate,
    /// Keep the licence for this long after the first pass that found it unbacked.
    Window(Duration),
}

impl GracePolicy {
    pub fn from_days(days: Option<u32>) -> Self {
        match days {
            Some(days) if days > 0 => GracePolicy::Window(Duration::days(days as i64)),
            _ => GracePolicy::Immediate,
        }
    }
}

/// A purchase found in a state that should not reach reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyViolation {
    pub product: Option<String>,
    pub order_id: Option<String>,
    pub purchase_token: String,
    pub state: PurchaseState,
}

impl From<&PurchaseRecord> for PolicyViolation {
    fn from(purchase: &PurchaseRecord) -> Self {
        Self {
            product: purchase.primary_product().map(str::to_string),
            order_id: purchase.order_id.clone(),
            purchase_token: purchase.purchase_token.clone(),
            state: purchase.purchase_state,
        }
    }
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Found purchase of {} in state {:?}",
            self.product.as_deref().unwrap_or("<none>"),
            self.state
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub state: EntitlementState,
    pub should_notify: bool,
    pub licence_changed: bool,
    pub new_add_ons: Vec<ContribFeature>,
    pub violations: Vec<PolicyViolation>,
    /// Tokens of pending purchases, excluded from this pass.
    pub pending: Vec<String>,
    /// Tokens of granting purchases the billing channel has not acknowledged yet.
    pub to_acknowledge: Vec<String>,
    /// Set by the handler once the state has been written.
    pub persisted: bool,
}
