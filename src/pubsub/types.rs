use serde::{Deserialize, Serialize};

use crate::{
    catalog::{features::ContribFeature, strings::describe_status, tier::LicenceStatus},
    reconcile::ReconcileOutcome,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenceNotification {
    pub installation: String,
    pub action: NotificationAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationAction {
    StatusChanged(LicenceUpdateEvent),
    PurchaseCancelled,
    PurchaseFailed { code: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenceUpdateEvent {
    pub status: String,
    pub licence: Option<LicenceStatus>,
    pub add_on_features: Vec<ContribFeature>,
    pub new_add_ons: Vec<ContribFeature>,
}

impl LicenceUpdateEvent {
    pub fn from_outcome(outcome: &ReconcileOutcome) -> Self {
        Self {
            status: describe_status(&outcome.state),
            licence: outcome.state.licence,
            add_on_features: outcome.state.add_on_features.iter().copied().collect(),
            new_add_ons: outcome.new_add_ons.clone(),
        }
    }
}

impl LicenceNotification {
    pub fn status_changed(installation: &str, outcome: &ReconcileOutcome) -> Self {
        Self {
            installation: installation.to_string(),
            action: NotificationAction::StatusChanged(LicenceUpdateEvent::from_outcome(outcome)),
        }
    }

    pub fn purchase_cancelled(installation: &str) -> Self {
        Self {
            installation: installation.to_string(),
            action: NotificationAction::PurchaseCancelled,
        }
    }

    pub fn purchase_failed(installation: &str, code: i32) -> Self {
        Self {
            installation: installation.to_string(),
            action: NotificationAction::PurchaseFailed { code },
        }
    }
}
