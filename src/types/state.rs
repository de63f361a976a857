use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{features::ContribFeature, tier::LicenceStatus};

/// Sku and purchase token of the recurring purchase currently held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRef {
    pub sku: String,
    pub purchase_token: String,
}

/// Persisted entitlement aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementState {
    /// `None` when no licence is held, which reads as `Free`.
    pub licence: Option<LicenceStatus>,
    pub add_on_features: BTreeSet<ContribFeature>,
    /// First usage per feature, in epoch millis.
    pub trial_starts: BTreeMap<ContribFeature, i64>,
    pub subscription: Option<SubscriptionRef>,
    pub order_id: Option<String>,
    /// Set while a held licence has lost its backing purchase but is kept by the grace policy.
    pub unbacked_since: Option<i64>,
}

impl EntitlementState {
    pub fn held_tier(&self) -> LicenceStatus {
        self.licence.unwrap_or_default()
    }

    pub fn has_access_to(&self, feature: ContribFeature) -> bool {
        feature.is_satisfied_by(self.held_tier()) || self.add_on_features.contains(&feature)
    }

    pub fn trial_start(&self, feature: ContribFeature) -> Option<DateTime<Utc>> {
        self.trial_starts
            .get(&feature)
            .and_then(|ms| DateTime::<Utc>::from_timestamp_millis(*ms))
    }

    /// Records the first usage of `feature`. Returns false if a start was already present.
    pub fn start_trial(&mut self, feature: ContribFeature, now: DateTime<Utc>) -> bool {
        if self.trial_starts.contains_key(&feature) {
            return false;
        }
        self.trial_starts.insert(feature, now.timestamp_millis());
        true
    }

    /// Drops the licence and everything derived from the purchase that granted it.
    pub fn clear_licence(&mut self) {
        self.licence = None;
        self.subscription = None;
        self.order_id = None;
        self.unbacked_since = None;
    }
}
