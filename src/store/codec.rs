//! Flat key/value layout of the entitlement state in the preference store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::{
    catalog::{features::ContribFeature, tier::LicenceStatus},
    types::state::{EntitlementState, SubscriptionRef},
};

pub const KEY_LICENCE_STATUS: &str = "licence_status";
pub const KEY_ADD_ON_FEATURES: &str = "add_on_features";
pub const KEY_CURRENT_SUBSCRIPTION_SKU: &str = "current_subscription_sku";
pub const KEY_CURRENT_SUBSCRIPTION_PURCHASE_TOKEN: &str = "current_subscription_purchase_token";
pub const KEY_ORDER_ID: &str = "order_id";
pub const KEY_UNBACKED_SINCE: &str = "unbacked_since";

const ADD_ON_DELIMITER: &str = ",";

pub fn price_key(sku: &str) -> String {
    format!("{}_price", sku)
}

pub fn encode(state: &EntitlementState) -> Vec<(String, String)> {
    let mut fields = Vec::new();

    if let Some(licence) = state.licence {
        fields.push((KEY_LICENCE_STATUS.to_string(), licence.as_key().to_string()));
    }
    if !state.add_on_features.is_empty() {
        let joined = state
            .add_on_features
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(ADD_ON_DELIMITER);
        fields.push((KEY_ADD_ON_FEATURES.to_string(), joined));
    }
    if let Some(subscription) = &state.subscription {
        fields.push((
            KEY_CURRENT_SUBSCRIPTION_SKU.to_string(),
            subscription.sku.clone(),
        ));
        fields.push((
            KEY_CURRENT_SUBSCRIPTION_PURCHASE_TOKEN.to_string(),
            subscription.purchase_token.clone(),
        ));
    }
    if let Some(order_id) = &state.order_id {
        fields.push((KEY_ORDER_ID.to_string(), order_id.clone()));
    }
    if let Some(since) = state.unbacked_since {
        fields.push((KEY_UNBACKED_SINCE.to_string(), since.to_string()));
    }
    for (feature, started) in &state.trial_starts {
        fields.push((feature.pref_key(), started.to_string()));
    }

    fields
}

/// Rebuilds the state, skipping entries that no longer parse.
pub fn decode(fields: &HashMap<String, String>) -> EntitlementState {
    let mut state = EntitlementState::default();

    if let Some(raw) = fields.get(KEY_LICENCE_STATUS) {
        match raw.parse::<LicenceStatus>() {
            Ok(LicenceStatus::Free) => {}
            Ok(licence) => state.licence = Some(licence),
            Err(e) => warn!(value = %raw, error = %e, "Ignoring stored licence status"),
        }
    }

    if let Some(raw) = fields.get(KEY_ADD_ON_FEATURES) {
        for name in raw.split(ADD_ON_DELIMITER).filter(|s| !s.trim().is_empty()) {
            match name.parse::<ContribFeature>() {
                Ok(feature) => {
                    state.add_on_features.insert(feature);
                }
                Err(e) => warn!(value = %name, error = %e, "Ignoring stored add-on"),
            }
        }
    }

    state.subscription = match (
        fields.get(KEY_CURRENT_SUBSCRIPTION_SKU),
        fields.get(KEY_CURRENT_SUBSCRIPTION_PURCHASE_TOKEN),
    ) {
        (Some(sku), Some(token)) => Some(SubscriptionRef {
            sku: sku.clone(),
            purchase_token: token.clone(),
        }),
        _ => None,
    };

    state.order_id = fields.get(KEY_ORDER_ID).cloned();
    state.unbacked_since = fields.get(KEY_UNBACKED_SINCE).and_then(|raw| {
        let since = parse_millis(raw);
        if since.is_none() {
            warn!(value = %raw, "Ignoring stored unbacked marker");
        }
        since
    });

    for feature in ContribFeature::ALL {
        if let Some(raw) = fields.get(&feature.pref_key()) {
            match parse_millis(raw) {
                Some(started) => {
                    state.trial_starts.insert(feature, started);
                }
                None => warn!(feature = %feature, value = %raw, "Ignoring stored trial start"),
            }
        }
    }

    state
}

/// Epoch millis that chrono can represent and that are not before the epoch.
fn parse_millis(raw: &str) -> Option<i64> {
    let millis = raw.trim().parse::<i64>().ok().filter(|ms| *ms >= 0)?;
    DateTime::<Utc>::from_timestamp_millis(millis).map(|_| millis)
}
