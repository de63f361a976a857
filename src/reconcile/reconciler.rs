use chrono::{DateTime, Utc};

use crate::{
    catalog::tier::LicenceStatus,
    reconcile::outcome::{GracePolicy, PolicyViolation, ReconcileOutcome},
    types::{
        product::{licence_for_sku, parse_add_on, product_type_for_sku},
        purchase::{ProductType, PurchaseRecord, PurchaseState},
        state::{EntitlementState, SubscriptionRef},
    },
};

/// Derives the new entitlement state from a full inventory snapshot.
///
/// Pure: persistence, reporting and acknowledgement are left to the caller.
pub fn reconcile(
    previous: &EntitlementState,
    purchases: &[PurchaseRecord],
    is_fresh: bool,
    now: DateTime<Utc>,
    policy: GracePolicy,
) -> ReconcileOutcome {
    let mut state = previous.clone();
    let mut violations = Vec::new();
    let mut pending = Vec::new();
    let mut to_acknowledge = Vec::new();

    for purchase in purchases {
        match purchase.purchase_state {
            PurchaseState::Purchased => {}
            PurchaseState::Pending => pending.push(purchase.purchase_token.clone()),
            PurchaseState::Other(_) => violations.push(PolicyViolation::from(purchase)),
        }
    }

    match find_highest_valid_purchase(purchases) {
        Some((purchase, licence)) if purchase.is_purchased() => {
            grant_licence(&mut state, purchase, licence);
            if !purchase.acknowledged {
                to_acknowledge.push(purchase.purchase_token.clone());
            }
        }
        // unsettled winner: keep whatever licence is held and skip the grace check
        Some(_) => {}
        None if !is_fresh => apply_grace(&mut state, now, policy),
        None => {}
    }

    for purchase in purchases.iter().filter(|p| p.is_purchased()) {
        let mut unlocked_any = false;
        for feature in purchase.products.iter().filter_map(|p| parse_add_on(p)) {
            state.add_on_features.insert(feature);
            unlocked_any = true;
        }
        if unlocked_any
            && !purchase.acknowledged
            && !to_acknowledge.contains(&purchase.purchase_token)
        {
            to_acknowledge.push(purchase.purchase_token.clone());
        }
    }

    let new_add_ons = state
        .add_on_features
        .difference(&previous.add_on_features)
        .copied()
        .collect::<Vec<_>>();
    let licence_changed = state.licence != previous.licence;

    ReconcileOutcome {
        should_notify: is_fresh || licence_changed || !new_add_ons.is_empty(),
        state,
        licence_changed,
        new_add_ons,
        violations,
        pending,
        to_acknowledge,
        persisted: false,
    }
}

/// Highest licence-granting purchase; ties go to the first one in input order.
pub fn find_highest_valid_purchase(
    purchases: &[PurchaseRecord],
) -> Option<(&PurchaseRecord, LicenceStatus)> {
    purchases
        .iter()
        .filter(|p| !p.is_pending())
        .filter_map(|p| licence_for_sku(p.primary_product()?).map(|licence| (p, licence)))
        .fold(None, |best, (purchase, licence)| match best {
            Some((_, best_licence)) if best_licence >= licence => best,
            _ => Some((purchase, licence)),
        })
}

fn grant_licence(state: &mut EntitlementState, purchase: &PurchaseRecord, licence: LicenceStatus) {
    state.licence = Some(licence);
    state.order_id = purchase.order_id.clone();
    state.unbacked_since = None;
    state.subscription = purchase
        .primary_product()
        .filter(|sku| product_type_for_sku(sku) == ProductType::Subs)
        .map(|sku| SubscriptionRef {
            sku: sku.to_string(),
            purchase_token: purchase.purchase_token.clone(),
        });
}

fn apply_grace(state: &mut EntitlementState, now: DateTime<Utc>, policy: GracePolicy) {
    if state.licence.is_none() {
        return;
    }
    match policy {
        GracePolicy::Immediate => state.clear_licence(),
        GracePolicy::Window(window) => {
            let now_ms = now.timestamp_millis();
            let since = match state.unbacked_since {
                Some(since) if (0..=now_ms).contains(&since) => since,
                _ => now_ms,
            };
            state.unbacked_since = Some(since);
            if now_ms.saturating_sub(since) >= window.num_milliseconds() {
                state.clear_licence();
            }
        }
    }
}
