use std::{str::FromStr, sync::Arc};

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    backend::AppState,
    catalog::{
        features::{ContribFeature, TrialMode},
        strings::{describe_status, label},
        tier::LicenceStatus,
        trial::{self, TrialStatus},
    },
    events::types::BillingEvent,
    types::{
        product::Package,
        purchase::{PurchaseInitiationResult, PurchaseRecord},
        state::EntitlementState,
    },
    utils::error::LicenceError,
};

#[derive(Debug, Serialize)]
pub struct LicenceView {
    pub licence: Option<LicenceStatus>,
    pub tier: LicenceStatus,
    pub status: String,
    pub add_on_features: Vec<ContribFeature>,
}

#[derive(Debug, Serialize)]
pub struct FeatureView {
    pub name: ContribFeature,
    pub label: &'static str,
    pub required: LicenceStatus,
    pub trial_mode: TrialMode,
    pub unlocked: bool,
    pub trial: TrialStatus,
    pub end_of_trial: Option<DateTime<Utc>>,
}

impl FeatureView {
    fn new(feature: ContribFeature, state: &EntitlementState, now: DateTime<Utc>) -> Self {
        Self {
            name: feature,
            label: label(feature),
            required: feature.licence_status(),
            trial_mode: feature.trial_mode(),
            unlocked: state.has_access_to(feature),
            trial: trial::trial_status(feature, state, now),
            end_of_trial: trial::end_of_trial(feature, state, now),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PurchaseBatch {
    pub purchases: Vec<PurchaseRecord>,
    #[serde(default)]
    pub new_purchase: bool,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseFlowRequest {
    pub package: String,
    #[serde(default)]
    pub replace_existing: bool,
}

pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "contrib-licence"
    }))
}

pub async fn licence_handler(State(state): State<Arc<AppState>>) -> Json<LicenceView> {
    let snapshot = state.handler.snapshot().await;
    Json(LicenceView {
        licence: snapshot.licence,
        tier: snapshot.held_tier(),
        status: describe_status(&snapshot),
        add_on_features: snapshot.add_on_features.iter().copied().collect(),
    })
}

pub async fn features_handler(State(state): State<Arc<AppState>>) -> Json<Vec<FeatureView>> {
    let snapshot = state.handler.snapshot().await;
    let now = Utc::now();
    Json(
        ContribFeature::ALL
            .into_iter()
            .map(|f| FeatureView::new(f, &snapshot, now))
            .collect(),
    )
}

pub async fn feature_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<FeatureView>, LicenceError> {
    let feature = ContribFeature::from_str(&name)?;
    let snapshot = state.handler.snapshot().await;
    Ok(Json(FeatureView::new(feature, &snapshot, Utc::now())))
}

pub async fn usage_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, LicenceError> {
    let feature = ContribFeature::from_str(&name)?;
    let now = Utc::now();
    let started = state.handler.record_first_usage(feature, now).await?;
    let trial = state.handler.trial_status(feature, now).await;

    Ok(Json(serde_json::json!({
        "feature": feature,
        "started": started,
        "trial": trial,
    })))
}

pub async fn purchases_webhook_handler(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<PurchaseBatch>,
) -> Result<impl IntoResponse, LicenceError> {
    info!(
        purchases = batch.purchases.len(),
        new_purchase = batch.new_purchase,
        "Purchase webhook received"
    );

    state
        .events
        .send(BillingEvent::PurchasesUpdated {
            purchases: batch.purchases,
            new_purchase: batch.new_purchase,
        })
        .await
        .map_err(|_| LicenceError::Other("licence worker is not running".to_string()))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({"status": "queued"})),
    ))
}

pub async fn purchase_flow_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PurchaseFlowRequest>,
) -> Result<Json<PurchaseInitiationResult>, LicenceError> {
    let package = Package::from_str(&request.package)?;
    let result = state
        .handler
        .initiate_purchase(package, request.replace_existing)
        .await?;

    let event = match result {
        PurchaseInitiationResult::Success => None,
        PurchaseInitiationResult::UserCancelled => Some(BillingEvent::PurchaseCanceled),
        PurchaseInitiationResult::Failed { code } => Some(BillingEvent::PurchaseFailed { code }),
    };
    if let Some(event) = event {
        if let Err(e) = state.events.send(event).await {
            warn!(error = %e, "Could not forward purchase flow outcome");
        }
    }

    Ok(Json(result))
}
