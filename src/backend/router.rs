use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use crate::{
    backend::{
        AppState,
        handlers::{
            feature_handler, features_handler, health_handler, licence_handler,
            purchase_flow_handler, purchases_webhook_handler, usage_handler,
        },
        middleware::verify_signature,
    },
    events::metrics::metrics_handler,
};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/licence", get(licence_handler))
        .route("/features", get(features_handler))
        .route("/features/:name", get(feature_handler))
        .route("/features/:name/usage", post(usage_handler))
        .route(
            "/purchases",
            post(purchases_webhook_handler)
                .route_layer(from_fn_with_state(state.clone(), verify_signature)),
        )
        .route("/purchase-flows", post(purchase_flow_handler))
        .with_state(state)
}
