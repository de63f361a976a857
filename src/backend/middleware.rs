use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    extract::{Json, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use crate::{backend::AppState, utils::constants::SIGNATURE_HEADER};

pub type HmacSha256 = Hmac<Sha256>;

const MAX_WEBHOOK_BODY: usize = 1024 * 1024;

type Rejection = (StatusCode, Json<serde_json::Value>);

fn reject(status: StatusCode, msg: &str) -> Rejection {
    (status, Json(serde_json::json!({ "error": msg })))
}

/// Hex HMAC-SHA256 of `body` under `secret`.
pub fn sign(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Checks `X-Licence-Signature` against the raw body. A missing secret disables the check.
pub async fn verify_signature(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, Rejection> {
    let Some(secret) = state.webhook_secret.as_deref() else {
        return Ok(next.run(req).await);
    };

    let provided = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| hex::decode(v.trim()).ok())
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "missing or malformed signature"))?;

    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, MAX_WEBHOOK_BODY)
        .await
        .map_err(|_| reject(StatusCode::PAYLOAD_TOO_LARGE, "body too large"))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| reject(StatusCode::INTERNAL_SERVER_ERROR, "invalid webhook secret"))?;
    mac.update(&bytes);
    if mac.verify_slice(&provided).is_err() {
        warn!("Rejected purchase webhook with bad signature");
        return Err(reject(StatusCode::UNAUTHORIZED, "invalid signature"));
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
