use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::types::purchase::{
    ProductDetails, ProductType, PurchaseInitiationResult, PurchaseRecord,
};

/// Purchase-processing backend the licence handler talks to.
#[async_trait]
pub trait BillingGateway: Send + Sync {
    async fn query_purchases(&self) -> Result<Vec<PurchaseRecord>, BillingError>;

    async fn query_product_details(&self, skus: &[String]) -> Result<Vec<ProductDetails>, BillingError>;

    /// `old_purchase_token` is set when the new purchase replaces a held subscription.
    async fn launch_purchase_flow(
        &self,
        sku: &str,
        product_type: ProductType,
        old_purchase_token: Option<&str>,
    ) -> Result<PurchaseInitiationResult, BillingError>;

    async fn acknowledge(&self, purchase_token: &str) -> Result<(), BillingError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Billing API unreachable: {0}")]
    Unreachable(String),
    #[error("Billing API error: HTTP {0}")]
    ApiError(u16),
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl BillingError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BillingError::Unreachable(_) | BillingError::ApiError(500..=599)
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseFlowRequest<'a> {
    sku: &'a str,
    product_type: &'a str,
    old_purchase_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseFlowResponse {
    response_code: i32,
}

pub struct HttpBillingGateway {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpBillingGateway {
    pub fn new(api_url: String, api_key: String) -> Result<Self, BillingError> {
        let client = Client::builder()
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(10))
            .use_rustls_tls()
            .build()
            .map_err(|e| BillingError::Unreachable(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, BillingError> {
        let resp = request
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Billing API unreachable");
                BillingError::Unreachable(e.to_string())
            })?;

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "Billing API returned non-2xx");
            return Err(BillingError::ApiError(resp.status().as_u16()));
        }
        Ok(resp)
    }
}

#[async_trait]
impl BillingGateway for HttpBillingGateway {
    async fn query_purchases(&self) -> Result<Vec<PurchaseRecord>, BillingError> {
        let url = format!("{}/purchases", self.api_url);
        let resp = self.send(self.client.get(&url)).await?;

        resp.json::<Vec<PurchaseRecord>>().await.map_err(|e| {
            error!(error = %e, "Failed to parse purchases");
            BillingError::ParseError(e.to_string())
        })
    }

    async fn query_product_details(&self, skus: &[String]) -> Result<Vec<ProductDetails>, BillingError> {
        let url = format!("{}/products", self.api_url);
        let resp = self
            .send(self.client.post(&url).json(&serde_json::json!({ "productIds": skus })))
            .await?;

        resp.json::<Vec<ProductDetails>>().await.map_err(|e| {
            error!(error = %e, "Failed to parse product details");
            BillingError::ParseError(e.to_string())
        })
    }

    async fn launch_purchase_flow(
        &self,
        sku: &str,
        product_type: ProductType,
        old_purchase_token: Option<&str>,
    ) -> Result<PurchaseInitiationResult, BillingError> {
        let url = format!("{}/purchase-flows", self.api_url);
        let body = PurchaseFlowRequest {
            sku,
            product_type: product_type.as_str(),
            old_purchase_token,
        };
        let resp = self.send(self.client.post(&url).json(&body)).await?;

        let flow = resp.json::<PurchaseFlowResponse>().await.map_err(|e| {
            error!(error = %e, "Failed to parse purchase flow response");
            BillingError::ParseError(e.to_string())
        })?;
        Ok(PurchaseInitiationResult::from_response_code(flow.response_code))
    }

    async fn acknowledge(&self, purchase_token: &str) -> Result<(), BillingError> {
        let url = format!("{}/purchases/{}/acknowledge", self.api_url, purchase_token);
        self.send(self.client.post(&url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        assert!(BillingError::ApiError(503).is_transient());
        assert!(BillingError::Unreachable("refused".into()).is_transient());
        assert!(!BillingError::ApiError(404).is_transient());
        assert!(!BillingError::ParseError("eof".into()).is_transient());
    }

    #[test]
    fn purchase_flow_request_uses_camel_case() {
        let body = PurchaseFlowRequest {
            sku: "sku_professional_yearly",
            product_type: ProductType::Subs.as_str(),
            old_purchase_token: Some("old"),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["productType"], "subs");
        assert_eq!(json["oldPurchaseToken"], "old");
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let gateway = HttpBillingGateway::new("http://billing.local/".into(), "k".into()).unwrap();
        assert_eq!(gateway.api_url, "http://billing.local");
    }
}
