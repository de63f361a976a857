//! Fakes for the collaborators of the licence handler.

use std::sync::{
    Mutex as StdMutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::{
    billing::gateway::{BillingError, BillingGateway},
    events::metrics::ObservabilitySink,
    pubsub::{notifier::LicenceNotifier, types::LicenceNotification},
    reconcile::PolicyViolation,
    types::purchase::{ProductDetails, ProductType, PurchaseInitiationResult, PurchaseRecord},
    utils::error::LicenceError,
};

pub struct FakeGateway {
    purchases: Mutex<Vec<PurchaseRecord>>,
    products: Mutex<Vec<ProductDetails>>,
    launch_result: Mutex<PurchaseInitiationResult>,
    launched: Mutex<Vec<(String, ProductType, Option<String>)>>,
    acknowledged: Mutex<Vec<String>>,
    purchase_queries: AtomicUsize,
    product_queries: AtomicUsize,
    fail_launch: AtomicBool,
    fail_acknowledge: AtomicBool,
    fail_queries: AtomicBool,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            purchases: Mutex::new(Vec::new()),
            products: Mutex::new(Vec::new()),
            launch_result: Mutex::new(PurchaseInitiationResult::Success),
            launched: Mutex::new(Vec::new()),
            acknowledged: Mutex::new(Vec::new()),
            purchase_queries: AtomicUsize::new(0),
            product_queries: AtomicUsize::new(0),
            fail_launch: AtomicBool::new(false),
            fail_acknowledge: AtomicBool::new(false),
            fail_queries: AtomicBool::new(false),
        }
    }
}

impl FakeGateway {
    pub async fn set_purchases(&self, purchases: Vec<PurchaseRecord>) {
        *self.purchases.lock().await = purchases;
    }

    pub async fn set_products(&self, products: Vec<ProductDetails>) {
        *self.products.lock().await = products;
    }

    pub async fn set_launch_result(&self, result: PurchaseInitiationResult) {
        *self.launch_result.lock().await = result;
    }

    pub fn fail_launch(&self, fail: bool) {
        self.fail_launch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_acknowledge(&self, fail: bool) {
        self.fail_acknowledge.store(fail, Ordering::SeqCst);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub async fn launched(&self) -> Vec<(String, ProductType, Option<String>)> {
        self.launched.lock().await.clone()
    }

    pub async fn acknowledged(&self) -> Vec<String> {
        self.acknowledged.lock().await.clone()
    }

    pub fn purchase_queries(&self) -> usize {
        self.purchase_queries.load(Ordering::SeqCst)
    }

    pub fn product_queries(&self) -> usize {
        self.product_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BillingGateway for FakeGateway {
    async fn query_purchases(&self) -> Result<Vec<PurchaseRecord>, BillingError> {
        self.purchase_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(BillingError::ApiError(503));
        }
        Ok(self.purchases.lock().await.clone())
    }

    async fn query_product_details(&self, _skus: &[String]) -> Result<Vec<ProductDetails>, BillingError> {
        self.product_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(BillingError::ApiError(503));
        }
        Ok(self.products.lock().await.clone())
    }

    async fn launch_purchase_flow(
        &self,
        sku: &str,
        product_type: ProductType,
        old_purchase_token: Option<&str>,
    ) -> Result<PurchaseInitiationResult, BillingError> {
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(BillingError::Unreachable("connection refused".to_string()));
        }
        self.launched.lock().await.push((
            sku.to_string(),
            product_type,
            old_purchase_token.map(str::to_string),
        ));
        Ok(*self.launch_result.lock().await)
    }

    async fn acknowledge(&self, purchase_token: &str) -> Result<(), BillingError> {
        if self.fail_acknowledge.load(Ordering::SeqCst) {
            return Err(BillingError::ApiError(500));
        }
        self.acknowledged.lock().await.push(purchase_token.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    violations: StdMutex<Vec<String>>,
    errors: StdMutex<Vec<String>>,
}

impl RecordingSink {
    /// Purchase tokens of the reported violations.
    pub fn violations(&self) -> Vec<String> {
        self.violations.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Contexts of the reported errors.
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl ObservabilitySink for RecordingSink {
    fn report_violation(&self, violation: &PolicyViolation) {
        if let Ok(mut v) = self.violations.lock() {
            v.push(violation.purchase_token.clone());
        }
    }

    fn report_error(&self, context: &str, _error: &dyn std::error::Error) {
        if let Ok(mut v) = self.errors.lock() {
            v.push(context.to_string());
        }
    }
}

/// Forwards every notification into a channel the test can drain.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<LicenceNotification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LicenceNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl LicenceNotifier for ChannelNotifier {
    async fn notify(&self, notification: LicenceNotification) -> Result<(), LicenceError> {
        self.tx
            .send(notification)
            .map_err(|e| LicenceError::Other(e.to_string()))
    }
}
