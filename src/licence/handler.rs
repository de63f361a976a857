use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::{
    billing::gateway::BillingGateway,
    catalog::{
        features::{ContribFeature, TrialMode},
        strings::describe_status,
        tier::LicenceStatus,
        trial::{self, TrialStatus},
    },
    events::metrics::{ObservabilitySink, with_metrics},
    reconcile::{GracePolicy, ReconcileOutcome, reconcile},
    store::{EntitlementStore, PriceStore},
    types::{
        product::Package,
        purchase::{ProductDetails, PurchaseInitiationResult, PurchaseRecord},
        state::EntitlementState,
    },
    utils::{error::LicenceError, logs_fmt::abbrev},
};

/// Owns the entitlement state of one installation.
///
/// Every read-modify-write goes through `writer`, so two reconciliation passes never
/// interleave. Readers only ever see a whole snapshot, swapped in after the write.
pub struct LicenceHandler {
    store: Arc<dyn EntitlementStore>,
    prices: Arc<dyn PriceStore>,
    gateway: Arc<dyn BillingGateway>,
    sink: Arc<dyn ObservabilitySink>,
    policy: GracePolicy,
    state: RwLock<EntitlementState>,
    writer: Mutex<()>,
}

impl LicenceHandler {
    pub async fn load(
        store: Arc<dyn EntitlementStore>,
        prices: Arc<dyn PriceStore>,
        gateway: Arc<dyn BillingGateway>,
        sink: Arc<dyn ObservabilitySink>,
        policy: GracePolicy,
    ) -> Result<Self, LicenceError> {
        let state = store.read().await?;
        info!(
            licence = ?state.licence,
            add_ons = state.add_on_features.len(),
            "Entitlement state loaded"
        );

        Ok(Self {
            store,
            prices,
            gateway,
            sink,
            policy,
            state: RwLock::new(state),
            writer: Mutex::new(()),
        })
    }

    pub async fn snapshot(&self) -> EntitlementState {
        self.state.read().await.clone()
    }

    pub async fn licence_status(&self) -> Option<LicenceStatus> {
        self.state.read().await.licence
    }

    pub async fn status_text(&self) -> String {
        describe_status(&*self.state.read().await)
    }

    pub async fn is_unlocked(&self, feature: ContribFeature) -> bool {
        self.state.read().await.has_access_to(feature)
    }

    pub async fn trial_status(&self, feature: ContribFeature, now: DateTime<Utc>) -> TrialStatus {
        trial::trial_status(feature, &*self.state.read().await, now)
    }

    pub async fn end_of_trial(
        &self,
        feature: ContribFeature,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        trial::end_of_trial(feature, &*self.state.read().await, now)
    }

    pub async fn reconcile(&self, purchases: &[PurchaseRecord], is_fresh: bool) -> ReconcileOutcome {
        self.reconcile_at(purchases, is_fresh, Utc::now()).await
    }

    pub async fn reconcile_at(
        &self,
        purchases: &[PurchaseRecord],
        is_fresh: bool,
        now: DateTime<Utc>,
    ) -> ReconcileOutcome {
        let mut outcome = {
            let _guard = self.writer.lock().await;

            for purchase in purchases {
                debug!(
                    products = %purchase.products.join(", "),
                    token = %abbrev(&purchase.purchase_token),
                    acknowledged = purchase.acknowledged,
                    "Inventory entry"
                );
            }

            let previous = self.state.read().await.clone();
            let mut outcome = reconcile(&previous, purchases, is_fresh, now, self.policy);

            for violation in &outcome.violations {
                self.sink.report_violation(violation);
            }
            if !outcome.pending.is_empty() {
                info!(
                    pending = outcome.pending.len(),
                    "Pending purchases left out of reconciliation"
                );
            }

            outcome.persisted = self.persist(&outcome.state).await;
            *self.state.write().await = outcome.state.clone();
            outcome
        };

        with_metrics(|m| m.reconciliations.inc());
        info!(
            licence = ?outcome.state.licence,
            licence_changed = outcome.licence_changed,
            new_add_ons = outcome.new_add_ons.len(),
            fresh = is_fresh,
            persisted = outcome.persisted,
            "Inventory reconciled"
        );

        // unacknowledged purchases come back on the next pass, so failures here only get reported
        let to_acknowledge = std::mem::take(&mut outcome.to_acknowledge);
        for token in &to_acknowledge {
            if let Err(e) = self.gateway.acknowledge(token).await {
                self.sink.report_error("acknowledge", &e);
            }
        }
        outcome.to_acknowledge = to_acknowledge;

        outcome
    }

    /// Starts the trial of `feature` on first use. Returns whether this call started it.
    pub async fn record_first_usage(
        &self,
        feature: ContribFeature,
        now: DateTime<Utc>,
    ) -> Result<bool, LicenceError> {
        if feature.trial_mode() == TrialMode::None {
            return Ok(false);
        }

        let _guard = self.writer.lock().await;
        let mut next = self.state.read().await.clone();
        if !next.start_trial(feature, now) {
            return Ok(false);
        }

        if self.persist(&next).await {
            info!(feature = %feature, "Trial started");
        }
        *self.state.write().await = next;
        Ok(true)
    }

    /// Launches the purchase flow for `package`.
    ///
    /// Replacing requires a held subscription other than the one requested.
    pub async fn initiate_purchase(
        &self,
        package: Package,
        replace_existing: bool,
    ) -> Result<PurchaseInitiationResult, LicenceError> {
        let sku = package.sku();

        let old_purchase_token = if replace_existing {
            let current = self.state.read().await.subscription.clone().ok_or_else(|| {
                LicenceError::PreconditionError(
                    "Could not determine current subscription".to_string(),
                )
            })?;
            if current.sku == sku {
                return Err(LicenceError::PreconditionError(format!(
                    "{} is already the current subscription",
                    sku
                )));
            }
            Some(current.purchase_token)
        } else {
            None
        };

        let result = self
            .gateway
            .launch_purchase_flow(&sku, package.product_type(), old_purchase_token.as_deref())
            .await?;

        let outcome = match result {
            PurchaseInitiationResult::Success => {
                info!(sku = %sku, replace = replace_existing, "Purchase flow completed");
                "success"
            }
            PurchaseInitiationResult::UserCancelled => {
                info!(sku = %sku, "User cancelled the purchase flow");
                "user_cancelled"
            }
            PurchaseInitiationResult::Failed { code } => {
                warn!(sku = %sku, code = code, "Purchase flow failed");
                "failed"
            }
        };
        with_metrics(|m| m.purchase_flows.with_label_values(&[outcome]).inc());

        Ok(result)
    }

    pub async fn store_product_details(&self, details: &[ProductDetails]) -> Result<(), LicenceError> {
        let prices = details
            .iter()
            .map(|d| (d.product_id.clone(), d.formatted_price.clone()))
            .collect::<Vec<_>>();
        self.prices.store_prices(&prices).await?;
        debug!(count = prices.len(), "Product prices stored");
        Ok(())
    }

    pub async fn display_price(&self, package: Package) -> Result<Option<String>, LicenceError> {
        self.prices.price(&package.sku()).await
    }

    async fn persist(&self, state: &EntitlementState) -> bool {
        match self.store.write_atomic(state).await {
            Ok(()) => true,
            Err(e) => {
                with_metrics(|m| m.persistence_failures.inc());
                self.sink.report_error("persist", &e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        store::memory::MemoryStore,
        testing::{FakeGateway, RecordingSink},
        types::{
            purchase::{ProductType, PurchaseState},
            state::SubscriptionRef,
        },
    };

    struct Fixture {
        handler: LicenceHandler,
        store: MemoryStore,
        gateway: Arc<FakeGateway>,
        sink: Arc<RecordingSink>,
    }

    async fn fixture(initial: EntitlementState) -> Fixture {
        let store = MemoryStore::with_state(&initial).await;
        let gateway = Arc::new(FakeGateway::default());
        let sink = Arc::new(RecordingSink::default());
        let handler = LicenceHandler::load(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            gateway.clone(),
            sink.clone(),
            GracePolicy::Immediate,
        )
        .await
        .unwrap();
        Fixture {
            handler,
            store,
            gateway,
            sink,
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    fn professional() -> EntitlementState {
        EntitlementState {
            licence: Some(LicenceStatus::Professional),
            subscription: Some(SubscriptionRef {
                sku: "sku_professional_monthly".into(),
                purchase_token: "monthly-token".into(),
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn reconcile_persists_and_swaps_snapshot() {
        let f = fixture(EntitlementState::default()).await;
        let purchase = PurchaseRecord::new("extended_sub", PurchaseState::Purchased, "tok");

        let outcome = f.handler.reconcile_at(&[purchase], false, now()).await;

        assert!(outcome.persisted);
        assert!(outcome.should_notify);
        assert_eq!(f.handler.licence_status().await, Some(LicenceStatus::Extended));
        assert_eq!(f.store.read().await.unwrap().licence, Some(LicenceStatus::Extended));
        assert!(f.handler.is_unlocked(ContribFeature::CsvImport).await);
        assert_eq!(f.gateway.acknowledged().await, vec!["tok".to_string()]);
    }

    #[tokio::test]
    async fn persistence_failure_keeps_in_memory_state() {
        let f = fixture(EntitlementState::default()).await;
        f.store.set_fail_writes(true);

        let purchase = PurchaseRecord::new("addon_ocr", PurchaseState::Purchased, "tok");
        let outcome = f.handler.reconcile_at(&[purchase], true, now()).await;

        assert!(!outcome.persisted);
        assert!(f.handler.is_unlocked(ContribFeature::Ocr).await);
        assert_eq!(f.store.read().await.unwrap(), EntitlementState::default());
        assert_eq!(f.sink.errors(), vec!["persist".to_string()]);
    }

    #[tokio::test]
    async fn violations_go_to_the_sink() {
        let f = fixture(EntitlementState::default()).await;
        let purchase = PurchaseRecord::new("sku_extended", PurchaseState::Other(5), "odd");

        f.handler.reconcile_at(&[purchase], false, now()).await;

        assert_eq!(f.sink.violations(), vec!["odd".to_string()]);
        assert_eq!(f.handler.licence_status().await, None);
    }

    #[tokio::test]
    async fn acknowledge_failure_is_reported_not_fatal() {
        let f = fixture(EntitlementState::default()).await;
        f.gateway.fail_acknowledge(true);
        let purchase = PurchaseRecord::new("sku_premium", PurchaseState::Purchased, "tok");

        let outcome = f.handler.reconcile_at(&[purchase], false, now()).await;

        assert_eq!(outcome.state.licence, Some(LicenceStatus::Contrib));
        assert_eq!(f.sink.errors(), vec!["acknowledge".to_string()]);
    }

    #[tokio::test]
    async fn replace_without_subscription_is_a_precondition_error() {
        let f = fixture(EntitlementState::default()).await;

        let result = f
            .handler
            .initiate_purchase(Package::ProfessionalYearly, true)
            .await;

        assert!(matches!(result, Err(LicenceError::PreconditionError(_))));
        assert!(f.gateway.launched().await.is_empty());
    }

    #[tokio::test]
    async fn replace_with_same_product_is_a_precondition_error() {
        let f = fixture(professional()).await;

        let result = f
            .handler
            .initiate_purchase(Package::ProfessionalMonthly, true)
            .await;

        assert!(matches!(result, Err(LicenceError::PreconditionError(_))));
    }

    #[tokio::test]
    async fn replace_passes_old_token_to_gateway() {
        let f = fixture(professional()).await;

        let result = f
            .handler
            .initiate_purchase(Package::ProfessionalYearly, true)
            .await
            .unwrap();

        assert_eq!(result, PurchaseInitiationResult::Success);
        assert_eq!(
            f.gateway.launched().await,
            vec![(
                "sku_professional_yearly".to_string(),
                ProductType::Subs,
                Some("monthly-token".to_string())
            )]
        );
    }

    #[tokio::test]
    async fn gateway_failure_propagates() {
        let f = fixture(EntitlementState::default()).await;
        f.gateway.fail_launch(true);

        let result = f.handler.initiate_purchase(Package::Extended, false).await;
        assert!(matches!(result, Err(LicenceError::BillingError(_))));
    }

    #[tokio::test]
    async fn user_cancel_is_an_outcome() {
        let f = fixture(EntitlementState::default()).await;
        f.gateway
            .set_launch_result(PurchaseInitiationResult::UserCancelled)
            .await;

        let result = f.handler.initiate_purchase(Package::Contrib, false).await.unwrap();
        assert_eq!(result, PurchaseInitiationResult::UserCancelled);
        assert_eq!(f.handler.licence_status().await, None);
    }

    #[tokio::test]
    async fn first_usage_is_recorded_once() {
        let f = fixture(EntitlementState::default()).await;

        assert!(f.handler.record_first_usage(ContribFeature::Budget, now()).await.unwrap());
        assert!(
            !f.handler
                .record_first_usage(ContribFeature::Budget, now() + Duration::days(5))
                .await
                .unwrap()
        );
        assert!(!f.handler.record_first_usage(ContribFeature::AdFree, now()).await.unwrap());

        let stored = f.store.read().await.unwrap();
        assert_eq!(
            stored.trial_starts.get(&ContribFeature::Budget),
            Some(&now().timestamp_millis())
        );

        let status = f
            .handler
            .trial_status(ContribFeature::Budget, now() + Duration::days(61))
            .await;
        assert_eq!(status, TrialStatus::Expired);
    }

    #[tokio::test]
    async fn prices_are_stored_per_package() {
        let f = fixture(EntitlementState::default()).await;
        f.handler
            .store_product_details(&[ProductDetails {
                product_id: "sku_professional_yearly".into(),
                product_type: ProductType::Subs,
                formatted_price: "€19.99".into(),
            }])
            .await
            .unwrap();

        assert_eq!(
            f.handler
                .display_price(Package::ProfessionalYearly)
                .await
                .unwrap()
                .as_deref(),
            Some("€19.99")
        );
        assert_eq!(f.handler.display_price(Package::Contrib).await.unwrap(), None);
    }

    #[tokio::test]
    async fn concurrent_reconciliations_do_not_lose_add_ons() {
        let f = Arc::new(fixture(EntitlementState::default()).await);

        let mut tasks = Vec::new();
        for sku in ["addon_ocr", "addon_budget", "addon_history", "addon_web_ui"] {
            let f = f.clone();
            tasks.push(tokio::spawn(async move {
                let purchase = PurchaseRecord::new(sku, PurchaseState::Purchased, sku);
                f.handler.reconcile_at(&[purchase], true, now()).await
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let state = f.store.read().await.unwrap();
        assert_eq!(state.add_on_features.len(), 4);
        assert_eq!(f.handler.snapshot().await, state);
    }
}
