use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{
    billing::gateway::BillingGateway,
    events::types::BillingEvent,
    types::product::Package,
};

/// Periodically pulls the purchase inventory into the billing channel.
pub struct BillingPoller {
    gateway: Arc<dyn BillingGateway>,
    tx: mpsc::Sender<BillingEvent>,
    interval: Duration,
}

impl BillingPoller {
    pub fn new(
        gateway: Arc<dyn BillingGateway>,
        tx: mpsc::Sender<BillingEvent>,
        interval: Duration,
    ) -> Self {
        Self {
            gateway,
            tx,
            interval,
        }
    }

    pub async fn run(self) -> Result<()> {
        info!(interval_secs = self.interval.as_secs(), "Billing poller started");
        let mut ticker = tokio::time::interval(self.interval);
        let mut first = true;

        loop {
            ticker.tick().await;
            if !self.poll_once(first).await {
                break;
            }
            first = false;
        }

        info!("Billing poller stopped, receiver dropped");
        Ok(())
    }

    /// One pass. Returns `false` once nobody is listening anymore.
    pub async fn poll_once(&self, with_products: bool) -> bool {
        if with_products {
            let skus = Package::all().iter().map(Package::sku).collect::<Vec<_>>();
            match self.gateway.query_product_details(&skus).await {
                Ok(details) => {
                    if self.tx.send(BillingEvent::ProductDetails(details)).await.is_err() {
                        return false;
                    }
                }
                Err(e) => warn!(error = %e, "Product details query failed"),
            }
        }

        match self.gateway.query_purchases().await {
            Ok(purchases) => self
                .tx
                .send(BillingEvent::PurchasesUpdated {
                    purchases,
                    new_purchase: false,
                })
                .await
                .is_ok(),
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "Purchase query failed");
                !self.tx.is_closed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        testing::FakeGateway,
        types::purchase::{PurchaseRecord, PurchaseState},
    };

    #[tokio::test]
    async fn first_pass_sends_products_then_purchases() {
        let gateway = Arc::new(FakeGateway::default());
        gateway
            .set_purchases(vec![PurchaseRecord::new("sku_premium", PurchaseState::Purchased, "t")])
            .await;
        let (tx, mut rx) = mpsc::channel(8);
        let poller = BillingPoller::new(gateway.clone(), tx, Duration::from_secs(60));

        assert!(poller.poll_once(true).await);

        assert!(matches!(rx.recv().await, Some(BillingEvent::ProductDetails(_))));
        match rx.recv().await {
            Some(BillingEvent::PurchasesUpdated {
                purchases,
                new_purchase,
            }) => {
                assert_eq!(purchases.len(), 1);
                assert!(!new_purchase);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(gateway.product_queries(), 1);
    }

    #[tokio::test]
    async fn later_passes_skip_products() {
        let gateway = Arc::new(FakeGateway::default());
        let (tx, mut rx) = mpsc::channel(8);
        let poller = BillingPoller::new(gateway.clone(), tx, Duration::from_secs(60));

        assert!(poller.poll_once(false).await);

        assert_eq!(rx.recv().await.map(|e| e.kind()), Some("purchases_updated"));
        assert_eq!(gateway.product_queries(), 0);
        assert_eq!(gateway.purchase_queries(), 1);
    }

    #[tokio::test]
    async fn query_failure_keeps_polling() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.fail_queries(true);
        let (tx, rx) = mpsc::channel(8);
        let poller = BillingPoller::new(gateway, tx, Duration::from_secs(60));

        assert!(poller.poll_once(false).await);
        drop(rx);
        assert!(!poller.poll_once(false).await);
    }

    #[tokio::test]
    async fn stops_when_receiver_dropped() {
        let gateway = Arc::new(FakeGateway::default());
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let poller = BillingPoller::new(gateway, tx, Duration::from_millis(5));

        poller.run().await.unwrap();
    }
}
