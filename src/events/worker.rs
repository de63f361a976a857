use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc::Receiver;
use tracing::{error, info};

use crate::{
    events::{metrics::with_metrics, types::BillingEvent},
    licence::LicenceHandler,
    pubsub::{notifier::LicenceNotifier, types::LicenceNotification},
    utils::error::LicenceError,
};

pub struct LicenceWorker {
    handler: Arc<LicenceHandler>,
    notifier: Arc<dyn LicenceNotifier>,
    installation_id: String,
    rx: Receiver<BillingEvent>,
}

impl LicenceWorker {
    pub fn new(
        handler: Arc<LicenceHandler>,
        notifier: Arc<dyn LicenceNotifier>,
        installation_id: String,
        rx: Receiver<BillingEvent>,
    ) -> Self {
        Self {
            handler,
            notifier,
            installation_id,
            rx,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        info!("Licence worker started");
        while let Some(event) = self.rx.recv().await {
            if let Err(e) = self.handle_event(event).await {
                error!(error = %e, "Failed to handle billing event");
            }
        }
        info!("Licence worker stopped");
        Ok(())
    }

    pub async fn handle_event(&self, event: BillingEvent) -> Result<(), LicenceError> {
        match event {
            BillingEvent::PurchasesUpdated {
                purchases,
                new_purchase,
            } => {
                let outcome = self.handler.reconcile(&purchases, new_purchase).await;
                if outcome.should_notify {
                    self.notify(LicenceNotification::status_changed(
                        &self.installation_id,
                        &outcome,
                    ))
                    .await?;
                }
                Ok(())
            }

            BillingEvent::PurchaseCanceled => {
                info!("Purchase canceled by user");
                self.notify(LicenceNotification::purchase_cancelled(&self.installation_id))
                    .await
            }

            BillingEvent::PurchaseFailed { code } => {
                info!(code = code, "Purchase failed");
                self.notify(LicenceNotification::purchase_failed(
                    &self.installation_id,
                    code,
                ))
                .await
            }

            BillingEvent::ProductDetails(details) => {
                self.handler.store_product_details(&details).await
            }
        }
    }

    async fn notify(&self, notification: LicenceNotification) -> Result<(), LicenceError> {
        self.notifier.notify(notification).await?;
        with_metrics(|m| m.notifications.inc());
        Ok(())
    }
}
