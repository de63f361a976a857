use async_trait::async_trait;

use crate::{pubsub::types::LicenceNotification, utils::error::LicenceError};

/// Delivers licence deltas and purchase-flow outcomes to the UI layer.
#[async_trait]
pub trait LicenceNotifier: Send + Sync {
    async fn notify(&self, notification: LicenceNotification) -> Result<(), LicenceError>;
}
