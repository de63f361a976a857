pub mod handlers;
pub mod middleware;
pub mod router;

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{events::types::BillingEvent, licence::LicenceHandler};

pub struct AppState {
    pub handler: Arc<LicenceHandler>,
    pub events: mpsc::Sender<BillingEvent>,
    pub webhook_secret: Option<String>,
}
