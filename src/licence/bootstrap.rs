use std::sync::Arc;

use redis::Client as RedisClient;
use tracing::info;

use crate::{
    billing::gateway::HttpBillingGateway,
    events::metrics::MetricsSink,
    licence::LicenceHandler,
    store::redis_store::RedisStore,
    utils::{config::LicenceConfig, error::LicenceError},
};

/// Production wiring shared by the server and the CLI.
pub struct LicenceServices {
    pub handler: Arc<LicenceHandler>,
    pub gateway: Arc<HttpBillingGateway>,
    pub redis_client: RedisClient,
}

pub async fn connect(cfg: &LicenceConfig) -> Result<LicenceServices, LicenceError> {
    let redis_client = RedisClient::open(cfg.redis_url.as_str())?;
    let store = Arc::new(RedisStore::new(&redis_client, &cfg.installation_id).await?);
    let gateway = Arc::new(HttpBillingGateway::new(
        cfg.billing_api_url.clone(),
        cfg.billing_api_key.clone(),
    )?);

    let handler = LicenceHandler::load(
        store.clone(),
        store,
        gateway.clone(),
        Arc::new(MetricsSink),
        cfg.grace_policy(),
    )
    .await?;

    info!(
        installation = %cfg.installation_id,
        grace = ?cfg.grace_policy(),
        "Licence handler ready"
    );

    Ok(LicenceServices {
        handler: Arc::new(handler),
        gateway,
        redis_client,
    })
}
