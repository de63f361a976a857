use async_trait::async_trait;
use redis::{Client as RedisClient, aio::MultiplexedConnection};
use tracing::info;

use crate::{
    pubsub::{
        notifier::LicenceNotifier,
        types::{LicenceNotification, NotificationAction},
    },
    utils::{error::LicenceError, get_channel, logs_fmt::abbrev},
};

pub struct RedisNotifier {
    pub redis_client: RedisClient,
    redis: MultiplexedConnection,
}

impl RedisNotifier {
    pub async fn new(redis_client: RedisClient) -> Result<Self, LicenceError> {
        let redis = redis_client.get_multiplexed_async_connection().await?;
        Ok(Self {
            redis_client,
            redis,
        })
    }
}

#[async_trait]
impl LicenceNotifier for RedisNotifier {
    async fn notify(&self, notification: LicenceNotification) -> Result<(), LicenceError> {
        let channel = get_channel(&notification.installation);
        let message = serde_json::to_string(&notification)?;

        let mut conn = self.redis.clone();
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(&channel)
            .arg(message)
            .query_async(&mut conn)
            .await?;

        let kind = match &notification.action {
            NotificationAction::StatusChanged(_) => "status_changed",
            NotificationAction::PurchaseCancelled => "purchase_cancelled",
            NotificationAction::PurchaseFailed { .. } => "purchase_failed",
        };
        info!(
            event = "licence.published",
            kind = kind,
            installation = %abbrev(&notification.installation),
            receivers = receivers,
        );
        Ok(())
    }
}
