use std::collections::HashMap;

use async_trait::async_trait;
use redis::{Client as RedisClient, aio::MultiplexedConnection};
use tracing::debug;

use crate::{
    store::{EntitlementStore, PriceStore, codec},
    types::state::EntitlementState,
    utils::{error::LicenceError, logs_fmt::abbrev},
};

/// Preference store backed by two Redis hashes per installation.
pub struct RedisStore {
    redis: MultiplexedConnection,
    installation_id: String,
}

impl RedisStore {
    pub async fn new(redis_client: &RedisClient, installation_id: &str) -> Result<Self, LicenceError> {
        let redis = redis_client.get_multiplexed_async_connection().await?;
        Ok(Self {
            redis,
            installation_id: installation_id.to_string(),
        })
    }

    fn licence_key(&self) -> String {
        format!("licence:{}:status", self.installation_id)
    }

    fn prices_key(&self) -> String {
        format!("licence:{}:prices", self.installation_id)
    }
}

#[async_trait]
impl EntitlementStore for RedisStore {
    async fn read(&self) -> Result<EntitlementState, LicenceError> {
        let mut conn = self.redis.clone();
        let fields: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(self.licence_key())
            .query_async(&mut conn)
            .await?;

        Ok(codec::decode(&fields))
    }

    async fn write_atomic(&self, state: &EntitlementState) -> Result<(), LicenceError> {
        let key = self.licence_key();
        let fields = codec::encode(state);

        let mut pipe = redis::pipe();
        pipe.atomic().del(&key).ignore();
        if !fields.is_empty() {
            pipe.hset_multiple(&key, &fields).ignore();
        }

        let mut conn = self.redis.clone();
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| LicenceError::PersistenceError(e.to_string()))?;

        debug!(
            installation = %abbrev(&self.installation_id),
            fields = fields.len(),
            "Entitlement state written"
        );
        Ok(())
    }
}

#[async_trait]
impl PriceStore for RedisStore {
    async fn store_prices(&self, prices: &[(String, String)]) -> Result<(), LicenceError> {
        if prices.is_empty() {
            return Ok(());
        }
        let entries = prices
            .iter()
            .map(|(sku, price)| (codec::price_key(sku), price.clone()))
            .collect::<Vec<_>>();

        let mut conn = self.redis.clone();
        let _: () = redis::pipe()
            .atomic()
            .hset_multiple(self.prices_key(), &entries)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn price(&self, sku: &str) -> Result<Option<String>, LicenceError> {
        let mut conn = self.redis.clone();
        let price: Option<String> = redis::cmd("HGET")
            .arg(self.prices_key())
            .arg(codec::price_key(sku))
            .query_async(&mut conn)
            .await?;
        Ok(price)
    }
}
