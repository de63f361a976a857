use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    store::{EntitlementStore, PriceStore, codec},
    types::state::EntitlementState,
    utils::error::LicenceError,
};

/// Process-local preference store. Cloning shares the underlying maps.
#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    licence: RwLock<HashMap<String, String>>,
    prices: RwLock<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_state(state: &EntitlementState) -> Self {
        let store = Self::new();
        *store.inner.licence.write().await = codec::encode(state).into_iter().collect();
        store
    }

    /// Makes every following write fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn raw_fields(&self) -> HashMap<String, String> {
        self.inner.licence.read().await.clone()
    }
}

#[async_trait]
impl EntitlementStore for MemoryStore {
    async fn read(&self) -> Result<EntitlementState, LicenceError> {
        let fields = self.inner.licence.read().await;
        Ok(codec::decode(&fields))
    }

    async fn write_atomic(&self, state: &EntitlementState) -> Result<(), LicenceError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(LicenceError::PersistenceError(
                "memory store rejected write".to_string(),
            ));
        }
        let fields = codec::encode(state).into_iter().collect();
        *self.inner.licence.write().await = fields;
        Ok(())
    }
}

#[async_trait]
impl PriceStore for MemoryStore {
    async fn store_prices(&self, prices: &[(String, String)]) -> Result<(), LicenceError> {
        let mut stored = self.inner.prices.write().await;
        for (sku, price) in prices {
            stored.insert(codec::price_key(sku), price.clone());
        }
        Ok(())
    }

    async fn price(&self, sku: &str) -> Result<Option<String>, LicenceError> {
        Ok(self.inner.prices.read().await.get(&codec::price_key(sku)).cloned())
    }
}
