pub mod codec;
pub mod memory;
pub mod redis_store;

use async_trait::async_trait;

use crate::{types::state::EntitlementState, utils::error::LicenceError};

/// Durable home of the entitlement state.
///
/// `write_atomic` must replace the whole state in one batch, so that a concurrent
/// `read` sees either the old or the new state.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    async fn read(&self) -> Result<EntitlementState, LicenceError>;

    async fn write_atomic(&self, state: &EntitlementState) -> Result<(), LicenceError>;
}

/// Display prices fetched from the billing channel, keyed by sku.
#[async_trait]
pub trait PriceStore: Send + Sync {
    async fn store_prices(&self, prices: &[(String, String)]) -> Result<(), LicenceError>;

    async fn price(&self, sku: &str) -> Result<Option<String>, LicenceError>;
}
