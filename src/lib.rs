pub mod backend;
pub mod billing;
pub mod catalog;
pub mod cmd;
pub mod events;
pub mod licence;
pub mod pubsub;
pub mod reconcile;
pub mod store;
pub mod types;
pub mod utils;

#[cfg(test)]
pub mod testing;
