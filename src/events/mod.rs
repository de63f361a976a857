pub mod metrics;
pub mod poller;
pub mod types;
pub mod worker;
