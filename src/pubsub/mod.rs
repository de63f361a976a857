pub mod notifier;
pub mod publisher;
pub mod types;
