pub mod gateway;

pub use gateway::{BillingError, BillingGateway, HttpBillingGateway};
