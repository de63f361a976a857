pub mod bootstrap;
pub mod handler;

pub use handler::LicenceHandler;
