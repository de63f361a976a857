use crate::utils::constants::CHANNEL_PREFIX;

pub mod config;
pub mod constants;
pub mod error;
pub mod logs_fmt;

/// Pub/sub channel carrying licence notifications for one installation.
pub fn get_channel(installation_id: &str) -> String {
    format!("{}:{}", CHANNEL_PREFIX, installation_id)
}
