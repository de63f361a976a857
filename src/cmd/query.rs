use std::str::FromStr;

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use tracing::info;

use crate::{
    catalog::{
        features::ContribFeature,
        strings::{full_info_string, label, usages_left_string},
    },
    licence::LicenceHandler,
    types::product::Package,
};

#[derive(Subcommand)]
pub enum QueryCommands {
    /// Show the current licence and add-ons
    Status,

    /// List every feature with its lock state
    Features,

    /// Show the trial state of one feature
    Trial {
        /// Feature name, e.g. `budget` or `csv-import`
        feature: String,
    },

    /// Show the cached display price of every package
    Prices,
}

impl QueryCommands {
    pub async fn execute(&self, handler: &LicenceHandler) -> Result<()> {
        match self {
            QueryCommands::Status => {
                let state = handler.snapshot().await;
                info!(
                    licence = ?state.licence,
                    order_id = state.order_id.as_deref().unwrap_or("-"),
                    subscription = state.subscription.as_ref().map(|s| s.sku.as_str()).unwrap_or("-"),
                    "{}",
                    handler.status_text().await
                );
                Ok(())
            }

            QueryCommands::Features => {
                let now = Utc::now();
                for feature in ContribFeature::ALL {
                    let unlocked = handler.is_unlocked(feature).await;
                    let trial = handler.trial_status(feature, now).await;
                    info!(
                        feature = %feature,
                        required = %feature.licence_status(),
                        unlocked = unlocked,
                        trial = ?trial,
                        "{}",
                        label(feature)
                    );
                }
                Ok(())
            }

            QueryCommands::Trial { feature } => {
                let feature = ContribFeature::from_str(feature)?;
                let now = Utc::now();
                let status = handler.trial_status(feature, now).await;
                let held = handler.licence_status().await.unwrap_or_default();

                info!("{}", full_info_string(feature, held));
                info!(status = ?status, unlocked = handler.is_unlocked(feature).await);
                if let Some(end) = handler.end_of_trial(feature, now).await {
                    if let Some(left) = usages_left_string(feature, end, now) {
                        info!("{}", left);
                    }
                }
                Ok(())
            }

            QueryCommands::Prices => {
                for package in Package::all() {
                    let price = handler.display_price(package).await?;
                    info!(
                        package = %package,
                        sku = %package.sku(),
                        price = price.as_deref().unwrap_or("unknown"),
                    );
                }
                Ok(())
            }
        }
    }
}
