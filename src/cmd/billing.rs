use std::{path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Subcommand;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    catalog::features::ContribFeature,
    licence::LicenceHandler,
    types::{
        product::Package,
        purchase::{PurchaseInitiationResult, PurchaseRecord},
    },
};

#[derive(Subcommand)]
pub enum BillingCommands {
    /// Record the first usage of a feature, starting its trial
    Usage {
        feature: String,
    },

    /// Reconcile against a purchase inventory read from a JSON file
    Reconcile {
        /// Either a JSON array of purchases or `{"purchases": [...]}`
        #[arg(short, long)]
        file: PathBuf,

        /// Treat the batch as the result of a purchase the user just made
        #[arg(long)]
        fresh: bool,
    },

    /// Launch the purchase flow for a package
    Purchase {
        /// contrib, extended, upgrade, professional_monthly, professional_yearly or addon_<feature>
        package: String,

        /// Replace the currently held subscription
        #[arg(long)]
        replace: bool,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Inventory {
    Bare(Vec<PurchaseRecord>),
    Wrapped { purchases: Vec<PurchaseRecord> },
}

impl Inventory {
    fn into_purchases(self) -> Vec<PurchaseRecord> {
        match self {
            Inventory::Bare(purchases) | Inventory::Wrapped { purchases } => purchases,
        }
    }
}

pub fn parse_inventory(raw: &str) -> Result<Vec<PurchaseRecord>> {
    let inventory: Inventory = serde_json::from_str(raw).context("invalid purchase inventory")?;
    Ok(inventory.into_purchases())
}

impl BillingCommands {
    pub async fn execute(&self, handler: &LicenceHandler) -> Result<()> {
        match self {
            BillingCommands::Usage { feature } => {
                let feature = ContribFeature::from_str(feature)?;
                let now = Utc::now();
                let started = handler.record_first_usage(feature, now).await?;
                let status = handler.trial_status(feature, now).await;
                if started {
                    info!(feature = %feature, status = ?status, "Trial started");
                } else {
                    info!(feature = %feature, status = ?status, "Usage already recorded");
                }
                Ok(())
            }

            BillingCommands::Reconcile { file, fresh } => {
                let raw = tokio::fs::read_to_string(file)
                    .await
                    .with_context(|| format!("reading {}", file.display()))?;
                let purchases = parse_inventory(&raw)?;

                let outcome = handler.reconcile(&purchases, *fresh).await;
                info!(
                    licence = ?outcome.state.licence,
                    changed = outcome.licence_changed,
                    new_add_ons = ?outcome.new_add_ons,
                    violations = outcome.violations.len(),
                    pending = outcome.pending.len(),
                    acknowledged = outcome.to_acknowledge.len(),
                    "Reconciled {} purchases",
                    purchases.len()
                );
                if !outcome.persisted {
                    warn!("Entitlement state was not persisted");
                }
                Ok(())
            }

            BillingCommands::Purchase { package, replace } => {
                let package = Package::from_str(package)?;
                match handler.initiate_purchase(package, *replace).await? {
                    PurchaseInitiationResult::Success => {
                        info!(package = %package, "Purchase flow completed")
                    }
                    PurchaseInitiationResult::UserCancelled => {
                        info!(package = %package, "Purchase cancelled")
                    }
                    PurchaseInitiationResult::Failed { code } => {
                        warn!(package = %package, code = code, "Purchase failed")
                    }
                }
                Ok(())
            }
        }
    }
}
