pub mod billing;
pub mod query;

use clap::{Parser, Subcommand};

use crate::cmd::{billing::BillingCommands, query::QueryCommands};

#[derive(Parser)]
#[command(name = "licence-cli")]
#[command(about = "Inspect and drive the contrib licence of one installation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Overrides INSTALLATION_ID from the environment
    #[arg(long, global = true)]
    pub installation_id: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(flatten)]
    Query(QueryCommands),

    #[command(flatten)]
    Billing(BillingCommands),
}
