use anyhow::Result;
use clap::Parser;
use contrib_licence::{
    cmd::{Cli, Commands},
    licence::bootstrap,
    utils::config::LicenceConfig,
};
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut cfg = LicenceConfig::load()?;
    if let Some(installation_id) = cli.installation_id {
        cfg.installation_id = installation_id;
    }
    debug!(installation = %cfg.installation_id, redis = %cfg.redis_url, "Connecting");

    let services = bootstrap::connect(&cfg).await?;

    match cli.command {
        Commands::Query(cmd) => cmd.execute(&services.handler).await?,
        Commands::Billing(cmd) => cmd.execute(&services.handler).await?,
    }

    Ok(())
}
