use std::{future::IntoFuture, sync::Arc, time::Duration};

use anyhow::Result;
use contrib_licence::{
    backend::{AppState, router::build_router},
    events::{poller::BillingPoller, types::BillingEvent, worker::LicenceWorker},
    licence::bootstrap,
    pubsub::publisher::RedisNotifier,
    utils::{config::LicenceConfig, constants::BILLING_CHANNEL_CAPACITY, logs_fmt::UptimeSeconds},
};
use tokio::{signal, sync::mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "contrib_licence=info,tower_http=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json().with_timer(UptimeSeconds))
        .init();

    let cfg = LicenceConfig::load()?;
    info!(
        port = cfg.port,
        billing = %cfg.billing_api_url,
        installation = %cfg.installation_id,
        poll_interval_secs = cfg.poll_interval_secs,
        signed_webhooks = cfg.webhook_secret.is_some(),
        "Licence server starting"
    );

    let services = bootstrap::connect(&cfg).await?;
    let notifier = Arc::new(RedisNotifier::new(services.redis_client.clone()).await?);

    let (tx, rx) = mpsc::channel::<BillingEvent>(BILLING_CHANNEL_CAPACITY);

    let worker = LicenceWorker::new(
        services.handler.clone(),
        notifier,
        cfg.installation_id.clone(),
        rx,
    );
    let poller = BillingPoller::new(
        services.gateway.clone(),
        tx.clone(),
        Duration::from_secs(cfg.poll_interval_secs),
    );

    let state = Arc::new(AppState {
        handler: services.handler.clone(),
        events: tx,
        webhook_secret: cfg.webhook_secret.clone(),
    });
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_millis(cfg.request_timeout_ms)));

    let addr = format!("0.0.0.0:{}", cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let worker_handle = tokio::spawn(async move {
        if let Err(e) = worker.run().await {
            tracing::error!(error = %e, "Licence worker failed");
        }
    });
    let poller_handle = tokio::spawn(async move {
        if let Err(e) = poller.run().await {
            tracing::error!(error = %e, "Billing poller failed");
        }
    });

    info!("Listening on {}", addr);

    tokio::select! {
        result = axum::serve(listener, app).into_future() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
            }
        }
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = worker_handle => {
            match result {
                Ok(_) => info!("Worker task completed"),
                Err(e) => tracing::error!("Worker task panicked: {}", e),
            }
        }
        result = poller_handle => {
            match result {
                Ok(_) => info!("Poller task completed"),
                Err(e) => tracing::error!("Poller task panicked: {}", e),
            }
        }
    }

    info!("Shutting down gracefully...");
    Ok(())
}
