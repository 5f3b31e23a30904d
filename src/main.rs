//! chanlinkd - channel link and force-subscription store daemon.
//!
//! Opens the store, serves metrics, logs a startup summary and waits for
//! shutdown. Bot transports embed the library and drive [`chanlink::services::Gate`].

use chanlink::config::{Config, validate};
use chanlink::db::Database;
use chanlink::services::Gate;
use chanlink::{http, metrics};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "{} configuration error(s) in {}",
            errors.len(),
            config_path
        ));
    }

    info!(
        bot = %config.bot.username,
        owner = config.bot.owner_id,
        "Starting chanlinkd"
    );

    // Initialize database
    let db = Database::connect(config.database_path()).await?;

    // Prometheus metrics are optional.
    // Convention: metrics_port = 0 disables the HTTP endpoint (used by tests).
    let metrics_port = config.bot.metrics_port;
    if metrics_port == 0 {
        info!("Metrics disabled");
    } else {
        metrics::init();
        info!("Metrics initialized");

        let db = db.clone();
        tokio::spawn(async move {
            http::run_http_server(metrics_port, db).await;
        });
        info!(port = metrics_port, "Prometheus HTTP server started");
    }

    let gate = Gate::new(db.clone(), &config);

    let link_channels = gate.link_channels().await;
    let summary = gate.mode_summary().await;
    let users = db.users().total_users().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to count users");
        0
    });
    info!(
        link_channels = link_channels.len(),
        fsub_channels = summary.total_channels,
        fsub_on = summary.on_count,
        users = users,
        "Loaded registries"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    db.close().await;
    Ok(())
}
