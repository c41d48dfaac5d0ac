use std::sync::Arc;

use apollo_client::notification_listener;
use apollo_client::ApolloClient;
use apollo_client::ApolloConfig;
use apollo_client::ChangeKind;
use apollo_client::Error;
use apollo_client::Result;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_observability();

    let config = ApolloConfig::new()?.validate()?;
    let interval_ms = config.client.long_poller_interval_ms;
    if interval_ms < 1000 {
        warn!(interval_ms, "poll interval below 1000 ms puts extra load on the server");
    }

    let client = ApolloClient::from_config(config)?;

    let listener = notification_listener(|namespace, _old, _new, changes| {
        for change in &changes {
            match change.kind {
                ChangeKind::Added => info!(namespace, key = %change.key, value = %change.value, "added"),
                ChangeKind::Updated => info!(namespace, key = %change.key, value = %change.value, "updated"),
                ChangeKind::Deleted => info!(namespace, key = %change.key, value = %change.value, "deleted"),
            }
        }
    });
    client.set_notifications_listener(Arc::downgrade(&listener));

    for namespace in client.namespaces() {
        println!("[{namespace}]");
        for (key, value) in client.get_configures(namespace) {
            println!("  {key} = {value}");
        }
    }

    client.start_long_polling();
    info!("Watching for changes. Waiting for CTRL+C signal...");

    wait_for_shutdown().await?;

    client.stop();
    println!("Exiting program.");
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt()).map_err(|e| Error::Fatal(format!("SIGINT handler: {e}")))?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| Error::Fatal(format!("SIGTERM handler: {e}")))?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }
    Ok(())
}

fn init_observability() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
