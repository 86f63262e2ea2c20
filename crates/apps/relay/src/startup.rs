//! Gmail-side startup: authenticate and resolve the label table.

use anyhow::{Context as _, Result};
use log::{error, info};
use std::sync::Arc;

use mail::{DeliverySink, GmailAuth, GmailClient, Relay, RelayConfig, resolve_labels};

/// Build the relay, or `None` when Gmail cannot be reached or a configured
/// label does not exist. The chat client still connects either way.
pub async fn prepare_relay(config: &RelayConfig, sink: Arc<dyn DeliverySink>) -> Option<Arc<Relay>> {
    match build_relay(config, sink).await {
        Ok(relay) => Some(Arc::new(relay)),
        Err(e) => {
            error!("Startup: Scheduling disabled: {:#}", e);
            None
        }
    }
}

async fn build_relay(config: &RelayConfig, sink: Arc<dyn DeliverySink>) -> Result<Relay> {
    let credentials = config.gmail_credentials()?;
    let auth = GmailAuth::new(credentials, config.token_path()?);
    info!("Startup: Gmail token at {}", auth.token_path().display());

    let gmail = GmailClient::new(auth);

    // May open a browser for first-time consent
    let client = gmail.clone();
    tokio::task::spawn_blocking(move || client.authenticate())
        .await
        .context("Gmail authentication task panicked")??;
    info!("Startup: Gmail authenticated");

    let labels = resolve_labels(&gmail, config.label_rules()).await?;
    info!("Startup: Resolved {} labels", labels.len());

    Ok(Relay::new(
        Arc::new(gmail),
        sink,
        labels,
        config.attachment_pattern.clone(),
    ))
}
