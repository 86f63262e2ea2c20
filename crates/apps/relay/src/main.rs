//! mailrelay - forwards unread Gmail messages under configured labels to
//! Discord channels, on a timer and on a chat trigger command.

mod discord;
mod startup;

use anyhow::{Context as _, Result};
use log::{error, info};
use serenity::all::{Client, GatewayIntents, Http};
use std::sync::Arc;

use discord::{DiscordSink, RelayHandler};
use mail::RelayConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {:#}", e);
    }

    let relay_config = RelayConfig::load()?;
    relay_config.validate()?;
    let token = relay_config.discord.token.clone();

    let http = Arc::new(Http::new(&token));
    let sink = Arc::new(DiscordSink::new(http));
    let relay = startup::prepare_relay(&relay_config, sink).await;

    let handler = RelayHandler::new(
        relay,
        relay_config.discord.trigger_command.clone(),
        relay_config.poll_interval(),
    );

    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .await
        .context("Failed to create Discord client")?;

    let shard_manager = client.shard_manager.clone();
    info!("Starting Discord client");

    tokio::select! {
        result = client.start() => result.context("Discord client stopped")?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            shard_manager.shutdown_all().await;
        }
    }

    Ok(())
}
