//! Discord side of the relay: delivery over serenity's HTTP client and the
//! gateway event handler that starts the scheduler and answers the trigger.

use anyhow::{Context as _, Result, bail};
use async_trait::async_trait;
use log::{debug, info, warn};
use serenity::all::{
    ChannelId as DiscordChannelId, Context, CreateAttachment, CreateMessage, EventHandler, Http,
    Message, Ready,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use mail::{Attachment, ChannelId, DeliverySink, Relay, is_trigger, run_every};

/// Discord's per-message character limit
const MAX_MESSAGE_LEN: usize = 2000;

/// Parse a configured channel ID into a Discord snowflake
fn parse_channel(channel: &ChannelId) -> Result<DiscordChannelId> {
    let id: u64 = channel
        .as_str()
        .trim()
        .parse()
        .with_context(|| format!("Invalid Discord channel id: {:?}", channel.as_str()))?;
    if id == 0 {
        bail!("Invalid Discord channel id: 0");
    }
    Ok(DiscordChannelId::new(id))
}

/// Split a message into chunks respecting Discord's character limit.
///
/// Splits on line boundaries where possible and never inside a UTF-8
/// character. Always returns at least one chunk, so empty text stays one
/// send.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();

        if current_len + line_len > max_len && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > max_len {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_len) {
                if piece.len() == max_len {
                    chunks.push(piece.iter().collect());
                } else {
                    current = piece.iter().collect();
                    current_len = piece.len();
                }
            }
        } else {
            current.push_str(line);
            current_len += line_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// [`DeliverySink`] posting to Discord channels
pub struct DiscordSink {
    http: Arc<Http>,
}

impl DiscordSink {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl DeliverySink for DiscordSink {
    async fn send_attachment(&self, channel: &ChannelId, attachment: &Attachment) -> Result<()> {
        let channel_id = parse_channel(channel)?;
        let file = CreateAttachment::bytes(attachment.data.clone(), attachment.filename.clone());

        channel_id
            .send_message(&self.http, CreateMessage::new().add_file(file))
            .await
            .with_context(|| format!("Failed to upload {} to {}", attachment.filename, channel))?;
        Ok(())
    }

    async fn send_text(&self, channel: &ChannelId, text: &str) -> Result<()> {
        let channel_id = parse_channel(channel)?;

        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            channel_id
                .say(&self.http, chunk)
                .await
                .with_context(|| format!("Failed to send text to {}", channel))?;
        }
        Ok(())
    }
}

/// Gateway event handler
///
/// `relay` is `None` when startup could not build the label table; the bot
/// then stays connected but does nothing.
pub struct RelayHandler {
    relay: Option<Arc<Relay>>,
    trigger_command: String,
    poll_interval: Duration,
    scheduler_started: AtomicBool,
}

impl RelayHandler {
    pub fn new(relay: Option<Arc<Relay>>, trigger_command: String, poll_interval: Duration) -> Self {
        Self {
            relay,
            trigger_command,
            poll_interval,
            scheduler_started: AtomicBool::new(false),
        }
    }

    /// True exactly once; `ready` fires again after every reconnect
    fn claim_scheduler_start(&self) -> bool {
        !self.scheduler_started.swap(true, Ordering::SeqCst)
    }

    fn wants_pass(&self, from_bot: bool, content: &str) -> bool {
        !from_bot && is_trigger(content, &self.trigger_command)
    }
}

#[serenity::async_trait]
impl EventHandler for RelayHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Discord: Bot connected as {}", ready.user.name);

        let Some(relay) = &self.relay else {
            warn!("Discord: Label table unavailable, scheduled checks disabled");
            return;
        };

        if self.claim_scheduler_start() {
            tokio::spawn(run_every(relay.clone(), self.poll_interval));
        }
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        debug!("Discord: Message from {}: {}", msg.author.name, msg.content);

        if !self.wants_pass(msg.author.bot, &msg.content) {
            return;
        }

        match &self.relay {
            Some(relay) => {
                info!("Discord: Manual check triggered by {}", msg.author.name);
                let reports = relay.run_all().await;
                let delivered: usize = reports.iter().map(|r| r.delivered).sum();
                info!("Discord: Manual check relayed {} messages", delivered);
            }
            None => warn!("Discord: Manual check ignored, label table unavailable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> RelayHandler {
        RelayHandler::new(None, "!checkEmail".to_string(), Duration::from_secs(300))
    }

    #[test]
    fn test_parse_channel() {
        let id = parse_channel(&ChannelId::new("123456789012345678")).unwrap();
        assert_eq!(id.get(), 123456789012345678);

        assert!(parse_channel(&ChannelId::new("general")).is_err());
        assert!(parse_channel(&ChannelId::new("0")).is_err());
        assert!(parse_channel(&ChannelId::new("")).is_err());
    }

    #[test]
    fn test_split_short_message() {
        assert_eq!(split_message("Motion detected", 2000), vec!["Motion detected"]);
        assert_eq!(split_message("", 2000), vec![""]);
    }

    #[test]
    fn test_split_on_lines() {
        let text = "aaaa\nbbbb\ncccc";
        assert_eq!(split_message(text, 10), vec!["aaaa\nbbbb\n", "cccc"]);
    }

    #[test]
    fn test_split_long_line() {
        let text = "x".repeat(25);
        let chunks = split_message(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_respects_char_boundaries() {
        let text = "é".repeat(15);
        let chunks = split_message(&text, 10);
        assert_eq!(chunks, vec!["é".repeat(10), "é".repeat(5)]);
    }

    #[test]
    fn test_scheduler_starts_once() {
        let handler = handler();
        assert!(handler.claim_scheduler_start());
        assert!(!handler.claim_scheduler_start());
    }

    #[test]
    fn test_trigger_matching() {
        let handler = handler();
        assert!(handler.wants_pass(false, "!checkEmail"));
        assert!(!handler.wants_pass(false, "!checkemail"));
        assert!(!handler.wants_pass(true, "!checkEmail"));
    }
}
