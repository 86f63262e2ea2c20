//! Delivery of extracted content to chat channels

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::RwLock;

use crate::extract::Attachment;
use crate::models::ChannelId;

/// Trait for sending content to a chat channel
///
/// Each call is one chat message; attachments are never batched.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Send a single file attachment
    async fn send_attachment(&self, channel: &ChannelId, attachment: &Attachment) -> Result<()>;

    /// Send a text message, as is (empty or whitespace-only included)
    async fn send_text(&self, channel: &ChannelId, text: &str) -> Result<()>;
}

/// A delivery recorded by [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    File {
        channel: ChannelId,
        filename: String,
        data: Vec<u8>,
    },
    Text {
        channel: ChannelId,
        text: String,
    },
}

impl Delivery {
    pub fn channel(&self) -> &ChannelId {
        match self {
            Delivery::File { channel, .. } | Delivery::Text { channel, .. } => channel,
        }
    }
}

/// In-memory sink recording every delivery in order
///
/// Used for testing and dry runs. Channels can be marked unreachable.
#[derive(Default)]
pub struct MemorySink {
    deliveries: RwLock<Vec<Delivery>>,
    unreachable: RwLock<HashSet<ChannelId>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `channel` fail
    pub fn make_unreachable(&self, channel: &ChannelId) {
        self.unreachable.write().unwrap().insert(channel.clone());
    }

    /// Deliveries so far, in send order
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.read().unwrap().clone()
    }

    fn check(&self, channel: &ChannelId) -> Result<()> {
        if self.unreachable.read().unwrap().contains(channel) {
            bail!("Channel {} is not reachable", channel);
        }
        Ok(())
    }
}

#[async_trait]
impl DeliverySink for MemorySink {
    async fn send_attachment(&self, channel: &ChannelId, attachment: &Attachment) -> Result<()> {
        self.check(channel)?;
        self.deliveries.write().unwrap().push(Delivery::File {
            channel: channel.clone(),
            filename: attachment.filename.clone(),
            data: attachment.data.clone(),
        });
        Ok(())
    }

    async fn send_text(&self, channel: &ChannelId, text: &str) -> Result<()> {
        self.check(channel)?;
        self.deliveries.write().unwrap().push(Delivery::Text {
            channel: channel.clone(),
            text: text.to_string(),
        });
        Ok(())
    }
}
