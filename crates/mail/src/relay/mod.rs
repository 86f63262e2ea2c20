//! Label-driven email-to-chat relay
//!
//! A pass over one label walks this sequence for every unread message:
//! fetch, extract, deliver, acknowledge. A message that fails before
//! acknowledgment is skipped and stays unread, so a later pass retries it.
//! Delivery is at-least-once: a failed acknowledgment means redelivery.

mod ack;
mod guard;
mod routing;
mod sink;

pub use ack::mark_read;
pub use routing::resolve_channel;
pub use sink::{Delivery, DeliverySink, MemorySink};

use chrono::Local;
use log::{info, warn};
use std::sync::Arc;

use crate::config::RenderMode;
use crate::extract::{Attachment, extract_attachments, extract_plain_text, extract_subject};
use crate::models::MessageId;
use crate::provider::MailProvider;
use crate::query::{ResolvedLabel, list_unread};
use guard::InFlight;

/// Why a message was skipped
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("failed to fetch message: {0:#}")]
    Fetch(anyhow::Error),
    #[error("failed to deliver to channel: {0:#}")]
    Delivery(anyhow::Error),
}

/// What was delivered for one message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivered {
    pub attachments: usize,
    pub texts: usize,
    /// Attachments that matched but could not be fetched or decoded
    pub dropped_attachments: usize,
}

/// Outcome of one pass over one label
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub label: String,
    /// Unread messages returned by the query
    pub listed: usize,
    /// Messages whose content was fully delivered
    pub delivered: usize,
    /// Messages skipped after a fetch or delivery failure
    pub skipped: usize,
    /// Delivered messages whose UNREAD label was removed
    pub acknowledged: usize,
    pub attachments_sent: usize,
    pub texts_sent: usize,
    /// Matching attachments that could not be fetched or decoded
    pub dropped_attachments: usize,
}

/// Shared relay state, built once at startup
///
/// Holds the mail provider, the delivery sink and the resolved label table.
/// Read-only after construction apart from in-flight tracking.
pub struct Relay {
    provider: Arc<dyn MailProvider>,
    sink: Arc<dyn DeliverySink>,
    labels: Vec<ResolvedLabel>,
    attachment_pattern: String,
    in_flight: InFlight,
}

impl Relay {
    /// Create a relay over a resolved label table
    pub fn new(
        provider: Arc<dyn MailProvider>,
        sink: Arc<dyn DeliverySink>,
        labels: Vec<ResolvedLabel>,
        attachment_pattern: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            sink,
            labels,
            attachment_pattern: attachment_pattern.into(),
            in_flight: InFlight::default(),
        }
    }

    /// The resolved label table
    pub fn labels(&self) -> &[ResolvedLabel] {
        &self.labels
    }

    /// Run a pass over every configured label (manual trigger)
    pub async fn run_all(&self) -> Vec<PassReport> {
        let mut reports = Vec::new();
        for label in &self.labels {
            if let Some(report) = self.run_label(label).await {
                reports.push(report);
            }
        }
        reports
    }

    /// Run a pass over the labels the interval timer covers
    pub async fn run_scheduled(&self) -> Vec<PassReport> {
        let mut reports = Vec::new();
        for label in self.labels.iter().filter(|l| l.rule.poll) {
            if let Some(report) = self.run_label(label).await {
                reports.push(report);
            }
        }
        reports
    }

    /// Run one pass over one label.
    ///
    /// Returns `None` without doing anything if a pass for the same label is
    /// still running.
    pub async fn run_label(&self, label: &ResolvedLabel) -> Option<PassReport> {
        let Some(_claim) = self.in_flight.try_claim(&label.rule.key) else {
            info!("Pass for {} still running, skipping", label.rule.key);
            return None;
        };

        let summaries = list_unread(self.provider.as_ref(), &label.label_id, Local::now()).await;

        let mut report = PassReport {
            label: label.rule.key.clone(),
            listed: summaries.len(),
            ..PassReport::default()
        };

        for summary in &summaries {
            match self.process_message(label, &summary.id).await {
                Ok(delivered) => {
                    report.delivered += 1;
                    report.attachments_sent += delivered.attachments;
                    report.texts_sent += delivered.texts;
                    report.dropped_attachments += delivered.dropped_attachments;
                    if mark_read(self.provider.as_ref(), &summary.id).await {
                        report.acknowledged += 1;
                    }
                }
                Err(e) => {
                    warn!("Skipping message {} under {}: {}", summary.id, label.rule.key, e);
                    report.skipped += 1;
                }
            }
        }

        if report.listed > 0 {
            info!(
                "Pass {}: {} listed, {} delivered, {} skipped, {} marked read, {} attachments dropped",
                report.label,
                report.listed,
                report.delivered,
                report.skipped,
                report.acknowledged,
                report.dropped_attachments
            );
        }
        Some(report)
    }

    /// Fetch, extract and deliver one message
    async fn process_message(
        &self,
        label: &ResolvedLabel,
        id: &MessageId,
    ) -> Result<Delivered, ItemError> {
        let message = self
            .provider
            .get_message(id)
            .await
            .map_err(ItemError::Fetch)?;

        let channel = &label.rule.channel;
        let mut delivered = Delivered::default();

        match label.rule.render {
            RenderMode::Full => {
                let mut attachments: Vec<Attachment> = Vec::new();
                for result in
                    extract_attachments(self.provider.as_ref(), &message, &self.attachment_pattern)
                        .await
                {
                    match result {
                        Ok(attachment) => attachments.push(attachment),
                        Err(e) => {
                            warn!("Message {}: {}", id, e);
                            delivered.dropped_attachments += 1;
                        }
                    }
                }
                let text = extract_plain_text(&message);

                for attachment in &attachments {
                    self.sink
                        .send_attachment(channel, attachment)
                        .await
                        .map_err(ItemError::Delivery)?;
                    delivered.attachments += 1;
                }
                if let Some(text) = text {
                    self.sink
                        .send_text(channel, &text)
                        .await
                        .map_err(ItemError::Delivery)?;
                    delivered.texts += 1;
                }
            }
            RenderMode::SubjectOnly => {
                if let Some(subject) = extract_subject(&message) {
                    self.sink
                        .send_text(channel, &subject)
                        .await
                        .map_err(ItemError::Delivery)?;
                    delivered.texts += 1;
                }
            }
        }

        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabelRule;
    use crate::models::{ChannelId, LabelId, Message};
    use crate::provider::InMemoryMailbox;
    use tokio_test::block_on;

    fn chores() -> ResolvedLabel {
        ResolvedLabel {
            rule: LabelRule {
                key: "chores".to_string(),
                name: "Chores".to_string(),
                channel: ChannelId::new("C2"),
                render: RenderMode::SubjectOnly,
                poll: false,
            },
            label_id: LabelId::new("Label_2"),
        }
    }

    fn relay(mailbox: Arc<InMemoryMailbox>, sink: Arc<MemorySink>) -> Relay {
        Relay::new(mailbox, sink, vec![chores()], ".jpg")
    }

    #[test]
    fn test_label_already_in_flight_is_skipped() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        mailbox.insert_message(
            Message::new("m1").header("Subject", "Dishes"),
            &["Label_2", "UNREAD"],
        );
        let sink = Arc::new(MemorySink::new());
        let relay = relay(mailbox.clone(), sink.clone());

        let claim = relay.in_flight.try_claim("chores");
        assert!(block_on(relay.run_label(&chores())).is_none());
        assert!(sink.deliveries().is_empty());
        assert!(mailbox.is_unread("m1"));

        drop(claim);
        let report = block_on(relay.run_label(&chores())).unwrap();
        assert_eq!(report.delivered, 1);
    }

    #[test]
    fn test_scheduled_pass_skips_manual_only_labels() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        mailbox.insert_message(
            Message::new("m1").header("Subject", "Dishes"),
            &["Label_2", "UNREAD"],
        );
        let sink = Arc::new(MemorySink::new());
        let relay = relay(mailbox.clone(), sink.clone());

        assert!(block_on(relay.run_scheduled()).is_empty());
        assert!(sink.deliveries().is_empty());

        let reports = block_on(relay.run_all());
        assert_eq!(reports.len(), 1);
        assert_eq!(
            sink.deliveries(),
            vec![Delivery::Text {
                channel: ChannelId::new("C2"),
                text: "Dishes".to_string(),
            }]
        );
    }
}
