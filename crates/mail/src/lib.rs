//! Mail crate - Business logic for relaying email into chat
//!
//! This crate provides:
//! - Gmail API client and OAuth authentication
//! - Typed domain models and the [`MailProvider`] seam
//! - The unread-message query engine with label resolution
//! - Content extraction (attachments, plain text, subject)
//! - The relay pipeline, delivery seam and acknowledgment
//! - Interval scheduling and trigger command matching
//!
//! The concrete chat client lives in the application crate.

pub mod config;
pub mod extract;
pub mod gmail;
pub mod models;
pub mod provider;
pub mod query;
pub mod relay;
pub mod schedule;

pub use config::{ConfigError, GmailCredentials, LabelRule, RelayConfig, RenderMode};
pub use extract::{Attachment, ExtractError, extract_attachments, extract_plain_text, extract_subject};
pub use gmail::{GmailAuth, GmailClient};
pub use models::{ChannelId, Label, LabelId, Message, MessageId, MessageSummary};
pub use provider::{InMemoryMailbox, MailProvider, MessagePage};
pub use query::{LabelError, ResolvedLabel, list_unread, resolve_labels};
pub use relay::{Delivery, DeliverySink, MemorySink, PassReport, Relay, resolve_channel};
pub use schedule::{is_trigger, run_every};
