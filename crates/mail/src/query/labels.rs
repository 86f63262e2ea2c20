//! Resolving configured label names to provider label IDs

use anyhow::Context;
use log::{error, info};

use crate::config::LabelRule;
use crate::models::{Label, LabelId};
use crate::provider::MailProvider;

/// A label rule paired with the provider's ID for its label name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLabel {
    pub rule: LabelRule,
    pub label_id: LabelId,
}

/// Why the label table could not be built
#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("failed to list labels: {0:#}")]
    Catalog(anyhow::Error),
    #[error("no label named {name:?} (configured as {key:?})")]
    Unresolved { key: String, name: String },
}

/// Find the ID of the label whose name matches exactly
pub fn find_label_id(catalog: &[Label], name: &str) -> Option<LabelId> {
    catalog
        .iter()
        .find(|label| label.name == name)
        .map(|label| label.id.clone())
}

/// Resolve every rule against the live label catalog.
///
/// All-or-nothing: one unknown name fails the whole table, so nothing gets
/// scheduled against a partially resolved configuration.
pub async fn resolve_labels(
    provider: &dyn MailProvider,
    rules: Vec<LabelRule>,
) -> Result<Vec<ResolvedLabel>, LabelError> {
    let catalog = provider
        .list_labels()
        .await
        .context("Label catalog unavailable")
        .map_err(LabelError::Catalog)?;

    rules
        .into_iter()
        .map(|rule| match find_label_id(&catalog, &rule.name) {
            Some(label_id) => {
                info!("Label {} ({}) resolved to {}", rule.key, rule.name, label_id);
                Ok(ResolvedLabel { rule, label_id })
            }
            None => {
                error!("Label {} ({}) not found in mailbox", rule.key, rule.name);
                Err(LabelError::Unresolved {
                    key: rule.key,
                    name: rule.name,
                })
            }
        })
        .collect()
}
