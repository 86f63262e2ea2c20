//! Acknowledging processed messages

use log::debug;

use crate::models::{LabelId, MessageId};
use crate::provider::MailProvider;

/// Remove the UNREAD label from a delivered message.
///
/// Returns whether the request succeeded. A failure only means the message
/// will be delivered again on a later pass, so it is not reported as a
/// batch failure.
pub async fn mark_read(provider: &dyn MailProvider, id: &MessageId) -> bool {
    match provider.modify_labels(id, &[], &[LabelId::UNREAD]).await {
        Ok(()) => true,
        Err(e) => {
            debug!("Could not mark {} as read: {:#}", id, e);
            false
        }
    }
}
