//! Interval scheduling and the manual trigger command

use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

use crate::relay::Relay;

/// Whether an inbound chat message is the trigger command.
///
/// Exact comparison: no trimming, no case folding, no arguments.
pub fn is_trigger(content: &str, command: &str) -> bool {
    content == command
}

/// Run a scheduled pass every `interval`, forever.
///
/// The first pass happens one interval after the call. Manual passes run
/// independently and neither reset nor delay this timer.
pub async fn run_every(relay: Arc<Relay>, interval: Duration) {
    info!(
        "Polling {} labels every {}s",
        relay.labels().iter().filter(|l| l.rule.poll).count(),
        interval.as_secs()
    );

    loop {
        tokio::time::sleep(interval).await;
        debug!("Scheduled pass starting");
        relay.run_scheduled().await;
    }
}
