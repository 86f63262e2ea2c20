//! Channel routing for labels

use crate::config::RelayConfig;
use crate::models::ChannelId;

/// Destination channel for a label key: its override if configured,
/// otherwise the default channel. Unknown keys get the default.
pub fn resolve_channel(label_key: &str, config: &RelayConfig) -> ChannelId {
    config
        .labels
        .get(label_key)
        .and_then(|label| label.channel_id.clone())
        .unwrap_or_else(|| config.discord.default_channel_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_and_default() {
        let config = RelayConfig::from_json(
            r#"{
                "discord": { "token": "t", "default_channel_id": "C0" },
                "labels": {
                    "camera": { "name": "Camera" },
                    "chores": { "name": "Chores", "channel_id": "C2" }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(resolve_channel("camera", &config), ChannelId::new("C0"));
        assert_eq!(resolve_channel("chores", &config), ChannelId::new("C2"));
        assert_eq!(resolve_channel("unknown", &config), ChannelId::new("C0"));
    }
}
