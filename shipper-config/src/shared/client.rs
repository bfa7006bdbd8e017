use serde::{Deserialize, Serialize};

/// Controls what happens when a publish finds the pipeline saturated.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// Suspend the publishing context until capacity frees up or the
    /// client is closed.
    Block,
    /// Fail fast and drop the event, counting it as dropped in the
    /// client's ack bookkeeping.
    DropIfFull,
}

impl Default for PublishMode {
    fn default() -> Self {
        Self::Block
    }
}

/// Controls what happens when the destination selector yields an empty
/// string for an event.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EmptyDestination {
    /// Publish the event with an empty destination, leaving routing to the
    /// output's own default.
    UseDefault,
    /// Drop the event, counting it as dropped in ack bookkeeping.
    Drop,
}

impl Default for EmptyDestination {
    fn default() -> Self {
        Self::UseDefault
    }
}

const fn default_wait_close_ms() -> u64 {
    0
}

/// Per-producer connection settings.
///
/// The ack callbacks themselves are runtime values and are supplied when
/// connecting a client; this type carries only the declarative knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClientSettings {
    /// Behavior when the in-flight limit is reached.
    #[serde(default)]
    pub publish_mode: PublishMode,
    /// Grace period, in milliseconds, that `close` waits for outstanding
    /// acknowledgments before giving up. Zero disables waiting.
    #[serde(default = "default_wait_close_ms")]
    pub wait_close_ms: u64,
    /// Behavior when the selector yields an empty destination.
    #[serde(default)]
    pub empty_destination: EmptyDestination,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            publish_mode: PublishMode::default(),
            wait_close_ms: default_wait_close_ms(),
            empty_destination: EmptyDestination::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let settings: ClientSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.publish_mode, PublishMode::Block);
        assert_eq!(settings.wait_close_ms, 0);
        assert_eq!(settings.empty_destination, EmptyDestination::UseDefault);
    }

    #[test]
    fn deserializes_snake_case_variants() {
        let settings: ClientSettings = serde_json::from_str(
            r#"{"publish_mode": "drop_if_full", "wait_close_ms": 250, "empty_destination": "drop"}"#,
        )
        .unwrap();
        assert_eq!(settings.publish_mode, PublishMode::DropIfFull);
        assert_eq!(settings.wait_close_ms, 250);
        assert_eq!(settings.empty_destination, EmptyDestination::Drop);
    }
}
