use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

const fn default_max_in_flight() -> usize {
    4096
}

/// Configuration for a shipper pipeline.
///
/// Contains the process-wide settings that bound how many events may be
/// in flight (enqueued but not yet acknowledged) at once. Per-producer
/// behavior lives in [`crate::shared::ClientSettings`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineSettings {
    /// The unique identifier for this pipeline.
    ///
    /// A pipeline id isolates pipelines from each other in logs and metrics
    /// when several run in the same process.
    pub id: u64,
    /// Maximum number of events admitted but not yet acknowledged.
    ///
    /// Once this many events are in flight, publishing either suspends or
    /// drops depending on the client's publish mode.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl PipelineSettings {
    /// Validates pipeline configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_in_flight == 0 {
            return Err(ValidationError::MaxInFlightZero);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_default_max_in_flight() {
        let settings: PipelineSettings = serde_json::from_str(r#"{"id": 7}"#).unwrap();
        assert_eq!(settings.id, 7);
        assert_eq!(settings.max_in_flight, 4096);
        settings.validate().unwrap();
    }

    #[test]
    fn rejects_zero_max_in_flight() {
        let settings: PipelineSettings =
            serde_json::from_str(r#"{"id": 1, "max_in_flight": 0}"#).unwrap();
        assert!(matches!(
            settings.validate(),
            Err(ValidationError::MaxInFlightZero)
        ));
    }
}
