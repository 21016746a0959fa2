//! Events published by the barrier while tasks complete.

use serde::{Deserialize, Serialize};

use super::errors::BarrierError;

/// Progress report emitted after each task completion.
///
/// The stat stream reflects completion order; `remain` reflects
/// registration order minus everything completed so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyStat {
    /// Name of the task that just completed.
    pub id: String,

    /// Names of the tasks still pending, in registration order.
    pub remain: Vec<String>,
}

/// The barrier's event stream.
///
/// None of these fire after the barrier has resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarrierEvent {
    /// A task failed. For weak dependencies this is a report only; for
    /// everything else the same error also resolves the barrier.
    Error(BarrierError),

    /// A task completed (successfully, or as a tolerated weak failure).
    Stat(ReadyStat),

    /// A still-pending task outlived its timeout. Informational: the task
    /// stays pending and can complete normally afterwards.
    Timeout { task: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_serializes_to_the_wire_shape() {
        let stat = ReadyStat {
            id: "a".to_string(),
            remain: vec!["b".to_string(), "c".to_string()],
        };

        let json = serde_json::to_value(&stat).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "a", "remain": ["b", "c"] }));

        let back: ReadyStat = serde_json::from_value(json).unwrap();
        assert_eq!(back, stat);
    }
}
