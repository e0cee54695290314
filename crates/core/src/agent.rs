//! Agent-level policy and outcome types.

use serde::{Deserialize, Serialize};

use crate::error_record::ErrorRecord;

/// Which tools the agent may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentMode {
    /// Read, write and meta tools (default)
    #[default]
    Edit,
    /// Read and meta tools only
    ReadOnly,
}

impl std::fmt::Display for AgentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Edit => f.write_str("edit"),
            Self::ReadOnly => f.write_str("read_only"),
        }
    }
}

/// When the reasoning tool must be called before any other tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePolicy {
    /// Forced on the first iteration of a turn started by a user message or
    /// an approval result.
    #[default]
    FirstIteration,
    /// Same trigger, but forced on every iteration until the reasoning tool
    /// has been called.
    UntilSatisfied,
    /// Never forced.
    Disabled,
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The model answered without requesting tools.
    Completed,
    /// The iteration ceiling was hit.
    IterationLimit,
    /// The user stopped the turn.
    Cancelled,
    /// A terminal error was recorded.
    Faulted { record: ErrorRecord },
    /// Another turn was already running for the session. Nothing happened.
    AlreadyRunning,
}

impl TurnOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        assert_eq!(AgentMode::default(), AgentMode::Edit);
        assert_eq!(GatePolicy::default(), GatePolicy::FirstIteration);
    }

    #[test]
    fn gate_policy_from_toml_style_string() {
        let policy: GatePolicy = serde_json::from_str(r#""until_satisfied""#).unwrap();
        assert_eq!(policy, GatePolicy::UntilSatisfied);
    }

    #[test]
    fn outcome_is_tagged() {
        let json = serde_json::to_string(&TurnOutcome::Cancelled).unwrap();
        assert_eq!(json, r#"{"outcome":"cancelled"}"#);
    }
}
