//! Reasoning gate — makes the model think before it acts.

use quill_core::agent::GatePolicy;
use quill_core::message::{Message, MessageBody, SystemKind};

/// Per-turn gate state.
#[derive(Debug, Clone)]
pub struct ReasoningGate {
    policy: GatePolicy,
    tool: String,
    triggered: bool,
    satisfied: bool,
    forced: bool,
}

/// A turn arms the gate when it starts from fresh user input or from an
/// approval decision.
pub fn is_trigger(last: Option<&Message>) -> bool {
    match last.map(|m| &m.body) {
        Some(MessageBody::User { .. }) => true,
        Some(MessageBody::System { kind, .. }) => *kind == SystemKind::ApprovalResult,
        _ => false,
    }
}

impl ReasoningGate {
    /// Gate for a turn whose history ends with `last`.
    pub fn new(policy: GatePolicy, tool: impl Into<String>, last: Option<&Message>) -> Self {
        Self {
            policy,
            tool: tool.into(),
            triggered: is_trigger(last),
            satisfied: false,
            forced: false,
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    /// Start iteration `iteration` (1-based). Returns whether the request
    /// must force the reasoning tool.
    pub fn begin_iteration(&mut self, iteration: u32) -> bool {
        self.forced = self.triggered
            && !self.satisfied
            && match self.policy {
                GatePolicy::FirstIteration => iteration == 1,
                GatePolicy::UntilSatisfied => true,
                GatePolicy::Disabled => false,
            };
        self.forced
    }

    /// Check a call before dispatch. `Err` carries the rejection text.
    pub fn check(&self, tool_name: &str) -> Result<(), String> {
        if !self.forced || self.satisfied || tool_name == self.tool {
            return Ok(());
        }
        Err(format!(
            "'{tool_name}' was not executed: call '{}' first to plan your approach, \
             then call '{tool_name}' again",
            self.tool
        ))
    }

    /// Record a successful call. The reasoning tool opens the gate for the
    /// rest of the turn.
    pub fn record(&mut self, tool_name: &str) {
        if tool_name == self.tool {
            self.satisfied = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(policy: GatePolicy, last: Message) -> ReasoningGate {
        ReasoningGate::new(policy, "thinking", Some(&last))
    }

    #[test]
    fn user_message_forces_first_iteration_only() {
        let mut g = gate(GatePolicy::FirstIteration, Message::user("hi"));
        assert!(g.begin_iteration(1));
        assert!(g.check("read_file").is_err());
        assert!(g.check("thinking").is_ok());
        assert!(!g.begin_iteration(2));
        assert!(g.check("read_file").is_ok());
    }

    #[test]
    fn reasoning_call_opens_the_gate() {
        let mut g = gate(GatePolicy::FirstIteration, Message::user("hi"));
        g.begin_iteration(1);
        g.record("thinking");
        assert!(g.check("write_file").is_ok());
        assert!(g.is_satisfied());
    }

    #[test]
    fn approval_result_arms_the_gate() {
        let mut g = gate(
            GatePolicy::FirstIteration,
            Message::system(SystemKind::ApprovalResult, "Approved: Create a.md"),
        );
        assert!(g.begin_iteration(1));
    }

    #[test]
    fn other_endings_do_not_arm_the_gate() {
        let mut g = gate(GatePolicy::FirstIteration, Message::model_text("done"));
        assert!(!g.begin_iteration(1));
        let mut g = gate(
            GatePolicy::FirstIteration,
            Message::system(SystemKind::Stopped, "Stopped by user"),
        );
        assert!(!g.begin_iteration(1));
        let mut g = ReasoningGate::new(GatePolicy::FirstIteration, "thinking", None);
        assert!(!g.begin_iteration(1));
    }

    #[test]
    fn until_satisfied_keeps_forcing() {
        let mut g = gate(GatePolicy::UntilSatisfied, Message::user("hi"));
        assert!(g.begin_iteration(1));
        assert!(g.begin_iteration(2));
        g.record("thinking");
        assert!(!g.begin_iteration(3));
    }

    #[test]
    fn disabled_never_forces() {
        let mut g = gate(GatePolicy::Disabled, Message::user("hi"));
        assert!(!g.begin_iteration(1));
        assert!(g.check("write_file").is_ok());
    }

    #[test]
    fn rejection_names_both_tools() {
        let mut g = gate(GatePolicy::FirstIteration, Message::user("hi"));
        g.begin_iteration(1);
        let text = g.check("list_files").unwrap_err();
        assert!(text.contains("'thinking'"));
        assert!(text.contains("'list_files'"));
    }
}
