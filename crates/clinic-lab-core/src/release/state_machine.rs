//! Release state machine.
//!
//! `Draft → Validated → Sent`. `Sent` is terminal.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{WorkflowError, WorkflowResult};
use crate::models::ResultStatus;

/// Actions that move a result along its release path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReleaseAction {
    Validate,
    Send,
}

impl ReleaseAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseAction::Validate => "validate",
            ReleaseAction::Send => "send",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "validate" => Some(ReleaseAction::Validate),
            "send" => Some(ReleaseAction::Send),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReleaseAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Steps the "send to physician" action has to take from a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPlan {
    /// Still a draft: validate first, then send
    ValidateThenSend,
    /// Validated: send only
    SendOnly,
    /// Already sent: nothing to do
    AlreadySent,
}

/// Transition table for result release.
#[derive(Debug)]
pub struct ReleaseStateMachine {
    transitions: HashMap<(ResultStatus, ReleaseAction), ResultStatus>,
}

impl ReleaseStateMachine {
    pub fn new() -> Self {
        let mut transitions = HashMap::new();
        transitions.insert((ResultStatus::Draft, ReleaseAction::Validate), ResultStatus::Validated);
        transitions.insert((ResultStatus::Validated, ReleaseAction::Send), ResultStatus::Sent);
        Self { transitions }
    }

    /// Check whether an action is legal from a status.
    pub fn can_transition(&self, from: ResultStatus, action: ReleaseAction) -> bool {
        self.transitions.contains_key(&(from, action))
    }

    /// Resolve the status an action leads to.
    pub fn transition(&self, from: ResultStatus, action: ReleaseAction) -> WorkflowResult<ResultStatus> {
        self.transitions
            .get(&(from, action))
            .copied()
            .ok_or(WorkflowError::Transition { from, action })
    }

    /// Actions available from a status.
    pub fn possible_actions(&self, current: ResultStatus) -> Vec<ReleaseAction> {
        let mut actions: Vec<_> = self
            .transitions
            .keys()
            .filter(|(state, _)| *state == current)
            .map(|(_, action)| *action)
            .collect();
        actions.sort_by_key(|a| a.as_str());
        actions
    }

    /// Plan the composite "send to physician" action.
    pub fn plan_send(&self, current: ResultStatus) -> SendPlan {
        match current {
            ResultStatus::Draft => SendPlan::ValidateThenSend,
            ResultStatus::Validated => SendPlan::SendOnly,
            ResultStatus::Sent => SendPlan::AlreadySent,
        }
    }

    pub fn is_terminal(&self, status: ResultStatus) -> bool {
        self.possible_actions(status).is_empty()
    }
}

impl Default for ReleaseStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let sm = ReleaseStateMachine::new();

        assert!(sm.can_transition(ResultStatus::Draft, ReleaseAction::Validate));
        assert!(sm.can_transition(ResultStatus::Validated, ReleaseAction::Send));
        assert_eq!(
            sm.transition(ResultStatus::Draft, ReleaseAction::Validate).unwrap(),
            ResultStatus::Validated
        );
        assert_eq!(
            sm.transition(ResultStatus::Validated, ReleaseAction::Send).unwrap(),
            ResultStatus::Sent
        );
    }

    #[test]
    fn test_no_skipping_states() {
        let sm = ReleaseStateMachine::new();

        assert!(!sm.can_transition(ResultStatus::Draft, ReleaseAction::Send));
        assert!(!sm.can_transition(ResultStatus::Validated, ReleaseAction::Validate));
        assert!(!sm.can_transition(ResultStatus::Sent, ReleaseAction::Validate));
        assert!(!sm.can_transition(ResultStatus::Sent, ReleaseAction::Send));

        let err = sm.transition(ResultStatus::Sent, ReleaseAction::Validate).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Transition {
                from: ResultStatus::Sent,
                action: ReleaseAction::Validate
            }
        ));
    }

    #[test]
    fn test_sent_is_terminal() {
        let sm = ReleaseStateMachine::new();
        assert!(sm.is_terminal(ResultStatus::Sent));
        assert!(!sm.is_terminal(ResultStatus::Draft));
        assert_eq!(sm.possible_actions(ResultStatus::Draft), vec![ReleaseAction::Validate]);
    }

    #[test]
    fn test_plan_send() {
        let sm = ReleaseStateMachine::new();
        assert_eq!(sm.plan_send(ResultStatus::Draft), SendPlan::ValidateThenSend);
        assert_eq!(sm.plan_send(ResultStatus::Validated), SendPlan::SendOnly);
        assert_eq!(sm.plan_send(ResultStatus::Sent), SendPlan::AlreadySent);
    }
}
