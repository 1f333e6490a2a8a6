//! Per-invocation state machine owned by the dispatcher.

use std::fmt;

use anvil_console_types::{InternalError, InvocationId, InvocationRequest, InvocationState, Outcome, SlotKey};
use serde_json::Value;

/// Callback receiving an invocation's terminal outcome.
pub type TerminalCallback = Box<dyn FnOnce(Outcome) + Send + 'static>;

/// Read-only view of an invocation for UI collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationSnapshot {
    pub id: InvocationId,
    pub slot: SlotKey,
    pub method_name: String,
    pub state: InvocationState,
    /// Every state entered so far, starting with `Building`.
    pub transitions: Vec<InvocationState>,
    /// Coerced arguments once the request was built.
    pub arguments: Option<Vec<Value>>,
    pub superseded: bool,
}

pub(crate) struct Invocation {
    id: InvocationId,
    slot: SlotKey,
    method_name: String,
    transitions: Vec<InvocationState>,
    request: Option<InvocationRequest>,
    outcome: Option<Outcome>,
    superseded: bool,
    subscriber: Option<TerminalCallback>,
}

impl Invocation {
    pub(crate) fn new(id: InvocationId, slot: SlotKey, method_name: String) -> Self {
        Self {
            id,
            slot,
            method_name,
            transitions: vec![InvocationState::Building],
            request: None,
            outcome: None,
            superseded: false,
            subscriber: None,
        }
    }

    pub(crate) fn state(&self) -> InvocationState {
        self.transitions.last().copied().unwrap_or(InvocationState::Building)
    }

    pub(crate) fn slot(&self) -> &SlotKey {
        &self.slot
    }

    pub(crate) fn is_superseded(&self) -> bool {
        self.superseded
    }

    pub(crate) fn has_subscriber(&self) -> bool {
        self.subscriber.is_some()
    }

    /// `Building -> Dispatched`.
    pub(crate) fn mark_dispatched(&mut self, request: InvocationRequest) -> Result<(), InternalError> {
        if self.state() != InvocationState::Building {
            return Err(InternalError::new(format!(
                "invocation {} dispatched from state {:?}",
                self.id,
                self.state()
            )));
        }
        self.request = Some(request);
        self.transitions.push(InvocationState::Dispatched);
        Ok(())
    }

    /// Record the terminal outcome. A second call is an invariant violation
    /// and leaves the first outcome in place.
    pub(crate) fn complete(&mut self, outcome: Outcome) -> Result<(), InternalError> {
        if self.state().is_terminal() || self.outcome.is_some() {
            return Err(InternalError::new(format!("invocation {} completed more than once", self.id)));
        }
        let terminal = if outcome.is_success() {
            InvocationState::Succeeded
        } else {
            InvocationState::Failed
        };
        self.transitions.push(terminal);
        self.outcome = Some(outcome);
        Ok(())
    }

    /// Drops any subscriber; the outcome will never be delivered.
    pub(crate) fn supersede(&mut self) {
        self.superseded = true;
        self.subscriber = None;
    }

    pub(crate) fn set_subscriber(&mut self, callback: TerminalCallback) {
        self.subscriber = Some(callback);
    }

    /// Hands out the outcome and its subscriber once both are present.
    pub(crate) fn take_delivery(&mut self) -> Option<(TerminalCallback, Outcome)> {
        if self.superseded || self.subscriber.is_none() || self.outcome.is_none() {
            return None;
        }
        let callback = self.subscriber.take()?;
        let outcome = self.outcome.take()?;
        Some((callback, outcome))
    }

    pub(crate) fn snapshot(&self) -> InvocationSnapshot {
        InvocationSnapshot {
            id: self.id,
            slot: self.slot.clone(),
            method_name: self.method_name.clone(),
            state: self.state(),
            transitions: self.transitions.clone(),
            arguments: self.request.as_ref().map(|request| request.coerced_arguments.clone()),
            superseded: self.superseded,
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("id", &self.id)
            .field("slot", &self.slot)
            .field("method_name", &self.method_name)
            .field("transitions", &self.transitions)
            .field("superseded", &self.superseded)
            .field("has_outcome", &self.outcome.is_some())
            .field("has_subscriber", &self.subscriber.is_some())
            .finish()
    }
}
