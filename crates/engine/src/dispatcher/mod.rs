//! Invocation dispatcher.
//!
//! Owns the lifecycle of every invocation: request building runs inside
//! [`InvocationDispatcher::submit`], the single transport call runs on a
//! spawned Tokio task, and the terminal [`Outcome`] is handed to at most one
//! subscriber. Invocations are grouped by [`SlotKey`]; submitting into a slot
//! whose previous invocation is still in flight supersedes it and its outcome
//! is dropped.

mod invocation;

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use anvil_console_registry::MethodRegistry;
use anvil_console_types::{InternalError, InvocationId, Outcome, RawValue, SlotKey};
use anvil_console_util::redact_json;
use futures_util::FutureExt;
use indexmap::IndexMap;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::classify::{Failure, classify};
use crate::materialize::materialize;
use crate::request::build_request;
use crate::transport::Transport;

use invocation::{Invocation, TerminalCallback};
pub use invocation::InvocationSnapshot;

/// Errors returned by dispatcher entry points. None of these create or
/// complete an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown method '{0}'")]
    UnknownMethod(String),
    #[error("no Tokio runtime is available to dispatch invocations")]
    NoRuntime,
    #[error("unknown invocation {0}")]
    UnknownInvocation(InvocationId),
    #[error("invocation {0} was superseded")]
    Superseded(InvocationId),
    #[error("invocation {0} already has a subscriber")]
    AlreadySubscribed(InvocationId),
}

#[derive(Debug, Default)]
struct DispatcherState {
    next_id: u64,
    invocations: HashMap<InvocationId, Invocation>,
    active_slots: HashMap<SlotKey, InvocationId>,
}

impl DispatcherState {
    fn allocate_id(&mut self) -> InvocationId {
        self.next_id += 1;
        InvocationId(self.next_id)
    }

    /// Supersede whatever is still in flight in `slot`.
    fn supersede_slot(&mut self, slot: &SlotKey) {
        let Some(previous) = self.active_slots.get(slot).copied() else {
            return;
        };
        if let Some(invocation) = self.invocations.get_mut(&previous)
            && !invocation.state().is_terminal()
        {
            invocation.supersede();
            info!(invocation = %previous, slot = %slot.0, "superseded in-flight invocation");
        }
    }

    /// Remove a delivered invocation and its slot mapping.
    fn retire(&mut self, id: InvocationId) {
        if let Some(invocation) = self.invocations.remove(&id)
            && self.active_slots.get(invocation.slot()) == Some(&id)
        {
            self.active_slots.remove(invocation.slot());
        }
    }
}

/// Dispatches method invocations against a [`Transport`].
///
/// Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct InvocationDispatcher {
    registry: Arc<MethodRegistry>,
    transport: Arc<dyn Transport>,
    state: Arc<Mutex<DispatcherState>>,
}

impl InvocationDispatcher {
    pub fn new(registry: Arc<MethodRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
            state: Arc::new(Mutex::new(DispatcherState::default())),
        }
    }

    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.registry
    }

    /// Submit `method_name` in the slot named after the method.
    pub fn submit(&self, method_name: &str, raw_values: IndexMap<String, RawValue>) -> Result<InvocationId, DispatchError> {
        self.submit_in_slot(SlotKey::from(method_name), method_name, raw_values)
    }

    /// Build the request and, if it is valid, dispatch it on a spawned task.
    ///
    /// Returns as soon as the invocation is either `Failed` with a validation
    /// outcome or `Dispatched`.
    pub fn submit_in_slot(
        &self,
        slot: SlotKey,
        method_name: &str,
        raw_values: IndexMap<String, RawValue>,
    ) -> Result<InvocationId, DispatchError> {
        let descriptor = self
            .registry
            .lookup(method_name)
            .map_err(|_| DispatchError::UnknownMethod(method_name.to_string()))?
            .clone();
        let handle = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;

        let (id, dispatch) = {
            let mut state = self.state.lock().expect("dispatcher state lock");
            let id = state.allocate_id();
            state.supersede_slot(&slot);
            state.active_slots.insert(slot.clone(), id);

            let mut invocation = Invocation::new(id, slot, descriptor.method_name.clone());
            let dispatch = match build_request(&descriptor, &raw_values) {
                Ok(request) => {
                    let arguments = request.coerced_arguments.clone();
                    match invocation.mark_dispatched(request) {
                        Ok(()) => Some(arguments),
                        Err(internal) => {
                            fail_before_dispatch(&mut invocation, internal);
                            None
                        }
                    }
                }
                Err(validation) => {
                    debug!(invocation = %id, method = %descriptor.method_name, field = %validation.parameter_name(), "request rejected: {validation}");
                    fail_before_dispatch(&mut invocation, validation);
                    None
                }
            };
            state.invocations.insert(id, invocation);
            (id, dispatch)
        };

        let Some(arguments) = dispatch else {
            return Ok(id);
        };

        let logged_params = serde_json::Value::Array(arguments.iter().map(redact_json).collect());
        info!(invocation = %id, method = %descriptor.method_name, params = %logged_params, "dispatching");
        let transport = Arc::clone(&self.transport);
        let state = Arc::clone(&self.state);
        handle.spawn(async move {
            let sent = AssertUnwindSafe(transport.send(&descriptor.method_name, arguments))
                .catch_unwind()
                .await;
            let outcome = match sent {
                Ok(Ok(result)) => match materialize(&descriptor, result) {
                    Ok(materialized) => Outcome::Success(materialized),
                    Err(internal) => Outcome::Failure(classify(internal)),
                },
                Ok(Err(send_error)) => Outcome::Failure(classify(send_error)),
                Err(panic) => Outcome::Failure(classify(InternalError::new(format!(
                    "transport panicked while sending {}: {}",
                    descriptor.method_name,
                    panic_message(&*panic)
                )))),
            };
            finish(&state, id, outcome);
        });
        Ok(id)
    }

    /// Register `on_terminal` to receive the outcome of `id`.
    ///
    /// Called immediately on this thread when the outcome is already known.
    pub fn subscribe<F>(&self, id: InvocationId, on_terminal: F) -> Result<(), DispatchError>
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let delivery = {
            let mut state = self.state.lock().expect("dispatcher state lock");
            let invocation = state.invocations.get_mut(&id).ok_or(DispatchError::UnknownInvocation(id))?;
            if invocation.is_superseded() {
                return Err(DispatchError::Superseded(id));
            }
            if invocation.has_subscriber() {
                return Err(DispatchError::AlreadySubscribed(id));
            }
            invocation.set_subscriber(Box::new(on_terminal));
            let delivery = invocation.take_delivery();
            if delivery.is_some() {
                state.retire(id);
            }
            delivery
        };
        if let Some((callback, outcome)) = delivery {
            callback(outcome);
        }
        Ok(())
    }

    /// Wait for the outcome of `id`.
    pub async fn wait(&self, id: InvocationId) -> Result<Outcome, DispatchError> {
        let (sender, receiver) = oneshot::channel();
        self.subscribe(id, move |outcome| {
            let _ = sender.send(outcome);
        })?;
        // The sender is dropped without sending only when the invocation is superseded.
        receiver.await.map_err(|_| DispatchError::Superseded(id))
    }

    pub fn snapshot(&self, id: InvocationId) -> Option<InvocationSnapshot> {
        let state = self.state.lock().expect("dispatcher state lock");
        state.invocations.get(&id).map(|invocation| invocation.snapshot())
    }

    /// Invocations that are neither terminal nor superseded.
    pub fn pending(&self) -> usize {
        let state = self.state.lock().expect("dispatcher state lock");
        state
            .invocations
            .values()
            .filter(|invocation| !invocation.is_superseded() && !invocation.state().is_terminal())
            .count()
    }
}

impl std::fmt::Debug for InvocationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationDispatcher")
            .field("methods", &self.registry.len())
            .field("pending", &self.pending())
            .finish()
    }
}

/// Complete an invocation that failed before reaching the transport.
fn fail_before_dispatch(invocation: &mut Invocation, failure: impl Into<Failure>) {
    if let Err(internal) = invocation.complete(Outcome::Failure(classify(failure))) {
        error!(invocation = ?invocation, invariant = %internal.invariant_violated, "invocation engine defect");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Record the transport result for `id` and deliver it if someone is listening.
fn finish(state: &Mutex<DispatcherState>, id: InvocationId, outcome: Outcome) {
    let delivery: Option<(TerminalCallback, Outcome)> = {
        let mut state = state.lock().expect("dispatcher state lock");
        let Some(invocation) = state.invocations.get_mut(&id) else {
            warn!(invocation = %id, "outcome for an invocation that no longer exists");
            return;
        };
        if invocation.is_superseded() {
            debug!(invocation = %id, succeeded = outcome.is_success(), "dropping outcome of superseded invocation");
            state.retire(id);
            return;
        }
        if let Err(internal) = invocation.complete(outcome) {
            error!(invocation = %id, invariant = %internal.invariant_violated, "invocation engine defect");
            return;
        }
        debug!(invocation = %id, state = ?invocation.state(), "invocation finished");
        let delivery = invocation.take_delivery();
        if delivery.is_some() {
            state.retire(id);
        }
        delivery
    };
    if let Some((callback, outcome)) = delivery {
        callback(outcome);
    }
}
