use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anvil_console_engine::{DispatchError, InvocationDispatcher, Transport};
use anvil_console_registry::MethodRegistry;
use anvil_console_types::{
    ClassifiedError, InvocationState, Materialized, Outcome, RawValue, RpcError, RpcResult, SendError, SlotKey,
    TransportError, ValidationError,
};
use async_trait::async_trait;
use futures_util::FutureExt;
use indexmap::IndexMap;
use serde_json::{Value, json};
use tokio::sync::oneshot;

type Reply = Result<RpcResult, SendError>;

fn reply(value: Value) -> Reply {
    Ok(RpcResult::from_value(&value).expect("serialize reply"))
}

fn reply_text(text: &str) -> Reply {
    Ok(RpcResult::from_text(text).expect("valid reply text"))
}

/// Transport whose calls stay pending until the test releases them.
#[derive(Default)]
struct GatedTransport {
    gates: Mutex<HashMap<String, oneshot::Receiver<Reply>>>,
    calls: AtomicUsize,
}

impl GatedTransport {
    fn gate(&self, method_name: &str, args: Value) -> oneshot::Sender<Reply> {
        let (sender, receiver) = oneshot::channel();
        self.gates.lock().expect("gates lock").insert(gate_key(method_name, &args), receiver);
        sender
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn gate_key(method_name: &str, args: &Value) -> String {
    format!("{method_name}:{args}")
}

#[async_trait]
impl Transport for GatedTransport {
    async fn send(&self, method_name: &str, ordered_args: Vec<Value>) -> Reply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = gate_key(method_name, &Value::Array(ordered_args));
        let receiver = self.gates.lock().expect("gates lock").remove(&key);
        match receiver {
            Some(receiver) => receiver
                .await
                .unwrap_or_else(|_| Err(TransportError::Unreachable("gate dropped".into()).into())),
            None => Err(TransportError::InvalidResponse(format!("unexpected call {key}")).into()),
        }
    }
}

fn setup() -> (InvocationDispatcher, Arc<GatedTransport>) {
    let registry = Arc::new(MethodRegistry::from_embedded_catalog().expect("catalog"));
    let transport = Arc::new(GatedTransport::default());
    (InvocationDispatcher::new(registry, transport.clone()), transport)
}

fn raw(entries: &[(&str, RawValue)]) -> IndexMap<String, RawValue> {
    entries.iter().map(|(name, value)| (name.to_string(), value.clone())).collect()
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn block_by_hash_result_becomes_artifact() {
    let (dispatcher, transport) = setup();
    let body = r#"{"number": "0x1b4", "hash":"0xabc",
  "difficulty":340282366920938463463374607431768211456,"extraData":"caf\u00e9","transactions":[]}"#;
    let gate = transport.gate("eth_getBlockByHash", json!(["0xabc", true]));

    let id = dispatcher
        .submit("eth_getBlockByHash", raw(&[("hash", "0xabc".into()), ("full", true.into())]))
        .expect("submit");
    let snapshot = dispatcher.snapshot(id).expect("snapshot");
    assert_eq!(snapshot.state, InvocationState::Dispatched);
    assert_eq!(snapshot.arguments, Some(vec![json!("0xabc"), json!(true)]));
    assert_eq!(dispatcher.pending(), 1);

    gate.send(reply_text(body)).expect("release");
    let outcome = dispatcher.wait(id).await.expect("outcome");
    let artifact = outcome.artifact().expect("artifact");
    assert_eq!(artifact.suggested_filename, "eth_getBlockByHash.json");
    assert_eq!(artifact.mime_type, "application/json");
    assert_eq!(artifact.bytes, body.as_bytes());
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn checkbox_type_mismatch_never_reaches_transport() {
    let (dispatcher, transport) = setup();
    let id = dispatcher
        .submit("anvil_setAutomine", raw(&[("boolean", "yes".into())]))
        .expect("submit");

    let snapshot = dispatcher.snapshot(id).expect("snapshot");
    assert_eq!(snapshot.state, InvocationState::Failed);
    assert_eq!(snapshot.arguments, None);

    let outcome = dispatcher.wait(id).await.expect("outcome");
    let error = outcome.error().expect("failure");
    assert!(matches!(error, ClassifiedError::Validation(ValidationError::TypeMismatch { .. })));
    assert_eq!(error.field(), Some("boolean"));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn non_numeric_value_is_never_dispatched() {
    let (dispatcher, transport) = setup();
    let id = dispatcher.submit("anvil_mine", raw(&[("blocks", "abc".into())])).expect("submit");

    let snapshot = dispatcher.snapshot(id).expect("snapshot");
    assert_eq!(snapshot.transitions, vec![InvocationState::Building, InvocationState::Failed]);

    let outcome = dispatcher.wait(id).await.expect("outcome");
    assert_eq!(
        outcome,
        Outcome::Failure(ClassifiedError::Validation(ValidationError::NotANumber {
            name: "blocks".into(),
            raw: "abc".into(),
        }))
    );
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn rpc_error_fails_without_artifact() {
    let (dispatcher, transport) = setup();
    let gate = transport.gate("eth_sendRawTransaction", json!(["0xdeadbeef"]));
    let id = dispatcher
        .submit("eth_sendRawTransaction", raw(&[("data", "0xdeadbeef".into())]))
        .expect("submit");

    gate.send(Err(RpcError {
        code: -32003,
        message: "insufficient funds for gas * price + value".into(),
        data: None,
    }
    .into()))
        .expect("release");

    let outcome = dispatcher.wait(id).await.expect("outcome");
    assert!(outcome.artifact().is_none());
    match outcome.error() {
        Some(ClassifiedError::Rpc(rpc)) => {
            assert_eq!(rpc.code, -32003);
            assert_eq!(rpc.message, "insufficient funds for gas * price + value");
        }
        other => panic!("expected rpc failure, got {other:?}"),
    }
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn transport_failures_are_classified() {
    let (dispatcher, transport) = setup();
    let gate = transport.gate("anvil_getAutomine", json!([]));
    let id = dispatcher.submit("anvil_getAutomine", IndexMap::new()).expect("submit");
    gate.send(Err(TransportError::Timeout.into())).expect("release");

    let outcome = dispatcher.wait(id).await.expect("outcome");
    assert_eq!(outcome, Outcome::Failure(ClassifiedError::Transport(TransportError::Timeout)));
}

#[tokio::test]
async fn superseded_outcome_is_never_delivered() {
    let (dispatcher, transport) = setup();
    let first_gate = transport.gate("anvil_mine", json!([1]));
    let second_gate = transport.gate("anvil_mine", json!([2]));

    let first = dispatcher.submit("anvil_mine", raw(&[("blocks", "1".into())])).expect("first");
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);
    dispatcher
        .subscribe(first, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .expect("subscribe first");

    let second = dispatcher.submit("anvil_mine", raw(&[("blocks", "2".into())])).expect("second");
    assert!(dispatcher.snapshot(first).expect("first snapshot").superseded);
    assert_eq!(dispatcher.subscribe(first, |_| {}), Err(DispatchError::Superseded(first)));
    assert_eq!(dispatcher.pending(), 1);

    first_gate.send(reply(json!(null))).expect("release first");
    wait_until(|| dispatcher.snapshot(first).is_none()).await;
    assert_eq!(delivered.load(Ordering::SeqCst), 0);

    second_gate.send(reply(json!(null))).expect("release second");
    let outcome = dispatcher.wait(second).await.expect("second outcome");
    assert_eq!(outcome, Outcome::Success(Materialized::PassThrough(Value::Null)));
    assert_eq!(delivered.load(Ordering::SeqCst), 0);
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn waiting_on_a_superseded_invocation_reports_it() {
    let (dispatcher, transport) = setup();
    let _first_gate = transport.gate("anvil_mine", json!([1]));
    let _second_gate = transport.gate("anvil_mine", json!([2]));

    let first = dispatcher.submit("anvil_mine", raw(&[("blocks", "1".into())])).expect("first");
    let waiting = dispatcher.wait(first);
    tokio::pin!(waiting);
    assert!((&mut waiting).now_or_never().is_none());
    assert_eq!(dispatcher.subscribe(first, |_| {}), Err(DispatchError::AlreadySubscribed(first)));

    dispatcher.submit("anvil_mine", raw(&[("blocks", "2".into())])).expect("second");
    assert_eq!(waiting.await, Err(DispatchError::Superseded(first)));
}

#[tokio::test]
async fn outcome_is_delivered_exactly_once() {
    let (dispatcher, transport) = setup();
    let gate = transport.gate("anvil_getAutomine", json!([]));
    let id = dispatcher.submit("anvil_getAutomine", IndexMap::new()).expect("submit");

    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);
    dispatcher
        .subscribe(id, move |outcome| {
            assert!(outcome.is_success());
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .expect("subscribe");
    assert_eq!(dispatcher.subscribe(id, |_| {}), Err(DispatchError::AlreadySubscribed(id)));

    gate.send(reply(json!(true))).expect("release");
    wait_until(|| delivered.load(Ordering::SeqCst) == 1).await;
    assert_eq!(dispatcher.subscribe(id, |_| {}), Err(DispatchError::UnknownInvocation(id)));
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn different_slots_complete_independently() {
    let (dispatcher, transport) = setup();
    let balance_gate = transport.gate("anvil_setBalance", json!(["0x01", 1000]));
    let nonce_gate = transport.gate("anvil_setNonce", json!(["0x02", 7]));

    let balance = dispatcher
        .submit("anvil_setBalance", raw(&[("address", "0x01".into()), ("value", "1000".into())]))
        .expect("balance");
    let nonce = dispatcher
        .submit("anvil_setNonce", raw(&[("address", "0x02".into()), ("nonce", "0x7".into())]))
        .expect("nonce");
    assert_eq!(dispatcher.pending(), 2);

    nonce_gate.send(reply(json!(null))).expect("release nonce");
    assert!(dispatcher.wait(nonce).await.expect("nonce outcome").is_success());
    assert_eq!(dispatcher.snapshot(balance).expect("balance snapshot").state, InvocationState::Dispatched);

    balance_gate.send(reply(json!(null))).expect("release balance");
    assert!(dispatcher.wait(balance).await.expect("balance outcome").is_success());
    assert_eq!(dispatcher.pending(), 0);
}

#[tokio::test]
async fn same_method_in_separate_slots_runs_concurrently() {
    let (dispatcher, transport) = setup();
    let left_gate = transport.gate("anvil_mine", json!([3]));
    let right_gate = transport.gate("anvil_mine", json!([4]));

    let left = dispatcher
        .submit_in_slot(SlotKey::from("left"), "anvil_mine", raw(&[("blocks", "3".into())]))
        .expect("left");
    let right = dispatcher
        .submit_in_slot(SlotKey::from("right"), "anvil_mine", raw(&[("blocks", "4".into())]))
        .expect("right");
    assert!(!dispatcher.snapshot(left).expect("left snapshot").superseded);

    right_gate.send(reply(json!("right"))).expect("release right");
    left_gate.send(reply(json!("left"))).expect("release left");
    assert_eq!(
        dispatcher.wait(left).await.expect("left outcome"),
        Outcome::Success(Materialized::PassThrough(json!("left")))
    );
    assert_eq!(
        dispatcher.wait(right).await.expect("right outcome"),
        Outcome::Success(Materialized::PassThrough(json!("right")))
    );
}

#[tokio::test]
async fn unknown_method_is_rejected_before_any_invocation() {
    let (dispatcher, transport) = setup();
    let error = dispatcher.submit("eth_newFilter", IndexMap::new()).expect_err("unknown");
    assert_eq!(error, DispatchError::UnknownMethod("eth_newFilter".into()));
    assert_eq!(dispatcher.pending(), 0);
    assert_eq!(transport.calls(), 0);
}

struct PanickingTransport;

#[async_trait]
impl Transport for PanickingTransport {
    async fn send(&self, method_name: &str, _ordered_args: Vec<Value>) -> Reply {
        panic!("transport exploded on {method_name}");
    }
}

#[tokio::test]
async fn panicking_transport_still_reaches_a_terminal_state() {
    let registry = Arc::new(MethodRegistry::from_embedded_catalog().expect("catalog"));
    let dispatcher = InvocationDispatcher::new(registry, Arc::new(PanickingTransport));
    let id = dispatcher.submit("anvil_getAutomine", IndexMap::new()).expect("submit");

    let outcome = tokio::time::timeout(Duration::from_secs(2), dispatcher.wait(id))
        .await
        .expect("outcome arrives")
        .expect("not superseded");
    match outcome.error() {
        Some(ClassifiedError::Internal(internal)) => {
            assert!(internal.invariant_violated.contains("transport panicked"), "{internal:?}");
            assert!(internal.invariant_violated.contains("transport exploded on anvil_getAutomine"), "{internal:?}");
        }
        other => panic!("expected internal failure, got {other:?}"),
    }
    assert_eq!(dispatcher.pending(), 0);
}
