//! # Call Requests
//!
//! Provider-neutral request descriptor and its one-shot completion.
//!
//! Every inbound call becomes a [`CallRequest`] paired with a [`PendingCall`]
//! the caller awaits. The request owns a [`Completion`] that can fire exactly
//! once: `resolve`/`reject` consume it, and a completion dropped without
//! firing fails the call instead of leaving the caller waiting forever.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{AuthError, FailureKind, Result};
use crate::types::CallId;

/// Named call parameters (string → primitive/array/object).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallParams(Map<String, Value>);

impl CallParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Raw value of a parameter. Explicit `null` reads as absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|value| !value.is_null())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get_string(&self, name: &str) -> Result<Option<String>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(_) => Err(invalid(name, "a string")),
        }
    }

    /// A string parameter that must be present.
    pub fn require_string(&self, name: &str) -> Result<String> {
        self.get_string(name)?
            .ok_or_else(|| AuthError::MissingParameter(name.to_string()))
    }

    pub fn get_bool(&self, name: &str, default: bool) -> Result<bool> {
        match self.get(name) {
            None => Ok(default),
            Some(Value::Bool(value)) => Ok(*value),
            Some(_) => Err(invalid(name, "a boolean")),
        }
    }

    pub fn get_port(&self, name: &str, default: u16) -> Result<u16> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value
                .as_u64()
                .or_else(|| whole_number(value))
                .and_then(|port| u16::try_from(port).ok())
                .filter(|port| *port != 0)
                .ok_or_else(|| invalid(name, "a port number between 1 and 65535")),
        }
    }

    pub fn get_string_list(&self, name: &str) -> Result<Vec<String>> {
        match self.get(name) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| invalid(name, "an array of strings"))
                })
                .collect(),
            Some(_) => Err(invalid(name, "an array of strings")),
        }
    }

    /// Key/value pairs given either as `[{ "key": .., "value": .. }]` or as a
    /// plain object of strings.
    pub fn get_string_map(&self, name: &str) -> Result<BTreeMap<String, String>> {
        const EXPECTED: &str = "a list of key/value string pairs";

        match self.get(name) {
            None => Ok(BTreeMap::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    let key = item.get("key").and_then(Value::as_str);
                    let value = item.get("value").and_then(Value::as_str);
                    match (key, value) {
                        (Some(key), Some(value)) => Ok((key.to_string(), value.to_string())),
                        _ => Err(invalid(name, EXPECTED)),
                    }
                })
                .collect(),
            Some(Value::Object(entries)) => entries
                .iter()
                .map(|(key, value)| {
                    value
                        .as_str()
                        .map(|value| (key.clone(), value.to_string()))
                        .ok_or_else(|| invalid(name, EXPECTED))
                })
                .collect(),
            Some(_) => Err(invalid(name, EXPECTED)),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Hosts that marshal numbers through JavaScript may send `9099.0`.
fn whole_number(value: &Value) -> Option<u64> {
    value
        .as_f64()
        .filter(|number| number.fract() == 0.0 && *number >= 0.0 && *number <= u64::MAX as f64)
        .map(|number| number as u64)
}

fn invalid(name: &str, expected: &'static str) -> AuthError {
    AuthError::InvalidParameter {
        name: name.to_string(),
        expected,
    }
}

impl From<Map<String, Value>> for CallParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Anything but a JSON object yields an empty parameter set.
impl From<Value> for CallParams {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            Value::Null => Self::default(),
            other => {
                debug!(kind = ?other, "Ignoring non-object call parameters");
                Self::default()
            }
        }
    }
}

/// Failed outcome of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFailure {
    pub kind: FailureKind,
    /// Human-readable message; the only part that crosses the host boundary
    pub message: String,
}

impl CallFailure {
    pub fn is_cancelled(&self) -> bool {
        self.kind == FailureKind::Cancelled
    }
}

impl From<&AuthError> for CallFailure {
    fn from(error: &AuthError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for CallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of a call: a method-specific payload or a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult {
    Success(Option<Value>),
    Failure(CallFailure),
}

impl CallResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CallResult::Success(_))
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            CallResult::Success(payload) => payload.as_ref(),
            CallResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&CallFailure> {
        match self {
            CallResult::Success(_) => None,
            CallResult::Failure(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> std::result::Result<Option<Value>, CallFailure> {
        match self {
            CallResult::Success(payload) => Ok(payload),
            CallResult::Failure(failure) => Err(failure),
        }
    }
}

/// Completion sink of a call. Fires exactly once.
pub struct Completion {
    id: CallId,
    method: String,
    sender: Option<oneshot::Sender<CallResult>>,
}

impl Completion {
    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn resolve(mut self, payload: Option<Value>) {
        self.fire(CallResult::Success(payload));
    }

    pub fn reject(mut self, error: AuthError) {
        debug!(call_id = %self.id, method = %self.method, kind = ?error.kind(), "Call rejected");
        self.fire(CallResult::Failure(CallFailure::from(&error)));
    }

    pub fn complete(self, outcome: Result<Option<Value>>) {
        match outcome {
            Ok(payload) => self.resolve(payload),
            Err(error) => self.reject(error),
        }
    }

    fn fire(&mut self, result: CallResult) {
        let Some(sender) = self.sender.take() else {
            return;
        };
        if sender.send(result).is_err() {
            debug!(call_id = %self.id, method = %self.method, "Caller went away before the result");
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.sender.is_some() {
            warn!(call_id = %self.id, method = %self.method, "Completion dropped without a result");
            let error = AuthError::Internal(format!("{} finished without a result.", self.method));
            self.fire(CallResult::Failure(CallFailure::from(&error)));
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("fired", &self.sender.is_none())
            .finish()
    }
}

/// An inbound call: method name, parameters and completion sink.
#[derive(Debug)]
pub struct CallRequest {
    pub method: String,
    pub params: CallParams,
    pub completion: Completion,
}

impl CallRequest {
    /// Create a request and the handle its caller awaits.
    pub fn new(method: impl Into<String>, params: impl Into<CallParams>) -> (Self, PendingCall) {
        let (sender, receiver) = oneshot::channel();
        let method = method.into();
        let id = CallId::new();
        let request = Self {
            method: method.clone(),
            params: params.into(),
            completion: Completion {
                id,
                method,
                sender: Some(sender),
            },
        };
        (request, PendingCall { id, receiver })
    }

    pub fn id(&self) -> CallId {
        self.completion.id
    }
}

/// Caller side of a call; resolves to its [`CallResult`].
#[derive(Debug)]
pub struct PendingCall {
    id: CallId,
    receiver: oneshot::Receiver<CallResult>,
}

impl PendingCall {
    pub fn id(&self) -> CallId {
        self.id
    }

    /// The result, if the call has already completed.
    pub fn try_result(&mut self) -> Option<CallResult> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(lost_completion()),
        }
    }
}

impl Future for PendingCall {
    type Output = CallResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| lost_completion()))
    }
}

// Completion's Drop always sends, so this only covers a panic mid-send.
fn lost_completion() -> CallResult {
    CallResult::Failure(CallFailure::from(&AuthError::Internal(
        "call completion was lost.".to_string(),
    )))
}
