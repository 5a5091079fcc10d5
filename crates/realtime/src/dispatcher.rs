//! Tool Dispatcher
//!
//! Turns completed tool calls from the provider into backend invocations.
//! Every accepted call produces exactly one `ToolResult` carrying the same
//! `call_id`: backend failures, malformed arguments and panicking backends
//! all come back as an `{error}` payload. Calls run on a `JoinSet` so the
//! session keeps draining provider events while they are in flight.

use crate::error::ToolExecutionError;
use async_trait::async_trait;
use futures::FutureExt;
use receptionist_core::ReceptionistService;
use serde::Deserialize;
use serde_json::{Value, json};
use std::{collections::HashSet, panic::AssertUnwindSafe, sync::Arc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub call_id: String,
    pub name: String,
    pub arguments_json: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub call_id: String,
    pub name: String,
    pub payload: Value,
}

impl ToolResult {
    pub fn is_error(&self) -> bool {
        self.payload.get("error").is_some()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolBackend: Send + Sync {
    async fn execute(
        &self,
        persona: &str,
        name: &str,
        args: Value,
    ) -> Result<Value, ToolExecutionError>;
}

/// Calls the backend's tool execution endpoint.
pub struct HttpToolBackend {
    client: reqwest::Client,
    backend_url: String,
}

impl HttpToolBackend {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            backend_url: backend_url.into(),
        }
    }
}

#[derive(Deserialize)]
struct FunctionResponse {
    #[serde(default)]
    result: Value,
}

#[async_trait]
impl ToolBackend for HttpToolBackend {
    async fn execute(
        &self,
        persona: &str,
        name: &str,
        args: Value,
    ) -> Result<Value, ToolExecutionError> {
        let url = format!("{}/realtime/function", self.backend_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .json(&json!({
                "persona": persona,
                "functionName": name,
                "functionArgs": args,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ToolExecutionError::Rejected(response.status().as_u16()));
        }
        let body: FunctionResponse = response.json().await?;
        Ok(body.result)
    }
}

/// Runs tools in-process against a `ReceptionistService`.
pub struct LocalToolBackend {
    service: Arc<ReceptionistService>,
}

impl LocalToolBackend {
    pub fn new(service: Arc<ReceptionistService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolBackend for LocalToolBackend {
    async fn execute(
        &self,
        persona: &str,
        name: &str,
        args: Value,
    ) -> Result<Value, ToolExecutionError> {
        Ok(self.service.execute_or_error(Some(persona), name, args).await)
    }
}

pub struct ToolDispatcher {
    backend: Arc<dyn ToolBackend>,
    persona: String,
    dispatched: HashSet<String>,
    in_flight: JoinSet<ToolResult>,
}

impl ToolDispatcher {
    pub fn new(backend: Arc<dyn ToolBackend>, persona: impl Into<String>) -> Self {
        Self {
            backend,
            persona: persona.into(),
            dispatched: HashSet::new(),
            in_flight: JoinSet::new(),
        }
    }

    /// Starts a tool call. Returns `false` for a `call_id` already seen.
    pub fn dispatch(&mut self, invocation: ToolInvocation) -> bool {
        if !self.dispatched.insert(invocation.call_id.clone()) {
            debug!(call_id = %invocation.call_id, "Ignoring duplicate tool call");
            return false;
        }

        info!(call_id = %invocation.call_id, tool = %invocation.name, "Dispatching tool call");
        let backend = Arc::clone(&self.backend);
        let persona = self.persona.clone();
        self.in_flight.spawn(async move {
            let ToolInvocation {
                call_id,
                name,
                arguments_json,
            } = invocation;
            let payload = run_tool(backend.as_ref(), &persona, &name, &arguments_json).await;
            ToolResult {
                call_id,
                name,
                payload,
            }
        });
        true
    }

    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Waits for the next finished call. `None` when nothing is in flight.
    pub async fn next_result(&mut self) -> Option<ToolResult> {
        loop {
            match self.in_flight.join_next().await? {
                Ok(result) => return Some(result),
                // Only aborted tasks end here; panics are caught inside the task.
                Err(e) => warn!(error = %e, "Tool task did not complete"),
            }
        }
    }

    /// Abandons in-flight calls. Used on teardown.
    pub fn abort_all(&mut self) {
        self.in_flight.abort_all();
    }
}

async fn run_tool(
    backend: &dyn ToolBackend,
    persona: &str,
    name: &str,
    arguments_json: &str,
) -> Value {
    let args: Value = if arguments_json.trim().is_empty() {
        json!({})
    } else {
        match serde_json::from_str(arguments_json) {
            Ok(args) => args,
            Err(e) => {
                let err = ToolExecutionError::InvalidArguments(e.to_string());
                warn!(tool = name, error = %err, "Rejecting tool call");
                return json!({ "error": err.to_string() });
            }
        }
    };

    match AssertUnwindSafe(backend.execute(persona, name, args))
        .catch_unwind()
        .await
    {
        Ok(Ok(payload)) => payload,
        Ok(Err(e)) => {
            warn!(tool = name, error = %e, "Tool execution failed");
            json!({ "error": e.to_string() })
        }
        Err(_) => {
            warn!(tool = name, "Tool execution panicked");
            json!({ "error": "Tool execution failed" })
        }
    }
}
