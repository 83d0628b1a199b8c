// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted model provider for deterministic testing.
//!
//! Every model name owns a queue of [`Step`]s. Each `send` or
//! `send_function_results` on a chat of that model pops one step. An empty
//! queue is an error, so a test that under-scripts fails loudly.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use matbuddy_core::error::MatbuddyError;
use matbuddy_core::types::{
    AdapterType, ChatRequest, FunctionCall, FunctionResult, HealthStatus, ModelResponse, Part,
};
use matbuddy_core::{ChatHandle, PluginAdapter, ProviderAdapter};

/// One scripted model reaction.
#[derive(Debug, Clone)]
pub enum Step {
    /// Reply with text only.
    Text(String),
    /// Request a single tool call.
    Call(String, Value),
    /// Reply with arbitrary parts.
    Parts(Vec<Part>),
    /// Fail the send with this upstream error text.
    Fail(String),
}

impl Step {
    fn into_response(self, model: &str) -> Result<ModelResponse, MatbuddyError> {
        let parts = match self {
            Step::Text(text) => vec![Part::Text(text)],
            Step::Call(name, args) => vec![Part::FunctionCall(FunctionCall { name, args })],
            Step::Parts(parts) => parts,
            Step::Fail(message) => return Err(MatbuddyError::provider(message)),
        };
        Ok(ModelResponse {
            parts,
            model: model.to_string(),
        })
    }
}

#[derive(Default)]
struct State {
    scripts: HashMap<String, VecDeque<Step>>,
    start_failures: HashMap<String, VecDeque<String>>,
    requests: Vec<ChatRequest>,
    sends: Vec<(String, Vec<Part>)>,
    results: Vec<Vec<FunctionResult>>,
}

/// A mock model provider. Clones share one script and one record.
#[derive(Clone, Default)]
pub struct MockProvider {
    state: Arc<Mutex<State>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends steps to the queue of `model`.
    pub fn script(&self, model: &str, steps: Vec<Step>) {
        self.state()
            .scripts
            .entry(model.to_string())
            .or_default()
            .extend(steps);
    }

    /// Makes the next `start_chat` for `model` fail with `message`.
    pub fn fail_start(&self, model: &str, message: &str) {
        self.state()
            .start_failures
            .entry(model.to_string())
            .or_default()
            .push_back(message.to_string());
    }

    /// A chat on `model` that bypasses `start_chat`.
    pub fn chat(&self, model: &str) -> Box<dyn ChatHandle> {
        Box::new(MockChat {
            model: model.to_string(),
            state: self.state.clone(),
        })
    }

    /// Every request passed to `start_chat`, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.state().requests.clone()
    }

    /// Models of every opened chat, in order.
    pub fn started_models(&self) -> Vec<String> {
        self.state().requests.iter().map(|r| r.model.clone()).collect()
    }

    /// Every user turn sent, with the model it went to.
    pub fn sends(&self) -> Vec<(String, Vec<Part>)> {
        self.state().sends.clone()
    }

    /// Every batch of function results returned to a model.
    pub fn function_results_sent(&self) -> Vec<Vec<FunctionResult>> {
        self.state().results.clone()
    }

    /// Steps still queued for `model`.
    pub fn remaining_steps(&self, model: &str) -> usize {
        self.state().scripts.get(model).map_or(0, VecDeque::len)
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, MatbuddyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MatbuddyError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn start_chat(&self, request: ChatRequest) -> Result<Box<dyn ChatHandle>, MatbuddyError> {
        let model = request.model.clone();
        let failure = {
            let mut state = self.state();
            state.requests.push(request);
            state
                .start_failures
                .get_mut(&model)
                .and_then(VecDeque::pop_front)
        };
        if let Some(message) = failure {
            return Err(MatbuddyError::provider(message));
        }
        Ok(self.chat(&model))
    }
}

struct MockChat {
    model: String,
    state: Arc<Mutex<State>>,
}

impl MockChat {
    fn next_step(&self) -> Result<ModelResponse, MatbuddyError> {
        let step = self
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .scripts
            .get_mut(&self.model)
            .and_then(VecDeque::pop_front);
        match step {
            Some(step) => step.into_response(&self.model),
            None => Err(MatbuddyError::provider(format!(
                "mock script exhausted for {}",
                self.model
            ))),
        }
    }
}

#[async_trait]
impl ChatHandle for MockChat {
    fn model(&self) -> &str {
        &self.model
    }

    async fn send(&mut self, parts: Vec<Part>) -> Result<ModelResponse, MatbuddyError> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .sends
            .push((self.model.clone(), parts));
        self.next_step()
    }

    async fn send_function_results(
        &mut self,
        results: Vec<FunctionResult>,
    ) -> Result<ModelResponse, MatbuddyError> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .results
            .push(results);
        self.next_step()
    }
}

/// A chat that answers every send with `"ok"`.
#[derive(Debug)]
pub struct StubChat {
    model: String,
}

impl StubChat {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    fn reply(&self) -> ModelResponse {
        ModelResponse {
            parts: vec![Part::Text("ok".into())],
            model: self.model.clone(),
        }
    }
}

#[async_trait]
impl ChatHandle for StubChat {
    fn model(&self) -> &str {
        &self.model
    }

    async fn send(&mut self, _parts: Vec<Part>) -> Result<ModelResponse, MatbuddyError> {
        Ok(self.reply())
    }

    async fn send_function_results(
        &mut self,
        _results: Vec<FunctionResult>,
    ) -> Result<ModelResponse, MatbuddyError> {
        Ok(self.reply())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(model: &str) -> ChatRequest {
        ChatRequest {
            model: model.into(),
            system_instruction: "sys".into(),
            tools: vec![],
            history: vec![],
        }
    }

    #[tokio::test]
    async fn steps_are_consumed_per_model() {
        let provider = MockProvider::new();
        provider.script("a", vec![Step::Text("from a".into())]);
        provider.script("b", vec![Step::Call("get_goals".into(), json!({}))]);

        let mut b = provider.start_chat(request("b")).await.unwrap();
        let mut a = provider.start_chat(request("a")).await.unwrap();

        let reply = a.send(vec![Part::Text("hi".into())]).await.unwrap();
        assert_eq!(reply.text(), "from a");
        assert_eq!(reply.model, "a");
        let reply = b.send(vec![Part::Text("hi".into())]).await.unwrap();
        assert_eq!(reply.function_calls()[0].name, "get_goals");

        assert_eq!(provider.started_models(), ["b", "a"]);
        assert_eq!(provider.sends().len(), 2);
    }

    #[tokio::test]
    async fn exhausted_script_is_an_error() {
        let provider = MockProvider::new();
        let mut chat = provider.chat("m");
        let err = chat.send(vec![]).await.unwrap_err();
        assert!(err.to_string().contains("mock script exhausted"));
    }

    #[tokio::test]
    async fn fail_step_surfaces_upstream_text() {
        let provider = MockProvider::new();
        provider.script("m", vec![Step::Fail("429 RESOURCE_EXHAUSTED".into())]);
        let mut chat = provider.chat("m");
        let err = chat.send(vec![]).await.unwrap_err();
        assert_eq!(err.to_string(), "provider error: 429 RESOURCE_EXHAUSTED");
    }

    #[tokio::test]
    async fn start_failure_is_one_shot() {
        let provider = MockProvider::new();
        provider.fail_start("m", "404 NOT_FOUND");
        assert!(provider.start_chat(request("m")).await.is_err());
        assert!(provider.start_chat(request("m")).await.is_ok());
        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn function_results_are_recorded() {
        let provider = MockProvider::new();
        provider.script("m", vec![Step::Text("done".into())]);
        let mut chat = provider.chat("m");
        chat.send_function_results(vec![FunctionResult {
            name: "get_goals".into(),
            result: "none".into(),
        }])
        .await
        .unwrap();
        assert_eq!(provider.function_results_sent()[0][0].name, "get_goals");
        assert_eq!(provider.remaining_steps("m"), 0);
    }
}
