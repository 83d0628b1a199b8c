// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for hosted language models.

use async_trait::async_trait;

use crate::error::MatbuddyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatRequest, FunctionResult, ModelResponse, Part};

/// Adapter for a hosted model API.
///
/// A provider opens conversations; each conversation is a [`ChatHandle`] bound
/// to one model that accumulates its own context across sends.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Opens a conversation seeded with the request's history.
    async fn start_chat(&self, request: ChatRequest) -> Result<Box<dyn ChatHandle>, MatbuddyError>;
}

/// A live multi-round conversation with one model.
///
/// Sends are transactional: a failed send leaves the handle's context as it
/// was before the call.
#[async_trait]
pub trait ChatHandle: Send + Sync {
    /// Model this conversation is bound to.
    fn model(&self) -> &str;

    /// Sends user input and returns the model's reply.
    async fn send(&mut self, parts: Vec<Part>) -> Result<ModelResponse, MatbuddyError>;

    /// Returns executed tool results to the model in one message.
    async fn send_function_results(
        &mut self,
        results: Vec<FunctionResult>,
    ) -> Result<ModelResponse, MatbuddyError>;
}
