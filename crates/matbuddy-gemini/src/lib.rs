// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini provider adapter for matbuddy.
//!
//! [`GeminiProvider`] implements [`ProviderAdapter`]; each conversation is a
//! [`GeminiChat`] that owns its `contents` list and replays it on every call.

pub mod client;
pub mod types;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use matbuddy_config::model::GeminiConfig;
use matbuddy_core::error::MatbuddyError;
use matbuddy_core::traits::{ChatHandle, PluginAdapter, ProviderAdapter};
use matbuddy_core::types::{
    AdapterType, ChatRequest, FunctionCall, FunctionResult, HealthStatus, HistoryEntry,
    ModelResponse, ParamType, Part, Role, ToolDescriptor,
};
use serde_json::json;
use tracing::{debug, info};

use crate::client::GeminiClient;
use crate::types::{
    ApiFunctionCall, ApiFunctionResponse, ApiPart, Blob, Content, FunctionDeclaration,
    GenerateContentRequest, GenerateContentResponse, Schema, Tool,
};

/// Gemini provider implementing [`ProviderAdapter`].
///
/// API key resolution order: config -> `GEMINI_API_KEY` env var -> error.
pub struct GeminiProvider {
    client: GeminiClient,
}

impl GeminiProvider {
    pub fn new(config: &GeminiConfig) -> Result<Self, MatbuddyError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = GeminiClient::new(
            &api_key,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(models = ?config.models, "Gemini provider initialized");
        Ok(Self { client })
    }
}

#[async_trait]
impl PluginAdapter for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, MatbuddyError> {
        // Probing would spend quota.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MatbuddyError> {
        debug!("Gemini provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for GeminiProvider {
    async fn start_chat(&self, request: ChatRequest) -> Result<Box<dyn ChatHandle>, MatbuddyError> {
        Ok(Box::new(GeminiChat {
            client: self.client.clone(),
            model: request.model,
            system_instruction: Content {
                role: None,
                parts: vec![ApiPart::text(request.system_instruction)],
            },
            tools: to_tools(&request.tools),
            contents: request.history.iter().map(history_to_content).collect(),
        }))
    }
}

/// One conversation with one Gemini model.
pub struct GeminiChat {
    client: GeminiClient,
    model: String,
    system_instruction: Content,
    tools: Vec<Tool>,
    contents: Vec<Content>,
}

impl GeminiChat {
    /// Sends `turn` after the accumulated contents. Both the turn and the
    /// model's reply are committed only when the call succeeds.
    async fn exchange(&mut self, turn: Content) -> Result<ModelResponse, MatbuddyError> {
        let mut contents = self.contents.clone();
        contents.push(turn);
        let request = GenerateContentRequest {
            contents,
            system_instruction: Some(self.system_instruction.clone()),
            tools: self.tools.clone(),
        };

        let response = self.client.generate_content(&self.model, &request).await?;
        let reply = first_candidate(response.clone());

        let mut contents = request.contents;
        if let Some(content) = &reply {
            contents.push(Content::model(content.parts.clone()));
        }
        self.contents = contents;

        Ok(to_model_response(&self.model, reply, &response))
    }
}

#[async_trait]
impl ChatHandle for GeminiChat {
    fn model(&self) -> &str {
        &self.model
    }

    async fn send(&mut self, parts: Vec<Part>) -> Result<ModelResponse, MatbuddyError> {
        let turn = Content::user(parts.into_iter().map(to_api_part).collect());
        self.exchange(turn).await
    }

    async fn send_function_results(
        &mut self,
        results: Vec<FunctionResult>,
    ) -> Result<ModelResponse, MatbuddyError> {
        let turn = Content::user(
            results
                .into_iter()
                .map(|r| to_api_part(Part::FunctionResult(r)))
                .collect(),
        );
        self.exchange(turn).await
    }
}

/// Resolves the API key from config or environment.
fn resolve_api_key(config_key: &Option<String>) -> Result<String, MatbuddyError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("GEMINI_API_KEY").map_err(|_| {
        MatbuddyError::Config(
            "Gemini API key not found. Set gemini.api_key in config or GEMINI_API_KEY environment variable.".into(),
        )
    })
}

fn history_to_content(entry: &HistoryEntry) -> Content {
    let parts = vec![ApiPart::text(entry.text.clone())];
    match entry.role {
        Role::User => Content::user(parts),
        Role::Model => Content::model(parts),
    }
}

fn to_api_part(part: Part) -> ApiPart {
    match part {
        Part::Text(text) => ApiPart::text(text),
        Part::InlineData { mime_type, data } => ApiPart {
            inline_data: Some(Blob {
                mime_type,
                data: base64::engine::general_purpose::STANDARD.encode(data),
            }),
            ..Default::default()
        },
        Part::FunctionCall(call) => ApiPart {
            function_call: Some(ApiFunctionCall {
                name: call.name,
                args: call.args,
            }),
            ..Default::default()
        },
        Part::FunctionResult(result) => ApiPart {
            function_response: Some(ApiFunctionResponse {
                name: result.name,
                response: json!({ "result": result.result }),
            }),
            ..Default::default()
        },
    }
}

fn to_tools(descriptors: &[ToolDescriptor]) -> Vec<Tool> {
    if descriptors.is_empty() {
        return Vec::new();
    }
    let function_declarations = descriptors
        .iter()
        .map(|d| FunctionDeclaration {
            name: d.name.clone(),
            description: d.description.clone(),
            parameters: (!d.params.is_empty()).then(|| Schema {
                schema_type: "OBJECT".into(),
                description: None,
                properties: d
                    .params
                    .iter()
                    .map(|p| {
                        let schema_type = match p.param_type {
                            ParamType::String => "STRING",
                            ParamType::Integer => "INTEGER",
                        };
                        (
                            p.name.clone(),
                            Schema {
                                schema_type: schema_type.into(),
                                description: Some(p.description.clone()),
                                properties: BTreeMap::new(),
                                required: vec![],
                            },
                        )
                    })
                    .collect(),
                required: d
                    .params
                    .iter()
                    .filter(|p| p.required)
                    .map(|p| p.name.clone())
                    .collect(),
            }),
        })
        .collect();
    vec![Tool {
        function_declarations,
    }]
}

fn first_candidate(response: GenerateContentResponse) -> Option<Content> {
    let candidate = response.candidates.into_iter().next()?;
    if let Some(reason) = &candidate.finish_reason
        && reason != "STOP"
    {
        debug!(finish_reason = %reason, "candidate finished early");
    }
    candidate.content
}

fn to_model_response(
    model: &str,
    reply: Option<Content>,
    response: &GenerateContentResponse,
) -> ModelResponse {
    if reply.is_none() {
        debug!(feedback = ?response.prompt_feedback, "response carried no candidate content");
    }
    let parts = reply
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|p| p.thought != Some(true))
                .filter_map(|p| {
                    if let Some(call) = p.function_call {
                        Some(Part::FunctionCall(FunctionCall {
                            name: call.name,
                            args: call.args,
                        }))
                    } else {
                        p.text.map(Part::Text)
                    }
                })
                .collect()
        })
        .unwrap_or_default();
    ModelResponse {
        parts,
        model: response
            .model_version
            .clone()
            .unwrap_or_else(|| model.to_string()),
    }
}
