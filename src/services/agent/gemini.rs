/// Gemini `generateContent` backend
///
/// Tools are offered as function declarations with calling mode `ANY`, so
/// every turn the model answers with one or more function calls.
use reqwest::{Client as HttpClient, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    services::agent::{LanguageModel, ModelReply, ToolCall, ToolSpec, Turn},
};

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionDeclaration<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool<'a> {
    function_declarations: Vec<FunctionDeclaration<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionCallingConfig {
    mode: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolConfig {
    function_calling_config: FunctionCallingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content>,
    tools: Vec<Tool<'a>>,
    tool_config: ToolConfig,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

fn text_content(role: &str, text: &str) -> Content {
    Content {
        role: Some(role.to_string()),
        parts: vec![Part {
            text: Some(text.to_string()),
            ..Default::default()
        }],
    }
}

fn to_contents(conversation: &[Turn]) -> Vec<Content> {
    conversation
        .iter()
        .map(|turn| match turn {
            Turn::User(text) => text_content("user", text),
            Turn::ModelText(text) => text_content("model", text),
            Turn::ModelCalls(calls) => Content {
                role: Some("model".to_string()),
                parts: calls
                    .iter()
                    .map(|call| Part {
                        function_call: Some(FunctionCall {
                            name: call.name.clone(),
                            args: call.args.clone(),
                        }),
                        thought_signature: call.signature.clone(),
                        ..Default::default()
                    })
                    .collect(),
            },
            // Function results travel back in a user-role turn
            Turn::ToolResults(results) => Content {
                role: Some("user".to_string()),
                parts: results
                    .iter()
                    .map(|result| Part {
                        function_response: Some(FunctionResponse {
                            name: result.name.clone(),
                            response: result.response.clone(),
                        }),
                        ..Default::default()
                    })
                    .collect(),
            },
        })
        .collect()
}

fn build_request<'a>(conversation: &[Turn], tools: &'a [ToolSpec]) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: to_contents(conversation),
        tools: vec![Tool {
            function_declarations: tools
                .iter()
                .map(|tool| FunctionDeclaration {
                    name: tool.name,
                    description: tool.description,
                    parameters: &tool.parameters,
                })
                .collect(),
        }],
        tool_config: ToolConfig {
            function_calling_config: FunctionCallingConfig { mode: "ANY" },
        },
    }
}

/// Reduces the first candidate to function calls, or to its visible text
fn parse_reply(response: GenerateContentResponse) -> AppResult<ModelReply> {
    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default();

    let calls: Vec<ToolCall> = parts
        .iter()
        .filter_map(|part| {
            part.function_call.as_ref().map(|call| ToolCall {
                name: call.name.clone(),
                args: call.args.clone(),
                signature: part.thought_signature.clone(),
            })
        })
        .collect();

    if !calls.is_empty() {
        return Ok(ModelReply::ToolCalls(calls));
    }

    let text: String = parts
        .into_iter()
        .filter(|part| part.thought != Some(true))
        .filter_map(|part| part.text)
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(AppError::Generation(
            "Gemini returned an empty response".to_string(),
        ));
    }

    Ok(ModelReply::Text(text))
}

#[derive(Clone)]
pub struct GeminiClient {
    http_client: HttpClient,
    api_key: String,
    model: String,
    api_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            model,
            api_url,
        }
    }

    fn endpoint(&self) -> AppResult<Url> {
        let method = format!("{}:generateContent", self.model);
        let mut url = Url::parse(&self.api_url)
            .map_err(|e| AppError::Internal(format!("Invalid Gemini API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("Gemini API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["v1beta", "models", method.as_str()]);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl LanguageModel for GeminiClient {
    async fn complete(&self, conversation: &[Turn], tools: &[ToolSpec]) -> AppResult<ModelReply> {
        let request = build_request(conversation, tools);

        let response = self
            .http_client
            .post(self.endpoint()?)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, model = %self.model, "Gemini request failed");
            return Err(AppError::ExternalApi(format!(
                "Gemini returned status {}",
                status
            )));
        }

        let payload: GenerateContentResponse = response.json().await?;
        let reply = parse_reply(payload)?;

        tracing::debug!(
            model = %self.model,
            turns = conversation.len(),
            tool_calls = match &reply {
                ModelReply::ToolCalls(calls) => calls.len(),
                ModelReply::Text(_) => 0,
            },
            "Gemini turn completed"
        );

        Ok(reply)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
