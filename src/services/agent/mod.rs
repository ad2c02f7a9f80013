//! The recommendation generator: a tool-calling loop around a language model.

pub mod gemini;
pub mod prompt;

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{AlbumRating, RecommendationDraft, UserGoals},
    services::catalog::{clamp_limit, CatalogProvider, DEFAULT_SEARCH_LIMIT},
};

pub use gemini::GeminiClient;

pub const SEARCH_TOOL: &str = "search_spotify_albums";
pub const SUBMIT_TOOL: &str = "submit_recommendation";

/// A function call requested by the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub args: Value,
    /// Opaque provider token that must be echoed back with the call
    pub signature: Option<String>,
}

/// Our answer to one tool call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResponse {
    pub name: String,
    pub response: Value,
}

/// One entry of the conversation sent to the model
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    User(String),
    ModelText(String),
    ModelCalls(Vec<ToolCall>),
    ToolResults(Vec<ToolResponse>),
}

/// What the model produced for one turn
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    ToolCalls(Vec<ToolCall>),
    Text(String),
}

/// A function the model may call
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON schema of the arguments
    pub parameters: Value,
}

/// Text-generation backend
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, conversation: &[Turn], tools: &[ToolSpec]) -> AppResult<ModelReply>;

    /// Model name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Everything the generator knows about the user for one pick
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub ratings: &'a [AlbumRating],
    pub goals: Option<&'a UserGoals>,
    pub extra_instructions: &'a [String],
}

pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: SEARCH_TOOL,
            description: "Search the Spotify catalog for albums. Returns up to `limit` albums with their Spotify ids.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Album and/or artist keywords" },
                    "limit": { "type": "integer", "description": "Results to return, 1-20" }
                },
                "required": ["query"]
            }),
        },
        ToolSpec {
            name: SUBMIT_TOOL,
            description: "Submit the final album recommendation.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "recommendedAlbumName": { "type": "string" },
                    "recommendedArtistName": { "type": "string" },
                    "spotifyAlbumId": { "type": "string" },
                    "tagline": { "type": "string", "description": "At most 120 characters" },
                    "albumDescription": { "type": "string", "description": "2-3 sentences" },
                    "whyForUser": { "type": "string", "description": "Exactly 1 sentence" }
                },
                "required": [
                    "recommendedAlbumName",
                    "recommendedArtistName",
                    "tagline",
                    "albumDescription",
                    "whyForUser"
                ]
            }),
        },
    ]
}

/// Accepts a draft written as plain JSON text, optionally inside a code fence
fn parse_text_draft(text: &str) -> Option<RecommendationDraft> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim()).ok()
}

/// Drives the model until it submits a well-formed draft
#[derive(Clone)]
pub struct BoomieAgent {
    model: Arc<dyn LanguageModel>,
    catalog: Arc<dyn CatalogProvider>,
    max_iterations: usize,
}

impl BoomieAgent {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        catalog: Arc<dyn CatalogProvider>,
        max_iterations: usize,
    ) -> Self {
        Self {
            model,
            catalog,
            max_iterations: max_iterations.max(1),
        }
    }

    async fn run_search(&self, args: &Value) -> Value {
        let Some(query) = args.get("query").and_then(Value::as_str) else {
            return json!({ "error": "query is required" });
        };
        let limit = args
            .get("limit")
            .and_then(Value::as_u64)
            .map(|l| clamp_limit(l.min(u8::MAX as u64) as u8))
            .unwrap_or(DEFAULT_SEARCH_LIMIT);

        match self.catalog.search_albums(query, limit).await {
            Ok(albums) => json!({ "albums": albums }),
            Err(e) => {
                tracing::warn!(error = %e, query, "Search tool failed");
                json!({ "error": e.to_string() })
            }
        }
    }

    /// Produces one candidate recommendation.
    ///
    /// Search calls are answered from the catalog and fed back; a submitted
    /// draft that fails validation is answered with the validation error so
    /// the model can correct it within the same conversation.
    #[instrument(
        skip(self, context),
        fields(
            model = self.model.name(),
            history_count = context.ratings.len(),
            extra_instructions = context.extra_instructions.len(),
        )
    )]
    pub async fn draft(&self, context: GenerationContext<'_>) -> AppResult<RecommendationDraft> {
        let tools = tool_specs();
        let mut conversation = vec![Turn::User(prompt::build_prompt(
            context.ratings,
            context.goals,
            context.extra_instructions,
        ))];

        for iteration in 1..=self.max_iterations {
            match self.model.complete(&conversation, &tools).await? {
                ModelReply::ToolCalls(calls) => {
                    conversation.push(Turn::ModelCalls(calls.clone()));
                    let mut responses = Vec::with_capacity(calls.len());

                    for call in calls {
                        let response = match call.name.as_str() {
                            SEARCH_TOOL => {
                                tracing::info!(iteration, "Model searched the catalog");
                                self.run_search(&call.args).await
                            }
                            SUBMIT_TOOL => {
                                match serde_json::from_value::<RecommendationDraft>(call.args) {
                                    Ok(draft) => match draft.validate() {
                                        Ok(()) => {
                                            tracing::info!(
                                                iteration,
                                                album = %draft.recommended_album_name,
                                                artist = %draft.recommended_artist_name,
                                                "Model submitted a draft"
                                            );
                                            return Ok(draft);
                                        }
                                        Err(problem) => json!({ "error": problem }),
                                    },
                                    Err(e) => json!({ "error": format!("invalid arguments: {}", e) }),
                                }
                            }
                            other => json!({ "error": format!("unknown tool: {}", other) }),
                        };

                        responses.push(ToolResponse {
                            name: call.name.clone(),
                            response,
                        });
                    }

                    conversation.push(Turn::ToolResults(responses));
                }
                ModelReply::Text(text) => {
                    if let Some(draft) = parse_text_draft(&text) {
                        if draft.validate().is_ok() {
                            tracing::info!(iteration, "Model answered with a text draft");
                            return Ok(draft);
                        }
                    }

                    conversation.push(Turn::ModelText(text));
                    conversation.push(Turn::User(prompt::SUBMIT_NUDGE.to_string()));
                }
            }
        }

        Err(AppError::Generation(format!(
            "no recommendation submitted after {} model turns",
            self.max_iterations
        )))
    }
}
