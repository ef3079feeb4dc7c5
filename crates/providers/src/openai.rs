//! OpenAI-backed adapters: GPT Image generation, GPT-4o vision tagging,
//! and text-embedding-ada-002 embeddings.
//!
//! All three wrap the OpenAI REST API with [`reqwest`]. Call timeouts are
//! enforced by the pipeline, not here.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;

use crate::error::ProviderError;
use crate::traits::{EmbeddingProvider, GenerationProvider, VisionProvider};
use crate::types::{AsyncHandle, GeneratedImage, GenerationOutput, PollStatus, VisionAnalysis};

/// Default OpenAI API base URL. Overridable for tests and proxies.
const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

/// Image model used for generation.
const IMAGE_MODEL: &str = "gpt-image-1";

/// Vision-capable chat model used for tagging.
const VISION_MODEL: &str = "gpt-4o";

/// Embedding model; its 1536 dimensions match the `vector(1536)` column.
const EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Flat per-image generation cost in USD (square master).
const GENERATION_COST_USD: f64 = 0.04;

/// Rough per-image tagging cost in USD (vision + tag completion).
const TAGGING_COST_USD: f64 = 0.012;

/// Upper bound on tags persisted per image.
const MAX_TAGS_PER_IMAGE: usize = 12;

/// Shared HTTP plumbing for the three adapters.
#[derive(Clone)]
struct OpenAiClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl OpenAiClient {
    fn new(api_key: String, api_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key,
        }
    }

    /// POST a JSON body and deserialize a JSON response, classifying
    /// non-2xx statuses.
    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ProviderError> {
        let response = self
            .client
            .post(format!("{}{path}", self.api_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), path, "Provider API returned an error");
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }

        response.json::<T>().await.map_err(|e| {
            ProviderError::terminal(format!("Malformed provider response: {e}"))
        })
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// GPT Image generation adapter. Synchronous: the API returns base64 image
/// data in the response body.
pub struct OpenAiGeneration {
    client: OpenAiClient,
}

#[derive(Deserialize)]
struct ImagesResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

impl OpenAiGeneration {
    pub fn new(api_key: String, api_url: Option<String>) -> Self {
        Self {
            client: OpenAiClient::new(api_key, api_url),
        }
    }
}

#[async_trait]
impl GenerationProvider for OpenAiGeneration {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
    ) -> Result<GenerationOutput, ProviderError> {
        let body = serde_json::json!({
            "model": IMAGE_MODEL,
            "prompt": prompt,
            "size": format!("{width}x{height}"),
        });

        let response: ImagesResponse = self.client.post_json("/images/generations", &body).await?;

        let b64 = response
            .data
            .first()
            .and_then(|d| d.b64_json.as_deref())
            .ok_or_else(|| {
                ProviderError::terminal(format!(
                    "Unexpected response format from {IMAGE_MODEL}: missing b64_json"
                ))
            })?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .map_err(|e| ProviderError::terminal(format!("Invalid base64 image data: {e}")))?;

        Ok(GenerationOutput::Image(GeneratedImage {
            bytes,
            cost: GENERATION_COST_USD,
            model: IMAGE_MODEL.to_string(),
        }))
    }

    async fn poll(&self, _handle: &AsyncHandle) -> Result<PollStatus, ProviderError> {
        Err(ProviderError::terminal(
            "openai generation is synchronous; there is nothing to poll",
        ))
    }
}

// ---------------------------------------------------------------------------
// Vision tagging
// ---------------------------------------------------------------------------

/// GPT-4o vision tagging adapter.
///
/// Two calls, mirroring the tagging flow: first a vision analysis of the
/// image, then a tag-generation completion seeded with that analysis and
/// the original prompt.
pub struct OpenAiVision {
    client: OpenAiClient,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiVision {
    pub fn new(api_key: String, api_url: Option<String>) -> Self {
        Self {
            client: OpenAiClient::new(api_key, api_url),
        }
    }

    async fn chat(&self, body: &serde_json::Value) -> Result<String, ProviderError> {
        let response: ChatResponse = self.client.post_json("/chat/completions", body).await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::terminal("Vision response contained no choices"))
    }
}

#[async_trait]
impl VisionProvider for OpenAiVision {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn analyze(&self, image: &[u8], prompt: &str) -> Result<VisionAnalysis, ProviderError> {
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(image);
        let data_url = format!("data:image/jpeg;base64,{image_b64}");

        // Step 1: structured visual analysis of the image.
        let analysis_body = serde_json::json!({
            "model": VISION_MODEL,
            "max_tokens": 500,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "text",
                        "text": "Analyze this cottage food product image and provide a detailed \
                                 JSON response with: main_items, presentation_style, \
                                 props_surfaces, visual_style, colors, setting. \
                                 Return ONLY valid JSON, no other text."
                    },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }],
        });

        let analysis_text = self.chat(&analysis_body).await?;
        let analysis: serde_json::Value = serde_json::from_str(&analysis_text)
            .unwrap_or_else(|_| serde_json::json!({ "raw_response": analysis_text }));

        // Step 2: searchable tags from the analysis plus the original prompt.
        let tags_body = serde_json::json!({
            "model": VISION_MODEL,
            "response_format": { "type": "json_object" },
            "messages": [
                {
                    "role": "system",
                    "content": "You are an expert at generating search tags for cottage food \
                                product images. Generate 8-12 specific, searchable tags. \
                                Tags should be lowercase, hyphenated when needed. \
                                Return valid JSON with: tags (array), category (string), \
                                description (string)."
                },
                {
                    "role": "user",
                    "content": format!(
                        "Original prompt: {prompt}\n\nVision analysis: {analysis}\n\n\
                         Generate searchable tags for this cottage food image."
                    )
                }
            ],
        });

        let tags_text = self.chat(&tags_body).await?;
        let tags_json: serde_json::Value = serde_json::from_str(&tags_text)
            .map_err(|e| ProviderError::terminal(format!("Tag response was not JSON: {e}")))?;

        let mut tags: Vec<String> = tags_json
            .get("tags")
            .and_then(|t| t.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        tags.truncate(MAX_TAGS_PER_IMAGE);

        let category = tags_json
            .get("category")
            .and_then(|c| c.as_str())
            .unwrap_or("food")
            .to_string();
        let description = tags_json
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or_default()
            .to_string();

        let confidence = score_confidence(&analysis, &tags);

        Ok(VisionAnalysis {
            tags,
            category,
            description,
            confidence,
            analysis,
            model: VISION_MODEL.to_string(),
            cost: TAGGING_COST_USD,
        })
    }
}

/// Heuristic confidence in a tagging result.
///
/// Base 0.5; more tags, identified main items, and a richer analysis each
/// raise it, capped at 1.0.
fn score_confidence(analysis: &serde_json::Value, tags: &[String]) -> f64 {
    let mut score: f64 = 0.5;

    if tags.len() >= 8 {
        score += 0.2;
    }

    let has_main_items = analysis
        .get("main_items")
        .and_then(|m| m.as_array())
        .is_some_and(|items| !items.is_empty());
    if has_main_items {
        score += 0.15;
    }

    if analysis.as_object().is_some_and(|o| o.len() >= 4) {
        score += 0.15;
    }

    score.min(1.0)
}

// ---------------------------------------------------------------------------
// Embeddings
// ---------------------------------------------------------------------------

/// text-embedding-ada-002 adapter.
pub struct OpenAiEmbedding {
    client: OpenAiClient,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl OpenAiEmbedding {
    pub fn new(api_key: String, api_url: Option<String>) -> Self {
        Self {
            client: OpenAiClient::new(api_key, api_url),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &'static str {
        EMBEDDING_MODEL
    }

    fn dimension(&self) -> usize {
        larder_core::embedding::EMBEDDING_DIMENSION
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let body = serde_json::json!({
            "model": EMBEDDING_MODEL,
            "input": text,
        });

        let response: EmbeddingsResponse = self.client.post_json("/embeddings", &body).await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProviderError::terminal("Embedding response contained no data"))
    }
}
