//! Remote model client.
//!
//! [`ModelClient`] is the seam the pipeline tests mock; [`GeminiClient`] is
//! the production implementation against the Generative Language REST API.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use vault_core::{retain_citable, SourceRef};

use crate::config::ModelSelection;
use crate::structuring::appraisal_schema;
use crate::types::{AppraiseError, GroundedAnswer};

/// The remote calls the pipeline makes. One method per stage.
#[allow(async_fn_in_trait)]
pub trait ModelClient: Send + Sync {
    /// Vision identification with the primary model.
    async fn identify(&self, image_b64: &str, prompt: &str) -> Result<String, AppraiseError>;

    /// Vision identification with the degraded-route model.
    async fn identify_basic(&self, image_b64: &str, prompt: &str)
        -> Result<String, AppraiseError>;

    /// Search-grounded market research. Citations come from grounding
    /// metadata; their absence is valid.
    async fn research(&self, query: &str) -> Result<GroundedAnswer, AppraiseError>;

    /// Schema-constrained structuring call. Returns the raw JSON text; the
    /// structuring module re-validates it.
    async fn structure(&self, text: &str) -> Result<String, AppraiseError>;
}

// ---------------------------------------------------------------------------
// Wire types (camelCase per the REST contract)
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct Tool {
    #[serde(rename = "googleSearch")]
    google_search: EmptyConfig,
}

#[derive(Serialize)]
struct EmptyConfig {}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema", skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Deserialize)]
struct WebSource {
    #[serde(default)]
    title: String,
    #[serde(default)]
    uri: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

// ---------------------------------------------------------------------------
// Request assembly / response handling
// ---------------------------------------------------------------------------

/// Capture callbacks hand over data-URL strings; the API wants bare base64.
fn strip_data_url(image_b64: &str) -> &str {
    match image_b64.split_once(',') {
        Some((_, data)) => data,
        None => image_b64,
    }
}

fn vision_request(image_b64: &str, prompt: &str) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![
                Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: "image/jpeg".to_string(),
                        data: strip_data_url(image_b64).to_string(),
                    }),
                },
                Part {
                    text: Some(prompt.to_string()),
                    inline_data: None,
                },
            ],
        }],
        tools: None,
        generation_config: None,
    }
}

fn research_request(query: &str) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: Some(query.to_string()),
                inline_data: None,
            }],
        }],
        tools: Some(vec![Tool {
            google_search: EmptyConfig {},
        }]),
        generation_config: None,
    }
}

fn structure_request(text: &str) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: Some(text.to_string()),
                inline_data: None,
            }],
        }],
        tools: None,
        generation_config: Some(GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: Some(appraisal_schema()),
        }),
    }
}

/// Map a non-success HTTP response to the error taxonomy.
fn classify_failure(status: u16, body: &str) -> AppraiseError {
    if status == 429 {
        return AppraiseError::RateLimited;
    }
    let detail = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error);
    if let Some(detail) = &detail {
        if detail.status == "RESOURCE_EXHAUSTED" {
            return AppraiseError::RateLimited;
        }
    }
    let message = detail
        .map(|d| d.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.chars().take(200).collect());
    if status == 401 || status == 403 {
        return AppraiseError::Configuration(message);
    }
    AppraiseError::Api { status, message }
}

/// Pull the answer text and any grounding citations out of a success body.
fn parse_generate_body(body: &str) -> Result<(String, Vec<SourceRef>), AppraiseError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| AppraiseError::MalformedResponse(format!("response body: {}", e)))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(AppraiseError::MalformedResponse("no candidates".into()));
    };

    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    if text.is_empty() {
        return Err(AppraiseError::MalformedResponse(
            "candidate carried no text".into(),
        ));
    }

    let sources = candidate
        .grounding_metadata
        .map(|g| {
            g.grounding_chunks
                .into_iter()
                .filter_map(|c| c.web)
                .map(|w| SourceRef {
                    title: w.title,
                    uri: w.uri,
                })
                .collect()
        })
        .map(retain_citable)
        .unwrap_or_default();

    Ok((text, sources))
}

// ---------------------------------------------------------------------------
// Production client
// ---------------------------------------------------------------------------

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client for the Generative Language (`generateContent`) REST API.
#[derive(Debug)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    models: ModelSelection,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, models: ModelSelection) -> Result<Self, AppraiseError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AppraiseError::Configuration(
                "API key not configured".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppraiseError::Configuration(format!("http client: {}", e)))?;
        Ok(Self {
            http,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            models,
        })
    }

    /// Read the credential from `GEMINI_API_KEY`.
    pub fn from_env(models: ModelSelection) -> Result<Self, AppraiseError> {
        let key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| AppraiseError::Configuration("GEMINI_API_KEY not set".into()))?;
        Self::new(key, models)
    }

    /// Point at a different endpoint (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<(String, Vec<SourceRef>), AppraiseError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AppraiseError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AppraiseError::Network(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(classify_failure(status, &body));
        }
        parse_generate_body(&body)
    }
}

impl ModelClient for GeminiClient {
    async fn identify(&self, image_b64: &str, prompt: &str) -> Result<String, AppraiseError> {
        let (text, _) = self
            .generate(&self.models.identify, &vision_request(image_b64, prompt))
            .await?;
        Ok(text)
    }

    async fn identify_basic(
        &self,
        image_b64: &str,
        prompt: &str,
    ) -> Result<String, AppraiseError> {
        let (text, _) = self
            .generate(&self.models.fallback, &vision_request(image_b64, prompt))
            .await?;
        Ok(text)
    }

    async fn research(&self, query: &str) -> Result<GroundedAnswer, AppraiseError> {
        let (text, sources) = self
            .generate(&self.models.research, &research_request(query))
            .await?;
        Ok(GroundedAnswer { text, sources })
    }

    async fn structure(&self, text: &str) -> Result<String, AppraiseError> {
        let (raw, _) = self
            .generate(&self.models.structure, &structure_request(text))
            .await?;
        Ok(raw)
    }
}
