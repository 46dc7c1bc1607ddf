//! Gemini `generateContent` client used as the leaf gate.
//!
//! Sends the display-sized image as inline JPEG data together with a fixed
//! yes/no instruction and reads the first candidate's first text part.
//! See: <https://ai.google.dev/api/generate-content>

use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::LeafDetector;
use crate::preprocess::encode_payload;
use crate::{LeafError, Result};

/// Default base URL for the Gemini API
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default gate model
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Instruction sent with every image.
pub const LEAF_PROMPT: &str = "Does this image contain a leaf? Answer only 'yes' or 'no'.";

/// Remote leaf gate over the Gemini API.
///
/// One request per call, no retry. The client is stateless apart from its
/// connection pool, so clones can be used from concurrent tasks.
#[derive(Clone)]
pub struct GeminiLeafGate {
    api_key: String,
    http: Client,
    base_url: String,
    model: String,
}

impl GeminiLeafGate {
    /// Create a gate with the given API key against the public endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a gate with a custom base URL (for testing with wiremock).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        Self::with_options(api_key, base_url, DEFAULT_MODEL, DEFAULT_TIMEOUT)
    }

    /// Create a gate with every knob set explicitly.
    pub fn with_options(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build().map_err(|e| {
            LeafError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            api_key: api_key.into(),
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// Gate model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask the remote model whether `image` contains a leaf.
    ///
    /// Errors on transport failure, non-success status, malformed body,
    /// or a response without candidates.
    pub async fn ask(&self, image: &DynamicImage) -> Result<bool> {
        let payload = encode_payload(image)?;
        let url = format!("{}/v1/models/{}:generateContent", self.base_url, self.model);
        debug!(%url, model = %self.model, bytes = payload.data.len(), "requesting leaf verdict");

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    RequestPart::Text { text: LEAF_PROMPT },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: payload.mime_type,
                            data: &payload.data,
                        },
                    },
                ],
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LeafError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "gate returned non-success status");
            return Err(LeafError::Api {
                status: status.as_u16(),
                message: format!("Gemini API error: {status}"),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| LeafError::Http(e.to_string()))?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)?;
        let text = first_text(parsed)?;
        debug!(answer = %text, "gate answered");

        Ok(contains_yes(&text))
    }
}

/// The verdict rule: case-insensitive substring "yes".
///
/// Deliberately a substring match, not an exact one: "Yes, it is." and
/// "maybe yes?" both count as a leaf. An answer like "no, this is not a
/// leaf" is rejected only because it happens not to contain "yes".
pub fn contains_yes(text: &str) -> bool {
    text.to_lowercase().contains("yes")
}

fn first_text(response: GenerateContentResponse) -> Result<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(LeafError::EmptyResponse)?;

    let content = candidate
        .content
        .ok_or_else(|| LeafError::DataError("candidate has no content".to_string()))?;

    content
        .parts
        .into_iter()
        .next()
        .and_then(|part| part.text)
        .ok_or_else(|| LeafError::DataError("first part has no text".to_string()))
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

// ============================================================================
// Provider Trait Implementation
// ============================================================================

#[async_trait]
impl LeafDetector for GeminiLeafGate {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn check(&self, image: &DynamicImage) -> Result<bool> {
        GeminiLeafGate::ask(self, image).await
    }
}
