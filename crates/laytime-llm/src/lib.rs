//! Gemini API integration for laytime reconciliation.
//!
//! Provides the two LLM-backed collaborators the engine accepts:
//! - Clause applicability verdicts for the deduction reconciler
//! - Reason inference for unexplained timeline gaps

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use laytime_core::deduction::{ClauseMatcher, ClauseVerdict, MatchError, MatchRequest};
use laytime_core::interval::Interval;
use laytime_core::sequence::{GapInference, GapInferenceError};

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models";
/// Default model when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const VERDICT_TEMPERATURE: f32 = 0.1;

/// LLM client errors.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provided API key was invalid.
    #[error("invalid API key: {reason}")]
    InvalidApiKey { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("API error: {message}")]
    Api { message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// Failed to start the blocking runtime.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Gemini API client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new client with the given API key and model.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or whitespace-only, or if
    /// the HTTP client fails to build.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();

        if api_key.is_empty() {
            return Err(LlmError::InvalidApiKey {
                reason: "API key cannot be empty",
            });
        }
        if api_key.trim().is_empty() {
            return Err(LlmError::InvalidApiKey {
                reason: "API key cannot be whitespace-only",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(LlmError::ClientBuild)?;

        Ok(Self {
            http,
            api_key,
            model: model.into(),
        })
    }

    /// Evaluates whether any contract clause deducts the given interval.
    ///
    /// An empty clause list short-circuits to a non-deducting verdict without
    /// touching the network.
    pub async fn deduction_verdict(
        &self,
        request: &MatchRequest<'_>,
        clauses: &[String],
    ) -> Result<ClauseVerdict, LlmError> {
        if clauses.is_empty() {
            return Ok(ClauseVerdict {
                reason: Some("no contract clauses supplied".to_string()),
                ..ClauseVerdict::default()
            });
        }

        let prompt = build_verdict_prompt(request, clauses);
        let text = self.generate(&prompt).await?;
        let json = extract_json(&text).ok_or_else(|| {
            LlmError::InvalidResponse("no JSON object in model output".to_string())
        })?;
        serde_json::from_str(json).map_err(|err| LlmError::InvalidResponse(err.to_string()))
    }

    /// Infers the most plausible reason for an unexplained gap between two
    /// intervals.
    pub async fn gap_reason(
        &self,
        before: &Interval,
        after: &Interval,
    ) -> Result<String, LlmError> {
        let prompt = build_gap_prompt(before, after);
        let text = self.generate(&prompt).await?;
        let reason = text.trim();
        if reason.is_empty() {
            return Err(LlmError::InvalidResponse(
                "empty gap reason".to_string(),
            ));
        }
        Ok(reason.lines().next().unwrap_or(reason).trim().to_string())
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!(
            "{GEMINI_API_URL}/{model}:generateContent",
            model = self.model
        );
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: VERDICT_TEMPERATURE,
            },
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(parse_api_error(&body).unwrap_or_else(|| LlmError::Api {
                message: format!("status {status}: {body}"),
            }));
        }

        let payload: GenerateResponse = serde_json::from_str(&body)
            .map_err(|err| LlmError::InvalidResponse(err.to_string()))?;
        extract_text(payload)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

fn extract_text(payload: GenerateResponse) -> Result<String, LlmError> {
    let pieces: Vec<String> = payload
        .candidates
        .into_iter()
        .flat_map(|candidate| candidate.content.parts)
        .map(|part| part.text)
        .collect();
    if pieces.is_empty() {
        return Err(LlmError::InvalidResponse(
            "missing text content".to_string(),
        ));
    }
    Ok(pieces.join("\n"))
}

fn parse_api_error(body: &str) -> Option<LlmError> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: ErrorDetails,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| LlmError::Api {
            message: payload.error.message,
        })
}

/// Finds the outermost JSON object or array in model output.
///
/// Models wrap JSON in prose and code fences; the substring between the first
/// and last brace is the payload.
fn extract_json(text: &str) -> Option<&str> {
    let object = text
        .find('{')
        .zip(text.rfind('}'))
        .filter(|(start, end)| start < end)
        .map(|(start, end)| &text[start..=end]);
    if object.is_some() {
        return object;
    }
    text.find('[')
        .zip(text.rfind(']'))
        .filter(|(start, end)| start < end)
        .map(|(start, end)| &text[start..=end])
}

fn build_verdict_prompt(request: &MatchRequest<'_>, clauses: &[String]) -> String {
    let mut lines = Vec::new();
    lines.push(
        "You are a laytime analyst. Decide whether any contract clause excludes \
         the following period from laytime."
            .to_string(),
    );
    lines.push(
        "Return strict JSON: {\"Clause\":\"...\",\"confidence_score\":0.0,\
         \"deduct\":false,\"reason\":\"...\",\"deducted_from\":\"YYYY-MM-DD HH:MM\",\
         \"deducted_to\":\"YYYY-MM-DD HH:MM\",\"total_hours\":0.0}"
            .to_string(),
    );
    lines.push("Rules:".to_string());
    lines.push("- deduct is true only when a clause clearly applies.".to_string());
    lines.push("- Quote the matched clause verbatim in Clause.".to_string());
    lines.push("- Keep deducted_from/deducted_to within the period.".to_string());
    lines.push(String::new());
    lines.push(format!("period_reason: {}", request.reason));
    lines.push(format!("period_start: {}", request.start));
    lines.push(format!("period_end: {}", request.end));
    lines.push("clauses:".to_string());
    for clause in clauses {
        lines.push(format!("- {clause}"));
    }
    lines.join("\n")
}

fn build_gap_prompt(before: &Interval, after: &Interval) -> String {
    let mut lines = Vec::new();
    lines.push(
        "You are a laytime analyst reading a port Statement of Facts. A period \
         of time has no logged activity. Infer the single most plausible reason."
            .to_string(),
    );
    lines.push("Answer with one short phrase only, no punctuation.".to_string());
    lines.push(String::new());
    lines.push(format!("previous_activity: {}", before.reason));
    lines.push(format!("gap_start: {}", before.end.unwrap_or(before.start)));
    lines.push(format!("gap_end: {}", after.start));
    lines.push(format!("next_activity: {}", after.reason));
    lines.join("\n")
}

/// Synchronous adapter over [`Client`] for the engine's collaborator seams.
///
/// The core pipeline is synchronous; this owns a current-thread runtime and
/// blocks on each call.
#[derive(Debug)]
pub struct BlockingClient {
    client: Client,
    runtime: tokio::runtime::Runtime,
}

impl BlockingClient {
    /// Creates a blocking adapter with its own runtime.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid API key or if the runtime fails to
    /// start.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let client = Client::new(api_key, model)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(LlmError::Runtime)?;
        Ok(Self { client, runtime })
    }
}

impl ClauseMatcher for BlockingClient {
    fn evaluate(
        &self,
        request: &MatchRequest<'_>,
        clauses: &[String],
    ) -> Result<ClauseVerdict, MatchError> {
        self.runtime
            .block_on(self.client.deduction_verdict(request, clauses))
            .map_err(|err| MatchError(err.to_string()))
    }
}

impl GapInference for BlockingClient {
    fn infer_reason(
        &self,
        before: &Interval,
        after: &Interval,
    ) -> Result<String, GapInferenceError> {
        self.runtime
            .block_on(self.client.gap_reason(before, after))
            .map_err(|err| GapInferenceError(err.to_string()))
    }
}
