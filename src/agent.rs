//! LLM agent module for task-list summarization.
//!
//! Talks to any OpenAI-compatible chat completions endpoint. Failures carry
//! an [`AgentErrorKind`] so callers can tell quota exhaustion apart from
//! everything else.

use crate::config::Config;
use crate::prompt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Error code the backend uses once the account has no quota left.
const INSUFFICIENT_QUOTA: &str = "insufficient_quota";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentErrorKind {
    /// Usage limits reached. Recoverable by summarizing locally.
    QuotaExhausted,
    RequestFailed,
    ParseError,
    Timeout,
    Unreachable,
    NotConfigured,
}

impl fmt::Display for AgentErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AgentErrorKind::QuotaExhausted => "quota exhausted",
            AgentErrorKind::RequestFailed => "LLM request failed",
            AgentErrorKind::ParseError => "failed to parse response",
            AgentErrorKind::Timeout => "LLM request timed out",
            AgentErrorKind::Unreachable => "LLM server unreachable",
            AgentErrorKind::NotConfigured => "LLM not configured",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct AgentError {
    pub kind: AgentErrorKind,
    pub message: String,
}

impl AgentError {
    pub fn new(kind: AgentErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_quota_exhausted(&self) -> bool {
        self.kind == AgentErrorKind::QuotaExhausted
    }
}

/// Turns a rendered task list into prose.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `task_list` (as produced by [`prompt::render_task_list`]).
    /// The returned text is already trimmed.
    async fn summarize(&self, task_list: &str) -> Result<String, AgentError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Summarizer backed by an OpenAI-compatible HTTP API.
pub struct OpenAiSummarizer {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    persona: String,
    max_tokens: u32,
}

impl OpenAiSummarizer {
    pub fn from_config(config: &Config) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.agent.timeout_secs))
            .build()
            .map_err(|e| AgentError::new(AgentErrorKind::NotConfigured, e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.agent.base_url.trim_end_matches('/').to_string(),
            api_key: config.api.openai_key.clone(),
            model: config.agent.model.clone(),
            persona: config.agent.persona.clone(),
            max_tokens: config.agent.max_tokens,
        })
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, task_list: &str) -> Result<String, AgentError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(AgentError::new(
                AgentErrorKind::NotConfigured,
                "missing API key (set OPENAI_API_KEY)",
            ));
        };

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.persona.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt::user_message(task_list),
                },
            ],
            max_tokens: self.max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error_body(status, &body));
        }

        let chat: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AgentError::new(AgentErrorKind::ParseError, e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| AgentError::new(AgentErrorKind::ParseError, "no content in response"))
    }
}

fn classify_transport_error(err: reqwest::Error) -> AgentError {
    let kind = if err.is_timeout() {
        AgentErrorKind::Timeout
    } else if err.is_connect() {
        AgentErrorKind::Unreachable
    } else {
        AgentErrorKind::RequestFailed
    };
    AgentError::new(kind, err.to_string())
}

/// Map a non-2xx response to an error, spotting quota exhaustion by its
/// `error.type` or `error.code`.
fn classify_error_body(status: reqwest::StatusCode, body: &str) -> AgentError {
    let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) else {
        return AgentError::new(AgentErrorKind::RequestFailed, format!("HTTP {status}: {body}"));
    };
    let detail = parsed.error;
    let quota = detail.kind.as_deref() == Some(INSUFFICIENT_QUOTA)
        || detail.code.as_deref() == Some(INSUFFICIENT_QUOTA);
    let kind = if quota {
        AgentErrorKind::QuotaExhausted
    } else {
        AgentErrorKind::RequestFailed
    };
    let message = detail.message.unwrap_or_else(|| body.to_string());
    AgentError::new(kind, format!("HTTP {status}: {message}"))
}
