//! Chat-completion client producing the narrative summary.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::prompt::PromptRequest;
use crate::utils::HttpClient;

/// Base URL of the OpenAI API
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Completions can take minutes for large corpora
pub const SUMMARY_TIMEOUT_SECS: u64 = 300;

const FENCE_OPEN: &str = "```html";
const FENCE_CLOSE: &str = "```";

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint answered with an error status
    #[error("API error [{status}]: {message}")]
    Api { status: u16, message: String },

    /// The response had no usable choice
    #[error("Invalid response from OpenAI API: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for SummaryError {
    fn from(err: reqwest::Error) -> Self {
        SummaryError::Transport(err.to_string())
    }
}

/// Client for an OpenAI-compatible chat-completion endpoint
///
/// One request per call. Failures are reported, never retried.
#[derive(Debug, Clone)]
pub struct SummaryClient {
    client: Arc<HttpClient>,
    base_url: String,
}

impl SummaryClient {
    pub fn new() -> Result<Self, SummaryError> {
        let client = HttpClient::with_timeout(Duration::from_secs(SUMMARY_TIMEOUT_SECS))
            .map_err(|e| SummaryError::Transport(e.to_string()))?;
        Ok(Self::with_client(Arc::new(client)))
    }

    /// Create with a custom HTTP client
    pub fn with_client(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            base_url: OPENAI_API_BASE.to_string(),
        }
    }

    /// Point the client at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Send the prompt and return the fence-stripped summary markup.
    pub async fn summarize(
        &self,
        prompt: &PromptRequest,
        api_key: &str,
        model: &str,
    ) -> Result<String, SummaryError> {
        let body = ChatRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user_content,
                },
            ],
        };

        tracing::info!(model, endpoint = %self.endpoint(), "requesting summary");

        let response = self
            .client
            .post(&self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = api_error_message(&text);
            tracing::error!(status = status.as_u16(), %message, "summary request rejected");
            return Err(SummaryError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let content = parse_content(&text)?;
        Ok(strip_fences(&content))
    }
}

/// Remove a leading "```html" and a trailing "```" and trim whitespace.
///
/// The opening marker is only removed at the very start and the closing one
/// only at the very end; fences elsewhere are left alone.
pub fn strip_fences(raw: &str) -> String {
    let mut summary = raw.strip_prefix(FENCE_OPEN).unwrap_or(raw);
    summary = summary.strip_suffix(FENCE_CLOSE).unwrap_or(summary);
    summary.trim().to_string()
}

fn parse_content(body: &str) -> Result<String, SummaryError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| SummaryError::InvalidResponse(format!("undecodable body: {}", e)))?;

    response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| SummaryError::InvalidResponse("no choices".to_string()))?
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| SummaryError::InvalidResponse("first choice has no content".to_string()))
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json["error"]["message"]
                .as_str()
                .or_else(|| json["message"].as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "unknown API error".to_string())
}

// ===== Chat completion wire types =====

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn prompt() -> PromptRequest {
        PromptRequest {
            system_prompt: "Summarize CRISPR".to_string(),
            user_content: "<div class=\"article\"></div>".to_string(),
        }
    }

    fn client(url: String) -> SummaryClient {
        SummaryClient::new().unwrap().with_base_url(url)
    }

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("```html\n<p>x</p>\n```"), "<p>x</p>");
        assert_eq!(strip_fences("  <p>x</p>  "), "<p>x</p>");
        assert_eq!(strip_fences("<p>a ```html b</p>"), "<p>a ```html b</p>");
        assert_eq!(strip_fences(" ```html<p>x</p>"), "```html<p>x</p>");
        assert_eq!(strip_fences("```\n<p>x</p>"), "```\n<p>x</p>");
    }

    #[test]
    fn test_parse_content_shapes() {
        assert!(matches!(
            parse_content(r#"{"choices": []}"#),
            Err(SummaryError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_content(r#"{"id": "x"}"#),
            Err(SummaryError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_content(r#"{"choices": [{"message": {"role": "assistant"}}]}"#),
            Err(SummaryError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_content("not json"),
            Err(SummaryError::InvalidResponse(_))
        ));
        assert_eq!(
            parse_content(r#"{"choices": [{"message": {"content": "hi"}}]}"#).unwrap(),
            "hi"
        );
    }

    #[tokio::test]
    async fn test_summarize_sends_two_messages_with_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::Json(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "Summarize CRISPR"},
                    {"role": "user", "content": "<div class=\"article\"></div>"}
                ]
            })))
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [{"message": {"role": "assistant", "content": "```html\n<h1>Summary</h1>\n```"}}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let summary = client(server.url())
            .summarize(&prompt(), "sk-test", "gpt-4o-mini")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(summary, "<h1>Summary</h1>");
    }

    #[tokio::test]
    async fn test_empty_choices_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let result = client(server.url())
            .summarize(&prompt(), "sk-test", "gpt-4o-mini")
            .await;
        assert!(matches!(result, Err(SummaryError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_error_status_carries_api_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error": {"message": "Incorrect API key provided"}}"#)
            .expect(1)
            .create_async()
            .await;

        let result = client(server.url())
            .summarize(&prompt(), "bad", "gpt-4o-mini")
            .await;

        mock.assert_async().await;
        match result {
            Err(SummaryError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let result = client("http://127.0.0.1:9".to_string())
            .summarize(&prompt(), "sk-test", "gpt-4o-mini")
            .await;
        assert!(matches!(result, Err(SummaryError::Transport(_))));
    }
}
