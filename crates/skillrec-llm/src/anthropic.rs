use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::http::{default_client, error_message};
use crate::provider::{ChatCompletion, ChatOptions, LlmProvider, Message, Role, Usage};

const PROVIDER: &str = "anthropic";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl AnthropicProvider {
    #[must_use]
    pub fn new(api_key: String, mut base_url: String, model: String) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: default_client(),
            api_key,
            base_url,
            model,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, messages: &[Message], options: &ChatOptions) -> reqwest::RequestBuilder {
        let (system, chat_messages) = split_messages(messages);

        let body = RequestBody {
            model: &self.model,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            system,
            messages: &chat_messages,
        };

        self.client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
    }

    async fn send_request(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatCompletion, LlmError> {
        let response = self
            .build_request(messages, options)
            .send()
            .await
            .map_err(|e| LlmError::from_send(PROVIDER, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::from_send(PROVIDER, e))?;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited { provider: PROVIDER });
        }

        if !status.is_success() {
            tracing::error!("Anthropic API error {status}: {text}");
            return Err(LlmError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
                message: error_message(status, &text),
            });
        }

        let resp: ApiResponse = serde_json::from_str(&text)?;

        let usage = resp.usage.map(|u| {
            tracing::debug!(
                input_tokens = u.input_tokens,
                output_tokens = u.output_tokens,
                "Anthropic API usage"
            );
            Usage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }
        });

        let content: String = resp
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect();
        if content.is_empty() {
            return Err(LlmError::EmptyResponse { provider: PROVIDER });
        }

        Ok(ChatCompletion { content, usage })
    }
}

impl LlmProvider for AnthropicProvider {
    async fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatCompletion, LlmError> {
        self.send_request(messages, options).await
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

/// System messages travel in the top-level `system` field; the rest stay in order.
fn split_messages(messages: &[Message]) -> (Option<String>, Vec<ApiMessage<'_>>) {
    let mut system_parts = Vec::new();
    let mut chat = Vec::new();

    for msg in messages {
        match msg.role {
            Role::System => system_parts.push(msg.content.as_str()),
            Role::User | Role::Assistant => chat.push(ApiMessage {
                role: msg.role.as_str(),
                content: &msg.content,
            }),
        }
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };

    (system, chat)
}

#[derive(Serialize)]
struct RequestBody<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: &'a [ApiMessage<'a>],
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
#[allow(clippy::struct_field_names)]
struct ApiUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default = "text_kind")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

fn text_kind() -> String {
    "text".into()
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_provider(base_url: &str) -> AnthropicProvider {
        AnthropicProvider::new("sk-ant-key".into(), base_url.into(), "claude-test".into())
    }

    #[test]
    fn split_messages_extracts_system() {
        let messages = vec![
            Message::system("You pick skills."),
            Message::system("Answer in JSON."),
            Message::user("hello"),
        ];
        let (system, chat) = split_messages(&messages);
        assert_eq!(system.as_deref(), Some("You pick skills.\n\nAnswer in JSON."));
        assert_eq!(chat.len(), 1);
        assert_eq!(chat[0].role, "user");
    }

    #[test]
    fn split_messages_no_system() {
        let messages = [Message::user("hi")];
        let (system, chat) = split_messages(&messages);
        assert!(system.is_none());
        assert_eq!(chat.len(), 1);
    }

    #[test]
    fn debug_redacts_api_key() {
        let debug = format!("{:?}", test_provider("https://api.anthropic.com"));
        assert!(!debug.contains("sk-ant-key"));
        assert!(debug.contains("claude-test"));
    }

    #[tokio::test]
    async fn chat_sends_headers_and_system_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-ant-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(serde_json::json!({
                "model": "claude-test",
                "system": "pick",
                "max_tokens": 2000
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "{\"recommendations\":"}, {"type": "text", "text": "[]}"}],
                "usage": {"input_tokens": 30, "output_tokens": 7}
            })))
            .mount(&server)
            .await;

        let completion = test_provider(&server.uri())
            .chat(
                &[Message::system("pick"), Message::user("q")],
                &ChatOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(completion.content, "{\"recommendations\":[]}");
        assert_eq!(completion.usage.map(|u| u.input_tokens), Some(30));
    }

    #[tokio::test]
    async fn server_error_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_json(serde_json::json!({
                "type": "error",
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .mount(&server)
            .await;

        let err = test_provider(&server.uri())
            .chat(&[Message::user("q")], &ChatOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(529));
        assert!(err.to_string().contains("Overloaded"));
    }

    #[tokio::test]
    async fn no_text_blocks_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"content": []})),
            )
            .mount(&server)
            .await;

        let err = test_provider(&server.uri())
            .chat(&[Message::user("q")], &ChatOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse { .. }));
    }
}
