use std::time::Duration;

use crate::anthropic::AnthropicProvider;
use crate::config::{LlmConfig, ProviderKind};
use crate::error::LlmError;
use crate::http::shared_client;
#[cfg(feature = "mock")]
use crate::mock::MockProvider;
use crate::openai::OpenAiProvider;
use crate::provider::{ChatCompletion, ChatOptions, LlmProvider, Message};

/// Generates a match over all `AnyProvider` variants, binding the inner provider
/// and evaluating the given closure for each arm.
macro_rules! delegate_provider {
    ($self:expr, |$p:ident| $expr:expr) => {
        match $self {
            AnyProvider::OpenAi($p) => $expr,
            AnyProvider::Anthropic($p) => $expr,
            #[cfg(feature = "mock")]
            AnyProvider::Mock($p) => $expr,
        }
    };
}

#[derive(Debug, Clone)]
pub enum AnyProvider {
    OpenAi(OpenAiProvider),
    Anthropic(AnthropicProvider),
    #[cfg(feature = "mock")]
    Mock(MockProvider),
}

impl AnyProvider {
    /// Build the provider described by a caller-supplied config.
    ///
    /// `timeout` bounds each HTTP request.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingCredential`] when the config carries no API key.
    pub fn from_config(config: &LlmConfig, timeout: Duration) -> Result<Self, LlmError> {
        if !config.has_credential() {
            return Err(LlmError::MissingCredential {
                provider: config.provider.as_str(),
            });
        }
        let api_key = config.api_key.trim().to_owned();
        let base_url = config.effective_base_url().to_owned();
        let model = config.effective_model().to_owned();
        let client = shared_client(timeout);

        Ok(match config.provider {
            ProviderKind::OpenAi => {
                Self::OpenAi(OpenAiProvider::new(api_key, base_url, model).with_client(client))
            }
            ProviderKind::Anthropic => Self::Anthropic(
                AnthropicProvider::new(api_key, base_url, model).with_client(client),
            ),
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi(p) => p.model(),
            Self::Anthropic(p) => p.model(),
            #[cfg(feature = "mock")]
            Self::Mock(_) => "mock",
        }
    }
}

impl LlmProvider for AnyProvider {
    async fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatCompletion, LlmError> {
        delegate_provider!(self, |p| p.chat(messages, options).await)
    }

    fn name(&self) -> &'static str {
        delegate_provider!(self, |p| p.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_selects_provider() {
        let openai = AnyProvider::from_config(
            &LlmConfig::new(ProviderKind::OpenAi, "k"),
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(openai.name(), "openai");
        assert_eq!(openai.model(), "gpt-4o-mini");

        let anthropic = AnyProvider::from_config(
            &LlmConfig::new(ProviderKind::Anthropic, "k").with_model("claude-custom"),
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(anthropic.name(), "anthropic");
        assert_eq!(anthropic.model(), "claude-custom");
    }

    #[test]
    fn from_config_requires_key() {
        let err = AnyProvider::from_config(
            &LlmConfig::new(ProviderKind::OpenAi, ""),
            Duration::from_secs(30),
        )
        .unwrap_err();
        assert!(matches!(err, LlmError::MissingCredential { .. }));
    }

    #[tokio::test]
    async fn delegates_chat_to_inner_provider() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/chat/completions"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"choices": [{"message": {"content": "hi"}}]}),
            ))
            .mount(&server)
            .await;

        let provider = AnyProvider::from_config(
            &LlmConfig::new(ProviderKind::OpenAi, "k").with_base_url(server.uri()),
            Duration::from_secs(5),
        )
        .unwrap();
        let completion = provider
            .chat(&[Message::user("q")], &ChatOptions::default())
            .await
            .unwrap();
        assert_eq!(completion.content, "hi");
    }
}
