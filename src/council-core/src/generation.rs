//! Text-generation backend seam.
//!
//! The engine only needs one capability from a backend: given role-tagged
//! messages and a directive, hand back a stream of text fragments.

use std::pin::Pin;
use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::error::CouncilError;

/// Fragments of generated text, in arrival order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, CouncilError>> + Send>>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged message in a generation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A streaming text-generation backend.
///
/// Implementations own their own timeouts and retries.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Start generating a reply to `messages`, spoken under `directive`.
    async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        directive: &str,
    ) -> Result<FragmentStream, CouncilError>;
}

/// Drain a fragment stream into one string.
pub async fn collect_text(mut stream: FragmentStream) -> Result<String, CouncilError> {
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        text.push_str(&fragment?);
    }
    Ok(text)
}

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
}

impl OpenAiSettings {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 1024,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Streams chat completions from any OpenAI-compatible API.
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u32,
}

impl OpenAiGenerator {
    pub fn new(settings: OpenAiSettings) -> Result<Self, CouncilError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                CouncilError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        let config = OpenAIConfig::new()
            .with_api_key(&settings.api_key)
            .with_api_base(&settings.api_base);

        Ok(Self {
            client: Client::with_config(config).with_http_client(http_client),
            model: settings.model,
            max_tokens: settings.max_tokens,
        })
    }

    fn to_request_messages(
        messages: Vec<ChatMessage>,
        directive: &str,
    ) -> Vec<ChatCompletionRequestMessage> {
        let mut out = Vec::with_capacity(messages.len() + 1);
        out.push(ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessage {
                content: directive.to_string().into(),
                name: None,
            },
        ));
        for message in messages {
            out.push(match message.role {
                Role::System => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessage {
                        content: message.content.into(),
                        name: None,
                    },
                ),
                Role::User => {
                    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                        content: message.content.into(),
                        name: None,
                    })
                }
                Role::Assistant => ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessage {
                        content: Some(message.content.into()),
                        name: None,
                        tool_calls: None,
                        refusal: None,
                        audio: None,
                        function_call: None,
                    },
                ),
            });
        }
        out
    }
}

#[async_trait]
impl GenerationClient for OpenAiGenerator {
    async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        directive: &str,
    ) -> Result<FragmentStream, CouncilError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_completion_tokens(self.max_tokens)
            .messages(Self::to_request_messages(messages, directive))
            .stream(true)
            .build()?;

        tracing::trace!(model = %self.model, "Opening completion stream");
        let upstream = self.client.chat().create_stream(request).await?;

        let fragments = upstream.filter_map(|chunk| async move {
            match chunk {
                Ok(response) => {
                    let text: String = response
                        .choices
                        .into_iter()
                        .filter_map(|choice| choice.delta.content)
                        .collect();
                    (!text.is_empty()).then_some(Ok(text))
                }
                Err(e) => Some(Err(CouncilError::from(e))),
            }
        });

        Ok(Box::pin(fragments))
    }
}
