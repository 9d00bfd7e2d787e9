mod client;
pub(crate) mod types;

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use base64::Engine;
use tracing::debug;

use crate::error::AiError;
use crate::schema::StructuredOutput;
use client::ClaudeClient;
use types::*;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const STRUCTURED_TOOL_NAME: &str = "structured_response";

/// One piece of a multimodal user turn.
#[derive(Debug, Clone)]
pub enum ContentPart {
    Text(String),
    /// Raw encoded image bytes; base64-encoded on the wire.
    Image { media_type: String, data: Vec<u8> },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn image(media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self::Image {
            media_type: media_type.into(),
            data,
        }
    }

    fn into_block(self) -> ContentBlock {
        match self {
            ContentPart::Text(text) => ContentBlock::Text { text },
            ContentPart::Image { media_type, data } => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(data);
                ContentBlock::Image {
                    source: ImageSource::base64(media_type, encoded),
                }
            }
        }
    }
}

/// What the model answered with when asked for structured output.
///
/// Callers that validate strictly want the raw document rather than a
/// deserialized `T`, so both shapes are handed back untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredReply {
    /// Input of the forced structured-output tool call.
    Tool(serde_json::Value),
    /// The model ignored the tool and answered in prose.
    Text(String),
}

// =============================================================================
// Claude
// =============================================================================

#[derive(Clone)]
pub struct Claude {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
    timeout: Duration,
    max_tokens: u32,
    /// Built on first use and shared by clones so the connection pool survives
    /// across calls. Reset whenever a builder changes connection settings.
    http: Arc<OnceLock<ClaudeClient>>,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            max_tokens: 4096,
            http: Arc::default(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self.http = Arc::default();
        self
    }

    /// Overall deadline for a single request, connect through body.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.http = Arc::default();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn client(&self) -> Result<&ClaudeClient, AiError> {
        if let Some(client) = self.http.get() {
            return Ok(client);
        }
        let client = ClaudeClient::new(&self.api_key, self.timeout)?;
        let client = match self.base_url {
            Some(ref url) => client.with_base_url(url),
            None => client,
        };
        Ok(self.http.get_or_init(|| client))
    }

    /// Ask for a `T`-shaped document from a multimodal user turn.
    ///
    /// Exactly one request is made. The schema of `T` is offered as a forced
    /// tool; the raw reply is returned so the caller can validate it.
    pub async fn structured_multimodal<T: StructuredOutput>(
        &self,
        system_prompt: impl Into<String>,
        parts: Vec<ContentPart>,
    ) -> Result<StructuredReply, AiError> {
        debug!(
            type_name = T::type_name(),
            parts = parts.len(),
            "Claude multimodal structured output"
        );

        let blocks = parts.into_iter().map(ContentPart::into_block).collect();
        let request = ChatRequest::new(&self.model)
            .system(system_prompt)
            .message(WireMessage::user_blocks(blocks))
            .max_tokens(self.max_tokens)
            .temperature(0.0)
            .forced_tool(ToolDefinitionWire {
                name: STRUCTURED_TOOL_NAME.to_string(),
                description: "Record the structured evaluation.".to_string(),
                input_schema: T::tool_schema(),
            });

        let response = self.client()?.chat(&request).await?;

        if let Some(input) = response.tool_input(STRUCTURED_TOOL_NAME) {
            return Ok(StructuredReply::Tool(input.clone()));
        }

        response
            .text()
            .map(StructuredReply::Text)
            .ok_or(AiError::NoContent)
    }
}
