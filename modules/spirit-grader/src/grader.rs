use ai_client::{Claude, ContentPart, StructuredReply};
use async_trait::async_trait;
use tracing::debug;

use crate::error::GradingError;
use crate::prompt::{GradingRequest, GENERATED_IMAGE_LABEL, ORIGINAL_IMAGE_LABEL};
use crate::schema::ScoreDocument;

/// Grades one spirit. Implementations make exactly one attempt.
#[async_trait]
pub trait Grader: Send + Sync {
    async fn grade(&self, request: &GradingRequest) -> Result<ScoreDocument, GradingError>;
}

pub struct ClaudeGrader {
    claude: Claude,
}

impl ClaudeGrader {
    pub fn new(claude: Claude) -> Self {
        Self { claude }
    }
}

#[async_trait]
impl Grader for ClaudeGrader {
    async fn grade(&self, request: &GradingRequest) -> Result<ScoreDocument, GradingError> {
        debug!(
            spirit = request.prompt.spirit_name.as_str(),
            model = self.claude.model(),
            original_bytes = request.original.bytes.len(),
            generated_bytes = request.generated.bytes.len(),
            "Grading spirit"
        );

        let reply = self
            .claude
            .structured_multimodal::<ScoreDocument>(request.rubric(), content_parts(request))
            .await?;

        interpret_reply(reply)
    }
}

/// User turn layout: prompt text, then each image preceded by its label.
pub fn content_parts(request: &GradingRequest) -> Vec<ContentPart> {
    vec![
        ContentPart::text(request.prompt.text.clone()),
        ContentPart::text(ORIGINAL_IMAGE_LABEL),
        ContentPart::image(request.original.media_type, request.original.bytes.clone()),
        ContentPart::text(GENERATED_IMAGE_LABEL),
        ContentPart::image(request.generated.media_type, request.generated.bytes.clone()),
    ]
}

pub fn interpret_reply(reply: StructuredReply) -> Result<ScoreDocument, GradingError> {
    let document = match reply {
        StructuredReply::Tool(value) => ScoreDocument::from_value(&value)?,
        StructuredReply::Text(text) => ScoreDocument::from_text(&text)?,
    };
    Ok(document)
}
