// Test doubles and fixtures for the grading pipeline.
//
// - MockImageLoader (ImageLoader): HashMap-based URL→bytes
// - MockGrader (Grader): spirit name→raw response document
//
// Plus builders for records, images and score documents.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};

use crate::error::GradingError;
use crate::grader::{interpret_reply, Grader};
use crate::imaging::{ImageLoader, NormalizedImage, JPEG_MEDIA_TYPE};
use crate::prompt::GradingRequest;
use crate::record::SpiritRecord;
use crate::schema::ScoreDocument;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn spirit(name: &str, original_url: &str, generated_url: &str) -> SpiritRecord {
    SpiritRecord {
        id: format!("id-{name}"),
        name: name.to_string(),
        description: format!("{name} lurks where the light bends."),
        primary_type: "Tech".to_string(),
        secondary_type: "Air".to_string(),
        original_image_url: original_url.to_string(),
        generated_image_url: generated_url.to_string(),
        height: 40,
        weight: 3,
        ..SpiritRecord::default()
    }
}

/// A solid-color PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let buffer = RgbImage::from_pixel(width, height, Rgb([120_u8, 60_u8, 200_u8]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(buffer)
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode png fixture");
    out.into_inner()
}

pub fn normalized_image(width: u32, height: u32) -> NormalizedImage {
    NormalizedImage {
        width,
        height,
        bytes: vec![0xff, 0xd8, 0xff, 0xd9],
        media_type: JPEG_MEDIA_TYPE,
    }
}

/// A complete response document with every score set to `grade`.
pub fn score_document_json(grade: f64) -> Value {
    let axis = |extra: &str| {
        let mut value = json!({
            "score": grade,
            "strengths": ["distinctive silhouette"],
            "weaknesses": ["busy palette"],
        });
        if !extra.is_empty() {
            value[extra] = json!(["lens becomes an eye"]);
        }
        value
    };

    json!({
        "creature_id": "fixture",
        "photo_to_creature_evaluation": {
            "transformation_creativity": axis("key_features_used"),
            "physical_adaptation": axis(""),
            "functional_translation": axis(""),
        },
        "base_evaluation": {
            "name": axis("suggested_improvements"),
            "flavor_text": axis("suggested_improvements"),
            "types": axis("suggested_improvements"),
            "physical_stats": {
                "height_weight_appropriateness": grade,
                "notes": "plausible for a small flyer",
            },
        },
        "image_quality_evaluation": {
            "score": grade,
            "standout_qualities": ["crisp lighting"],
            "key_improvement_areas": [],
            "design_iteration_suggestions": [],
        },
        "overall_grade": grade,
        "standout_qualities": [],
        "key_improvement_areas": [],
        "design_iteration_suggestions": ["try a night scene"],
    })
}

pub fn score_document(grade: f64) -> ScoreDocument {
    ScoreDocument::from_value(&score_document_json(grade)).expect("valid fixture document")
}

// ---------------------------------------------------------------------------
// MockImageLoader
// ---------------------------------------------------------------------------

/// Returns registered bytes per URL; unregistered URLs fail like an
/// unreachable host.
#[derive(Default)]
pub struct MockImageLoader {
    images: HashMap<String, Vec<u8>>,
}

impl MockImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_image(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.images.insert(url.to_string(), bytes);
        self
    }
}

#[async_trait]
impl ImageLoader for MockImageLoader {
    async fn load(&self, url: &str) -> Result<Vec<u8>, GradingError> {
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| GradingError::Fetch(format!("{url}: host unreachable")))
    }
}

// ---------------------------------------------------------------------------
// MockGrader
// ---------------------------------------------------------------------------

enum MockReply {
    Document(Value),
    Failure(String),
}

/// Image sizes and spirit name of a request the mock received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRequest {
    pub spirit_name: String,
    pub original: (u32, u32),
    pub generated: (u32, u32),
}

/// Answers by spirit name. Documents go through the same strict decoding as
/// real replies; unknown spirits fail with a transport error.
#[derive(Default)]
pub struct MockGrader {
    replies: HashMap<String, MockReply>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl MockGrader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_grade(mut self, spirit_name: &str, document: Value) -> Self {
        self.replies
            .insert(spirit_name.to_string(), MockReply::Document(document));
        self
    }

    pub fn on_failure(mut self, spirit_name: &str, message: &str) -> Self {
        self.replies
            .insert(spirit_name.to_string(), MockReply::Failure(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Grader for MockGrader {
    async fn grade(&self, request: &GradingRequest) -> Result<ScoreDocument, GradingError> {
        let name = &request.prompt.spirit_name;
        self.seen.lock().unwrap().push(SeenRequest {
            spirit_name: name.clone(),
            original: (request.original.width, request.original.height),
            generated: (request.generated.width, request.generated.height),
        });

        match self.replies.get(name) {
            Some(MockReply::Document(value)) => {
                interpret_reply(ai_client::StructuredReply::Tool(value.clone()))
            }
            Some(MockReply::Failure(message)) => Err(GradingError::Transport(message.clone())),
            None => Err(GradingError::Transport(format!("no reply registered for {name}"))),
        }
    }
}
