//! The score document the grading model must return, and its strict decoder.

use std::fmt;

use ai_client::strip_code_blocks;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SchemaViolation, ViolationKind};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

/// Score and notes for one evaluation axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AxisScore {
    /// 0-10
    pub score: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub key_features_used: Vec<String>,
    #[serde(default)]
    pub suggested_improvements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PhotoToCreatureEvaluation {
    pub transformation_creativity: AxisScore,
    pub physical_adaptation: AxisScore,
    pub functional_translation: AxisScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PhysicalStats {
    /// 0-10
    pub height_weight_appropriateness: f64,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BaseEvaluation {
    pub name: AxisScore,
    pub flavor_text: AxisScore,
    pub types: AxisScore,
    pub physical_stats: PhysicalStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImageQualityEvaluation {
    /// 0-10
    pub score: f64,
    #[serde(default)]
    pub standout_qualities: Vec<String>,
    #[serde(default)]
    pub key_improvement_areas: Vec<String>,
    #[serde(default)]
    pub design_iteration_suggestions: Vec<String>,
}

/// A validated evaluation of one spirit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoreDocument {
    #[serde(default)]
    pub creature_id: String,
    pub photo_to_creature_evaluation: PhotoToCreatureEvaluation,
    pub base_evaluation: BaseEvaluation,
    pub image_quality_evaluation: ImageQualityEvaluation,
    /// 0-10
    pub overall_grade: f64,
    #[serde(default)]
    pub standout_qualities: Vec<String>,
    #[serde(default)]
    pub key_improvement_areas: Vec<String>,
    #[serde(default)]
    pub design_iteration_suggestions: Vec<String>,
    /// The document as received, kept for the report dump.
    #[serde(skip)]
    #[schemars(skip)]
    raw: Value,
}

impl ScoreDocument {
    /// Decode a raw response document.
    ///
    /// Every category score must be present, numeric and within 0-10 before
    /// the rest of the document is decoded.
    pub fn from_value(value: &Value) -> Result<Self, SchemaViolation> {
        if !value.is_object() {
            return Err(SchemaViolation::new("$", ViolationKind::NotAnObject));
        }

        for category in Category::ALL {
            category.lookup(value)?;
        }

        let mut document: Self = serde_json::from_value(value.clone())
            .map_err(|e| SchemaViolation::new("$", ViolationKind::Malformed(e.to_string())))?;
        document.raw = value.clone();
        Ok(document)
    }

    /// Pretty JSON of the document as the model returned it, falling back to
    /// the typed fields when there is no received document.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        if self.raw.is_null() {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string_pretty(&self.raw)
        }
    }

    /// Decode a prose answer that should contain a single JSON document.
    pub fn from_text(text: &str) -> Result<Self, SchemaViolation> {
        let value: Value = serde_json::from_str(strip_code_blocks(text))
            .map_err(|e| SchemaViolation::new("$", ViolationKind::NotJson(e.to_string())))?;
        Self::from_value(&value)
    }

    pub fn score(&self, category: Category) -> f64 {
        let photo = &self.photo_to_creature_evaluation;
        let base = &self.base_evaluation;
        match category {
            Category::TransformationCreativity => photo.transformation_creativity.score,
            Category::PhysicalAdaptation => photo.physical_adaptation.score,
            Category::FunctionalTranslation => photo.functional_translation.score,
            Category::Name => base.name.score,
            Category::FlavorText => base.flavor_text.score,
            Category::Types => base.types.score,
            Category::HeightWeightAppropriateness => {
                base.physical_stats.height_weight_appropriateness
            }
            Category::ImageQuality => self.image_quality_evaluation.score,
            Category::OverallGrade => self.overall_grade,
        }
    }
}

/// The fixed set of aggregated score categories, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    TransformationCreativity,
    PhysicalAdaptation,
    FunctionalTranslation,
    Name,
    FlavorText,
    Types,
    HeightWeightAppropriateness,
    ImageQuality,
    OverallGrade,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::TransformationCreativity,
        Category::PhysicalAdaptation,
        Category::FunctionalTranslation,
        Category::Name,
        Category::FlavorText,
        Category::Types,
        Category::HeightWeightAppropriateness,
        Category::ImageQuality,
        Category::OverallGrade,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::TransformationCreativity => "transformation_creativity",
            Category::PhysicalAdaptation => "physical_adaptation",
            Category::FunctionalTranslation => "functional_translation",
            Category::Name => "name",
            Category::FlavorText => "flavor_text",
            Category::Types => "types",
            Category::HeightWeightAppropriateness => "height_weight_appropriateness",
            Category::ImageQuality => "image_quality",
            Category::OverallGrade => "overall_grade",
        }
    }

    /// Location of this category's score inside a response document.
    pub fn path(&self) -> &'static [&'static str] {
        match self {
            Category::TransformationCreativity => {
                &["photo_to_creature_evaluation", "transformation_creativity", "score"]
            }
            Category::PhysicalAdaptation => {
                &["photo_to_creature_evaluation", "physical_adaptation", "score"]
            }
            Category::FunctionalTranslation => {
                &["photo_to_creature_evaluation", "functional_translation", "score"]
            }
            Category::Name => &["base_evaluation", "name", "score"],
            Category::FlavorText => &["base_evaluation", "flavor_text", "score"],
            Category::Types => &["base_evaluation", "types", "score"],
            Category::HeightWeightAppropriateness => &[
                "base_evaluation",
                "physical_stats",
                "height_weight_appropriateness",
            ],
            Category::ImageQuality => &["image_quality_evaluation", "score"],
            Category::OverallGrade => &["overall_grade"],
        }
    }

    fn lookup(&self, document: &Value) -> Result<f64, SchemaViolation> {
        let path = self.path();
        let mut current = document;

        for (depth, key) in path.iter().enumerate() {
            let object = current.as_object().ok_or_else(|| {
                let parent = if depth == 0 {
                    "$".to_string()
                } else {
                    path[..depth].join(".")
                };
                SchemaViolation::new(parent, ViolationKind::NotAnObject)
            })?;
            current = object.get(*key).ok_or_else(|| {
                SchemaViolation::new(path[..=depth].join("."), ViolationKind::MissingField)
            })?;
        }

        let score = current
            .as_f64()
            .ok_or_else(|| SchemaViolation::new(path.join("."), ViolationKind::NotNumeric))?;
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(SchemaViolation::new(
                path.join("."),
                ViolationKind::OutOfRange(score),
            ));
        }
        Ok(score)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
