//! Rubric and per-spirit evaluation prompt.

use crate::imaging::NormalizedImage;
use crate::record::SpiritRecord;

pub const ORIGINAL_IMAGE_LABEL: &str = "User Provided Image:";
pub const GENERATED_IMAGE_LABEL: &str = "Generated Image of Spirit:";

/// System prompt shared by every grading call in a run.
pub const RUBRIC: &str = r#"You are an expert game design consultant specializing in creature design for trading card games. You evaluate spirits: creatures generated from photos of everyday objects. Your analysis should help improve the next design iteration.

Evaluate in this order:

1. Photo-to-Creature Transformation (40% of overall grade)
Example: a vintage camera becoming a mechanical owl that captures memories.
- Innovative use of the object's distinct features
- Logical but unexpected interpretations
- Physical feature adaptation (wings, eyes, mouth, ...)
- Functional or purpose translation (capturing, storing, manipulating, ...)
- A background that is logical and relevant to the creature
- The creature must change physical form, adapt physical features, or translate function
Penalize:
- Creatures that barely change from the source photo
- Missing or irrelevant backgrounds
- Obvious generation artifacts: blur, distortion, pixelation, logical inconsistencies

2. Base Elements (30% of overall grade)
Example: "Shutterbeak" for the camera-owl, with flavor text about collecting precious moments.
- Name: memorable, relevant, clever wordplay
- Flavor text: evocative, quotable, in the style of trading card flavor text
- Types: aligned with concept and mechanics
- Physical stats: height and weight appropriate for the concept
Penalize:
- Obvious or generic names
- Vague flavor text or flavor text unrelated to the concept
- Types that do not fit the concept
- Extreme or unrealistic physical stats

3. Generated Image Quality (30% of overall grade)
Focus on the generated image for this section.
- Clear, high quality, interesting and engaging
- A natural fit for a sci-fi or fantasy universe
- Relevant to the creature concept
Penalize:
- Anatomical errors: extra, missing or malformed limbs; wrong number of fingers, eyes or facial features
- Pattern duplication: unnatural repetition of textures, objects or elements
- Textural inconsistencies: blurred regions, smudging, abrupt texture changes
- Geometric distortions: warped perspective, impossible angles, broken symmetry
- Garbled, unreadable or nonsensical text
- Color and lighting breaks: unnatural transitions, inconsistent shadows or highlights
- Edge artifacts: hard seams, pixelation, unnatural boundaries between elements

Scoring guidelines:
9-10 Exceptional: masterful, unique transformation; elements reinforce each other; memorable.
7-8 Strong: creative use of the source; elements work together; clear gameplay identity.
5-6 Solid: basic but logical transformation; elements work independently; room to improve.
3-4 Needs work: weak connection to the source; elements do not support each other.
1-2 Poor: minimal transformation; clashing elements; needs major revision.

Every score is a number from 0 to 10. Give specific, actionable feedback."#;

const RESPONSE_LAYOUT: &str = r#"{
  "creature_id": "<spirit name>",
  "photo_to_creature_evaluation": {
    "transformation_creativity": {"score": 0-10, "strengths": [], "weaknesses": [], "key_features_used": []},
    "physical_adaptation": {"score": 0-10, "strengths": [], "weaknesses": []},
    "functional_translation": {"score": 0-10, "strengths": [], "weaknesses": []}
  },
  "base_evaluation": {
    "name": {"score": 0-10, "strengths": [], "weaknesses": [], "suggested_improvements": []},
    "flavor_text": {"score": 0-10, "strengths": [], "weaknesses": [], "suggested_improvements": []},
    "types": {"score": 0-10, "strengths": [], "weaknesses": [], "suggested_improvements": []},
    "physical_stats": {"height_weight_appropriateness": 0-10, "notes": ""}
  },
  "image_quality_evaluation": {
    "score": 0-10,
    "standout_qualities": [],
    "key_improvement_areas": [],
    "design_iteration_suggestions": []
  },
  "overall_grade": 0-10,
  "standout_qualities": [],
  "key_improvement_areas": [],
  "design_iteration_suggestions": []
}"#;

/// The textual half of a grading request. Depends only on the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradingPrompt {
    pub spirit_name: String,
    pub text: String,
}

impl GradingPrompt {
    pub fn attach(self, original: NormalizedImage, generated: NormalizedImage) -> GradingRequest {
        GradingRequest {
            prompt: self,
            original,
            generated,
        }
    }
}

/// Everything one grading call sends: rubric-bound prompt text plus both images.
#[derive(Debug, Clone)]
pub struct GradingRequest {
    pub prompt: GradingPrompt,
    pub original: NormalizedImage,
    pub generated: NormalizedImage,
}

impl GradingRequest {
    pub fn rubric(&self) -> &'static str {
        RUBRIC
    }
}

pub fn build(record: &SpiritRecord) -> GradingPrompt {
    let text = format!(
        "Please evaluate this creature in my game and provide a comprehensive analysis in JSON format.

Spirit Details:
Name: {name}
Flavor Text: {description}
Primary Type: {primary_type}
Secondary Type: {secondary_type}
Height: {height}
Weight: {weight}

A photo of the source object that inspired this spirit and the generated image of the spirit follow this message.

Evaluation areas, in order of importance:
1. Photo-to-creature transformation
2. Base elements (name, flavor text, types)
3. Design and gameplay integration
4. Overall synergy between elements

Required JSON format:
{layout}",
        name = record.name,
        description = record.description,
        primary_type = record.primary_type,
        secondary_type = record.secondary_type,
        height = record.height,
        weight = record.weight,
        layout = RESPONSE_LAYOUT,
    );

    GradingPrompt {
        spirit_name: record.display_name().to_string(),
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spirit;

    #[test]
    fn prompt_interpolates_record_fields() {
        let mut record = spirit("Shutterbeak", "https://a", "https://b");
        record.description = "It never forgets a face.".to_string();
        record.primary_type = "Tech".to_string();
        record.secondary_type = "Air".to_string();
        record.height = 40;
        record.weight = 3;

        let prompt = build(&record);
        assert_eq!(prompt.spirit_name, "Shutterbeak");
        assert!(prompt.text.contains("Name: Shutterbeak\n"));
        assert!(prompt.text.contains("Flavor Text: It never forgets a face.\n"));
        assert!(prompt.text.contains("Primary Type: Tech\n"));
        assert!(prompt.text.contains("Secondary Type: Air\n"));
        assert!(prompt.text.contains("Height: 40\n"));
        assert!(prompt.text.contains("Weight: 3\n"));
        assert!(prompt.text.contains("\"overall_grade\": 0-10"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let record = spirit("Kettlewyrm", "https://a", "https://b");
        assert_eq!(build(&record), build(&record.clone()));
    }

    #[test]
    fn image_urls_stay_out_of_prompt_text() {
        let record = spirit("Kettlewyrm", "https://img.test/a.jpg", "https://img.test/b.webp");
        let prompt = build(&record);
        assert!(!prompt.text.contains("img.test"));
    }

    #[test]
    fn unnamed_spirit_gets_placeholder_name() {
        let record = spirit("", "https://a", "https://b");
        assert_eq!(build(&record).spirit_name, "Unnamed");
    }

    #[test]
    fn rubric_covers_every_evaluation_area() {
        assert!(RUBRIC.contains("Photo-to-Creature Transformation"));
        assert!(RUBRIC.contains("Base Elements"));
        assert!(RUBRIC.contains("Generated Image Quality"));
    }
}
