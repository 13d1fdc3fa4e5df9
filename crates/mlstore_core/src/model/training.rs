//! Training example model.
//!
//! # Invariants
//! - An example's label is stored as given (trimmed) and is never rewritten
//!   when the project's label list changes.
//! - The payload shape matches the owning project's type.

use crate::model::ids::{ProjectId, TrainingId};
use crate::model::project::ProjectType;
use crate::model::validation::{ValidationError, MAX_TEXT_TRAINING_CHARS};
use serde::{Deserialize, Serialize};

/// Payload shape tag, one per project type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingKind {
    Text,
    Image,
    Numbers,
    Sound,
}

impl TrainingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Numbers => "numbers",
            Self::Sound => "sound",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "numbers" => Some(Self::Numbers),
            "sound" => Some(Self::Sound),
            _ => None,
        }
    }

    /// The only payload kind accepted by projects of `project` type.
    pub fn for_project(project: ProjectType) -> Self {
        match project {
            ProjectType::Text => Self::Text,
            ProjectType::Images => Self::Image,
            ProjectType::Numbers => Self::Numbers,
            ProjectType::Sounds => Self::Sound,
        }
    }
}

/// The example data itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum TrainingPayload {
    Text(String),
    /// Image location (URL); image bytes are not kept by this store.
    Image(String),
    Numbers(Vec<f64>),
    /// Audio feature values.
    Sound(Vec<f64>),
}

impl TrainingPayload {
    pub fn kind(&self) -> TrainingKind {
        match self {
            Self::Text(_) => TrainingKind::Text,
            Self::Image(_) => TrainingKind::Image,
            Self::Numbers(_) => TrainingKind::Numbers,
            Self::Sound(_) => TrainingKind::Sound,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Text(text) => {
                if text.trim().is_empty() {
                    return Err(ValidationError::BlankTrainingText);
                }
                if text.chars().count() > MAX_TEXT_TRAINING_CHARS {
                    return Err(ValidationError::TrainingTextTooLong {
                        max: MAX_TEXT_TRAINING_CHARS,
                    });
                }
                Ok(())
            }
            Self::Image(url) => {
                if url.trim().is_empty() {
                    return Err(ValidationError::BlankImageUrl);
                }
                Ok(())
            }
            Self::Numbers(values) | Self::Sound(values) => {
                if values.is_empty() {
                    return Err(ValidationError::EmptyTrainingData);
                }
                if values.iter().any(|value| !value.is_finite()) {
                    return Err(ValidationError::NonFiniteTrainingValue);
                }
                Ok(())
            }
        }
    }
}

/// Stored training example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub id: TrainingId,
    pub projectid: ProjectId,
    pub payload: TrainingPayload,
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::{TrainingKind, TrainingPayload};
    use crate::model::project::ProjectType;
    use crate::model::validation::ValidationError;

    #[test]
    fn payload_kind_matches_project_type() {
        assert_eq!(
            TrainingKind::for_project(ProjectType::Images),
            TrainingPayload::Image("https://example.com/a.png".to_string()).kind()
        );
        assert_eq!(
            TrainingKind::for_project(ProjectType::Sounds),
            TrainingPayload::Sound(vec![0.5]).kind()
        );
    }

    #[test]
    fn validate_rejects_non_finite_numbers() {
        let payload = TrainingPayload::Numbers(vec![1.0, f64::NAN]);
        assert_eq!(
            payload.validate(),
            Err(ValidationError::NonFiniteTrainingValue)
        );
    }

    #[test]
    fn validate_rejects_blank_text() {
        assert_eq!(
            TrainingPayload::Text("  ".to_string()).validate(),
            Err(ValidationError::BlankTrainingText)
        );
    }

    #[test]
    fn payload_serializes_with_kind_tag() {
        let json = serde_json::to_value(TrainingPayload::Numbers(vec![1.0, 2.5])).unwrap();
        assert_eq!(json["kind"], "numbers");
        assert_eq!(json["data"][1], 2.5);
    }
}
