//! Field definitions for numbers projects.
//!
//! # Invariants
//! - `number` fields always store an empty choice list.
//! - `multichoice` choices are stored verbatim, in the order given.

use crate::model::ids::{FieldId, ProjectId};
use crate::model::validation::{
    ValidationError, MAX_CHOICE_CHARS, MAX_FIELD_CHOICES, MAX_FIELD_NAME_CHARS, MIN_FIELD_CHOICES,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    Multichoice,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Multichoice => "multichoice",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "number" => Some(Self::Number),
            "multichoice" => Some(Self::Multichoice),
            _ => None,
        }
    }
}

/// Caller-supplied field definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    #[serde(default)]
    pub choices: Vec<String>,
}

impl FieldSpec {
    pub fn number(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldType::Number,
            choices: Vec::new(),
        }
    }

    pub fn multichoice(name: impl Into<String>, choices: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldType::Multichoice,
            choices,
        }
    }

    /// Choices as they are persisted for this field type.
    pub fn stored_choices(&self) -> Vec<String> {
        match self.kind {
            FieldType::Number => Vec::new(),
            FieldType::Multichoice => self.choices.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankFieldName);
        }
        if name.chars().count() > MAX_FIELD_NAME_CHARS {
            return Err(ValidationError::FieldNameTooLong {
                max: MAX_FIELD_NAME_CHARS,
            });
        }

        if self.kind == FieldType::Number {
            return Ok(());
        }

        if self.choices.len() < MIN_FIELD_CHOICES {
            return Err(ValidationError::NotEnoughChoices {
                min: MIN_FIELD_CHOICES,
            });
        }
        if self.choices.len() > MAX_FIELD_CHOICES {
            return Err(ValidationError::TooManyChoices {
                max: MAX_FIELD_CHOICES,
            });
        }

        let mut seen = HashSet::new();
        for choice in &self.choices {
            let trimmed = choice.trim();
            if trimmed.is_empty() || trimmed.chars().count() > MAX_CHOICE_CHARS {
                return Err(ValidationError::InvalidChoice(choice.clone()));
            }
            if !seen.insert(trimmed) {
                return Err(ValidationError::DuplicateChoice(choice.clone()));
            }
        }

        Ok(())
    }
}

/// Stored field record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub userid: String,
    pub classid: String,
    pub projectid: ProjectId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    pub choices: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::{FieldSpec, FieldType};
    use crate::model::validation::ValidationError;

    fn choices(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn number_fields_drop_choices_when_stored() {
        let spec = FieldSpec {
            name: "age".to_string(),
            kind: FieldType::Number,
            choices: choices(&["ignored"]),
        };
        assert!(spec.validate().is_ok());
        assert!(spec.stored_choices().is_empty());
    }

    #[test]
    fn multichoice_keeps_choices_verbatim() {
        let spec = FieldSpec::multichoice("pet", choices(&["Cat", "dog", "Fish"]));
        assert!(spec.validate().is_ok());
        assert_eq!(spec.stored_choices(), choices(&["Cat", "dog", "Fish"]));
    }

    #[test]
    fn multichoice_rejects_single_choice() {
        let spec = FieldSpec::multichoice("pet", choices(&["cat"]));
        assert_eq!(
            spec.validate(),
            Err(ValidationError::NotEnoughChoices { min: 2 })
        );
    }

    #[test]
    fn multichoice_rejects_duplicate_and_blank_choices() {
        let duplicate = FieldSpec::multichoice("pet", choices(&["cat", "cat"]));
        assert_eq!(
            duplicate.validate(),
            Err(ValidationError::DuplicateChoice("cat".to_string()))
        );

        let padded = FieldSpec::multichoice("pet", choices(&["cat", "cat "]));
        assert_eq!(
            padded.validate(),
            Err(ValidationError::DuplicateChoice("cat ".to_string()))
        );

        let blank = FieldSpec::multichoice("pet", choices(&["cat", "  "]));
        assert!(matches!(
            blank.validate(),
            Err(ValidationError::InvalidChoice(_))
        ));
    }

    #[test]
    fn field_names_are_length_limited() {
        let spec = FieldSpec::number("a-very-long-field-name");
        assert_eq!(
            spec.validate(),
            Err(ValidationError::FieldNameTooLong { max: 12 })
        );
    }
}
