//! Label normalization rules.
//!
//! # Invariants
//! - Stored labels are trimmed and non-empty.
//! - Comparison between labels is exact and case-sensitive.

use crate::model::validation::ValidationError;

/// Maximum label length in characters, after trimming.
pub const MAX_LABEL_CHARS: usize = 100;

/// Trims one label. Returns `None` when nothing is left.
pub fn normalize_label(label: &str) -> Option<String> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Rejects labels that are too long to store.
pub fn validate_label(label: &str) -> Result<(), ValidationError> {
    if label.chars().count() > MAX_LABEL_CHARS {
        return Err(ValidationError::LabelTooLong {
            max: MAX_LABEL_CHARS,
        });
    }
    Ok(())
}
