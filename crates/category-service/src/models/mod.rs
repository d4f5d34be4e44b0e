//! Category payloads.

use crate::errors::CsError;
use chrono::{DateTime, Utc};
use common::pagination::Page;
use serde::{Deserialize, Serialize};

/// Longest id a caller may choose.
pub const MAX_ID_LENGTH: usize = 64;

/// Category row (maps to the `categories` table) and API representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update body. Missing fields default so they reach
/// [`CategoryInput::validate`] instead of failing JSON extraction.
///
/// `id` is only read on create; a blank one is replaced by a random UUID.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CategoryInput {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
}

/// A [`CategoryInput`] whose fields are valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDraft {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
}

impl CategoryInput {
    pub fn validate(self) -> Result<CategoryDraft, CsError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CsError::Validation("name is required".to_string()));
        }

        let id = self
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());
        if let Some(id) = id {
            if id.len() > MAX_ID_LENGTH {
                return Err(CsError::Validation(format!(
                    "id must be at most {MAX_ID_LENGTH} characters"
                )));
            }
            // Ids travel as one URL path segment in reference checks.
            if matches!(id, "." | "..") || id.contains('/') {
                return Err(CsError::Validation(
                    "id must be a single path segment".to_string(),
                ));
            }
        }

        Ok(CategoryDraft {
            id: id.map(str::to_string),
            name: name.to_string(),
            description: self.description.trim().to_string(),
        })
    }
}

pub type CategoryPage = Page<Category>;

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn input(id: Option<&str>, name: &str) -> CategoryInput {
        CategoryInput {
            id: id.map(str::to_string),
            name: name.to_string(),
            description: " Stories of the future ".to_string(),
        }
    }

    #[test]
    fn test_valid_input_is_trimmed() {
        let draft = input(Some(" cat-scifi "), " Science Fiction ").validate().unwrap();
        assert_eq!(draft.id.as_deref(), Some("cat-scifi"));
        assert_eq!(draft.name, "Science Fiction");
        assert_eq!(draft.description, "Stories of the future");
    }

    #[test]
    fn test_blank_id_is_left_to_storage() {
        assert_eq!(input(None, "Poetry").validate().unwrap().id, None);
        assert_eq!(input(Some("  "), "Poetry").validate().unwrap().id, None);
    }

    #[test]
    fn test_field_rules() {
        let long_id = "x".repeat(MAX_ID_LENGTH + 1);
        let cases = [
            (input(None, "  "), "name is required"),
            (input(Some(".."), "Poetry"), "id must be a single path segment"),
            (input(Some("."), "Poetry"), "id must be a single path segment"),
            (input(Some("a/b"), "Poetry"), "id must be a single path segment"),
        ];
        for (case, expected) in cases {
            let err = case.validate().unwrap_err();
            assert!(
                matches!(err, CsError::Validation(ref msg) if msg == expected),
                "expected '{expected}', got {err:?}"
            );
        }
        assert!(matches!(
            input(Some(&long_id), "Poetry").validate(),
            Err(CsError::Validation(_))
        ));
    }

    #[test]
    fn test_missing_json_fields_default() {
        let parsed: CategoryInput = serde_json::from_str(r#"{"description":"x"}"#).unwrap();
        assert!(matches!(parsed.validate(), Err(CsError::Validation(msg)) if msg == "name is required"));
    }
}
