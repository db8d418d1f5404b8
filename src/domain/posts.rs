//! Validation rules for post and comment bodies.

use uuid::Uuid;

use super::error::DomainError;

/// Maximum length accepted for an image reference.
pub const MAX_IMAGE_REF_LEN: usize = 255;

/// User-supplied fields of a post before it is persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<String>,
}

impl PostDraft {
    /// Trim the body and image reference, rejecting empty text.
    pub fn normalize(self) -> Result<Self, DomainError> {
        let text = normalize_text(&self.text, "post text")?;
        let image = match self.image {
            Some(image) => normalize_image(&image)?,
            None => None,
        };
        Ok(Self {
            text,
            group_id: self.group_id,
            image,
        })
    }
}

/// Trim `raw` and require it to be non-empty.
pub fn normalize_text(raw: &str, field: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn normalize_image(raw: &str) -> Result<Option<String>, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.len() > MAX_IMAGE_REF_LEN {
        return Err(DomainError::validation(format!(
            "image reference exceeds {MAX_IMAGE_REF_LEN} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_trimmed() {
        assert_eq!(normalize_text("  hello \n", "post text").unwrap(), "hello");
    }

    #[test]
    fn whitespace_only_text_is_rejected() {
        let err = normalize_text(" \t\n", "comment text").expect_err("blank");
        assert_eq!(
            err,
            DomainError::validation("comment text must not be empty")
        );
    }

    #[test]
    fn blank_image_reference_becomes_none() {
        let draft = PostDraft {
            text: "body".into(),
            group_id: None,
            image: Some("   ".into()),
        }
        .normalize()
        .expect("valid draft");
        assert_eq!(draft.image, None);
        assert_eq!(draft.text, "body");
    }

    #[test]
    fn oversized_image_reference_is_rejected() {
        let draft = PostDraft {
            text: "body".into(),
            group_id: None,
            image: Some("x".repeat(MAX_IMAGE_REF_LEN + 1)),
        };
        assert!(matches!(
            draft.normalize(),
            Err(DomainError::Validation { .. })
        ));
    }
}
