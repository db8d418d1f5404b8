use serde::Deserialize;
use uuid::Uuid;

use crate::application::pagination::PageNumber;
use crate::application::posts::PostError;
use crate::domain::posts::PostDraft;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    pub fn page_number(&self) -> PageNumber {
        PageNumber::parse(self.page.as_deref())
    }
}

/// Body of the create and edit post forms.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub text: String,
    pub group: String,
    pub image: String,
}

impl PostForm {
    /// Selected group, `None` for the empty option.
    pub fn group_id(&self) -> Result<Option<Uuid>, PostError> {
        let raw = self.group.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| PostError::UnknownGroup)
    }

    pub fn to_draft(&self) -> Result<PostDraft, PostError> {
        Ok(PostDraft {
            text: self.text.clone(),
            group_id: self.group_id()?,
            image: Some(self.image.clone()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub text: String,
}
