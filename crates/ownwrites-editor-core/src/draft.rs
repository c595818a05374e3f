//! The post being composed, and what gets handed to the backend on submit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    #[default]
    Blog,
    Article,
    Podcast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Scheduled,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Scheduled => "scheduled",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Markup that counts as "nothing written yet".
pub fn is_blank_content(html: &str) -> bool {
    html.trim().is_empty() || html == "<p><br></p>"
}

/// In-memory state of the post being edited.
///
/// `content_html` mirrors the content surface and is only written by the editor
/// after a surface mutation or on hydration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DraftState {
    /// Server identity. `None` until the post has been created.
    pub id: Option<SmolStr>,
    pub title: String,
    pub content_html: String,
    pub meta_description: String,
    pub post_type: PostType,
    /// Only meaningful for podcasts.
    pub audio_url: String,
    tags: Vec<SmolStr>,
    pub status: PostStatus,
    pub scheduled_publish_time: Option<DateTime<Utc>>,
    /// Remote URL or a `data:` URI. Empty means "use the default".
    pub featured_image: String,
}

impl DraftState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hydrate from a post fetched from the backend.
    pub fn from_record(record: &PostRecord) -> Self {
        let mut draft = Self {
            id: Some(record.id.clone()),
            title: record.title.clone(),
            content_html: record.content.clone(),
            meta_description: record.meta_description.clone().unwrap_or_default(),
            post_type: record.post_type.unwrap_or_default(),
            audio_url: record.audio_url.clone().unwrap_or_default(),
            tags: Vec::new(),
            status: record.status,
            scheduled_publish_time: record.scheduled_publish_time,
            featured_image: record.featured_image.clone().unwrap_or_default(),
        };
        draft.set_tags(record.tags.iter().map(SmolStr::as_str));
        draft
    }

    pub fn has_server_identity(&self) -> bool {
        self.id.is_some()
    }

    pub fn tags(&self) -> &[SmolStr] {
        &self.tags
    }

    /// Replace the tag set, keeping the first spelling of case-insensitive duplicates.
    pub fn set_tags<'a>(&mut self, tags: impl IntoIterator<Item = &'a str>) {
        self.tags.clear();
        for tag in tags {
            self.add_custom_tag(tag);
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == tag)
    }

    /// Chip toggle: remove the exact tag if present, add it otherwise.
    pub fn toggle_tag(&mut self, tag: &str) {
        if let Some(idx) = self.tags.iter().position(|t| t == tag) {
            self.tags.remove(idx);
        } else if !self.has_tag(tag) {
            self.tags.push(SmolStr::new(tag));
        }
    }

    /// Add a user-typed tag. Returns false when it was blank or already present.
    pub fn add_custom_tag(&mut self, input: &str) -> bool {
        let tag = input.trim();
        if tag.is_empty() || self.has_tag(tag) {
            return false;
        }
        self.tags.push(SmolStr::new(tag));
        true
    }

    /// Characters left before the meta description hits `max`. Negative when over.
    pub fn meta_remaining(&self, max: usize) -> i64 {
        max as i64 - self.meta_description.chars().count() as i64
    }

    pub fn is_content_blank(&self) -> bool {
        is_blank_content(&self.content_html)
    }

    /// Pre-submit checks, in the order the user sees them.
    pub fn validate(&self, status: PostStatus) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() || self.is_content_blank() {
            return Err(ValidationError::EmptyTitleOrContent);
        }
        if self.tags.is_empty() {
            return Err(ValidationError::NoTags);
        }
        if status == PostStatus::Scheduled && self.scheduled_publish_time.is_none() {
            return Err(ValidationError::MissingScheduleTime);
        }
        Ok(())
    }

    pub fn payload(&self, status: PostStatus, default_featured_image: &str) -> PostPayload {
        let featured_image = if self.featured_image.is_empty() {
            default_featured_image.to_string()
        } else {
            self.featured_image.clone()
        };
        PostPayload {
            title: self.title.clone(),
            content: self.content_html.clone(),
            categories: self.tags.clone(),
            featured_image,
            meta_description: self.meta_description.clone(),
            post_type: self.post_type,
            audio_url: self.audio_url.clone(),
            published: status != PostStatus::Draft,
        }
    }
}

/// Body of a create/update request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPayload {
    pub title: String,
    pub content: String,
    pub categories: Vec<SmolStr>,
    pub featured_image: String,
    pub meta_description: String,
    pub post_type: PostType,
    pub audio_url: String,
    pub published: bool,
}

/// A post as the backend returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub id: SmolStr,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub tags: Vec<SmolStr>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_type: Option<PostType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_publish_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn ready() -> DraftState {
        let mut draft = DraftState::new();
        draft.title = "Hello".into();
        draft.content_html = "<p>World</p>".into();
        draft.add_custom_tag("rust");
        draft
    }

    #[test]
    fn test_custom_tags_dedupe_case_insensitively() {
        let mut draft = DraftState::new();
        assert!(draft.add_custom_tag("  Rust "));
        assert!(!draft.add_custom_tag("rust"));
        assert!(!draft.add_custom_tag("   "));
        assert!(draft.add_custom_tag("Tokio"));
        assert_eq!(draft.tags(), ["Rust", "Tokio"]);

        draft.toggle_tag("Rust");
        assert_eq!(draft.tags(), ["Tokio"]);
        draft.toggle_tag("Web");
        assert_eq!(draft.tags(), ["Tokio", "Web"]);
    }

    #[test]
    fn test_validation_order() {
        let mut draft = DraftState::new();
        draft.content_html = "<p><br></p>".into();
        draft.title = "T".into();
        assert_eq!(draft.validate(PostStatus::Draft), Err(ValidationError::EmptyTitleOrContent));

        draft.content_html = "<p>x</p>".into();
        assert_eq!(draft.validate(PostStatus::Draft), Err(ValidationError::NoTags));

        draft.add_custom_tag("t");
        assert_eq!(
            draft.validate(PostStatus::Scheduled),
            Err(ValidationError::MissingScheduleTime)
        );
        assert_eq!(draft.validate(PostStatus::Published), Ok(()));
    }

    #[test]
    fn test_payload_shape() {
        let draft = ready();
        let payload = draft.payload(PostStatus::Scheduled, "https://img.test/default.png");
        assert_snapshot!(
            serde_json::to_string(&payload).unwrap(),
            @r#"{"title":"Hello","content":"<p>World</p>","categories":["rust"],"featuredImage":"https://img.test/default.png","metaDescription":"","postType":"blog","audioUrl":"","published":true}"#
        );
        assert!(!draft.payload(PostStatus::Draft, "").published);
    }

    #[test]
    fn test_hydrate_from_record() {
        let record: PostRecord = serde_json::from_str(
            r#"{"id":"42","title":"T","content":"<p>c</p>","tags":["a","A","b"],"status":"published","postType":"podcast","audioUrl":"https://a.test/ep.mp3"}"#,
        )
        .unwrap();
        let draft = DraftState::from_record(&record);
        assert!(draft.has_server_identity());
        assert_eq!(draft.tags(), ["a", "b"]);
        assert_eq!(draft.post_type, PostType::Podcast);
        assert_eq!(draft.status, PostStatus::Published);
        assert_eq!(draft.meta_description, "");
    }

    #[test]
    fn test_meta_remaining() {
        let mut draft = DraftState::new();
        draft.meta_description = "é".repeat(150);
        assert_eq!(draft.meta_remaining(160), 10);
        draft.meta_description.push_str(&"x".repeat(20));
        assert_eq!(draft.meta_remaining(160), -10);
    }
}
