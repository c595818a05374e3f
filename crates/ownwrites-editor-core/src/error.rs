//! Error types for the editor subsystem.
//!
//! Nothing here is allowed to crash the editor: every error ends up as a
//! [`Notification`] through [`EditorError::notification`].

use miette::Diagnostic;

use crate::notify::Notification;

/// Draft fails pre-submit validation. Checked before any network call.
#[derive(thiserror::Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title and content are required.")]
    #[diagnostic(code(ownwrites::validation::required))]
    EmptyTitleOrContent,

    #[error("Please select or add at least one category/tag.")]
    #[diagnostic(code(ownwrites::validation::tags))]
    NoTags,

    #[error("Please set a publish time for scheduled posts.")]
    #[diagnostic(code(ownwrites::validation::schedule))]
    MissingScheduleTime,

    #[error("Please enter a topic or title for the outline.")]
    #[diagnostic(code(ownwrites::validation::topic))]
    MissingTopic,

    #[error("A title and content are needed.")]
    #[diagnostic(code(ownwrites::validation::meta_input))]
    MetaNeedsTitleAndContent,

    #[error("Please provide a title to generate an image.")]
    #[diagnostic(code(ownwrites::validation::image_title))]
    ImageNeedsTitle,

    #[error("Please write some content or a title first.")]
    #[diagnostic(code(ownwrites::validation::suggestion_input))]
    NothingToSuggestFrom,
}

/// A formatting or structural command could not be applied.
#[derive(thiserror::Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Please select text to create a link.")]
    #[diagnostic(code(ownwrites::command::no_selection))]
    NoSelection,

    /// Range handle was taken before the surface last changed.
    #[error("selection is out of date (taken at generation {taken}, surface at {current})")]
    #[diagnostic(
        code(ownwrites::command::stale_range),
        help("re-read the selection after the content changes")
    )]
    StaleRange { taken: u64, current: u64 },

    #[error("offset {offset} is outside the document (length {len})")]
    #[diagnostic(code(ownwrites::command::out_of_bounds))]
    OutOfBounds { offset: usize, len: usize },

    #[error("no image is selected")]
    #[diagnostic(code(ownwrites::command::no_image))]
    NoImageTarget,
}

/// Failures of the AI collaborator.
#[derive(thiserror::Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum AiError {
    #[error("AI assistant is not configured")]
    #[diagnostic(code(ownwrites::ai::not_configured))]
    NotConfigured,

    #[error("AI request failed: {0}")]
    #[diagnostic(code(ownwrites::ai::request))]
    Request(String),

    #[error("AI returned an unusable response: {0}")]
    #[diagnostic(code(ownwrites::ai::invalid_response))]
    InvalidResponse(String),

    #[error("AI returned an invalid outline structure")]
    #[diagnostic(code(ownwrites::ai::invalid_outline))]
    InvalidOutline,

    #[error("AI returned an empty result")]
    #[diagnostic(code(ownwrites::ai::empty))]
    Empty,
}

/// The post backend rejected or failed a request.
#[derive(thiserror::Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
#[error("{message}")]
#[diagnostic(code(ownwrites::backend))]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Local key-value storage failure.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum StorageError {
    #[error("storage write failed: {0}")]
    #[diagnostic(code(ownwrites::storage::write))]
    Write(String),

    #[error(transparent)]
    #[diagnostic(code(ownwrites::storage::json))]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    File(#[from] ownwrites_common::CommonError),
}

/// Platform feature missing at the point of use (clipboard, speech, ...).
#[derive(thiserror::Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
#[error("{feature} is not supported in this environment")]
#[diagnostic(code(ownwrites::unsupported))]
pub struct UnsupportedError {
    pub feature: String,
}

/// Umbrella error for editor operations.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum EditorError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Unsupported(#[from] UnsupportedError),
}

impl EditorError {
    /// Map to the toast the user sees.
    ///
    /// User-correctable problems are warnings; failed external calls and
    /// missing platform features are errors.
    pub fn notification(&self) -> Notification {
        match self {
            EditorError::Validation(e) => Notification::warning(e.to_string()),
            EditorError::Command(e) => Notification::warning(e.to_string()),
            EditorError::Ai(e) => Notification::error(e.to_string()),
            EditorError::Backend(e) => Notification::error(e.to_string()),
            EditorError::Storage(e) => Notification::error(e.to_string()),
            EditorError::Unsupported(e) => Notification::error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Level;

    #[test]
    fn test_validation_maps_to_warning() {
        let n = EditorError::from(ValidationError::MissingScheduleTime).notification();
        assert_eq!(n.level, Level::Warning);
        assert_eq!(n.message, "Please set a publish time for scheduled posts.");
    }

    #[test]
    fn test_external_failures_map_to_error() {
        let n = EditorError::from(AiError::Request("quota".into())).notification();
        assert_eq!(n.level, Level::Error);
        let n = EditorError::from(UnsupportedError {
            feature: "Clipboard".into(),
        })
        .notification();
        assert_eq!(n.level, Level::Error);
        assert_eq!(n.message, "Clipboard is not supported in this environment");
    }
}
