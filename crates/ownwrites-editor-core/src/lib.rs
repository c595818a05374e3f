//! ownwrites-editor-core: the post editor, minus any UI framework.
//!
//! This crate provides:
//! - `ContentSurface` - HTML content model with caret offsets, formatting commands and undo
//! - `SelectionTracker` plus the text and image floating toolbars
//! - `DraftState` / `PostPayload` - the post being edited and what gets submitted
//! - `AutosaveManager` - debounced local snapshots for posts not yet created
//! - `AiAssistant` / `PostBackend` - the external collaborators, as traits
//! - `Editor` - ties the above together and reports failures through a `Notifier`
//!
//! Hosts supply geometry through `LayoutPlatform` and interactive prompts
//! through `EditorHost`.

pub mod actions;
pub mod ai;
pub mod autosave;
pub mod backend;
pub mod block;
pub mod config;
pub mod dom;
pub mod draft;
pub mod editor;
pub mod error;
pub mod execute;
pub mod inline;
pub mod media;
pub mod notify;
pub mod outline;
pub mod platform;
pub mod selection;
pub mod surface;
pub mod toolbar;
pub mod types;
pub mod undo;

pub use actions::{EditorAction, HeadingLevel, Key, KeyCombo, KeydownResult, Modifiers, action_for_key};
pub use ai::{AiAssistant, GenerationOptions, LanguageModel, PromptedAssistant, Tone};
pub use autosave::{
    AutosaveManager, AutosaveSnapshot, AutosaveState, JsonFileStore, KeyValueStore, MemoryStore, autosave_key,
};
pub use backend::{MemoryBackend, PostBackend};
pub use config::{DEFAULT_FEATURED_IMAGE, EditorConfig};
pub use draft::{DraftState, PostPayload, PostRecord, PostStatus, PostType, is_blank_content};
pub use editor::Editor;
pub use error::{
    AiError, BackendError, CommandError, EditorError, StorageError, UnsupportedError, ValidationError,
};
pub use execute::{Command, execute_command};
pub use notify::{Level, Notification, NotificationLog, Notifier, TracingNotifier};
pub use outline::{FirstDraft, OutlineItem, outline_to_html, parse_outline};
pub use platform::{EditorHost, LayoutPlatform, NoLayout, PlatformError, Rect, ScriptedHost};
pub use selection::{PointerTarget, SelectionChange, SelectionContext, SelectionKind, SelectionTracker};
pub use smol_str::SmolStr;
pub use surface::{ContentSurface, ImageAlign, ImageSize};
pub use toolbar::{AiAction, ImageToolbar, PendingRewrite, TextToolbar, ToolbarAffordances};
pub use types::{Affinity, CursorState, ImageRef, Selection, TextRange};
pub use undo::UndoManager;
