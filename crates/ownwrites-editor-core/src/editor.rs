//! The post editor: one draft, its content surface, and everything around it.
//!
//! Every user-initiated change runs in the same order: mutate the surface,
//! re-read its markup into the draft, then (re)schedule autosave. Failures
//! never escape as panics; each is turned into a [`Notification`] at the point
//! it happens and also returned so programmatic callers can react.

use chrono::{DateTime, Utc};
use web_time::Instant;

use crate::actions::{EditorAction, Key, KeyCombo, KeydownResult, Modifiers, action_for_key};
use crate::ai::AiAssistant;
use crate::autosave::{AutosaveManager, KeyValueStore};
use crate::backend::PostBackend;
use crate::config::EditorConfig;
use crate::dom::{Element, Node};
use crate::draft::{DraftState, PostRecord, PostStatus, PostType, is_blank_content};
use crate::error::{AiError, EditorError, UnsupportedError, ValidationError};
use crate::execute::{Command, check_link_selection, execute_command, normalize_link_url};
use crate::media;
use crate::notify::{Notification, Notifier};
use crate::outline::{FirstDraft, OutlineItem, outline_to_nodes};
use crate::platform::{EditorHost, LayoutPlatform};
use crate::selection::{PointerTarget, SelectionChange, SelectionContext, SelectionTracker};
use crate::surface::{ContentSurface, ImageAlign, ImageSize};
use crate::toolbar::{AiAction, ImageToolbar, PendingRewrite, RewriteError, TextToolbar, ToolbarAffordances};
use crate::types::Selection;
use crate::undo::UndoManager;

/// Characters of plain content fed into the featured-image prompt.
const FEATURED_IMAGE_CONTEXT_CHARS: usize = 100;

pub struct Editor<S, N> {
    config: EditorConfig,
    draft: DraftState,
    surface: ContentSurface,
    /// Last caret/selection the user placed. `None` until the surface is focused.
    selection: Option<Selection>,
    tracker: SelectionTracker,
    text_toolbar: TextToolbar,
    image_toolbar: ImageToolbar,
    autosave: AutosaveManager<S>,
    notifier: N,
    suggestions: Vec<String>,
}

impl<S: KeyValueStore, N: Notifier> Editor<S, N> {
    fn with_draft(config: EditorConfig, draft: DraftState, store: S, notifier: N) -> Self {
        let surface = ContentSurface::from_html(&draft.content_html, config.undo_depth);
        let autosave = AutosaveManager::new(store, draft.id.as_deref(), config.autosave_delay());
        let tracker = SelectionTracker::new(config.toolbar_offset_px);
        let mut editor = Self {
            config,
            draft,
            surface,
            selection: None,
            tracker,
            text_toolbar: TextToolbar::default(),
            image_toolbar: ImageToolbar::default(),
            autosave,
            notifier,
            suggestions: Vec::new(),
        };
        // State drives the surface on load; from here on the surface drives the state.
        editor.draft.content_html = editor.surface.inner_html();
        editor
    }

    /// Blank editor for a post that doesn't exist on the server yet.
    pub fn new_post(config: EditorConfig, store: S, notifier: N) -> Self {
        Self::with_draft(config, DraftState::new(), store, notifier)
    }

    /// Edit a post fetched from the backend. Autosave stays off.
    pub fn edit_post(config: EditorConfig, record: &PostRecord, store: S, notifier: N) -> Self {
        Self::with_draft(config, DraftState::from_record(record), store, notifier)
    }

    /// New post seeded from an AI-written draft.
    pub fn from_first_draft(config: EditorConfig, first: FirstDraft, store: S, notifier: N) -> Self {
        let mut draft = DraftState::new();
        draft.title = first.title;
        draft.content_html = first.content;
        Self::with_draft(config, draft, store, notifier)
    }

    /// Run once after construction. Offers to restore an autosaved draft.
    ///
    /// Returns true if a snapshot was restored. Declining leaves it in storage.
    pub fn mount(&mut self, host: &mut impl EditorHost) -> bool {
        let Some(snapshot) = self.autosave.check_restore() else {
            return false;
        };
        if !host.confirm_restore() {
            tracing::debug!(key = self.autosave.key(), "restore declined");
            return false;
        }
        snapshot.apply_to(&mut self.draft);
        self.surface.set_inner_html(&snapshot.content);
        self.draft.content_html = self.surface.inner_html();
        self.selection = None;
        self.tracker.dismiss();
        self.sync_toolbars();
        self.notifier.notify(Notification::info("Draft restored."));
        tracing::debug!(key = self.autosave.key(), "draft restored");
        true
    }

    // === Accessors ===

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn draft(&self) -> &DraftState {
        &self.draft
    }

    pub fn content_html(&self) -> &str {
        &self.draft.content_html
    }

    pub fn surface(&self) -> &ContentSurface {
        &self.surface
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn selection_context(&self) -> &SelectionContext {
        self.tracker.context()
    }

    pub fn text_toolbar(&self) -> &TextToolbar {
        &self.text_toolbar
    }

    pub fn image_toolbar(&self) -> &ImageToolbar {
        &self.image_toolbar
    }

    pub fn affordances(&self) -> ToolbarAffordances {
        self.text_toolbar.affordances(&self.config)
    }

    pub fn autosave(&self) -> &AutosaveManager<S> {
        &self.autosave
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    // === Plumbing ===

    /// Draft fields changed; restart the debounce.
    fn touch(&mut self) {
        self.autosave.schedule(Instant::now());
    }

    /// Surface changed: re-read it, then schedule autosave.
    ///
    /// An image selection taken before the change no longer names a reliable
    /// wrapper, so it is dropped.
    fn after_mutation(&mut self) {
        let stale = self
            .tracker
            .context()
            .image
            .as_ref()
            .is_some_and(|image| self.surface.validate_image(image).is_err());
        if stale {
            tracing::debug!("image selection invalidated by edit");
            self.tracker.dismiss();
            self.sync_toolbars();
        }
        self.draft.content_html = self.surface.inner_html();
        self.touch();
    }

    fn sync_toolbars(&mut self) {
        let ctx = self.tracker.context();
        self.text_toolbar.sync(ctx);
        self.image_toolbar.sync(ctx);
    }

    fn fail(&mut self, err: impl Into<EditorError>) -> EditorError {
        let err = err.into();
        self.notifier.notify(err.notification());
        err
    }

    /// Report with a fixed user-facing message, keeping the typed error for the caller.
    fn fail_with(&mut self, notification: Notification, err: impl Into<EditorError>) -> EditorError {
        let err = err.into();
        tracing::warn!(error = %err, message = %notification.message, "editor operation failed");
        self.notifier.notify(notification);
        err
    }

    /// Drive pending autosave. Call from the host's timer loop.
    pub fn autosave_tick(&mut self, now: Instant) -> bool {
        self.autosave.poll(now, &self.draft)
    }

    // === Draft fields ===

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
        self.touch();
    }

    pub fn set_meta_description(&mut self, meta: impl Into<String>) {
        self.draft.meta_description = meta.into();
        self.touch();
    }

    pub fn meta_remaining(&self) -> i64 {
        self.draft.meta_remaining(self.config.meta_description_max_chars)
    }

    pub fn set_post_type(&mut self, post_type: PostType) {
        self.draft.post_type = post_type;
        self.touch();
    }

    pub fn set_audio_url(&mut self, url: impl Into<String>) {
        self.draft.audio_url = url.into();
        self.touch();
    }

    pub fn set_status(&mut self, status: PostStatus) {
        self.draft.status = status;
    }

    pub fn set_scheduled_publish_time(&mut self, at: Option<DateTime<Utc>>) {
        self.draft.scheduled_publish_time = at;
    }

    pub fn toggle_tag(&mut self, tag: &str) {
        self.draft.toggle_tag(tag);
        self.touch();
    }

    pub fn add_custom_tag(&mut self, input: &str) -> bool {
        let added = self.draft.add_custom_tag(input);
        if added {
            self.touch();
        }
        added
    }

    pub fn set_featured_image_url(&mut self, url: impl Into<String>) {
        self.draft.featured_image = url.into();
        self.touch();
    }

    /// Featured image from a picked file, inlined as a data URI.
    pub fn set_featured_image_file(&mut self, bytes: &[u8]) {
        self.draft.featured_image = media::data_uri(bytes);
        self.touch();
    }

    // === Typing and selection ===

    /// Caret moved by the user's own input.
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = Some(selection);
    }

    pub fn type_text(&mut self, text: &str) -> Result<(), EditorError> {
        let selection = self.selection.unwrap_or_else(|| Selection::collapsed(self.surface.len()));
        match self.surface.insert_text(selection, text) {
            Ok(caret) => {
                self.selection = Some(Selection::collapsed(caret));
                self.after_mutation();
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn delete_backward(&mut self) -> Result<(), EditorError> {
        let Some(selection) = self.selection else {
            return Ok(());
        };
        let before = self.surface.generation();
        match self.surface.delete_backward(selection) {
            Ok(caret) => {
                self.selection = Some(Selection::collapsed(caret));
                if self.surface.generation() != before {
                    self.after_mutation();
                }
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn on_selection_change(&mut self, change: SelectionChange, layout: &impl LayoutPlatform) {
        if let SelectionChange::Range(sel) = change {
            self.selection = Some(sel);
        }
        self.tracker.on_selection_change(change, &self.surface, layout);
        self.sync_toolbars();
    }

    pub fn on_image_click(&mut self, img_path: &[usize], layout: &impl LayoutPlatform) -> bool {
        let shown = self.tracker.on_image_click(img_path, &self.surface, layout);
        self.sync_toolbars();
        shown
    }

    pub fn on_pointer_down(&mut self, target: &PointerTarget) {
        self.tracker.on_pointer_down(target);
        self.sync_toolbars();
    }

    pub fn on_viewport_change(&mut self) {
        self.tracker.on_viewport_change();
        self.sync_toolbars();
    }

    // === Commands ===

    /// Run a toolbar button or shortcut.
    pub fn dispatch(&mut self, action: EditorAction, host: &mut impl EditorHost) -> Result<(), EditorError> {
        let command = match action {
            EditorAction::InsertLink => {
                let selection = self.selection.unwrap_or(Selection::collapsed(0));
                if let Err(e) = check_link_selection(&self.surface, selection) {
                    return Err(self.fail(e));
                }
                let Some(url) = host.prompt_url().as_deref().and_then(normalize_link_url) else {
                    return Ok(());
                };
                Command::Link { url }
            }
            EditorAction::InsertImage => {
                // Remember where the caret was before the picker steals focus.
                let at = self.selection;
                let Some(bytes) = host.pick_image() else {
                    return Ok(());
                };
                Command::InsertImage {
                    src: media::data_uri(&bytes),
                    at,
                }
            }
            other => match Command::from_action(other) {
                Some(command) => command,
                None => return Ok(()),
            },
        };
        self.run_command(&command)
    }

    /// Execute a resolved command against the current selection.
    pub fn run_command(&mut self, command: &Command) -> Result<(), EditorError> {
        let history_only = matches!(command, Command::Undo | Command::Redo);
        let selection = match self.selection {
            Some(selection) => selection,
            None if history_only || matches!(command, Command::InsertImage { .. }) => Selection::collapsed(0),
            // Nothing focused; formatting has nothing to act on.
            None => return Ok(()),
        };
        if history_only && !self.can_run_history(command) {
            return Ok(());
        }
        match execute_command(&mut self.surface, selection, command) {
            Ok(after) => {
                self.selection = Some(after);
                self.after_mutation();
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn can_run_history(&self, command: &Command) -> bool {
        match command {
            Command::Undo => self.surface.can_undo(),
            Command::Redo => self.surface.can_redo(),
            _ => true,
        }
    }

    /// Shortcuts go through the same path as toolbar buttons. Plain Backspace deletes.
    pub fn handle_key(&mut self, combo: &KeyCombo, host: &mut impl EditorHost) -> KeydownResult {
        if combo.key == Key::Backspace && combo.modifiers == Modifiers::NONE {
            let _ = self.delete_backward();
            return KeydownResult::Handled;
        }
        match action_for_key(combo) {
            Some(action) => {
                // Already reported through the notifier.
                let _ = self.dispatch(action, host);
                KeydownResult::Handled
            }
            None => KeydownResult::NotHandled,
        }
    }

    // === Image toolbar ===

    pub fn resize_image(&mut self, size: ImageSize) -> Result<(), EditorError> {
        match self.image_toolbar.resize(&mut self.surface, size) {
            Ok(()) => {
                self.tracker.refresh_image(&self.surface);
                self.after_mutation();
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn align_image(&mut self, align: ImageAlign) -> Result<(), EditorError> {
        match self.image_toolbar.align(&mut self.surface, align) {
            Ok(()) => {
                self.tracker.refresh_image(&self.surface);
                self.after_mutation();
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn delete_image(&mut self) -> Result<(), EditorError> {
        match self.image_toolbar.delete(&mut self.surface) {
            Ok(()) => {
                self.tracker.dismiss();
                self.selection = self.selection.map(|s| {
                    let len = self.surface.len();
                    Selection::new(s.anchor.min(len), s.head.min(len))
                });
                self.after_mutation();
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    // === AI: text toolbar ===

    pub fn toggle_ai_menu(&mut self) {
        self.text_toolbar.toggle_ai_menu(&self.config);
    }

    /// Start a rewrite of the current text selection.
    pub fn begin_ai_action(&mut self, action: AiAction) -> Option<PendingRewrite> {
        self.text_toolbar.begin(action)
    }

    /// Land a rewrite. Content is untouched on failure or if the surface moved on.
    pub fn finish_ai_action(
        &mut self,
        pending: &PendingRewrite,
        result: Result<String, AiError>,
    ) -> Result<(), EditorError> {
        match self.text_toolbar.finish(pending, result, &mut self.surface) {
            Ok(selection) => {
                self.selection = Some(selection);
                self.tracker.dismiss();
                self.after_mutation();
                Ok(())
            }
            Err(RewriteError::Ai(e)) => Err(self.fail(e)),
            Err(RewriteError::Command(e)) => {
                self.tracker.dismiss();
                Err(self.fail(e))
            }
        }
    }

    pub async fn run_ai_action(&mut self, action: AiAction, ai: &impl AiAssistant) -> Result<(), EditorError> {
        let Some(pending) = self.begin_ai_action(action) else {
            return Ok(());
        };
        let result = action.run(ai, &pending.text).await;
        self.finish_ai_action(&pending, result)
    }

    /// Quote-card image for the current selection, when it's short enough.
    pub async fn generate_text_image(&mut self, ai: &impl AiAssistant) -> Result<Option<String>, EditorError> {
        if !self.affordances().text_image {
            return Ok(None);
        }
        let text = self.text_toolbar.selected_text().to_string();
        match ai.generate_text_image(&text).await {
            Ok(image) => Ok(image),
            Err(e) => Err(self.fail_with(Notification::error("Failed to generate text image."), e)),
        }
    }

    // === AI: outline, suggestions, metadata ===

    pub async fn generate_outline(
        &mut self,
        topic: &str,
        ai: &impl AiAssistant,
    ) -> Result<Vec<OutlineItem>, EditorError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(self.fail(ValidationError::MissingTopic));
        }
        let outline = match ai.generate_outline(topic).await {
            Ok(outline) => outline,
            Err(e) => return Err(self.fail_with(Notification::error("Failed to generate post outline."), e)),
        };
        match outline.first() {
            None => {
                self.notifier.notify(Notification::info(
                    "AI did not return an outline. Try a different topic.",
                ));
                Ok(outline)
            }
            Some(first) if first.text.to_lowercase().contains("error") => {
                let message = first.text.clone();
                Err(self.fail_with(Notification::error(message.clone()), AiError::InvalidResponse(message)))
            }
            Some(_) => Ok(outline),
        }
    }

    /// Append an outline at the end of the content.
    pub fn apply_outline(&mut self, outline: &[OutlineItem]) {
        if outline.is_empty() {
            return;
        }
        let mut nodes = Vec::new();
        if !is_blank_content(&self.surface.inner_html()) {
            nodes.push(Node::from(Element::new("br")));
        }
        nodes.extend(outline_to_nodes(outline));
        self.surface.append_nodes(nodes);
        self.after_mutation();
        self.notifier.notify(Notification::success("Outline added to content editor!"));
    }

    pub async fn fetch_suggestions(&mut self, ai: &impl AiAssistant) -> Result<(), EditorError> {
        let content = self.surface.inner_html();
        if content.trim().is_empty() && self.draft.title.trim().is_empty() {
            return Err(self.fail(ValidationError::NothingToSuggestFrom));
        }
        match ai.content_suggestions(&self.draft.title, &content).await {
            Ok(suggestions) => {
                self.suggestions = suggestions;
                Ok(())
            }
            Err(e) => Err(self.fail_with(Notification::error("Failed to get AI suggestions."), e)),
        }
    }

    /// Append a suggestion as its own paragraph.
    pub fn apply_suggestion(&mut self, suggestion: &str) {
        let paragraph = Element::new("p").with_children(vec![Node::text(suggestion)]);
        self.surface.append_nodes(vec![paragraph.into()]);
        self.suggestions.clear();
        self.after_mutation();
    }

    pub async fn generate_meta_description(&mut self, ai: &impl AiAssistant) -> Result<(), EditorError> {
        let content = self.surface.inner_html();
        if content.trim().is_empty() || self.draft.title.trim().is_empty() {
            return Err(self.fail(ValidationError::MetaNeedsTitleAndContent));
        }
        match ai.generate_meta_description(&self.draft.title, &content).await {
            Ok(meta) => {
                self.set_meta_description(meta);
                self.notifier.notify(Notification::success("Meta description generated!"));
                Ok(())
            }
            Err(e) => Err(self.fail_with(Notification::error("Failed to generate meta description."), e)),
        }
    }

    pub async fn generate_featured_image(&mut self, ai: &impl AiAssistant) -> Result<(), EditorError> {
        if self.draft.title.trim().is_empty() {
            return Err(self.fail(ValidationError::ImageNeedsTitle));
        }
        let text = self.surface.text();
        let mut prompt = self.draft.title.clone();
        if !text.is_empty() {
            prompt.push_str(": ");
            prompt.extend(text.chars().take(FEATURED_IMAGE_CONTEXT_CHARS));
        }
        match ai.generate_featured_image(&prompt).await {
            Ok(Some(image)) => {
                self.set_featured_image_url(image);
                self.notifier.notify(Notification::success("Featured image generated!"));
                Ok(())
            }
            Ok(None) => Err(self.fail_with(
                Notification::warning("Could not generate featured image."),
                AiError::Empty,
            )),
            Err(e) => Err(self.fail_with(Notification::error("Error generating image."), e)),
        }
    }

    // === Clipboard ===

    pub fn copy_selection(&mut self, host: &mut impl EditorHost) -> Result<(), EditorError> {
        let Some(selection) = self.selection.filter(|s| !s.is_collapsed()) else {
            return Ok(());
        };
        let text = self.surface.text_in(selection.start(), selection.end());
        if let Err(e) = host.write_clipboard(&text) {
            tracing::warn!(error = %e, "clipboard write failed");
            return Err(self.fail(UnsupportedError {
                feature: "Clipboard".into(),
            }));
        }
        Ok(())
    }

    // === Submit ===

    /// Validate, then create or update the post.
    ///
    /// Nothing reaches the backend if validation fails. On success the
    /// autosave snapshot is deleted; on failure the draft is left as it was.
    pub async fn submit(&mut self, status: PostStatus, backend: &impl PostBackend) -> Result<PostRecord, EditorError> {
        self.draft.content_html = self.surface.inner_html();
        if let Err(e) = self.draft.validate(status) {
            return Err(self.fail(e));
        }
        let payload = self.draft.payload(status, &self.config.default_featured_image);
        let (verb, result) = match self.draft.id.clone() {
            Some(id) => ("update", backend.update_post(&id, &payload).await),
            None => ("create", backend.create_post(&payload).await),
        };
        match result {
            Ok(record) => {
                self.autosave.clear();
                if self.draft.id.is_none() {
                    self.draft.id = Some(record.id.clone());
                    self.autosave.disable();
                }
                self.draft.status = status;
                tracing::debug!(id = %record.id, %status, verb, "post saved");
                self.notifier.notify(Notification::success(format!("Post {verb}d as {status}!")));
                Ok(record)
            }
            Err(e) => {
                let message = format!("Failed to {verb} post. {}", e.message);
                Err(self.fail_with(Notification::error(message.trim_end()), e))
            }
        }
    }
}

impl<S: KeyValueStore, N: Notifier> std::fmt::Debug for Editor<S, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("draft", &self.draft)
            .field("selection", &self.selection)
            .field("generation", &self.surface.generation())
            .field("autosave", &self.autosave.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autosave::{AutosaveState, MemoryStore};
    use crate::notify::NotificationLog;
    use crate::platform::ScriptedHost;

    fn blank() -> Editor<MemoryStore, NotificationLog> {
        let draft = FirstDraft {
            title: String::new(),
            content: "<p><br></p>".into(),
        };
        Editor::from_first_draft(EditorConfig::default(), draft, MemoryStore::new(), NotificationLog::new())
    }

    #[test]
    fn test_typing_replaces_placeholder() {
        let mut editor = blank();
        editor.set_selection(Selection::collapsed(0));
        editor.type_text("Hi").unwrap();
        assert_eq!(editor.content_html(), "<p>Hi</p>");
        assert_eq!(editor.selection(), Some(Selection::collapsed(2)));
        let backspace = KeyCombo::new(Key::Backspace);
        assert_eq!(editor.handle_key(&backspace, &mut ScriptedHost::new()), KeydownResult::Handled);
        assert_eq!(editor.content_html(), "<p>H</p>");
    }

    #[test]
    fn test_dispatch_resyncs_then_schedules() {
        let mut editor = blank();
        assert_eq!(editor.autosave().state(), AutosaveState::Idle);
        editor.set_selection(Selection::collapsed(0));
        editor.type_text("words").unwrap();
        editor.set_selection(Selection::new(0, 5));
        editor
            .dispatch(EditorAction::Italic, &mut ScriptedHost::new())
            .unwrap();
        assert_eq!(editor.content_html(), "<p><i>words</i></p>");
        assert!(matches!(editor.autosave().state(), AutosaveState::Pending { .. }));
    }

    #[test]
    fn test_formatting_without_focus_is_a_no_op() {
        let mut editor = blank();
        editor
            .dispatch(EditorAction::Bold, &mut ScriptedHost::new())
            .unwrap();
        assert_eq!(editor.content_html(), "<p><br></p>");
        assert_eq!(editor.autosave().state(), AutosaveState::Idle);
    }

    #[test]
    fn test_custom_tags_dedupe() {
        let mut editor = blank();
        assert!(editor.add_custom_tag("  Rust "));
        assert!(!editor.add_custom_tag("rust"));
        assert!(!editor.add_custom_tag("   "));
        editor.toggle_tag("Rust");
        assert!(editor.draft().tags().is_empty());
    }
}
