//! Floating toolbars: text formatting with AI rewrites, and image layout.
//!
//! Both are driven by [`SelectionContext`] and only ever show one at a time.

use crate::ai::{AiAssistant, Tone};
use crate::config::EditorConfig;
use crate::error::{AiError, CommandError};
use crate::selection::{Anchor, SelectionContext, SelectionKind};
use crate::surface::{ContentSurface, ImageAlign, ImageSize};
use crate::types::{ImageRef, Selection, TextRange};

/// Which text toolbar controls are offered for the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolbarAffordances {
    pub formatting: bool,
    pub ai_assist: bool,
    /// Shareable quote-card image.
    pub text_image: bool,
}

impl ToolbarAffordances {
    pub fn for_text(selected: &str, config: &EditorConfig) -> Self {
        let len = selected.chars().count();
        Self {
            formatting: len > 0,
            ai_assist: len > config.ai_assist_min_chars,
            text_image: len > config.ai_assist_min_chars && len <= config.text_image_max_chars,
        }
    }
}

/// AI rewrites offered in the text toolbar's submenu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiAction {
    Improve,
    Summarize,
    ChangeTone(Tone),
}

impl AiAction {
    pub async fn run(self, ai: &impl AiAssistant, text: &str) -> Result<String, AiError> {
        match self {
            AiAction::Improve => ai.improve_text(text).await,
            AiAction::Summarize => ai.summarize_selection(text).await,
            AiAction::ChangeTone(tone) => ai.change_tone(text, tone).await,
        }
    }
}

/// A rewrite in flight: the text sent and the range its result replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRewrite {
    pub action: AiAction,
    pub text: String,
    pub range: TextRange,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextToolbar {
    pub visible: bool,
    pub anchor: Anchor,
    range: Option<TextRange>,
    selected_text: String,
    ai_menu_open: bool,
    loading: bool,
}

impl TextToolbar {
    /// Follow the tracker. Only text selections show this toolbar.
    pub fn sync(&mut self, ctx: &SelectionContext) {
        if self.loading {
            // Keep the range the rewrite will land on.
            return;
        }
        if ctx.kind == SelectionKind::Text {
            self.visible = true;
            self.anchor = ctx.anchor;
            self.range = ctx.text_range;
            self.selected_text = ctx.selected_text.clone();
        } else {
            self.hide();
        }
    }

    pub fn hide(&mut self) {
        *self = Self::default();
    }

    pub fn range(&self) -> Option<TextRange> {
        self.range
    }

    pub fn selected_text(&self) -> &str {
        &self.selected_text
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_ai_menu_open(&self) -> bool {
        self.ai_menu_open
    }

    pub fn affordances(&self, config: &EditorConfig) -> ToolbarAffordances {
        ToolbarAffordances::for_text(&self.selected_text, config)
    }

    pub fn toggle_ai_menu(&mut self, config: &EditorConfig) {
        self.ai_menu_open = !self.ai_menu_open && self.affordances(config).ai_assist;
    }

    /// Start a rewrite. Returns `None` when there's nothing to send.
    pub fn begin(&mut self, action: AiAction) -> Option<PendingRewrite> {
        let range = self.range?;
        if !self.visible || self.loading || self.selected_text.is_empty() {
            return None;
        }
        self.loading = true;
        self.ai_menu_open = false;
        Some(PendingRewrite {
            action,
            text: self.selected_text.clone(),
            range,
        })
    }

    /// Land a rewrite result on the surface.
    ///
    /// On success the original range is replaced and the toolbar hides. Failed
    /// requests and stale ranges leave the content as it was.
    pub fn finish(
        &mut self,
        pending: &PendingRewrite,
        result: Result<String, AiError>,
        surface: &mut ContentSurface,
    ) -> Result<Selection, RewriteError> {
        self.loading = false;
        let text = result.map_err(RewriteError::Ai)?;
        if let Err(e) = surface.validate(&pending.range) {
            tracing::warn!(action = ?pending.action, error = %e, "discarding stale AI rewrite");
            self.hide();
            return Err(RewriteError::Command(e));
        }
        let selection = surface.replace_range(&pending.range, &text)?;
        tracing::debug!(action = ?pending.action, chars = text.chars().count(), "AI rewrite applied");
        self.hide();
        Ok(selection)
    }
}

/// Why a rewrite did not land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    Ai(AiError),
    Command(CommandError),
}

impl From<CommandError> for RewriteError {
    fn from(e: CommandError) -> Self {
        RewriteError::Command(e)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageToolbar {
    pub visible: bool,
    pub anchor: Anchor,
    target: Option<ImageRef>,
}

impl ImageToolbar {
    pub fn sync(&mut self, ctx: &SelectionContext) {
        match (&ctx.kind, &ctx.image) {
            (SelectionKind::Image, Some(image)) => {
                self.visible = true;
                self.anchor = ctx.anchor;
                self.target = Some(image.clone());
            }
            _ => self.hide(),
        }
    }

    pub fn hide(&mut self) {
        *self = Self::default();
    }

    pub fn target(&self) -> Option<&[usize]> {
        self.target.as_ref().map(|image| image.wrapper.as_slice())
    }

    /// The target, checked against the surface's current generation.
    fn checked(&self, surface: &ContentSurface) -> Result<&ImageRef, CommandError> {
        let image = self.target.as_ref().ok_or(CommandError::NoImageTarget)?;
        surface.validate_image(image)?;
        Ok(image)
    }

    pub fn resize(&mut self, surface: &mut ContentSurface, size: ImageSize) -> Result<(), CommandError> {
        let wrapper = self.checked(surface)?.wrapper.clone();
        surface.set_image_size(&wrapper, size)?;
        self.restamp(surface);
        Ok(())
    }

    pub fn align(&mut self, surface: &mut ContentSurface, align: ImageAlign) -> Result<(), CommandError> {
        let wrapper = self.checked(surface)?.wrapper.clone();
        surface.set_image_align(&wrapper, align)?;
        self.restamp(surface);
        Ok(())
    }

    /// Remove the whole wrapper and close.
    pub fn delete(&mut self, surface: &mut ContentSurface) -> Result<(), CommandError> {
        let wrapper = self.checked(surface)?.wrapper.clone();
        surface.remove_image(&wrapper)?;
        self.hide();
        Ok(())
    }

    // Class swaps leave the wrapper where it was.
    fn restamp(&mut self, surface: &ContentSurface) {
        if let Some(image) = self.target.as_mut() {
            image.generation = surface.generation();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_ctx(surface: &ContentSurface, start: usize, end: usize) -> SelectionContext {
        let range = surface.range(Selection::new(start, end)).unwrap();
        SelectionContext {
            kind: SelectionKind::Text,
            anchor: Anchor { top: 10.0, left: 20.0 },
            text_range: Some(range),
            selected_text: surface.text_in(start, end),
            image: None,
        }
    }

    fn image_ctx(surface: &ContentSurface, wrapper: Vec<usize>) -> SelectionContext {
        SelectionContext {
            kind: SelectionKind::Image,
            image: Some(ImageRef {
                wrapper,
                generation: surface.generation(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_ai_gating_boundary() {
        let config = EditorConfig::default();
        let ten = ToolbarAffordances::for_text("abcdefghij", &config);
        assert!(ten.formatting);
        assert!(!ten.ai_assist);
        let eleven = ToolbarAffordances::for_text("abcdefghijk", &config);
        assert!(eleven.ai_assist);
        assert!(eleven.text_image);
        let long = ToolbarAffordances::for_text(&"x".repeat(301), &config);
        assert!(long.formatting && long.ai_assist);
        assert!(!long.text_image);
    }

    #[test]
    fn test_menu_needs_long_selection() {
        let config = EditorConfig::default();
        let surface = ContentSurface::from_html("<p>short text and a longer tail</p>", 10);
        let mut toolbar = TextToolbar::default();
        toolbar.sync(&text_ctx(&surface, 0, 5));
        toolbar.toggle_ai_menu(&config);
        assert!(!toolbar.is_ai_menu_open());
        toolbar.sync(&text_ctx(&surface, 0, 20));
        toolbar.toggle_ai_menu(&config);
        assert!(toolbar.is_ai_menu_open());
    }

    #[test]
    fn test_rewrite_replaces_range() {
        let mut surface = ContentSurface::from_html("<p>teh quick fox</p>", 10);
        let mut toolbar = TextToolbar::default();
        toolbar.sync(&text_ctx(&surface, 0, 9));
        let pending = toolbar.begin(AiAction::Improve).unwrap();
        assert_eq!(pending.text, "teh quick");
        assert!(toolbar.is_loading());

        let sel = toolbar
            .finish(&pending, Ok("The quick".into()), &mut surface)
            .unwrap();
        assert_eq!(sel, Selection::new(0, 9));
        assert_eq!(surface.inner_html(), "<p>The quick fox</p>");
        assert!(!toolbar.visible);
    }

    #[test]
    fn test_failed_rewrite_keeps_content() {
        let mut surface = ContentSurface::from_html("<p>keep me as I am</p>", 10);
        let mut toolbar = TextToolbar::default();
        toolbar.sync(&text_ctx(&surface, 0, 7));
        let pending = toolbar.begin(AiAction::Summarize).unwrap();
        let err = toolbar
            .finish(&pending, Err(AiError::Request("offline".into())), &mut surface)
            .unwrap_err();
        assert!(matches!(err, RewriteError::Ai(_)));
        assert_eq!(surface.inner_html(), "<p>keep me as I am</p>");
        assert!(!toolbar.is_loading());
    }

    #[test]
    fn test_stale_rewrite_is_discarded() {
        let mut surface = ContentSurface::from_html("<p>hello world</p>", 10);
        let mut toolbar = TextToolbar::default();
        toolbar.sync(&text_ctx(&surface, 0, 5));
        let pending = toolbar.begin(AiAction::ChangeTone(Tone::Witty)).unwrap();
        surface.insert_text(Selection::collapsed(11), "!").unwrap();

        let err = toolbar
            .finish(&pending, Ok("Howdy".into()), &mut surface)
            .unwrap_err();
        assert!(matches!(err, RewriteError::Command(CommandError::StaleRange { .. })));
        assert_eq!(surface.inner_html(), "<p>hello world!</p>");
    }

    #[test]
    fn test_image_toolbar_actions() {
        let mut surface = ContentSurface::from_html(
            r#"<p>a</p><div class="img-container align-center size-full" contenteditable="false"><img src="x.png"></div>"#,
            10,
        );
        let mut toolbar = ImageToolbar::default();
        assert_eq!(toolbar.resize(&mut surface, ImageSize::Small), Err(CommandError::NoImageTarget));

        toolbar.sync(&image_ctx(&surface, vec![1]));
        toolbar.resize(&mut surface, ImageSize::Small).unwrap();
        toolbar.align(&mut surface, ImageAlign::Right).unwrap();
        assert_eq!(
            surface.inner_html(),
            r#"<p>a</p><div class="img-container size-sm align-right" contenteditable="false"><img src="x.png"></div>"#
        );
        toolbar.delete(&mut surface).unwrap();
        assert_eq!(surface.inner_html(), "<p>a</p>");
        assert!(!toolbar.visible);
    }

    #[test]
    fn test_image_target_goes_stale_after_other_edits() {
        let html = concat!(
            r#"<div class="img-container align-center size-full" contenteditable="false"><img src="first.png"></div>"#,
            r#"<div class="img-container align-center size-full" contenteditable="false"><img src="second.png"></div>"#,
            "<p>t</p>",
        );
        let mut surface = ContentSurface::from_html(html, 10);
        let mut toolbar = ImageToolbar::default();
        toolbar.sync(&image_ctx(&surface, vec![1]));

        // A rule above both images shifts second.png's wrapper to index 2.
        surface.insert_blocks(Selection::collapsed(0), crate::dom::parse_fragment("<hr>")).unwrap();
        let err = toolbar.delete(&mut surface).unwrap_err();
        assert!(matches!(err, CommandError::StaleRange { .. }));
        assert!(matches!(
            toolbar.resize(&mut surface, ImageSize::Small),
            Err(CommandError::StaleRange { .. })
        ));
        let html = surface.inner_html();
        assert!(html.contains("first.png") && html.contains("second.png"));
        assert!(!html.contains("size-sm"));
    }
}
