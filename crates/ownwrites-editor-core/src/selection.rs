//! Selection tracking: classify the current selection and anchor a toolbar to it.
//!
//! The tracker only reads the surface. Everything it hands out (range handles,
//! image handles) is re-validated against the surface before use.

use crate::platform::LayoutPlatform;
use crate::surface::ContentSurface;
use crate::dom::NodePath;
use crate::types::{ImageRef, Selection, TextRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionKind {
    #[default]
    None,
    Text,
    Image,
}

/// Where a floating toolbar goes, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Anchor {
    pub top: f64,
    pub left: f64,
}

/// What the platform reports on a selection-change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    /// Caret only, no range.
    Collapsed,
    /// A range whose common ancestor is outside the surface.
    Outside,
    /// A range inside the surface.
    Range(Selection),
}

/// What a pointer-down landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerTarget {
    Surface,
    TextToolbar,
    ImageToolbar,
    /// An `<img>` inside the surface, by node path.
    Image(NodePath),
    Outside,
}

/// Ephemeral result of the last selection event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionContext {
    pub kind: SelectionKind,
    pub anchor: Anchor,
    pub text_range: Option<TextRange>,
    /// Text of the selected range, untrimmed.
    pub selected_text: String,
    /// The selected image's wrapper. Relation only; the surface owns it.
    pub image: Option<ImageRef>,
}

#[derive(Debug, Clone)]
pub struct SelectionTracker {
    context: SelectionContext,
    toolbar_offset: f64,
}

impl SelectionTracker {
    pub fn new(toolbar_offset: f64) -> Self {
        Self {
            context: SelectionContext::default(),
            toolbar_offset,
        }
    }

    pub fn context(&self) -> &SelectionContext {
        &self.context
    }

    pub fn kind(&self) -> SelectionKind {
        self.context.kind
    }

    /// Drop back to `None`, hiding whichever toolbar was showing.
    pub fn dismiss(&mut self) {
        if self.context.kind != SelectionKind::None {
            tracing::debug!(kind = ?self.context.kind, "selection dismissed");
        }
        self.context = SelectionContext::default();
    }

    /// Recompute on a selection-change event.
    ///
    /// Ignored while the image toolbar is up: it has to be dismissed before the
    /// text toolbar can show.
    pub fn on_selection_change(
        &mut self,
        change: SelectionChange,
        surface: &ContentSurface,
        layout: &impl LayoutPlatform,
    ) -> &SelectionContext {
        if self.context.kind == SelectionKind::Image {
            return &self.context;
        }
        let selection = match change {
            SelectionChange::Collapsed | SelectionChange::Outside => {
                self.dismiss();
                return &self.context;
            }
            SelectionChange::Range(sel) if sel.is_collapsed() => {
                self.dismiss();
                return &self.context;
            }
            SelectionChange::Range(sel) => sel,
        };

        let Ok(range) = surface.range(selection) else {
            self.dismiss();
            return &self.context;
        };
        let text = surface.text_in(range.start, range.end);
        let Some(rect) = layout.range_rect(range.start, range.end) else {
            self.dismiss();
            return &self.context;
        };
        if text.trim().is_empty() {
            self.dismiss();
            return &self.context;
        }

        let surface_rect = layout.surface_rect();
        self.context = SelectionContext {
            kind: SelectionKind::Text,
            anchor: Anchor {
                top: rect.top - surface_rect.top - self.toolbar_offset,
                left: rect.left - surface_rect.left + rect.width / 2.0,
            },
            text_range: Some(range),
            selected_text: text,
            image: None,
        };
        tracing::debug!(
            start = range.start,
            end = range.end,
            chars = self.context.selected_text.chars().count(),
            "text selection"
        );
        &self.context
    }

    /// A direct click on an image. Only images in an `img-container` wrapper count.
    ///
    /// Returns true if the image toolbar should now show.
    pub fn on_image_click(
        &mut self,
        img_path: &[usize],
        surface: &ContentSurface,
        layout: &impl LayoutPlatform,
    ) -> bool {
        let Some(image) = surface.image_ref(img_path) else {
            return false;
        };
        let Some(rect) = layout.node_rect(img_path) else {
            return false;
        };
        let (scroll_x, scroll_y) = layout.scroll_offset();
        self.context = SelectionContext {
            kind: SelectionKind::Image,
            anchor: Anchor {
                top: rect.top + scroll_y - self.toolbar_offset,
                left: rect.left + scroll_x + rect.width / 2.0,
            },
            text_range: None,
            selected_text: String::new(),
            image: Some(image),
        };
        tracing::debug!(path = ?img_path, "image selection");
        true
    }

    /// Clicks anywhere but the open toolbar (or, for images, the image itself) dismiss it.
    pub fn on_pointer_down(&mut self, target: &PointerTarget) {
        let keep = match self.context.kind {
            SelectionKind::None => return,
            SelectionKind::Text => matches!(target, PointerTarget::TextToolbar),
            SelectionKind::Image => match target {
                PointerTarget::ImageToolbar => true,
                PointerTarget::Image(path) => {
                    path.split_last().map(|(_, parent)| parent)
                        == self.context.image.as_ref().map(|i| i.wrapper.as_slice())
                }
                _ => false,
            },
        };
        if !keep {
            self.dismiss();
        }
    }

    /// Re-stamp the image handle after an edit that left the wrapper in place.
    pub fn refresh_image(&mut self, surface: &ContentSurface) {
        if let Some(image) = self.context.image.as_mut() {
            image.generation = surface.generation();
        }
    }

    /// Anchors go stale on scroll or resize; close instead of repositioning.
    pub fn on_viewport_change(&mut self) {
        self.dismiss();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Rect;

    struct FixedLayout;

    impl LayoutPlatform for FixedLayout {
        fn surface_rect(&self) -> Rect {
            Rect::new(100.0, 20.0, 600.0, 400.0)
        }

        fn range_rect(&self, _start: usize, _end: usize) -> Option<Rect> {
            Some(Rect::new(180.0, 60.0, 80.0, 18.0))
        }

        fn node_rect(&self, _path: &[usize]) -> Option<Rect> {
            Some(Rect::new(300.0, 40.0, 200.0, 120.0))
        }

        fn scroll_offset(&self) -> (f64, f64) {
            (0.0, 250.0)
        }
    }

    fn image_surface() -> ContentSurface {
        ContentSurface::from_html(
            r#"<p>Some words here</p><div class="img-container align-center size-full"><img src="a.png"></div>"#,
            10,
        )
    }

    #[test]
    fn test_text_selection_anchor() {
        let surface = image_surface();
        let mut tracker = SelectionTracker::new(50.0);
        let ctx = tracker.on_selection_change(SelectionChange::Range(Selection::new(0, 10)), &surface, &FixedLayout);
        assert_eq!(ctx.kind, SelectionKind::Text);
        assert_eq!(ctx.anchor, Anchor { top: 30.0, left: 80.0 });
        assert_eq!(ctx.selected_text, "Some words");
    }

    #[test]
    fn test_whitespace_only_selection_is_none() {
        let surface = ContentSurface::from_html("<p>a   b</p>", 10);
        let mut tracker = SelectionTracker::new(50.0);
        let ctx = tracker.on_selection_change(SelectionChange::Range(Selection::new(1, 4)), &surface, &FixedLayout);
        assert_eq!(ctx.kind, SelectionKind::None);
    }

    #[test]
    fn test_collapsed_hides() {
        let surface = image_surface();
        let mut tracker = SelectionTracker::new(50.0);
        tracker.on_selection_change(SelectionChange::Range(Selection::new(0, 4)), &surface, &FixedLayout);
        tracker.on_selection_change(SelectionChange::Collapsed, &surface, &FixedLayout);
        assert_eq!(tracker.kind(), SelectionKind::None);
        assert!(tracker.context().text_range.is_none());
    }

    #[test]
    fn test_image_click_and_exclusivity() {
        let surface = image_surface();
        let img = surface.image_at(15).unwrap();
        let mut tracker = SelectionTracker::new(50.0);
        assert!(tracker.on_image_click(&img, &surface, &FixedLayout));
        assert_eq!(tracker.context().anchor, Anchor { top: 500.0, left: 140.0 });
        let image = tracker.context().image.clone().unwrap();
        assert_eq!(image.wrapper, vec![1]);
        assert!(surface.validate_image(&image).is_ok());

        // Text selections can't take over until the image toolbar is dismissed.
        tracker.on_selection_change(SelectionChange::Range(Selection::new(0, 4)), &surface, &FixedLayout);
        assert_eq!(tracker.kind(), SelectionKind::Image);

        tracker.on_pointer_down(&PointerTarget::Image(img.clone()));
        assert_eq!(tracker.kind(), SelectionKind::Image);
        tracker.on_pointer_down(&PointerTarget::ImageToolbar);
        assert_eq!(tracker.kind(), SelectionKind::Image);
        tracker.on_pointer_down(&PointerTarget::Surface);
        assert_eq!(tracker.kind(), SelectionKind::None);
    }

    #[test]
    fn test_unwrapped_image_is_ignored() {
        let surface = ContentSurface::from_html(r#"<p><img src="a.png"></p>"#, 10);
        let img = surface.image_at(0).unwrap();
        let mut tracker = SelectionTracker::new(50.0);
        assert!(!tracker.on_image_click(&img, &surface, &FixedLayout));
        assert_eq!(tracker.kind(), SelectionKind::None);
    }

    #[test]
    fn test_scroll_closes() {
        let surface = image_surface();
        let mut tracker = SelectionTracker::new(50.0);
        tracker.on_selection_change(SelectionChange::Range(Selection::new(0, 4)), &surface, &FixedLayout);
        tracker.on_pointer_down(&PointerTarget::TextToolbar);
        assert_eq!(tracker.kind(), SelectionKind::Text);
        tracker.on_viewport_change();
        assert_eq!(tracker.kind(), SelectionKind::None);
    }
}
