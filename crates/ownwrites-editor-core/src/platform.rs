//! Platform abstraction traits for editor operations.
//!
//! These traits define the interface between the editor logic and whatever
//! renders it (browser DOM, native UI, a headless test harness). The editor
//! only ever asks questions through them; it never reaches into the platform.

use std::collections::VecDeque;

/// Error type for platform operations.
#[derive(Debug, Clone)]
pub struct PlatformError(pub String);

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for PlatformError {}

impl From<&str> for PlatformError {
    fn from(s: &str) -> Self {
        PlatformError(s.to_string())
    }
}

/// Viewport-relative box, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }
}

/// Geometry queries used to anchor floating toolbars.
pub trait LayoutPlatform {
    /// Bounding box of the content surface itself.
    fn surface_rect(&self) -> Rect;

    /// Bounding box of the rendered caret range `[start, end)`.
    ///
    /// Returns None if the range isn't currently laid out.
    fn range_rect(&self, start: usize, end: usize) -> Option<Rect>;

    /// Bounding box of the node at `path` (an `<img>`, typically).
    fn node_rect(&self, path: &[usize]) -> Option<Rect>;

    /// Current window scroll offset as `(x, y)`.
    fn scroll_offset(&self) -> (f64, f64);
}

/// Layout for hosts that render nothing. Every box is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLayout;

impl LayoutPlatform for NoLayout {
    fn surface_rect(&self) -> Rect {
        Rect::default()
    }

    fn range_rect(&self, _start: usize, _end: usize) -> Option<Rect> {
        Some(Rect::default())
    }

    fn node_rect(&self, _path: &[usize]) -> Option<Rect> {
        Some(Rect::default())
    }

    fn scroll_offset(&self) -> (f64, f64) {
        (0.0, 0.0)
    }
}

/// Interactive affordances the editor needs from its host UI.
pub trait EditorHost {
    /// Ask for a link URL. None when the user cancels.
    fn prompt_url(&mut self) -> Option<String>;

    /// "An unsaved draft was found. Do you want to restore it?"
    fn confirm_restore(&mut self) -> bool;

    /// Open a file picker for an image. Returns the raw file bytes.
    fn pick_image(&mut self) -> Option<Vec<u8>>;

    /// Put text on the system clipboard.
    fn write_clipboard(&mut self, text: &str) -> Result<(), PlatformError>;
}

/// Host with canned answers, for headless use and tests.
#[derive(Debug, Clone, Default)]
pub struct ScriptedHost {
    pub urls: VecDeque<String>,
    pub images: VecDeque<Vec<u8>>,
    pub accept_restore: bool,
    /// None means the clipboard is unavailable.
    pub clipboard: Option<String>,
    /// How many times a restore prompt was shown.
    pub restore_prompts: usize,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.urls.push_back(url.into());
        self
    }

    pub fn with_image(mut self, bytes: Vec<u8>) -> Self {
        self.images.push_back(bytes);
        self
    }

    pub fn accepting_restore(mut self, accept: bool) -> Self {
        self.accept_restore = accept;
        self
    }

    pub fn with_clipboard(mut self) -> Self {
        self.clipboard = Some(String::new());
        self
    }
}

impl EditorHost for ScriptedHost {
    fn prompt_url(&mut self) -> Option<String> {
        self.urls.pop_front()
    }

    fn confirm_restore(&mut self) -> bool {
        self.restore_prompts += 1;
        self.accept_restore
    }

    fn pick_image(&mut self) -> Option<Vec<u8>> {
        self.images.pop_front()
    }

    fn write_clipboard(&mut self, text: &str) -> Result<(), PlatformError> {
        match &mut self.clipboard {
            Some(clipboard) => {
                *clipboard = text.to_string();
                Ok(())
            }
            None => Err("clipboard API unavailable".into()),
        }
    }
}
