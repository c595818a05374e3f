use std::path::Path;
use std::time::Duration;

use ownwrites_common::CommonError;
use ownwrites_common::config::{FileStore, Loader};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FEATURED_IMAGE: &str = "https://picsum.photos/seed/default-post/800/400";

/// Editor tuning knobs. Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Trailing debounce before a draft snapshot is written.
    pub autosave_delay_ms: u64,
    /// The AI submenu needs strictly more selected characters than this.
    pub ai_assist_min_chars: usize,
    /// Upper bound for the shareable-text-image action.
    pub text_image_max_chars: usize,
    pub meta_description_max_chars: usize,
    /// Floating toolbars sit this far above their anchor.
    pub toolbar_offset_px: f64,
    /// Used in the payload when no featured image is set.
    pub default_featured_image: String,
    pub undo_depth: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_delay_ms: 5000,
            ai_assist_min_chars: 10,
            text_image_max_chars: 300,
            meta_description_max_chars: 160,
            toolbar_offset_px: 50.0,
            default_featured_image: DEFAULT_FEATURED_IMAGE.to_string(),
            undo_depth: 100,
        }
    }
}

impl EditorConfig {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Load from a `.json` or `.toml` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CommonError> {
        let store = FileStore::new(path);
        let config: Self = store.load()?;
        tracing::debug!(path = %store.path().display(), "loaded editor config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.toml");
        std::fs::write(&path, "autosave_delay_ms = 1500\n").unwrap();
        let config = EditorConfig::load(&path).unwrap();
        assert_eq!(config.autosave_delay(), Duration::from_millis(1500));
        assert_eq!(config.ai_assist_min_chars, 10);
        assert_eq!(config.default_featured_image, DEFAULT_FEATURED_IMAGE);
    }
}
