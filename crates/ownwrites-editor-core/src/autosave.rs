//! Debounced local persistence for drafts that have no server identity yet.
//!
//! ## Storage key strategy
//!
//! - New posts: `autosave-draft-new`
//! - Existing posts: `autosave-draft-{id}` (never written, only cleared)
//!
//! Writes are best-effort. A failed write is logged and dropped; the next
//! edit schedules another attempt.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use ownwrites_common::config::{FileStore, Loader, Saver};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use web_time::Instant;

use crate::draft::{DraftState, PostType, is_blank_content};
use crate::error::StorageError;

/// Prefix for all autosave keys.
pub const AUTOSAVE_KEY_PREFIX: &str = "autosave-draft-";

/// Storage key for a post, `new` when it has no server id.
pub fn autosave_key(post_id: Option<&str>) -> String {
    format!("{}{}", AUTOSAVE_KEY_PREFIX, post_id.unwrap_or("new"))
}

/// String-keyed durable storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &mut T {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// In-memory store. Can be told to fail writes, like a full quota would.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    /// Successful `set` calls so far.
    pub writes: usize,
    pub fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Write("quota exceeded".into()));
        }
        self.entries.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Whole-map JSON file. Every operation reads the file fresh.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    file: FileStore,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            file: FileStore::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Every entry, in key order.
    pub fn entries(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.file.exists() {
            return Ok(BTreeMap::new());
        }
        let entries: BTreeMap<String, String> = self.file.load()?;
        Ok(entries)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries()?;
        entries.insert(key.to_string(), value.to_string());
        Ok(self.file.save(&entries)?)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries()?;
        if entries.remove(key).is_some() {
            self.file.save(&entries)?;
        }
        Ok(())
    }
}

/// The persisted subset of a draft.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutosaveSnapshot {
    pub title: String,
    pub content: String,
    pub meta_description: String,
    pub selected_tags: Vec<SmolStr>,
    pub featured_image: String,
    pub post_type: PostType,
    pub audio_url: String,
}

impl AutosaveSnapshot {
    pub fn from_draft(draft: &DraftState) -> Self {
        Self {
            title: draft.title.clone(),
            content: draft.content_html.clone(),
            meta_description: draft.meta_description.clone(),
            selected_tags: draft.tags().to_vec(),
            featured_image: draft.featured_image.clone(),
            post_type: draft.post_type,
            audio_url: draft.audio_url.clone(),
        }
    }

    /// Worth offering back to the user.
    pub fn is_restorable(&self) -> bool {
        !self.title.is_empty() || !self.content.is_empty()
    }

    /// Overwrite the snapshot's fields in `draft`. Identity, status and schedule are untouched.
    pub fn apply_to(&self, draft: &mut DraftState) {
        draft.title = self.title.clone();
        draft.content_html = self.content.clone();
        draft.meta_description = self.meta_description.clone();
        draft.set_tags(self.selected_tags.iter().map(SmolStr::as_str));
        draft.featured_image = self.featured_image.clone();
        draft.post_type = self.post_type;
        draft.audio_url = self.audio_url.clone();
    }
}

/// Whether a draft has anything worth writing.
fn is_worth_saving(draft: &DraftState) -> bool {
    !draft.title.is_empty() || !is_blank_content(&draft.content_html)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutosaveState {
    #[default]
    Idle,
    /// Debounce running; fires at `deadline`.
    Pending { deadline: Instant },
    /// Last scheduled write landed.
    Committed,
}

/// Trailing-debounce autosave for one draft key.
#[derive(Debug)]
pub struct AutosaveManager<S> {
    store: S,
    key: String,
    delay: Duration,
    /// False once the post has a server identity.
    enabled: bool,
    state: AutosaveState,
    restore_checked: bool,
}

impl<S: KeyValueStore> AutosaveManager<S> {
    pub fn new(store: S, post_id: Option<&str>, delay: Duration) -> Self {
        Self {
            store,
            key: autosave_key(post_id),
            delay,
            enabled: post_id.is_none(),
            state: AutosaveState::Idle,
            restore_checked: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> AutosaveState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Stop autosaving for good, e.g. once the post exists on the server.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.state = AutosaveState::Idle;
    }

    /// (Re)start the debounce. A pending timer is pushed back.
    pub fn schedule(&mut self, now: Instant) {
        if !self.enabled {
            return;
        }
        let deadline = now + self.delay;
        tracing::trace!(key = %self.key, delay_ms = self.delay.as_millis() as u64, "autosave scheduled");
        self.state = AutosaveState::Pending { deadline };
    }

    /// Fire the write if the debounce has elapsed. Returns true if a snapshot was written.
    pub fn poll(&mut self, now: Instant, draft: &DraftState) -> bool {
        let AutosaveState::Pending { deadline } = self.state else {
            return false;
        };
        if now < deadline {
            return false;
        }
        self.state = AutosaveState::Idle;
        if !self.enabled || draft.has_server_identity() || !is_worth_saving(draft) {
            return false;
        }

        let snapshot = AutosaveSnapshot::from_draft(draft);
        let written = serde_json::to_string(&snapshot)
            .map_err(StorageError::from)
            .and_then(|json| {
                let bytes = json.len();
                self.store.set(&self.key, &json).map(|_| bytes)
            });
        match written {
            Ok(bytes) => {
                tracing::debug!(key = %self.key, bytes, "autosave committed");
                self.state = AutosaveState::Committed;
                true
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "autosave write failed");
                false
            }
        }
    }

    /// One-shot check on mount for a snapshot worth restoring.
    ///
    /// Only new posts are checked, and only the first call looks.
    pub fn check_restore(&mut self) -> Option<AutosaveSnapshot> {
        if !self.enabled || self.restore_checked {
            return None;
        }
        self.restore_checked = true;
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "autosave read failed");
                return None;
            }
        };
        match serde_json::from_str::<AutosaveSnapshot>(&raw) {
            Ok(snapshot) if snapshot.is_restorable() => Some(snapshot),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "autosave snapshot unreadable");
                None
            }
        }
    }

    /// Delete the snapshot after a successful submit.
    pub fn clear(&mut self) {
        self.state = AutosaveState::Idle;
        if let Err(e) = self.store.remove(&self.key) {
            tracing::warn!(key = %self.key, error = %e, "autosave clear failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    const DELAY: Duration = Duration::from_millis(5000);

    fn draft(title: &str, content: &str) -> DraftState {
        let mut draft = DraftState::new();
        draft.title = title.into();
        draft.content_html = content.into();
        draft
    }

    #[test]
    fn test_debounce_resets() {
        let mut mgr = AutosaveManager::new(MemoryStore::new(), None, DELAY);
        let t0 = Instant::now();
        let d = draft("Hello", "<p>World</p>");

        mgr.schedule(t0);
        mgr.schedule(t0 + Duration::from_millis(4000));
        assert!(!mgr.poll(t0 + Duration::from_millis(6000), &d));
        assert!(matches!(mgr.state(), AutosaveState::Pending { .. }));
        assert!(mgr.poll(t0 + Duration::from_millis(9000), &d));
        assert_eq!(mgr.state(), AutosaveState::Committed);
        assert_eq!(mgr.store().writes, 1);
        assert!(!mgr.poll(t0 + Duration::from_millis(20000), &d));
    }

    #[test]
    fn test_existing_post_never_writes() {
        let mut mgr = AutosaveManager::new(MemoryStore::new(), Some("abc"), DELAY);
        assert_eq!(mgr.key(), "autosave-draft-abc");
        let t0 = Instant::now();
        let mut d = draft("Hello", "<p>World</p>");
        d.id = Some("abc".into());
        for i in 0..50 {
            mgr.schedule(t0 + Duration::from_secs(i));
            mgr.poll(t0 + Duration::from_secs(i * 10), &d);
        }
        assert_eq!(mgr.state(), AutosaveState::Idle);
        assert_eq!(mgr.store().writes, 0);
        assert!(mgr.check_restore().is_none());
    }

    #[test]
    fn test_blank_draft_is_not_written() {
        let mut mgr = AutosaveManager::new(MemoryStore::new(), None, DELAY);
        let t0 = Instant::now();
        mgr.schedule(t0);
        assert!(!mgr.poll(t0 + DELAY, &draft("", "<p><br></p>")));
        mgr.schedule(t0);
        assert!(!mgr.poll(t0 + DELAY, &draft("", "   ")));
        assert!(mgr.store().is_empty());
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let store = MemoryStore {
            fail_writes: true,
            ..Default::default()
        };
        let mut mgr = AutosaveManager::new(store, None, DELAY);
        let t0 = Instant::now();
        mgr.schedule(t0);
        assert!(!mgr.poll(t0 + DELAY, &draft("Hello", "")));
        assert_eq!(mgr.state(), AutosaveState::Idle);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let mut d = draft("Hello", "<p>World</p>");
        d.add_custom_tag("rust");
        assert_snapshot!(
            serde_json::to_string(&AutosaveSnapshot::from_draft(&d)).unwrap(),
            @r#"{"title":"Hello","content":"<p>World</p>","metaDescription":"","selectedTags":["rust"],"featuredImage":"","postType":"blog","audioUrl":""}"#
        );
    }

    #[test]
    fn test_restore_checked_once_and_defaults_missing_fields() {
        let mut store = MemoryStore::new();
        store.set("autosave-draft-new", r#"{"title":"Old"}"#).unwrap();
        let mut mgr = AutosaveManager::new(store, None, DELAY);
        let snapshot = mgr.check_restore().unwrap();
        assert_eq!(snapshot.title, "Old");
        assert_eq!(snapshot.post_type, PostType::Blog);
        assert!(mgr.check_restore().is_none());

        let mut store = MemoryStore::new();
        store.set("autosave-draft-new", r#"{"metaDescription":"only meta"}"#).unwrap();
        let mut mgr = AutosaveManager::new(store, None, DELAY);
        assert!(mgr.check_restore().is_none());
    }

    #[test]
    fn test_json_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts.json");
        let mut store = JsonFileStore::new(&path);
        assert_eq!(store.get("autosave-draft-new").unwrap(), None);
        store.set("autosave-draft-new", "{}").unwrap();
        store.set("autosave-draft-7", "{\"title\":\"x\"}").unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("autosave-draft-new").unwrap().as_deref(), Some("{}"));
        assert_eq!(reopened.entries().unwrap().len(), 2);

        store.remove("autosave-draft-new").unwrap();
        assert_eq!(reopened.get("autosave-draft-new").unwrap(), None);
    }
}
