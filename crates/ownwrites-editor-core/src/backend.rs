//! Post backend boundary. Transport is the implementor's business.

use std::cell::RefCell;
use std::future::Future;

use smol_str::SmolStr;

use crate::draft::{PostPayload, PostRecord, PostStatus};
use crate::error::BackendError;

pub trait PostBackend {
    fn create_post(&self, payload: &PostPayload) -> impl Future<Output = Result<PostRecord, BackendError>>;

    fn update_post(
        &self,
        id: &str,
        payload: &PostPayload,
    ) -> impl Future<Output = Result<PostRecord, BackendError>>;
}

/// Backend that keeps posts in memory and records every call.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    posts: RefCell<Vec<PostRecord>>,
    calls: RefCell<Vec<PostPayload>>,
    /// When set, every call fails with this message.
    pub failure: Option<String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn last_payload(&self) -> Option<PostPayload> {
        self.calls.borrow().last().cloned()
    }

    pub fn posts(&self) -> Vec<PostRecord> {
        self.posts.borrow().clone()
    }

    fn record(&self, id: SmolStr, payload: &PostPayload) -> Result<PostRecord, BackendError> {
        self.calls.borrow_mut().push(payload.clone());
        if let Some(message) = &self.failure {
            return Err(BackendError::new(message.clone()));
        }
        let record = PostRecord {
            id,
            title: payload.title.clone(),
            content: payload.content.clone(),
            meta_description: Some(payload.meta_description.clone()),
            featured_image: Some(payload.featured_image.clone()),
            tags: payload.categories.clone(),
            status: if payload.published {
                PostStatus::Published
            } else {
                PostStatus::Draft
            },
            post_type: Some(payload.post_type),
            audio_url: Some(payload.audio_url.clone()),
            scheduled_publish_time: None,
        };
        let mut posts = self.posts.borrow_mut();
        posts.retain(|p| p.id != record.id);
        posts.push(record.clone());
        Ok(record)
    }
}

impl PostBackend for MemoryBackend {
    async fn create_post(&self, payload: &PostPayload) -> Result<PostRecord, BackendError> {
        let id = SmolStr::new((self.posts.borrow().len() + 1).to_string());
        self.record(id, payload)
    }

    async fn update_post(&self, id: &str, payload: &PostPayload) -> Result<PostRecord, BackendError> {
        if self.failure.is_none() && !self.posts.borrow().iter().any(|p| p.id == id) {
            self.calls.borrow_mut().push(payload.clone());
            return Err(BackendError::new("Post not found."));
        }
        self.record(SmolStr::new(id), payload)
    }
}
