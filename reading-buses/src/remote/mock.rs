//! Mock remote source for testing without API access.
//!
//! Serves canned payloads per URL and counts how often each URL was fetched,
//! so tests can tell cache hits from remote fetches.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::source::{FetchError, RemoteSource};

/// A canned answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// 200 with this body.
    Body(Vec<u8>),
    /// Non-success status with this body.
    Status(u16, String),
}

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<String, VecDeque<MockResponse>>,
    fetches: HashMap<String, usize>,
}

/// Remote source that serves registered responses.
///
/// Responses registered for the same URL are served in order; the last one
/// keeps being served once the others are used up. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    state: Arc<Mutex<MockState>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `{name}` files from a directory and serve each for `url_for(name)`.
    pub fn from_dir(
        dir: impl AsRef<Path>,
        url_for: impl Fn(&str) -> Option<String>,
    ) -> std::io::Result<Self> {
        let source = Self::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(url) = url_for(name) {
                source.respond(url, std::fs::read(&path)?);
            }
        }
        Ok(source)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // a panic while holding the lock only happens in a failing test
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a successful response for `url`.
    pub fn respond(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> &Self {
        self.push(url.into(), MockResponse::Body(body.into()))
    }

    /// Queue a failing response for `url`.
    pub fn respond_with_status(
        &self,
        url: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> &Self {
        self.push(url.into(), MockResponse::Status(status, body.into()))
    }

    fn push(&self, url: String, response: MockResponse) -> &Self {
        self.lock()
            .responses
            .entry(url)
            .or_default()
            .push_back(response);
        self
    }

    /// How many times `url` was fetched.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.lock().fetches.get(url).copied().unwrap_or(0)
    }

    /// How many fetches happened in total.
    pub fn total_fetches(&self) -> usize {
        self.lock().fetches.values().sum()
    }

    fn next_response(&self, url: &str) -> Option<MockResponse> {
        let mut state = self.lock();
        *state.fetches.entry(url.to_string()).or_default() += 1;

        let queue = state.responses.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl RemoteSource for MockSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        match self.next_response(url) {
            Some(MockResponse::Body(body)) => Ok(body),
            Some(MockResponse::Status(status, body)) => Err(FetchError::Status { status, body }),
            None => Err(FetchError::Unmocked(url.to_string())),
        }
    }
}
