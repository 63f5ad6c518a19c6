//! Scripted fetcher for tests and local simulation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use edge_core::{RequestDescriptor, ResponseEntry};

use crate::client::{FetchError, Fetcher};

#[derive(Debug, Clone)]
enum Reply {
    Respond(ResponseEntry),
    Fail,
}

#[derive(Debug, Default)]
struct MockState {
    replies: HashMap<String, Reply>,
    offline: bool,
    calls: Vec<String>,
}

/// In-memory fetcher with scripted replies keyed by absolute URL.
///
/// Unscripted URLs answer `404 Not Found`. Every call is recorded, so tests
/// can assert that a cache hit never reached the network.
#[derive(Debug, Default)]
pub struct MockFetcher {
    state: Mutex<MockState>,
}

impl MockFetcher {
    /// Create an empty mock fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response for a URL, replacing any earlier script.
    pub fn respond(&self, url: &str, response: ResponseEntry) -> &Self {
        self.state()
            .replies
            .insert(url.to_string(), Reply::Respond(response));
        self
    }

    /// Script a transport failure for a URL.
    pub fn fail(&self, url: &str) -> &Self {
        self.state().replies.insert(url.to_string(), Reply::Fail);
        self
    }

    /// Make every request fail, regardless of scripts.
    pub fn go_offline(&self) {
        self.state().offline = true;
    }

    /// Restore scripted behaviour after `go_offline`.
    pub fn go_online(&self) {
        self.state().offline = false;
    }

    /// URLs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Number of times a URL was fetched.
    pub fn call_count(&self, url: &str) -> usize {
        self.state().calls.iter().filter(|u| u.as_str() == url).count()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseEntry, FetchError> {
        let url = request.url().as_str().to_string();
        let mut state = self.state();
        state.calls.push(url.clone());

        if state.offline {
            return Err(FetchError::Offline(url));
        }

        match state.replies.get(&url) {
            Some(Reply::Respond(response)) => Ok(response.clone()),
            Some(Reply::Fail) => Err(FetchError::Connection(format!("scripted failure for {url}"))),
            None => Ok(ResponseEntry::new(404)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_response() {
        let fetcher = MockFetcher::new();
        fetcher.respond("https://example.com/a", ResponseEntry::ok("a"));

        let req = RequestDescriptor::get("https://example.com/a").unwrap();
        let resp = fetcher.fetch(&req).await.unwrap();

        assert_eq!(resp.body_text(), "a");
        assert_eq!(fetcher.call_count("https://example.com/a"), 1);
    }

    #[tokio::test]
    async fn test_unscripted_is_not_found() {
        let fetcher = MockFetcher::new();
        let req = RequestDescriptor::get("https://example.com/missing").unwrap();
        let resp = fetcher.fetch(&req).await.unwrap();
        assert_eq!(resp.status, 404);
    }

    #[tokio::test]
    async fn test_offline_overrides_scripts() {
        let fetcher = MockFetcher::new();
        fetcher.respond("https://example.com/a", ResponseEntry::ok("a"));
        fetcher.go_offline();

        let req = RequestDescriptor::get("https://example.com/a").unwrap();
        assert!(matches!(fetcher.fetch(&req).await, Err(FetchError::Offline(_))));

        fetcher.go_online();
        assert!(fetcher.fetch(&req).await.is_ok());
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let fetcher = MockFetcher::new();
        fetcher.fail("https://example.com/down");
        let req = RequestDescriptor::get("https://example.com/down").unwrap();
        assert!(matches!(fetcher.fetch(&req).await, Err(FetchError::Connection(_))));
    }
}
