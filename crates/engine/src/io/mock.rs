use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;

use super::{FetchRequest, FetchResponse, NetworkFetch};
use crate::error::TransportError;

/// Network fetch double that replays canned responses and records requests.
///
/// Responses are consumed in order. Once the queue is drained the last
/// response is repeated; with nothing queued at all, fetches fail with
/// [`TransportError::NoResponse`].
#[derive(Debug, Default)]
pub struct MockFetch {
    responses: Mutex<VecDeque<Result<FetchResponse, TransportError>>>,
    last_response: Mutex<Option<Result<FetchResponse, TransportError>>>,
    requests: Mutex<Vec<FetchRequest>>,
    delay: Option<Duration>,
}

impl MockFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, response: FetchResponse) -> Self {
        lock(&self.responses).push_back(Ok(response));
        self
    }

    /// Queue a `200 OK` response carrying `body` as JSON.
    pub fn with_json(self, body: Value) -> Self {
        self.with_response(FetchResponse::json(200, &body))
    }

    pub fn with_error(self, error: TransportError) -> Self {
        lock(&self.responses).push_back(Err(error));
        self
    }

    /// Sleep for `delay` before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<FetchRequest> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    fn next_response(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError> {
        let mut last_response = lock(&self.last_response);
        if let Some(response) = lock(&self.responses).pop_front() {
            *last_response = Some(response);
        }
        last_response.clone().unwrap_or_else(|| {
            Err(TransportError::NoResponse {
                method: request.method.as_str().to_string(),
                url: request.url.clone(),
            })
        })
    }
}

#[async_trait]
impl NetworkFetch for MockFetch {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, TransportError> {
        lock(&self.requests).push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next_response(&request)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::HttpMethod;
    use indexmap::IndexMap;
    use serde_json::json;

    fn request(url: &str) -> FetchRequest {
        FetchRequest {
            method: HttpMethod::Post,
            url: url.into(),
            headers: IndexMap::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn test_replays_in_order_then_repeats_last() {
        let fetch = MockFetch::new().with_json(json!({"n": 1})).with_json(json!({"n": 2}));
        assert_eq!(fetch.fetch(request("https://a")).await.unwrap().body, r#"{"n":1}"#);
        assert_eq!(fetch.fetch(request("https://b")).await.unwrap().body, r#"{"n":2}"#);
        assert_eq!(fetch.fetch(request("https://c")).await.unwrap().body, r#"{"n":2}"#);
        assert_eq!(fetch.call_count(), 3);
        assert_eq!(fetch.requests()[1].url, "https://b");
    }

    #[tokio::test]
    async fn test_empty_mock_fails() {
        let fetch = MockFetch::new();
        let error = fetch.fetch(request("https://a")).await.unwrap_err();
        assert_eq!(
            error,
            TransportError::NoResponse {
                method: "POST".into(),
                url: "https://a".into()
            }
        );
    }
}
