//! High-level websets operations: create → poll → list.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value, json};
use tracing::warn;

use crate::error::WebsetsError;

use super::client::WebsetsClient;

/// Default poll interval while waiting for a webset to complete.
const POLL_INTERVAL: Duration = Duration::from_secs(10);

fn op(context: &'static str, source: WebsetsError) -> WebsetsError {
    WebsetsError::Op {
        context,
        source: Box::new(source),
    }
}

/// The create → poll → list protocol over a [`WebsetsClient`].
pub struct WebsetsOperations {
    client: Arc<dyn WebsetsClient>,
}

impl WebsetsOperations {
    /// Creates the operations layer over `client`.
    #[must_use]
    pub fn new(client: Arc<dyn WebsetsClient>) -> Self {
        Self { client }
    }

    /// Creates a webset for `search_query` and returns its resource id.
    ///
    /// # Errors
    ///
    /// Returns the call failure annotated with `failed to create webset`,
    /// or a parse error when the response lacks a `resourceId`.
    pub async fn create_webset(
        &self,
        search_query: &str,
        result_count: usize,
    ) -> Result<String, WebsetsError> {
        let args = arguments(json!({
            "operation": "create_webset",
            "webset": {
                "searchQuery": search_query,
                "advanced": {
                    "resultCount": result_count,
                },
            },
        }));

        let response = self
            .client
            .call(args)
            .await
            .map_err(|e| op("failed to create webset", e))?;

        let parsed: Value =
            serde_json::from_str(&response).map_err(|e| WebsetsError::Parse {
                what: "create response",
                message: e.to_string(),
            })?;

        parsed
            .get("resourceId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(WebsetsError::Parse {
                what: "create response",
                message: "no resourceId in create response".to_string(),
            })
    }

    /// Fetches the raw status JSON for a webset.
    ///
    /// # Errors
    ///
    /// Returns the underlying call failure.
    pub async fn get_webset_status(&self, webset_id: &str) -> Result<String, WebsetsError> {
        let args = arguments(json!({
            "operation": "get_webset_status",
            "resourceId": webset_id,
        }));
        self.client.call(args).await
    }

    /// Lists content items from a completed webset.
    ///
    /// # Errors
    ///
    /// Returns the call failure annotated with
    /// `failed to list content items`, or a parse error.
    pub async fn list_content_items(
        &self,
        webset_id: &str,
        limit: usize,
    ) -> Result<Vec<Map<String, Value>>, WebsetsError> {
        let args = arguments(json!({
            "operation": "list_content_items",
            "resourceId": webset_id,
            "query": {
                "limit": limit,
            },
        }));

        let response = self
            .client
            .call(args)
            .await
            .map_err(|e| op("failed to list content items", e))?;

        let parsed: Value =
            serde_json::from_str(&response).map_err(|e| WebsetsError::Parse {
                what: "list response",
                message: e.to_string(),
            })?;

        let items = parsed
            .get("items")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|item| item.as_object().cloned())
                    .collect()
            })
            .unwrap_or_default();

        Ok(items)
    }

    /// Polls the webset status until it completes, fails, or the deadline
    /// passes. Status check and parse failures are logged and polling
    /// continues; unknown status values likewise.
    ///
    /// # Errors
    ///
    /// [`WebsetsError::ProcessingFailed`] on `status=failed` and
    /// [`WebsetsError::CompletionTimeout`] on deadline.
    pub async fn wait_for_completion(
        &self,
        webset_id: &str,
        timeout: Duration,
    ) -> Result<(), WebsetsError> {
        self.wait_for_completion_with(webset_id, timeout, POLL_INTERVAL)
            .await
    }

    /// [`WebsetsOperations::wait_for_completion`] with an explicit poll
    /// interval.
    pub async fn wait_for_completion_with(
        &self,
        webset_id: &str,
        timeout: Duration,
        poll: Duration,
    ) -> Result<(), WebsetsError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut ticker = tokio::time::interval(poll);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first interval tick completes immediately; the Go-style
        // ticker fires only after one period, so consume it.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if tokio::time::Instant::now() > deadline {
                return Err(WebsetsError::CompletionTimeout);
            }

            let status_text = match self.get_webset_status(webset_id).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(webset_id, error = %e, "status check error");
                    continue;
                }
            };

            let parsed: Value = match serde_json::from_str(&status_text) {
                Ok(value) => value,
                Err(e) => {
                    warn!(webset_id, error = %e, "failed to parse status");
                    continue;
                }
            };

            match parsed.get("status").and_then(Value::as_str) {
                Some("completed") => return Ok(()),
                Some("failed") => return Err(WebsetsError::ProcessingFailed),
                Some("processing" | "pending") | None => {}
                Some(other) => warn!(webset_id, status = other, "unknown webset status"),
            }
        }
    }
}

fn arguments(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Client scripted per operation name.
    struct MockWebsetsClient<F>
    where
        F: Fn(&Map<String, Value>) -> Result<String, WebsetsError> + Send + Sync,
    {
        call_fn: F,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl<F> WebsetsClient for MockWebsetsClient<F>
    where
        F: Fn(&Map<String, Value>) -> Result<String, WebsetsError> + Send + Sync,
    {
        async fn connect(&self) -> Result<(), WebsetsError> {
            Ok(())
        }

        async fn call(&self, arguments: Map<String, Value>) -> Result<String, WebsetsError> {
            let operation = arguments
                .get("operation")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(operation);
            }
            (self.call_fn)(&arguments)
        }

        async fn close(&self) {}
    }

    fn mock<F>(call_fn: F) -> Arc<MockWebsetsClient<F>>
    where
        F: Fn(&Map<String, Value>) -> Result<String, WebsetsError> + Send + Sync,
    {
        Arc::new(MockWebsetsClient {
            call_fn,
            calls: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_create_webset_parses_resource_id() {
        let client = mock(|args| {
            let webset = args.get("webset").expect("webset envelope");
            assert_eq!(webset["searchQuery"], "quantum computing 2024");
            assert_eq!(webset["advanced"]["resultCount"], 10);
            Ok(r#"{"resourceId": "wbs-42", "status": "created"}"#.to_string())
        });
        let ops = WebsetsOperations::new(client);
        let id = ops
            .create_webset("quantum computing 2024", 10)
            .await
            .expect("create");
        assert_eq!(id, "wbs-42");
    }

    #[tokio::test]
    async fn test_create_webset_error_is_annotated() {
        let client = mock(|_| {
            Err(WebsetsError::Call {
                message: "API rate limit exceeded".to_string(),
            })
        });
        let ops = WebsetsOperations::new(client);
        let err = ops.create_webset("t", 5).await.expect_err("should fail");
        assert!(err.to_string().contains("failed to create webset"));
    }

    #[tokio::test]
    async fn test_create_webset_missing_resource_id() {
        let client = mock(|_| Ok(r#"{"status": "created"}"#.to_string()));
        let ops = WebsetsOperations::new(client);
        let err = ops.create_webset("t", 5).await.expect_err("should fail");
        assert!(err.to_string().contains("no resourceId"));
    }

    #[tokio::test]
    async fn test_list_content_items() {
        let client = mock(|args| {
            assert_eq!(args["resourceId"], "wbs-42");
            assert_eq!(args["query"]["limit"], 2);
            Ok(r#"{"items": [{"title": "A"}, {"title": "B"}, "junk"], "hasMore": false}"#
                .to_string())
        });
        let ops = WebsetsOperations::new(client);
        let items = ops.list_content_items("wbs-42", 2).await.expect("list");
        // Non-object entries are skipped.
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["title"], "A");
    }

    #[tokio::test]
    async fn test_wait_for_completion_polls_until_completed() {
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let client = mock(move |_| {
            let n = count_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n < 2 {
                Ok(r#"{"status": "processing"}"#.to_string())
            } else {
                Ok(r#"{"status": "completed"}"#.to_string())
            }
        });
        let ops = WebsetsOperations::new(client);
        ops.wait_for_completion_with("wbs-42", Duration::from_secs(5), Duration::from_millis(5))
            .await
            .expect("completes");
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_wait_for_completion_failed_status() {
        let client = mock(|_| Ok(r#"{"status": "failed", "error": "boom"}"#.to_string()));
        let ops = WebsetsOperations::new(client);
        let err = ops
            .wait_for_completion_with("wbs-1", Duration::from_secs(5), Duration::from_millis(5))
            .await
            .expect_err("should fail");
        assert!(err.to_string().contains("webset processing failed"));
    }

    #[tokio::test]
    async fn test_wait_for_completion_timeout() {
        let client = mock(|_| Ok(r#"{"status": "processing"}"#.to_string()));
        let ops = WebsetsOperations::new(client);
        let err = ops
            .wait_for_completion_with(
                "wbs-1",
                Duration::from_millis(20),
                Duration::from_millis(5),
            )
            .await
            .expect_err("should time out");
        assert!(matches!(err, WebsetsError::CompletionTimeout));
    }

    #[tokio::test]
    async fn test_wait_tolerates_malformed_and_unknown_status() {
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let client = mock(move |_| {
            let n = count_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            match n {
                0 => Ok("not json".to_string()),
                1 => Ok(r#"{"status": "reticulating"}"#.to_string()),
                _ => Ok(r#"{"status": "completed"}"#.to_string()),
            }
        });
        let ops = WebsetsOperations::new(client);
        ops.wait_for_completion_with("wbs-1", Duration::from_secs(5), Duration::from_millis(5))
            .await
            .expect("eventually completes");
    }
}
