//! Error types for the widescreen research server.
//!
//! Each subsystem carries its own error enum; the MCP layer converts
//! everything into a single-line tool error with a correlation id while
//! detailed context stays in the logs.

use thiserror::Error;

/// Errors from resolving server settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is absent.
    #[error("missing required configuration: {name}")]
    MissingVar {
        /// Name of the missing variable.
        name: &'static str,
    },

    /// A variable was present but could not be parsed.
    #[error("invalid value for {name}: {message}")]
    InvalidVar {
        /// Name of the offending variable.
        name: &'static str,
        /// What was wrong with it.
        message: String,
    },
}

/// Errors from the elicitation manager.
#[derive(Debug, Error)]
pub enum ElicitationError {
    /// The caller referenced a session id the manager does not know.
    /// The session may have been evicted; the caller starts over.
    #[error("no such elicitation session: {session_id}")]
    UnknownSession {
        /// The unrecognized session id.
        session_id: String,
    },
}

/// Errors from a [`WorkerHost`](crate::hosting::WorkerHost) backend.
#[derive(Debug, Error)]
pub enum HostError {
    /// Worker creation failed.
    #[error("failed to create worker {worker_id}: {message}")]
    Create {
        /// Worker that could not be created.
        worker_id: String,
        /// Backend diagnostic.
        message: String,
    },

    /// Worker deletion failed.
    #[error("failed to delete worker {worker_id}: {message}")]
    Delete {
        /// Worker that could not be deleted.
        worker_id: String,
        /// Backend diagnostic.
        message: String,
    },

    /// The backend has no record of the worker.
    #[error("unknown worker: {worker_id}")]
    NotFound {
        /// The unrecognized worker id.
        worker_id: String,
    },
}

/// Errors from a [`MessageBus`](crate::hosting::MessageBus) backend.
#[derive(Debug, Error)]
pub enum BusError {
    /// Topic creation or lookup failed.
    #[error("topic {topic}: {message}")]
    Topic {
        /// Topic name.
        topic: String,
        /// Backend diagnostic.
        message: String,
    },

    /// Publishing a message failed.
    #[error("publish to {topic} failed: {message}")]
    Publish {
        /// Topic name.
        topic: String,
        /// Backend diagnostic.
        message: String,
    },

    /// Creating or attaching a subscription failed.
    #[error("subscription {subscription} on {topic} failed: {message}")]
    Subscribe {
        /// Subscription name.
        subscription: String,
        /// Topic name.
        topic: String,
        /// Backend diagnostic.
        message: String,
    },
}

/// Errors from a [`DocumentStore`](crate::hosting::DocumentStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write failed.
    #[error("failed to store {collection}/{id}: {message}")]
    Put {
        /// Target collection.
        collection: String,
        /// Document id.
        id: String,
        /// Backend diagnostic.
        message: String,
    },

    /// A read failed.
    #[error("failed to read {collection}/{id}: {message}")]
    Get {
        /// Target collection.
        collection: String,
        /// Document id.
        id: String,
        /// Backend diagnostic.
        message: String,
    },
}

/// Errors from the subprocess MCP (websets) client.
#[derive(Debug, Error)]
pub enum WebsetsError {
    /// The credential required by the child process is not set.
    #[error("{var} not set in environment")]
    CredentialMissing {
        /// Name of the missing variable.
        var: &'static str,
    },

    /// Spawning or initializing the child MCP session failed.
    #[error("mcp connect failed: {message}")]
    Connect {
        /// Transport diagnostic.
        message: String,
    },

    /// Re-establishing the session after a transport failure failed.
    #[error("reconnect failed: {message}")]
    Reconnect {
        /// Transport diagnostic.
        message: String,
    },

    /// A transport-class failure that persisted after the single
    /// reconnect attempt.
    #[error("tools/call failed after reconnect: {message}")]
    Transport {
        /// Transport diagnostic.
        message: String,
    },

    /// A non-transport call failure.
    #[error("tools/call failed: {message}")]
    Call {
        /// Transport diagnostic.
        message: String,
    },

    /// The tool responded with `isError=true`.
    #[error("tool error: {message}")]
    Tool {
        /// First text content of the error response.
        message: String,
    },

    /// The tool's JSON payload did not have the expected shape.
    #[error("failed to parse {what}: {message}")]
    Parse {
        /// Which response was being parsed.
        what: &'static str,
        /// Parser diagnostic.
        message: String,
    },

    /// The webset reported `status=failed`.
    #[error("webset processing failed")]
    ProcessingFailed,

    /// A lower-level failure annotated with the operation that hit it.
    #[error("{context}: {source}")]
    Op {
        /// Which high-level operation failed.
        context: &'static str,
        /// The underlying failure.
        #[source]
        source: Box<WebsetsError>,
    },

    /// Polling exceeded the caller's deadline.
    #[error("webset completion timeout")]
    CompletionTimeout,
}

/// Errors from the research orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The request failed validation before a session was created.
    #[error("validation failed: {message}")]
    Validation {
        /// What was invalid.
        message: String,
    },

    /// Sub-query planning failed.
    #[error("sub-query planning failed: {message}")]
    Planner {
        /// Planner diagnostic.
        message: String,
    },

    /// One or more workers could not be provisioned.
    #[error("provisioning failed with {count} errors: {first}")]
    Provisioning {
        /// Number of failed creations.
        count: usize,
        /// First error, for the headline message.
        first: String,
    },

    /// The session exceeded its configured wall-clock budget.
    #[error("research timeout after {minutes} minutes")]
    Timeout {
        /// The configured budget.
        minutes: u32,
    },

    /// Report assembly or persistence failed.
    #[error("report generation failed: {message}")]
    Report {
        /// Assembly diagnostic.
        message: String,
    },

    /// Worker host failure that aborts the session.
    #[error(transparent)]
    Host(#[from] HostError),

    /// Message bus failure that aborts the session.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// Document store failure surfaced during report persistence.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Websets pipeline failure.
    #[error(transparent)]
    Websets(#[from] WebsetsError),

    /// Server configuration failure surfaced at call time.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The root context was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websets_failed_message_is_stable() {
        // The pipeline's failure path is matched on this text.
        let err = WebsetsError::ProcessingFailed;
        assert!(err.to_string().contains("webset processing failed"));
    }

    #[test]
    fn test_orchestrator_error_from_host() {
        let err: OrchestratorError = HostError::Create {
            worker_id: "drone-1".to_string(),
            message: "quota exceeded".to_string(),
        }
        .into();
        assert!(err.to_string().contains("drone-1"));
    }
}
