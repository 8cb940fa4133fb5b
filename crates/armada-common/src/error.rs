//! Error types for Armada operations
//!
//! Errors are structured with fields to aid debugging in production.
//! Each variant carries contextual information: the operation in flight,
//! the last state a resource was seen in, and any diagnostic message the
//! control plane attached to the resource.

use thiserror::Error;

/// Main error type for Armada operations
#[derive(Debug, Error)]
pub enum Error {
    /// The remote control-plane API returned an error
    #[error("control plane error{}: {message}", fmt_code(.code))]
    Remote {
        /// HTTP-level status code, when the control plane reported one
        code: Option<u16>,
        /// Description of what failed
        message: String,
    },

    /// A resource the operation depends on does not exist
    #[error("{kind} {id} not found")]
    NotFound {
        /// Resource kind (cluster, backup, restore)
        kind: String,
        /// Identifier of the missing resource
        id: String,
    },

    /// A poll did not reach a terminal state within its deadline
    #[error("{operation} timed out after {elapsed_secs}s (last observed state: {last_state})")]
    Timeout {
        /// The lifecycle operation that was polling
        operation: String,
        /// Last state observed before the deadline, or "none" if the
        /// resource was never observed
        last_state: String,
        /// Wall-clock seconds spent polling
        elapsed_secs: u64,
    },

    /// A poll reached a terminal state other than the operation's
    /// expected success state
    #[error("{operation} ended in unexpected state {state}: {message}")]
    UnexpectedState {
        /// The lifecycle operation that was polling
        operation: String,
        /// The terminal state actually reached
        state: String,
        /// Diagnostic message from the resource, or a generic description
        message: String,
    },

    /// A local validation failure raised before any remote call
    #[error("precondition failed for {resource}: {message}")]
    Precondition {
        /// The resource the operation was about to act on
        resource: String,
        /// Description of the violated precondition
        message: String,
    },

    /// The operation was cancelled by the caller
    #[error("{operation} cancelled")]
    Cancelled {
        /// The lifecycle operation that was cancelled
        operation: String,
    },
}

fn fmt_code(code: &Option<u16>) -> String {
    match code {
        Some(c) => format!(" [{c}]"),
        None => String::new(),
    }
}

impl Error {
    /// Create a remote error with the given message
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote {
            code: None,
            message: msg.into(),
        }
    }

    /// Create a remote error carrying the control plane's status code
    pub fn remote_with_code(code: u16, msg: impl Into<String>) -> Self {
        Self::Remote {
            code: Some(code),
            message: msg.into(),
        }
    }

    /// Create a not-found error for the given resource kind and id
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Create a timeout error recording the last observed state
    pub fn timeout(
        operation: impl Into<String>,
        last_state: impl Into<String>,
        elapsed_secs: u64,
    ) -> Self {
        Self::Timeout {
            operation: operation.into(),
            last_state: last_state.into(),
            elapsed_secs,
        }
    }

    /// Create a terminal-mismatch error
    ///
    /// `message` should be the resource's diagnostic message when the
    /// control plane provided one.
    pub fn unexpected_state(
        operation: impl Into<String>,
        state: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::UnexpectedState {
            operation: operation.into(),
            state: state.into(),
            message: message.into(),
        }
    }

    /// Create a precondition error for the given resource
    pub fn precondition(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Precondition {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Create a cancellation error
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Remote errors are retryable unless the control plane rejected the
    /// request outright (4xx). Timeouts are retryable: the operation may
    /// simply need more time on a slow control plane. Everything else
    /// requires caller intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Remote { code, .. } => !matches!(code, Some(c) if (400..500).contains(c)),
            Error::NotFound { .. } => false,
            Error::Timeout { .. } => true,
            Error::UnexpectedState { .. } => false,
            Error::Precondition { .. } => false,
            Error::Cancelled { .. } => false,
        }
    }

    /// Returns true if this error is the typed absence signal
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Get the lifecycle operation name if this error carries one
    pub fn operation(&self) -> Option<&str> {
        match self {
            Error::Timeout { operation, .. } => Some(operation),
            Error::UnexpectedState { operation, .. } => Some(operation),
            Error::Cancelled { operation } => Some(operation),
            _ => None,
        }
    }

    /// Get the resource state this error observed, if any
    pub fn state(&self) -> Option<&str> {
        match self {
            Error::Timeout { last_state, .. } => Some(last_state),
            Error::UnexpectedState { state, .. } => Some(state),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // Story Tests: Error Propagation in Lifecycle Operations
    // ==========================================================================
    //
    // These tests demonstrate how errors flow through the system during
    // cluster lifecycle operations. Each error type represents a different
    // failure category with specific handling requirements.

    /// Story: Preconditions catch invalid operations before any remote call
    ///
    /// When a caller tries to stop a cluster that is not running, the
    /// lifecycle layer rejects it locally with a clear error message.
    #[test]
    fn story_precondition_prevents_invalid_operation() {
        let err = Error::precondition("cluster prod-eu", "cannot stop a cluster in state STOPPED");
        assert!(err.to_string().contains("precondition failed"));
        assert!(err.to_string().contains("STOPPED"));
        assert!(!err.is_retryable());
    }

    /// Story: Timeouts carry the last observed state for diagnostics
    ///
    /// When a cluster never leaves CREATING, the operator needs to know
    /// what the poller last saw, not just that time ran out.
    #[test]
    fn story_timeout_carries_last_state() {
        let err = Error::timeout("create cluster", "CREATING", 5400);
        assert!(err.to_string().contains("timed out after 5400s"));
        assert!(err.to_string().contains("CREATING"));
        assert_eq!(err.state(), Some("CREATING"));
        assert_eq!(err.operation(), Some("create cluster"));
        assert!(err.is_retryable());
    }

    /// Story: Terminal mismatch surfaces the control plane's diagnostic
    ///
    /// A create that lands in FAILED is not a timeout and not a transport
    /// error; it carries whatever message the control plane attached.
    #[test]
    fn story_terminal_mismatch_carries_diagnostic() {
        let err = Error::unexpected_state(
            "create cluster",
            "FAILED",
            "insufficient quota in region eu-west-1",
        );
        assert!(err.to_string().contains("unexpected state FAILED"));
        assert!(err.to_string().contains("insufficient quota"));
        assert_eq!(err.state(), Some("FAILED"));
        assert!(!err.is_retryable());
    }

    /// Story: Cancellation is distinct from timeout
    ///
    /// Callers abort polls on shutdown; retry policy must be able to tell
    /// "the user stopped us" apart from "the deadline elapsed".
    #[test]
    fn story_cancellation_distinct_from_timeout() {
        let cancelled = Error::cancelled("delete cluster");
        let timed_out = Error::timeout("delete cluster", "DELETING", 1800);

        assert!(matches!(cancelled, Error::Cancelled { .. }));
        assert!(matches!(timed_out, Error::Timeout { .. }));
        assert!(!cancelled.is_retryable());
        assert!(timed_out.is_retryable());
    }

    #[test]
    fn test_remote_error_retryability_by_code() {
        // 5xx and codeless transport failures are transient
        assert!(Error::remote("connection reset").is_retryable());
        assert!(Error::remote_with_code(503, "service unavailable").is_retryable());

        // 4xx means the request itself is wrong
        assert!(!Error::remote_with_code(400, "invalid instance type").is_retryable());
        assert!(!Error::remote_with_code(404, "no such project").is_retryable());
    }

    #[test]
    fn test_remote_error_display_includes_code() {
        let err = Error::remote_with_code(429, "rate limited");
        assert!(err.to_string().contains("[429]"));
        assert!(err.to_string().contains("rate limited"));

        let err = Error::remote("connection reset");
        assert!(!err.to_string().contains("["));
    }

    #[test]
    fn test_not_found_is_typed_signal() {
        let err = Error::not_found("backup", "bk-42");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("backup bk-42 not found"));
        assert!(!err.is_retryable());

        assert!(!Error::remote("boom").is_not_found());
    }

    #[test]
    fn test_operation_accessor() {
        assert_eq!(Error::remote("x").operation(), None);
        assert_eq!(Error::not_found("cluster", "c1").operation(), None);
        assert_eq!(
            Error::cancelled("scale cluster").operation(),
            Some("scale cluster")
        );
    }

    #[test]
    fn test_error_construction_ergonomics() {
        // From String
        let id = "c-7".to_string();
        let err = Error::not_found("cluster", id);
        assert!(err.to_string().contains("c-7"));

        // From &str literal
        let err = Error::precondition("cluster", "static message");
        assert!(err.to_string().contains("static message"));

        // From formatted string
        let region = "us-east-2";
        let err = Error::remote(format!("quota exceeded in {}", region));
        assert!(err.to_string().contains("us-east-2"));
    }
}
