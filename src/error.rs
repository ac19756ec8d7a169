//! # Harness Errors
//!
//! Error taxonomy for the verification harness.
//!
//! A condition that evaluated false this polling cycle is *not* an error;
//! poll checks report it as `Ok(false)` and the poller keeps going. Every
//! variant here is terminal for the assertion that produced it.

use thiserror::Error;

/// Errors produced by resource accessors, checks, and the connectivity probe.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The resource is absent. Surfaced immediately, never silently retried
    /// by accessors; waits that tolerate absence do so explicitly.
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    /// A condition was never satisfied within its budget. Carries the
    /// caller-supplied label so the failing condition is identifiable from
    /// the failure alone.
    #[error("timed out waiting for condition: {condition}")]
    Timeout { condition: String },

    /// An observed value structurally differs from the expected one.
    #[error("assertion failed for {subject}: expected {expected}, actual {actual}")]
    AssertionFailure {
        subject: String,
        expected: String,
        actual: String,
    },

    /// A fetched resource lacks a field the check needs to evaluate.
    #[error("{kind} {namespace}/{name} is missing {field}")]
    MissingField {
        kind: String,
        namespace: String,
        name: String,
        field: String,
    },

    /// The Kubernetes client reported an error other than "not found".
    /// Includes read-modify-write conflicts, which are surfaced, not retried.
    #[error("kubernetes client error: {0}")]
    Client(#[from] kube::Error),

    /// MongoDB session establishment failed. The only terminal failure mode
    /// of the connectivity probe; write failures are classified transient.
    #[error("mongodb session error: {0}")]
    Session(#[from] mongodb::error::Error),

    /// The automation config payload did not parse.
    #[error("automation config payload error: {0}")]
    Config(#[from] serde_json::Error),
}

impl HarnessError {
    /// Build a `NotFound` for a fully-qualified resource identity.
    pub fn not_found(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Build an `AssertionFailure` from anything renderable on both sides.
    pub fn assertion(
        subject: impl Into<String>,
        expected: impl std::fmt::Debug,
        actual: impl std::fmt::Debug,
    ) -> Self {
        Self::AssertionFailure {
            subject: subject.into(),
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }
}
