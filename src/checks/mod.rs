//! # Assertion Library
//!
//! Named, composable checks over the observed state of a managed cluster.
//!
//! A [`Check`] is a first-class value: a label plus a function from a
//! [`CheckContext`] to pass/fail. Checks nest into named groups, and the
//! scenario runner executes the resulting tree, reporting each leaf under
//! its full path. Nothing runs at construction time; building a check is
//! free and deferred execution is explicit.

use crate::client::HarnessClient;
use crate::error::HarnessError;
use futures::future::BoxFuture;
use std::future::Future;
use tracing::{error, info};

pub mod ownership;
pub mod status;
pub mod workload;

pub use ownership::{
    agent_secrets_have_owner_reference, service_has_owner_reference,
    statefulset_has_owner_reference,
};
pub use status::{
    automation_config_has_roles, automation_config_has_version, automation_config_secret_exists,
    reaches_phase, status_matches, status_matches_spec,
};
pub use workload::{
    container_condition_is_true, exec_in_container, pod_container_becomes_not_ready,
    pod_container_becomes_ready, statefulset_becomes_ready, statefulset_becomes_unready,
    statefulset_has_update_strategy, statefulset_ready_after_scale_down,
};

/// Execution context threaded through every check.
#[derive(Clone, Debug)]
pub struct CheckContext {
    /// Client handle scoped to the enclosing scenario run
    pub client: HarnessClient,
}

impl CheckContext {
    /// Build a context around a client handle.
    pub fn new(client: HarnessClient) -> Self {
        Self { client }
    }
}

type CheckFn = Box<dyn FnOnce(CheckContext) -> BoxFuture<'static, Result<(), HarnessError>> + Send>;

enum CheckBody {
    Leaf(CheckFn),
    Group(Vec<Check>),
}

/// A named check: a label plus a deferred assertion.
pub struct Check {
    name: String,
    body: CheckBody,
}

impl std::fmt::Debug for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Check").field("name", &self.name).finish()
    }
}

impl Check {
    /// Build a leaf check from an async assertion.
    pub fn new<F, Fut>(name: impl Into<String>, check: F) -> Self
    where
        F: FnOnce(CheckContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), HarnessError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            body: CheckBody::Leaf(Box::new(move |ctx| Box::pin(check(ctx)))),
        }
    }

    /// Build a named group of checks, executed in order.
    pub fn group(name: impl Into<String>, children: Vec<Check>) -> Self {
        Self {
            name: name.into(),
            body: CheckBody::Group(children),
        }
    }

    /// The check's label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Labels of nested checks, for inspecting a composition without
    /// running it.
    pub fn child_names(&self) -> Vec<&str> {
        match &self.body {
            CheckBody::Leaf(_) => Vec::new(),
            CheckBody::Group(children) => children.iter().map(Check::name).collect(),
        }
    }

    /// Run the check, producing a report node. A group runs every child
    /// even after one fails: sibling results are independent diagnostics.
    pub fn run(self, ctx: &CheckContext) -> BoxFuture<'_, CheckReport> {
        Box::pin(async move {
            match self.body {
                CheckBody::Leaf(check) => {
                    let outcome = match check(ctx.clone()).await {
                        Ok(()) => {
                            info!(check = %self.name, "✅ check passed");
                            Outcome::Passed
                        }
                        Err(failure) => {
                            error!(check = %self.name, error = %failure, "❌ check failed");
                            Outcome::Failed(failure.to_string())
                        }
                    };
                    CheckReport {
                        name: self.name,
                        outcome,
                        children: Vec::new(),
                    }
                }
                CheckBody::Group(children) => {
                    let mut reports = Vec::with_capacity(children.len());
                    for child in children {
                        reports.push(child.run(ctx).await);
                    }
                    let failed = reports.iter().filter(|report| !report.passed()).count();
                    let outcome = if failed == 0 {
                        Outcome::Passed
                    } else {
                        Outcome::Failed(format!(
                            "{failed} of {} sub-checks failed",
                            reports.len()
                        ))
                    };
                    CheckReport {
                        name: self.name,
                        outcome,
                        children: reports,
                    }
                }
            }
        })
    }
}

/// Pass/fail result of one report node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The check (and, for groups, every child) passed
    Passed,
    /// The check failed, with a rendered diagnostic
    Failed(String),
}

/// One node of the labeled pass/fail tree a check run produces.
#[derive(Debug, Clone)]
pub struct CheckReport {
    /// Label of the check that produced this node
    pub name: String,
    /// Pass/fail outcome
    pub outcome: Outcome,
    /// Reports of nested checks, in execution order
    pub children: Vec<CheckReport>,
}

impl CheckReport {
    /// Whether this node and all of its children passed.
    pub fn passed(&self) -> bool {
        matches!(self.outcome, Outcome::Passed)
    }

    /// The failure diagnostic, if any.
    pub fn failure(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Passed => None,
            Outcome::Failed(diagnostic) => Some(diagnostic),
        }
    }
}
