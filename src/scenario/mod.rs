//! # Scenario Composer
//!
//! Ordered sequences of mutation actions and assertions forming named
//! end-to-end scenarios.
//!
//! Actions only cause: they acknowledge the write and return without
//! waiting. Observing the effect is always a separate, explicit check step,
//! matching the asynchronous nature of the system under test. Expected-state
//! records are computed from the current specification, never from a
//! hardcoded literal, so compositions stay correct across mutation steps.

use crate::checks::{Check, CheckContext, CheckReport, Outcome};
use crate::crd::{MongoDbCluster, MongoDbClusterStatus, Phase};
use crate::error::HarnessError;
use futures::future::BoxFuture;
use kube::ResourceExt;
use std::future::Future;
use tracing::{error, info};

/// The status record a converged cluster must report for the given spec.
pub fn expected_status(mdb: &MongoDbCluster) -> MongoDbClusterStatus {
    MongoDbClusterStatus {
        mongo_uri: mdb.mongo_uri(),
        phase: Phase::Running,
        current_mongodb_members: mdb.spec.members,
        current_stateful_set_replicas: mdb.spec.members,
    }
}

type ActionFn = Box<dyn FnOnce(CheckContext) -> BoxFuture<'static, Result<(), HarnessError>> + Send>;

/// A named state-mutating action.
pub struct Action {
    name: String,
    run: ActionFn,
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action").field("name", &self.name).finish()
    }
}

impl Action {
    /// Build an action from an async mutation.
    pub fn new<F, Fut>(name: impl Into<String>, run: F) -> Self
    where
        F: FnOnce(CheckContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), HarnessError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: Box::new(move |ctx| Box::pin(run(ctx))),
        }
    }

    /// The action's label.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One step of a scenario.
#[derive(Debug)]
pub enum Step {
    /// Mutate the system under test; a failure aborts the scenario, since
    /// later assertions would observe an unestablished cause.
    Action(Action),
    /// Assert on observed state; a failure marks the step and the run
    /// failed, but later independent steps still execute.
    Check(Check),
}

impl Step {
    /// The step's label.
    pub fn name(&self) -> &str {
        match self {
            Step::Action(action) => action.name(),
            Step::Check(check) => check.name(),
        }
    }
}

/// A named, ordered end-to-end scenario.
#[derive(Debug, Default)]
pub struct Scenario {
    name: String,
    steps: Vec<Step>,
}

impl Scenario {
    /// Start an empty scenario.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append an action step.
    pub fn action(self, action: Action) -> Self {
        self.step(Step::Action(action))
    }

    /// Append a check step.
    pub fn check(self, check: Check) -> Self {
        self.step(Step::Check(check))
    }

    /// Labels of the composed steps, in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(Step::name).collect()
    }

    /// Execute the scenario against a context.
    pub async fn run(self, ctx: &CheckContext) -> ScenarioReport {
        info!(scenario = %self.name, steps = self.steps.len(), "running scenario");
        let mut report = ScenarioReport {
            name: self.name,
            steps: Vec::new(),
            aborted: None,
        };
        for step in self.steps {
            match step {
                Step::Action(action) => {
                    info!(scenario = %report.name, action = %action.name, "applying action");
                    match (action.run)(ctx.clone()).await {
                        Ok(()) => report.steps.push(CheckReport {
                            name: action.name,
                            outcome: Outcome::Passed,
                            children: Vec::new(),
                        }),
                        Err(failure) => {
                            error!(
                                scenario = %report.name,
                                action = %action.name,
                                error = %failure,
                                "❌ action failed, aborting scenario"
                            );
                            let diagnostic = failure.to_string();
                            report.steps.push(CheckReport {
                                name: action.name,
                                outcome: Outcome::Failed(diagnostic.clone()),
                                children: Vec::new(),
                            });
                            report.aborted = Some(diagnostic);
                            break;
                        }
                    }
                }
                Step::Check(check) => {
                    report.steps.push(check.run(ctx).await);
                }
            }
        }
        if report.passed() {
            info!(scenario = %report.name, "✅ scenario passed");
        } else {
            error!(scenario = %report.name, "❌ scenario failed");
        }
        report
    }
}

/// Result of one scenario run: a tree of labeled pass/fail nodes.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    /// Scenario label
    pub name: String,
    /// Per-step reports, in execution order
    pub steps: Vec<CheckReport>,
    /// Diagnostic of the action failure that cut the run short, if any
    pub aborted: Option<String>,
}

impl ScenarioReport {
    /// Whether the run completed with every step passing.
    pub fn passed(&self) -> bool {
        self.aborted.is_none() && self.steps.iter().all(CheckReport::passed)
    }

    /// Names of the failed steps, for diagnostics.
    pub fn failed_steps(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|step| !step.passed())
            .map(|step| step.name.as_str())
            .collect()
    }
}

/// Submit the cluster resource.
pub fn create_cluster(mdb: &MongoDbCluster) -> Action {
    let mdb = mdb.clone();
    Action::new(format!("create cluster {}", mdb.name_any()), move |ctx| {
        async move {
            ctx.client.create_cluster(&mdb).await?;
            Ok(())
        }
    })
}

/// Set the desired member count.
pub fn scale(mdb: &MongoDbCluster, members: i32) -> Action {
    let namespace = mdb.target_namespace();
    let name = mdb.name_any();
    Action::new(
        format!("scale cluster {name} to {members} members"),
        move |ctx| async move {
            info!(
                resource.namespace = %namespace,
                resource.name = %name,
                members,
                "scaling cluster"
            );
            ctx.client
                .update_cluster(&namespace, &name, |cluster| {
                    cluster.spec.members = members;
                })
                .await?;
            Ok(())
        },
    )
}

/// Require TLS for all connections.
pub fn enable_tls(mdb: &MongoDbCluster) -> Action {
    tls(mdb, true)
}

/// Stop requiring TLS.
pub fn disable_tls(mdb: &MongoDbCluster) -> Action {
    tls(mdb, false)
}

fn tls(mdb: &MongoDbCluster, enabled: bool) -> Action {
    let namespace = mdb.target_namespace();
    let name = mdb.name_any();
    Action::new(
        format!("set tls.enabled={enabled} on cluster {name}"),
        move |ctx| async move {
            info!(
                resource.namespace = %namespace,
                resource.name = %name,
                enabled,
                "setting security.tls.enabled"
            );
            ctx.client
                .update_cluster(&namespace, &name, |cluster| {
                    cluster.spec.security.tls.enabled = enabled;
                })
                .await?;
            Ok(())
        },
    )
}

/// Set the desired engine version.
pub fn change_version(mdb: &MongoDbCluster, version: &str) -> Action {
    let namespace = mdb.target_namespace();
    let name = mdb.name_any();
    let version = version.to_string();
    Action::new(
        format!("change cluster {name} version to {version}"),
        move |ctx| async move {
            info!(
                resource.namespace = %namespace,
                resource.name = %name,
                version = %version,
                "changing engine version"
            );
            ctx.client
                .update_cluster(&namespace, &name, |cluster| {
                    cluster.spec.version = version;
                })
                .await?;
            Ok(())
        },
    )
}

/// Delete the pod at `ordinal`, to verify self-healing.
pub fn delete_pod(mdb: &MongoDbCluster, ordinal: usize) -> Action {
    let namespace = mdb.target_namespace();
    let pod_name = mdb.pod_name(ordinal);
    Action::new(format!("delete pod {pod_name}"), move |ctx| async move {
        ctx.client.delete_pod(&namespace, &pod_name).await
    })
}

/// The ordered composition every cluster must satisfy once created: config
/// secret published, workload ready, phase Running, ownership on every
/// sub-resource, and a status record agreeing with the spec.
pub fn basic_functionality(mdb: &MongoDbCluster) -> Check {
    Check::group(
        format!("basic functionality of {}", mdb.name_any()),
        vec![
            crate::checks::automation_config_secret_exists(mdb),
            crate::checks::statefulset_becomes_ready(mdb),
            crate::checks::reaches_phase(mdb, Phase::Running),
            crate::checks::statefulset_has_owner_reference(mdb),
            crate::checks::service_has_owner_reference(mdb),
            crate::checks::agent_secrets_have_owner_reference(mdb),
            crate::checks::status_matches_spec(mdb),
        ],
    )
}
