//! # Resource Accessors
//!
//! Typed fetch/update/delete/exec operations against the cluster under test.
//!
//! All operations run through an explicitly passed `HarnessClient`; the
//! handle is scoped to one scenario run and threaded through every
//! component, never stashed in a process-wide global. Conflicting
//! read-modify-write updates are surfaced to the caller, not retried.

use crate::crd::MongoDbCluster;
use crate::error::HarnessError;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

/// Kubernetes client handle for one scenario run.
#[derive(Clone)]
pub struct HarnessClient {
    client: Client,
}

impl std::fmt::Debug for HarnessClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarnessClient").finish_non_exhaustive()
    }
}

impl HarnessClient {
    /// Wrap an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient kubeconfig/in-cluster environment.
    pub async fn try_default() -> Result<Self, HarnessError> {
        Ok(Self::new(Client::try_default().await?))
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Fetch a namespaced resource, mapping 404 to `NotFound` with the
    /// fully-qualified identity.
    pub async fn get<K>(&self, namespace: &str, name: &str) -> Result<K, HarnessError>
    where
        K: Resource<Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + std::fmt::Debug,
        K::DynamicType: Default,
    {
        self.get_opt(namespace, name).await?.ok_or_else(|| {
            HarnessError::not_found(
                K::kind(&K::DynamicType::default()).to_string(),
                namespace,
                name,
            )
        })
    }

    /// Fetch a namespaced resource, mapping 404 to `None`. Waits that
    /// tolerate absence poll through this instead of `get`.
    pub async fn get_opt<K>(&self, namespace: &str, name: &str) -> Result<Option<K>, HarnessError>
    where
        K: Resource<Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + std::fmt::Debug,
        K::DynamicType: Default,
    {
        match self.api::<K>(namespace).get(name).await {
            Ok(resource) => Ok(Some(resource)),
            Err(kube::Error::Api(response)) if response.code == 404 => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    /// Fetch the cluster resource itself.
    pub async fn get_cluster(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<MongoDbCluster, HarnessError> {
        self.get(namespace, name).await
    }

    /// Submit a new cluster resource.
    pub async fn create_cluster(
        &self,
        mdb: &MongoDbCluster,
    ) -> Result<MongoDbCluster, HarnessError> {
        let namespace = mdb.target_namespace();
        let created = self
            .api::<MongoDbCluster>(&namespace)
            .create(&PostParams::default(), mdb)
            .await?;
        info!(
            resource.namespace = %namespace,
            resource.name = %created.name_any(),
            "created MongoDbCluster"
        );
        Ok(created)
    }

    /// Read-modify-write the cluster spec.
    ///
    /// Fetches the current resource, applies `mutate`, and replaces it. A
    /// conflict from the API server is surfaced as a client error; callers
    /// that want retry-on-conflict re-invoke explicitly.
    pub async fn update_cluster(
        &self,
        namespace: &str,
        name: &str,
        mutate: impl FnOnce(&mut MongoDbCluster),
    ) -> Result<MongoDbCluster, HarnessError> {
        let api = self.api::<MongoDbCluster>(namespace);
        let mut current: MongoDbCluster = match api.get(name).await {
            Ok(resource) => resource,
            Err(kube::Error::Api(response)) if response.code == 404 => {
                return Err(HarnessError::not_found("MongoDbCluster", namespace, name));
            }
            Err(error) => return Err(error.into()),
        };
        mutate(&mut current);
        current.metadata.managed_fields = None;
        let updated = api.replace(name, &PostParams::default(), &current).await?;
        debug!(
            resource.namespace = %namespace,
            resource.name = %name,
            "updated MongoDbCluster spec"
        );
        Ok(updated)
    }

    /// Delete a single pod, for targeted fault injection.
    pub async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), HarnessError> {
        match self
            .api::<Pod>(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => {
                info!(
                    resource.namespace = %namespace,
                    resource.name = %name,
                    "deleted pod"
                );
                Ok(())
            }
            Err(kube::Error::Api(response)) if response.code == 404 => {
                Err(HarnessError::not_found("Pod", namespace, name))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Run a command inside a container of a running pod and collect stdout.
    pub async fn exec_in_pod(
        &self,
        namespace: &str,
        pod_name: &str,
        container: &str,
        command: &[&str],
    ) -> Result<String, HarnessError> {
        let pods = self.api::<Pod>(namespace);
        let params = kube::api::AttachParams::default()
            .container(container)
            .stderr(false);
        let mut attached = pods
            .exec(pod_name, command.iter().copied(), &params)
            .await?;
        let mut output = String::new();
        if let Some(mut stdout) = attached.stdout() {
            stdout
                .read_to_string(&mut output)
                .await
                .map_err(|error| HarnessError::MissingField {
                    kind: "Pod".to_string(),
                    namespace: namespace.to_string(),
                    name: pod_name.to_string(),
                    field: format!("exec stdout ({error})"),
                })?;
        }
        attached
            .join()
            .await
            .map_err(|error| HarnessError::MissingField {
                kind: "Pod".to_string(),
                namespace: namespace.to_string(),
                name: pod_name.to_string(),
                field: format!("exec completion ({error})"),
            })?;
        debug!(
            resource.namespace = %namespace,
            resource.name = %pod_name,
            container,
            "exec completed"
        );
        Ok(output)
    }
}
