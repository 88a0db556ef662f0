use crate::errors::K8sProbeError;
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::NamespaceResourceScope;
use kube::{api::ListParams, Api, Client, Config};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt::Debug;

/// A Kubernetes cluster to probe for live image usage, plus however it
/// should be reached: either an explicit kubeconfig context (operator's
/// workstation) or the in-cluster service account (when this binary itself
/// runs as a workload).
#[derive(Debug, Clone)]
pub struct ClusterIdentity {
    pub context: String,
    pub namespace: String,
    pub running_inside: bool,
}

/// Which cluster a live image reference was observed in.
pub type UsageMap = HashMap<String, String>;

async fn client_for(cluster: &ClusterIdentity) -> Result<Client, K8sProbeError> {
    if cluster.running_inside {
        Client::try_default().await.map_err(|e| K8sProbeError::ClientBuildFailed {
            cluster: cluster.context.clone(),
            raw_error_message: e.to_string(),
        })
    } else {
        let kubeconfig = kube::config::Kubeconfig::read().map_err(|e| K8sProbeError::ClientBuildFailed {
            cluster: cluster.context.clone(),
            raw_error_message: e.to_string(),
        })?;
        let options = kube::config::KubeConfigOptions {
            context: Some(cluster.context.clone()),
            ..Default::default()
        };
        let config = Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .map_err(|e| K8sProbeError::ClientBuildFailed {
                cluster: cluster.context.clone(),
                raw_error_message: e.to_string(),
            })?;
        Client::try_from(config).map_err(|e| K8sProbeError::ClientBuildFailed {
            cluster: cluster.context.clone(),
            raw_error_message: e.to_string(),
        })
    }
}

fn images_from_spec(spec: &k8s_openapi::api::core::v1::PodSpec) -> Vec<String> {
    let mut images = Vec::new();
    for container in spec.init_containers.iter().flatten() {
        if let Some(image) = &container.image {
            images.push(image.clone());
        }
    }
    for container in &spec.containers {
        if let Some(image) = &container.image {
            images.push(image.clone());
        }
    }
    images
}

async fn list_images<K>(
    cluster: &ClusterIdentity,
    kind: &str,
    spec_of: impl Fn(&K) -> Option<&k8s_openapi::api::core::v1::PodSpec>,
) -> Result<Vec<(String, String)>, K8sProbeError>
where
    K: k8s_openapi::Resource<Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + DeserializeOwned
        + k8s_openapi::Metadata<Ty = k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta>,
{
    let client = client_for(cluster).await?;
    let api: Api<K> = Api::namespaced(client, &cluster.namespace);
    let list = api.list(&ListParams::default()).await.map_err(|e| K8sProbeError::ListFailed {
        cluster: cluster.context.clone(),
        kind: kind.to_string(),
        raw_error_message: e.to_string(),
    })?;

    let mut found = Vec::new();
    for item in list.items {
        if let Some(spec) = spec_of(&item) {
            for image in images_from_spec(spec) {
                found.push((image, cluster.context.clone()));
            }
        }
    }
    Ok(found)
}

/// Probes every configured cluster for images referenced by live workloads.
///
/// One task runs per resource kind (not per cluster); each task iterates
/// all clusters sequentially for that kind. The six tasks run concurrently
/// and are joined before the single-threaded merge into the final map, so
/// no cluster's result is dropped and no write races occur.
pub async fn probe_used_images(clusters: &[ClusterIdentity]) -> Result<UsageMap, K8sProbeError> {
    let pods = probe_kind::<Pod>(clusters, "Pod", |p| p.spec.as_ref());
    let deployments = probe_kind::<Deployment>(clusters, "Deployment", |d| {
        d.spec.as_ref().and_then(|s| s.template.spec.as_ref())
    });
    let replica_sets = probe_kind::<ReplicaSet>(clusters, "ReplicaSet", |r| {
        r.spec.as_ref().and_then(|s| s.template.as_ref()).and_then(|t| t.spec.as_ref())
    });
    let stateful_sets = probe_kind::<StatefulSet>(clusters, "StatefulSet", |s| {
        s.spec.as_ref().and_then(|s| s.template.spec.as_ref())
    });
    let jobs = probe_kind::<Job>(clusters, "Job", |j| {
        j.spec.as_ref().and_then(|s| s.template.spec.as_ref())
    });
    let cron_jobs = probe_kind::<CronJob>(clusters, "CronJob", |c| {
        c.spec
            .as_ref()
            .and_then(|s| s.job_template.spec.as_ref())
            .and_then(|s| s.template.spec.as_ref())
    });

    let (pods, deployments, replica_sets, stateful_sets, jobs, cron_jobs) =
        tokio::join!(pods, deployments, replica_sets, stateful_sets, jobs, cron_jobs);

    let mut usage = HashMap::new();
    for result in [pods, deployments, replica_sets, stateful_sets, jobs, cron_jobs] {
        for (image, cluster) in result? {
            usage.entry(image).or_insert(cluster);
        }
    }
    Ok(usage)
}

async fn probe_kind<K>(
    clusters: &[ClusterIdentity],
    kind: &str,
    spec_of: impl Fn(&K) -> Option<&k8s_openapi::api::core::v1::PodSpec> + Copy,
) -> Result<Vec<(String, String)>, K8sProbeError>
where
    K: k8s_openapi::Resource<Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + DeserializeOwned
        + k8s_openapi::Metadata<Ty = k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta>,
{
    let mut all = Vec::new();
    for cluster in clusters {
        all.extend(list_images::<K>(cluster, kind, spec_of).await?);
    }
    Ok(all)
}
