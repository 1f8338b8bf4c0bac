//! Cluster image reference collection.
//!
//! Enumerates every pod-creating workload kind (daemon sets, deployments,
//! stateful sets, jobs, cron jobs) plus bare pods across all namespaces and
//! collects the image address of every container and init container into a
//! de-duplicated [`ClusterRefs`]. The result is the retention engine's
//! "referenced" signal, so a failure here is fatal to the run: an
//! incomplete reference set could misclassify a live image as unreferenced.

use std::collections::HashSet;

use anyhow::{Context, Result};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{Pod, PodSpec};
use kube::api::ListParams;
use kube::{Api, Client};
use log::info;

use regsweep::ClusterRefs;

/// Connects to the cluster: kubeconfig when available, in-cluster
/// configuration otherwise.
pub async fn connect() -> Result<Client> {
    Client::try_default()
        .await
        .context("connecting to the cluster API")
}

/// Collects every distinct image address referenced by cluster workloads.
pub async fn referenced_image_addresses(client: Client) -> Result<ClusterRefs> {
    let mut addresses = HashSet::new();

    info!("getting daemon sets from the cluster API");
    for item in list_all::<DaemonSet>(&client).await? {
        if let Some(spec) = item.spec.and_then(|s| s.template.spec) {
            collect_pod_spec(&spec, &mut addresses);
        }
    }

    info!("getting deployments from the cluster API");
    for item in list_all::<Deployment>(&client).await? {
        if let Some(spec) = item.spec.and_then(|s| s.template.spec) {
            collect_pod_spec(&spec, &mut addresses);
        }
    }

    info!("getting stateful sets from the cluster API");
    for item in list_all::<StatefulSet>(&client).await? {
        if let Some(spec) = item.spec.and_then(|s| s.template.spec) {
            collect_pod_spec(&spec, &mut addresses);
        }
    }

    info!("getting cron jobs from the cluster API");
    for item in list_all::<CronJob>(&client).await? {
        let template_spec = item
            .spec
            .and_then(|s| s.job_template.spec)
            .and_then(|s| s.template.spec);
        if let Some(spec) = template_spec {
            collect_pod_spec(&spec, &mut addresses);
        }
    }

    info!("getting jobs from the cluster API");
    for item in list_all::<Job>(&client).await? {
        if let Some(spec) = item.spec.and_then(|s| s.template.spec) {
            collect_pod_spec(&spec, &mut addresses);
        }
    }

    info!("getting pods from the cluster API");
    for item in list_all::<Pod>(&client).await? {
        if let Some(spec) = item.spec {
            collect_pod_spec(&spec, &mut addresses);
        }
    }

    info!("collected {} distinct workload image addresses", addresses.len());
    Ok(addresses.into())
}

async fn list_all<K>(client: &Client) -> Result<Vec<K>>
where
    K: kube::Resource<DynamicType = ()>
        + Clone
        + std::fmt::Debug
        + serde::de::DeserializeOwned,
{
    let api: Api<K> = Api::all(client.clone());
    let list = api
        .list(&ListParams::default())
        .await
        .with_context(|| format!("listing {}", K::kind(&())))?;
    Ok(list.items)
}

/// Adds the image of every container and init container to the set.
fn collect_pod_spec(spec: &PodSpec, addresses: &mut HashSet<String>) {
    if let Some(init_containers) = &spec.init_containers {
        for container in init_containers {
            if let Some(image) = &container.image {
                addresses.insert(image.clone());
            }
        }
    }
    for container in &spec.containers {
        if let Some(image) = &container.image {
            addresses.insert(image.clone());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use k8s_openapi::api::core::v1::Container;

    fn container(image: Option<&str>) -> Container {
        Container {
            image: image.map(String::from),
            ..Container::default()
        }
    }

    #[test]
    fn test_collect_pod_spec_gathers_all_containers() {
        let spec = PodSpec {
            init_containers: Some(vec![container(Some("repo:init"))]),
            containers: vec![container(Some("repo:v1")), container(Some("repo:v2"))],
            ..PodSpec::default()
        };

        let mut addresses = HashSet::new();
        collect_pod_spec(&spec, &mut addresses);
        assert_eq!(addresses.len(), 3);
        assert!(addresses.contains("repo:init"));
        assert!(addresses.contains("repo:v1"));
        assert!(addresses.contains("repo:v2"));
    }

    #[test]
    fn test_collect_pod_spec_deduplicates_and_skips_imageless() {
        let spec = PodSpec {
            containers: vec![
                container(Some("repo:v1")),
                container(Some("repo:v1")),
                container(None),
            ],
            ..PodSpec::default()
        };

        let mut addresses = HashSet::new();
        collect_pod_spec(&spec, &mut addresses);
        assert_eq!(addresses.len(), 1);
    }
}
