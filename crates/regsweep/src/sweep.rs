//! End-to-end sweep orchestration over the collaborator traits.
//!
//! The ordering requirement is causal: the subject index must be complete
//! before any plan consults it, and planning happens only over a complete,
//! successful registry snapshot. Any enumeration failure aborts here, before
//! a single deletion is planned.

use log::{debug, info};

use crate::error::Result;
use crate::partition::{partition_repository, ScannedRepository};
use crate::plan::{execute, plan, ItemOutcome, SweepPlan};
use crate::policy::RetentionPolicy;
use crate::record::ClusterRefs;
use crate::registry::{ImageDeleter, ManifestFetcher, RegistrySource};
use crate::subject::{link_artifacts, SubjectIndex};

/// A complete, consistent snapshot of registry state for one run.
#[derive(Debug)]
pub struct RegistrySnapshot {
    /// Every evaluated repository, partitioned.
    pub repositories: Vec<ScannedRepository>,
    /// Fully built artifact linkage.
    pub index: SubjectIndex,
}

/// Drives one sweep: snapshot, verdict, execution.
pub struct Sweeper<'a, S, F> {
    source: &'a S,
    fetcher: &'a F,
    policy: RetentionPolicy,
}

impl<'a, S: RegistrySource, F: ManifestFetcher> Sweeper<'a, S, F> {
    /// A sweeper over the given collaborators and policy.
    pub fn new(source: &'a S, fetcher: &'a F, policy: RetentionPolicy) -> Self {
        Sweeper {
            source,
            fetcher,
            policy,
        }
    }

    /// Enumerates and partitions the whole registry, resolving artifact
    /// subjects as each repository completes.
    ///
    /// Single-image repositories are skipped during partitioning. Errors
    /// propagate: a partial snapshot must never feed a plan.
    pub async fn snapshot(&self) -> Result<RegistrySnapshot> {
        let mut repositories = Vec::new();
        let mut index = SubjectIndex::default();

        for repository in self.source.list_repositories().await? {
            debug!("enumerating repository {}", repository.name);
            let records = self.source.list_images(&repository.name).await?;

            let Some(mut scanned) = partition_repository(repository, records, &self.policy) else {
                continue;
            };

            let candidates = std::mem::take(&mut scanned.artifact_candidates);
            link_artifacts(self.fetcher, &scanned.repository, candidates, &mut index).await;

            repositories.push(scanned);
        }

        info!(
            "snapshot complete: {} repositories, {} linked artifacts",
            repositories.len(),
            index.len()
        );
        Ok(RegistrySnapshot {
            repositories,
            index,
        })
    }

    /// Computes the deletion plan for a snapshot against the cluster
    /// reference set.
    pub fn plan(&self, snapshot: &RegistrySnapshot, cluster_refs: &ClusterRefs) -> SweepPlan {
        plan(
            &snapshot.repositories,
            &snapshot.index,
            cluster_refs,
            &self.policy,
        )
    }

    /// Executes a plan. Dry-run suppresses the deletion calls but reports
    /// the full planned set.
    pub async fn execute(
        &self,
        deleter: &impl ImageDeleter,
        plan: &SweepPlan,
        dry_run: bool,
    ) -> Vec<ItemOutcome> {
        execute(deleter, plan, dry_run).await
    }
}
