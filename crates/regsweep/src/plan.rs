//! Deletion planning and best-effort execution.
//!
//! Planning is pure: it consumes the scanned repositories, the fully built
//! subject index, and the cluster reference set, and produces the final
//! deletion set with artifact cascade applied. Execution walks that set
//! item by item; one failure never aborts the rest, and dry-run computes
//! the identical plan while issuing zero deletion calls.

use std::collections::HashSet;

use log::{info, warn};
use serde::Serialize;

use crate::error::DeleteError;
use crate::partition::ScannedRepository;
use crate::policy::{RetentionPolicy, KEEP_TAG};
use crate::record::ClusterRefs;
use crate::registry::ImageDeleter;
use crate::subject::SubjectIndex;

/// Whether a deletion item is an image or an artifact cascaded from one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A real image found deletable by policy or force-delete.
    Image,
    /// An ancillary artifact inheriting its subject's verdict.
    Artifact,
}

/// One entry of the deletion set.
#[derive(Debug, Clone, Serialize)]
pub struct DeletionItem {
    /// Owning repository name (the deletion call is keyed on it).
    pub repository: String,
    /// Digest to delete.
    pub digest: String,
    /// Canonical address, for reporting.
    pub address: String,
    /// Image or cascaded artifact.
    pub kind: ItemKind,
}

/// The computed verdict for a whole run.
#[derive(Debug, Default, Serialize)]
pub struct SweepPlan {
    /// Images and cascaded artifacts to delete, in evaluation order.
    pub delete: Vec<DeletionItem>,
    /// Canonical addresses of retained images.
    pub keep: Vec<String>,
}

/// Computes the deletion set.
///
/// Two independent contributors feed it: the per-image retention predicates,
/// and repository-level force-delete (which bypasses the predicates but
/// never the `keep` tag). Their union is deduplicated per (repository,
/// digest). Every deletable image then cascades to the artifacts in its
/// subject-index bucket; artifacts of retained images never appear.
pub fn plan(
    repositories: &[ScannedRepository],
    index: &SubjectIndex,
    cluster_refs: &ClusterRefs,
    policy: &RetentionPolicy,
) -> SweepPlan {
    let mut plan = SweepPlan::default();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for scanned in repositories {
        let force_delete = scanned.repository.force_delete;
        if force_delete {
            info!(
                "repository {} is marked unapproved, collecting all images",
                scanned.repository.name
            );
        }

        for image in &scanned.images {
            let deletable = policy.is_deletable(image, cluster_refs)
                || (force_delete && !image.record.has_tag(KEEP_TAG));

            if !deletable {
                plan.keep.push(image.address.clone());
                continue;
            }

            let key = (image.repository.clone(), image.record.digest.clone());
            if !seen.insert(key) {
                continue;
            }

            plan.delete.push(DeletionItem {
                repository: image.repository.clone(),
                digest: image.record.digest.clone(),
                address: image.address.clone(),
                kind: ItemKind::Image,
            });

            for artifact in index.artifacts_for(&image.record.digest) {
                let key = (artifact.repository.clone(), artifact.digest.clone());
                if !seen.insert(key) {
                    continue;
                }
                plan.delete.push(DeletionItem {
                    repository: artifact.repository.clone(),
                    digest: artifact.digest.clone(),
                    address: artifact.address.clone(),
                    kind: ItemKind::Artifact,
                });
            }
        }
    }

    plan
}

/// What happened to one item of the deletion set.
#[derive(Debug)]
pub enum DeleteOutcome {
    /// The deletion call succeeded.
    Deleted,
    /// Dry-run: the call was suppressed.
    DryRun,
    /// The deletion call failed; the batch continued.
    Failed(DeleteError),
}

/// The per-item result of executing a plan.
#[derive(Debug)]
pub struct ItemOutcome {
    /// The planned item.
    pub item: DeletionItem,
    /// Its outcome.
    pub outcome: DeleteOutcome,
}

/// Executes a plan against the deleter, item by item.
///
/// In dry-run mode no deletion call is issued; every item reports
/// [`DeleteOutcome::DryRun`]. Otherwise each item is deleted independently
/// and failures are recorded without aborting the remainder.
pub async fn execute(
    deleter: &impl ImageDeleter,
    plan: &SweepPlan,
    dry_run: bool,
) -> Vec<ItemOutcome> {
    let mut outcomes = Vec::with_capacity(plan.delete.len());

    for item in &plan.delete {
        let outcome = if dry_run {
            info!("dry run, would delete {}", item.address);
            DeleteOutcome::DryRun
        } else {
            info!("deleting {}", item.address);
            match deleter.delete_image(&item.repository, &item.digest).await {
                Ok(()) => DeleteOutcome::Deleted,
                Err(err) => {
                    warn!("failed to delete {}: {err}", item.address);
                    DeleteOutcome::Failed(err)
                }
            }
        };
        outcomes.push(ItemOutcome {
            item: item.clone(),
            outcome,
        });
    }

    outcomes
}
