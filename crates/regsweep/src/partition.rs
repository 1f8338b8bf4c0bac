//! Per-repository classification pass.
//!
//! Splits a repository's enumerated records into real images (with derived
//! canonical addresses) and ancillary-artifact candidates whose subjects are
//! resolved later, and applies the single-image-repository guard.

use log::{debug, info};

use crate::address::image_address;
use crate::mediatype::{classify, ManifestKind};
use crate::policy::RetentionPolicy;
use crate::record::{ClassifiedImage, ImageRecord, RepositoryRecord};

/// A repository's records partitioned for evaluation.
#[derive(Debug)]
pub struct ScannedRepository {
    /// The repository the records came from.
    pub repository: RepositoryRecord,
    /// Real images, each with its canonical address.
    pub images: Vec<ClassifiedImage>,
    /// Ancillary artifacts awaiting subject resolution.
    pub artifact_candidates: Vec<ImageRecord>,
}

/// Partitions one repository's full enumeration.
///
/// Returns `None` when the repository holds exactly one image: that image
/// is skipped from evaluation entirely — never added to the deletable or
/// keepable sets, even for force-delete repositories — so a sweep can never
/// leave a repository empty. A staleness diagnostic is logged when the lone
/// image's last pull predates the minimum-age window.
pub fn partition_repository(
    repository: RepositoryRecord,
    records: Vec<ImageRecord>,
    policy: &RetentionPolicy,
) -> Option<ScannedRepository> {
    if let [only] = records.as_slice() {
        if policy.is_stale(only) {
            info!(
                "image {}@{} is the only image in the repository, skipping; \
                 it has not been pulled within the minimum-age window, consider deleting",
                repository.uri, only.digest
            );
        } else {
            info!(
                "image {}@{} is the only image in the repository, skipping",
                repository.uri, only.digest
            );
        }
        return None;
    }

    let mut images = Vec::new();
    let mut artifact_candidates = Vec::new();

    for record in records {
        match classify(
            record.manifest_media_type.as_deref(),
            record.artifact_media_type.as_deref(),
        ) {
            ManifestKind::ContainerImage | ManifestKind::ManifestList => {
                // Not Unsupported, so an address always derives.
                if let Some(address) = image_address(&record, &repository) {
                    images.push(ClassifiedImage {
                        record,
                        repository: repository.name.clone(),
                        address,
                    });
                }
            }
            ManifestKind::AncillaryArtifact => {
                artifact_candidates.push(record);
            }
            ManifestKind::Unsupported => {
                debug!(
                    "skipping {} with unsupported manifest media type {:?}",
                    record.digest, record.manifest_media_type
                );
            }
        }
    }

    Some(ScannedRepository {
        repository,
        images,
        artifact_candidates,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::policy::DEFAULT_MINIMUM_AGE_DAYS;

    const OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
    const COSIGN_SIG: &str = "application/vnd.dev.cosign.simplesigning.v1+json";

    fn repo() -> RepositoryRecord {
        RepositoryRecord {
            name: "testing".into(),
            uri: "registry.example/testing".into(),
            force_delete: false,
        }
    }

    fn record(digest: &str, manifest: Option<&str>, artifact: Option<&str>) -> ImageRecord {
        ImageRecord {
            digest: digest.into(),
            tags: None,
            manifest_media_type: manifest.map(String::from),
            artifact_media_type: artifact.map(String::from),
            pushed_at: None,
            last_pulled_at: None,
        }
    }

    fn policy() -> RetentionPolicy {
        RetentionPolicy::new(DEFAULT_MINIMUM_AGE_DAYS)
    }

    #[test]
    fn test_partition_splits_images_and_artifacts() {
        let records = vec![
            record("sha256:img", Some(OCI_MANIFEST), None),
            record("sha256:sig", Some(OCI_MANIFEST), Some(COSIGN_SIG)),
            record("sha256:junk", Some("other"), None),
        ];
        let scanned = partition_repository(repo(), records, &policy()).unwrap();
        assert_eq!(scanned.images.len(), 1);
        assert_eq!(scanned.images[0].record.digest, "sha256:img");
        assert_eq!(
            scanned.images[0].address,
            "registry.example/testing@sha256:img"
        );
        assert_eq!(scanned.artifact_candidates.len(), 1);
        assert_eq!(scanned.artifact_candidates[0].digest, "sha256:sig");
    }

    #[test]
    fn test_single_image_repository_is_skipped() {
        let records = vec![record("sha256:only", Some(OCI_MANIFEST), None)];
        assert!(partition_repository(repo(), records, &policy()).is_none());
    }

    #[test]
    fn test_empty_repository_partitions_to_nothing() {
        let scanned = partition_repository(repo(), vec![], &policy()).unwrap();
        assert!(scanned.images.is_empty());
        assert!(scanned.artifact_candidates.is_empty());
    }
}
