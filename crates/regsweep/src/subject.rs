//! Artifact-to-subject linkage.
//!
//! An ancillary artifact's manifest body carries an optional `subject`
//! back-reference naming the digest of the image it describes. Resolving
//! that link lets deletion cascade from an image to its signatures and
//! attestations. An artifact whose subject cannot be resolved is dropped
//! from the index — it cannot be safely cascaded and is left for a future
//! pass. That is always a local, non-fatal outcome.

use std::collections::HashMap;

use log::{debug, warn};
use serde::Deserialize;

use crate::address::digest_address;
use crate::record::{ArtifactRecord, ImageRecord, RepositoryRecord};
use crate::registry::ManifestFetcher;

/// The slice of an artifact manifest body the linker cares about.
#[derive(Debug, Deserialize)]
struct ArtifactManifestDoc {
    subject: Option<SubjectDescriptor>,
}

/// The `subject` descriptor of an artifact manifest.
#[derive(Debug, Deserialize)]
struct SubjectDescriptor {
    digest: Option<String>,
}

/// Extracts the subject digest from an artifact manifest body.
///
/// Returns `None` when the body is not valid JSON (logged as a warning,
/// once per occurrence), when no `subject` field is present, or when the
/// subject descriptor carries no digest.
pub fn extract_subject_digest(body: &str) -> Option<String> {
    let doc: ArtifactManifestDoc = match serde_json::from_str(body) {
        Ok(doc) => doc,
        Err(err) => {
            warn!("unable to decode artifact manifest body: {err}");
            return None;
        }
    };
    doc.subject.and_then(|subject| subject.digest)
}

/// Mapping from subject digest to the artifacts that reference it.
///
/// Insertion order within a bucket is preserved for deterministic output;
/// it carries no semantic meaning.
#[derive(Debug, Default)]
pub struct SubjectIndex {
    by_subject: HashMap<String, Vec<ArtifactRecord>>,
}

impl SubjectIndex {
    /// Appends an artifact to its subject's bucket.
    pub fn insert(&mut self, artifact: ArtifactRecord) {
        self.by_subject
            .entry(artifact.subject_digest.clone())
            .or_default()
            .push(artifact);
    }

    /// All artifacts linked to the given subject digest.
    pub fn artifacts_for(&self, subject_digest: &str) -> &[ArtifactRecord] {
        self.by_subject
            .get(subject_digest)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of indexed artifacts.
    pub fn len(&self) -> usize {
        self.by_subject.values().map(Vec::len).sum()
    }

    /// True when no artifacts were indexed.
    pub fn is_empty(&self) -> bool {
        self.by_subject.is_empty()
    }
}

/// Resolves the subject of each ancillary artifact in a repository and
/// appends the successful ones to the index.
///
/// Artifacts are dropped (with a logged reason) when the manifest cannot be
/// fetched, came back without a body, fails to decode, or carries no
/// subject digest. A record without a manifest media type cannot even be
/// requested and is dropped up front.
pub async fn link_artifacts(
    fetcher: &impl ManifestFetcher,
    repository: &RepositoryRecord,
    candidates: Vec<ImageRecord>,
    index: &mut SubjectIndex,
) {
    for record in candidates {
        let Some(media_type) = record.manifest_media_type.clone() else {
            debug!(
                "artifact {}/{} has no manifest media type, cannot fetch",
                repository.name, record.digest
            );
            continue;
        };

        let body = match fetcher
            .manifest_body(&repository.name, &record.digest, &media_type)
            .await
        {
            Ok(Some(body)) => body,
            Ok(None) => {
                warn!(
                    "artifact {}/{} no longer exists or has no manifest body",
                    repository.name, record.digest
                );
                continue;
            }
            Err(err) => {
                warn!(
                    "failed to fetch artifact manifest {}/{}: {err}",
                    repository.name, record.digest
                );
                continue;
            }
        };

        let Some(subject_digest) = extract_subject_digest(&body) else {
            debug!(
                "artifact {}/{} manifest has no subject digest",
                repository.name, record.digest
            );
            continue;
        };

        index.insert(ArtifactRecord {
            address: digest_address(&record.digest, repository),
            digest: record.digest,
            repository: repository.name.clone(),
            subject_digest,
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_subject_digest_present() {
        assert_eq!(
            extract_subject_digest(r#"{"subject": {"digest": "sha256:abc"}}"#).as_deref(),
            Some("sha256:abc")
        );
    }

    #[test]
    fn test_subject_without_digest() {
        assert_eq!(extract_subject_digest(r#"{"subject": {}}"#), None);
    }

    #[test]
    fn test_no_subject_field() {
        assert_eq!(extract_subject_digest("{}"), None);
    }

    #[test]
    fn test_malformed_body() {
        assert_eq!(extract_subject_digest("{not json"), None);
    }

    #[test]
    fn test_extra_fields_ignored() {
        let body = r#"{
            "schemaVersion": 2,
            "mediaType": "application/vnd.oci.image.manifest.v1+json",
            "subject": {
                "mediaType": "application/vnd.oci.image.manifest.v1+json",
                "digest": "sha256:def",
                "size": 1234
            }
        }"#;
        assert_eq!(extract_subject_digest(body).as_deref(), Some("sha256:def"));
    }

    #[test]
    fn test_index_buckets_preserve_insertion_order() {
        let mut index = SubjectIndex::default();
        for digest in ["sha256:sig1", "sha256:sig2"] {
            index.insert(ArtifactRecord {
                digest: digest.into(),
                repository: "repo".into(),
                address: format!("repo@{digest}"),
                subject_digest: "sha256:subject".into(),
            });
        }
        let bucket = index.artifacts_for("sha256:subject");
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[0].digest, "sha256:sig1");
        assert_eq!(bucket[1].digest, "sha256:sig2");
        assert!(index.artifacts_for("sha256:other").is_empty());
        assert_eq!(index.len(), 2);
    }
}
