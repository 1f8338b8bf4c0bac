//! Data model for a single sweep run.
//!
//! Everything here is constructed fresh from a live snapshot of registry and
//! cluster state and discarded when the run ends. Optional registry fields
//! (tags, timestamps, artifact media type) are `Option`s rather than
//! sentinels so that "predicate false on missing data" is enforced by the
//! type system.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A named collection of images in the registry.
#[derive(Debug, Clone)]
pub struct RepositoryRecord {
    /// Repository name, unique within the registry.
    pub name: String,
    /// Base URI used to derive canonical image addresses.
    pub uri: String,
    /// Set when the repository is marked unapproved: every image in it is
    /// additionally collected for deletion, `keep`-tagged images excepted.
    pub force_delete: bool,
}

/// One manifest entry inside a repository, as enumerated by the registry.
///
/// The digest is assigned by the registry and immutable. Everything else is
/// optional metadata the registry may or may not report.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    /// Content hash of the manifest, unique within the repository.
    pub digest: String,
    /// Tag list; the first tag is the "primary" tag when present.
    pub tags: Option<Vec<String>>,
    /// Manifest media type, when reported.
    pub manifest_media_type: Option<String>,
    /// Artifact media type, set for OCI artifacts and some config blobs.
    pub artifact_media_type: Option<String>,
    /// When the manifest was last pushed.
    pub pushed_at: Option<DateTime<Utc>>,
    /// When the registry last recorded a pull.
    pub last_pulled_at: Option<DateTime<Utc>>,
}

impl ImageRecord {
    /// The first tag, when any tag exists.
    pub fn primary_tag(&self) -> Option<&str> {
        self.tags.as_ref()?.first().map(String::as_str)
    }

    /// Whether the literal tag appears anywhere in the tag list.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags
            .as_ref()
            .is_some_and(|tags| tags.iter().any(|t| t == tag))
    }
}

/// A real image tagged with its derived canonical address.
///
/// The address is derived from the current tag list and base URI; it is a
/// join key, never authoritative, and must be recomputed if tags change.
#[derive(Debug, Clone)]
pub struct ClassifiedImage {
    /// The underlying registry record.
    pub record: ImageRecord,
    /// Name of the owning repository.
    pub repository: String,
    /// Canonical tag- or digest-qualified address.
    pub address: String,
}

/// An ancillary artifact whose subject image has been resolved.
///
/// Lifecycle-bound to its subject: it inherits the subject's deletion
/// verdict and is never evaluated independently.
#[derive(Debug, Clone)]
pub struct ArtifactRecord {
    /// Content hash of the artifact manifest.
    pub digest: String,
    /// Name of the owning repository.
    pub repository: String,
    /// Digest-qualified address (artifacts are typically untagged).
    pub address: String,
    /// Digest of the image this artifact describes.
    pub subject_digest: String,
}

/// The set of canonical image addresses currently used by running or
/// schedulable cluster workloads. Externally supplied, read-only to the
/// decision engine.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusterRefs(HashSet<String>);

impl ClusterRefs {
    /// Membership test against a canonical address.
    pub fn contains(&self, address: &str) -> bool {
        self.0.contains(address)
    }

    /// Number of distinct referenced addresses.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no workload references were collected.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for ClusterRefs {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        ClusterRefs(iter.into_iter().collect())
    }
}

impl From<HashSet<String>> for ClusterRefs {
    fn from(addresses: HashSet<String>) -> Self {
        ClusterRefs(addresses)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record_with_tags(tags: Option<Vec<&str>>) -> ImageRecord {
        ImageRecord {
            digest: "sha256:abc".into(),
            tags: tags.map(|t| t.into_iter().map(String::from).collect()),
            manifest_media_type: None,
            artifact_media_type: None,
            pushed_at: None,
            last_pulled_at: None,
        }
    }

    #[test]
    fn test_primary_tag() {
        assert_eq!(
            record_with_tags(Some(vec!["v1", "latest"])).primary_tag(),
            Some("v1")
        );
        assert_eq!(record_with_tags(Some(vec![])).primary_tag(), None);
        assert_eq!(record_with_tags(None).primary_tag(), None);
    }

    #[test]
    fn test_has_tag() {
        let record = record_with_tags(Some(vec!["v1", "keep"]));
        assert!(record.has_tag("keep"));
        assert!(!record.has_tag("v2"));
        assert!(!record_with_tags(None).has_tag("keep"));
    }

    #[test]
    fn test_cluster_refs_membership() {
        let refs: ClusterRefs = ["repo:v1".to_string(), "repo@sha256:abc".to_string()]
            .into_iter()
            .collect();
        assert!(refs.contains("repo:v1"));
        assert!(!refs.contains("repo:v2"));
        assert_eq!(refs.len(), 2);
    }
}
