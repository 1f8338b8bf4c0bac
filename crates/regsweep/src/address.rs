//! Canonical image address derivation.
//!
//! The address is the join key matched byte-for-byte against the cluster
//! reference set, so the separator rules are fixed: `:` for tag-qualified,
//! `@` for digest-qualified, first tag wins. Workload manifests almost
//! always reference images by tag, which is why the tag form is preferred.

use crate::mediatype::{classify, ManifestKind};
use crate::record::{ImageRecord, RepositoryRecord};

/// Derives the canonical address for a record within its repository.
///
/// Returns `None` for records whose manifest media type is unsupported —
/// they belong to neither the image nor the artifact set and have no
/// meaningful address.
pub fn image_address(record: &ImageRecord, repository: &RepositoryRecord) -> Option<String> {
    match classify(
        record.manifest_media_type.as_deref(),
        record.artifact_media_type.as_deref(),
    ) {
        ManifestKind::Unsupported => None,
        _ => Some(match record.primary_tag() {
            Some(tag) => format!("{}:{tag}", repository.uri),
            None => digest_address(&record.digest, repository),
        }),
    }
}

/// The digest-qualified address, used for untagged records and for
/// artifacts (which are looked up by digest, not tag).
pub fn digest_address(digest: &str, repository: &RepositoryRecord) -> String {
    format!("{}@{digest}", repository.uri)
}
