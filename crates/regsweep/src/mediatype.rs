//! Manifest media-type classification.
//!
//! A registry repository stores more than runnable images: cosign signatures,
//! attestations, and SBOMs are pushed as OCI artifacts alongside the images
//! they describe. They look like manifests but must never be evaluated
//! against retention policy on their own. Classification partitions every
//! manifest entry up front, before any policy runs.

/// Single-platform manifest media types (Docker schema 2 and OCI).
pub const CONTAINER_MANIFEST_MEDIA_TYPES: [&str; 2] = [
    "application/vnd.docker.distribution.manifest.v2+json",
    "application/vnd.oci.image.manifest.v1+json",
];

/// Multi-platform manifest-list / image-index media types.
pub const MANIFEST_LIST_MEDIA_TYPES: [&str; 2] = [
    "application/vnd.docker.distribution.manifest.list.v2+json",
    "application/vnd.oci.image.index.v1+json",
];

/// Artifact media types naming a standard image config blob. A manifest
/// whose artifact media type is one of these (or absent) is a real image,
/// not an ancillary artifact.
pub const IMAGE_CONFIG_MEDIA_TYPES: [&str; 2] = [
    "application/vnd.oci.image.config.v1+json",
    "application/vnd.docker.container.image.v1+json",
];

/// The partition a manifest entry falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    /// A single-platform runnable image.
    ContainerImage,
    /// A multi-platform index. Always runnable content; indexes carry no
    /// artifact media type.
    ManifestList,
    /// A non-runnable payload (signature, attestation) linked to a subject
    /// image. Never evaluated by retention predicates.
    AncillaryArtifact,
    /// Unknown manifest media type. Excluded from both the image and the
    /// artifact sets.
    Unsupported,
}

impl ManifestKind {
    /// True for entries that describe runnable content and go through
    /// retention policy.
    pub fn is_image(self) -> bool {
        matches!(self, ManifestKind::ContainerImage | ManifestKind::ManifestList)
    }
}

/// Classifies a manifest entry from its media-type metadata.
///
/// Pure and total: every combination of inputs maps to exactly one
/// [`ManifestKind`]. An absent manifest media type is `Unsupported`.
pub fn classify(
    manifest_media_type: Option<&str>,
    artifact_media_type: Option<&str>,
) -> ManifestKind {
    let Some(media_type) = manifest_media_type else {
        return ManifestKind::Unsupported;
    };

    if MANIFEST_LIST_MEDIA_TYPES.contains(&media_type) {
        return ManifestKind::ManifestList;
    }

    if CONTAINER_MANIFEST_MEDIA_TYPES.contains(&media_type) {
        return match artifact_media_type {
            None => ManifestKind::ContainerImage,
            Some(artifact) if IMAGE_CONFIG_MEDIA_TYPES.contains(&artifact) => {
                ManifestKind::ContainerImage
            }
            Some(_) => ManifestKind::AncillaryArtifact,
        };
    }

    ManifestKind::Unsupported
}

#[cfg(test)]
mod test {
    use super::*;

    const COSIGN_SIG: &str = "application/vnd.dev.cosign.simplesigning.v1+json";

    #[test]
    fn test_plain_manifest_is_image() {
        let kind = classify(
            Some("application/vnd.docker.distribution.manifest.v2+json"),
            None,
        );
        assert_eq!(kind, ManifestKind::ContainerImage);
        assert!(kind.is_image());
    }

    #[test]
    fn test_config_artifact_media_types_are_images() {
        for config in IMAGE_CONFIG_MEDIA_TYPES {
            for manifest in CONTAINER_MANIFEST_MEDIA_TYPES {
                assert!(classify(Some(manifest), Some(config)).is_image());
            }
        }
    }

    #[test]
    fn test_manifest_lists_are_images_regardless_of_artifact_type() {
        for manifest in MANIFEST_LIST_MEDIA_TYPES {
            assert_eq!(classify(Some(manifest), None), ManifestKind::ManifestList);
            assert!(classify(Some(manifest), None).is_image());
            // Indexes shouldn't carry an artifact media type, but if one
            // shows up it doesn't change the verdict.
            assert!(classify(Some(manifest), Some(COSIGN_SIG)).is_image());
        }
    }

    #[test]
    fn test_signature_payload_is_artifact() {
        let kind = classify(
            Some("application/vnd.oci.image.manifest.v1+json"),
            Some(COSIGN_SIG),
        );
        assert_eq!(kind, ManifestKind::AncillaryArtifact);
        assert!(!kind.is_image());
    }

    #[test]
    fn test_unknown_media_type_is_unsupported() {
        assert_eq!(classify(Some("other"), None), ManifestKind::Unsupported);
        assert_eq!(
            classify(Some("other"), Some(COSIGN_SIG)),
            ManifestKind::Unsupported
        );
    }

    #[test]
    fn test_absent_media_type_is_unsupported() {
        assert_eq!(classify(None, None), ManifestKind::Unsupported);
    }
}
