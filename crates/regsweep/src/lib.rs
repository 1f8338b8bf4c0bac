//! Image retention decision engine for container registries.
//!
//! This crate decides which images in a registry are safe to delete and
//! which must be retained, reconciling registry metadata against live
//! cluster usage and artifact relationships, then executes deletion with
//! cascading semantics:
//!
//! - classify every manifest entry into real images vs. ancillary artifacts
//!   (signatures, attestations) vs. unsupported,
//! - derive each image's canonical tag- or digest-qualified address,
//! - link artifacts to the image they describe via the manifest `subject`
//!   digest,
//! - evaluate an ordered set of independent retain predicates per image,
//! - cascade every deletion to the artifacts linked to it.
//!
//! All decisions are made over an immutable per-run snapshot; nothing
//! persists between runs. Network access lives behind the traits in
//! [`registry`]; the engine itself is pure and fails closed — when a signal
//! is missing or a lookup degrades, records are excluded from deletion and
//! cascade, never included.

pub mod address;
pub mod error;
pub mod mediatype;
pub mod partition;
pub mod plan;
pub mod policy;
pub mod record;
pub mod registry;
pub mod subject;
pub mod sweep;

pub use error::{DeleteError, Result, SweepError};
pub use mediatype::{classify, ManifestKind};
pub use plan::{DeleteOutcome, DeletionItem, ItemKind, ItemOutcome, SweepPlan};
pub use policy::{RetentionPolicy, DEFAULT_MINIMUM_AGE_DAYS, KEEP_TAG};
pub use record::{ArtifactRecord, ClassifiedImage, ClusterRefs, ImageRecord, RepositoryRecord};
pub use registry::{ImageDeleter, ManifestFetcher, RegistrySource};
pub use subject::{extract_subject_digest, SubjectIndex};
pub use sweep::{RegistrySnapshot, Sweeper};
