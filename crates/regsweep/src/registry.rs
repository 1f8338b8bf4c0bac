//! Collaborator interfaces at the registry boundary.
//!
//! The decision engine is pure over an immutable snapshot; every network
//! operation lives behind one of these traits. Production implementations
//! wrap the registry's API (see the `regsweep-ecr` crate); tests use
//! in-memory implementations.

use async_trait::async_trait;

use crate::error::{DeleteError, Result};
use crate::record::{ImageRecord, RepositoryRecord};

/// Enumeration of registry contents.
///
/// Pagination is the implementation's concern: the engine requires complete
/// listings, because deletion decisions are unsafe over a partial snapshot.
#[async_trait]
pub trait RegistrySource {
    /// Lists every repository in the registry, each carrying its
    /// force-delete flag.
    async fn list_repositories(&self) -> Result<Vec<RepositoryRecord>>;

    /// Lists every manifest entry in a repository.
    async fn list_images(&self, repository: &str) -> Result<Vec<ImageRecord>>;
}

/// Retrieval of raw manifest bodies, keyed by digest.
#[async_trait]
pub trait ManifestFetcher {
    /// Fetches a manifest body, accepting the given media type.
    ///
    /// `Ok(None)` means the manifest no longer exists or came back without
    /// a body — both degrade to "cannot cascade" for the caller. A
    /// transport error is also non-fatal at the call site.
    async fn manifest_body(
        &self,
        repository: &str,
        digest: &str,
        accepted_media_type: &str,
    ) -> Result<Option<String>>;
}

/// Deletion of a single manifest entry. Assumed atomic per image.
#[async_trait]
pub trait ImageDeleter {
    /// Deletes one digest from a repository.
    async fn delete_image(
        &self,
        repository: &str,
        digest: &str,
    ) -> std::result::Result<(), DeleteError>;
}
