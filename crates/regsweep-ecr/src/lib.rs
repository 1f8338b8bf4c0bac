//! AWS ECR implementations of the regsweep collaborator traits.
//!
//! This crate is deliberately thin glue: paginated enumeration with the
//! `Approved` resource-tag check, manifest retrieval via `BatchGetImage`,
//! and deletion via `BatchDeleteImage`, each mapped onto the corresponding
//! trait from the core crate. Registry-id resolution lives here too because
//! some AWS partitions (notably GovCloud) do not support `DescribeRegistry`
//! and require an explicit override.

use async_trait::async_trait;
use aws_sdk_ecr::types::{ImageDetail, ImageFailureCode, ImageIdentifier, Repository};
use aws_sdk_ecr::Client;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use regsweep::{
    DeleteError, ImageDeleter, ImageRecord, ManifestFetcher, RegistrySource, RepositoryRecord,
    Result, SweepError,
};

/// Resource tag whose falsy value marks a repository unapproved.
const APPROVED_TAG_KEY: &str = "Approved";

/// An ECR registry scoped to a resolved registry id.
pub struct EcrRegistry {
    client: Client,
    registry_id: String,
}

impl EcrRegistry {
    /// Wraps an already-constructed client.
    pub fn new(client: Client, registry_id: String) -> Self {
        EcrRegistry {
            client,
            registry_id,
        }
    }

    /// Loads AWS configuration from the environment and resolves the
    /// registry id, preferring the explicit override.
    pub async fn connect(registry_id_override: Option<String>) -> Result<Self> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = Client::new(&config);
        let registry_id = resolve_registry_id(&client, registry_id_override).await?;
        Ok(EcrRegistry {
            client,
            registry_id,
        })
    }

    /// The resolved registry id.
    pub fn registry_id(&self) -> &str {
        &self.registry_id
    }

    /// Whether the repository carries an `Approved` tag with a falsy value.
    async fn is_force_delete(&self, arn: &str) -> Result<bool> {
        let tags = self
            .client
            .list_tags_for_resource()
            .resource_arn(arn)
            .send()
            .await
            .map_err(|err| SweepError::registry(format!("listing tags for {arn}"), err))?;

        for tag in tags.tags() {
            if tag.key() == APPROVED_TAG_KEY && is_falsy(tag.value()) {
                info!("repository {arn} is marked unapproved, images should be deleted");
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Resolves the registry id: explicit override, else `DescribeRegistry`.
///
/// Auto-discovery failure is fatal with an actionable message, because an
/// incomplete guess about which registry to sweep is unsafe.
pub async fn resolve_registry_id(
    client: &Client,
    registry_id_override: Option<String>,
) -> Result<String> {
    if let Some(id) = registry_id_override {
        return Ok(id);
    }

    let registry = client.describe_registry().send().await.map_err(|err| {
        SweepError::RegistryIdUnresolved(format!(
            "DescribeRegistry failed ({err}); this partition may not support it — \
             set AWS_REGISTRY_ID to the registry id to sweep"
        ))
    })?;

    registry
        .registry_id()
        .map(String::from)
        .ok_or_else(|| {
            SweepError::RegistryIdUnresolved(
                "DescribeRegistry returned no registry id; set AWS_REGISTRY_ID".into(),
            )
        })
}

#[async_trait]
impl RegistrySource for EcrRegistry {
    async fn list_repositories(&self) -> Result<Vec<RepositoryRecord>> {
        let mut repositories = Vec::new();
        let mut pages = self
            .client
            .describe_repositories()
            .registry_id(&self.registry_id)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page =
                page.map_err(|err| SweepError::registry("listing repositories", err))?;
            for repository in page.repositories() {
                if let Some(record) = self.convert_repository(repository).await? {
                    repositories.push(record);
                }
            }
        }

        debug!("enumerated {} repositories", repositories.len());
        Ok(repositories)
    }

    async fn list_images(&self, repository: &str) -> Result<Vec<ImageRecord>> {
        let mut records = Vec::new();
        let mut pages = self
            .client
            .describe_images()
            .registry_id(&self.registry_id)
            .repository_name(repository)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|err| {
                SweepError::registry(format!("listing images in {repository}"), err)
            })?;
            for detail in page.image_details() {
                match convert_image_detail(detail) {
                    Some(record) => records.push(record),
                    None => warn!("image detail in {repository} has no digest, skipping"),
                }
            }
        }

        Ok(records)
    }
}

impl EcrRegistry {
    async fn convert_repository(
        &self,
        repository: &Repository,
    ) -> Result<Option<RepositoryRecord>> {
        let (Some(name), Some(uri)) = (repository.repository_name(), repository.repository_uri())
        else {
            warn!("repository entry missing name or uri, skipping");
            return Ok(None);
        };

        let force_delete = match repository.repository_arn() {
            Some(arn) => self.is_force_delete(arn).await?,
            None => false,
        };

        Ok(Some(RepositoryRecord {
            name: name.to_string(),
            uri: uri.to_string(),
            force_delete,
        }))
    }
}

#[async_trait]
impl ManifestFetcher for EcrRegistry {
    async fn manifest_body(
        &self,
        repository: &str,
        digest: &str,
        accepted_media_type: &str,
    ) -> Result<Option<String>> {
        let response = self
            .client
            .batch_get_image()
            .registry_id(&self.registry_id)
            .repository_name(repository)
            .image_ids(ImageIdentifier::builder().image_digest(digest).build())
            .accepted_media_types(accepted_media_type)
            .send()
            .await
            .map_err(|err| {
                SweepError::registry(format!("fetching manifest {repository}@{digest}"), err)
            })?;

        // Not-found comes back as a per-image failure, not a call error.
        for failure in response.failures() {
            debug!(
                "manifest {repository}@{digest} not returned: {:?} {:?}",
                failure.failure_code(),
                failure.failure_reason()
            );
        }

        let Some(image) = response.images().first() else {
            return Ok(None);
        };
        Ok(image.image_manifest().map(String::from))
    }
}

#[async_trait]
impl ImageDeleter for EcrRegistry {
    async fn delete_image(
        &self,
        repository: &str,
        digest: &str,
    ) -> std::result::Result<(), DeleteError> {
        let response = self
            .client
            .batch_delete_image()
            .registry_id(&self.registry_id)
            .repository_name(repository)
            .image_ids(ImageIdentifier::builder().image_digest(digest).build())
            .send()
            .await
            .map_err(|err| DeleteError::Server(err.to_string()))?;

        match response.failures().first() {
            None => Ok(()),
            Some(failure) => {
                let reason = failure
                    .failure_reason()
                    .unwrap_or("no reason given")
                    .to_string();
                Err(match failure.failure_code() {
                    Some(ImageFailureCode::ImageNotFound) => DeleteError::NotFound,
                    Some(
                        ImageFailureCode::InvalidImageDigest
                        | ImageFailureCode::InvalidImageTag
                        | ImageFailureCode::MissingDigestAndTag,
                    ) => DeleteError::InvalidParameter(reason),
                    _ => DeleteError::Server(reason),
                })
            }
        }
    }
}

/// Interprets an `Approved` tag value. Empty and explicit-negative values
/// mark the repository unapproved.
fn is_falsy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "false" | "0" | "no"
    )
}

/// Converts an ECR image detail into the core record type. Returns `None`
/// when the detail carries no digest, which should not happen but cannot be
/// represented downstream.
fn convert_image_detail(detail: &ImageDetail) -> Option<ImageRecord> {
    let tags = detail.image_tags();
    Some(ImageRecord {
        digest: detail.image_digest()?.to_string(),
        tags: if tags.is_empty() {
            None
        } else {
            Some(tags.to_vec())
        },
        manifest_media_type: detail.image_manifest_media_type().map(String::from),
        artifact_media_type: detail.artifact_media_type().map(String::from),
        pushed_at: detail.image_pushed_at().and_then(to_chrono),
        last_pulled_at: detail.last_recorded_pull_time().and_then(to_chrono),
    })
}

/// Converts a smithy timestamp to a UTC chrono instant.
fn to_chrono(timestamp: &aws_sdk_ecr::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_is_falsy() {
        assert!(is_falsy(""));
        assert!(is_falsy("false"));
        assert!(is_falsy("False"));
        assert!(is_falsy("0"));
        assert!(is_falsy("no"));
        assert!(is_falsy("  "));
        assert!(!is_falsy("true"));
        assert!(!is_falsy("yes"));
        assert!(!is_falsy("anything else"));
    }

    #[test]
    fn test_convert_image_detail() {
        let detail = ImageDetail::builder()
            .image_digest("sha256:abc")
            .image_tags("v1")
            .image_tags("latest")
            .image_manifest_media_type("application/vnd.oci.image.manifest.v1+json")
            .image_pushed_at(aws_sdk_ecr::primitives::DateTime::from_secs(1_700_000_000))
            .build();

        let record = convert_image_detail(&detail).unwrap();
        assert_eq!(record.digest, "sha256:abc");
        assert_eq!(
            record.tags.as_deref(),
            Some(["v1".to_string(), "latest".to_string()].as_slice())
        );
        assert_eq!(record.pushed_at.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(record.last_pulled_at, None);
        assert_eq!(record.artifact_media_type, None);
    }

    #[test]
    fn test_convert_image_detail_without_digest() {
        let detail = ImageDetail::builder().image_tags("v1").build();
        assert!(convert_image_detail(&detail).is_none());
    }

    #[test]
    fn test_convert_untagged_detail_has_no_tags() {
        let detail = ImageDetail::builder().image_digest("sha256:abc").build();
        let record = convert_image_detail(&detail).unwrap();
        assert_eq!(record.tags, None);
    }
}
