//! The retention policy: an ordered set of independent "retain" predicates.
//!
//! An image is retained if *any* predicate holds and deletable only when
//! none do. The timestamp predicates fail toward deletion on missing data —
//! a record the registry reports without push or pull history carries no
//! retention signal of its own — while cluster references and the literal
//! `keep` tag act as independent safety nets.
//!
//! "Now" is captured once when the policy is constructed and reused for
//! every comparison in the run, so predicate evaluations cannot skew
//! against each other.

use chrono::{DateTime, Duration, Utc};
use log::debug;

use crate::record::{ClassifiedImage, ClusterRefs, ImageRecord};

/// Tag that unconditionally retains an image, even against a
/// repository-level force-delete.
pub const KEEP_TAG: &str = "keep";

/// Default minimum image age, in days.
pub const DEFAULT_MINIMUM_AGE_DAYS: i64 = 7;

/// Retention verdict parameters for one run.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    minimum_age: Duration,
    now: DateTime<Utc>,
}

impl RetentionPolicy {
    /// Policy with the given minimum-age window, capturing "now" as a
    /// single UTC instant for the whole run.
    pub fn new(minimum_age_days: i64) -> Self {
        Self::with_now(minimum_age_days, Utc::now())
    }

    /// Policy with an explicit "now", for deterministic evaluation.
    pub fn with_now(minimum_age_days: i64, now: DateTime<Utc>) -> Self {
        RetentionPolicy {
            minimum_age: Duration::days(minimum_age_days),
            now,
        }
    }

    /// The instant before which push/pull activity no longer retains.
    fn cutoff(&self) -> DateTime<Utc> {
        self.now - self.minimum_age
    }

    /// Predicate 1: a push timestamp exists and is within the window.
    pub fn pushed_recently(&self, record: &ImageRecord) -> bool {
        record.pushed_at.is_some_and(|pushed| pushed > self.cutoff())
    }

    /// Predicate 3: a recorded pull exists and is within the window.
    pub fn pulled_recently(&self, record: &ImageRecord) -> bool {
        record
            .last_pulled_at
            .is_some_and(|pulled| pulled > self.cutoff())
    }

    /// Whether the record's last recorded pull (if any) predates the
    /// window. Used for the single-image-repository staleness diagnostic.
    pub fn is_stale(&self, record: &ImageRecord) -> bool {
        record
            .last_pulled_at
            .is_none_or(|pulled| pulled <= self.cutoff())
    }

    /// The final per-image verdict: deletable only if no retain predicate
    /// holds. Repository-level force-delete is a separate contributor and
    /// deliberately not consulted here.
    pub fn is_deletable(&self, image: &ClassifiedImage, cluster_refs: &ClusterRefs) -> bool {
        if self.pushed_recently(&image.record) {
            debug!("{} was pushed recently", image.address);
            return false;
        }
        if cluster_refs.contains(&image.address) {
            debug!("{} is referenced by a cluster workload", image.address);
            return false;
        }
        if self.pulled_recently(&image.record) {
            debug!("{} was pulled recently", image.address);
            return false;
        }
        if image.record.has_tag(KEEP_TAG) {
            debug!("{} is tagged {KEEP_TAG}", image.address);
            return false;
        }
        debug!("{} is deletable", image.address);
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(
        tags: Option<Vec<&str>>,
        pushed_days_ago: Option<i64>,
        pulled_days_ago: Option<i64>,
    ) -> ImageRecord {
        let now = Utc::now();
        ImageRecord {
            digest: "sha256:abc".into(),
            tags: tags.map(|t| t.into_iter().map(String::from).collect()),
            manifest_media_type: Some(
                "application/vnd.oci.image.manifest.v1+json".into(),
            ),
            artifact_media_type: None,
            pushed_at: pushed_days_ago.map(|d| now - Duration::days(d)),
            last_pulled_at: pulled_days_ago.map(|d| now - Duration::days(d)),
        }
    }

    fn image(record: ImageRecord) -> ClassifiedImage {
        ClassifiedImage {
            address: "repo:v1".into(),
            repository: "repo".into(),
            record,
        }
    }

    fn policy() -> RetentionPolicy {
        RetentionPolicy::new(DEFAULT_MINIMUM_AGE_DAYS)
    }

    #[test]
    fn test_recent_push_retains() {
        let img = image(record(None, Some(2), None));
        assert!(!policy().is_deletable(&img, &ClusterRefs::default()));
    }

    #[test]
    fn test_old_push_alone_does_not_retain() {
        let img = image(record(None, Some(10), None));
        assert!(policy().is_deletable(&img, &ClusterRefs::default()));
    }

    #[test]
    fn test_recent_pull_retains() {
        let img = image(record(None, None, Some(2)));
        assert!(!policy().is_deletable(&img, &ClusterRefs::default()));
    }

    #[test]
    fn test_old_pull_alone_does_not_retain() {
        let img = image(record(None, None, Some(10)));
        assert!(policy().is_deletable(&img, &ClusterRefs::default()));
    }

    #[test]
    fn test_missing_timestamps_do_not_retain() {
        let img = image(record(Some(vec!["v1"]), None, None));
        assert!(policy().is_deletable(&img, &ClusterRefs::default()));
    }

    #[test]
    fn test_cluster_reference_retains_regardless_of_age() {
        let img = image(record(None, Some(100), Some(100)));
        let refs: ClusterRefs = ["repo:v1".to_string()].into_iter().collect();
        assert!(!policy().is_deletable(&img, &refs));
    }

    #[test]
    fn test_keep_tag_retains() {
        let img = image(record(Some(vec!["keep"]), Some(100), None));
        assert!(!policy().is_deletable(&img, &ClusterRefs::default()));
    }

    #[test]
    fn test_keep_anywhere_in_tag_list() {
        let img = image(record(Some(vec!["v3", "keep", "latest"]), None, None));
        assert!(!policy().is_deletable(&img, &ClusterRefs::default()));
    }

    #[test]
    fn test_staleness() {
        let p = policy();
        assert!(p.is_stale(&record(None, None, Some(10))));
        assert!(p.is_stale(&record(None, None, None)));
        assert!(!p.is_stale(&record(None, None, Some(2))));
    }

    #[test]
    fn test_now_is_fixed_at_construction() {
        let now = Utc::now();
        let p = RetentionPolicy::with_now(7, now);
        let mut rec = record(None, None, None);
        // Exactly at the cutoff boundary counts as outside the window.
        rec.pushed_at = Some(now - Duration::days(7));
        assert!(!p.pushed_recently(&rec));
        rec.pushed_at = Some(now - Duration::days(7) + Duration::seconds(1));
        assert!(p.pushed_recently(&rec));
    }
}
