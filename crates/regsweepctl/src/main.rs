//! Command-line sweep driver.
//!
//! `regsweepctl` reconciles an ECR registry against live Kubernetes usage
//! and deletes images that carry no retention signal, cascading to their
//! linked signature/attestation artifacts. One invocation is one complete
//! pass over a fresh snapshot; nothing persists between runs.

use anyhow::Result;
use clap::Parser;
use log::info;

use regsweep::{DeleteOutcome, ItemKind, RetentionPolicy, Sweeper, DEFAULT_MINIMUM_AGE_DAYS};
use regsweep_ecr::EcrRegistry;

/// regsweepctl
#[derive(Debug, Parser)]
#[clap(name = "regsweepctl", version)]
struct App {
    /// Retain any image pushed or pulled within this many days
    #[clap(long, env = "MINIMUM_IMAGE_AGE", default_value_t = DEFAULT_MINIMUM_AGE_DAYS)]
    minimum_image_age: i64,

    /// Registry id to sweep. Required where registry auto-discovery is
    /// unsupported (e.g. GovCloud partitions)
    #[clap(long, env = "AWS_REGISTRY_ID")]
    registry_id: Option<String>,

    /// Compute and report the full plan without issuing deletion calls
    #[clap(long, env = "DRY_RUN", value_parser = clap::builder::FalseyValueParser::new())]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("LOG_LEVEL", "info"))
        .init();

    let args = App::parse();

    let registry = EcrRegistry::connect(args.registry_id).await?;
    info!("sweeping registry {}", registry.registry_id());

    let policy = RetentionPolicy::new(args.minimum_image_age);
    let sweeper = Sweeper::new(&registry, &registry, policy);

    // The snapshot and the cluster reference set must both be complete
    // before anything is planned; any failure up to here aborts the run
    // with no deletion attempted.
    let snapshot = sweeper.snapshot().await?;
    let cluster = regsweep_kube::connect().await?;
    let cluster_refs = regsweep_kube::referenced_image_addresses(cluster).await?;

    let plan = sweeper.plan(&snapshot, &cluster_refs);
    info!(
        "plan: {} to delete, {} retained",
        plan.delete.len(),
        plan.keep.len()
    );

    if args.dry_run {
        println!("Dry run (no images deleted):");
    }

    let outcomes = sweeper.execute(&registry, &plan, args.dry_run).await;

    let mut deleted = 0;
    let mut failed = 0;
    for outcome in &outcomes {
        let kind = match outcome.item.kind {
            ItemKind::Image => "image",
            ItemKind::Artifact => "artifact",
        };
        match &outcome.outcome {
            DeleteOutcome::Deleted => {
                deleted += 1;
                println!("deleted  {kind:<8} {}", outcome.item.address);
            }
            DeleteOutcome::DryRun => {
                println!("planned  {kind:<8} {}", outcome.item.address);
            }
            DeleteOutcome::Failed(err) => {
                failed += 1;
                println!("failed   {kind:<8} {} ({err})", outcome.item.address);
            }
        }
    }

    println!(
        "{} retained, {} planned, {} deleted, {} failed",
        plan.keep.len(),
        outcomes.len(),
        deleted,
        failed
    );

    Ok(())
}
