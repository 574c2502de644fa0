use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use offsync_core::{
    Deployment, DiskStorage, HttpFetcher, NoopHost, SyncConfig, SyncError, SyncWorker,
};

use super::args::*;
use crate::exit_codes;

pub mod get;
pub mod lifecycle;
pub mod status;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let worker = build_worker(&cli.global).await?;
    match cli.cmd {
        Command::Install => lifecycle::install(&worker).await,
        Command::Activate => lifecycle::activate(&worker).await,
        Command::Get(args) => get::run(&worker, args).await,
        Command::Message(args) => lifecycle::message(&worker, &args.token).await,
        Command::Fill => lifecycle::fill(&worker).await,
        Command::Status => status::run(&worker).await,
    }
}

/// Exit code for an error that escaped a command.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<SyncError>() {
        Some(sync) => sync.exit_code(),
        None => exit_codes::INTERNAL_ERROR,
    }
}

async fn build_worker(global: &GlobalArgs) -> anyhow::Result<SyncWorker> {
    let mut config = SyncConfig::from_env();
    if let Some(origin) = &global.origin {
        config = config.with_origin(origin.as_str());
    }

    let deployment = Deployment::load(&global.deployment)
        .await
        .with_context(|| format!("loading deployment {}", global.deployment.display()))?;

    let cache_dir = resolve_cache_dir(global.cache_dir.clone())?;
    tracing::debug!(cache_dir = %cache_dir.display(), origin = %config.origin, "building worker");

    let fetcher = Arc::new(HttpFetcher::new(&config)?);
    let worker = SyncWorker::new(
        config,
        deployment,
        Arc::new(DiskStorage::with_dir(cache_dir)),
        fetcher,
        Arc::new(NoopHost),
    )?;
    Ok(worker)
}

fn resolve_cache_dir(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    let base = dirs::cache_dir().ok_or_else(|| SyncError::Config {
        message: "no platform cache directory; pass --cache-dir".to_string(),
    })?;
    Ok(base.join("offsync"))
}
