use anyhow::Context;
use offsync_core::{resource_url, FetchRequest, SyncError, SyncWorker, ROOT_KEY};
use std::io::Write;

use super::super::args::GetArgs;
use crate::exit_codes;

pub async fn run(worker: &SyncWorker, args: GetArgs) -> anyhow::Result<i32> {
    let url = request_url(worker, &args.path);
    let response = worker.respond(&FetchRequest::get(url.as_str())).await?;
    tracing::info!(url = %url, status = response.status, bytes = response.body.len(), "served");

    match &args.output {
        Some(path) => tokio::fs::write(path, &response.body)
            .await
            .with_context(|| format!("writing {}", path.display()))?,
        None => std::io::stdout()
            .write_all(&response.body)
            .context("writing body to stdout")?,
    }

    if !response.is_success() {
        return Err(SyncError::Http {
            key: args.path,
            status: response.status,
        }
        .into());
    }
    Ok(exit_codes::SUCCESS)
}

fn request_url(worker: &SyncWorker, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let key = path.trim_start_matches('/');
    let key = if key.is_empty() { ROOT_KEY } else { key };
    resource_url(key, worker.config())
}
