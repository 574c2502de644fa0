use offsync_core::SyncWorker;

use crate::exit_codes;

pub async fn run(worker: &SyncWorker) -> anyhow::Result<i32> {
    let status = worker.status().await?;
    let config = worker.config();

    println!("origin:            {}", config.origin);
    println!("content cache:     {}", config.content_cache);
    println!("manifest:          {} resource(s)", status.manifest_resources);
    println!("cached:            {}", status.cached);
    println!("missing:           {}", status.missing.len());
    let persisted = match (status.has_persisted_manifest, status.persisted_is_current) {
        (false, _) => "none",
        (true, true) => "current",
        (true, false) => "outdated (run activate)",
    };
    println!("persisted manifest: {}", persisted);
    println!(
        "install pending:   {}",
        if status.install_pending { "yes (run activate)" } else { "no" }
    );
    for key in &status.missing {
        println!("  - {}", key);
    }
    Ok(exit_codes::SUCCESS)
}
