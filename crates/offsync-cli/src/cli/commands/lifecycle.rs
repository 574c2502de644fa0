use anyhow::Context;
use offsync_core::{FillReport, Lifecycle, MessageOutcome, SyncWorker};

use crate::exit_codes;

pub async fn install(worker: &SyncWorker) -> anyhow::Result<i32> {
    let staged = worker.on_install().await?;
    println!("staged {} shell resource(s)", staged);
    Ok(exit_codes::SUCCESS)
}

pub async fn activate(worker: &SyncWorker) -> anyhow::Result<i32> {
    let outcome = worker
        .on_activate()
        .await
        .into_result()
        .context("activation failed, all caches cleared")?;
    println!("{}", outcome);
    Ok(exit_codes::SUCCESS)
}

pub async fn message(worker: &SyncWorker, token: &str) -> anyhow::Result<i32> {
    match worker.on_message(token).await? {
        MessageOutcome::Ignored => {
            eprintln!("ignored unknown message: {}", token);
            Ok(exit_codes::CONFIG_ERROR)
        }
        MessageOutcome::SkippedWaiting => {
            println!("skip-waiting requested");
            Ok(exit_codes::SUCCESS)
        }
        MessageOutcome::Filled(report) => Ok(print_fill(&report)),
    }
}

pub async fn fill(worker: &SyncWorker) -> anyhow::Result<i32> {
    let report = worker.fill_remaining().await?;
    Ok(print_fill(&report))
}

fn print_fill(report: &FillReport) -> i32 {
    println!(
        "fetched {}, already cached {}, failed {}",
        report.fetched.len(),
        report.skipped,
        report.failed.len()
    );
    for (key, reason) in &report.failed {
        eprintln!("  {}: {}", key, reason);
    }
    if report.is_complete() {
        exit_codes::SUCCESS
    } else {
        exit_codes::INCOMPLETE
    }
}
