//! Install/activate/message lifecycle across version upgrades.
//!
//! Runs two deployments against the same storage the way a host would
//! across a redeploy, and checks the retention, eviction, promotion and
//! full-wipe guarantees of reconciliation.

mod common;

use std::sync::Arc;

use common::{deployment, worker, ProbeStorage, RecordingHost, ScriptedFetcher};
use offsync_core::{
    ActivationOutcome, CacheStorage, Lifecycle, Manifest, MessageOutcome, Resource, SyncError,
};

const V1: &[(&str, &str)] = &[
    ("/", "root-1"),
    ("index.html", "root-1"),
    ("main.dart.js", "main-1"),
    ("runtime.js", "runtime-1"),
    ("assets/logo.png", "logo-1"),
    ("assets/old.png", "old-1"),
];

const V2: &[(&str, &str)] = &[
    ("/", "root-2"),
    ("index.html", "root-2"),
    ("main.dart.js", "main-2"),
    ("runtime.js", "runtime-1"),
    ("assets/logo.png", "logo-2"),
];

const SHELL: &[&str] = &["main.dart.js", "index.html"];

fn serve_v1(fetcher: &ScriptedFetcher) {
    fetcher.serve("/", "<html>v1</html>");
    fetcher.serve("index.html", "<html>v1</html>");
    fetcher.serve("main.dart.js", "main v1");
    fetcher.serve("runtime.js", "runtime v1");
    fetcher.serve("assets/logo.png", "logo v1");
    fetcher.serve("assets/old.png", "old v1");
}

fn serve_v2(fetcher: &ScriptedFetcher) {
    fetcher.serve("/", "<html>v2</html>");
    fetcher.serve("index.html", "<html>v2</html>");
    fetcher.serve("main.dart.js", "main v2");
    fetcher.serve("runtime.js", "runtime v2 bytes");
    fetcher.serve("assets/logo.png", "logo v2");
}

/// Install and activate v1, then download everything for offline use.
async fn activate_v1_fully(
    storage: &Arc<ProbeStorage>,
    fetcher: &Arc<ScriptedFetcher>,
    host: &Arc<RecordingHost>,
) {
    serve_v1(fetcher);
    let v1 = worker(
        deployment(V1, SHELL),
        storage.clone(),
        fetcher.clone(),
        host.clone(),
    );
    v1.on_install().await.unwrap();
    assert!(v1.on_activate().await.is_success());
    let report = v1.fill_remaining().await.unwrap();
    assert!(report.is_complete());
}

#[tokio::test]
async fn test_first_activation_promotes_shell_and_claims() {
    let storage = ProbeStorage::new();
    let fetcher = ScriptedFetcher::new();
    let host = RecordingHost::new();
    serve_v1(&fetcher);

    let v1 = worker(deployment(V1, SHELL), storage.clone(), fetcher, host.clone());
    assert_eq!(v1.on_install().await.unwrap(), 2);
    assert_eq!(host.skips(), 1);

    let outcome = v1.on_activate().await;
    assert_eq!(outcome, ActivationOutcome::Rebuilt { promoted: 2 });
    assert_eq!(host.claims(), 1);

    assert_eq!(
        v1.content().keys().await.unwrap(),
        vec!["index.html".to_string(), "main.dart.js".to_string()]
    );
    assert!(v1.staging().keys().await.unwrap().is_empty());
    assert!(!storage.has_cache("offsync-temp-cache").await.unwrap());
}

#[tokio::test]
async fn test_upgrade_retains_unchanged_entries_byte_identical() {
    let storage = ProbeStorage::new();
    let fetcher = ScriptedFetcher::new();
    let host = RecordingHost::new();
    activate_v1_fully(&storage, &fetcher, &host).await;

    let before = storage
        .inner
        .get("offsync-app-cache", "runtime.js")
        .await
        .unwrap()
        .unwrap();

    // The origin now serves different bytes for an unchanged fingerprint;
    // retention must keep the cached copy rather than refetch.
    serve_v2(&fetcher);
    let v2 = worker(deployment(V2, SHELL), storage.clone(), fetcher, host);
    v2.on_install().await.unwrap();
    let outcome = v2.on_activate().await;

    assert!(matches!(outcome, ActivationOutcome::Upgraded { .. }));
    let after = v2.content().get("runtime.js").await.unwrap().unwrap();
    assert_eq!(after, before);
    assert_eq!(after.body, b"runtime v1");
}

#[tokio::test]
async fn test_upgrade_evicts_changed_and_removed_entries() {
    let storage = ProbeStorage::new();
    let fetcher = ScriptedFetcher::new();
    let host = RecordingHost::new();
    activate_v1_fully(&storage, &fetcher, &host).await;

    serve_v2(&fetcher);
    let v2 = worker(deployment(V2, SHELL), storage.clone(), fetcher, host);
    v2.on_install().await.unwrap();
    let outcome = v2.on_activate().await;

    // Cached before: /, index.html, main.dart.js, runtime.js, logo, old.
    // Kept: runtime.js. Evicted: /, index.html, main.dart.js, logo, old.
    assert_eq!(
        outcome,
        ActivationOutcome::Upgraded {
            retained: 1,
            evicted: 5,
            promoted: 2,
        }
    );

    let content = v2.content();
    assert!(content.get("assets/old.png").await.unwrap().is_none());
    assert!(content.get("assets/logo.png").await.unwrap().is_none());
    assert!(content.get("/").await.unwrap().is_none());

    // Every surviving key is drawn from the new manifest.
    let manifest = &v2.deployment().manifest;
    for key in content.keys().await.unwrap() {
        assert!(manifest.contains(&key), "orphaned entry: {}", key);
    }
}

#[tokio::test]
async fn test_shell_always_comes_from_staging() {
    let storage = ProbeStorage::new();
    let fetcher = ScriptedFetcher::new();
    let host = RecordingHost::new();
    activate_v1_fully(&storage, &fetcher, &host).await;

    // Same manifest redeployed; the shell is restaged and overwrites the
    // retained copies even though fingerprints did not change.
    fetcher.serve("main.dart.js", "main v1 restaged");
    fetcher.serve("index.html", "<html>v1 restaged</html>");
    let again = worker(deployment(V1, SHELL), storage.clone(), fetcher, host);
    again.on_install().await.unwrap();
    let outcome = again.on_activate().await;

    assert!(matches!(
        outcome,
        ActivationOutcome::Upgraded {
            evicted: 0,
            promoted: 2,
            ..
        }
    ));
    let main = again.content().get("main.dart.js").await.unwrap().unwrap();
    assert_eq!(main.body, b"main v1 restaged");
    let index = again.content().get("index.html").await.unwrap().unwrap();
    assert_eq!(index.body, b"<html>v1 restaged</html>");
}

#[tokio::test]
async fn test_persisted_manifest_equals_new_manifest() {
    let storage = ProbeStorage::new();
    let fetcher = ScriptedFetcher::new();
    let host = RecordingHost::new();
    activate_v1_fully(&storage, &fetcher, &host).await;

    serve_v2(&fetcher);
    let v2 = worker(deployment(V2, SHELL), storage.clone(), fetcher, host);
    v2.on_install().await.unwrap();
    v2.on_activate().await;

    let persisted = v2.manifests().load_persisted().await.unwrap();
    assert_eq!(persisted, Some(Manifest::new(V2.iter().copied())));

    let status = v2.status().await.unwrap();
    assert!(status.has_persisted_manifest);
    assert!(status.persisted_is_current);
}

#[tokio::test]
async fn test_reconciliation_failure_wipes_everything() {
    let storage = ProbeStorage::new();
    let fetcher = ScriptedFetcher::new();
    let host = RecordingHost::new();
    activate_v1_fully(&storage, &fetcher, &host).await;

    serve_v2(&fetcher);
    let v2 = worker(
        deployment(V2, SHELL),
        storage.clone(),
        fetcher,
        host.clone(),
    );
    v2.on_install().await.unwrap();

    let claims_before = host.claims();
    storage.fail_puts_to("offsync-app-cache");
    let outcome = v2.on_activate().await;

    match outcome {
        ActivationOutcome::Wiped { error } => assert!(error.contains("quota exceeded")),
        other => panic!("expected wipe, got {:?}", other),
    }
    assert!(storage.inner.cache_names().await.is_empty());
    assert!(v2.manifests().load_persisted().await.unwrap().is_none());
    assert!(v2.staging().keys().await.unwrap().is_empty());
    assert_eq!(host.claims(), claims_before);
}

#[tokio::test]
async fn test_activation_after_wipe_rebuilds() {
    let storage = ProbeStorage::new();
    let fetcher = ScriptedFetcher::new();
    let host = RecordingHost::new();
    activate_v1_fully(&storage, &fetcher, &host).await;

    serve_v2(&fetcher);
    let v2 = worker(deployment(V2, SHELL), storage.clone(), fetcher.clone(), host.clone());
    v2.on_install().await.unwrap();
    storage.fail_puts_to("offsync-app-manifest");
    assert!(!v2.on_activate().await.is_success());

    // Next version goes through the no-prior-manifest path.
    storage.allow_puts();
    let v2b = worker(deployment(V2, SHELL), storage.clone(), fetcher, host);
    v2b.on_install().await.unwrap();
    assert_eq!(
        v2b.on_activate().await,
        ActivationOutcome::Rebuilt { promoted: 2 }
    );
}

#[tokio::test]
async fn test_failed_install_leaves_nothing_staged() {
    let storage = ProbeStorage::new();
    let fetcher = ScriptedFetcher::new();
    let host = RecordingHost::new();
    activate_v1_fully(&storage, &fetcher, &host).await;

    // v2 shell cannot be fetched: main.dart.js is down.
    serve_v2(&fetcher);
    fetcher.serve_resource("main.dart.js", Resource::new(503, "down"));
    let v2 = worker(deployment(V2, SHELL), storage.clone(), fetcher, host);

    let err = v2.on_install().await.unwrap_err();
    assert!(matches!(err, SyncError::Http { ref key, status: 503 } if key == "main.dart.js"));
    assert!(!storage.has_cache("offsync-temp-cache").await.unwrap());

    // A host that activates anyway gets a merge with nothing to promote.
    let outcome = v2.on_activate().await;
    assert!(matches!(
        outcome,
        ActivationOutcome::Upgraded { promoted: 0, .. }
    ));
}

#[tokio::test]
async fn test_install_stages_even_when_host_refuses_skip_waiting() {
    let storage = ProbeStorage::new();
    let fetcher = ScriptedFetcher::new();
    let host = RecordingHost::new();
    host.refuse_skip_waiting();
    serve_v1(&fetcher);

    let v1 = worker(deployment(V1, SHELL), storage, fetcher, host.clone());

    assert_eq!(v1.on_install().await.unwrap(), 2);
    assert_eq!(host.skips(), 1);
    assert_eq!(v1.staging().keys().await.unwrap().len(), 2);
    assert!(v1.status().await.unwrap().install_pending);

    assert!(v1.on_activate().await.is_success());
    assert!(!v1.status().await.unwrap().install_pending);
}

#[tokio::test]
async fn test_download_offline_is_idempotent() {
    let storage = ProbeStorage::new();
    let fetcher = ScriptedFetcher::new();
    let host = RecordingHost::new();
    serve_v1(&fetcher);
    let v1 = worker(deployment(V1, SHELL), storage.clone(), fetcher.clone(), host);
    v1.on_install().await.unwrap();
    v1.on_activate().await;

    let first = match v1.on_message("downloadOffline").await.unwrap() {
        MessageOutcome::Filled(report) => report,
        other => panic!("expected fill, got {:?}", other),
    };
    assert_eq!(first.fetched.len(), 4);
    assert_eq!(first.skipped, 2);

    let mut snapshot = Vec::new();
    for key in v1.content().keys().await.unwrap() {
        snapshot.push((key.clone(), v1.content().get(&key).await.unwrap()));
    }

    fetcher.clear_calls();
    let second = match v1.on_message("downloadOffline").await.unwrap() {
        MessageOutcome::Filled(report) => report,
        other => panic!("expected fill, got {:?}", other),
    };
    assert!(second.fetched.is_empty());
    assert_eq!(second.skipped, 6);
    assert!(fetcher.calls().is_empty());

    let mut after = Vec::new();
    for key in v1.content().keys().await.unwrap() {
        after.push((key.clone(), v1.content().get(&key).await.unwrap()));
    }
    assert_eq!(after, snapshot);
    assert!(v1.status().await.unwrap().missing.is_empty());
}

#[tokio::test]
async fn test_control_messages() {
    let storage = ProbeStorage::new();
    let fetcher = ScriptedFetcher::new();
    let host = RecordingHost::new();
    let v1 = worker(deployment(V1, SHELL), storage, fetcher, host.clone());

    assert_eq!(
        v1.on_message("skipWaiting").await.unwrap(),
        MessageOutcome::SkippedWaiting
    );
    assert_eq!(host.skips(), 1);
    assert_eq!(
        v1.on_message("hello").await.unwrap(),
        MessageOutcome::Ignored
    );
    assert_eq!(host.skips(), 1);
}
