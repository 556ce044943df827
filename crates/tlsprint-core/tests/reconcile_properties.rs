//! Properties of a reconciliation run over a real model directory.
//!
//! Registry and capabilities come from an in-memory source; learned models
//! come from a temporary `models/` tree.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tlsprint_core::{
    compare_versions, Implementation, InMemorySource, ModelDirectory, ModelInventory,
    Reconciliation, ReconciliationEngine, RunContext, SourceError,
};

fn learn(root: &Path, paths: &[&str]) {
    for p in paths {
        fs::create_dir_all(root.join(p)).unwrap();
    }
}

fn source() -> InMemorySource {
    InMemorySource::new()
        .with_tags("openssl", &["1.0.2", "1.0.10", "1.0.1", "1.1.0"])
        .with_capabilities("openssl", "1.0.1", &["TLS10", "TLS11", "TLS12"])
        .with_capabilities("openssl", "1.0.2", &["TLS10", "TLS11", "TLS12"])
        .with_capabilities("openssl", "1.0.10", &["TLS12"])
        .with_capabilities("openssl", "1.1.0", &["TLS11", "TLS12"])
        .with_tags("mbedtls", &["2.2.0", "2.16.0"])
        .with_capabilities("mbedtls", "2.2.0", &["TLS12"])
        .with_capabilities("mbedtls", "2.16.0", &["TLS12"])
        .with_registry_failure("broken", SourceError::Status { status: 404, url: "x".into() })
}

fn engine(source: InMemorySource, models: &Path) -> ReconciliationEngine {
    let source = Arc::new(source);
    ReconciliationEngine::new(source.clone(), source, Arc::new(ModelDirectory::new(models)))
}

fn implementations() -> Vec<Implementation> {
    ["broken", "mbedtls", "openssl"]
        .iter()
        .map(Implementation::new)
        .collect()
}

async fn run(models: &Path) -> Reconciliation {
    engine(source(), models)
        .reconcile(&implementations(), &RunContext::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    learn(tmp.path(), &["openssl/1.0.1/TLS10", "mbedtls/2.2.0/TLS12"]);

    let first = run(tmp.path()).await;
    let second = run(tmp.path()).await;
    assert_eq!(first.targets, second.targets);
    assert_eq!(first.reports, second.reports);
}

#[tokio::test]
async fn test_complete_and_disjoint() {
    let tmp = tempfile::tempdir().unwrap();
    learn(
        tmp.path(),
        &["openssl/1.0.1/TLS10", "openssl/1.1.0/TLS12", "openssl/0.9.8/TLS10"],
    );
    let result = run(tmp.path()).await;

    let openssl = Implementation::new("openssl");
    let learned = ModelDirectory::new(tmp.path()).learned(&openssl).await.unwrap();
    let emitted: Vec<_> = result
        .targets_for(&openssl)
        .map(|t| (t.version.clone(), t.protocol.clone()))
        .collect();
    let emitted_set: BTreeSet<_> = emitted.iter().cloned().collect();

    // no duplicates
    assert_eq!(emitted.len(), emitted_set.len());
    // nothing learned comes back
    assert!(emitted_set.is_disjoint(&learned));
    // 3 + 3 + 1 + 2 possible, 2 of them learned
    assert_eq!(emitted.len(), 7);
    assert_eq!(result.count_for(&openssl), 7);
}

#[tokio::test]
async fn test_ordering_law() {
    let tmp = tempfile::tempdir().unwrap();
    let result = run(tmp.path()).await;

    let names: Vec<&str> = result
        .targets
        .iter()
        .map(|t| t.implementation.as_str())
        .collect();
    let first_openssl = names.iter().position(|n| *n == "openssl").unwrap();
    assert!(names[..first_openssl].iter().all(|n| *n == "mbedtls"));

    for pair in result.targets.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.implementation != b.implementation {
            continue;
        }
        match compare_versions(a.version.as_str(), b.version.as_str()) {
            Ordering::Less => {}
            Ordering::Equal => assert!(a.protocol < b.protocol),
            Ordering::Greater => panic!("{} listed before {}", a.version, b.version),
        }
    }

    let openssl_versions: Vec<&str> = result
        .targets
        .iter()
        .filter(|t| t.implementation.as_str() == "openssl")
        .map(|t| t.version.as_str())
        .collect();
    assert_eq!(openssl_versions.last(), Some(&"1.1.0"));
    assert!(openssl_versions.iter().position(|v| *v == "1.0.10")
        > openssl_versions.iter().position(|v| *v == "1.0.2"));
}

#[tokio::test]
async fn test_partial_failure_isolation() {
    let tmp = tempfile::tempdir().unwrap();
    let result = run(tmp.path()).await;

    let broken = Implementation::new("broken");
    assert_eq!(result.targets_for(&broken).count(), 0);
    assert_eq!(result.skipped().count(), 1);
    assert_eq!(result.count_for(&Implementation::new("mbedtls")), 2);
}

#[tokio::test]
async fn test_unusable_inventory_aborts_run() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("openssl"), "not a directory").unwrap();

    let err = engine(source(), tmp.path())
        .reconcile(&implementations(), &RunContext::new())
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("INVENTORY/openssl"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_dangling_link_does_not_reschedule_learned_models() {
    let tmp = tempfile::tempdir().unwrap();
    learn(tmp.path(), &["openssl/1.0.1/TLS10"]);
    std::os::unix::fs::symlink(tmp.path().join("gone"), tmp.path().join("openssl/1.0.9")).unwrap();

    let result = run(tmp.path()).await;
    let openssl = Implementation::new("openssl");
    assert!(!result
        .targets_for(&openssl)
        .any(|t| t.version.as_str() == "1.0.1" && t.protocol.as_str() == "TLS10"));
    assert_eq!(result.count_for(&openssl), 8);
}
