//! Installer behaviour against the in-memory package host.

mod common;

use common::{FakeHost, Shared};
use pycheck_worker::{install_engine, EngineError, EngineSpec, VersionEntry, VersionTable};

fn host() -> (FakeHost, Shared) {
    let state = Shared::default();
    (FakeHost::new(state.clone()), state)
}

#[test]
fn test_registry_install_batches_engine_and_auxiliary() {
    let (mut host, state) = host();
    let installed = install_engine(
        &mut host,
        &VersionTable::default(),
        &EngineSpec::default(),
        "1.10.0",
    )
    .unwrap();

    assert_eq!(installed.package, "mypy");
    assert_eq!(installed.version, "1.10.0");

    let state = state.lock();
    assert_eq!(state.ensure_ready_calls, 1);
    assert_eq!(state.installs.len(), 1, "one batched install call");
    assert_eq!(
        state.installs[0],
        vec!["mypy==1.10.0", "typing-extensions", "mypy-extensions"]
    );
}

#[test]
fn test_pinned_install_uses_artifact_and_exact_auxiliary() {
    let (mut host, state) = host();
    let artifact = "/wheels/mypy-1.8.0-py3-none-any.whl";
    state
        .lock()
        .artifact_versions
        .insert(artifact.to_string(), "1.8.0".to_string());

    let mut table = VersionTable::default();
    table.upsert(VersionEntry {
        version: "1.8.0".to_string(),
        artifact: artifact.to_string(),
    });

    let installed = install_engine(&mut host, &table, &EngineSpec::default(), "1.8.0").unwrap();
    assert_eq!(installed.version, "1.8.0");
    assert_eq!(
        state.lock().installs[0],
        vec![
            artifact,
            "typing-extensions==4.11.0",
            "mypy-extensions==1.0.0"
        ]
    );
}

#[test]
fn test_reported_version_only_needs_requested_prefix() {
    let (mut host, state) = host();
    state.lock().reported_version = Some("1.10.1".to_string());

    let installed = install_engine(
        &mut host,
        &VersionTable::default(),
        &EngineSpec::default(),
        "1.10",
    )
    .unwrap();
    assert_eq!(installed.version, "1.10.1");
}

#[test]
fn test_mismatched_artifact_is_rejected() {
    let (mut host, state) = host();
    let artifact = "/wheels/mypy-1.7.1-py3-none-any.whl";
    state
        .lock()
        .artifact_versions
        .insert(artifact.to_string(), "1.7.1".to_string());

    // Table entry claims 1.8.0 but the artifact installs 1.7.1
    let mut table = VersionTable::default();
    table.upsert(VersionEntry {
        version: "1.8.0".to_string(),
        artifact: artifact.to_string(),
    });

    let err = install_engine(&mut host, &table, &EngineSpec::default(), "1.8.0").unwrap_err();
    match &err {
        EngineError::VersionMismatch {
            package,
            expected,
            found,
        } => {
            assert_eq!(package, "mypy");
            assert_eq!(expected, "1.8.0");
            assert_eq!(found, "1.7.1");
        }
        other => panic!("expected VersionMismatch, got {:?}", other),
    }
    assert_eq!(err.to_string(), "Installed mypy 1.7.1, expected 1.8.0");
}

#[test]
fn test_install_failure_propagates() {
    let (mut host, state) = host();
    state.lock().fail_next_install = Some("no matching distribution".to_string());

    let err = install_engine(
        &mut host,
        &VersionTable::default(),
        &EngineSpec::default(),
        "9.9.9",
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::Install(_)));
    assert!(err.to_string().contains("no matching distribution"));
}
