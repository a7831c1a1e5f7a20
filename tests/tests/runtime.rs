mod utils;
#[allow(unused)]
use utils::*;

use ntest::timeout;
use volley_core::Method;
use volley_runtime::cli::{Command, RunArgs};
use volley_runtime::runtime::run_workload;
use volley_runtime::{HistoryStore, RuntimeError, VolleyRuntime};

fn args(endpoint: &str, operations: u64, concurrency: u64) -> RunArgs {
    RunArgs {
        endpoint: Some(endpoint.to_string()),
        operations: Some(operations),
        concurrency: Some(concurrency),
        ..Default::default()
    }
}

#[tokio::test]
#[timeout(10_000)]
async fn run_command_reports_and_saves() {
    init();
    let service = mock_service::spawn().await.unwrap();
    let dir = tempfile::tempdir().unwrap();

    let output = VolleyRuntime::new(dir.path(), Command::Run(args(&service.url("/ok"), 10, 3)))
        .run()
        .await
        .unwrap();

    assert!(output.contains("Requests      10"), "{output}");
    assert!(output.contains("100.0% (good)"), "{output}");

    let store = HistoryStore::new(dir.path());
    let results = store.load_results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].stats.successful_requests, 10);
    assert_eq!(results[0].config.concurrency, 3);

    let show = VolleyRuntime::new(dir.path(), Command::Show { id: results[0].id })
        .run()
        .await
        .unwrap();
    assert!(show.starts_with("GET http://"), "{show}");
}

#[tokio::test]
#[timeout(10_000)]
async fn token_is_used_but_never_stored() {
    init();
    let service = mock_service::spawn().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(dir.path());

    let run_args = RunArgs {
        token: Some("hunter2".to_string()),
        ..args(&service.url("/auth/hunter2"), 4, 2)
    };
    let (id, stats) = run_workload(&store, &run_args).await.unwrap();

    assert_eq!(stats.successful_requests, 4);
    let record = store.find(id.unwrap()).unwrap();
    assert_eq!(record.config.auth_token, None);
    assert_eq!(store.load_config().unwrap().auth_token, None);

    // The token is part of the endpoint path; it must not appear anywhere else.
    for entry in std::fs::read_dir(dir.path()).unwrap() {
        let contents = std::fs::read_to_string(entry.unwrap().path()).unwrap();
        assert!(!contents.contains("\"authToken\": \""), "{contents}");
        assert!(!contents.contains("Bearer"), "{contents}");
        assert_eq!(
            contents.matches("hunter2").count(),
            contents.matches("/auth/hunter2\"").count(),
            "{contents}"
        );
    }
}

#[tokio::test]
#[timeout(10_000)]
async fn saved_config_fills_missing_flags() {
    init();
    let service = mock_service::spawn().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(dir.path());

    let first = RunArgs {
        method: Some(Method::Post),
        body: Some("ping".to_string()),
        ..args(&service.url("/body/ping"), 3, 3)
    };
    let (_, stats) = run_workload(&store, &first).await.unwrap();
    assert_eq!(stats.successful_requests, 3);

    // Only the operation count changes; endpoint, method, and body come from the saved config.
    let second = RunArgs {
        operations: Some(5),
        ..Default::default()
    };
    let (_, stats) = run_workload(&store, &second).await.unwrap();
    assert_eq!(stats.successful_requests, 5);

    assert_eq!(store.load_results().len(), 2);
    assert_eq!(service.state.hits(), 8);
}

#[tokio::test]
#[timeout(10_000)]
async fn failing_endpoint_is_still_a_result() {
    init();
    let service = mock_service::spawn().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(dir.path());

    let run_args = RunArgs {
        no_save: true,
        ..args(&service.url("/status/500"), 6, 2)
    };
    let (id, stats) = run_workload(&store, &run_args).await.unwrap();

    assert_eq!(id, None);
    assert_eq!(stats.failed_requests, 6);
    assert!(store.load_results().is_empty());
    assert!(store.load_config().is_none());
}

#[tokio::test]
async fn missing_endpoint_is_rejected() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(dir.path());

    let err = run_workload(&store, &RunArgs::default()).await.unwrap_err();
    assert!(matches!(err, RuntimeError::MissingEndpoint));
}
