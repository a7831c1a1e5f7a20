mod utils;
#[allow(unused)]
use utils::*;

use mock_service::MockService;
use ntest::timeout;
use std::time::Duration;
use volley::prelude::*;
use volley::{run, RunEvent};

async fn mock() -> MockService {
    init();
    mock_service::spawn().await.unwrap()
}

async fn run_http(config: WorkloadConfig) -> Vec<RunEvent> {
    let (tx, mut rx) = events();
    Runner::new(HttpExecutor::new().unwrap())
        .run(config, tx)
        .await;
    drain(&mut rx)
}

#[tokio::test]
#[timeout(10_000)]
async fn completes_against_live_server() {
    let service = mock().await;
    let config = WorkloadConfig::new(&service.url("/ok"))
        .operations(50)
        .concurrency(5);

    let events = run_http(config).await;
    let stats = completed(&events);
    assert_consistent(&events);

    assert_eq!(stats.total_requests, 50);
    assert_eq!(stats.successful_requests, 50);
    assert_eq!(stats.response_times.len(), 50);
    assert!(stats.min_response_time_ms <= stats.average_response_time_ms);
    assert!(stats.average_response_time_ms <= stats.max_response_time_ms);
    assert!(stats.requests_per_second > 0.);
    assert_eq!(service.state.hits(), 50);
}

#[tokio::test]
#[timeout(10_000)]
async fn server_never_sees_more_than_concurrency() {
    let service = mock().await;
    let config = WorkloadConfig::new(&service.url("/delay/ms/20"))
        .operations(30)
        .concurrency(4);

    let events = run_http(config).await;
    let stats = completed(&events);

    assert_eq!(stats.successful_requests, 30);
    let peak = service.state.peak_in_flight();
    assert!(peak <= 4, "peak in flight {peak}");
    assert!(peak >= 1);
    // 8 waves of at least 20ms each.
    assert!(stats.total_time() >= Duration::from_millis(160));
}

#[tokio::test]
#[timeout(10_000)]
async fn error_statuses_are_failures_not_faults() {
    let service = mock().await;
    let config = WorkloadConfig::new(&service.url("/status/503"))
        .operations(6)
        .concurrency(3);

    let outcome = HttpExecutor::new().unwrap().execute(&config).await;
    assert!(!outcome.success);
    assert_eq!(outcome.status, Some(503));
    assert_eq!(outcome.error_message, None);

    let events = run_http(config).await;
    let stats = completed(&events);
    assert_eq!(stats.failed_requests, 6);
    assert_eq!(stats.success_rate(), 0.);
}

#[tokio::test]
#[timeout(10_000)]
async fn redirect_range_counts_as_success() {
    let service = mock().await;
    // 304 is not followed, so the status reaches the classifier as-is.
    let config = WorkloadConfig::new(&service.url("/status/304"));

    let outcome = HttpExecutor::new().unwrap().execute(&config).await;
    assert!(outcome.success);
    assert_eq!(outcome.status, Some(304));
}

#[tokio::test]
#[timeout(10_000)]
async fn auth_token_is_sent_as_bearer() {
    let service = mock().await;
    let executor = HttpExecutor::new().unwrap();

    let anonymous = WorkloadConfig::new(&service.url("/auth/s3cret"));
    let outcome = executor.execute(&anonymous).await;
    assert_eq!(outcome.status, Some(401));

    let authorized = anonymous.clone().auth_token("s3cret");
    let outcome = executor.execute(&authorized).await;
    assert_eq!(outcome.status, Some(200));

    // The token wins over a caller supplied Authorization header.
    let overridden = authorized.header("Authorization", "Bearer other");
    let outcome = executor.execute(&overridden).await;
    assert_eq!(outcome.status, Some(200));
}

#[tokio::test]
#[timeout(10_000)]
async fn body_is_only_sent_for_non_get() {
    let service = mock().await;
    let executor = HttpExecutor::new().unwrap();

    let post = WorkloadConfig::new(&service.url("/body/hello"))
        .method(Method::Post)
        .header("Content-Type", "text/plain")
        .body("hello");
    assert_eq!(executor.execute(&post).await.status, Some(200));

    let put = post.clone().method(Method::Put);
    assert_eq!(executor.execute(&put).await.status, Some(200));

    let get = WorkloadConfig::new(&service.url("/empty-body")).body("ignored");
    assert_eq!(executor.execute(&get).await.status, Some(200));
}

#[tokio::test]
#[timeout(10_000)]
async fn rate_limited_server_mixes_outcomes() {
    let service = mock().await;
    let config = WorkloadConfig::new(&service.url("/limited/5"))
        .operations(20)
        .concurrency(20);

    let events = run_http(config).await;
    let stats = completed(&events);

    assert_eq!(stats.total_requests, 20);
    assert!(stats.successful_requests >= 1);
    assert!(stats.failed_requests >= 1);
}

#[tokio::test]
#[timeout(10_000)]
async fn refused_endpoint_still_completes() {
    init();
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let config = WorkloadConfig::new(&format!("http://{addr}/"))
        .operations(4)
        .concurrency(2);

    let events = run_http(config).await;
    let stats = completed(&events);

    assert_eq!(stats.failed_requests, 4);
    assert_eq!(stats.successful_requests, 0);
    assert_eq!(stats.response_times.len(), 4);
}

#[tokio::test]
#[timeout(10_000)]
async fn slow_calls_hit_the_client_timeout() {
    let service = mock().await;
    let executor = HttpExecutor::with_timeout(Duration::from_millis(50)).unwrap();
    let config = WorkloadConfig::new(&service.url("/delay/ms/2000"));

    let outcome = executor.execute(&config).await;
    assert!(!outcome.success);
    assert!(outcome.is_transport_error());
    assert!(outcome.latency_ms < 2_000.);
}

#[tokio::test]
#[timeout(10_000)]
async fn jittered_latencies_spread() {
    let service = mock().await;
    let config = WorkloadConfig::new(&service.url("/jitter/ms/10"))
        .operations(40)
        .concurrency(8);

    let events = run_http(config).await;
    let stats = completed(&events);

    assert_eq!(stats.successful_requests, 40);
    assert!(stats.percentile(0.5) <= stats.percentile(0.99));
    assert!(stats.max_response_time_ms > stats.min_response_time_ms);
}

#[tokio::test]
#[timeout(10_000)]
async fn callbacks_observe_the_run() {
    use std::sync::{Arc, Mutex};

    let service = mock().await;
    let config = WorkloadConfig::new(&service.url("/ok"))
        .operations(7)
        .concurrency(3);

    let seen = Arc::new(Mutex::new(vec![]));
    let done = Arc::new(Mutex::new(None));
    let hooks = {
        let seen = seen.clone();
        let done = done.clone();
        Callbacks::new()
            .progress(move |status: RunStatus| seen.lock().unwrap().push(status.state))
            .complete(move |stats: RunStats| *done.lock().unwrap() = Some(stats))
            .error(|err: String| panic!("unexpected error {err}"))
    };

    run(config, hooks).await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.first(), Some(&RunState::Running));
    assert_eq!(seen.last(), Some(&RunState::Completed));
    assert_eq!(seen.len(), 7 + 2);
    let stats = done.lock().unwrap().take().unwrap();
    assert_eq!(stats.successful_requests, 7);
}

#[tokio::test]
#[timeout(10_000)]
async fn cancel_stops_between_waves() {
    let service = mock().await;
    let config = WorkloadConfig::new(&service.url("/delay/ms/50"))
        .operations(20)
        .concurrency(2);

    let runner = Runner::new(HttpExecutor::new().unwrap());
    let cancel = runner.cancel_token();
    let (tx, mut rx) = events();

    let handle = tokio::spawn(async move { runner.run(config, tx).await });
    tokio::time::sleep(Duration::from_millis(120)).await;
    cancel.cancel();
    handle.await.unwrap();

    let events = drain(&mut rx);
    let Some(RunEvent::Error(message)) = events.last() else {
        panic!("expected a failure, got {events:?}");
    };
    assert!(message.starts_with("Run cancelled after"), "{message}");
    assert!(service.state.hits() < 20);
    assert_eq!(service.state.hits() % 2, 0);
}
