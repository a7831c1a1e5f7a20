use std::sync::OnceLock;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use volley::RunEvent;
use volley_core::{RunStats, RunStatus};

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("volley=debug,mock_service=info"));
        // Another test binary may already have installed a subscriber.
        let _ = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

#[allow(unused)]
pub fn events() -> (UnboundedSender<RunEvent>, UnboundedReceiver<RunEvent>) {
    unbounded_channel()
}

#[allow(unused)]
pub fn drain(rx: &mut UnboundedReceiver<RunEvent>) -> Vec<RunEvent> {
    let mut events = vec![];
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[allow(unused)]
pub fn progress(events: &[RunEvent]) -> Vec<&RunStatus> {
    events
        .iter()
        .filter_map(|e| match e {
            RunEvent::Progress(status) => Some(status),
            _ => None,
        })
        .collect()
}

/// The completion stats, asserting the run completed and never reported an error.
#[allow(unused)]
pub fn completed(events: &[RunEvent]) -> &RunStats {
    assert!(
        !events.iter().any(|e| matches!(e, RunEvent::Error(_))),
        "unexpected error: {events:?}"
    );
    match events.last() {
        Some(RunEvent::Complete(stats)) => stats,
        other => panic!("run did not complete, last event {other:?}"),
    }
}

/// Checks the accounting invariants over every progress snapshot of a run.
#[allow(unused)]
pub fn assert_consistent(events: &[RunEvent]) {
    let statuses = progress(events);
    assert!(!statuses.is_empty());
    for pair in statuses.windows(2) {
        assert!(pair[1].completed_operations >= pair[0].completed_operations);
    }
    if let Some(RunEvent::Complete(stats)) = events.last() {
        assert_eq!(
            stats.total_requests,
            stats.successful_requests + stats.failed_requests
        );
        let last = statuses[statuses.len() - 1];
        assert_eq!(last.completed_operations, last.total_operations);
        assert_eq!(last.completed_operations, stats.total_requests);
    }
}
