use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{any, get},
    Router,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use metrics::counter;
use rand_distr::{Distribution, Normal};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::{
    num::NonZeroU32,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
    time::Duration,
};
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Per-instance counters, so tests can each run their own server.
#[derive(Default)]
pub struct MockState {
    hits: AtomicU64,
    in_flight: AtomicU64,
    peak_in_flight: AtomicU64,
    limiters: RwLock<HashMap<u32, Arc<DefaultDirectRateLimiter>>>,
}

impl MockState {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> u64 {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn enter(self: &Arc<Self>) -> InFlight {
        counter!("mock_service.requests").increment(1);
        self.hits.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(self.clone())
    }
}

struct InFlight(Arc<MockState>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A running mock service.
pub struct MockService {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockService {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/ok", any(ok))
        .route("/status/:code", any(status))
        .route("/delay/ms/:delay_ms", any(delay))
        .route("/jitter/ms/:mean_ms", any(jitter))
        .route("/auth/:token", any(auth))
        .route("/empty-body", any(empty_body))
        .route("/body/:expected", any(body))
        .route("/limited/:max_tps", get(limited))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(Arc::default())).await?;
    Ok(())
}

/// Serve on an ephemeral local port in the background.
pub async fn spawn() -> anyhow::Result<MockService> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = Arc::new(MockState::default());

    let app = router(state.clone());
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!("Mock service stopped: {err}");
        }
    });

    debug!("Mock service listening on {addr}");
    Ok(MockService { addr, state })
}

async fn ok(State(state): State<Arc<MockState>>) -> StatusCode {
    let _guard = state.enter();
    StatusCode::OK
}

async fn status(State(state): State<Arc<MockState>>, Path(code): Path<u16>) -> StatusCode {
    let _guard = state.enter();
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn delay(State(state): State<Arc<MockState>>, Path(delay_ms): Path<u64>) -> StatusCode {
    let _guard = state.enter();
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    StatusCode::OK
}

async fn jitter(State(state): State<Arc<MockState>>, Path(mean_ms): Path<u64>) -> StatusCode {
    let _guard = state.enter();
    let delay_ms = {
        let mean = mean_ms as f64;
        match Normal::new(mean, mean / 4.) {
            Ok(normal) => normal.sample(&mut rand::thread_rng()).max(0.),
            Err(_) => mean,
        }
    };
    tokio::time::sleep(Duration::from_secs_f64(delay_ms / 1_000.)).await;
    StatusCode::OK
}

async fn auth(
    State(state): State<Arc<MockState>>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> StatusCode {
    let _guard = state.enter();
    let expected = format!("Bearer {token}");
    match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => StatusCode::OK,
        _ => StatusCode::UNAUTHORIZED,
    }
}

async fn empty_body(State(state): State<Arc<MockState>>, body: Bytes) -> StatusCode {
    let _guard = state.enter();
    if body.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

async fn body(
    State(state): State<Arc<MockState>>,
    Path(expected): Path<String>,
    body: Bytes,
) -> StatusCode {
    let _guard = state.enter();
    if body == expected.as_bytes() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

async fn limited(State(state): State<Arc<MockState>>, Path(max_tps): Path<u32>) -> StatusCode {
    let _guard = state.enter();

    let existing = state
        .limiters
        .read()
        .ok()
        .and_then(|map| map.get(&max_tps).cloned());
    let limiter = match existing {
        Some(limiter) => limiter,
        None => {
            let limiter = Arc::new(rate_limiter(max_tps));
            if let Ok(mut map) = state.limiters.write() {
                map.entry(max_tps).or_insert(limiter).clone()
            } else {
                limiter
            }
        }
    };

    match limiter.check() {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/** Utils **/

pub fn rate_limiter(tps: u32) -> DefaultDirectRateLimiter {
    let tps = NonZeroU32::new(tps).unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_second(tps))
}
