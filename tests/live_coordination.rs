use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header::ACCESS_CONTROL_ALLOW_ORIGIN},
};
use bytes::Bytes;
use revdoc::{
    application::{
        error::PreviewError,
        live::{LiveCoordinator, LivePhase, Regenerate},
    },
    domain::artifacts::ArtifactSet,
    infra::http::{LiveState, build_live_router},
};
use tower::ServiceExt;

/// Each run takes a while and stamps its sequence number into the index.
struct SlowTree {
    runs: AtomicU64,
}

#[async_trait]
impl Regenerate for SlowTree {
    async fn regenerate(&self) -> Result<ArtifactSet, PreviewError> {
        let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(Duration::from_millis(30)).await;
        Ok([
            ("index.html".to_string(), Bytes::from(format!("run {run}"))),
            ("api-docs.json".to_string(), Bytes::from_static(b"{}")),
        ]
        .into_iter()
        .collect())
    }
}

async fn get(router: &axum::Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("router should respond");
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    (status, headers, String::from_utf8_lossy(&body).into_owned())
}

fn setup() -> (Arc<SlowTree>, Arc<LiveCoordinator>, axum::Router) {
    let tree = Arc::new(SlowTree {
        runs: AtomicU64::new(0),
    });
    let coordinator = Arc::new(LiveCoordinator::start(
        Arc::clone(&tree),
        Duration::from_millis(10),
    ));
    let router = build_live_router(LiveState {
        coordinator: Arc::clone(&coordinator),
        api_description_file: Arc::from("api-docs.json"),
    });
    (tree, coordinator, router)
}

#[tokio::test(start_paused = true)]
async fn reads_block_until_pending_regeneration_completes() {
    let (tree, coordinator, router) = setup();

    let (status, _, body) = get(&router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "run 1");

    coordinator.trigger();
    assert!(coordinator.pending() > 0);
    let (status, _, body) = get(&router, "/index.html").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "run 2");
    assert_eq!(tree.runs.load(Ordering::SeqCst), 2);
    assert_eq!(coordinator.phase(), LivePhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn burst_of_changes_regenerates_once() {
    let (tree, coordinator, router) = setup();
    get(&router, "/").await;

    let trigger = coordinator.trigger_handle();
    for _ in 0..10 {
        trigger.trigger();
    }
    let (_, _, body) = get(&router, "/").await;

    assert_eq!(body, "run 2");
    assert_eq!(tree.runs.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn live_server_serves_health_cors_and_not_found() {
    let (_, _, router) = setup();

    let (status, _, body) = get(&router, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, headers, _) = get(&router, "/api-docs.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let (status, _, _) = get(&router, "/nope.html").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
