use super::*;

use std::sync::{Arc, Mutex};

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use shared::domain::{GenerationStatus, NavigationState};
use tokio::{net::TcpListener, sync::oneshot};

use crate::VisualizerOrchestrator;

#[derive(Clone)]
struct RenderServerState {
    tx: Arc<Mutex<Option<oneshot::Sender<GenerateViewRequest>>>>,
    status: StatusCode,
}

async fn handle_generate(
    State(state): State<RenderServerState>,
    Json(request): Json<GenerateViewRequest>,
) -> (StatusCode, Json<GenerateViewResponse>) {
    let rendered = format!("{}#rendered", request.source_image);
    if let Some(tx) = state.tx.lock().expect("lock").take() {
        let _ = tx.send(request);
    }
    (
        state.status,
        Json(GenerateViewResponse {
            rendered_image: Some(rendered),
        }),
    )
}

async fn spawn_render_server(
    status: StatusCode,
) -> anyhow::Result<(String, oneshot::Receiver<GenerateViewRequest>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, rx) = oneshot::channel();
    let state = RenderServerState {
        tx: Arc::new(Mutex::new(Some(tx))),
        status,
    };
    let app = Router::new()
        .route("/api/generate-3d-view", post(handle_generate))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/api"), rx))
}

#[test]
fn endpoint_appends_path_to_base_url() {
    assert_eq!(
        endpoint_for("http://render.local").expect("url").as_str(),
        "http://render.local/generate-3d-view"
    );
    assert_eq!(
        endpoint_for(" https://render.local/v1/ ").expect("url").as_str(),
        "https://render.local/v1/generate-3d-view"
    );
    assert_eq!(
        endpoint_for("https://render.local/v1").expect("url").as_str(),
        "https://render.local/v1/generate-3d-view"
    );
}

#[test]
fn rejects_malformed_and_non_http_urls() {
    assert!(matches!(
        endpoint_for("not a url"),
        Err(RenderClientError::InvalidUrl { .. })
    ));
    assert!(matches!(
        endpoint_for("ftp://render.local"),
        Err(RenderClientError::UnsupportedScheme(scheme)) if scheme == "ftp"
    ));
}

#[tokio::test]
async fn posts_source_image_and_parses_render() {
    let (base_url, request_rx) = spawn_render_server(StatusCode::OK)
        .await
        .expect("spawn server");
    let service = HttpRenderService::new(&base_url, Duration::from_secs(5)).expect("client");

    let response = service
        .generate_view(GenerateViewRequest {
            source_image: "data:image/png;base64,QQ==".into(),
        })
        .await
        .expect("generate");

    assert_eq!(
        response.rendered_image.as_deref(),
        Some("data:image/png;base64,QQ==#rendered")
    );
    let seen = request_rx.await.expect("request captured");
    assert_eq!(seen.source_image, "data:image/png;base64,QQ==");
}

#[tokio::test]
async fn error_status_is_reported() {
    let (base_url, _rx) = spawn_render_server(StatusCode::BAD_GATEWAY)
        .await
        .expect("spawn server");
    let service = HttpRenderService::new(&base_url, Duration::from_secs(5)).expect("client");

    let err = service
        .generate_view(GenerateViewRequest {
            source_image: "data:image/png;base64,QQ==".into(),
        })
        .await
        .expect_err("should fail");
    assert!(err.to_string().contains("rejected"));
}

#[tokio::test]
async fn visualizer_displays_render_from_http_service() {
    let (base_url, _rx) = spawn_render_server(StatusCode::OK)
        .await
        .expect("spawn server");
    let service = HttpRenderService::new(&base_url, Duration::from_secs(5)).expect("client");
    let navigation = NavigationState {
        initial_image: Some("data:image/png;base64,QQ==".into()),
        initial_render: None,
        name: Some("Loft".into()),
    };
    let visualizer = VisualizerOrchestrator::new(navigation, Arc::new(service));

    assert!(visualizer.mount());
    visualizer.wait_for_generation().await;

    assert_eq!(visualizer.generation_status(), GenerationStatus::Succeeded);
    assert_eq!(
        visualizer.displayed_image().as_deref(),
        Some("data:image/png;base64,QQ==#rendered")
    );
}
