use std::path::Path;

use axum::{routing::get, Router};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub const MINI_APP_PAGE: &str = "mini-app.html";

/// Static server for the mini app. `/` serves the mini app page; every other
/// path is looked up in `webapp_dir`.
pub fn create_router(webapp_dir: &Path) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route_service("/", ServeFile::new(webapp_dir.join(MINI_APP_PAGE)))
        .fallback_service(ServeDir::new(webapp_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    fn webapp() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MINI_APP_PAGE), "<h1>Task Tracker</h1>").unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log('ready');").unwrap();
        dir
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn root_serves_the_mini_app_page() {
        let dir = webapp();

        let (status, body) = get(create_router(dir.path()), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>Task Tracker</h1>");
    }

    #[tokio::test]
    async fn serves_files_and_health() {
        let dir = webapp();

        let (status, body) = get(create_router(dir.path()), "/app.js").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("ready"));

        let (status, body) = get(create_router(dir.path()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");

        let (status, _) = get(create_router(dir.path()), "/missing.css").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn allows_cross_origin_requests() {
        let dir = webapp();

        let response = create_router(dir.path())
            .oneshot(
                Request::get("/mini-app.html")
                    .header(header::ORIGIN, "https://web.telegram.org")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }
}
