use std::{net::SocketAddr, path::Path};

use axum::{middleware, routing::get, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    error::Result,
    livereload::{self, LiveReload, EVENTS_PATH},
};

/// Static files from the output tree, with the live reload stream and client attached.
pub fn router(output: impl AsRef<Path>, reload: LiveReload) -> Router {
    Router::new()
        .route(EVENTS_PATH, get(livereload::events))
        .fallback_service(ServeDir::new(output.as_ref()))
        .layer(middleware::from_fn(livereload::inject))
        .with_state(reload)
}

pub async fn serve(app: Router, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app.layer(TraceLayer::new_for_http())).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn get_path(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn serves_output_tree_with_client() {
        let tmp = TempDir::new().unwrap();
        crate::files::write(tmp.path().join("index.html"), "<body>home</body>").unwrap();
        crate::files::write(tmp.path().join("assets/css/main.css"), "a{}").unwrap();
        let app = router(tmp.path(), LiveReload::new(tmp.path()));

        let (status, _, body) = get_path(app.clone(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("<body>home<script>"));

        let (_, content_type, body) = get_path(app.clone(), "/assets/css/main.css").await;
        assert_eq!(content_type.as_deref(), Some("text/css"));
        assert_eq!(body, "a{}");

        let (status, _, _) = get_path(app, "/missing.html").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
