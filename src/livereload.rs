//! Pushes changed output paths to connected browsers.
//!
//! Compilers call [`LiveReload::notify`] with the file they wrote. Browsers listen on
//! [`EVENTS_PATH`] as a Server-Sent Events stream; the client script injected into every
//! served page swaps stylesheets in place and reloads the page for anything else.

use std::{
    convert::Infallible,
    path::{Path, PathBuf},
    time::Duration,
};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use futures::{stream, Stream};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::layout;

pub const EVENTS_PATH: &str = "/__livereload";

const CLIENT: &str = r#"<script>
(function () {
  var source = new EventSource('/__livereload');
  source.addEventListener('change', function (event) {
    if (/\.css$/.test(event.data)) {
      document.querySelectorAll('link[rel="stylesheet"]').forEach(function (link) {
        var url = new URL(link.href);
        url.searchParams.set('livereload', Date.now());
        link.href = url.toString();
      });
    } else {
      window.location.reload();
    }
  });
})();
</script>
"#;

#[derive(Debug, Clone)]
pub struct LiveReload {
    tx: broadcast::Sender<String>,
    output: PathBuf,
}

impl LiveReload {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            tx,
            output: output.into(),
        }
    }

    /// Tell every connected browser that `path`, a file in the output tree, changed.
    pub fn notify(&self, path: &Path) {
        let url = layout::url_path(&self.output, path)
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        log::debug!("Live reload: `{url}`");
        if self.tx.send(url).is_err() {
            log::trace!("No live reload clients connected");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

/// The event stream a browser subscribes to.
pub async fn events(
    State(reload): State<LiveReload>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let changes = stream::unfold(reload.subscribe(), |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(url) => return Some((Ok(Event::default().event("change").data(url)), rx)),
                Err(RecvError::Lagged(skipped)) => {
                    log::debug!("Live reload client skipped {skipped} changes")
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(changes).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

/// `html` with the client script added before `</body>`, or at the end without one.
pub fn inject_client(html: &str) -> String {
    let at = html
        .to_ascii_lowercase()
        .rfind("</body>")
        .unwrap_or(html.len());
    let mut out = String::with_capacity(html.len() + CLIENT.len());
    out.push_str(&html[..at]);
    out.push_str(CLIENT);
    out.push_str(&html[at..]);
    out
}

/// Middleware adding the client script to every html response.
pub async fn inject(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!("Failed to read response body: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let html = inject_client(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, response::Html, routing::get, Router};
    use tower::ServiceExt;

    #[test]
    fn client_goes_before_body_end() {
        let html = inject_client("<html><BODY><p>x</p></BODY></html>");
        assert!(html.starts_with("<html><BODY><p>x</p><script>"));
        assert!(html.ends_with("</script>\n</BODY></html>"));
        assert!(inject_client("<p>bare</p>").starts_with("<p>bare</p><script>"));
    }

    #[tokio::test]
    async fn notify_reaches_subscribers_as_url_paths() {
        let reload = LiveReload::new("dist");
        let mut rx = reload.subscribe();
        reload.notify(Path::new("dist/assets/css/main.css"));
        assert_eq!(rx.recv().await.unwrap(), "/assets/css/main.css");
    }

    #[test]
    fn notify_without_clients_is_fine() {
        LiveReload::new("dist").notify(Path::new("dist/index.html"));
    }

    #[tokio::test]
    async fn middleware_only_touches_html() {
        let app = Router::new()
            .route("/", get(|| async { Html("<body>hi</body>") }))
            .route("/plain", get(|| async { "<body>text</body>" }))
            .layer(middleware::from_fn(inject));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&body).contains("EventSource('/__livereload')"));

        let response = app
            .oneshot(Request::builder().uri("/plain").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"<body>text</body>");
    }
}
