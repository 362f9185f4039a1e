//! Freshness HTTP service.
//!
//! One endpoint, any method and path. The caller sends a `Password` header
//! with the shared secret and a `Url` header naming the page; the status code
//! carries the answer:
//!
//! | status | meaning                          |
//! |--------|----------------------------------|
//! | 200    | new or stale, fetch it           |
//! | 304    | fresh, skip it                   |
//! | 400    | bad password or missing URL      |
//! | 500    | the freshness store failed       |

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use color_eyre::eyre::{Result, WrapErr};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use polycrawl_storage::FreshnessCache;

const PASSWORD_HEADER: &str = "password";
const URL_HEADER: &str = "url";

#[derive(Clone)]
pub(crate) struct ServiceState {
    pub cache: Arc<FreshnessCache>,
    pub password: Arc<str>,
}

pub(crate) fn router(state: ServiceState) -> Router {
    Router::new()
        .fallback(check_handler)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until Ctrl-C.
pub(crate) async fn serve(addr: SocketAddr, state: ServiceState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("failed to bind {addr}"))?;

    info!(%addr, db = %state.cache.path().display(), "freshness service listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("freshness service shutting down");
        })
        .await
        .wrap_err("freshness service error")?;

    Ok(())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| std::str::from_utf8(v.as_bytes()).ok())
        .unwrap_or_default()
}

async fn check_handler(State(state): State<ServiceState>, headers: HeaderMap) -> StatusCode {
    if header_str(&headers, PASSWORD_HEADER) != &*state.password {
        warn!("rejected request: bad password");
        return StatusCode::BAD_REQUEST;
    }

    let url = header_str(&headers, URL_HEADER);
    if url.is_empty() {
        warn!("rejected request: missing url");
        return StatusCode::BAD_REQUEST;
    }

    match state.cache.check(url).await {
        Ok(decision) if decision.should_fetch() => {
            debug!(url, %decision, "fetch");
            StatusCode::OK
        }
        Ok(_) => StatusCode::NOT_MODIFIED,
        Err(e) => {
            error!(url, error = %e, "freshness check failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use polycrawl_shared::FreshnessOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn test_router() -> Router {
        let path = std::env::temp_dir().join(format!("polycrawl_srv_{}.db", Uuid::now_v7()));
        let cache = FreshnessCache::open(&path, FreshnessOptions::default())
            .await
            .expect("open cache");
        router(ServiceState {
            cache: Arc::new(cache),
            password: Arc::from("disz"),
        })
    }

    fn request(password: Option<&str>, url: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/anything");
        if let Some(p) = password {
            builder = builder.header("Password", p);
        }
        if let Some(u) = url {
            builder = builder.header("Url", u);
        }
        builder.body(Body::empty()).expect("request")
    }

    async fn status(app: &Router, req: Request<Body>) -> StatusCode {
        app.clone().oneshot(req).await.expect("response").status()
    }

    #[tokio::test]
    async fn new_then_fresh() {
        let app = test_router().await;
        let url = Some("http://example.com/page");

        assert_eq!(status(&app, request(Some("disz"), url)).await, StatusCode::OK);
        assert_eq!(
            status(&app, request(Some("disz"), url)).await,
            StatusCode::NOT_MODIFIED
        );
    }

    #[tokio::test]
    async fn bad_password_is_rejected() {
        let app = test_router().await;
        let url = Some("http://example.com/");

        assert_eq!(
            status(&app, request(Some("wrong"), url)).await,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(&app, request(None, url)).await, StatusCode::BAD_REQUEST);
        // Rejected requests leave no record behind.
        assert_eq!(status(&app, request(Some("disz"), url)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_url_is_rejected() {
        let app = test_router().await;
        assert_eq!(
            status(&app, request(Some("disz"), None)).await,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(&app, request(Some("disz"), Some(""))).await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn any_method_and_path() {
        let app = test_router().await;
        let req = Request::builder()
            .method("POST")
            .uri("/some/other/path?x=1")
            .header("Password", "disz")
            .header("Url", "http://example.com/post")
            .body(Body::empty())
            .expect("request");
        assert_eq!(status(&app, req).await, StatusCode::OK);
    }
}
