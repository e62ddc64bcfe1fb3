use crate::session::SessionKey;
use anyhow::Result;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Extension, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post, put},
    Router,
};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub(crate) mod handlers;
mod openapi;

// Multipart uploads carry up to a 5 MiB image plus the other form fields.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Runtime knobs for the session boundary, shared with the auth handlers.
#[derive(Clone, Debug)]
pub struct Config {
    session_ttl: Duration,
    cookie_secure: bool,
}

impl Config {
    #[must_use]
    pub const fn new(session_ttl: Duration, cookie_secure: bool) -> Self {
        Self {
            session_ttl,
            cookie_secure,
        }
    }

    pub(crate) const fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub(crate) const fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, key: Arc<SessionKey>, config: Config) -> Result<()> {
    let app = router(key, config);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Build the application router. Split out from [`new`] so tests can drive it
/// without binding a socket.
pub fn router(key: Arc<SessionKey>, config: Config) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/session", get(handlers::auth::session))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route(
            "/api/products",
            get(handlers::products::list).post(handlers::products::create),
        )
        .route(
            "/api/products/:id",
            put(handlers::products::update).delete(handlers::products::remove),
        )
        .route(
            "/api/products/init-table",
            post(handlers::products::init_table),
        )
        .route(
            "/api/products/migrate-status",
            post(handlers::products::migrate_status),
        )
        .merge(
            SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
                .layer(Extension(key))
                .layer(Extension(Arc::new(config))),
        )
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_router() -> Router {
        let key = Arc::new(SessionKey::from_bytes([7u8; 32]));
        let config = Config::new(Duration::from_secs(3600), false);
        router(key, config)
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("X-App"));
    }

    #[tokio::test]
    async fn test_products_require_session() {
        for (method, uri) in [
            ("GET", "/api/products"),
            // No multipart body: the session gate must still answer first
            ("POST", "/api/products"),
            ("PUT", "/api/products/7"),
            ("POST", "/api/products/init-table"),
            ("POST", "/api/products/migrate-status"),
            ("DELETE", "/api/products/7"),
        ] {
            let response = test_router()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(
                response.status(),
                StatusCode::UNAUTHORIZED,
                "{method} {uri}"
            );
        }
    }

    #[tokio::test]
    async fn test_tampered_cookie_is_unauthorized() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/api/products")
                    .header("cookie", "db_session=zz.ff.ee")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_session_endpoint_without_cookie() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/api/auth/session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let cookie = response.headers().get("set-cookie").unwrap();
        assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
    }
}
