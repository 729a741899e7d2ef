use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, Request};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::rest;
use crate::VinylAxumState;

const REQUEST_ID: &str = "x-request-id";

/// Default request body ceiling, matching the gateway's object limit.
pub const DEFAULT_BODY_LIMIT: usize = 100 * 1024 * 1024;

pub struct VinylApp {
    pub state: VinylAxumState,
    pub router: Router<()>,
}

impl VinylApp {
    pub fn new(state: VinylAxumState) -> Self {
        Self::with_body_limit(state, DEFAULT_BODY_LIMIT)
    }

    pub fn with_body_limit(state: VinylAxumState, max_body_bytes: usize) -> Self {
        let router = routes()
            .with_state(state.clone())
            .layer(DefaultBodyLimit::max(max_body_bytes))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(HeaderName::from_static(REQUEST_ID), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get(REQUEST_ID)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("-");
                        tracing::info_span!(
                            "http",
                            method = %request.method(),
                            path = %request.uri().path(),
                            request_id,
                        )
                    }))
                    .layer(PropagateRequestIdLayer::new(HeaderName::from_static(REQUEST_ID))),
            );

        Self { state, router }
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

fn routes() -> Router<VinylAxumState> {
    Router::new()
        .route("/health", get(rest::health))
        .route("/storage/upload", post(rest::upload))
        .route("/storage/objects", get(rest::list_objects))
        .route("/storage/objects/{id}", get(rest::get_object).delete(rest::delete_object))
        .route("/storage/download/{id}", get(rest::download))
        .route("/storage/signed-url/{id}", get(rest::signed_url))
        .route("/storage/preferences", get(rest::get_preferences).put(rest::put_preferences))
        .route(
            "/storage/cloud-drive/connection",
            get(rest::drive_connection)
                .put(rest::connect_drive)
                .delete(rest::disconnect_drive),
        )
        .route("/stream/{id}", get(rest::stream))
        .route("/share-links", post(rest::create_share_link).get(rest::list_share_links))
        .route("/share-links/{id}", get(rest::get_share_link).delete(rest::revoke_share_link))
        .route("/shared/{token}", get(rest::shared))
}
