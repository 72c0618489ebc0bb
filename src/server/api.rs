use crate::error::ChatError;
use crate::models::api::{ ErrorResponse, PullParams, PullResponse, SendParams, SendResponse };
use crate::service::ChatService;
use std::error::Error;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use axum::{
    routing::{ get, post },
    Router,
    Json,
    extract::{ Request, State, Query, rejection::QueryRejection },
    middleware::{ self, Next },
    response::{ IntoResponse, Response },
    http::StatusCode,
};
use governor::{ RateLimiter, Quota, state::{ InMemoryState, NotKeyed }, clock::DefaultClock };
use serde_json::json;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, warn, error };

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Clone)]
pub struct AppState {
    service: ChatService,
    limiter: Option<Arc<Limiter>>,
}

impl AppState {
    /// `rate_limit_per_sec == 0` disables admission limiting.
    pub fn new(service: ChatService, rate_limit_per_sec: u32) -> Self {
        let limiter = NonZeroU32::new(rate_limit_per_sec).map(|rate| {
            Arc::new(RateLimiter::direct(Quota::per_second(rate)))
        });
        Self { service, limiter }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = match &self {
            ChatError::InvalidIdentifier(_) | ChatError::Validation(_) => StatusCode::BAD_REQUEST,
            ChatError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ChatError::StoreFull(_) => StatusCode::SERVICE_UNAVAILABLE,
            ChatError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if self.is_client_error() {
            warn!("Rejected request: {}", self);
        } else {
            error!("Request failed: {}", self);
        }
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ping", get(ping_handler))
        .route("/api/send", post(send_handler))
        .route("/api/pull", get(pull_handler))
        .layer(middleware::from_fn_with_state(state.clone(), admission))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    addr: &str,
    state: AppState,
    tls: Option<(String, String)>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = addr.parse::<SocketAddr>()?;
    let app = router(state);

    if let Some((cert_path, key_path)) = tls {
        info!("Loading TLS certificate from '{}' and key from '{}'", cert_path, key_path);
        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            cert_path,
            key_path
        ).await?;

        info!("Starting HTTPS API server on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
            e
        })?;
        info!("Starting HTTP API server on: http://{}", listener.local_addr()?);
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    }

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn admission(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            return ChatError::RateLimited.into_response();
        }
    }
    next.run(req).await
}

async fn ping_handler() -> impl IntoResponse {
    Json(json!({ "message": "pong" }))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ChatError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| ChatError::Validation(rejection.body_text()))
}

async fn send_handler(
    State(state): State<AppState>,
    query: Result<Query<SendParams>, QueryRejection>,
) -> Result<Json<SendResponse>, ChatError> {
    let params = query_params(query)?;
    let sequence = state.service.send_params(&params).await?;
    Ok(Json(SendResponse { sequence }))
}

async fn pull_handler(
    State(state): State<AppState>,
    query: Result<Query<PullParams>, QueryRejection>,
) -> Result<Json<PullResponse>, ChatError> {
    let params = query_params(query)?;
    let page = state.service.pull_params(&params).await?;
    Ok(Json(PullResponse::from(page)))
}
