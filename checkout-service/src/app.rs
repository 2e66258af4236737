use std::env;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderName, HeaderValue, Method, StatusCode};
use axum::{middleware, routing::{get, put}, Router};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use common_auth::{JwtConfig, JwtVerifier};

use crate::order_handlers::{
    confirm_payment, create_order, get_order_items, list_orders, refund_order,
};

// --- Error metrics ---
pub static CHECKOUT_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);
static HTTP_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let v = IntCounterVec::new(
        Opts::new("http_errors_total", "Count of HTTP error responses emitted (status >= 400)"),
        &["service", "code", "status"],
    ).unwrap();
    CHECKOUT_REGISTRY.register(Box::new(v.clone())).ok();
    v
});

pub async fn http_error_metrics(req: axum::http::Request<axum::body::Body>, next: axum::middleware::Next) -> axum::response::Response {
    let resp = next.run(req).await;
    let status = resp.status();
    if status.as_u16() >= 400 {
        let code = resp.headers().get("X-Error-Code").and_then(|v| v.to_str().ok()).unwrap_or("unknown");
        HTTP_ERRORS_TOTAL.with_label_values(&["checkout-service", code, status.as_str()]).inc();
    }
    resp
}

pub async fn health() -> &'static str { "ok" }

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_verifier: Arc<JwtVerifier>,
}

impl axum::extract::FromRef<AppState> for Arc<JwtVerifier> {
    fn from_ref(state: &AppState) -> Self { state.jwt_verifier.clone() }
}

/// Identity is an external collaborator: the verifier only needs key
/// material and the expected issuer/audience, all from env.
pub fn build_jwt_verifier_from_env() -> anyhow::Result<Arc<JwtVerifier>> {
    let issuer = env::var("JWT_ISSUER").context("JWT_ISSUER must be set")?;
    let audience = env::var("JWT_AUDIENCE").context("JWT_AUDIENCE must be set")?;

    let mut config = JwtConfig::new(issuer, audience);
    if let Ok(value) = env::var("JWT_LEEWAY_SECONDS") {
        if let Ok(leeway) = value.parse::<u32>() { config = config.with_leeway(leeway); }
    }
    let mut builder = JwtVerifier::builder(config);
    if let Ok(secret) = env::var("JWT_HS256_SECRET") {
        let kid = env::var("JWT_HS256_KID").unwrap_or_else(|_| "local".to_string());
        builder = builder.with_hmac_secret(kid, secret.as_bytes());
    }
    if let Ok(pem) = env::var("JWT_PUBLIC_KEY_PEM") {
        let kid = env::var("JWT_PUBLIC_KEY_KID").unwrap_or_else(|_| "primary".to_string());
        builder = builder.with_rsa_pem(kid, pem.as_bytes()).map_err(anyhow::Error::from)?;
    }
    let verifier = builder.build();
    info!("JWT verifier initialised");
    Ok(Arc::new(verifier))
}

pub fn build_router(state: AppState) -> Router {
    let allowed_origins = [
        "http://localhost:3000",
        "http://localhost:3001",
        "http://localhost:5173",
    ];
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            allowed_origins.iter().filter_map(|o| o.parse::<HeaderValue>().ok()).collect::<Vec<_>>(),
        ))
        .allow_methods([
            Method::GET, Method::POST, Method::PUT, Method::OPTIONS,
        ])
        .allow_headers([
            ACCEPT, CONTENT_TYPE, HeaderName::from_static("authorization"),
        ]);

    async fn metrics() -> (StatusCode, String) {
        let encoder = TextEncoder::new();
        let families = CHECKOUT_REGISTRY.gather();
        let mut buf = Vec::new();
        if let Err(e) = encoder.encode(&families, &mut buf) {
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("metrics encode error: {e}"));
        }
        (StatusCode::OK, String::from_utf8_lossy(&buf).to_string())
    }

    Router::new()
        .route("/healthz", get(health))
        .route("/orders", axum::routing::post(create_order).get(list_orders))
        .route("/orders/:order_id", put(confirm_payment))
        .route("/orders/:order_id/items", get(get_order_items))
        .route("/orders/:order_id/refund", put(refund_order))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn(http_error_metrics))
}
