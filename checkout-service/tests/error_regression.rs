use axum::{Router, routing::get, http::{Request, StatusCode}};
use common_http_errors::ApiError;
use tower::ServiceExt; // for oneshot

#[tokio::test]
async fn internal_error_500() {
    async fn boom() -> Result<String, ApiError> { Err(ApiError::Internal { trace_id: None, message: Some("synthetic".into()) }) }
    let app = Router::new().route("/boom", get(boom));
    let req = Request::builder().uri("/boom").method("GET").body(axum::body::Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "internal_error");
}

#[tokio::test]
async fn empty_selection_maps_to_400() {
    use checkout_service::error::CheckoutError;
    async fn reject() -> Result<String, ApiError> { Err(CheckoutError::EmptySelection.into()) }
    let app = Router::new().route("/orders", get(reject));
    let req = Request::builder().uri("/orders").method("GET").body(axum::body::Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "empty_selection");
}

#[tokio::test]
async fn invalid_status_maps_to_409() {
    use checkout_service::error::CheckoutError;
    async fn reject() -> Result<String, ApiError> {
        Err(CheckoutError::InvalidStatus { actual: "paid".into(), action: "confirm payment" }.into())
    }
    let app = Router::new().route("/confirm", get(reject));
    let req = Request::builder().uri("/confirm").method("GET").body(axum::body::Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "invalid_status");
}
