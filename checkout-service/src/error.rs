use common_http_errors::ApiError;
use thiserror::Error;
use uuid::Uuid;

/// Domain failures of the three transactional operations. Business-rule
/// violations map to 4xx responses; infrastructure failures roll the
/// transaction back and map to 5xx with nothing partially applied.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("no cart items resolved for the requested selection")]
    EmptySelection,
    #[error("order not found")]
    OrderNotFound,
    #[error("order is '{actual}', cannot {action}")]
    InvalidStatus {
        actual: String,
        action: &'static str,
    },
    #[error("payment {payment_id} recorded but finalization failed: {source}")]
    PaidNotFinalized {
        payment_id: Uuid,
        #[source]
        source: sqlx::Error,
    },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::EmptySelection => ApiError::BadRequest {
                code: "empty_selection",
                trace_id: None,
                message: Some(err.to_string()),
            },
            CheckoutError::OrderNotFound => ApiError::NotFound {
                code: "order_not_found",
                trace_id: None,
            },
            CheckoutError::InvalidStatus { .. } => ApiError::Conflict {
                code: "invalid_status",
                trace_id: None,
                message: Some(err.to_string()),
            },
            CheckoutError::PaidNotFinalized { payment_id, source } => ApiError::PaidNotFinalized {
                payment_id,
                trace_id: None,
                message: Some(source.to_string()),
            },
            CheckoutError::Database(e) => ApiError::internal(e, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn empty_selection_is_a_bad_request() {
        let resp = ApiError::from(CheckoutError::EmptySelection).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "empty_selection");
    }

    #[test]
    fn invalid_status_is_a_conflict() {
        let err = CheckoutError::InvalidStatus {
            actual: "refunded".into(),
            action: "confirm payment",
        };
        let resp = ApiError::from(err).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "invalid_status");
    }

    #[test]
    fn paid_not_finalized_keeps_the_payment_id_visible() {
        let payment_id = Uuid::new_v4();
        let err = CheckoutError::PaidNotFinalized {
            payment_id,
            source: sqlx::Error::PoolTimedOut,
        };
        let resp = ApiError::from(err).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "paid_not_finalized");
    }
}
