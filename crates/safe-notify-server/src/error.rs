use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use safe_notify_core::NotifyError;

/// Carries an explicit HTTP 400 through the `anyhow::Error` chain.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct BadRequest(String);

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequest(msg.into()).into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.downcast_ref::<BadRequest>().is_some() {
            StatusCode::BAD_REQUEST
        } else if let Some(e) = self.0.downcast_ref::<NotifyError>() {
            match e {
                NotifyError::InvalidCategory(_)
                | NotifyError::InvalidSeverity(_)
                | NotifyError::InvalidStatus { .. }
                | NotifyError::InvalidEnvironment(_)
                | NotifyError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
                NotifyError::ConfigNotFound(_) => StatusCode::NOT_FOUND,
                NotifyError::Io(_) | NotifyError::Yaml(_) | NotifyError::Json(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            tracing::error!("request failed: {:#}", self.0);
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_maps_to_400() {
        let err = AppError(NotifyError::InvalidConfig("window_ms is zero".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_status_maps_to_400() {
        let err = AppError(
            NotifyError::InvalidStatus {
                kind: "workflow status",
                value: "stalled".into(),
            }
            .into(),
        );
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn config_not_found_maps_to_404() {
        let err = AppError(NotifyError::ConfigNotFound("/etc/notify.yaml".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn io_error_maps_to_500() {
        let err = AppError(NotifyError::Io(std::io::Error::other("disk full")).into());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn bad_request_constructor_maps_to_400() {
        let err = AppError::bad_request("service must not be empty");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_error_maps_to_500() {
        let err = AppError(anyhow::anyhow!("something unexpected"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}
