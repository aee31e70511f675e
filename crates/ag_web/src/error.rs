use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use ag_core::Error;

/// Error side of every JSON handler.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InputValidation(_) => StatusCode::BAD_REQUEST,
            Error::InvalidStep(_) => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Generation(_) | Error::ImageGeneration(_) | Error::Publish(_) | Error::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::Persistence(_) | Error::Configuration(_) | Error::Serialization(_) | Error::External(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn kind(&self) -> &'static str {
        match &self.0 {
            Error::InputValidation(_) => "input_validation",
            Error::InvalidStep(_) => "invalid_step",
            Error::NotFound(_) => "not_found",
            Error::Generation(_) => "generation",
            Error::ImageGeneration(_) => "image_generation",
            Error::Publish(_) => "publish",
            Error::Http(_) => "http",
            Error::Persistence(_) => "persistence",
            Error::Configuration(_) => "configuration",
            Error::Serialization(_) => "serialization",
            Error::External(_) => "external",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = json!({ "error": self.kind(), "message": self.0.user_message() });
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
