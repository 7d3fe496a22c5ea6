//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// API error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "type": match self.status {
                    StatusCode::BAD_REQUEST => "invalid_request_error",
                    StatusCode::NOT_FOUND => "not_found_error",
                    StatusCode::SERVICE_UNAVAILABLE => "overloaded_error",
                    StatusCode::GATEWAY_TIMEOUT => "timeout_error",
                    _ => "server_error",
                },
                "code": self.status.as_str()
            }
        }));
        (self.status, body).into_response()
    }
}

impl From<utter_core::Error> for ApiError {
    fn from(err: utter_core::Error) -> Self {
        use utter_core::Error;
        let status = match &err {
            Error::InvalidRequest(_) | Error::UnknownVoice(_) => StatusCode::BAD_REQUEST,
            Error::EngineUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Error::QueueTimeout | Error::SynthesisTimeout => StatusCode::GATEWAY_TIMEOUT,
            Error::Cancelled => StatusCode::CONFLICT,
            Error::SynthesisFailure(_) | Error::StorageFailure(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}
