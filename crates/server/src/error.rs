use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gendra_core::errors::InterfaceError;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub correlation_id: String,
}

#[derive(Debug)]
pub enum ApiError {
    Interface(InterfaceError),
    Unauthorized,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Interface(InterfaceError::BadRequest { .. }) => StatusCode::BAD_REQUEST,
            Self::Interface(InterfaceError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Interface(InterfaceError::Unprocessable { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Interface(InterfaceError::ServiceUnavailable { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Interface(InterfaceError::Internal { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            Self::Interface(error) => ErrorBody {
                code: code(error),
                message: error.message().to_string(),
                correlation_id: error.correlation_id().to_string(),
            },
            Self::Unauthorized => ErrorBody {
                code: "unauthorized",
                message: "a valid admin bearer token is required".to_string(),
                correlation_id: "unassigned".to_string(),
            },
        }
    }
}

fn code(error: &InterfaceError) -> &'static str {
    match error {
        InterfaceError::BadRequest { .. } => "bad_request",
        InterfaceError::NotFound { .. } => "not_found",
        InterfaceError::Unprocessable { .. } => "unprocessable",
        InterfaceError::ServiceUnavailable { .. } => "service_unavailable",
        InterfaceError::Internal { .. } => "internal",
    }
}

impl From<InterfaceError> for ApiError {
    fn from(value: InterfaceError) -> Self {
        Self::Interface(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use gendra_core::errors::InterfaceError;

    use super::ApiError;

    #[test]
    fn interface_errors_map_to_status_and_code() {
        let cases = [
            (
                InterfaceError::BadRequest { message: "m".into(), correlation_id: "c".into() },
                StatusCode::BAD_REQUEST,
                "bad_request",
            ),
            (
                InterfaceError::Unprocessable { message: "m".into(), correlation_id: "c".into() },
                StatusCode::UNPROCESSABLE_ENTITY,
                "unprocessable",
            ),
            (
                InterfaceError::ServiceUnavailable {
                    message: "m".into(),
                    correlation_id: "c".into(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
            ),
            (
                InterfaceError::Internal { message: "m".into(), correlation_id: "c".into() },
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
            ),
        ];

        for (error, status, code) in cases {
            let api = ApiError::from(error);
            assert_eq!(api.status(), status);
            assert_eq!(api.body().code, code);
            assert_eq!(api.body().correlation_id, "c");
        }
    }

    #[test]
    fn unauthorized_has_no_correlation() {
        let body = ApiError::Unauthorized.body();
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body.correlation_id, "unassigned");
    }
}
