//! API Error Handling
//!
//! Service errors become a status code plus an [`ErrorBody`].

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use strata_core::dto::error::{ErrorBody, ErrorKind};

use super::caller::USER_HEADER;
use crate::service::PipelineError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// The request did not say who is calling
    Unauthenticated,
    Service(PipelineError),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Service(err)
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Service(PipelineError::InvalidArgument(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Service(PipelineError::InvalidArgument(rejection.body_text()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Service(PipelineError::InvalidArgument(rejection.body_text()))
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidArgument | ErrorKind::MalformedDefinition | ErrorKind::InvalidMarker => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::AccessDenied => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::DuplicatedName | ErrorKind::ActionNotAllowed => StatusCode::CONFLICT,
        ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: ErrorKind::AccessDenied,
                    message: format!("missing {USER_HEADER} header"),
                },
            ),
            ApiError::Service(err) => {
                let kind = err.kind();
                if kind == ErrorKind::InternalError {
                    tracing::error!("Internal error: {}", err);
                } else {
                    tracing::debug!("Request failed with {}: {}", kind, err);
                }
                (
                    status_for(kind),
                    ErrorBody {
                        code: kind,
                        message: err.to_string(),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
