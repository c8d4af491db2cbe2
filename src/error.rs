/*
 * Responsibility
 * - Application-wide AppError definition
 * - IntoResponse impl (HTTP status / problem+json body)
 * - Auth failures become a uniform 401 carrying the request path as `instance`
 */
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// RFC 7807 problem details, plus a stable machine-readable `code`.
#[derive(Debug, Serialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: &'static str,
    pub status: u16,
    pub code: &'static str,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized: {message}")]
    Unauthorized {
        message: String,
        instance: Option<String>,
    },
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>, instance: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
            instance: Some(instance.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, detail, instance) = match self {
            AppError::Unauthorized { message, instance } => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message, instance)
            }
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".to_string(),
                None,
            ),
        };

        let body = Problem {
            kind: "about:blank",
            title: status.canonical_reason().unwrap_or("Error"),
            status: status.as_u16(),
            code,
            detail,
            instance,
        };

        let mut response = (status, Json(body)).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(PROBLEM_CONTENT_TYPE),
        );
        response
    }
}
