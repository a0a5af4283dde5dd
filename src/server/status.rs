//! HTTP status decision for execution results

use crate::core::error::GraphQLException;
use async_graphql::{Response, ServerError};
use axum::http::StatusCode;

/// Maps one execution result to an HTTP status
pub trait StatusDecider: Send + Sync {
    fn decide(&self, response: &Response) -> StatusCode;
}

impl<F> StatusDecider for F
where
    F: Fn(&Response) -> StatusCode + Send + Sync,
{
    fn decide(&self, response: &Response) -> StatusCode {
        self(response)
    }
}

/// Default status policy
///
/// - no errors: 200
/// - otherwise the highest status among the errors, where an error carrying
///   a [`GraphQLException`] uses its code (500 when outside 400..=599), a
///   request-level error (no path) is 400 and anything else is 500
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpCodeDecider;

impl HttpCodeDecider {
    fn error_status(error: &ServerError) -> StatusCode {
        if let Some(exception) = error.source::<GraphQLException>() {
            return match exception.code() {
                code @ 400..=599 => {
                    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
        }
        if error.path.is_empty() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl StatusDecider for HttpCodeDecider {
    fn decide(&self, response: &Response) -> StatusCode {
        response
            .errors
            .iter()
            .map(Self::error_status)
            .max()
            .unwrap_or(StatusCode::OK)
    }
}

/// Always answers the same status
#[derive(Debug, Clone, Copy)]
pub struct FixedStatusDecider(pub StatusCode);

impl StatusDecider for FixedStatusDecider {
    fn decide(&self, _response: &Response) -> StatusCode {
        self.0
    }
}
