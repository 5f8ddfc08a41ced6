//! HTTP response building helpers
//!
//! Keeps status codes and the `{ "error", "code" }` body shape consistent
//! across handlers.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{header, Response, StatusCode};
use serde::Serialize;

use crate::error::{AttemptError, ErrorCode, StorageError};

/// Build a JSON response with the given status code
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}

/// Build a JSON response with 200 OK status
pub fn ok<T: Serialize>(body: &T) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, body)
}

/// Build a JSON response with 201 Created status
pub fn created<T: Serialize>(body: &T) -> Response<Full<Bytes>> {
    json_response(StatusCode::CREATED, body)
}

fn error_body(status: StatusCode, message: &str, code: Option<&str>) -> Response<Full<Bytes>> {
    let body = match code {
        Some(code) => serde_json::json!({ "error": message, "code": code }),
        None => serde_json::json!({ "error": message }),
    };
    json_response(status, &body)
}

/// Build a 404 Not Found response with message
pub fn not_found(message: &str) -> Response<Full<Bytes>> {
    error_body(StatusCode::NOT_FOUND, message, None)
}

/// Build a 400 Bad Request response with message
pub fn bad_request(message: &str) -> Response<Full<Bytes>> {
    error_body(StatusCode::BAD_REQUEST, message, Some(ErrorCode::InvalidInput.as_str()))
}

/// Build a 401 Unauthorized response
pub fn unauthorized() -> Response<Full<Bytes>> {
    error_body(StatusCode::UNAUTHORIZED, "Missing x-user-id header", None)
}

/// Build a 405 Method Not Allowed response
pub fn method_not_allowed() -> Response<Full<Bytes>> {
    error_body(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed", None)
}

/// Convert a StorageError to an appropriate HTTP response
pub fn error_response(error: StorageError) -> Response<Full<Bytes>> {
    match &error {
        StorageError::NotFound(msg) => not_found(msg),
        StorageError::InvalidInput(msg) => bad_request(msg),
        StorageError::Json(e) => bad_request(&format!("JSON error: {}", e)),
        _ => error_body(StatusCode::INTERNAL_SERVER_ERROR, &error.to_string(), None),
    }
}

/// Map an attempt failure code onto its HTTP status
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ExamNotFound | ErrorCode::TopicNotFound => StatusCode::NOT_FOUND,
        ErrorCode::NoQuestionsAvailable => StatusCode::CONFLICT,
        ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
    }
}

/// Convert an AttemptError to an HTTP response
pub fn attempt_error_response(error: AttemptError) -> Response<Full<Bytes>> {
    match error.code() {
        Some(code) => error_body(status_for(code), &error.to_string(), Some(code.as_str())),
        None => match error {
            AttemptError::Store(inner) => error_response(inner),
            other => error_body(StatusCode::INTERNAL_SERVER_ERROR, &other.to_string(), None),
        },
    }
}

/// Wrap a service result into an HTTP response
pub fn from_result<T: Serialize>(result: Result<T, StorageError>) -> Response<Full<Bytes>> {
    match result {
        Ok(value) => ok(&value),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(resp: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_ok_response() {
        let resp = ok(&serde_json::json!({"test": true}));
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_attempt_status_mapping() {
        let cases = [
            (AttemptError::ExamNotFound("x".into()), StatusCode::NOT_FOUND),
            (
                AttemptError::TopicNotFound {
                    exam: "x".into(),
                    topic: "y".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (AttemptError::NoQuestionsAvailable, StatusCode::CONFLICT),
            (AttemptError::InvalidInput("limit".into()), StatusCode::BAD_REQUEST),
            (
                AttemptError::Store(StorageError::Database("busy".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(attempt_error_response(error).status(), status);
        }
    }

    #[tokio::test]
    async fn test_error_body_carries_code() {
        let body = body_json(attempt_error_response(AttemptError::NoQuestionsAvailable)).await;
        assert_eq!(body["code"], "no_questions_available");
        assert!(body["error"].is_string());
    }

    #[test]
    fn test_error_response_not_found() {
        let resp = error_response(StorageError::NotFound("test".into()));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
