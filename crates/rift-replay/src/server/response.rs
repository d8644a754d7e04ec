//! Response builders shared by the stub and metrics listeners.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorDetail>,
}

/// Individual error detail
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Build an HTTP response with headers.
///
/// Falls back to a bare 500 if the builder rejects a header.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key.as_ref(), value.as_ref());
    }
    builder.body(Full::new(body.into())).unwrap_or_else(|_| {
        let mut response = Response::new(Full::new(Bytes::from("Internal Server Error")));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

/// Build a response without extra headers
pub fn build_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    build_response_with_headers(status, std::iter::empty::<(&str, &str)>(), body)
}

/// Serve a stored fixture response
pub fn json_body_response(body: Bytes) -> Response<Full<Bytes>> {
    build_response_with_headers(
        StatusCode::OK,
        [("content-type", "application/json")],
        body,
    )
}

/// "No content" answer carrying the reason in a header
pub fn no_content_response(outcome: &str) -> Response<Full<Bytes>> {
    build_response_with_headers(
        StatusCode::NO_CONTENT,
        [("x-rift-replay-outcome", outcome)],
        Bytes::new(),
    )
}

/// Create an error response
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let error = ErrorResponse {
        errors: vec![ErrorDetail {
            code: status.as_str().to_string(),
            message: message.to_string(),
        }],
    };
    let body = serde_json::to_vec(&error).unwrap_or_default();
    build_response_with_headers(status, [("content-type", "application/json")], body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_error_response_body() {
        let response = error_response(StatusCode::BAD_REQUEST, "nope");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["errors"][0]["code"], "400");
        assert_eq!(value["errors"][0]["message"], "nope");
    }

    #[test]
    fn test_no_content_header() {
        let response = no_content_response("no-match");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()["x-rift-replay-outcome"], "no-match");
    }
}
