//! HTTP request handling for the stub endpoint.
//!
//! Every request except HEAD is matched; the path is ignored. HEAD answers
//! 200 so replay runs can probe liveness.

use super::response::{build_response, error_response, json_body_response, no_content_response};
use crate::matcher::{IncomingRequest, MatchEngine, MatchResult};
use crate::metrics;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Handle a request to the stub
pub async fn handle_stub_request<B>(
    req: Request<B>,
    engine: Arc<MatchEngine>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Display,
{
    let start = Instant::now();

    if req.method() == Method::HEAD {
        metrics::record_request("liveness", elapsed_ms(start));
        return Ok(build_response(StatusCode::OK, Bytes::new()));
    }

    let query = req.uri().query().map(str::to_string);

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            if engine.is_debug(query.as_deref()) {
                info!("Unable to read request body: {}", e);
            } else {
                debug!("Unable to read request body: {}", e);
            }
            metrics::record_request("body_read_failure", elapsed_ms(start));
            return Ok(error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                &format!("unable to read request body: {e}"),
            ));
        }
    };

    let result = engine.handle(&IncomingRequest { query, body });
    metrics::record_request(result.outcome(), elapsed_ms(start));

    let response = match result {
        MatchResult::Hit(body) => json_body_response(body),
        MatchResult::NoMatch => no_content_response("no-match"),
        MatchResult::EmptyRequest => no_content_response("empty-request"),
        MatchResult::MalformedBody(message) => error_response(
            StatusCode::BAD_REQUEST,
            &format!("request body is not JSON: {message}"),
        ),
    };
    Ok(response)
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
