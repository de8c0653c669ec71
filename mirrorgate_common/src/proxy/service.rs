use std::sync::Arc;

use axum::{
    body::Body,
    debug_handler,
    extract::{Request, State},
    http::HeaderValue,
    response::Response,
};
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE};
use hyper::StatusCode;
use scorched::{logf, LogData, LogImportance};

use crate::{
    error::{AppError, Result},
    state::ProxyState,
};

use super::fetcher::{ProxyRequest, UpstreamResponse};

#[debug_handler]
pub async fn proxy(State(state): State<Arc<ProxyState>>, req: Request) -> Result<Response> {
    let request = ProxyRequest::from_inbound(req).await?;

    logf!(
        Info,
        "Proxying: {} {}",
        request.method,
        state.fetcher.target_url(&request)
    );

    // Dropping this future on client disconnect abandons the upstream call with it.
    let res = match state.fetcher.fetch(request).await {
        Ok(res) => res,
        Err(e) => {
            let err = AppError::from(e);
            logf!(Error, "Proxy error: {}", err.detail());
            return Err(err);
        }
    };

    let declared = res.content_type().to_string();

    let UpstreamResponse {
        status,
        headers,
        body,
    } = res;

    let body = state.rewriter.rewrite_body(body, &declared);

    let content_length = HeaderValue::from(body.len());
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;

    let response_headers = response.headers_mut();
    if let Some(content_type) = headers.get(CONTENT_TYPE) {
        response_headers.insert(CONTENT_TYPE, content_type.clone());
    }
    // The body may have changed size, so the upstream length is never reused.
    response_headers.insert(CONTENT_LENGTH, content_length);

    Ok(response)
}

/// Preflight requests are answered here and never reach the upstream.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
