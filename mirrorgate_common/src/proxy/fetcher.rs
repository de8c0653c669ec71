use std::sync::Arc;

use axum::{
    body::{to_bytes, Bytes},
    extract::Request,
    http::{HeaderValue, Uri},
};
use hyper::{
    header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, COOKIE, ORIGIN, REFERER, USER_AGENT},
    HeaderMap, Method, StatusCode,
};
use reqwest::redirect::Policy;
use thiserror::Error;

use crate::{error::Result, state::Config};

use super::util::{target_url, upstream_path, Origin};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Failure to get any response at all out of the upstream.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to reach upstream")]
    Send(#[source] reqwest::Error),
    #[error("failed to read upstream body")]
    Body(#[source] reqwest::Error),
}

#[derive(Debug, Clone)]
/// An inbound request, reduced to what gets forwarded upstream
pub struct ProxyRequest {
    pub method: Method,
    /// The path below the proxy prefix, empty for the origin root
    pub path: String,
    pub query: Option<String>,
    /// One value per header name, the last one wins
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl ProxyRequest {
    pub async fn from_inbound(req: Request) -> Result<Self> {
        let (parts, body) = req.into_parts();

        let body = to_bytes(body, usize::MAX).await?;

        Ok(Self::from_parts(parts.method, &parts.uri, &parts.headers, body))
    }

    pub fn from_parts(method: Method, uri: &Uri, headers: &HeaderMap, body: Bytes) -> Self {
        let mut collapsed = HeaderMap::with_capacity(headers.keys_len());
        for (name, value) in headers {
            collapsed.insert(name.clone(), value.clone());
        }

        Self {
            method,
            path: upstream_path(uri.path()).to_string(),
            query: uri.query().map(str::to_string),
            headers: collapsed,
            body: if body.is_empty() { None } else { Some(body) },
        }
    }
}

#[derive(Debug)]
/// Whatever the upstream answered with, error statuses included
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// The declared content type, or an empty string when it is absent or not visible ASCII.
    pub fn content_type(&self) -> &str {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
    }
}

#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    origin: Arc<Origin>,
    origin_header: HeaderValue,
}

impl Fetcher {
    pub fn new(origin: Origin, config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .redirect(Policy::limited(config.max_redirects))
            .no_proxy()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .zstd(true);

        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        let origin_header = HeaderValue::from_str(&origin.to_string())?;

        Ok(Self {
            client: builder.build()?,
            origin: Arc::new(origin),
            origin_header,
        })
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn target_url(&self, request: &ProxyRequest) -> String {
        target_url(&self.origin, &request.path, request.query.as_deref())
    }

    /// The fixed browser-like header set. `Referer` and `Origin` point at the upstream itself,
    /// since the upstream may refuse requests that claim to come from elsewhere.
    pub fn outbound_headers(&self, request: &ProxyRequest) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            ACCEPT,
            request
                .headers
                .get(ACCEPT)
                .cloned()
                .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_ACCEPT)),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE),
        );
        headers.insert(REFERER, self.origin_header.clone());
        headers.insert(ORIGIN, self.origin_header.clone());

        if let Some(cookie) = request.headers.get(COOKIE) {
            headers.insert(COOKIE, cookie.clone());
        }

        if request.body.is_some() {
            if let Some(content_type) = request.headers.get(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, content_type.clone());
            }
        }

        headers
    }

    /// Issue the request exactly once. Only transport failures are errors.
    pub async fn fetch(
        &self,
        request: ProxyRequest,
    ) -> std::result::Result<UpstreamResponse, FetchError> {
        let url = self.target_url(&request);
        let headers = self.outbound_headers(&request);

        let mut builder = self.client.request(request.method, url).headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let res = builder.send().await.map_err(FetchError::Send)?;

        let status = res.status();
        let headers = res.headers().clone();
        let body = res.bytes().await.map_err(FetchError::Body)?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::util::parse_origin;

    fn fetcher() -> Fetcher {
        Fetcher::new(
            parse_origin("https://movies.do").unwrap(),
            &Config::default(),
        )
        .unwrap()
    }

    fn request(headers: &[(&'static str, &'static str)], body: &'static [u8]) -> ProxyRequest {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(*name, HeaderValue::from_static(value));
        }

        ProxyRequest::from_parts(
            Method::POST,
            &"/proxy/api/list?page=2".parse().unwrap(),
            &map,
            Bytes::from_static(body),
        )
    }

    #[test]
    fn strips_prefix_and_keeps_query() {
        let req = request(&[], b"");

        assert_eq!(req.path, "/api/list");
        assert_eq!(req.query.as_deref(), Some("page=2"));
        assert!(req.body.is_none());
        assert_eq!(
            fetcher().target_url(&req),
            "https://movies.do/api/list?page=2"
        );
    }

    #[test]
    fn repeated_headers_keep_last_value() {
        let req = request(&[("x-token", "first"), ("x-token", "second")], b"");

        assert_eq!(req.headers.get_all("x-token").iter().count(), 1);
        assert_eq!(req.headers["x-token"], "second");
    }

    #[test]
    fn outbound_headers_point_at_upstream() {
        let headers =
            fetcher().outbound_headers(&request(&[("origin", "http://localhost:3000")], b""));

        assert_eq!(headers[USER_AGENT], BROWSER_USER_AGENT);
        assert_eq!(headers[ACCEPT], DEFAULT_ACCEPT);
        assert_eq!(headers[ACCEPT_LANGUAGE], DEFAULT_ACCEPT_LANGUAGE);
        assert_eq!(headers[REFERER], "https://movies.do");
        assert_eq!(headers[ORIGIN], "https://movies.do");
        assert!(headers.get(COOKIE).is_none());
    }

    #[test]
    fn inbound_accept_and_cookie_are_forwarded() {
        let headers = fetcher().outbound_headers(&request(
            &[("accept", "application/json"), ("cookie", "session=abc")],
            b"",
        ));

        assert_eq!(headers[ACCEPT], "application/json");
        assert_eq!(headers[COOKIE], "session=abc");
    }

    #[test]
    fn content_type_only_travels_with_a_body() {
        let fetcher = fetcher();

        let empty = fetcher.outbound_headers(&request(&[("content-type", "text/plain")], b""));
        assert!(empty.get(CONTENT_TYPE).is_none());

        let with_body =
            fetcher.outbound_headers(&request(&[("content-type", "text/plain")], b"hello"));
        assert_eq!(with_body[CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn missing_content_type_reads_as_empty() {
        let res = UpstreamResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        };
        assert_eq!(res.content_type(), "");
    }
}
