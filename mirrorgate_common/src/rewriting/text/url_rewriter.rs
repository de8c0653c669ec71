use std::str::Utf8Error;

use axum::body::Bytes;
use scorched::{logf, LogData, LogImportance};
use thiserror::Error;

use crate::{
    error::Result,
    proxy::util::Origin,
    rewriting::{content::ContentClass, rewriter::Rewriter},
};

use super::rules::RuleSet;

#[derive(Error, Debug)]
#[error("body is declared as text but is not valid UTF-8: {0}")]
pub struct DecodeError(#[from] Utf8Error);

/// Points every link it can find in HTML, CSS and script back at the proxy.
pub struct UrlRewriter {
    rules: RuleSet,
}

impl UrlRewriter {
    pub fn new(origin: &Origin) -> Result<Self> {
        Ok(Self {
            rules: RuleSet::for_origin(origin)?,
        })
    }

    /// Rewrite a response body according to its declared content type.
    ///
    /// Binary bodies come back as the very same buffer. A textual body that fails to decode is
    /// passed through unchanged as well, rather than failing the whole request.
    pub fn rewrite_body(&self, body: Bytes, content_type: &str) -> Bytes {
        if !ContentClass::from_content_type(content_type).is_rewritable() {
            return body;
        }

        match self.rewrite(&body) {
            Ok(rewritten) => Bytes::from(rewritten),
            Err(e) => {
                logf!(Warning, "Passing {} through unrewritten: {}", content_type, e);
                body
            }
        }
    }
}

impl Rewriter for UrlRewriter {
    fn rewrite(&self, input: &[u8]) -> Result<Vec<u8>> {
        let text = std::str::from_utf8(input).map_err(DecodeError::from)?;

        Ok(self.rules.apply(text).into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::util::parse_origin;

    fn rewriter() -> UrlRewriter {
        UrlRewriter::new(&parse_origin("https://movies.do").unwrap()).unwrap()
    }

    #[test]
    fn binary_is_byte_identical() {
        let png = Bytes::from_static(b"\x89PNG\r\n\x1a\n href=\"/a\" \xff\xfe url(/b)");

        let out = rewriter().rewrite_body(png.clone(), "image/png");

        assert_eq!(out, png);
        assert_eq!(out.as_ptr(), png.as_ptr());
    }

    #[test]
    fn html_is_rewritten_and_length_changes() {
        let html = Bytes::from_static(b"<head></head><a href=\"/movies/list\">");

        let out = rewriter().rewrite_body(html.clone(), "text/html; charset=utf-8");

        assert_eq!(
            &out[..],
            b"<head><base href=\"/proxy/\"></head><a href=\"/proxy/movies/list\">"
        );
        assert_ne!(out.len(), html.len());
    }

    #[test]
    fn scripts_are_rewritten() {
        let js = Bytes::from_static(b"fetch('/api/now')");

        let out = rewriter().rewrite_body(js, "application/javascript");

        assert_eq!(&out[..], b"fetch(\"/proxy/api/now\")");
    }

    #[test]
    fn invalid_utf8_text_passes_through() {
        let broken = Bytes::from_static(b"<a href=\"/x\">\xc3\x28</a>");

        assert!(rewriter().rewrite(&broken).is_err());
        assert_eq!(rewriter().rewrite_body(broken.clone(), "text/html"), broken);
    }
}
