//! The ordered text substitutions that keep links inside the proxy.
//!
//! This is plain pattern matching over the raw text, not parsing. Every rule runs once over
//! the whole input and never rescans its own replacements, but a rule does see what the
//! rules before it produced. An absolute link to the origin therefore comes out of rule 1 as
//! `/proxy/...` and is then prefixed again by the attribute rule. Running the set twice over
//! the same text is not idempotent either.

use std::borrow::Cow;

use regex::{Captures, Regex};

use crate::proxy::util::Origin;

pub const BASE_TAG: &str = r#"<base href="/proxy/">"#;

pub struct RewriteRule {
    pattern: Regex,
    replacement: String,
}

impl RewriteRule {
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            replacement: replacement.into(),
        })
    }

    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.pattern.replace_all(text, self.replacement.as_str())
    }
}

pub struct RuleSet {
    rules: Vec<RewriteRule>,
    head: Regex,
}

impl RuleSet {
    pub fn for_origin(origin: &Origin) -> Result<Self, regex::Error> {
        let host = regex::escape(origin.bare_host());
        let port = if origin.has_default_port() {
            String::new()
        } else {
            format!(":{}", origin.port())
        };

        let rules = vec![
            // Absolute links to the origin, bare and www
            RewriteRule::new(&format!(r"https?://{host}{port}(/)?"), "/proxy${1}")?,
            RewriteRule::new(&format!(r"https?://www\.{host}{port}(/)?"), "/proxy${1}")?,
            // Root-relative attribute values
            RewriteRule::new(
                r#"(href|src|action|data-src|data-href)=["'](/[^"']*)["']"#,
                r#"${1}="/proxy${2}""#,
            )?,
            // CSS url()
            RewriteRule::new(r#"url\(["']?(/[^"')]*)["']?\)"#, r#"url("/proxy${1}")"#)?,
            // Literal request call sites
            RewriteRule::new(
                r#"(fetch|XMLHttpRequest|axios\.(get|post))\(["'](/[^"']*)["']"#,
                r#"${1}("/proxy${3}""#,
            )?,
        ];

        Ok(Self {
            rules,
            head: Regex::new(r"(?i)<head[^>]*>")?,
        })
    }

    pub fn apply(&self, text: &str) -> String {
        let mut rewritten = text.to_string();

        for rule in &self.rules {
            rewritten = rule.apply(&rewritten).into_owned();
        }

        // Last, so the inserted tag is never rewritten itself.
        if !rewritten.contains("<base") {
            rewritten = self
                .head
                .replace(&rewritten, |caps: &Captures| format!("{}{}", &caps[0], BASE_TAG))
                .into_owned();
        }

        rewritten
    }
}
