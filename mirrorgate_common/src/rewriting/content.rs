/// What a response body is, as far as rewriting is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    Html,
    StyleOrScript,
    /// Anything else. Never decoded, so images, video and fonts survive untouched.
    Binary,
}

impl ContentClass {
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.contains("text/html") {
            ContentClass::Html
        } else if content_type.contains("text/css")
            || content_type.contains("application/javascript")
        {
            ContentClass::StyleOrScript
        } else {
            ContentClass::Binary
        }
    }

    pub fn is_rewritable(self) -> bool {
        !matches!(self, ContentClass::Binary)
    }
}
