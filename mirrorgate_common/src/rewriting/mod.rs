pub mod content;
pub mod rewriter;
pub mod text;
