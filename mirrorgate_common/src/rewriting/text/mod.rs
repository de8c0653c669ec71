pub mod rules;
pub mod url_rewriter;
