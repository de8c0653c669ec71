/// A body transformation that may refuse its input, e.g. when the bytes cannot be decoded.
pub trait Rewriter {
    fn rewrite(&self, input: &[u8]) -> crate::Result<Vec<u8>>;
}
