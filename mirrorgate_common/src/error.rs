use core::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

// Make our own error that wraps `anyhow::Error`.
#[derive(Debug)]
pub struct AppError(anyhow::Error);

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// The error followed by its chain of causes, e.g. `failed to reach upstream: ...: Connection refused`.
    pub fn detail(&self) -> String {
        format!("{:#}", self.0)
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Failed to proxy request",
                "message": self.detail(),
            })),
        )
            .into_response()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// This enables using `?` on functions that return `Result<_, anyhow::Error>` to turn them into
// `Result<_, AppError>`. That way you don't need to do that manually.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn renders_as_json_500() {
        let err: AppError = anyhow::anyhow!("connection refused").into();
        let res = err.into_response();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Failed to proxy request");
        assert_eq!(value["message"], "connection refused");
    }

    #[test]
    fn detail_carries_the_cause_chain() {
        use anyhow::Context;

        let err: AppError = Err::<(), _>(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "Connection refused",
        ))
        .context("failed to reach upstream")
        .unwrap_err()
        .into();

        assert_eq!(err.to_string(), "failed to reach upstream");
        assert_eq!(err.detail(), "failed to reach upstream: Connection refused");
    }
}
