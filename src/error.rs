use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Upstream error {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed upstream data: {0}")]
    Malformed(String),

    #[error("Database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn malformed(context: &str, err: impl std::fmt::Display) -> Self {
        AppError::Malformed(format!("{context}: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream { .. } | AppError::Malformed(_) => StatusCode::BAD_GATEWAY,
            AppError::Transport(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            AppError::Transport(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_and_malformed_map_to_bad_gateway() {
        let resp = AppError::Upstream { status: 429, message: "Too Many Requests".into() }.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let resp = AppError::Malformed("missing Laps".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn invalid_input_is_bad_request() {
        let resp = AppError::InvalidInput("season".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
