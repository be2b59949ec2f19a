#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Unknown(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Malformed identity token: {0}")]
    MalformedToken(String),

    #[error("Federated identity exchange failed: {0}")]
    Federation(String),

    #[error("Role assumption failed: {0}")]
    RoleAssumption(String),

    #[error("Dashboard user provisioning failed: {0}")]
    Provisioning(String),

    /// Recoverable provisioning outcome; swallowed by the request handler and
    /// never surfaced to a client.
    #[error("dashboard user is already registered")]
    UserAlreadyRegistered,

    #[error("Embed URL issuance failed: {0}")]
    EmbedUrl(String),
}

impl Error {
    pub fn error_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match *self {
            Self::MalformedToken(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body; the only failure shape clients ever see. Messages may
/// carry service error detail but never credential material.
#[derive(Debug, serde::Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        if self.error_status().is_client_error() {
            tracing::warn!(message = "returning error to client", error = ?&self);
        } else {
            tracing::error!(message = "returning error to client", error = ?&self);
        }
        (
            self.error_status(),
            axum::Json(ErrorBody {
                status: "error",
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_status() {
        assert_eq!(
            Error::MalformedToken("x".to_string()).error_status(),
            axum::http::StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Federation("x".to_string()).error_status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::Provisioning("x".to_string()).error_status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::EmbedUrl("x".to_string()).error_status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
