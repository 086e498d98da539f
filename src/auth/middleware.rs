//! Bearer-token gate for protected routes.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, warn};

use crate::metrics::MetricsRecorder;
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

/// Strips a literal `Bearer ` prefix when present.
pub fn bearer_token(header: &str) -> &str {
    header.strip_prefix("Bearer ").unwrap_or(header).trim()
}

/// Validates the `Authorization` header and stores the resulting
/// [`AuthClaims`](super::AuthClaims) in the request extensions. Requests
/// without a valid token never reach the handler.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, HTTPError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if header.is_empty() {
        state.metrics.record_auth_check("missing");
        debug!("Rejecting {} without Authorization header", request.uri().path());
        return Err(HTTPError::unauthorized("No Authorization header provided"));
    }

    match state.tokens.validate(bearer_token(header)) {
        Ok(claims) => {
            state.metrics.record_auth_check("ok");
            debug!(uid = %claims.uid, "Bearer token accepted");
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        Err(e) => {
            state.metrics.record_auth_check("rejected");
            warn!("Bearer token rejected for {}: {}", request.uri().path(), e);
            Err(HTTPError::unauthorized(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::bearer_token;

    #[test]
    fn strips_bearer_prefix_only_when_present() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), "abc.def.ghi");
        assert_eq!(bearer_token("abc.def.ghi"), "abc.def.ghi");
        assert_eq!(bearer_token("bearer abc"), "bearer abc");
    }
}
