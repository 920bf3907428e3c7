use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use crate::config::ServiceConfig;

/// Builds the shared client with the configured timeout applied to every request.
///
/// # Errors
///
/// Returns `reqwest::Error` if the TLS backend cannot be initialized.
pub fn build_client(config: &ServiceConfig) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(config.timeout).build()
}

pub(crate) fn authorize(request: RequestBuilder, config: &ServiceConfig) -> RequestBuilder {
    match &config.auth_token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

pub(crate) fn is_unauthorized(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Pulls a human-readable message out of an error response, if it has one.
pub(crate) async fn error_message(response: Response) -> Option<String> {
    let body = response.text().await.ok()?;
    extract_message(&body)
}

fn extract_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
        error: Option<String>,
    }

    let text = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message.or(parsed.error)?,
        Err(_) => body.to_string(),
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_json_message_field() {
        assert_eq!(
            extract_message(r#"{"message":"quiz closed","error":"gone"}"#),
            Some("quiz closed".into())
        );
        assert_eq!(
            extract_message(r#"{"error":"gone"}"#),
            Some("gone".into())
        );
    }

    #[test]
    fn falls_back_to_plain_text_body() {
        assert_eq!(extract_message("  bad gateway \n"), Some("bad gateway".into()));
        assert_eq!(extract_message("   "), None);
        assert_eq!(extract_message("{}"), None);
    }
}
