use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{OriginalUri, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Form;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::services::replies::{self, ReplyOutcome};
use crate::state::AppState;

fn signing_payload(url: &str, params: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let mut data = url.to_string();
    for (key, value) in sorted {
        data.push_str(key);
        data.push_str(value);
    }
    data
}

pub fn compute_twilio_signature(
    auth_token: &str,
    url: &str,
    params: &[(String, String)],
) -> Option<String> {
    let mut mac = Hmac::<Sha1>::new_from_slice(auth_token.as_bytes()).ok()?;
    mac.update(signing_payload(url, params).as_bytes());
    Some(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

fn validate_twilio_signature(
    auth_token: &str,
    signature: &str,
    url: &str,
    params: &[(String, String)],
) -> bool {
    let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(signature) else {
        return false;
    };

    let mut mac = match Hmac::<Sha1>::new_from_slice(auth_token.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(signing_payload(url, params).as_bytes());
    mac.verify_slice(&expected).is_ok()
}

fn webhook_url(state: &AppState, headers: &HeaderMap, path: &str) -> String {
    if !state.config.public_url.is_empty() {
        return format!(
            "{}{path}",
            state.config.public_url.trim_end_matches('/')
        );
    }

    // Behind a proxy the forwarded headers carry the public origin
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("https");
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{proto}://{host}{path}")
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> &'a str {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .unwrap_or("")
}

pub async fn sms_webhook(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Response {
    let params = match form {
        Ok(Form(params)) => params,
        Err(e) => {
            tracing::warn!(error = %e, "unreadable webhook payload");
            return twiml_response();
        }
    };

    // Signature check is skipped when no auth token is configured (dev mode)
    if !state.config.twilio_auth_token.is_empty() {
        let signature = headers
            .get("x-twilio-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if signature.is_empty() {
            tracing::warn!("missing X-Twilio-Signature header");
            return (StatusCode::FORBIDDEN, "Missing signature").into_response();
        }

        let path = uri.path_and_query().map_or(uri.path(), |p| p.as_str());
        let url = webhook_url(&state, &headers, path);
        if !validate_twilio_signature(&state.config.twilio_auth_token, signature, &url, &params) {
            tracing::warn!(url = %url, "invalid Twilio signature");
            return (StatusCode::FORBIDDEN, "Invalid signature").into_response();
        }
    }

    let from = param(&params, "From").trim();
    let body = param(&params, "Body");

    tracing::info!(from = %from, body = %body.trim(), "incoming SMS");

    match replies::process_reply(&state, from, body).await {
        Ok(ReplyOutcome::Ignored) => {}
        Ok(outcome) => tracing::info!(from = %from, ?outcome, "reply processed"),
        Err(e) => tracing::error!(error = %e, from = %from, "reply processing failed"),
    }

    twiml_response()
}

fn twiml_response() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        "<Response></Response>",
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Vec<(String, String)> {
        vec![
            ("From".to_string(), "+15550001111".to_string()),
            ("To".to_string(), "+15551234567".to_string()),
            ("Body".to_string(), "ACCEPT 234567".to_string()),
            ("MessageSid".to_string(), "SM123".to_string()),
        ]
    }

    #[test]
    fn test_signature_accepts_matching_request() {
        let url = "https://lawns.example.com/webhook/sms";
        let sig = compute_twilio_signature("secret", url, &params()).unwrap();
        assert!(validate_twilio_signature("secret", &sig, url, &params()));
    }

    #[test]
    fn test_signature_independent_of_param_order() {
        let url = "https://lawns.example.com/webhook/sms";
        let sig = compute_twilio_signature("secret", url, &params()).unwrap();
        let mut reversed = params();
        reversed.reverse();
        assert!(validate_twilio_signature("secret", &sig, url, &reversed));
    }

    #[test]
    fn test_signature_rejects_tampering() {
        let url = "https://lawns.example.com/webhook/sms";
        let sig = compute_twilio_signature("secret", url, &params()).unwrap();

        let mut tampered = params();
        tampered[2].1 = "ACCEPT 999999".to_string();
        assert!(!validate_twilio_signature("secret", &sig, url, &tampered));
        assert!(!validate_twilio_signature("other", &sig, url, &params()));
        assert!(!validate_twilio_signature(
            "secret",
            &sig,
            "https://evil.example.com/webhook/sms",
            &params()
        ));
        assert!(!validate_twilio_signature("secret", "not base64!", url, &params()));
    }
}
