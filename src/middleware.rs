// ABOUTME: Security headers applied to every response, including streamed uploads
// ABOUTME: Only inline document views may be framed, and only by the configured origins

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::config::Config;

const STRICT_POLICY: &str = "default-src 'none'; img-src 'self' data:; frame-ancestors 'none'; sandbox";

const INLINE_VIEW_PREFIXES: [&str; 2] = ["/api/resources/view/", "/api/certificates/view/"];

fn is_inline_view(path: &str) -> bool {
    INLINE_VIEW_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

fn is_pdf(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .is_some_and(|value| value.as_bytes().starts_with(b"application/pdf"))
}

/// Browsers refuse to run their PDF viewer inside a sandboxed document.
fn inline_view_policy(frame_ancestors: &[String], pdf: bool) -> Option<HeaderValue> {
    let mut policy = format!("frame-ancestors {}", frame_ancestors.join(" "));
    if !pdf {
        policy.push_str("; sandbox");
    }
    HeaderValue::from_str(&policy).ok()
}

pub async fn security_headers(
    State(config): State<Arc<Config>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let inline_view = is_inline_view(request.uri().path());
    let mut response = next.run(request).await;

    let framable = if inline_view {
        inline_view_policy(&config.frame_ancestors, is_pdf(response.headers()))
    } else {
        None
    };

    let headers = response.headers_mut();
    match framable {
        Some(policy) => {
            headers.insert(header::CONTENT_SECURITY_POLICY, policy);
        }
        None => {
            headers.insert(
                header::CONTENT_SECURITY_POLICY,
                HeaderValue::from_static(STRICT_POLICY),
            );
            headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        }
    }

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );

    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("no-referrer"),
    );

    response
}
