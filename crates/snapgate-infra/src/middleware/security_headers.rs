use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::{middleware::Next, response::Response};
use snapgate_core::Config;

const RESPONSE_HEADERS: [(&str, &str); 4] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("permissions-policy", "geolocation=(), microphone=(), camera=()"),
];

const HSTS: (&str, &str) = (
    "strict-transport-security",
    "max-age=31536000; includeSubDomains",
);

/// Header policy for [`security_headers_middleware`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityHeaders {
    /// HSTS is only sent in production, where TLS is terminated in front of us.
    pub hsts: bool,
}

impl SecurityHeaders {
    pub fn from_config(config: &Config) -> Self {
        Self {
            hsts: config.is_production(),
        }
    }
}

/// Stamp security headers on every response, redirects and streamed artifacts included.
pub async fn security_headers_middleware(
    State(policy): State<SecurityHeaders>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    let hsts = policy.hsts.then_some(HSTS);
    let headers = response.headers_mut();
    for (name, value) in RESPONSE_HEADERS.into_iter().chain(hsts) {
        headers.insert(name, HeaderValue::from_static(value));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, StatusCode};
    use axum::{body::Body, routing::get, Router};
    use tower::ServiceExt;

    fn app_with(policy: SecurityHeaders) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .route(
                "/moved",
                get(|| async { (StatusCode::FOUND, [(header::LOCATION, "/")]) }),
            )
            .layer(axum::middleware::from_fn_with_state(
                policy,
                security_headers_middleware,
            ))
    }

    fn app() -> Router {
        app_with(SecurityHeaders::default())
    }

    #[tokio::test]
    async fn test_security_headers_applied() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert!(headers.contains_key("referrer-policy"));
        assert!(headers.contains_key("permissions-policy"));
    }

    #[tokio::test]
    async fn test_redirects_carry_headers() {
        let response = app()
            .oneshot(Request::builder().uri("/moved").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    }

    #[tokio::test]
    async fn test_hsts_follows_policy() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(!response.headers().contains_key("strict-transport-security"));

        let response = app_with(SecurityHeaders { hsts: true })
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            response.headers()["strict-transport-security"],
            "max-age=31536000; includeSubDomains"
        );
    }

    #[test]
    fn test_policy_from_environment_setting() {
        let lookup = |env: &'static str| {
            move |name: &str| match name {
                "ENVIRONMENT" => Some(env.to_string()),
                "TWITTER_SNAP_API_BASEURL" => Some("http://snap.internal".to_string()),
                _ => None,
            }
        };

        let config = Config::from_lookup(lookup("production")).unwrap();
        assert!(SecurityHeaders::from_config(&config).hsts);

        let config = Config::from_lookup(lookup("development")).unwrap();
        assert!(!SecurityHeaders::from_config(&config).hsts);
    }
}
