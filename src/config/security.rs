use axum::http::{header, HeaderName, HeaderValue, Request, Response};
use std::task::{Context, Poll};
use tower::{Layer, Service};

const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");
const X_XSS_PROTECTION: HeaderName = HeaderName::from_static("x-xss-protection");

const NOSNIFF: HeaderValue = HeaderValue::from_static("nosniff");
const DENY: HeaderValue = HeaderValue::from_static("DENY");
const XSS_BLOCK: HeaderValue = HeaderValue::from_static("1; mode=block");
const HSTS_VALUE: HeaderValue = HeaderValue::from_static("max-age=31536000; includeSubDomains");
const CSP_API_VALUE: HeaderValue =
    HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'");
const REFERRER_POLICY_VALUE: HeaderValue =
    HeaderValue::from_static("strict-origin-when-cross-origin");
// Door scanners use the camera from the UI origin, not from API responses.
const PERMISSIONS_POLICY_VALUE: HeaderValue =
    HeaderValue::from_static("geolocation=(), microphone=(), camera=()");
const NO_STORE: HeaderValue = HeaderValue::from_static("no-store");

#[derive(Clone)]
pub struct SecurityHeadersLayer {
    include_hsts: bool,
}

impl SecurityHeadersLayer {
    pub fn new(include_hsts: bool) -> Self {
        if include_hsts {
            tracing::info!("Security: HSTS header enabled (production mode)");
        } else {
            tracing::info!("Security: HSTS header disabled (development mode)");
        }
        Self { include_hsts }
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersService {
            inner,
            include_hsts: self.include_hsts,
        }
    }
}

#[derive(Clone)]
pub struct SecurityHeadersService<S> {
    inner: S,
    include_hsts: bool,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for SecurityHeadersService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = SecurityHeadersFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        SecurityHeadersFuture {
            future: self.inner.call(request),
            include_hsts: self.include_hsts,
        }
    }
}

#[pin_project::pin_project]
pub struct SecurityHeadersFuture<F> {
    #[pin]
    future: F,
    include_hsts: bool,
}

impl<F, ResBody, E> std::future::Future for SecurityHeadersFuture<F>
where
    F: std::future::Future<Output = Result<Response<ResBody>, E>>,
{
    type Output = Result<Response<ResBody>, E>;

    fn poll(self: std::pin::Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        match this.future.poll(cx) {
            Poll::Ready(Ok(mut response)) => {
                let headers = response.headers_mut();

                headers.insert(header::X_CONTENT_TYPE_OPTIONS, NOSNIFF);
                headers.insert(header::X_FRAME_OPTIONS, DENY);
                headers.insert(X_XSS_PROTECTION, XSS_BLOCK);
                headers.insert(header::CONTENT_SECURITY_POLICY, CSP_API_VALUE);
                headers.insert(header::REFERRER_POLICY, REFERRER_POLICY_VALUE);
                headers.insert(PERMISSIONS_POLICY, PERMISSIONS_POLICY_VALUE);
                // Ticket and badge state changes with every scan.
                headers
                    .entry(header::CACHE_CONTROL)
                    .or_insert(NO_STORE);

                // Only add HSTS in production (HTTPS environments)
                if *this.include_hsts {
                    headers.insert(header::STRICT_TRANSPORT_SECURITY, HSTS_VALUE);
                }

                Poll::Ready(Ok(response))
            }
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => Poll::Pending,
        }
    }
}

pub fn create_security_headers_layer(include_hsts: bool) -> SecurityHeadersLayer {
    SecurityHeadersLayer::new(include_hsts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[test]
    fn test_security_headers_layer_creation() {
        let layer = SecurityHeadersLayer::new(false);
        assert!(!layer.include_hsts);

        let layer_with_hsts = SecurityHeadersLayer::new(true);
        assert!(layer_with_hsts.include_hsts);
    }

    #[tokio::test]
    async fn test_headers_applied_to_responses() {
        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(create_security_headers_layer(true));

        let response = app
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        assert!(headers.contains_key(header::STRICT_TRANSPORT_SECURITY));
    }

    #[tokio::test]
    async fn test_existing_cache_control_is_kept() {
        let app = Router::new()
            .route(
                "/code.svg",
                get(|| async { ([(header::CACHE_CONTROL, "private, max-age=60")], "<svg/>") }),
            )
            .layer(create_security_headers_layer(false));

        let response = app
            .oneshot(Request::builder().uri("/code.svg").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.headers()[header::CACHE_CONTROL], "private, max-age=60");
        assert!(!response.headers().contains_key(header::STRICT_TRANSPORT_SECURITY));
    }
}
