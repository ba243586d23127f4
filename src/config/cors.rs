use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

const PREFLIGHT_MAX_AGE_SECS: u64 = 86400;

/// CORS for the browser UI. Credentials are allowed so the session cookie
/// travels with cross-origin requests, which rules out a wildcard origin.
pub fn create_cors_layer(origins: &str) -> CorsLayer {
    let allowed_origins = parse_origins(origins);
    if allowed_origins.is_empty() {
        tracing::warn!("CORS: No valid origins configured, cross-origin requests will be refused");
    } else {
        tracing::info!("CORS: Configured with {} allowed origin(s)", allowed_origins.len());
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(PREFLIGHT_MAX_AGE_SECS))
}

fn parse_origins(origins: &str) -> Vec<HeaderValue> {
    origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) if origin != "*" => {
                tracing::debug!("CORS: Allowing origin: {}", origin);
                Some(value)
            }
            Ok(_) => {
                tracing::warn!("CORS: Wildcard origin ignored, credentials are enabled");
                None
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_cors_layer() {
        // Should not panic when creating the CORS layer
        let _layer = create_cors_layer(DEFAULT_ALLOWED_ORIGINS);
        let _empty = create_cors_layer("");
    }

    #[test]
    fn test_parse_origins_skips_blanks_and_wildcards() {
        let origins = parse_origins(" https://checkin.example.com , ,*,http://localhost:5173");
        assert_eq!(
            origins,
            vec![
                HeaderValue::from_static("https://checkin.example.com"),
                HeaderValue::from_static("http://localhost:5173"),
            ]
        );
    }

    #[test]
    fn test_invalid_origin_is_dropped() {
        assert!(parse_origins("http://bad\norigin").is_empty());
    }
}
