//! Authentication utilities for API requests

/// Attach the bearer credential to an outgoing request.
///
/// Blank keys are left off entirely so local backends that need no
/// credential do not receive an empty `Authorization` header.
pub fn add_auth_headers(request: reqwest::RequestBuilder, api_key: &str) -> reqwest::RequestBuilder {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return request;
    }
    request.header("Authorization", format!("Bearer {api_key}"))
}
