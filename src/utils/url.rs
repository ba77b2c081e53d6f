//! URL helpers for endpoint construction and image arguments.

/// Join a base URL and an endpoint path with exactly one slash between them.
///
/// # Examples
///
/// ```
/// use parley::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://openrouter.ai/api/v1/", "/chat/completions"),
///     "https://openrouter.ai/api/v1/chat/completions"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    format!("{base}/{endpoint}")
}

/// Whether an image argument can be forwarded as-is rather than read from disk.
pub fn is_remote_image_reference(value: &str) -> bool {
    let lower = value.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("data:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_api_url_collapses_slashes() {
        assert_eq!(
            construct_api_url("https://api.example.com/v1", "models"),
            "https://api.example.com/v1/models"
        );
        assert_eq!(
            construct_api_url("https://api.example.com/v1///", "//chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn remote_image_references_are_detected() {
        assert!(is_remote_image_reference("https://example.com/a.png"));
        assert!(is_remote_image_reference("HTTP://example.com/a.png"));
        assert!(is_remote_image_reference("data:image/png;base64,AAAA"));
        assert!(!is_remote_image_reference("./photos/a.png"));
        assert!(!is_remote_image_reference("/tmp/https.png"));
    }
}
