//! URL helpers for consistent endpoint construction.

/// Strip trailing slashes so appended endpoints never double up.
pub fn normalize_base_url(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

/// Join an endpoint path onto a base URL.
///
/// ```
/// use patter::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://chat.example.com/api/", "/chat/stream"),
///     "https://chat.example.com/api/chat/stream"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        normalize_base_url(base_url),
        endpoint.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_and_leading_slashes_collapse() {
        assert_eq!(
            construct_api_url("https://chat.example.com/api", "chat"),
            "https://chat.example.com/api/chat"
        );
        assert_eq!(
            construct_api_url("https://chat.example.com/api///", "///chat"),
            "https://chat.example.com/api/chat"
        );
        assert_eq!(normalize_base_url("https://chat.example.com/"), "https://chat.example.com");
    }
}
