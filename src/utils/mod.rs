//! Utility functions and helpers.

pub mod hash;
pub mod http;

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Fill `{name}` placeholders in a URL template.
///
/// Values are percent-encoded (a space becomes `%20`), which is valid in both
/// path segments and query strings.
pub fn fill_template(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), &urlencoding::encode(value))
    })
}

static PROFILE_ID_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"[?&](?:id|pid|player_id|playerId)=([\w-]+)").unwrap(),
        Regex::new(r"/(?:player|players|profile|athlete)/([\w-]+)").unwrap(),
    ]
});

/// Extract a profile ID from a URL (`?id=123`, `/player/123`, `/profile/abc-123`).
pub fn extract_profile_id(url: &str) -> Option<String> {
    PROFILE_ID_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(url)?.get(1))
        .map(|id| id.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://example.com/path/").unwrap();
        assert_eq!(
            resolve_url(&base, "page.html"),
            "https://example.com/path/page.html"
        );
        assert_eq!(
            resolve_url(&base, "/root.html"),
            "https://example.com/root.html"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_fill_template_encodes_values() {
        assert_eq!(
            fill_template("https://x.test/leaders/{stat}", &[("stat", "pts")]),
            "https://x.test/leaders/pts"
        );
        assert_eq!(
            fill_template("https://x.test/p/{id}?season={period}", &[
                ("id", "ab 12"),
                ("period", "2024-25"),
            ]),
            "https://x.test/p/ab%2012?season=2024-25"
        );
        assert_eq!(
            fill_template("https://x.test/search?q={name}", &[("name", "O'Neal & Co/2")]),
            "https://x.test/search?q=O%27Neal%20%26%20Co%2F2"
        );
    }

    #[test]
    fn test_extract_profile_id() {
        assert_eq!(
            extract_profile_id("https://example.com/view?id=123"),
            Some("123".to_string())
        );
        assert_eq!(
            extract_profile_id("https://example.com/player/john-smith-7"),
            Some("john-smith-7".to_string())
        );
        assert_eq!(extract_profile_id("https://example.com/about"), None);
    }
}
