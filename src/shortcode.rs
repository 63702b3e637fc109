//! Shortcode extraction from Instagram Reel URLs

use crate::types::Shortcode;
use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static SHORTCODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"instagram\.com/reel/([^/?#&]+)").expect("shortcode pattern is valid")
});

#[allow(clippy::expect_used)]
static REEL_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(www\.)?instagram\.com/reel/[^\s/]+").expect("reel URL pattern is valid")
});

#[allow(clippy::expect_used)]
static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\w+").expect("hashtag pattern is valid"));

/// Extract the reel shortcode from a URL
///
/// Returns the text between `instagram.com/reel/` and the next `/`, `?`, `#`,
/// `&` or the end of the string. Returns `None` when there is no `/reel/`
/// segment or when the captured text is not a valid [`Shortcode`].
///
/// # Examples
///
/// ```
/// use reel_dl::shortcode::extract_shortcode;
///
/// let code = extract_shortcode("https://www.instagram.com/reel/ABC123/?x=1").unwrap();
/// assert_eq!(code.as_str(), "ABC123");
/// assert!(extract_shortcode("https://instagram.com/p/ABC123/").is_none());
/// ```
pub fn extract_shortcode(url: &str) -> Option<Shortcode> {
    let captures = SHORTCODE_RE.captures(url.trim())?;
    Shortcode::parse(captures.get(1)?.as_str())
}

/// Check that a URL is an http(s) Instagram Reel URL
#[must_use]
pub fn is_valid_reel_url(url: &str) -> bool {
    REEL_URL_RE.is_match(url.trim())
}

/// Collect every `#tag` in a caption, in order of appearance
pub fn extract_hashtags(caption: &str) -> Vec<String> {
    HASHTAG_RE
        .find_iter(caption)
        .map(|m| m.as_str().to_string())
        .collect()
}
