use std::sync::LazyLock;

use regex::Regex;

/// Scheme, host (DNS name, localhost, IPv4-shaped or IPv6-shaped), optional
/// port, optional path or query. Octets and hex groups are not range checked.
/// The path class also excludes the U+001C..U+001F separators, which count as
/// whitespace for `str::isspace`-style checks but not for `\s`.
/// `\n?` mirrors an end anchor that also matches before one trailing newline.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:http|ftp)s?://",
        r"(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+(?:[A-Z]{2,6}\.?|[A-Z0-9-]{2,}\.?)",
        r"|localhost",
        r"|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}",
        r"|\[?[A-F0-9]*:[A-F0-9:]+\]?)",
        r"(?::\d+)?",
        r"(?:/?|[/?][^\s\x1C-\x1F]+)\n?\z",
    ))
    .expect("URL pattern is a valid regex")
});

/// Returns true if `text` has the shape of an http, https, ftp or ftps URL.
///
/// This is a syntactic check only: the host is never resolved and values such
/// as `http://999.999.999.999` are accepted.
pub fn is_valid_url(text: &str) -> bool {
    URL_PATTERN.is_match(text)
}
