//! Navigation fragment parsing.

use std::collections::BTreeMap;

/// Query parameters of a fragment, decoded.
pub type Params = BTreeMap<String, String>;

/// Path used when the fragment is empty.
pub const DEFAULT_PATH: &str = "dashboard";

/// A parsed fragment: `#expenses?category=food` becomes path `expenses`
/// with one parameter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub params: Params,
}

/// Parses a navigation fragment. Never fails.
///
/// - A leading `#`, surrounding `/` and whitespace are ignored.
/// - An empty path resolves to `default_path`.
/// - Pairs are split on `&`; a pair without `=` maps to an empty value; a
///   repeated key keeps its last value.
/// - Keys and values are percent-decoded best effort (see [`percent_decode`]).
///   The path is taken verbatim.
pub fn parse_fragment(fragment: &str, default_path: &str) -> Route {
    let fragment = fragment.trim();
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);

    let (path, query) = match fragment.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (fragment, None),
    };

    let path = path.trim().trim_matches('/');
    let path = if path.is_empty() { default_path } else { path };

    let params = query
        .into_iter()
        .flat_map(|query| query.split('&'))
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (percent_decode(key), percent_decode(value)),
            None => (percent_decode(pair), String::new()),
        })
        .collect();

    Route {
        path: path.to_string(),
        params,
    }
}

/// Decodes `%XX` escapes.
///
/// An escape that is not followed by two hex digits is kept literally and
/// byte sequences that are not valid UTF-8 are replaced with U+FFFD. `+` is
/// not treated as a space.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let Some(byte) = bytes
                .get(i + 1..i + 3)
                .filter(|hex| hex.iter().all(u8::is_ascii_hexdigit))
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
        {
            out.push(byte);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn empty_fragment_uses_default_path() {
        for fragment in ["", "#", "#/", "  ", "#?"] {
            let route = parse_fragment(fragment, DEFAULT_PATH);
            assert_eq!(route.path, DEFAULT_PATH, "fragment {fragment:?}");
            assert!(route.params.is_empty());
        }
    }

    #[test]
    fn strips_hash_and_slashes() {
        assert_eq!(parse_fragment("#/settings/", DEFAULT_PATH).path, "settings");
        assert_eq!(parse_fragment("stats", DEFAULT_PATH).path, "stats");
    }

    #[test]
    fn parses_query_pairs() {
        let route = parse_fragment("#expenses?category=food&sort=amount-desc", DEFAULT_PATH);
        assert_eq!(route.path, "expenses");
        assert_eq!(
            route.params,
            params(&[("category", "food"), ("sort", "amount-desc")])
        );
    }

    #[test]
    fn tolerates_malformed_pairs() {
        let route = parse_fragment("expenses?flag&&=x&a=1=2&a=3", DEFAULT_PATH);
        assert_eq!(
            route.params,
            params(&[("flag", ""), ("", "x"), ("a", "3")])
        );
    }

    #[test]
    fn query_without_path_uses_default() {
        let route = parse_fragment("#?q=x", "home");
        assert_eq!(route.path, "home");
        assert_eq!(route.params, params(&[("q", "x")]));
    }

    #[test]
    fn percent_decoding_is_best_effort() {
        assert_eq!(percent_decode("caff%C3%A8%20latte"), "caffè latte");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz%4"), "%zz%4");
        assert_eq!(percent_decode("a+b"), "a+b");
        assert_eq!(percent_decode("%FF"), "\u{FFFD}");
        assert_eq!(percent_decode("a%+1b"), "a%+1b");
        assert_eq!(percent_decode("%-1"), "%-1");
        let route = parse_fragment("expenses?q=%+5", DEFAULT_PATH);
        assert_eq!(route.params, params(&[("q", "%+5")]));
    }
}
