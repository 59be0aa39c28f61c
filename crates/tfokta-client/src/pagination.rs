//! Link-header pagination.
//!
//! Okta list endpoints return `Link: <…>; rel="next"` while more results are
//! available. The `after` query parameter of that URL is the opaque cursor.

use url::Url;

/// Query parameter carrying the page cursor.
pub const CURSOR_PARAM: &str = "after";

/// One page of a list response.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque `after` cursor of the next page.
    pub next: Option<String>,
    /// Full URL of the next page.
    pub next_url: Option<String>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.next_url.is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Find the `rel="next"` target across one or more `Link` header values.
pub fn next_link<'a, I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    values.into_iter().find_map(parse_next_link)
}

/// Parse a single `Link` header value and return the `rel="next"` target.
pub fn parse_next_link(value: &str) -> Option<String> {
    split_entries(value).into_iter().find_map(|entry| {
        let rest = entry.trim().strip_prefix('<')?;
        let end = rest.find('>')?;
        let target = rest[..end].trim();
        let is_next = rest[end + 1..].split(';').any(|param| {
            param.split_once('=').is_some_and(|(key, val)| {
                key.trim().eq_ignore_ascii_case("rel")
                    && val
                        .trim()
                        .trim_matches('"')
                        .split_whitespace()
                        .any(|rel| rel.eq_ignore_ascii_case("next"))
            })
        });
        (is_next && !target.is_empty()).then(|| target.to_string())
    })
}

/// Split on commas that sit outside `<…>`.
fn split_entries(value: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut in_target = false;
    let mut start = 0;
    for (idx, ch) in value.char_indices() {
        match ch {
            '<' => in_target = true,
            '>' => in_target = false,
            ',' if !in_target => {
                entries.push(&value[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    entries.push(&value[start..]);
    entries
}

/// The `after` cursor of a next-page URL.
pub fn cursor_from_url(next_url: &str) -> Option<String> {
    let url = Url::parse(next_url).ok()?;
    let cursor = url
        .query_pairs()
        .find(|(key, _)| key == CURSOR_PARAM)
        .map(|(_, value)| value.into_owned());
    cursor
}

/// Carry query parameters of the first request over to a next-page URL when
/// the service omitted them from the link.
pub fn preserve_query(next_url: &str, original: &[(String, String)]) -> String {
    let Ok(mut url) = Url::parse(next_url) else {
        return next_url.to_string();
    };
    let present: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
    let missing: Vec<&(String, String)> = original
        .iter()
        .filter(|(key, _)| key != CURSOR_PARAM && !present.iter().any(|p| p == key))
        .collect();
    if !missing.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in missing {
            pairs.append_pair(key, value);
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_next_link() {
        let header = r#"<https://acme.okta.com/api/v1/users?limit=200>; rel="self", <https://acme.okta.com/api/v1/users?after=00u5&limit=200>; rel="next""#;
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://acme.okta.com/api/v1/users?after=00u5&limit=200")
        );
    }

    #[test]
    fn test_next_link_across_headers() {
        let values = [
            r#"<https://acme.okta.com/api/v1/apps?limit=2>; rel="self""#,
            r#"<https://acme.okta.com/api/v1/apps?after=0oa2&limit=2>; rel="next""#,
        ];
        assert_eq!(
            next_link(values).as_deref(),
            Some("https://acme.okta.com/api/v1/apps?after=0oa2&limit=2")
        );
    }

    #[test]
    fn test_no_next() {
        assert_eq!(
            parse_next_link(r#"<https://acme.okta.com/api/v1/apps>; rel="self""#),
            None
        );
        assert_eq!(parse_next_link(""), None);
        assert_eq!(parse_next_link("garbage; rel=next"), None);
    }

    #[test]
    fn test_comma_inside_target() {
        let header = r#"<https://acme.okta.com/api/v1/users?filter=a,b&after=x>; rel=next"#;
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://acme.okta.com/api/v1/users?filter=a,b&after=x")
        );
    }

    #[test]
    fn test_cursor_from_url() {
        assert_eq!(
            cursor_from_url("https://acme.okta.com/api/v1/groups?after=00g9&limit=10").as_deref(),
            Some("00g9")
        );
        assert_eq!(cursor_from_url("https://acme.okta.com/api/v1/groups"), None);
        assert_eq!(cursor_from_url("not a url"), None);
    }

    #[test]
    fn test_preserve_query() {
        let original = vec![
            ("type".to_string(), "ACCESS_POLICY".to_string()),
            ("limit".to_string(), "20".to_string()),
            ("after".to_string(), "stale".to_string()),
        ];
        let merged = preserve_query(
            "https://acme.okta.com/api/v1/policies?after=00p2&limit=20",
            &original,
        );
        let url = Url::parse(&merged).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("type".into(), "ACCESS_POLICY".into())));
        assert!(pairs.contains(&("after".into(), "00p2".into())));
        assert_eq!(pairs.iter().filter(|(k, _)| k == "limit").count(), 1);
    }
}
