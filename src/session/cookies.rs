//! Cookie values as seen by the proxy.
//!
//! # Responsibilities
//! - Parse `Cookie` request headers into an ordered cookie list
//! - Parse `Set-Cookie` response headers into the cookies a backend declares
//! - Tell cookies a backend issues apart from ones it deletes
//! - Render a `CookieSet` back into a single `Cookie` header value
//!
//! # Design Decisions
//! - Only name and value are kept; attributes (Path, Expires, ...) are dropped
//!   once `Max-Age` and `Expires` have been checked for expiry
//! - Request-side parsing keeps duplicates and order so the session identifier
//!   can apply "first occurrence wins"
//! - A `CookieSet` is keyed by name; later inserts overwrite earlier ones

use std::collections::BTreeMap;

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};

/// A single (name, value) cookie pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Mapping from cookie name to value. Names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieSet {
    inner: BTreeMap<String, String>,
}

impl CookieSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a cookie.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Overwrite entries in `self` with every entry of `other`.
    pub fn merge(&mut self, other: CookieSet) {
        self.inner.extend(other.inner);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render as a `Cookie` request header value (`a=1; b=2`).
    ///
    /// Pairs that cannot appear in a header are skipped with a warning.
    /// Returns `None` when nothing is left to send.
    pub fn to_header_value(&self) -> Option<HeaderValue> {
        let pairs: Vec<String> = self
            .inner
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .filter(|pair| {
                let valid = HeaderValue::from_str(pair).is_ok() && !pair.contains(';');
                if !valid {
                    tracing::warn!(
                        cookie = %pair.escape_debug(),
                        "Skipping cookie not valid in a header"
                    );
                }
                valid
            })
            .collect();
        if pairs.is_empty() {
            return None;
        }
        HeaderValue::from_str(&pairs.join("; ")).ok()
    }
}

impl FromIterator<Cookie> for CookieSet {
    fn from_iter<I: IntoIterator<Item = Cookie>>(iter: I) -> Self {
        let mut set = CookieSet::new();
        for cookie in iter {
            set.insert(cookie.name, cookie.value);
        }
        set
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CookieSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = CookieSet::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

impl IntoIterator for CookieSet {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

/// Cookies presented by a request, in header order, duplicates included.
pub fn request_cookies(headers: &HeaderMap) -> Vec<Cookie> {
    let mut cookies = Vec::new();
    for value in headers.get_all(header::COOKIE) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            if let Some(cookie) = parse_pair(pair) {
                cookies.push(cookie);
            }
        }
    }
    cookies
}

/// Cookies a response declares through `Set-Cookie`, in header order.
pub fn response_cookies(headers: &HeaderMap) -> Vec<Cookie> {
    set_cookie_values(headers)
        .filter_map(|value| parse_pair(value.split(';').next().unwrap_or_default()))
        .collect()
}

/// Like [`response_cookies`], without the cookies the response expires.
pub fn issued_cookies(headers: &HeaderMap) -> Vec<Cookie> {
    let now = Utc::now();
    set_cookie_values(headers)
        .filter(|value| !is_expired(value, now))
        .filter_map(|value| parse_pair(value.split(';').next().unwrap_or_default()))
        .collect()
}

fn set_cookie_values(headers: &HeaderMap) -> impl Iterator<Item = &str> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
}

/// `Max-Age` takes precedence over `Expires`, as in RFC 6265.
fn is_expired(set_cookie: &str, now: DateTime<Utc>) -> bool {
    let mut expires = None;
    for attribute in set_cookie.split(';').skip(1) {
        let Some((name, value)) = attribute.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "max-age" => {
                if let Ok(seconds) = value.parse::<i64>() {
                    return seconds <= 0;
                }
            }
            "expires" => expires = parse_expires(value),
            _ => {}
        }
    }
    expires.is_some_and(|at| at <= now)
}

fn parse_expires(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc2822(&value.replace('-', " ")))
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

fn parse_pair(pair: &str) -> Option<Cookie> {
    let (name, value) = pair.trim().split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let value = value.trim();
    // Quoted values are legal; the quotes are not part of the value.
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    Some(Cookie::new(name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(name: header::HeaderName, values: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for v in values {
            map.append(name.clone(), HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn test_request_cookies_keep_order_and_duplicates() {
        let map = headers(header::COOKIE, &["id=bob; theme=dark", "id=bill"]);
        let cookies = request_cookies(&map);
        assert_eq!(
            cookies,
            vec![
                Cookie::new("id", "bob"),
                Cookie::new("theme", "dark"),
                Cookie::new("id", "bill"),
            ]
        );
    }

    #[test]
    fn test_request_cookies_skip_malformed() {
        let map = headers(header::COOKIE, &["novalue; =x; ok=1; empty="]);
        let cookies = request_cookies(&map);
        assert_eq!(cookies, vec![Cookie::new("ok", "1"), Cookie::new("empty", "")]);
    }

    #[test]
    fn test_response_cookies_drop_attributes() {
        let map = headers(
            header::SET_COOKIE,
            &["id=bill; Path=/; HttpOnly", "server=\"test\"; Max-Age=60"],
        );
        let cookies = response_cookies(&map);
        assert_eq!(
            cookies,
            vec![Cookie::new("id", "bill"), Cookie::new("server", "test")]
        );
    }

    #[test]
    fn test_issued_cookies_skip_expired() {
        let map = headers(
            header::SET_COOKIE,
            &[
                "id=; Max-Age=0",
                "old=x; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
                "keep=1; Max-Age=60; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
                "later=2; Expires=Fri, 31 Dec 9999 23:59:59 GMT",
                "plain=3",
            ],
        );
        assert_eq!(response_cookies(&map).len(), 5);
        assert_eq!(
            issued_cookies(&map),
            vec![
                Cookie::new("keep", "1"),
                Cookie::new("later", "2"),
                Cookie::new("plain", "3"),
            ]
        );
    }

    #[test]
    fn test_cookie_set_later_insert_wins() {
        let set: CookieSet = vec![Cookie::new("a", "1"), Cookie::new("a", "2")]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("a"), Some("2"));
    }

    #[test]
    fn test_header_value_rendering() {
        let set: CookieSet = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(set.to_header_value().unwrap(), "a=1; b=2");
        assert!(CookieSet::new().to_header_value().is_none());
    }

    #[test]
    fn test_header_value_skips_invalid_pair() {
        let set: CookieSet = [("a", "1"), ("bad", "line\nbreak"), ("c", "3")]
            .into_iter()
            .collect();
        assert_eq!(set.to_header_value().unwrap(), "a=1; c=3");

        let only_bad: CookieSet = [("bad", "x\u{7f}")].into_iter().collect();
        assert!(only_bad.to_header_value().is_none());
    }

    #[test]
    fn test_merge_overwrites() {
        let mut base: CookieSet = [("server", "test"), ("ab", "x")].into_iter().collect();
        base.merge([("ab", "y"), ("new", "cookie")].into_iter().collect());
        assert_eq!(base.get("server"), Some("test"));
        assert_eq!(base.get("ab"), Some("y"));
        assert_eq!(base.get("new"), Some("cookie"));
    }
}
