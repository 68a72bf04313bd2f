//! Session identification strategies.

use std::fmt;

use crate::session::cookies::Cookie;

/// Opaque session identifier extracted from a request's cookies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Maps a list of cookies to a session id.
///
/// Implementations must be pure and deterministic. `None` means the request
/// is sessionless, which is a normal outcome rather than a failure.
pub trait SessionIdentifier: Send + Sync {
    fn resolve(&self, cookies: &[Cookie]) -> Option<SessionId>;
}

/// Reads the session id from the cookie with a fixed name.
///
/// When the name occurs more than once the first occurrence wins. An empty
/// value (a cleared cookie) does not identify a session.
#[derive(Debug, Clone)]
pub struct CookieNameIdentifier {
    name: String,
}

impl CookieNameIdentifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn cookie_name(&self) -> &str {
        &self.name
    }
}

impl SessionIdentifier for CookieNameIdentifier {
    fn resolve(&self, cookies: &[Cookie]) -> Option<SessionId> {
        cookies
            .iter()
            .find(|c| c.name == self.name)
            .filter(|c| !c.value.is_empty())
            .map(|c| SessionId::new(c.value.clone()))
    }
}

impl<F> SessionIdentifier for F
where
    F: Fn(&[Cookie]) -> Option<SessionId> + Send + Sync,
{
    fn resolve(&self, cookies: &[Cookie]) -> Option<SessionId> {
        self(cookies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_named_cookie() {
        let cases = vec![
            (vec![Cookie::new("key", "bob"), Cookie::new("ke", "bill")], "key", "bob"),
            (vec![Cookie::new("type", "test"), Cookie::new("id", "betty")], "id", "betty"),
            (
                vec![
                    Cookie::new("prod", "true"),
                    Cookie::new("id", "12345"),
                    Cookie::new("secret", "there isn't one"),
                ],
                "id",
                "12345",
            ),
        ];

        for (cookies, name, expected) in cases {
            let identifier = CookieNameIdentifier::new(name);
            assert_eq!(identifier.resolve(&cookies), Some(SessionId::from(expected)));
        }
    }

    #[test]
    fn test_missing_cookie_is_none() {
        let cookies = vec![Cookie::new("key", "bob"), Cookie::new("ke", "bill")];
        assert!(CookieNameIdentifier::new("id").resolve(&cookies).is_none());
        assert!(CookieNameIdentifier::new("id").resolve(&[]).is_none());
    }

    #[test]
    fn test_empty_value_is_sessionless() {
        let cookies = vec![Cookie::new("id", ""), Cookie::new("id", "later")];
        assert!(CookieNameIdentifier::new("id").resolve(&cookies).is_none());
    }

    #[test]
    fn test_first_occurrence_wins() {
        let cookies = vec![Cookie::new("id", "first"), Cookie::new("id", "second")];
        let id = CookieNameIdentifier::new("id").resolve(&cookies).unwrap();
        assert_eq!(id.as_str(), "first");
    }

    #[test]
    fn test_closure_identifier() {
        let by_prefix = |cookies: &[Cookie]| {
            cookies
                .iter()
                .find(|c| c.name.starts_with("sess_"))
                .map(|c| SessionId::new(c.value.clone()))
        };
        let cookies = vec![Cookie::new("x", "1"), Cookie::new("sess_eu", "abc")];
        assert_eq!(by_prefix.resolve(&cookies), Some(SessionId::from("abc")));
    }
}
