use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use std::fmt;

/// Name of the cookie CouchDB issues from `POST /_session`
pub const AUTH_SESSION_COOKIE: &str = "AuthSession";

/// Date layouts seen in the `Expires` attribute
const COOKIE_DATE_FORMATS: [&str; 2] = ["%a, %d-%b-%Y %H:%M:%S GMT", "%a, %d %b %Y %H:%M:%S GMT"];

/// Session token held by a cookie-authenticated connection
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub value: String,
    /// `None` when the server issued a non-persistent cookie
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("value", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl SessionToken {
    /// Parse a `Set-Cookie` header value. Returns `None` for other cookies and
    /// for the empty cookie CouchDB sends on logout.
    pub fn from_set_cookie(header: &str, now: DateTime<Utc>) -> Option<Self> {
        let mut attributes = header.split(';').map(str::trim);
        let (name, value) = attributes.next()?.split_once('=')?;
        if name != AUTH_SESSION_COOKIE || value.is_empty() {
            return None;
        }

        let mut max_age = None;
        let mut expires = None;
        for attribute in attributes {
            let (key, val) = attribute.split_once('=').unwrap_or((attribute, ""));
            match key.to_ascii_lowercase().as_str() {
                "max-age" => max_age = val.parse::<i64>().ok(),
                "expires" => expires = parse_cookie_date(val),
                _ => {}
            }
        }

        // Max-Age takes precedence over Expires (RFC 6265 5.3)
        let expires_at = max_age
            .and_then(TimeDelta::try_seconds)
            .map(|ttl| now + ttl)
            .or(expires);

        Some(Self {
            value: value.to_string(),
            expires_at,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Value for the `Cookie` request header
    pub fn cookie_header(&self) -> String {
        format!("{}={}", AUTH_SESSION_COOKIE, self.value)
    }
}

fn parse_cookie_date(value: &str) -> Option<DateTime<Utc>> {
    COOKIE_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}
