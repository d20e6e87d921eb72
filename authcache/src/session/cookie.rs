use async_trait::async_trait;
use axum::http::{header::SET_COOKIE, HeaderMap};
use axum::response::IntoResponse;
use axum_extra::extract::cookie::{Cookie, CookieJar, Key, SignedCookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{Map, Value};

use super::{SessionBag, SessionConfig, SessionStore};
use crate::error::{Error, Result};

/// Session store that keeps each bag in one HMAC-signed cookie.
///
/// The cookie value is the base64url-encoded JSON object of the bag, so the
/// browser holds the whole session and the server keeps nothing.
#[derive(Clone)]
pub struct CookieSessionStore {
    key: Key,
    config: SessionConfig,
}

impl CookieSessionStore {
    /// Create a store from configuration, deriving the signing key.
    pub fn new(config: &SessionConfig) -> Result<Self> {
        Ok(Self {
            key: config.key()?,
            config: config.clone(),
        })
    }

    /// Create a store with an explicit key.
    pub fn with_key(key: Key, config: SessionConfig) -> Self {
        Self { key, config }
    }

    fn build_cookie(&self, bag: &SessionBag) -> Result<Cookie<'static>> {
        let json = serde_json::to_vec(bag.values())
            .map_err(|e| Error::Session(format!("Failed to encode session bag: {e}")))?;

        let mut cookie = Cookie::build((bag.name().to_string(), URL_SAFE_NO_PAD.encode(json)))
            .path(self.config.path.clone())
            .secure(self.config.secure)
            .http_only(self.config.http_only)
            .same_site(self.config.same_site());

        if self.config.max_age_secs > 0 {
            let secs = i64::try_from(self.config.max_age_secs).unwrap_or(i64::MAX);
            cookie = cookie.max_age(time::Duration::seconds(secs));
        }
        if let Some(domain) = &self.config.domain {
            cookie = cookie.domain(domain.clone());
        }

        Ok(cookie.build())
    }
}

fn decode_values(raw: &str) -> Result<Map<String, Value>> {
    let bytes = URL_SAFE_NO_PAD
        .decode(raw)
        .map_err(|e| Error::Session(format!("Failed to decode session cookie: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::Session(format!("Failed to parse session cookie: {e}")))
}

#[async_trait]
impl SessionStore for CookieSessionStore {
    async fn load(&self, headers: &HeaderMap, name: &str) -> Result<SessionBag> {
        let jar = SignedCookieJar::from_headers(headers, self.key.clone());

        match jar.get(name) {
            Some(cookie) => Ok(SessionBag::from_values(name, decode_values(cookie.value())?)),
            None => {
                // Present but unsigned or signed with another key
                if CookieJar::from_headers(headers).get(name).is_some() {
                    return Err(Error::Session(format!(
                        "session cookie {name} failed signature verification"
                    )));
                }
                Ok(SessionBag::new(name))
            }
        }
    }

    async fn save(&self, bag: &SessionBag, headers: &mut HeaderMap) -> Result<()> {
        let jar = SignedCookieJar::new(self.key.clone()).add(self.build_cookie(bag)?);

        let rendered = jar.into_response();
        for value in rendered.headers().get_all(SET_COOKIE) {
            headers.append(SET_COOKIE, value.clone());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::echo_cookies;
    use axum::http::header::COOKIE;
    use axum::http::HeaderValue;

    fn store() -> CookieSessionStore {
        CookieSessionStore::with_key(
            Key::generate(),
            SessionConfig {
                secure: false,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_missing_cookie_yields_new_bag() {
        let bag = store().load(&HeaderMap::new(), "authcache_github").await.unwrap();
        assert!(bag.is_new());
        assert!(bag.session_id().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let store = store();
        let mut bag = SessionBag::new("authcache_github");
        bag.set_session_id("5d0c6a4e-1d1f-4e0e-9a55-0c3e2d7a1b11");
        bag.insert("theme", "dark");

        let mut response_headers = HeaderMap::new();
        store.save(&bag, &mut response_headers).await.unwrap();

        let set_cookie = response_headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.starts_with("authcache_github="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("Path=/"));

        let loaded = store
            .load(&echo_cookies(&response_headers), "authcache_github")
            .await
            .unwrap();
        assert!(!loaded.is_new());
        assert_eq!(loaded.session_id(), bag.session_id());
        assert_eq!(loaded.get_str("theme"), Some("dark"));
    }

    #[tokio::test]
    async fn test_cookie_signed_with_other_key_rejected() {
        let mut bag = SessionBag::new("authcache_github");
        bag.set_session_id("abc");
        let mut response_headers = HeaderMap::new();
        store().save(&bag, &mut response_headers).await.unwrap();

        let result = store()
            .load(&echo_cookies(&response_headers), "authcache_github")
            .await;
        assert!(matches!(result, Err(Error::Session(_))));
    }

    #[tokio::test]
    async fn test_unsigned_cookie_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("authcache_github=forged"));
        let result = store().load(&headers, "authcache_github").await;
        assert!(matches!(result, Err(Error::Session(_))));
    }

    #[tokio::test]
    async fn test_other_cookie_names_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("unrelated=1"));
        let bag = store().load(&headers, "authcache_github").await.unwrap();
        assert!(bag.is_new());
    }

    #[tokio::test]
    async fn test_huge_max_age_stays_positive() {
        let store = CookieSessionStore::with_key(
            Key::generate(),
            SessionConfig {
                max_age_secs: u64::MAX,
                ..Default::default()
            },
        );
        let mut headers = HeaderMap::new();
        store
            .save(&SessionBag::new("s"), &mut headers)
            .await
            .unwrap();
        let set_cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.contains(&format!("Max-Age={}", i64::MAX)));
    }

    #[tokio::test]
    async fn test_session_cookie_without_max_age() {
        let store = CookieSessionStore::with_key(
            Key::generate(),
            SessionConfig {
                max_age_secs: 0,
                domain: Some("example.com".to_string()),
                ..Default::default()
            },
        );
        let mut headers = HeaderMap::new();
        store
            .save(&SessionBag::new("s"), &mut headers)
            .await
            .unwrap();
        let set_cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(!set_cookie.contains("Max-Age"));
        assert!(set_cookie.contains("Domain=example.com"));
        assert!(set_cookie.contains("Secure"));
    }
}
