//! Client configuration and the signed-in identity.
//!
//! Endpoints are fixed at compile time through environment variables, with
//! a runtime `?api=<url>` query override for pointing a build at another
//! backend. The identity is whatever the login page left in localStorage.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use bazaar_common::chat::POLL_INTERVAL_SECS;
use bazaar_common::ids::UserId;

const DEFAULT_API_URL: &str = "http://localhost:4000";
const DEFAULT_GEO_URL: &str = "https://bdapis.com/api/v1.2";

/// localStorage key holding the signed-in user's id.
pub const USER_ID_KEY: &str = "bazaar_user_id";
/// localStorage key holding the bearer token.
pub const TOKEN_KEY: &str = "bazaar_token";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_url: String,
    pub geo_url: String,
    pub poll_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            geo_url: DEFAULT_GEO_URL.to_string(),
            poll_secs: POLL_INTERVAL_SECS,
        }
    }
}

impl ClientConfig {
    /// Compile-time settings, then the `?api=` override if present.
    pub fn from_env() -> Self {
        let mut config = Self::from_values(
            option_env!("BAZAAR_API_URL"),
            option_env!("BAZAAR_GEO_URL"),
            option_env!("BAZAAR_POLL_SECS"),
        );
        if let Some(api) = query_param("api") {
            tracing::info!(api = %api, "api url overridden by query string");
            config.api_url = api;
        }
        config
    }

    fn from_values(api: Option<&str>, geo: Option<&str>, poll_secs: Option<&str>) -> Self {
        let defaults = Self::default();
        let poll_secs = match poll_secs.map(str::parse::<u64>) {
            Some(Ok(secs)) if secs > 0 => secs,
            Some(_) => {
                tracing::warn!("ignoring invalid BAZAAR_POLL_SECS");
                defaults.poll_secs
            }
            None => defaults.poll_secs,
        };
        Self {
            api_url: trim_url(api).unwrap_or(defaults.api_url),
            geo_url: trim_url(geo).unwrap_or(defaults.geo_url),
            poll_secs,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }
}

fn trim_url(url: Option<&str>) -> Option<String> {
    url.map(|u| u.trim().trim_end_matches('/'))
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}

/// Who is signed in, as read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub user_id: UserId,
    pub token: Option<String>,
}

impl Identity {
    /// `None` when nobody is signed in or storage is unavailable.
    pub fn from_storage() -> Option<Self> {
        Self::from_values(read_storage(USER_ID_KEY), read_storage(TOKEN_KEY))
    }

    fn from_values(user_id: Option<String>, token: Option<String>) -> Option<Self> {
        let user_id = user_id.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())?;
        Some(Self {
            user_id: UserId::new(user_id),
            token: token.filter(|t| !t.is_empty()),
        })
    }
}

#[cfg(target_family = "wasm")]
fn query_param(name: &str) -> Option<String> {
    let search = web_sys::window()?.location().search().ok()?;
    web_sys::UrlSearchParams::new_with_str(&search).ok()?.get(name)
}

#[cfg(not(target_family = "wasm"))]
fn query_param(_name: &str) -> Option<String> {
    None
}

#[cfg(target_family = "wasm")]
fn read_storage(key: &str) -> Option<String> {
    web_sys::window()?
        .local_storage()
        .ok()??
        .get_item(key)
        .ok()?
}

#[cfg(not(target_family = "wasm"))]
fn read_storage(key: &str) -> Option<String> {
    let var = key.to_uppercase();
    std::env::var(var).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let config = ClientConfig::from_values(None, None, None);
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn urls_lose_trailing_slash() {
        let config = ClientConfig::from_values(Some("https://api.example.com/"), Some("  "), Some("3"));
        assert_eq!(config.api_url, "https://api.example.com");
        assert_eq!(config.geo_url, DEFAULT_GEO_URL);
        assert_eq!(config.poll_secs, 3);
    }

    #[test]
    fn bad_poll_interval_falls_back() {
        assert_eq!(ClientConfig::from_values(None, None, Some("0")).poll_secs, 5);
        assert_eq!(ClientConfig::from_values(None, None, Some("soon")).poll_secs, 5);
    }

    #[test]
    fn identity_requires_user_id() {
        assert_eq!(Identity::from_values(None, Some("t".into())), None);
        assert_eq!(Identity::from_values(Some(" ".into()), None), None);

        let id = Identity::from_values(Some("u1".into()), Some(String::new())).unwrap();
        assert_eq!(id.user_id, UserId::new("u1"));
        assert_eq!(id.token, None);
    }
}
