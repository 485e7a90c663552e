//! Credential cookies that outlive one process.
//!
//! Login and refresh leave their tokens in the client's cookie jar. A CLI
//! runs one command per process, so the jar is captured after each command
//! and restored into the next client.

use std::collections::HashSet;

use reqwest::cookie::{CookieStore, Jar};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth_backend::REFRESH_PATH;

/// One `name=value` pair and the URL it was sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCookie {
    pub url: String,
    pub pair: String,
}

/// Cookies captured from a jar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCookies {
    #[serde(default)]
    pub cookies: Vec<SavedCookie>,
}

impl SavedCookies {
    /// Capture what `jar` would send to the API root and to the refresh
    /// endpoint, which may hold a narrower-path refresh cookie.
    pub fn capture(jar: &Jar, base_url: &Url) -> Self {
        let mut urls = vec![base_url.clone()];
        if let Ok(refresh) = base_url.join(REFRESH_PATH) {
            urls.push(refresh);
        }

        let mut seen = HashSet::new();
        let mut cookies = Vec::new();
        for url in urls {
            let Some(header) = jar.cookies(&url) else {
                continue;
            };
            let Ok(header) = header.to_str() else {
                continue;
            };
            for pair in header.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                if seen.insert(pair.to_string()) {
                    cookies.push(SavedCookie {
                        url: url.to_string(),
                        pair: pair.to_string(),
                    });
                }
            }
        }

        Self { cookies }
    }

    /// Put the captured cookies back into `jar`.
    pub fn restore_into(&self, jar: &Jar) {
        for cookie in &self.cookies {
            match Url::parse(&cookie.url) {
                Ok(url) => jar.add_cookie_str(&cookie.pair, &url),
                Err(e) => tracing::debug!(url = %cookie.url, error = %e, "Skipping saved cookie"),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}
