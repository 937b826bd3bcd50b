//! Application id → launcher name.
//!
//! `org.mozilla.firefox` becomes `firefox`, `com.example.Über_App` becomes
//! `uber_app`, and an id with no usable characters gets a stable
//! `app-<8 hex>` name derived from its SHA-256, so every id maps to exactly
//! one legal name without a registry.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::error::{FplaunchError, Result};

/// Longest launcher name the sanitizer emits.
pub const MAX_NAME_LEN: usize = 100;

/// A filesystem-legal launcher name: `[a-z0-9_-]{1,100}`, no leading or
/// trailing hyphen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LauncherName(String);

impl LauncherName {
    /// Validate an existing name without transforming it.
    pub fn parse(name: &str) -> Result<Self> {
        if is_valid_name(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(FplaunchError::InvalidName(name.to_string()))
        }
    }

    /// Derive the launcher name for an (untrusted) application id.
    pub fn sanitize(app_id: &str) -> Self {
        let last = app_id.rsplit('.').next().unwrap_or(app_id);
        let ascii = deunicode::deunicode(last).to_lowercase();

        let mut out = String::with_capacity(ascii.len());
        for c in ascii.chars() {
            let mapped = if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
                c
            } else {
                '-'
            };
            if mapped == '-' && out.ends_with('-') {
                continue;
            }
            out.push(mapped);
        }

        let mut name = trim_non_alnum(&out).to_string();
        if name.len() > MAX_NAME_LEN {
            name.truncate(MAX_NAME_LEN);
            name = trim_non_alnum(&name).to_string();
        }

        if name.is_empty() {
            return Self(hashed_name(app_id));
        }
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LauncherName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LauncherName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
        && !name.starts_with('-')
        && !name.ends_with('-')
}

fn trim_non_alnum(s: &str) -> &str {
    s.trim_matches(|c: char| !c.is_ascii_alphanumeric())
}

fn hashed_name(app_id: &str) -> String {
    let digest = Sha256::digest(app_id.as_bytes());
    let hex: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
    format!("app-{}", hex)
}
