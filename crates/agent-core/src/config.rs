//! Settings Lookup
//!
//! Configuration structs are built from a key lookup rather than from the
//! process environment directly, so tests can pass a map instead.

use std::str::FromStr;

use crate::error::{AgentError, Result};

/// Read `key` and parse it; `Ok(None)` when unset or blank
pub fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AgentError::Config(format!("{key}={raw:?}: {e}"))),
        _ => Ok(None),
    }
}

/// Read `key` as a string; `None` when unset or blank
pub fn string_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

/// Lookup backed by the process environment
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
