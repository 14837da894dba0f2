//! Parses a connection URI of the form `driver:key=value;key=value;...` into
//! a driver name plus an ordered option table.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::string_ref::CaseInsensitive;

/// A parsed connection descriptor. Immutable once built.
#[derive(Debug, Clone)]
pub struct ConnInfo {
    driver_name: String,
    // Keyed case-insensitively; insertion order isn't semantically load
    // bearing here (unlike the original's ordered multimap) because lookups
    // are always by key, never by position.
    options: BTreeMap<String, String>,
}

impl ConnInfo {
    /// Parses `uri`. Fails with `invalid_connection_string` if there is no
    /// driver name before the first `:`.
    pub fn parse(uri: &str) -> Result<Self> {
        let Some(colon) = uri.find(':') else {
            return Err(Error::invalid_connection_string(format!(
                "'{uri}' has no driver prefix"
            )));
        };
        let driver_name = uri[..colon].trim();
        if driver_name.is_empty() {
            return Err(Error::invalid_connection_string(format!(
                "'{uri}' has an empty driver name"
            )));
        }

        let mut options = BTreeMap::new();
        for opt in uri[colon + 1..].split(';') {
            let opt = opt.trim();
            if opt.is_empty() {
                continue;
            }
            let (key, value) = match opt.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (opt, ""),
            };
            if key.is_empty() {
                return Err(Error::invalid_connection_string(format!(
                    "'{uri}' has an empty option key"
                )));
            }
            options.insert(key.to_string(), value.to_string());
        }

        Ok(ConnInfo {
            driver_name: driver_name.to_string(),
            options,
        })
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    /// True if `key` was present (case-insensitively).
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// The raw string value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| CaseInsensitive(k) == CaseInsensitive(key))
            .map(|(_, v)| v.as_str())
    }

    /// `get(key)`, falling back to `default` when absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Parses `key`'s value as an integer, falling back to `default` when
    /// absent or unparsable.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Reconstructs a `key=value;...` string excluding `@`-prefixed
    /// (edba-private) options, suitable for handing to a backend library
    /// that expects its own native connection-string syntax.
    pub fn conn_string(&self) -> String {
        self.options
            .iter()
            .filter(|(k, _)| !k.starts_with('@'))
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Like [`ConnInfo::conn_string`], but quoting each value the way
    /// PostgreSQL's `key='escaped value'` connection strings require:
    /// backslashes and single quotes are backslash-escaped.
    pub fn pgsql_conn_string(&self) -> String {
        self.options
            .iter()
            .filter(|(k, _)| !k.starts_with('@'))
            .map(|(k, v)| format!("{k}='{}'", escape_pgsql(v)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn escape_pgsql(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_driver_and_options() {
        let ci = ConnInfo::parse("sqlite3:db=test.db;@expand_conditionals=off").unwrap();
        assert_eq!(ci.driver_name(), "sqlite3");
        assert_eq!(ci.get("db"), Some("test.db"));
        assert_eq!(ci.get("DB"), Some("test.db"));
        assert_eq!(ci.get("@expand_conditionals"), Some("off"));
    }

    #[test]
    fn missing_driver_prefix_is_an_error() {
        assert!(ConnInfo::parse("no-colon-here").is_err());
    }

    #[test]
    fn conn_string_excludes_private_keys() {
        let ci = ConnInfo::parse("mysql:host=localhost;@blob=lo;user=root").unwrap();
        let s = ci.conn_string();
        assert!(s.contains("host=localhost"));
        assert!(s.contains("user=root"));
        assert!(!s.contains("@blob"));
    }

    #[test]
    fn pgsql_conn_string_escapes_quotes_and_backslashes() {
        let ci = ConnInfo::parse(r"pgsql:password=a'b\c").unwrap();
        assert_eq!(ci.pgsql_conn_string(), r"password='a\'b\\c'");
    }

    #[test]
    fn get_or_and_get_int_fall_back() {
        let ci = ConnInfo::parse("sqlite3:pool_size=4").unwrap();
        assert_eq!(ci.get_or("missing", "fallback"), "fallback");
        assert_eq!(ci.get_int("pool_size", 1), 4);
        assert_eq!(ci.get_int("missing", 1), 1);
    }
}
