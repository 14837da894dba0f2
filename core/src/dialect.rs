//! Cross-engine SQL dialect selector.
//!
//! A fragment can either be plain SQL, returned verbatim, or an annotated
//! sequence of `~HEADER~BODY~` pairs, one of which is selected according to
//! the caller's `(engine, major, minor)` tuple. Annotated fragments always
//! start with `~` as their first non-whitespace character.
//!
//! ```text
//! ~Microsoft SQL Server/9~top_a~Microsoft SQL Server~top_b~~fallback~
//! ```
//! selects `top_a` for SQL Server 9+, `top_b` for any other SQL Server
//! version, and `fallback` for anything else.

use crate::error::{Error, Result};

struct Header<'a> {
    engine: &'a str,
    version: Option<(u32, u32)>,
}

impl<'a> Header<'a> {
    fn parse(raw: &'a str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Header {
                engine: "",
                version: None,
            };
        }
        let (engine, sep, rest) = crate::string_ref::split_first_of(raw, &['/', '.']);
        if sep.is_none() {
            return Header {
                engine,
                version: None,
            };
        }
        let (major_s, minor_s) = match rest.split_once('.') {
            Some((maj, min)) => (maj, min),
            None => (rest, ""),
        };
        let major: u32 = major_s.trim().parse().unwrap_or(0);
        let minor: u32 = if minor_s.trim().is_empty() {
            0
        } else {
            minor_s.trim().parse().unwrap_or(0)
        };
        Header {
            engine,
            version: Some((major, minor)),
        }
    }

    fn matches(&self, engine: &str, major: u32, minor: u32) -> bool {
        let engine_matches =
            self.engine.is_empty() || self.engine.eq_ignore_ascii_case(engine);
        if !engine_matches {
            return false;
        }
        match self.version {
            None => true,
            Some((req_major, req_minor)) => {
                (major, minor) >= (req_major, req_minor)
            }
        }
    }
}

/// Splits `~HEADER~BODY~HEADER~BODY~...` (the leading `~` already consumed)
/// into `(header, body)` pairs, in order.
fn annotated_pairs(body: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    let mut rest = body;
    loop {
        let Some(h_end) = rest.find('~') else {
            break;
        };
        let header = &rest[..h_end];
        let after_header = &rest[h_end + 1..];
        let Some(b_end) = after_header.find('~') else {
            break;
        };
        let body_text = &after_header[..b_end];
        pairs.push((header, body_text));
        rest = &after_header[b_end + 1..];
    }
    pairs
}

/// Selects the one variant of `fragment` that applies to `(engine, major,
/// minor)`. A fragment whose first non-space character is not `~` is
/// returned unchanged.
pub fn select_statement(fragment: &str, engine: &str, major: u32, minor: u32) -> Result<String> {
    let trimmed_start = fragment.trim_start();
    if !trimmed_start.starts_with('~') {
        return Ok(fragment.to_string());
    }
    let prefix_len = fragment.len() - trimmed_start.len();
    let prefix = &fragment[..prefix_len];
    let body = &trimmed_start[1..];

    for (header, variant) in annotated_pairs(body) {
        let h = Header::parse(header);
        if h.matches(engine, major, minor) {
            return Ok(format!("{prefix}{variant}"));
        }
    }

    Err(Error::sql_variant_not_found(format!(
        "no branch of '{fragment}' matches {engine} {major}.{minor}"
    )))
}

/// Applies [`select_statement`] to every `;`-separated fragment of a batch of
/// statements, trimming each fragment, skipping empty ones, and rejoining
/// survivors with `;\n\n`.
///
/// A fragment may carry free SQL text ahead of its first `~`; that prefix is
/// not part of the annotation and is preserved verbatim, with only the
/// `~...~` remainder run through [`select_statement`].
pub fn select_statements_in_batch(batch: &str, engine: &str, major: u32, minor: u32) -> Result<String> {
    let mut selected = Vec::new();
    for fragment in batch.split(';') {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        selected.push(select_batch_fragment(fragment, engine, major, minor)?);
    }
    Ok(selected.join(";\n\n"))
}

fn select_batch_fragment(fragment: &str, engine: &str, major: u32, minor: u32) -> Result<String> {
    match fragment.find('~') {
        Some(idx) => {
            let prefix = &fragment[..idx];
            let annotated = &fragment[idx..];
            let selected = select_statement(annotated, engine, major, minor)?;
            Ok(format!("{prefix}{selected}"))
        }
        None => Ok(fragment.to_string()),
    }
}
