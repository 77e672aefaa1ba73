// ABOUTME: Pure normalization functions for domains, targets, and chat aliases
// ABOUTME: Leaf module with no I/O; every transformation is idempotent
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

//! Domain and target normalization
//!
//! Targets arrive in many shapes: full URLs, `Origin` header values, bare
//! domains with ports or `www.` prefixes. Everything that touches the
//! target tables goes through [`normalize_domain`] first so that lookups
//! compare canonical forms only. `normalize(normalize(x)) == normalize(x)`
//! holds for every input.

use crate::models::TargetKind;

/// Canonicalize a domain-like string.
///
/// Lowercases and trims, strips an `http://`/`https://` scheme, cuts the
/// value at the first `/` (dropping any path or trailing slash), strips a
/// `:port` suffix and stray leading dots, and removes a leading `www.`.
/// Empty input yields an empty string, which resolvers treat as a miss.
#[must_use]
pub fn normalize_domain(value: &str) -> String {
    let mut v = value.trim().to_lowercase();
    if v.is_empty() {
        return v;
    }
    if let Some(rest) = v.strip_prefix("https://") {
        v = rest.to_owned();
    } else if let Some(rest) = v.strip_prefix("http://") {
        v = rest.to_owned();
    }
    if let Some(slash) = v.find('/') {
        v.truncate(slash);
    }
    if let Some(colon) = v.find(':') {
        v.truncate(colon);
    }
    let v = v.trim_start_matches('.');
    let v = v.strip_prefix("www.").unwrap_or(v);
    v.to_owned()
}

/// Normalize one target value for the given channel type.
///
/// Web targets are canonicalized domains; other channel types carry opaque
/// identifiers and are only trimmed.
#[must_use]
pub fn normalize_target(value: &str, kind: TargetKind) -> String {
    if kind == TargetKind::Web {
        normalize_domain(value)
    } else {
        value.trim().to_owned()
    }
}

/// Merge an explicit target list with a singular fallback value, normalize
/// each entry per the channel type, drop empties, and deduplicate while
/// preserving first-seen order.
///
/// An empty result is a caller-visible validation error: every profile
/// needs at least one target.
#[must_use]
pub fn normalize_targets(
    list: Option<&[String]>,
    fallback: Option<&str>,
    kind: TargetKind,
) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    let values = list
        .unwrap_or_default()
        .iter()
        .map(String::as_str)
        .chain(fallback);
    for value in values {
        let norm = normalize_target(value, kind);
        if norm.is_empty() || !seen.insert(norm.clone()) {
            continue;
        }
        out.push(norm);
    }
    out
}

/// Sanitize a chat alias supplied in a path or payload.
///
/// Lowercases and trims, replaces path separators with `-`, and collapses
/// whitespace runs to a single `-`. The result is the storage form of the
/// profile id.
#[must_use]
pub fn sanitize_chat_id(id: &str) -> String {
    let replaced = id.trim().to_lowercase().replace(['/', '\\'], "-");
    replaced.split_whitespace().collect::<Vec<_>>().join("-")
}
