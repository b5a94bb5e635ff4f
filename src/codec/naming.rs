//! Field Naming Module
//!
//! Rewrites JSON object keys between Rust's snake_case field names and the
//! lower camel case used on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// == Field Naming Policy ==
/// How object keys are written to the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldNaming {
    /// `user_id` is stored as `userId` and read back as `user_id`.
    ///
    /// Only for values whose object keys are all snake_case; any other key
    /// is rejected at encode time.
    CamelCase,
    /// Keys are stored exactly as serde produces them
    #[default]
    Preserve,
}

impl FieldNaming {
    /// Parses a policy name. Accepts `camel_case`, `camelCase`, `camel` and `preserve`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "camel_case" | "camelcase" | "camel" => Some(FieldNaming::CamelCase),
            "preserve" | "none" => Some(FieldNaming::Preserve),
            _ => None,
        }
    }
}

// == Key Conversions ==
/// Converts a snake_case key to lower camel case.
///
/// Leading underscores are kept, and an underscore before a digit is kept so
/// that [`to_snake_case`] restores the original key.
pub fn to_camel_case(key: &str) -> String {
    let trimmed = key.trim_start_matches('_');
    let mut out = String::with_capacity(key.len());
    out.push_str(&key[..key.len() - trimmed.len()]);

    let mut upper_next = false;
    for (i, ch) in trimmed.char_indices() {
        if ch == '_' {
            let next = trimmed[i + 1..].chars().next();
            match next {
                Some(n) if n.is_ascii_lowercase() => upper_next = true,
                _ => out.push('_'),
            }
            continue;
        }
        if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else if out.len() == key.len() - trimmed.len() {
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Converts a lower camel case key back to snake_case.
pub fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

// == Value Rewriting ==
/// Recursively rewrites the keys of every object inside `value`.
pub fn rewrite_keys(value: Value, rename: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => {
            let rewritten: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (rename(&k), rewrite_keys(v, rename)))
                .collect();
            Value::Object(rewritten)
        }
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|v| rewrite_keys(v, rename)).collect())
        }
        other => other,
    }
}

/// Returns the first object key in `value` that camelCase renaming would not
/// restore on the way back.
pub fn first_irreversible_key(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) => map.iter().find_map(|(k, v)| {
            if to_snake_case(&to_camel_case(k)) != *k {
                Some(k.as_str())
            } else {
                first_irreversible_key(v)
            }
        }),
        Value::Array(items) => items.iter().find_map(first_irreversible_key),
        _ => None,
    }
}
