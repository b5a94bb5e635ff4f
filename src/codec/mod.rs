//! Codec Module
//!
//! Converts typed values to and from the UTF-8 JSON bytes kept in the cache.
//!
//! The default [`FieldNaming::Preserve`] writes keys exactly as serde names
//! them, so value types choose their wire names with
//! `#[serde(rename_all = "camelCase")]`. [`FieldNaming::CamelCase`] rewrites
//! every object key instead, and refuses to encode a value with a key the
//! rewrite could not restore (map keys that are not snake_case, enum tags,
//! already renamed fields).

mod naming;


use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{CacheError, Result};

pub use naming::{to_camel_case, to_snake_case, FieldNaming};

// == Json Codec ==
/// Stateless JSON codec with a field-naming policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec {
    naming: FieldNaming,
}

impl JsonCodec {
    // == Constructor ==
    /// Creates a codec with the given naming policy.
    pub fn new(naming: FieldNaming) -> Self {
        Self { naming }
    }

    /// Returns the naming policy.
    pub fn naming(&self) -> FieldNaming {
        self.naming
    }

    // == Encode ==
    /// Encodes `value` as UTF-8 JSON.
    ///
    /// A value that encodes to nothing or to `null` is rejected so that an
    /// absent value is never cached. Under camelCase naming, a value whose
    /// keys would not decode back unchanged is rejected too.
    pub fn encode<T>(&self, value: &T) -> Result<Vec<u8>>
    where
        T: Serialize + ?Sized,
    {
        let bytes = match self.naming {
            FieldNaming::Preserve => serde_json::to_vec(value)?,
            FieldNaming::CamelCase => {
                let tree = serde_json::to_value(value)?;
                if let Some(key) = naming::first_irreversible_key(&tree) {
                    return Err(CacheError::Serialization(format!(
                        "object key '{}' cannot be stored under camelCase naming; \
                         use FieldNaming::Preserve for this value",
                        key
                    )));
                }
                serde_json::to_vec(&naming::rewrite_keys(tree, &to_camel_case))?
            }
        };

        if bytes.is_empty() || bytes.as_slice() == b"null" {
            return Err(CacheError::Serialization(
                "value encoded to an empty or null payload".to_string(),
            ));
        }

        Ok(bytes)
    }

    // == Decode ==
    /// Decodes a payload produced by [`JsonCodec::encode`].
    ///
    /// Trailing commas before `}` and `]` are tolerated.
    pub fn decode<T>(&self, bytes: &[u8]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let cleaned = strip_trailing_commas(bytes);
        let value = match self.naming {
            FieldNaming::Preserve => serde_json::from_slice(&cleaned)?,
            FieldNaming::CamelCase => {
                let tree: Value = serde_json::from_slice(&cleaned)?;
                serde_json::from_value(naming::rewrite_keys(tree, &to_snake_case))?
            }
        };
        Ok(value)
    }
}

// == Trailing Commas ==
/// Removes commas that directly precede a closing `}` or `]`.
///
/// Commas inside strings are untouched. A comma right after an opening
/// bracket or another comma is kept so the parser still reports it.
fn strip_trailing_commas(input: &[u8]) -> Cow<'_, [u8]> {
    let mut out: Option<Vec<u8>> = None;
    let mut in_string = false;
    let mut escaped = false;
    let mut last_significant = 0u8;

    for (i, &byte) in input.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
        } else if byte == b'"' {
            in_string = true;
        } else if byte == b',' && !matches!(last_significant, b'[' | b'{' | b',' | 0) {
            let closes = input[i + 1..]
                .iter()
                .find(|b| !b.is_ascii_whitespace())
                .is_some_and(|&b| b == b'}' || b == b']');
            if closes {
                out.get_or_insert_with(|| input[..i].to_vec());
                continue;
            }
        }

        if !byte.is_ascii_whitespace() {
            last_significant = byte;
        }
        if let Some(buf) = out.as_mut() {
            buf.push(byte);
        }
    }

    match out {
        Some(buf) => Cow::Owned(buf),
        None => Cow::Borrowed(input),
    }
}
