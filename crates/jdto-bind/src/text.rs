//! # Text and Stream Helpers
//!
//! Entry points that pair the binding engine with serde_json's parser and
//! printer. Every [`Codable`] type works at the top level, including
//! sequences (`Vec<Order>`) and maps. Codecs come from the global
//! [`CodecRegistry`](crate::CodecRegistry).

use std::io::{Read, Write};

use jdto_core::{JdtoError, PathAccumulator, ReadError, WriteError};
use serde_json::Value;

use crate::codec::Codable;
use crate::object::Dto;
use crate::registry;

/// Read a `T` from a parsed document. The nesting limit is taken from the
/// binding behind `T` when it has one, and is the default otherwise.
pub fn from_value<T: Codable>(node: &Value) -> Result<T, ReadError> {
    let codec = registry::global().codec_for::<T>();
    let mut acc = match codec.depth_limit() {
        Some(max_depth) => PathAccumulator::with_max_depth(max_depth),
        None => PathAccumulator::new(),
    };
    match codec.read(node, &mut acc) {
        Ok(value) if !acc.has_errors() => Ok(value),
        _ => {
            tracing::trace!(
                target_type = std::any::type_name::<T>(),
                errors = acc.error_count(),
                "read failed"
            );
            Err(acc.into_read_error())
        }
    }
}

/// Render `value` as a document.
pub fn to_value<T: Codable>(value: &T) -> Result<Value, WriteError> {
    registry::global().codec_for::<T>().write(value)
}

/// Parse `text` and read a `T` from it.
pub fn from_json<T: Codable>(text: &str) -> Result<T, JdtoError> {
    let node: Value = serde_json::from_str(text)?;
    Ok(from_value(&node)?)
}

/// Parse `text` and read it into `target`. On failure `target` is left
/// unchanged.
pub fn from_json_into<T: Dto>(text: &str, target: &mut T) -> Result<(), JdtoError> {
    let node: Value = serde_json::from_str(text)?;
    T::schema().read_into(&node, target)?;
    Ok(())
}

/// Render `value` as compact JSON text.
pub fn to_json<T: Codable>(value: &T) -> Result<String, JdtoError> {
    let node = to_value(value)?;
    Ok(serde_json::to_string(&node)?)
}

/// Render `value` as indented JSON text.
pub fn to_json_pretty<T: Codable>(value: &T) -> Result<String, JdtoError> {
    let node = to_value(value)?;
    Ok(serde_json::to_string_pretty(&node)?)
}

/// Parse a document from `reader` and read a `T` from it.
pub fn from_reader<T: Codable, R: Read>(reader: R) -> Result<T, JdtoError> {
    let node: Value = serde_json::from_reader(reader)?;
    Ok(from_value(&node)?)
}

/// Render `value` as compact JSON into `writer`.
pub fn to_writer<T: Codable, W: Write>(writer: W, value: &T) -> Result<(), JdtoError> {
    let node = to_value(value)?;
    serde_json::to_writer(writer, &node)?;
    Ok(())
}
