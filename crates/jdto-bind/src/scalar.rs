//! # Scalar Codecs — Timestamps and Identifiers
//!
//! String-encoded scalars that DTOs commonly carry:
//!
//! - `DateTime<Utc>` as an RFC 3339 timestamp with a `Z` suffix. Offsets
//!   other than UTC are rejected instead of being silently converted.
//! - `Uuid` in its hyphenated form.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use jdto_core::{ErrorKind, Node, PathAccumulator, Recorded, WriteError};
use serde_json::Value;
use uuid::Uuid;

use crate::codec::{recorded, Codable, Codec, SharedCodec};
use crate::registry::CodecRegistry;

/// RFC 3339 UTC timestamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampCodec;

impl Codec<DateTime<Utc>> for TimestampCodec {
    fn read(&self, node: &Value, acc: &mut PathAccumulator) -> Result<DateTime<Utc>, Recorded> {
        let text = recorded(acc, node.string_value())?;
        let mismatch = || ErrorKind::type_mismatch("RFC 3339 UTC timestamp", node.node_kind());
        if !text.ends_with('Z') {
            return Err(acc.record(mismatch()));
        }
        match DateTime::parse_from_rfc3339(text) {
            Ok(ts) => Ok(ts.with_timezone(&Utc)),
            Err(_) => Err(acc.record(mismatch())),
        }
    }

    fn write(&self, value: &DateTime<Utc>) -> Result<Value, WriteError> {
        Ok(Value::make_string(
            value.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ))
    }
}

impl Codable for DateTime<Utc> {
    fn default_codec(_: &CodecRegistry) -> SharedCodec<Self> {
        Arc::new(TimestampCodec)
    }
}

/// Hyphenated UUID string.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidCodec;

impl Codec<Uuid> for UuidCodec {
    fn read(&self, node: &Value, acc: &mut PathAccumulator) -> Result<Uuid, Recorded> {
        let text = recorded(acc, node.string_value())?;
        Uuid::parse_str(text)
            .map_err(|_| acc.record(ErrorKind::type_mismatch("UUID", node.node_kind())))
    }

    fn write(&self, value: &Uuid) -> Result<Value, WriteError> {
        Ok(Value::make_string(value.to_string()))
    }
}

impl Codable for Uuid {
    fn default_codec(_: &CodecRegistry) -> SharedCodec<Self> {
        Arc::new(UuidCodec)
    }
}
