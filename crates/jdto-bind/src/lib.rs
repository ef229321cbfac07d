//! # jdto-bind — Structural JSON Binding Engine
//!
//! Converts between native Rust values and `serde_json::Value` documents
//! using one declarative [`Schema`] per type instead of hand-written parse
//! and render code.
//!
//! ## Architecture
//!
//! ```text
//! document ─▶ Schema ─▶ FieldSpec ─▶ Codec ─▶ ValidatorChain ─▶ staged assignment
//!                │                     │
//!                │                     ├── primitive / container / scalar
//!                │                     ├── ObjectCodec (nested Schema)
//!                │                     ├── InsideArrayCodec (positional InsideArray)
//!                │                     ├── TaggedCodec (TaggedUnion)
//!                │                     └── CustomCodec / MappedCodec
//!                └── PathAccumulator: every failure, with its path
//! ```
//!
//! ## Key Design Principles
//!
//! 1. **Codecs are resolved once.** Building a schema looks up each field's
//!    codec in the [`CodecRegistry`]; reads and writes dispatch through the
//!    stored trait objects.
//!
//! 2. **Reads report everything.** Failures are recorded against their path
//!    and traversal continues; one read returns the complete ordered list.
//!    A failed read never yields a partially populated value.
//!
//! 3. **Schemas are immutable and shared.** [`Schema`], [`TaggedUnion`] and
//!    [`CodecRegistry`] are `Send + Sync` once built and can serve any
//!    number of threads.
//!
//! ## Example
//!
//! ```
//! use jdto_bind::{non_negative, FieldSpec, Schema};
//! use serde_json::json;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Point { x: i32, y: i32 }
//!
//! let schema = Schema::builder("Point")
//!     .mandatory("x", |p: &Point| &p.x, |p: &mut Point, v| p.x = v)
//!     .field(FieldSpec::mandatory("y", |p: &Point| &p.y, |p: &mut Point, v| p.y = v)
//!         .validator(non_negative()))
//!     .build()?;
//!
//! let p = schema.read(&json!({"x": 3, "y": 4}))?;
//! assert_eq!(p, Point { x: 3, y: 4 });
//!
//! let err = schema.read(&json!({"x": 3, "y": -1})).unwrap_err();
//! assert_eq!(err.paths(), vec![".y"]);
//! # Ok::<(), jdto_core::JdtoError>(())
//! ```
//!
//! ## Crate Policy
//!
//! - Depends only on `jdto-core` among internal crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - Logging goes through `tracing`; the crate never installs a subscriber.

pub mod codec;
pub mod container;
pub mod object;
pub mod positional;
pub mod primitive;
pub mod registry;
pub mod scalar;
pub mod tagged;
pub mod text;
pub mod validate;

// Re-export primary types for ergonomic imports.
pub use codec::{Codable, Codec, CustomCodec, Handle, MappedCodec, SharedCodec};
pub use container::{BoxCodec, MapCodec, OptionalCodec, SequenceCodec};
pub use object::{Assignment, Dto, FieldSpec, ObjectCodec, Schema, SchemaBuilder, SchemaRef};
pub use positional::{ArrayMember, InsideArray, InsideArrayBuilder, InsideArrayCodec};
pub use primitive::{BoolCodec, F32Codec, F64Codec, IntegerCodec, RawCodec, StringCodec};
pub use registry::{global, CodecRegistry, RegistryBuilder};
pub use scalar::{TimestampCodec, UuidCodec};
pub use tagged::{deferred_schema, Polymorphic, TaggedCodec, TaggedUnion, TaggedUnionBuilder, UnionRef};
pub use text::{from_json, from_json_into, from_reader, from_value, to_json, to_json_pretty, to_value, to_writer};
pub use validate::{each, if_present, max_len, min_max, non_empty, non_negative, one_of, Validator, ValidatorChain};
