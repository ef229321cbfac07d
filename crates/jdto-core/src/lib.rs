//! # jdto-core — Foundational Types for the Binding Engine
//!
//! This crate is the leaf of the jdto workspace. It defines the contracts
//! every binding operation is built on and depends on no internal crate.
//!
//! ## Key Design Principles
//!
//! 1. **One value-model contract.** The engine never touches a JSON tree
//!    except through the [`Node`] trait: kind inspection, member and child
//!    access, strict scalar extraction, and node construction. The only
//!    implementation is `serde_json::Value` (with `preserve_order`, so object
//!    keys keep their insertion order on write).
//!
//! 2. **Path-qualified errors, never early aborts.** Reads thread a
//!    [`PathAccumulator`] through every codec. Failures are recorded against
//!    the active path (`.items[3].name`) and traversal continues, so a single
//!    read reports every problem in document order.
//!
//! 3. **Setup errors are not data errors.** Programmer mistakes (duplicate
//!    field names, duplicate tags, inverted validator bounds) surface as
//!    [`SetupError`] from builders, before any document is processed.
//!
//! 4. **Configuration is data.** [`BindOptions`] deserializes from YAML or
//!    JSON and is consumed once, at schema construction time.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `jdto-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod config;
pub mod error;
pub mod node;
pub mod path;

// Re-export primary types for ergonomic imports.
pub use config::{BindOptions, DefaultWritePolicy, DiscriminatorPosition};
pub use error::{ConfigError, ErrorKind, FieldError, JdtoError, ReadError, SetupError, WriteError};
pub use node::{Node, NodeKind};
pub use path::{PathAccumulator, Recorded, Segment};
