//! # Codecs — Read/Write Strategies per Value Shape
//!
//! A [`Codec<T>`] reads a `T` out of a document node and renders a `T` into
//! a new node. Schemas hold one codec per field as a [`SharedCodec`], resolved
//! once when the schema is built; reads and writes then dispatch through the
//! trait object without any type inspection.
//!
//! ## Variants
//!
//! | Codec | Shape |
//! |-------|-------|
//! | primitive codecs (`primitive`) | bool, integers, floats, strings, raw JSON |
//! | [`OptionalCodec`](crate::OptionalCodec) | `Option<T>`; `null` ↔ `None` |
//! | [`SequenceCodec`](crate::SequenceCodec) | `Vec`, `VecDeque`, `BTreeSet` |
//! | [`MapCodec`](crate::MapCodec) | `BTreeMap<String, T>`, `HashMap<String, T>` |
//! | [`ObjectCodec`](crate::ObjectCodec) | nested schema-bound objects |
//! | [`InsideArrayCodec`](crate::InsideArrayCodec) | structs and tuples stored as fixed-position arrays |
//! | [`TaggedCodec`](crate::TaggedCodec) | tagged unions |
//! | [`CustomCodec`] / [`MappedCodec`] | user-supplied encodings |
//!
//! Types that know their own codec implement [`Codable`]; the
//! [`CodecRegistry`](crate::CodecRegistry) consults its overrides first and
//! falls back to [`Codable::default_codec`].

use std::ops::Deref;
use std::sync::Arc;

use jdto_core::{ErrorKind, PathAccumulator, Recorded, WriteError};
use serde_json::Value;

use crate::registry::CodecRegistry;

/// Read/write strategy for one value shape.
pub trait Codec<T>: Send + Sync {
    /// Extract a value from `node`. Failures are recorded in `acc` at the
    /// current path; `Err(Recorded)` means at least one entry was added.
    fn read(&self, node: &Value, acc: &mut PathAccumulator) -> Result<T, Recorded>;

    /// Render `value` as a new node.
    fn write(&self, value: &T) -> Result<Value, WriteError>;

    /// Nesting limit configured on the schema or union behind this codec.
    /// Top-level reads start their accumulator with it; wrappers report
    /// their inner codec's limit.
    fn depth_limit(&self) -> Option<usize> {
        None
    }
}

/// A codec shared between schemas.
pub type SharedCodec<T> = Arc<dyn Codec<T>>;

/// Types with a built-in codec.
///
/// `registry` is passed so that wrappers (`Vec<T>`, `Option<T>`, ...) resolve
/// their element codec through it and pick up user overrides.
pub trait Codable: Sized + Send + Sync + 'static {
    /// Codec used when the registry has no override for `Self`.
    fn default_codec(registry: &CodecRegistry) -> SharedCodec<Self>;
}

/// Record a scalar extraction failure at the current path.
pub(crate) fn recorded<T>(acc: &mut PathAccumulator, result: Result<T, ErrorKind>) -> Result<T, Recorded> {
    result.map_err(|kind| acc.record(kind))
}

// ─── Handles ────────────────────────────────────────────────────────

/// Reference to long-lived binding configuration (a schema or a tagged
/// union).
///
/// `Deferred` holds a function returning the `'static` value; it is only
/// called during reads and writes, which lets recursive types refer to a
/// schema that is still being initialized.
pub enum Handle<S: 'static> {
    /// Reference-counted value.
    Shared(Arc<S>),
    /// Value with static lifetime.
    Static(&'static S),
    /// Lazily resolved static value.
    Deferred(fn() -> &'static S),
}

impl<S: 'static> Handle<S> {
    /// Take ownership of `value`.
    pub fn owned(value: S) -> Self {
        Self::Shared(Arc::new(value))
    }

    /// Resolve the referenced value, if it is available without calling a
    /// deferred initializer.
    pub fn resolved(&self) -> Option<&S> {
        match self {
            Self::Shared(value) => Some(value),
            Self::Static(value) => Some(value),
            Self::Deferred(_) => None,
        }
    }
}

impl<S: 'static> Deref for Handle<S> {
    type Target = S;

    fn deref(&self) -> &S {
        match self {
            Self::Shared(value) => value,
            Self::Static(value) => value,
            Self::Deferred(get) => get(),
        }
    }
}

impl<S: 'static> Clone for Handle<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Shared(value) => Self::Shared(Arc::clone(value)),
            Self::Static(value) => Self::Static(value),
            Self::Deferred(get) => Self::Deferred(*get),
        }
    }
}

impl<S: 'static> From<Arc<S>> for Handle<S> {
    fn from(value: Arc<S>) -> Self {
        Self::Shared(value)
    }
}

impl<S: 'static> From<&'static S> for Handle<S> {
    fn from(value: &'static S) -> Self {
        Self::Static(value)
    }
}

// ─── Custom Codecs ──────────────────────────────────────────────────

type ReadFn<T> = Box<dyn Fn(&Value) -> Result<T, String> + Send + Sync>;
type WriteFn<T> = Box<dyn Fn(&T) -> Result<Value, String> + Send + Sync>;

/// User-supplied read/write pair.
///
/// The engine applies no structural checks of its own: the node is handed to
/// `read` as-is. A failure is reported once, at the field's path, as
/// [`ErrorKind::CustomCodecFailure`] carrying the returned message.
pub struct CustomCodec<T> {
    read: ReadFn<T>,
    write: WriteFn<T>,
}

impl<T: 'static> CustomCodec<T> {
    /// Codec from a read and a write function.
    pub fn new(
        read: impl Fn(&Value) -> Result<T, String> + Send + Sync + 'static,
        write: impl Fn(&T) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            read: Box::new(read),
            write: Box::new(write),
        }
    }

    /// Same as [`CustomCodec::new`], ready to attach to a field.
    pub fn shared(
        read: impl Fn(&Value) -> Result<T, String> + Send + Sync + 'static,
        write: impl Fn(&T) -> Result<Value, String> + Send + Sync + 'static,
    ) -> SharedCodec<T> {
        Arc::new(Self::new(read, write))
    }
}

impl<T> Codec<T> for CustomCodec<T> {
    fn read(&self, node: &Value, acc: &mut PathAccumulator) -> Result<T, Recorded> {
        (self.read)(node).map_err(|message| acc.record(ErrorKind::CustomCodecFailure(message)))
    }

    fn write(&self, value: &T) -> Result<Value, WriteError> {
        (self.write)(value).map_err(WriteError::custom)
    }
}

/// Reuses the codec of a representation type `R` for `T`, e.g. an enum
/// stored as its integer discriminant.
///
/// Failures of the inner codec keep their own kind; a rejected conversion
/// from `R` is a [`ErrorKind::CustomCodecFailure`].
pub struct MappedCodec<T, R> {
    inner: SharedCodec<R>,
    to_repr: Box<dyn Fn(&T) -> R + Send + Sync>,
    from_repr: Box<dyn Fn(R) -> Result<T, String> + Send + Sync>,
}

impl<T: 'static, R: 'static> MappedCodec<T, R> {
    /// Map through `inner` with the given conversions.
    pub fn new(
        inner: SharedCodec<R>,
        to_repr: impl Fn(&T) -> R + Send + Sync + 'static,
        from_repr: impl Fn(R) -> Result<T, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner,
            to_repr: Box::new(to_repr),
            from_repr: Box::new(from_repr),
        }
    }

    /// Same as [`MappedCodec::new`], ready to attach to a field.
    pub fn shared(
        inner: SharedCodec<R>,
        to_repr: impl Fn(&T) -> R + Send + Sync + 'static,
        from_repr: impl Fn(R) -> Result<T, String> + Send + Sync + 'static,
    ) -> SharedCodec<T> {
        Arc::new(Self::new(inner, to_repr, from_repr))
    }
}

impl<T, R> Codec<T> for MappedCodec<T, R> {
    fn read(&self, node: &Value, acc: &mut PathAccumulator) -> Result<T, Recorded> {
        let repr = self.inner.read(node, acc)?;
        (self.from_repr)(repr).map_err(|message| acc.record(ErrorKind::CustomCodecFailure(message)))
    }

    fn write(&self, value: &T) -> Result<Value, WriteError> {
        self.inner.write(&(self.to_repr)(value))
    }

    fn depth_limit(&self) -> Option<usize> {
        self.inner.depth_limit()
    }
}
