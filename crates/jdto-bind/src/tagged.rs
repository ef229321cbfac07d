//! # Tagged Unions — Discriminator Dispatch
//!
//! Binds a Rust enum to a family of JSON objects distinguished by a
//! discriminator member, e.g. `{"type": "circle", "radius": 2}`. Each tag is
//! registered with the schema of its variant payload plus a pair of plain
//! functions that wrap a payload into the enum and borrow it back out.
//!
//! ## Read
//!
//! 1. The node must be an object.
//! 2. A missing discriminator is [`ErrorKind::MissingDiscriminator`] at the
//!    object's path; a non-string one is a type mismatch at the
//!    discriminator's path.
//! 3. An unregistered tag is exactly one [`ErrorKind::UnknownTag`] at the
//!    discriminator's path; no sibling member is inspected.
//! 4. Otherwise the variant schema reads the object. The discriminator is
//!    an undeclared key for it and is ignored.
//!
//! ## Write
//!
//! The variant's fields are written in schema order and the discriminator is
//! inserted first or last, per [`DiscriminatorPosition`].
//!
//! ## Setup
//!
//! Tags are unique per union. A variant schema may not declare a field named
//! like the discriminator. The check covers every schema available at build
//! time; deferred schemas are not inspected.

use std::collections::HashMap;
use std::sync::Arc;

use jdto_core::{
    BindOptions, DiscriminatorPosition, ErrorKind, Node, NodeKind, PathAccumulator, ReadError,
    Recorded, Segment, SetupError, WriteError,
};
use serde_json::Value;

use crate::codec::{recorded, Codec, Handle, SharedCodec};
use crate::object::{Schema, SchemaRef};

/// Shared reference to a tagged union.
pub type UnionRef<T> = Handle<TaggedUnion<T>>;

type ReadVariant<T> = Box<dyn Fn(&Value, &mut PathAccumulator) -> Result<T, Recorded> + Send + Sync>;
type WriteVariant<T> =
    Box<dyn Fn(&T, &mut Vec<(String, Value)>) -> Option<Result<(), WriteError>> + Send + Sync>;

struct Variant<T> {
    tag: String,
    read: ReadVariant<T>,
    write: WriteVariant<T>,
}

/// Discriminator → variant schema map for the enum `T`.
pub struct TaggedUnion<T> {
    name: String,
    key: String,
    position: DiscriminatorPosition,
    max_depth: usize,
    variants: Vec<Variant<T>>,
    by_tag: HashMap<String, usize>,
}

impl<T: 'static> TaggedUnion<T> {
    /// Start a union with the default discriminator key `"type"`.
    pub fn builder(name: impl Into<String>) -> TaggedUnionBuilder<T> {
        TaggedUnionBuilder::new(name)
    }

    /// Union name, used in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Discriminator key.
    pub fn discriminator(&self) -> &str {
        &self.key
    }

    /// Nesting limit applied to top-level reads.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Registered tags in registration order.
    pub fn tags(&self) -> Vec<&str> {
        self.variants.iter().map(|v| v.tag.as_str()).collect()
    }

    /// Read a value from `node` as the top-level document.
    pub fn read(&self, node: &Value) -> Result<T, ReadError> {
        let mut acc = PathAccumulator::with_max_depth(self.max_depth);
        match self.read_with(node, &mut acc) {
            Ok(value) => Ok(value),
            Err(_) => {
                tracing::trace!(union = %self.name, errors = acc.error_count(), "read failed");
                Err(acc.into_read_error())
            }
        }
    }

    /// Read a value from `node` within an ongoing read.
    pub fn read_with(&self, node: &Value, acc: &mut PathAccumulator) -> Result<T, Recorded> {
        acc.guard_depth()?;
        if node.node_kind() != NodeKind::Object {
            return Err(acc.record(ErrorKind::malformed("object", node.node_kind())));
        }
        let Some(tag_node) = node.object_member(&self.key) else {
            return Err(acc.record(ErrorKind::MissingDiscriminator {
                key: self.key.clone(),
            }));
        };
        let index = acc.scoped(Segment::field(self.key.as_str()), |acc| {
            let tag = recorded(acc, tag_node.string_value())?;
            match self.by_tag.get(tag) {
                Some(&index) => Ok(index),
                None => Err(acc.record(ErrorKind::UnknownTag {
                    tag: tag.to_string(),
                })),
            }
        })?;
        (self.variants[index].read)(node, acc)
    }

    /// Render `value` with its discriminator.
    pub fn write(&self, value: &T) -> Result<Value, WriteError> {
        for variant in &self.variants {
            let mut members = Vec::new();
            if let Some(result) = (variant.write)(value, &mut members) {
                result?;
                let tag = (self.key.clone(), Value::make_string(variant.tag.clone()));
                match self.position {
                    DiscriminatorPosition::First => members.insert(0, tag),
                    DiscriminatorPosition::Last => members.push(tag),
                }
                return Ok(Value::make_object(members));
            }
        }
        Err(WriteError::UnregisteredVariant {
            path: String::new(),
            union_name: self.name.clone(),
        })
    }
}

impl<T> std::fmt::Debug for TaggedUnion<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaggedUnion")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("position", &self.position)
            .field("tags", &self.variants.iter().map(|v| &v.tag).collect::<Vec<_>>())
            .finish()
    }
}

/// Collects variant registrations for a [`TaggedUnion`].
pub struct TaggedUnionBuilder<T> {
    name: String,
    key: String,
    position: DiscriminatorPosition,
    max_depth: usize,
    variants: Vec<Variant<T>>,
    by_tag: HashMap<String, usize>,
    field_checks: Vec<(String, Box<dyn Fn(&str) -> bool>)>,
    error: Option<SetupError>,
}

impl<T: 'static> TaggedUnionBuilder<T> {
    fn new(name: impl Into<String>) -> Self {
        let options = BindOptions::default();
        Self {
            name: name.into(),
            key: options.discriminator_key,
            position: options.discriminator_position,
            max_depth: options.max_depth,
            variants: Vec::new(),
            by_tag: HashMap::new(),
            field_checks: Vec::new(),
            error: None,
        }
    }

    /// Take the discriminator key, position and depth limit from `options`.
    pub fn with_options(mut self, options: &BindOptions) -> Self {
        self.key = options.discriminator_key.clone();
        self.position = options.discriminator_position;
        self.max_depth = options.max_depth;
        self
    }

    /// Set the discriminator key.
    pub fn discriminator(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Set where the discriminator is written.
    pub fn position(mut self, position: DiscriminatorPosition) -> Self {
        self.position = position;
        self
    }

    /// Register `tag` for the variant whose payload `V` is bound by `schema`.
    ///
    /// `wrap` builds the enum from a payload; `unwrap` borrows the payload
    /// back when the enum holds this variant.
    pub fn variant<V: Default + 'static>(
        mut self,
        tag: impl Into<String>,
        schema: impl Into<SchemaRef<V>>,
        wrap: fn(V) -> T,
        unwrap: fn(&T) -> Option<&V>,
    ) -> Self {
        if self.error.is_some() {
            return self;
        }
        let tag = tag.into();
        if self.by_tag.contains_key(&tag) {
            self.error = Some(SetupError::DuplicateTagRegistration {
                union_name: self.name.clone(),
                tag,
            });
            return self;
        }

        let schema: SchemaRef<V> = schema.into();
        if let Some(resolved) = schema.resolved() {
            let names: Vec<String> = resolved.field_names().into_iter().map(str::to_owned).collect();
            self.field_checks.push((
                tag.clone(),
                Box::new(move |key: &str| names.iter().any(|n| n == key)),
            ));
        }

        let read_schema = schema.clone();
        let read: ReadVariant<T> =
            Box::new(move |node: &Value, acc: &mut PathAccumulator| {
            read_schema.read_with(node, acc).map(wrap)
        });
        let write: WriteVariant<T> = Box::new(move |value: &T, out: &mut Vec<(String, Value)>| {
            unwrap(value).map(|payload| schema.write_members(payload, out))
        });

        self.by_tag.insert(tag.clone(), self.variants.len());
        self.variants.push(Variant { tag, read, write });
        self
    }

    /// Finish the union. Fails on the first setup error.
    pub fn build(self) -> Result<TaggedUnion<T>, SetupError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.key.is_empty() {
            return Err(SetupError::EmptyDiscriminator {
                union_name: self.name,
            });
        }
        if let Some((tag, _)) = self.field_checks.iter().find(|(_, has)| has(self.key.as_str())) {
            return Err(SetupError::DiscriminatorCollision {
                union_name: self.name.clone(),
                tag: tag.clone(),
                key: self.key.clone(),
            });
        }
        tracing::debug!(
            union = %self.name,
            variants = self.variants.len(),
            key = %self.key,
            "built tagged union"
        );
        Ok(TaggedUnion {
            name: self.name,
            key: self.key,
            position: self.position,
            max_depth: self.max_depth,
            variants: self.variants,
            by_tag: self.by_tag,
        })
    }
}

/// Codec for a tagged union nested in another value.
pub struct TaggedCodec<T: 'static> {
    union: UnionRef<T>,
}

impl<T: 'static> TaggedCodec<T> {
    /// Codec backed by `union`.
    pub fn new(union: impl Into<UnionRef<T>>) -> Self {
        Self {
            union: union.into(),
        }
    }

    /// Codec backed by a union that is looked up on each use.
    pub fn deferred(union: fn() -> &'static TaggedUnion<T>) -> Self {
        Self {
            union: Handle::Deferred(union),
        }
    }

    /// Codec owning `union`, ready to attach to a field.
    pub fn shared(union: TaggedUnion<T>) -> SharedCodec<T> {
        Arc::new(Self::new(Arc::new(union)))
    }
}

impl<T: 'static> Codec<T> for TaggedCodec<T> {
    fn read(&self, node: &Value, acc: &mut PathAccumulator) -> Result<T, Recorded> {
        self.union.read_with(node, acc)
    }

    fn write(&self, value: &T) -> Result<Value, WriteError> {
        self.union.write(value)
    }

    fn depth_limit(&self) -> Option<usize> {
        Some(self.union.max_depth())
    }
}

/// Enums bound by a process-wide tagged union.
///
/// Use [`impl_union_codable!`](crate::impl_union_codable) to make the enum
/// usable as a field.
pub trait Polymorphic: Send + Sync + Sized + 'static {
    /// The enum's union.
    fn union() -> &'static TaggedUnion<Self>;
}

/// Implement [`Codable`](crate::Codable) for one or more [`Polymorphic`]
/// enums.
#[macro_export]
macro_rules! impl_union_codable {
    ($($t:ty),+ $(,)?) => {$(
        impl $crate::Codable for $t {
            fn default_codec(_: &$crate::CodecRegistry) -> $crate::SharedCodec<Self> {
                ::std::sync::Arc::new($crate::TaggedCodec::deferred(<$t as $crate::Polymorphic>::union))
            }
        }
    )+};
}

/// Schema reference for a variant whose schema is only known by function.
pub fn deferred_schema<V: 'static>(schema: fn() -> &'static Schema<V>) -> SchemaRef<V> {
    Handle::Deferred(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CodecRegistry;
    use serde_json::json;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Circle {
        radius: f64,
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Rect {
        w: u32,
        h: u32,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Shape {
        Circle(Circle),
        Rect(Rect),
        Empty,
    }

    fn circle_schema() -> Schema<Circle> {
        Schema::builder_with("Circle", &CodecRegistry::new())
            .mandatory("radius", |c: &Circle| &c.radius, |c: &mut Circle, v| c.radius = v)
            .build()
            .unwrap()
    }

    fn rect_schema() -> Schema<Rect> {
        Schema::builder_with("Rect", &CodecRegistry::new())
            .mandatory("w", |r: &Rect| &r.w, |r: &mut Rect, v| r.w = v)
            .mandatory("h", |r: &Rect| &r.h, |r: &mut Rect, v| r.h = v)
            .build()
            .unwrap()
    }

    fn shapes(position: DiscriminatorPosition) -> TaggedUnion<Shape> {
        TaggedUnion::builder("Shape")
            .position(position)
            .variant(
                "circle",
                Arc::new(circle_schema()),
                Shape::Circle,
                |s| match s {
                    Shape::Circle(c) => Some(c),
                    _ => None,
                },
            )
            .variant(
                "rect",
                Arc::new(rect_schema()),
                Shape::Rect,
                |s| match s {
                    Shape::Rect(r) => Some(r),
                    _ => None,
                },
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_dispatch_by_tag() {
        let union = shapes(DiscriminatorPosition::First);
        assert_eq!(
            union.read(&json!({"type": "rect", "w": 2, "h": 3})).unwrap(),
            Shape::Rect(Rect { w: 2, h: 3 })
        );
        assert_eq!(
            union.read(&json!({"radius": 1.5, "type": "circle"})).unwrap(),
            Shape::Circle(Circle { radius: 1.5 })
        );
        assert_eq!(union.tags(), vec!["circle", "rect"]);
    }

    #[test]
    fn test_write_discriminator_position() {
        let value = Shape::Rect(Rect { w: 2, h: 3 });
        let first = shapes(DiscriminatorPosition::First).write(&value).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            r#"{"type":"rect","w":2,"h":3}"#
        );
        let last = shapes(DiscriminatorPosition::Last).write(&value).unwrap();
        assert_eq!(
            serde_json::to_string(&last).unwrap(),
            r#"{"w":2,"h":3,"type":"rect"}"#
        );
    }

    #[test]
    fn test_unknown_tag_single_error() {
        let err = shapes(DiscriminatorPosition::First)
            .read(&json!({"type": "hexagon", "w": "bad", "h": null}))
            .unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.paths(), vec![".type"]);
        assert_eq!(
            err.errors()[0].kind,
            ErrorKind::UnknownTag {
                tag: "hexagon".to_string()
            }
        );
    }

    #[test]
    fn test_missing_and_non_string_discriminator() {
        let union = shapes(DiscriminatorPosition::First);
        let err = union.read(&json!({"w": 1})).unwrap_err();
        assert_eq!(err.paths(), vec![""]);
        assert_eq!(err.errors()[0].kind.code(), "missing_discriminator");

        let err = union.read(&json!({"type": 7})).unwrap_err();
        assert_eq!(err.paths(), vec![".type"]);
        assert_eq!(err.errors()[0].kind.code(), "type_mismatch");
    }

    #[test]
    fn test_variant_errors_reported() {
        let err = shapes(DiscriminatorPosition::First)
            .read(&json!({"type": "rect", "w": -1}))
            .unwrap_err();
        assert_eq!(err.paths(), vec![".w", ".h"]);
    }

    #[test]
    fn test_unregistered_variant_write_fails() {
        let err = shapes(DiscriminatorPosition::First)
            .write(&Shape::Empty)
            .unwrap_err();
        assert!(matches!(err, WriteError::UnregisteredVariant { ref union_name, .. } if union_name == "Shape"));
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let err = TaggedUnion::builder("Shape")
            .variant("circle", Arc::new(circle_schema()), Shape::Circle, |s| match s {
                Shape::Circle(c) => Some(c),
                _ => None,
            })
            .variant("circle", Arc::new(circle_schema()), Shape::Circle, |s| match s {
                Shape::Circle(c) => Some(c),
                _ => None,
            })
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SetupError::DuplicateTagRegistration {
                union_name: "Shape".to_string(),
                tag: "circle".to_string()
            }
        );
    }

    #[test]
    fn test_discriminator_collision_rejected() {
        let err = TaggedUnion::builder("Shape")
            .discriminator("radius")
            .variant("circle", Arc::new(circle_schema()), Shape::Circle, |s| match s {
                Shape::Circle(c) => Some(c),
                _ => None,
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, SetupError::DiscriminatorCollision { .. }));
    }

    #[test]
    fn test_empty_discriminator_rejected() {
        let err = TaggedUnion::<Shape>::builder("Shape")
            .discriminator("")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SetupError::EmptyDiscriminator {
                union_name: "Shape".to_string()
            }
        );
    }

    #[test]
    fn test_custom_key_from_options() {
        let options = BindOptions {
            discriminator_key: "kind".to_string(),
            ..BindOptions::default()
        };
        let union = TaggedUnion::builder("Shape")
            .with_options(&options)
            .variant("circle", Arc::new(circle_schema()), Shape::Circle, |s| match s {
                Shape::Circle(c) => Some(c),
                _ => None,
            })
            .build()
            .unwrap();
        let out = union.write(&Shape::Circle(Circle { radius: 2.0 })).unwrap();
        assert_eq!(out, json!({"kind": "circle", "radius": 2.0}));
        assert_eq!(union.read(&out).unwrap(), Shape::Circle(Circle { radius: 2.0 }));
    }
}
