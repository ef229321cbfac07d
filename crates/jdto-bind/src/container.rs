//! # Container Codecs
//!
//! Codecs for values that wrap other values: optionals, homogeneous
//! sequences, string-keyed maps and boxes. Each holds the codec of its
//! element type, resolved through the registry when the container codec is
//! built, so registered overrides apply to elements too.
//!
//! ## Invariants
//!
//! - Sequences preserve element order in both directions.
//! - Every failing element is reported at its own index (`.tags[2]`); one
//!   bad element does not stop the remaining ones from being checked.
//! - Maps are written with keys in ascending order, whatever the iteration
//!   order of the native map.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::marker::PhantomData;
use std::sync::Arc;

use jdto_core::{Node, PathAccumulator, Recorded, Segment, WriteError};
use serde_json::Value;

use crate::codec::{recorded, Codable, Codec, SharedCodec};
use crate::registry::CodecRegistry;

/// `null` ↔ `None`; anything else goes through the inner codec.
pub struct OptionalCodec<T> {
    inner: SharedCodec<T>,
}

impl<T> OptionalCodec<T> {
    /// Wrap `inner`.
    pub fn new(inner: SharedCodec<T>) -> Self {
        Self { inner }
    }
}

impl<T> Codec<Option<T>> for OptionalCodec<T> {
    fn read(&self, node: &Value, acc: &mut PathAccumulator) -> Result<Option<T>, Recorded> {
        if node.is_null() {
            return Ok(None);
        }
        self.inner.read(node, acc).map(Some)
    }

    fn write(&self, value: &Option<T>) -> Result<Value, WriteError> {
        match value {
            Some(inner) => self.inner.write(inner),
            None => Ok(Value::make_null()),
        }
    }

    fn depth_limit(&self) -> Option<usize> {
        self.inner.depth_limit()
    }
}

impl<T: Codable> Codable for Option<T> {
    fn default_codec(registry: &CodecRegistry) -> SharedCodec<Self> {
        Arc::new(OptionalCodec::new(registry.codec_for::<T>()))
    }
}

/// JSON array ↔ any ordered collection of `T`.
pub struct SequenceCodec<C, T> {
    element: SharedCodec<T>,
    _collection: PhantomData<fn() -> C>,
}

impl<C, T> SequenceCodec<C, T> {
    /// Sequence of elements handled by `element`.
    pub fn new(element: SharedCodec<T>) -> Self {
        Self {
            element,
            _collection: PhantomData,
        }
    }
}

/// Read every element, scoped to its index, and collect all failures.
fn read_elements<T>(
    element: &dyn Codec<T>,
    node: &Value,
    acc: &mut PathAccumulator,
) -> Result<Vec<T>, Recorded> {
    acc.guard_depth()?;
    let children = recorded(acc, node.array_children())?;
    let mut values = Vec::with_capacity(children.len());
    let mut failure = None;
    for (i, child) in children.iter().enumerate() {
        match acc.scoped(Segment::Index(i), |acc| element.read(child, acc)) {
            Ok(value) => values.push(value),
            Err(recorded) => failure = Some(recorded),
        }
    }
    match failure {
        Some(recorded) => Err(recorded),
        None => Ok(values),
    }
}

impl<C, T> Codec<C> for SequenceCodec<C, T>
where
    C: FromIterator<T>,
    for<'a> &'a C: IntoIterator<Item = &'a T>,
{
    fn read(&self, node: &Value, acc: &mut PathAccumulator) -> Result<C, Recorded> {
        read_elements(self.element.as_ref(), node, acc).map(|values| values.into_iter().collect())
    }

    fn write(&self, value: &C) -> Result<Value, WriteError> {
        let children = value
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                self.element
                    .write(item)
                    .map_err(|e| e.within(&Segment::Index(i)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::make_array(children))
    }

    fn depth_limit(&self) -> Option<usize> {
        self.element.depth_limit()
    }
}

impl<T: Codable> Codable for Vec<T> {
    fn default_codec(registry: &CodecRegistry) -> SharedCodec<Self> {
        Arc::new(SequenceCodec::<Self, T>::new(registry.codec_for::<T>()))
    }
}

impl<T: Codable> Codable for VecDeque<T> {
    fn default_codec(registry: &CodecRegistry) -> SharedCodec<Self> {
        Arc::new(SequenceCodec::<Self, T>::new(registry.codec_for::<T>()))
    }
}

impl<T: Codable + Ord> Codable for BTreeSet<T> {
    fn default_codec(registry: &CodecRegistry) -> SharedCodec<Self> {
        Arc::new(SequenceCodec::<Self, T>::new(registry.codec_for::<T>()))
    }
}

/// JSON object ↔ string-keyed map of `T`.
pub struct MapCodec<M, T> {
    value: SharedCodec<T>,
    _map: PhantomData<fn() -> M>,
}

impl<M, T> MapCodec<M, T> {
    /// Map whose values are handled by `value`.
    pub fn new(value: SharedCodec<T>) -> Self {
        Self {
            value,
            _map: PhantomData,
        }
    }
}

impl<M, T> Codec<M> for MapCodec<M, T>
where
    M: FromIterator<(String, T)>,
    for<'a> &'a M: IntoIterator<Item = (&'a String, &'a T)>,
{
    fn read(&self, node: &Value, acc: &mut PathAccumulator) -> Result<M, Recorded> {
        acc.guard_depth()?;
        let members = recorded(acc, node.object_members())?;
        let mut entries = Vec::with_capacity(members.len());
        let mut failure = None;
        for (key, child) in members {
            match acc.scoped(Segment::field(key), |acc| self.value.read(child, acc)) {
                Ok(value) => entries.push((key.to_owned(), value)),
                Err(recorded) => failure = Some(recorded),
            }
        }
        match failure {
            Some(recorded) => Err(recorded),
            None => Ok(entries.into_iter().collect()),
        }
    }

    fn write(&self, value: &M) -> Result<Value, WriteError> {
        let mut entries: Vec<(&String, &T)> = value.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        let members = entries
            .into_iter()
            .map(|(key, item)| {
                self.value
                    .write(item)
                    .map(|node| (key.clone(), node))
                    .map_err(|e| e.within(&Segment::field(key.as_str())))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::make_object(members))
    }

    fn depth_limit(&self) -> Option<usize> {
        self.value.depth_limit()
    }
}

impl<T: Codable> Codable for BTreeMap<String, T> {
    fn default_codec(registry: &CodecRegistry) -> SharedCodec<Self> {
        Arc::new(MapCodec::<Self, T>::new(registry.codec_for::<T>()))
    }
}

impl<T: Codable> Codable for HashMap<String, T> {
    fn default_codec(registry: &CodecRegistry) -> SharedCodec<Self> {
        Arc::new(MapCodec::<Self, T>::new(registry.codec_for::<T>()))
    }
}

/// Heap indirection, transparent in the document.
pub struct BoxCodec<T> {
    inner: SharedCodec<T>,
}

impl<T> BoxCodec<T> {
    /// Wrap `inner`.
    pub fn new(inner: SharedCodec<T>) -> Self {
        Self { inner }
    }
}

impl<T> Codec<Box<T>> for BoxCodec<T> {
    fn read(&self, node: &Value, acc: &mut PathAccumulator) -> Result<Box<T>, Recorded> {
        self.inner.read(node, acc).map(Box::new)
    }

    fn write(&self, value: &Box<T>) -> Result<Value, WriteError> {
        self.inner.write(value)
    }

    fn depth_limit(&self) -> Option<usize> {
        self.inner.depth_limit()
    }
}

impl<T: Codable> Codable for Box<T> {
    fn default_codec(registry: &CodecRegistry) -> SharedCodec<Self> {
        Arc::new(BoxCodec::new(registry.codec_for::<T>()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CustomCodec;
    use jdto_core::ErrorKind;
    use serde_json::json;

    fn codec<T: Codable>() -> SharedCodec<T> {
        CodecRegistry::new().codec_for::<T>()
    }

    #[test]
    fn test_optional_null_and_value() {
        let c = codec::<Option<i32>>();
        let mut acc = PathAccumulator::new();
        assert_eq!(c.read(&json!(null), &mut acc), Ok(None));
        assert_eq!(c.read(&json!(4), &mut acc), Ok(Some(4)));
        assert_eq!(c.write(&None).unwrap(), Value::Null);
        assert!(c.read(&json!("4"), &mut acc).is_err());
    }

    #[test]
    fn test_sequence_preserves_order() {
        let c = codec::<Vec<String>>();
        let mut acc = PathAccumulator::new();
        let v = c.read(&json!(["b", "a", "c"]), &mut acc).unwrap();
        assert_eq!(v, vec!["b", "a", "c"]);
        assert_eq!(c.write(&v).unwrap(), json!(["b", "a", "c"]));
    }

    #[test]
    fn test_sequence_reports_every_bad_element() {
        let c = codec::<Vec<i32>>();
        let mut acc = PathAccumulator::new();
        assert!(c.read(&json!([1, "x", 3, null]), &mut acc).is_err());
        let paths: Vec<&str> = acc.errors().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["[1]", "[3]"]);
    }

    #[test]
    fn test_sequence_requires_array() {
        let c = codec::<Vec<i32>>();
        let mut acc = PathAccumulator::new();
        assert!(c.read(&json!({"0": 1}), &mut acc).is_err());
        assert_eq!(acc.errors()[0].kind.code(), "malformed_structure");
    }

    #[test]
    fn test_other_sequences() {
        let mut acc = PathAccumulator::new();
        let deque = codec::<VecDeque<u8>>().read(&json!([3, 1]), &mut acc).unwrap();
        assert_eq!(deque, VecDeque::from(vec![3, 1]));
        let set = codec::<BTreeSet<u8>>().read(&json!([3, 1, 3]), &mut acc).unwrap();
        assert_eq!(codec::<BTreeSet<u8>>().write(&set).unwrap(), json!([1, 3]));
    }

    #[test]
    fn test_nested_sequences_paths() {
        let c = codec::<Vec<Vec<bool>>>();
        let mut acc = PathAccumulator::new();
        assert!(c.read(&json!([[true], [false, 0]]), &mut acc).is_err());
        assert_eq!(acc.errors()[0].path, "[1][1]");
    }

    #[test]
    fn test_map_written_sorted() {
        let c = codec::<HashMap<String, i32>>();
        let mut map = HashMap::new();
        for (k, v) in [("zeta", 1), ("alpha", 2), ("mid", 3)] {
            map.insert(k.to_string(), v);
        }
        let node = c.write(&map).unwrap();
        assert_eq!(
            serde_json::to_string(&node).unwrap(),
            r#"{"alpha":2,"mid":3,"zeta":1}"#
        );
        let mut acc = PathAccumulator::new();
        assert_eq!(c.read(&node, &mut acc), Ok(map));
    }

    #[test]
    fn test_map_value_errors_keyed() {
        let c = codec::<BTreeMap<String, u8>>();
        let mut acc = PathAccumulator::new();
        assert!(c.read(&json!({"ok": 1, "bad": -1}), &mut acc).is_err());
        assert_eq!(acc.errors()[0].path, ".bad");
        assert_eq!(acc.errors()[0].kind, ErrorKind::out_of_range("u8", -1));
    }

    #[test]
    fn test_write_error_carries_index() {
        let failing: SharedCodec<i32> = CustomCodec::shared(
            |_| Ok(0),
            |v| if *v < 0 { Err("negative".to_string()) } else { Ok(json!(v)) },
        );
        let c = SequenceCodec::<Vec<i32>, i32>::new(failing);
        let err = c.write(&vec![1, 2, -3]).unwrap_err();
        assert_eq!(err.path(), "[2]");
    }

    #[test]
    fn test_box_is_transparent() {
        let c = codec::<Box<String>>();
        let mut acc = PathAccumulator::new();
        assert_eq!(c.read(&json!("x"), &mut acc), Ok(Box::new("x".to_string())));
    }

    #[test]
    fn test_depth_limit() {
        let c = codec::<Vec<Vec<Vec<i32>>>>();
        let mut acc = PathAccumulator::with_max_depth(1);
        assert!(c.read(&json!([[[1]]]), &mut acc).is_err());
        assert_eq!(acc.errors()[0].kind.code(), "malformed_structure");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn vec_roundtrip_preserves_order(v in proptest::collection::vec(any::<i32>(), 0..32)) {
            let c = CodecRegistry::new().codec_for::<Vec<i32>>();
            let node = c.write(&v).unwrap();
            let back = c.read(&node, &mut PathAccumulator::new()).unwrap();
            prop_assert_eq!(back, v);
        }

        #[test]
        fn btreemap_roundtrip(m in proptest::collection::btree_map(".{0,8}", any::<i64>(), 0..16)) {
            let c = CodecRegistry::new().codec_for::<BTreeMap<String, i64>>();
            let node = c.write(&m).unwrap();
            let back = c.read(&node, &mut PathAccumulator::new()).unwrap();
            prop_assert_eq!(back, m);
        }
    }
}
