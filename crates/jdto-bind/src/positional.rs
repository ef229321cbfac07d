//! # Positional Binding — Values Stored Inside Arrays
//!
//! An [`InsideArray<T>`] binds a struct or tuple to a JSON array whose
//! elements are identified by position: `[1, "two", 55555]` instead of
//! `{"a": 1, "b": "two", "c": 55555}`. Each [`ArrayMember`] is one position,
//! with its own accessor pair, validators and optional codec override.
//!
//! ## Length Rules
//!
//! By default the array must hold exactly one element per member. With
//! [`InsideArrayBuilder::at_least`] the trailing members become optional:
//! an array of `at_least..=members` elements is accepted and every missing
//! member takes its default. Any other length is
//! [`ErrorKind::MalformedStructure`] at the array's path.
//!
//! ## Invariants
//!
//! - Members are read under `[index]` and every member failure is reported.
//! - Reads are staged like [`Schema`](crate::Schema) reads: a failed read
//!   never yields a value and [`InsideArray::read_into`] leaves the target
//!   untouched.
//! - Writes always emit every member, in declaration order.

use std::sync::Arc;

use jdto_core::{
    BindOptions, ErrorKind, Node, PathAccumulator, ReadError, Recorded, Segment, SetupError,
    WriteError,
};
use serde_json::Value;

use crate::codec::{recorded, Codable, Codec, Handle, SharedCodec};
use crate::object::{Assignment, Getter, Setter};
use crate::registry::{self, CodecRegistry};
use crate::validate::{Validator, ValidatorChain};

type Factory<F> = Arc<dyn Fn() -> F + Send + Sync>;

/// Declaration of one array position of `T` holding a value of type `F`.
pub struct ArrayMember<T, F> {
    get: Getter<T, F>,
    set: Setter<T, F>,
    default: Factory<F>,
    validators: ValidatorChain<F>,
    codec: Option<SharedCodec<F>>,
}

impl<T: 'static, F: Default + 'static> ArrayMember<T, F> {
    /// Position whose default is `F::default()`.
    pub fn new(
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut T, F) + Send + Sync + 'static,
    ) -> Self {
        Self::with_factory(get, set, Arc::new(F::default))
    }
}

impl<T: 'static, F: Clone + Send + Sync + 'static> ArrayMember<T, F> {
    /// Position that takes `default` when the array ends before it.
    pub fn with_default(
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut T, F) + Send + Sync + 'static,
        default: F,
    ) -> Self {
        Self::with_factory(get, set, Arc::new(move || default.clone()))
    }
}

impl<T: 'static, F: 'static> ArrayMember<T, F> {
    fn with_factory(
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut T, F) + Send + Sync + 'static,
        default: Factory<F>,
    ) -> Self {
        Self {
            get: Box::new(get),
            set: Arc::new(set),
            default,
            validators: ValidatorChain::new(),
            codec: None,
        }
    }

    /// Append a validator closure.
    pub fn check(self, check: impl Fn(&F) -> Result<(), String> + Send + Sync + 'static) -> Self {
        self.validator(check)
    }

    /// Append a validator.
    pub fn validator(mut self, validator: impl Validator<F> + 'static) -> Self {
        self.validators.push(validator);
        self
    }

    /// Use `codec` instead of the registry's codec for `F`.
    pub fn codec(mut self, codec: SharedCodec<F>) -> Self {
        self.codec = Some(codec);
        self
    }
}

trait MemberBinding<T>: Send + Sync {
    /// Stage the value at this position, or the default when `node` is
    /// past the end of the array.
    fn read(&self, node: Option<&Value>, acc: &mut PathAccumulator) -> Result<Assignment<T>, Recorded>;

    fn write(&self, source: &T) -> Result<Value, WriteError>;
}

struct BoundMember<T, F> {
    member: ArrayMember<T, F>,
    codec: SharedCodec<F>,
}

impl<T: 'static, F: 'static> MemberBinding<T> for BoundMember<T, F> {
    fn read(&self, node: Option<&Value>, acc: &mut PathAccumulator) -> Result<Assignment<T>, Recorded> {
        let value = match node {
            None => (self.member.default)(),
            Some(node) => {
                let value = self.codec.read(node, acc)?;
                if let Err(message) = self.member.validators.validate(&value) {
                    return Err(acc.record(ErrorKind::ValidationFailed(message)));
                }
                value
            }
        };
        let set = Arc::clone(&self.member.set);
        Ok(Box::new(move |target: &mut T| set(target, value)))
    }

    fn write(&self, source: &T) -> Result<Value, WriteError> {
        self.codec.write((self.member.get)(source))
    }
}

// ─── Binding ────────────────────────────────────────────────────────

/// Positional members of `T`. Immutable once built.
pub struct InsideArray<T> {
    name: String,
    members: Vec<Box<dyn MemberBinding<T>>>,
    at_least: usize,
    max_depth: usize,
}

impl<T: 'static> InsideArray<T> {
    /// Start a binding whose codecs come from the global registry.
    pub fn builder(name: impl Into<String>) -> InsideArrayBuilder<'static, T> {
        InsideArrayBuilder::new(name, registry::global())
    }

    /// Start a binding whose codecs come from `registry`.
    pub fn builder_with(name: impl Into<String>, registry: &CodecRegistry) -> InsideArrayBuilder<'_, T> {
        InsideArrayBuilder::new(name, registry)
    }

    /// Binding name, used in logs and setup errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of declared members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether no members are declared.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Minimum accepted array length.
    pub fn at_least(&self) -> usize {
        self.at_least
    }

    /// Nesting limit applied to top-level reads.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn expected_length(&self) -> String {
        if self.at_least == self.members.len() {
            format!("array of {} elements", self.members.len())
        } else {
            format!("array of {} to {} elements", self.at_least, self.members.len())
        }
    }

    /// Read every member of `node`, staging the assignments.
    pub fn read_assignments(
        &self,
        node: &Value,
        acc: &mut PathAccumulator,
    ) -> Result<Vec<Assignment<T>>, Recorded> {
        acc.guard_depth()?;
        let children = recorded(acc, node.array_children())?;
        if children.len() < self.at_least || children.len() > self.members.len() {
            return Err(acc.record(ErrorKind::MalformedStructure {
                expected: self.expected_length(),
                found: format!("array of {} elements", children.len()),
            }));
        }
        let mut assignments = Vec::with_capacity(self.members.len());
        let mut failure = None;
        for (i, member) in self.members.iter().enumerate() {
            let child = children.get(i);
            match acc.scoped(Segment::Index(i), |acc| member.read(child, acc)) {
                Ok(assign) => assignments.push(assign),
                Err(recorded) => failure = Some(recorded),
            }
        }
        match failure {
            Some(recorded) => Err(recorded),
            None => Ok(assignments),
        }
    }

    /// Read `node` into `target`. On failure `target` is left unchanged.
    pub fn read_into(&self, node: &Value, target: &mut T) -> Result<(), ReadError> {
        let mut acc = PathAccumulator::with_max_depth(self.max_depth);
        match self.read_assignments(node, &mut acc) {
            Ok(assignments) => {
                for assign in assignments {
                    assign(target);
                }
                Ok(())
            }
            Err(_) => Err(self.failed(acc)),
        }
    }

    /// Render `value` as an array with one element per member.
    pub fn write(&self, value: &T) -> Result<Value, WriteError> {
        let children = self
            .members
            .iter()
            .enumerate()
            .map(|(i, member)| member.write(value).map_err(|e| e.within(&Segment::Index(i))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::make_array(children))
    }

    fn failed(&self, acc: PathAccumulator) -> ReadError {
        tracing::trace!(binding = %self.name, errors = acc.error_count(), "read failed");
        acc.into_read_error()
    }
}

impl<T: Default + 'static> InsideArray<T> {
    /// Read a new `T` from `node`, starting from `T::default()`.
    pub fn read(&self, node: &Value) -> Result<T, ReadError> {
        let mut acc = PathAccumulator::with_max_depth(self.max_depth);
        match self.read_with(node, &mut acc) {
            Ok(value) => Ok(value),
            Err(_) => Err(self.failed(acc)),
        }
    }

    /// Read a new `T` from `node` within an ongoing read.
    pub fn read_with(&self, node: &Value, acc: &mut PathAccumulator) -> Result<T, Recorded> {
        let assignments = self.read_assignments(node, acc)?;
        let mut value = T::default();
        for assign in assignments {
            assign(&mut value);
        }
        Ok(value)
    }
}

impl<T> std::fmt::Debug for InsideArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsideArray")
            .field("name", &self.name)
            .field("members", &self.members.len())
            .field("at_least", &self.at_least)
            .finish()
    }
}

/// Collects member declarations for an [`InsideArray`].
pub struct InsideArrayBuilder<'r, T> {
    name: String,
    registry: &'r CodecRegistry,
    members: Vec<Box<dyn MemberBinding<T>>>,
    at_least: Option<usize>,
    max_depth: usize,
}

impl<'r, T: 'static> InsideArrayBuilder<'r, T> {
    fn new(name: impl Into<String>, registry: &'r CodecRegistry) -> Self {
        Self {
            name: name.into(),
            registry,
            members: Vec::new(),
            at_least: None,
            max_depth: BindOptions::default().max_depth,
        }
    }

    /// Take the nesting limit from `options`.
    pub fn with_options(mut self, options: &BindOptions) -> Self {
        self.max_depth = options.max_depth;
        self
    }

    /// Accept arrays with as few as `count` elements.
    pub fn at_least(mut self, count: usize) -> Self {
        self.at_least = Some(count);
        self
    }

    /// Add the next position.
    pub fn member<F: Codable>(mut self, member: ArrayMember<T, F>) -> Self {
        let codec = match &member.codec {
            Some(codec) => Arc::clone(codec),
            None => self.registry.codec_for::<F>(),
        };
        self.members.push(Box::new(BoundMember { member, codec }));
        self
    }

    /// Shorthand for a position defaulting to `F::default()`.
    pub fn position<F: Codable + Default>(
        self,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut T, F) + Send + Sync + 'static,
    ) -> Self {
        self.member(ArrayMember::new(get, set))
    }

    /// Finish the binding.
    pub fn build(self) -> Result<InsideArray<T>, SetupError> {
        let at_least = self.at_least.unwrap_or(self.members.len());
        if at_least > self.members.len() {
            return Err(SetupError::InvalidArrayBounds {
                binding: self.name,
                at_least,
                members: self.members.len(),
            });
        }
        tracing::debug!(
            binding = %self.name,
            members = self.members.len(),
            at_least,
            "built array binding"
        );
        Ok(InsideArray {
            name: self.name,
            members: self.members,
            at_least,
            max_depth: self.max_depth,
        })
    }
}

// ─── Codec ──────────────────────────────────────────────────────────

/// Codec for a value bound by an [`InsideArray`].
pub struct InsideArrayCodec<T: 'static> {
    binding: Handle<InsideArray<T>>,
}

impl<T: 'static> InsideArrayCodec<T> {
    /// Codec backed by `binding`.
    pub fn new(binding: impl Into<Handle<InsideArray<T>>>) -> Self {
        Self {
            binding: binding.into(),
        }
    }

    /// Codec owning `binding`, ready to attach to a field.
    pub fn shared(binding: InsideArray<T>) -> SharedCodec<T>
    where
        T: Default,
    {
        Arc::new(Self::new(Arc::new(binding)))
    }
}

impl<T: Default + 'static> Codec<T> for InsideArrayCodec<T> {
    fn read(&self, node: &Value, acc: &mut PathAccumulator) -> Result<T, Recorded> {
        self.binding.read_with(node, acc)
    }

    fn write(&self, value: &T) -> Result<Value, WriteError> {
        self.binding.write(value)
    }

    fn depth_limit(&self) -> Option<usize> {
        Some(self.binding.max_depth())
    }
}
