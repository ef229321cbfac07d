//! # Object Binder — Schemas of Named Fields
//!
//! A [`Schema<T>`] is the ordered list of fields that binds a native struct
//! to a JSON object. Each field is declared once with a [`FieldSpec`]: its
//! name, an accessor pair, a presence policy, validators and optionally a
//! codec override. The builder resolves every field's codec through the
//! [`CodecRegistry`] when the schema is built, so reads and writes never
//! consult the registry again.
//!
//! ## Presence Policies
//!
//! | Policy | Absent on read | `null` on read | Written |
//! |--------|----------------|----------------|---------|
//! | mandatory | error | codec decides | always |
//! | optional (default `D`) | `D` | `D` | unless equal to `D` (see policy) |
//! | optional_null (`Option<G>`) | `None` | `None` | unless `None` (see policy) |
//! | optional_no_default | untouched | codec decides | always |
//! | readonly | ignored | ignored | always |
//!
//! [`FieldSpec::null_as_default`] makes an explicit `null` assign
//! `F::default()` on mandatory and no-default fields.
//!
//! An optional field equal to its default is written according to the
//! field's [`write_default_as`](FieldSpec::write_default_as) policy, falling
//! back to the schema's [`BindOptions::default_write_policy`].
//!
//! ## Invariants
//!
//! - Fields are read and written in declaration order; output keys follow
//!   that order.
//! - A read visits every field even after failures and reports all of them.
//! - A failed read never produces a value, and [`Schema::read_into`] leaves
//!   the target untouched: assignments are staged and applied only once the
//!   whole object has been read without error.
//! - Defaults are assigned without running validators. Validators never run
//!   on write.

use std::collections::HashSet;
use std::sync::Arc;

use jdto_core::{
    BindOptions, DefaultWritePolicy, ErrorKind, Node, NodeKind, PathAccumulator, ReadError,
    Recorded, Segment, SetupError, WriteError,
};
use serde_json::Value;

use crate::codec::{Codable, Codec, Handle, SharedCodec};
use crate::registry::{self, CodecRegistry};
use crate::validate::{Validator, ValidatorChain};

/// A staged write of one field into the target object.
pub type Assignment<T> = Box<dyn FnOnce(&mut T)>;

/// Borrowing accessor of a field.
pub type Getter<T, F> = Box<dyn Fn(&T) -> &F + Send + Sync>;

/// Assigning accessor of a field.
pub type Setter<T, F> = Arc<dyn Fn(&mut T, F) + Send + Sync>;

type Factory<F> = Arc<dyn Fn() -> F + Send + Sync>;
type DefaultCheck<F> = Box<dyn Fn(&F) -> bool + Send + Sync>;

/// Shared reference to a schema.
pub type SchemaRef<T> = Handle<Schema<T>>;

enum Presence<F> {
    Mandatory,
    Optional {
        default: Factory<F>,
        is_default: DefaultCheck<F>,
    },
    OptionalNoDefault,
}

/// Declaration of one field of `T` holding a value of type `F`.
pub struct FieldSpec<T, F> {
    name: String,
    get: Getter<T, F>,
    set: Option<Setter<T, F>>,
    presence: Presence<F>,
    validators: ValidatorChain<F>,
    codec: Option<SharedCodec<F>>,
    null_value: Option<Factory<F>>,
    write_default_as: Option<DefaultWritePolicy>,
}

impl<T: 'static, F: 'static> FieldSpec<T, F> {
    fn with_presence(
        name: impl Into<String>,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        set: Option<Setter<T, F>>,
        presence: Presence<F>,
    ) -> Self {
        Self {
            name: name.into(),
            get: Box::new(get),
            set,
            presence,
            validators: ValidatorChain::new(),
            codec: None,
            null_value: None,
            write_default_as: None,
        }
    }

    /// Field that must be present.
    pub fn mandatory(
        name: impl Into<String>,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut T, F) + Send + Sync + 'static,
    ) -> Self {
        Self::with_presence(name, get, Some(Arc::new(set)), Presence::Mandatory)
    }

    /// Field that may be absent; when absent it keeps its current value.
    pub fn optional_no_default(
        name: impl Into<String>,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut T, F) + Send + Sync + 'static,
    ) -> Self {
        Self::with_presence(name, get, Some(Arc::new(set)), Presence::OptionalNoDefault)
    }

    /// Field that is written but never read.
    pub fn readonly(
        name: impl Into<String>,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
    ) -> Self {
        Self::with_presence(name, get, None, Presence::OptionalNoDefault)
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

    /// Write policy for this field when its value equals the default,
    /// overriding the schema's.
    pub fn write_default_as(mut self, policy: DefaultWritePolicy) -> Self {
        self.write_default_as = Some(policy);
        self
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T: 'static, F: Clone + PartialEq + Send + Sync + 'static> FieldSpec<T, F> {
    /// Field that takes `default` when absent or `null`.
    pub fn optional(
        name: impl Into<String>,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut T, F) + Send + Sync + 'static,
        default: F,
    ) -> Self {
        let baseline = default.clone();
        let presence = Presence::Optional {
            default: Arc::new(move || default.clone()),
            is_default: Box::new(move |value: &F| *value == baseline),
        };
        Self::with_presence(name, get, Some(Arc::new(set)), presence)
    }
}

impl<T: 'static, G: 'static> FieldSpec<T, Option<G>> {
    /// `Option` field: absent or `null` reads as `None`.
    pub fn optional_null(
        name: impl Into<String>,
        get: impl Fn(&T) -> &Option<G> + Send + Sync + 'static,
        set: impl Fn(&mut T, Option<G>) + Send + Sync + 'static,
    ) -> Self {
        let presence = Presence::Optional {
            default: Arc::new(|| None),
            is_default: Box::new(Option::is_none),
        };
        Self::with_presence(name, get, Some(Arc::new(set)), presence)
    }
}

impl<T: 'static, F: Default + 'static> FieldSpec<T, F> {
    /// Read an explicit `null` as `F::default()`.
    pub fn null_as_default(mut self) -> Self {
        self.null_value = Some(Arc::new(F::default));
        self
    }
}

/// A field with its codec resolved, type-erased over the field type.
trait FieldBinding<T>: Send + Sync {
    fn name(&self) -> &str;

    fn read(&self, object: &Value, acc: &mut PathAccumulator) -> Result<Option<Assignment<T>>, Recorded>;

    fn write(
        &self,
        source: &T,
        policy: DefaultWritePolicy,
        out: &mut Vec<(String, Value)>,
    ) -> Result<(), WriteError>;
}

struct BoundField<T, F> {
    spec: FieldSpec<T, F>,
    codec: SharedCodec<F>,
}

impl<T: 'static, F: 'static> BoundField<T, F> {
    fn read_value(
        &self,
        set: &Setter<T, F>,
        object: &Value,
        acc: &mut PathAccumulator,
    ) -> Result<Option<Assignment<T>>, Recorded> {
        let assign = |value: F| -> Assignment<T> {
            let set = Arc::clone(set);
            Box::new(move |target: &mut T| set(target, value))
        };

        let node = match (object.object_member(&self.spec.name), &self.spec.presence) {
            (None, Presence::Mandatory) => return Err(acc.record(ErrorKind::MissingRequiredField)),
            (None, Presence::OptionalNoDefault) => return Ok(None),
            (None, Presence::Optional { default, .. }) => return Ok(Some(assign(default()))),
            (Some(node), Presence::Optional { default, .. }) if node.is_null() => {
                return Ok(Some(assign(default())))
            }
            (Some(node), _) => node,
        };

        if node.is_null() {
            if let Some(null_value) = &self.spec.null_value {
                return Ok(Some(assign(null_value())));
            }
        }

        let value = self.codec.read(node, acc)?;
        if let Err(message) = self.spec.validators.validate(&value) {
            return Err(acc.record(ErrorKind::ValidationFailed(message)));
        }
        Ok(Some(assign(value)))
    }
}

impl<T: 'static, F: 'static> FieldBinding<T> for BoundField<T, F> {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn read(&self, object: &Value, acc: &mut PathAccumulator) -> Result<Option<Assignment<T>>, Recorded> {
        let Some(set) = &self.spec.set else {
            return Ok(None);
        };
        acc.scoped(Segment::field(self.spec.name.as_str()), |acc| {
            self.read_value(set, object, acc)
        })
    }

    fn write(
        &self,
        source: &T,
        policy: DefaultWritePolicy,
        out: &mut Vec<(String, Value)>,
    ) -> Result<(), WriteError> {
        let value = (self.spec.get)(source);
        if let Presence::Optional { is_default, .. } = &self.spec.presence {
            if is_default(value) {
                match self.spec.write_default_as.unwrap_or(policy) {
                    DefaultWritePolicy::Omit => return Ok(()),
                    DefaultWritePolicy::Null => {
                        out.push((self.spec.name.clone(), Value::make_null()));
                        return Ok(());
                    }
                    DefaultWritePolicy::Value => {}
                }
            }
        }
        let node = self
            .codec
            .write(value)
            .map_err(|e| e.within(&Segment::field(self.spec.name.as_str())))?;
        out.push((self.spec.name.clone(), node));
        Ok(())
    }
}

// ─── Schema ─────────────────────────────────────────────────────────

/// Ordered field bindings for `T`. Immutable once built.
pub struct Schema<T> {
    name: String,
    fields: Vec<Box<dyn FieldBinding<T>>>,
    options: BindOptions,
}

impl<T: 'static> Schema<T> {
    /// Start a schema whose codecs come from the global registry.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder<'static, T> {
        SchemaBuilder::new(name, registry::global())
    }

    /// Start a schema whose codecs come from `registry`.
    pub fn builder_with(name: impl Into<String>, registry: &CodecRegistry) -> SchemaBuilder<'_, T> {
        SchemaBuilder::new(name, registry)
    }

    /// Schema name, used in logs and setup errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name()).collect()
    }

    /// Whether the schema declares a field called `name`.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name() == name)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Options the schema was built with.
    pub fn options(&self) -> &BindOptions {
        &self.options
    }

    /// Read every field of `node`, staging the assignments. Fails if any
    /// field failed; all failures are recorded in `acc`.
    pub fn read_assignments(
        &self,
        node: &Value,
        acc: &mut PathAccumulator,
    ) -> Result<Vec<Assignment<T>>, Recorded> {
        acc.guard_depth()?;
        if node.node_kind() != NodeKind::Object {
            return Err(acc.record(ErrorKind::malformed("object", node.node_kind())));
        }
        let mut assignments = Vec::with_capacity(self.fields.len());
        let mut failure = None;
        for field in &self.fields {
            match field.read(node, acc) {
                Ok(Some(assignment)) => assignments.push(assignment),
                Ok(None) => {}
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
        let mut acc = PathAccumulator::with_max_depth(self.options.max_depth);
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

    /// Render `value` as an object with fields in declaration order.
    pub fn write(&self, value: &T) -> Result<Value, WriteError> {
        let mut members = Vec::with_capacity(self.fields.len() + 1);
        self.write_members(value, &mut members)?;
        Ok(Value::make_object(members))
    }

    /// Append the members of `value` to `out`.
    pub fn write_members(&self, value: &T, out: &mut Vec<(String, Value)>) -> Result<(), WriteError> {
        for field in &self.fields {
            field.write(value, self.options.default_write_policy, out)?;
        }
        Ok(())
    }

    fn failed(&self, acc: PathAccumulator) -> ReadError {
        tracing::trace!(schema = %self.name, errors = acc.error_count(), "read failed");
        acc.into_read_error()
    }
}

impl<T: Default + 'static> Schema<T> {
    /// Read a new `T` from `node`, starting from `T::default()`.
    pub fn read(&self, node: &Value) -> Result<T, ReadError> {
        let mut acc = PathAccumulator::with_max_depth(self.options.max_depth);
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

impl<T> std::fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields.iter().map(|b| b.name()).collect::<Vec<_>>())
            .field("options", &self.options)
            .finish()
    }
}

/// Collects field declarations for a [`Schema`].
pub struct SchemaBuilder<'r, T> {
    name: String,
    registry: &'r CodecRegistry,
    options: BindOptions,
    fields: Vec<Box<dyn FieldBinding<T>>>,
    names: HashSet<String>,
    error: Option<SetupError>,
}

impl<'r, T: 'static> SchemaBuilder<'r, T> {
    fn new(name: impl Into<String>, registry: &'r CodecRegistry) -> Self {
        Self {
            name: name.into(),
            registry,
            options: BindOptions::default(),
            fields: Vec::new(),
            names: HashSet::new(),
            error: None,
        }
    }

    /// Replace the schema options.
    pub fn with_options(mut self, options: BindOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the write policy for optional fields equal to their default.
    pub fn default_write_policy(mut self, policy: DefaultWritePolicy) -> Self {
        self.options.default_write_policy = policy;
        self
    }

    /// Add a field whose codec is resolved through the registry.
    pub fn field<F: Codable>(self, spec: FieldSpec<T, F>) -> Self {
        let codec = match &spec.codec {
            Some(codec) => Arc::clone(codec),
            None => self.registry.codec_for::<F>(),
        };
        self.bind(spec, codec)
    }

    /// Add a field of a type without a built-in codec. The codec comes from
    /// the field's own codec or a registry override.
    pub fn field_registered<F: 'static>(mut self, spec: FieldSpec<T, F>) -> Self {
        let codec = spec.codec.clone().or_else(|| self.registry.lookup::<F>());
        match codec {
            Some(codec) => self.bind(spec, codec),
            None => {
                if self.error.is_none() {
                    self.error = Some(SetupError::MissingCodec {
                        field: spec.name,
                        type_name: std::any::type_name::<F>().to_string(),
                    });
                }
                self
            }
        }
    }

    /// Shorthand for a mandatory field.
    pub fn mandatory<F: Codable>(
        self,
        name: impl Into<String>,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut T, F) + Send + Sync + 'static,
    ) -> Self {
        self.field(FieldSpec::mandatory(name, get, set))
    }

    /// Shorthand for an optional field with a default.
    pub fn optional<F: Codable + Clone + PartialEq>(
        self,
        name: impl Into<String>,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut T, F) + Send + Sync + 'static,
        default: F,
    ) -> Self {
        self.field(FieldSpec::optional(name, get, set, default))
    }

    /// Shorthand for an `Option` field that reads absent or `null` as `None`.
    pub fn optional_null<G: Codable>(
        self,
        name: impl Into<String>,
        get: impl Fn(&T) -> &Option<G> + Send + Sync + 'static,
        set: impl Fn(&mut T, Option<G>) + Send + Sync + 'static,
    ) -> Self {
        self.field(FieldSpec::optional_null(name, get, set))
    }

    /// Shorthand for an optional field without a default.
    pub fn optional_no_default<F: Codable>(
        self,
        name: impl Into<String>,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut T, F) + Send + Sync + 'static,
    ) -> Self {
        self.field(FieldSpec::optional_no_default(name, get, set))
    }

    /// Shorthand for a write-only field.
    pub fn readonly<F: Codable>(
        self,
        name: impl Into<String>,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
    ) -> Self {
        self.field(FieldSpec::readonly(name, get))
    }

    fn bind<F: 'static>(mut self, spec: FieldSpec<T, F>, codec: SharedCodec<F>) -> Self {
        if self.error.is_some() {
            return self;
        }
        if !self.names.insert(spec.name.clone()) {
            self.error = Some(SetupError::DuplicateField {
                schema: self.name.clone(),
                field: spec.name,
            });
            return self;
        }
        self.fields.push(Box::new(BoundField { spec, codec }));
        self
    }

    /// Finish the schema. Fails on the first setup error.
    pub fn build(self) -> Result<Schema<T>, SetupError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.options.check()?;
        tracing::debug!(schema = %self.name, fields = self.fields.len(), "built schema");
        Ok(Schema {
            name: self.name,
            fields: self.fields,
            options: self.options,
        })
    }
}

// ─── Nested Objects ─────────────────────────────────────────────────

/// Codec for a nested schema-bound object.
pub struct ObjectCodec<T: 'static> {
    schema: SchemaRef<T>,
}

impl<T: 'static> ObjectCodec<T> {
    /// Codec backed by `schema`.
    pub fn new(schema: impl Into<SchemaRef<T>>) -> Self {
        Self {
            schema: schema.into(),
        }
    }

    /// Codec backed by a schema that is looked up on each use. Needed for
    /// types that contain themselves.
    pub fn deferred(schema: fn() -> &'static Schema<T>) -> Self {
        Self {
            schema: Handle::Deferred(schema),
        }
    }

    /// Codec owning `schema`, ready to attach to a field.
    pub fn shared(schema: Schema<T>) -> SharedCodec<T>
    where
        T: Default,
    {
        Arc::new(Self::new(Arc::new(schema)))
    }
}

impl<T: Default + 'static> Codec<T> for ObjectCodec<T> {
    fn read(&self, node: &Value, acc: &mut PathAccumulator) -> Result<T, Recorded> {
        self.schema.read_with(node, acc)
    }

    fn write(&self, value: &T) -> Result<Value, WriteError> {
        self.schema.write(value)
    }

    fn depth_limit(&self) -> Option<usize> {
        Some(self.schema.options().max_depth)
    }
}

/// Types bound by a process-wide schema.
///
/// Implementors usually keep the schema in a `static OnceLock` and make the
/// type usable as a field with [`impl_dto_codable!`](crate::impl_dto_codable).
pub trait Dto: Default + Send + Sync + 'static {
    /// The type's schema.
    fn schema() -> &'static Schema<Self>;
}

/// Implement [`Codable`] for one or more [`Dto`] types.
#[macro_export]
macro_rules! impl_dto_codable {
    ($($t:ty),+ $(,)?) => {$(
        impl $crate::Codable for $t {
            fn default_codec(_: &$crate::CodecRegistry) -> $crate::SharedCodec<Self> {
                ::std::sync::Arc::new($crate::ObjectCodec::deferred(<$t as $crate::Dto>::schema))
            }
        }
    )+};
}
