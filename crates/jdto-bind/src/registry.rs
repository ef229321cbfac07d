//! # Codec Registry — Type-Keyed Codec Overrides
//!
//! Maps a native type to the codec used for it when a schema field does not
//! name one explicitly. Lookups consult the registered overrides first and
//! fall back to the type's [`Codable::default_codec`].
//!
//! ## Lifecycle
//!
//! A registry is assembled with [`RegistryBuilder`] and is immutable once
//! built. The process-wide instance returned by [`global`] is frozen on first
//! use: [`CodecRegistry::install_global`] only succeeds before any schema has
//! resolved a codec through it. After that, concurrent lookups need no
//! locking.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use jdto_core::SetupError;

use crate::codec::{Codable, Codec, SharedCodec};

struct Entry {
    type_name: &'static str,
    codec: Box<dyn Any + Send + Sync>,
}

/// Immutable set of codec overrides, keyed by native type.
#[derive(Default)]
pub struct CodecRegistry {
    overrides: HashMap<TypeId, Entry>,
}

static GLOBAL: OnceLock<CodecRegistry> = OnceLock::new();

/// The process-wide registry. Initializes it with the built-in codecs if
/// nothing was installed.
pub fn global() -> &'static CodecRegistry {
    GLOBAL.get_or_init(CodecRegistry::new)
}

impl CodecRegistry {
    /// Registry with built-in codecs only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start assembling a registry with overrides.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Codec for `T`: the registered override if any, otherwise the built-in.
    pub fn codec_for<T: Codable>(&self) -> SharedCodec<T> {
        self.lookup::<T>().unwrap_or_else(|| T::default_codec(self))
    }

    /// Registered override for `T`, if any.
    pub fn lookup<T: 'static>(&self) -> Option<SharedCodec<T>> {
        self.overrides
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.codec.downcast_ref::<SharedCodec<T>>())
            .cloned()
    }

    /// Whether an override is registered for `T`.
    pub fn contains<T: 'static>(&self) -> bool {
        self.overrides.contains_key(&TypeId::of::<T>())
    }

    /// Names of the types with overrides, sorted.
    pub fn registered_types(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.overrides.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        names
    }

    /// Number of overrides.
    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    /// Whether no override is registered.
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// Make this registry the process-wide one.
    ///
    /// Fails with [`SetupError::RegistryAlreadyInstalled`] once [`global`]
    /// has been initialized, either by an earlier install or by a lookup.
    pub fn install_global(self) -> Result<(), SetupError> {
        let count = self.len();
        match GLOBAL.set(self) {
            Ok(()) => {
                tracing::info!(overrides = count, "installed global codec registry");
                Ok(())
            }
            Err(_) => {
                tracing::warn!("global codec registry already initialized; install rejected");
                Err(SetupError::RegistryAlreadyInstalled)
            }
        }
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("overrides", &self.registered_types())
            .finish()
    }
}

/// Collects codec overrides for a [`CodecRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    overrides: HashMap<TypeId, Entry>,
    error: Option<SetupError>,
}

impl RegistryBuilder {
    /// Register `codec` for `T`.
    pub fn register<T: 'static>(self, codec: impl Codec<T> + 'static) -> Self {
        self.register_shared::<T>(Arc::new(codec))
    }

    /// Register an already shared codec for `T`.
    pub fn register_shared<T: 'static>(mut self, codec: SharedCodec<T>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let type_name = std::any::type_name::<T>();
        let id = TypeId::of::<T>();
        if self.overrides.contains_key(&id) {
            self.error = Some(SetupError::DuplicateCodec {
                type_name: type_name.to_string(),
            });
            return self;
        }
        self.overrides.insert(
            id,
            Entry {
                type_name,
                codec: Box::new(codec),
            },
        );
        self
    }

    /// Finish the registry. Fails on the first duplicate registration.
    pub fn build(self) -> Result<CodecRegistry, SetupError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        tracing::debug!(overrides = self.overrides.len(), "built codec registry");
        Ok(CodecRegistry {
            overrides: self.overrides,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CustomCodec;
    use jdto_core::PathAccumulator;
    use serde_json::{json, Value};

    fn string_bool() -> CustomCodec<bool> {
        CustomCodec::new(
            |node| match node.as_str() {
                Some("yes") => Ok(true),
                Some("no") => Ok(false),
                _ => Err("expected 'yes' or 'no'".to_string()),
            },
            |b| Ok(Value::String(if *b { "yes" } else { "no" }.to_string())),
        )
    }

    #[test]
    fn test_builtin_fallback() {
        let registry = CodecRegistry::new();
        assert!(registry.is_empty());
        let codec = registry.codec_for::<bool>();
        let mut acc = PathAccumulator::new();
        assert_eq!(codec.read(&json!(true), &mut acc), Ok(true));
    }

    #[test]
    fn test_override_wins() {
        let registry = CodecRegistry::builder()
            .register::<bool>(string_bool())
            .build()
            .unwrap();
        assert!(registry.contains::<bool>());
        let codec = registry.codec_for::<bool>();
        let mut acc = PathAccumulator::new();
        assert_eq!(codec.read(&json!("yes"), &mut acc), Ok(true));
        assert_eq!(codec.write(&false).unwrap(), json!("no"));
    }

    #[test]
    fn test_override_applies_inside_containers() {
        let registry = CodecRegistry::builder()
            .register::<bool>(string_bool())
            .build()
            .unwrap();
        let codec = registry.codec_for::<Vec<bool>>();
        let mut acc = PathAccumulator::new();
        assert_eq!(codec.read(&json!(["yes", "no"]), &mut acc), Ok(vec![true, false]));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let err = CodecRegistry::builder()
            .register::<bool>(string_bool())
            .register::<bool>(string_bool())
            .build()
            .unwrap_err();
        assert!(matches!(err, SetupError::DuplicateCodec { .. }));
    }

    #[test]
    fn test_install_after_use_rejected() {
        let _ = global();
        let err = CodecRegistry::new().install_global().unwrap_err();
        assert_eq!(err, SetupError::RegistryAlreadyInstalled);
    }
}
