//! # Validators — Constraints on Extracted Values
//!
//! A [`Validator<F>`] checks a value after the codec has extracted it and
//! returns a human-readable message on rejection. Fields hold a
//! [`ValidatorChain`]: validators run in declaration order and the first
//! rejection stops the chain; the field then reports exactly one
//! [`ValidationFailed`](jdto_core::ErrorKind::ValidationFailed) error.
//!
//! Any `Fn(&F) -> Result<(), String>` closure is a validator. The ready-made
//! ones cover the common cases:
//!
//! | Validator | Accepts |
//! |-----------|---------|
//! | [`min_max`] | numbers in `[min, max]` |
//! | [`one_of`] | one of a fixed list of values |
//! | [`non_negative`] | numbers `>= 0` |
//! | [`non_empty`] | non-empty strings and sequences |
//! | [`max_len`] | strings (in chars) and sequences up to a length |
//!
//! [`each`] lifts a validator to every element of a `Vec`, and
//! [`if_present`] to the `Some` value of an `Option`.

use std::fmt::Display;

use jdto_core::SetupError;

/// A constraint on an extracted value.
pub trait Validator<F>: Send + Sync {
    /// `Err(message)` when `value` is rejected.
    fn validate(&self, value: &F) -> Result<(), String>;
}

impl<F, C> Validator<F> for C
where
    C: Fn(&F) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, value: &F) -> Result<(), String> {
        self(value)
    }
}

/// Ordered validators for one field.
pub struct ValidatorChain<F> {
    validators: Vec<Box<dyn Validator<F>>>,
}

impl<F> Default for ValidatorChain<F> {
    fn default() -> Self {
        Self {
            validators: Vec::new(),
        }
    }
}

impl<F> ValidatorChain<F> {
    /// Empty chain; accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a validator.
    pub fn push(&mut self, validator: impl Validator<F> + 'static) {
        self.validators.push(Box::new(validator));
    }

    /// Number of validators.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether the chain has no validators.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Run validators in order, stopping at the first rejection.
    pub fn validate(&self, value: &F) -> Result<(), String> {
        self.validators.iter().try_for_each(|v| v.validate(value))
    }
}

// ─── Ready-made Validators ──────────────────────────────────────────

/// Inclusive numeric range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMax<N> {
    min: N,
    max: N,
}

/// Accept values in `[min, max]`. Fails when `min > max`.
pub fn min_max<N: PartialOrd + Display>(min: N, max: N) -> Result<MinMax<N>, SetupError> {
    if min > max {
        return Err(SetupError::InvalidValidator(format!(
            "invalid min-max validator: max_value {max} cannot be less than min_value {min}"
        )));
    }
    Ok(MinMax { min, max })
}

impl<N> Validator<N> for MinMax<N>
where
    N: PartialOrd + Display + Send + Sync,
{
    fn validate(&self, value: &N) -> Result<(), String> {
        if *value < self.min || *value > self.max {
            return Err(format!(
                "invalid value: {value}, must be in [ {}, {} ]",
                self.min, self.max
            ));
        }
        Ok(())
    }
}

/// Membership in a fixed list.
#[derive(Debug, Clone, PartialEq)]
pub struct OneOf<F> {
    values: Vec<F>,
}

/// Accept only the listed values.
pub fn one_of<F: PartialEq>(values: impl IntoIterator<Item = F>) -> OneOf<F> {
    OneOf {
        values: values.into_iter().collect(),
    }
}

impl<F: PartialEq + Send + Sync> Validator<F> for OneOf<F> {
    fn validate(&self, value: &F) -> Result<(), String> {
        if self.values.contains(value) {
            Ok(())
        } else {
            Err("invalid value, must be one of predefined values".to_string())
        }
    }
}

/// Numbers greater than or equal to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NonNegative;

/// Accept numbers `>= 0`.
pub fn non_negative() -> NonNegative {
    NonNegative
}

impl<N> Validator<N> for NonNegative
where
    N: PartialOrd + Default + Display + Send + Sync,
{
    fn validate(&self, value: &N) -> Result<(), String> {
        if *value < N::default() {
            return Err(format!("invalid value: {value}, must be non-negative"));
        }
        Ok(())
    }
}

/// Values with a length.
pub trait Measured {
    /// Length used by [`non_empty`] and [`max_len`]: chars for strings,
    /// elements for sequences.
    fn measure(&self) -> usize;
}

impl Measured for String {
    fn measure(&self) -> usize {
        self.chars().count()
    }
}

impl<T> Measured for Vec<T> {
    fn measure(&self) -> usize {
        self.len()
    }
}

/// Non-empty strings and sequences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NonEmpty;

/// Reject empty strings and sequences.
pub fn non_empty() -> NonEmpty {
    NonEmpty
}

impl<F: Measured> Validator<F> for NonEmpty {
    fn validate(&self, value: &F) -> Result<(), String> {
        if value.measure() == 0 {
            return Err("invalid value: must not be empty".to_string());
        }
        Ok(())
    }
}

/// Upper bound on length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxLen(usize);

/// Reject strings and sequences longer than `limit`.
pub fn max_len(limit: usize) -> MaxLen {
    MaxLen(limit)
}

impl<F: Measured> Validator<F> for MaxLen {
    fn validate(&self, value: &F) -> Result<(), String> {
        let len = value.measure();
        if len > self.0 {
            return Err(format!(
                "invalid length: {len}, must be at most {}",
                self.0
            ));
        }
        Ok(())
    }
}

/// Applies a validator to every element of a `Vec`.
#[derive(Debug, Clone, Copy)]
pub struct Each<V>(V);

/// Lift `validator` to sequences; the first rejected element fails the
/// whole value.
pub fn each<V>(validator: V) -> Each<V> {
    Each(validator)
}

impl<F, V: Validator<F>> Validator<Vec<F>> for Each<V> {
    fn validate(&self, values: &Vec<F>) -> Result<(), String> {
        values.iter().try_for_each(|v| self.0.validate(v))
    }
}

/// Applies a validator to the `Some` value of an `Option`.
#[derive(Debug, Clone, Copy)]
pub struct IfPresent<V>(V);

/// Lift `validator` to optionals; `None` always passes.
pub fn if_present<V>(validator: V) -> IfPresent<V> {
    IfPresent(validator)
}

impl<F, V: Validator<F>> Validator<Option<F>> for IfPresent<V> {
    fn validate(&self, value: &Option<F>) -> Result<(), String> {
        match value {
            Some(inner) => self.0.validate(inner),
            None => Ok(()),
        }
    }
}
