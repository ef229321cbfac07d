//! # Primitive Codecs
//!
//! Strict codecs for booleans, integers, floats, strings and raw JSON values.
//!
//! ## Invariants
//!
//! - No coercion between kinds: `"1"` is not an integer and `1` is not a
//!   boolean.
//! - Integers must be integral JSON numbers (`1.0` is rejected for `i32`).
//!   A number outside the declared width, or a negative number for an
//!   unsigned type, is [`ErrorKind::OutOfRange`]. This includes integral
//!   numbers too large for serde_json to hold as an integer
//!   (`18446744073709551616`, `1e30`).
//! - Every integer is also a valid float; `f32` rejects magnitudes beyond
//!   `f32::MAX`.
//! - Non-finite floats are written as `null`.

use std::marker::PhantomData;
use std::sync::Arc;

use jdto_core::{ErrorKind, Node, NodeKind, PathAccumulator, Recorded, WriteError};
use serde_json::{Number, Value};

use crate::codec::{recorded, Codable, Codec, SharedCodec};
use crate::registry::CodecRegistry;

/// `true` / `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolCodec;

impl Codec<bool> for BoolCodec {
    fn read(&self, node: &Value, acc: &mut PathAccumulator) -> Result<bool, Recorded> {
        recorded(acc, node.bool_value())
    }

    fn write(&self, value: &bool) -> Result<Value, WriteError> {
        Ok(Value::make_bool(*value))
    }
}

impl Codable for bool {
    fn default_codec(_: &CodecRegistry) -> SharedCodec<Self> {
        Arc::new(BoolCodec)
    }
}

/// Fixed-width integer with range checking.
#[derive(Debug)]
pub struct IntegerCodec<N>(PhantomData<fn() -> N>);

impl<N> Default for IntegerCodec<N> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

/// Width-specific conversions used by [`IntegerCodec`].
pub trait Integer: Copy + Send + Sync + 'static {
    /// Type name used in error messages.
    const NAME: &'static str;

    /// Narrow a JSON integer.
    fn from_number(n: &Number) -> Result<Self, ErrorKind>;

    /// Widen to a JSON number.
    fn to_number(self) -> Number;
}

/// serde_json stores integers beyond 64 bits, and any exponent or fraction
/// form, as `f64`. Such a number is out of range when it is integral and
/// falls outside `[min, max_exclusive)`; otherwise it has the wrong form.
fn integral(n: &Number, target: &str, min: f64, max_exclusive: f64) -> Result<(), ErrorKind> {
    if !n.is_f64() {
        return Ok(());
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && !(min <= f && f < max_exclusive) => {
            Err(ErrorKind::out_of_range(target, n))
        }
        _ => Err(ErrorKind::type_mismatch(target, NodeKind::Number)),
    }
}

macro_rules! signed_integer {
    ($($t:ty),*) => {$(
        impl Integer for $t {
            const NAME: &'static str = stringify!($t);

            fn from_number(n: &Number) -> Result<Self, ErrorKind> {
                integral(n, Self::NAME, <$t>::MIN as f64, <$t>::MAX as f64 + 1.0)?;
                match n.as_i64() {
                    Some(v) => <$t>::try_from(v).map_err(|_| ErrorKind::out_of_range(Self::NAME, n)),
                    None => Err(ErrorKind::out_of_range(Self::NAME, n)),
                }
            }

            fn to_number(self) -> Number {
                Number::from(self as i64)
            }
        }
    )*};
}

macro_rules! unsigned_integer {
    ($($t:ty),*) => {$(
        impl Integer for $t {
            const NAME: &'static str = stringify!($t);

            fn from_number(n: &Number) -> Result<Self, ErrorKind> {
                integral(n, Self::NAME, <$t>::MIN as f64, <$t>::MAX as f64 + 1.0)?;
                match n.as_u64() {
                    Some(v) => <$t>::try_from(v).map_err(|_| ErrorKind::out_of_range(Self::NAME, n)),
                    None => Err(ErrorKind::out_of_range(Self::NAME, n)),
                }
            }

            fn to_number(self) -> Number {
                Number::from(self as u64)
            }
        }
    )*};
}

signed_integer!(i8, i16, i32, i64, isize);
unsigned_integer!(u8, u16, u32, u64, usize);

impl<N: Integer> Codec<N> for IntegerCodec<N> {
    fn read(&self, node: &Value, acc: &mut PathAccumulator) -> Result<N, Recorded> {
        let n = recorded(acc, node.number_value())?;
        recorded(acc, N::from_number(n))
    }

    fn write(&self, value: &N) -> Result<Value, WriteError> {
        Ok(Value::make_number(value.to_number()))
    }
}

macro_rules! codable_integer {
    ($($t:ty),*) => {$(
        impl Codable for $t {
            fn default_codec(_: &CodecRegistry) -> SharedCodec<Self> {
                Arc::new(IntegerCodec::<$t>::default())
            }
        }
    )*};
}

codable_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Double-precision float. Accepts any JSON number.
#[derive(Debug, Clone, Copy, Default)]
pub struct F64Codec;

impl Codec<f64> for F64Codec {
    fn read(&self, node: &Value, acc: &mut PathAccumulator) -> Result<f64, Recorded> {
        let n = recorded(acc, node.number_value())?;
        // Only non-finite values lack an f64 form, and serde_json never
        // produces them.
        recorded(acc, n.as_f64().ok_or_else(|| ErrorKind::out_of_range("f64", n)))
    }

    fn write(&self, value: &f64) -> Result<Value, WriteError> {
        Ok(Value::make_f64(*value))
    }
}

/// Single-precision float.
#[derive(Debug, Clone, Copy, Default)]
pub struct F32Codec;

impl Codec<f32> for F32Codec {
    fn read(&self, node: &Value, acc: &mut PathAccumulator) -> Result<f32, Recorded> {
        let wide = F64Codec.read(node, acc)?;
        if wide.abs() > f64::from(f32::MAX) {
            return Err(acc.record(ErrorKind::out_of_range("f32", wide)));
        }
        Ok(wide as f32)
    }

    fn write(&self, value: &f32) -> Result<Value, WriteError> {
        Ok(Value::make_f64(f64::from(*value)))
    }
}

impl Codable for f64 {
    fn default_codec(_: &CodecRegistry) -> SharedCodec<Self> {
        Arc::new(F64Codec)
    }
}

impl Codable for f32 {
    fn default_codec(_: &CodecRegistry) -> SharedCodec<Self> {
        Arc::new(F32Codec)
    }
}

/// UTF-8 string.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl Codec<String> for StringCodec {
    fn read(&self, node: &Value, acc: &mut PathAccumulator) -> Result<String, Recorded> {
        recorded(acc, node.string_value()).map(str::to_owned)
    }

    fn write(&self, value: &String) -> Result<Value, WriteError> {
        Ok(Value::make_string(value.clone()))
    }
}

impl Codable for String {
    fn default_codec(_: &CodecRegistry) -> SharedCodec<Self> {
        Arc::new(StringCodec)
    }
}

/// Any node, copied as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl Codec<Value> for RawCodec {
    fn read(&self, node: &Value, _: &mut PathAccumulator) -> Result<Value, Recorded> {
        Ok(node.clone())
    }

    fn write(&self, value: &Value) -> Result<Value, WriteError> {
        Ok(value.clone())
    }
}

impl Codable for Value {
    fn default_codec(_: &CodecRegistry) -> SharedCodec<Self> {
        Arc::new(RawCodec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read<T: Codable>(node: Value) -> Result<T, ErrorKind> {
        let codec = CodecRegistry::new().codec_for::<T>();
        let mut acc = PathAccumulator::new();
        codec
            .read(&node, &mut acc)
            .map_err(|_| acc.errors()[0].kind.clone())
    }

    #[test]
    fn test_bool_strict() {
        assert_eq!(read::<bool>(json!(false)), Ok(false));
        assert_eq!(
            read::<bool>(json!(1)),
            Err(ErrorKind::type_mismatch("bool", NodeKind::Number))
        );
    }

    #[test]
    fn test_integer_rejects_string_and_fraction() {
        assert_eq!(read::<i32>(json!(-7)), Ok(-7));
        assert_eq!(read::<i32>(json!("7")).unwrap_err().code(), "type_mismatch");
        assert_eq!(
            read::<i32>(json!(1.5)),
            Err(ErrorKind::type_mismatch("i32", NodeKind::Number))
        );
        assert_eq!(read::<u8>(json!(1.0)).unwrap_err().code(), "type_mismatch");
    }

    #[test]
    fn test_integer_width_boundaries() {
        assert_eq!(read::<i8>(json!(127)), Ok(127));
        assert_eq!(read::<i8>(json!(-128)), Ok(-128));
        assert_eq!(read::<i8>(json!(128)), Err(ErrorKind::out_of_range("i8", 128)));
        assert_eq!(read::<i16>(json!(-32769)).unwrap_err().code(), "out_of_range");
        assert_eq!(read::<u64>(json!(u64::MAX)), Ok(u64::MAX));
        assert_eq!(read::<i64>(json!(u64::MAX)).unwrap_err().code(), "out_of_range");
    }

    #[test]
    fn test_integer_overflowing_u64_is_out_of_range() {
        let past_u64: Value = serde_json::from_str("18446744073709551616").unwrap();
        assert_eq!(read::<u64>(past_u64.clone()).unwrap_err().code(), "out_of_range");
        assert_eq!(read::<i64>(past_u64).unwrap_err().code(), "out_of_range");
        let huge: Value = serde_json::from_str("-1e30").unwrap();
        assert_eq!(read::<i32>(huge).unwrap_err().code(), "out_of_range");
        assert_eq!(read::<u8>(json!(300.0)).unwrap_err().code(), "out_of_range");
        // In range but written in float form.
        let exp: Value = serde_json::from_str("1e3").unwrap();
        assert_eq!(
            read::<u32>(exp),
            Err(ErrorKind::type_mismatch("u32", NodeKind::Number))
        );
    }

    #[test]
    fn test_unsigned_rejects_negative() {
        assert_eq!(read::<u32>(json!(-1)), Err(ErrorKind::out_of_range("u32", -1)));
        assert_eq!(read::<usize>(json!(0)), Ok(0));
    }

    #[test]
    fn test_float_accepts_integers() {
        assert_eq!(read::<f64>(json!(3)), Ok(3.0));
        assert_eq!(read::<f64>(json!(-0.25)), Ok(-0.25));
        assert_eq!(read::<f32>(json!(1.5)), Ok(1.5));
        assert_eq!(read::<f32>(json!(1e300)).unwrap_err().code(), "out_of_range");
        assert!(read::<f64>(json!("1.0")).is_err());
    }

    #[test]
    fn test_float_write_non_finite_is_null() {
        assert_eq!(F64Codec.write(&f64::NAN).unwrap(), Value::Null);
        assert_eq!(F32Codec.write(&f32::INFINITY).unwrap(), Value::Null);
        assert_eq!(F64Codec.write(&2.5).unwrap(), json!(2.5));
    }

    #[test]
    fn test_string_and_raw() {
        assert_eq!(read::<String>(json!("héllo")), Ok("héllo".to_string()));
        assert!(read::<String>(json!(null)).is_err());
        assert_eq!(read::<Value>(json!({"a": [1]})), Ok(json!({"a": [1]})));
    }
}
