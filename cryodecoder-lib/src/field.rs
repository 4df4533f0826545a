//! Field value decoding.
//!
//! Integers are 1 to 8 bytes, signed integers are sign-extended from their width, and
//! floats are IEEE-754 single precision.
use serde::Serialize;

use crate::error::FieldDecodeError;
use crate::schema::{ByteOrder, FieldKind, FieldSpec, FieldTable};
use crate::{Error, Result};

const MAX_INT_WIDTH: usize = 8;

/// Decode an unsigned integer from all of `dat`.
///
/// # Errors
/// [FieldDecodeError::UnsupportedWidth] if `dat` is empty or longer than 8 bytes.
pub fn decode_uint(dat: &[u8], byte_order: ByteOrder) -> std::result::Result<u64, FieldDecodeError> {
    if dat.is_empty() || dat.len() > MAX_INT_WIDTH {
        return Err(FieldDecodeError::UnsupportedWidth {
            width: dat.len(),
            encoding: "integer",
        });
    }
    let mut buf = [0u8; MAX_INT_WIDTH];
    let x = match byte_order {
        ByteOrder::Big => {
            buf[MAX_INT_WIDTH - dat.len()..].copy_from_slice(dat);
            u64::from_be_bytes(buf)
        }
        ByteOrder::Little => {
            buf[..dat.len()].copy_from_slice(dat);
            u64::from_le_bytes(buf)
        }
    };
    Ok(x)
}

/// Decode a two's-complement integer from all of `dat`.
///
/// # Errors
/// See [decode_uint].
pub fn decode_int(dat: &[u8], byte_order: ByteOrder) -> std::result::Result<i64, FieldDecodeError> {
    let x = decode_uint(dat, byte_order)?;
    let shift = 64 - 8 * dat.len() as u32;
    // move the sign bit to bit 63 then arithmetic shift back to extend it
    Ok(((x << shift) as i64) >> shift)
}

/// Decode an IEEE-754 single precision float.
///
/// # Errors
/// [FieldDecodeError::LengthMismatch] if `dat` is not exactly 4 bytes.
pub fn decode_float32(
    dat: &[u8],
    byte_order: ByteOrder,
) -> std::result::Result<f32, FieldDecodeError> {
    let buf: [u8; 4] = dat
        .try_into()
        .map_err(|_| FieldDecodeError::LengthMismatch {
            expected: 4,
            actual: dat.len(),
        })?;
    Ok(match byte_order {
        ByteOrder::Big => f32::from_be_bytes(buf),
        ByteOrder::Little => f32::from_le_bytes(buf),
    })
}

/// A decoded field value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Unsigned(u64),
    Signed(i64),
    Float(f32),
}

impl FieldValue {
    /// Integer value, or `None` for floats.
    #[must_use]
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            FieldValue::Unsigned(x) => Some(i128::from(x)),
            FieldValue::Signed(x) => Some(i128::from(x)),
            FieldValue::Float(_) => None,
        }
    }

    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            FieldValue::Float(x) => Some(x),
            _ => None,
        }
    }
}

/// Decode the field described by `spec` from `segment`.
///
/// # Errors
/// [FieldDecodeError::LengthMismatch] if the segment ends before the field does.
pub fn decode_field(
    segment: &[u8],
    spec: &FieldSpec,
) -> std::result::Result<FieldValue, FieldDecodeError> {
    let range = spec.range();
    let Some(dat) = segment.get(range.clone()) else {
        return Err(FieldDecodeError::LengthMismatch {
            expected: spec.width(),
            actual: segment.len().saturating_sub(range.start),
        });
    };
    let value = match spec.kind() {
        FieldKind::Integer {
            signed: false,
            byte_order,
        } => FieldValue::Unsigned(decode_uint(dat, byte_order)?),
        FieldKind::Integer {
            signed: true,
            byte_order,
        } => FieldValue::Signed(decode_int(dat, byte_order)?),
        FieldKind::Float32 { byte_order } => FieldValue::Float(decode_float32(dat, byte_order)?),
    };
    Ok(value)
}

/// Values of every field in a [FieldTable], in table order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fields<'t> {
    values: Vec<(&'t str, FieldValue)>,
}

impl<'t> Fields<'t> {
    /// Decode every field of `table` from `segment`. The first field that fails aborts
    /// the whole decode.
    ///
    /// # Errors
    /// [Error::FieldDecode] naming the field that failed.
    pub fn decode(segment: &[u8], table: &'t FieldTable) -> Result<Self> {
        let values = table
            .iter()
            .map(|(name, spec)| {
                decode_field(segment, spec)
                    .map(|value| (name, value))
                    .map_err(|source| Error::FieldDecode {
                        name: name.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { values })
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.values
            .iter()
            .find_map(|(n, value)| (*n == name).then_some(*value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'t str, FieldValue)> + '_ {
        self.values.iter().copied()
    }

    fn require(&self, name: &str) -> Result<FieldValue> {
        self.get(name)
            .ok_or_else(|| Error::MissingField(name.to_string()))
    }

    /// Integer field `name` converted to `T`.
    ///
    /// # Errors
    /// [Error::MissingField], [Error::FieldType] if the field is a float, or
    /// [Error::FieldRange] if the value does not fit in `T`.
    pub fn integer<T: TryFrom<i128>>(&self, name: &str) -> Result<T> {
        let value = self
            .require(name)?
            .as_integer()
            .ok_or_else(|| Error::FieldType {
                name: name.to_string(),
                expected: "an integer",
            })?;
        T::try_from(value).map_err(|_| Error::FieldRange {
            name: name.to_string(),
            value,
        })
    }

    /// Float field `name`.
    ///
    /// # Errors
    /// [Error::MissingField] or [Error::FieldType] if the field is an integer.
    pub fn float(&self, name: &str) -> Result<f32> {
        self.require(name)?.as_f32().ok_or_else(|| Error::FieldType {
            name: name.to_string(),
            expected: "a float",
        })
    }
}
