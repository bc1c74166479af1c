use crate::{AsValue, Error, Result};
use rust_decimal::Decimal;
use std::{
    any, fmt,
    hash::{Hash, Hasher},
};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Dynamically typed column value.
///
/// Every variant wraps an `Option`: the `None` form is the typed null and doubles
/// as the type prototype used to declare what a property stores.
#[derive(Default, Debug, Clone)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int8(Option<i8>),
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    UInt8(Option<u8>),
    UInt16(Option<u16>),
    UInt32(Option<u32>),
    UInt64(Option<u64>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>, /* prec: */ u8, /* scale: */ u8),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    TimestampWithTimezone(Option<OffsetDateTime>),
    Uuid(Option<Uuid>),
    /// Text returned by a driver that did not know the column type.
    Unknown(Option<String>),
}

/// Coarse classification of the values a property can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Boolean,
    Integer,
    Float,
    Decimal,
    String,
    Binary,
    Date,
    Time,
    Timestamp,
    Uuid,
    Entity,
    Unknown,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Int8(l), Self::Int8(r)) => l == r,
            (Self::Int16(l), Self::Int16(r)) => l == r,
            (Self::Int32(l), Self::Int32(r)) => l == r,
            (Self::Int64(l), Self::Int64(r)) => l == r,
            (Self::UInt8(l), Self::UInt8(r)) => l == r,
            (Self::UInt16(l), Self::UInt16(r)) => l == r,
            (Self::UInt32(l), Self::UInt32(r)) => l == r,
            (Self::UInt64(l), Self::UInt64(r)) => l == r,
            (Self::Float32(l), Self::Float32(r)) => l == r,
            (Self::Float64(l), Self::Float64(r)) => l == r,
            (Self::Decimal(l, ..), Self::Decimal(r, ..)) => l == r,
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Blob(l), Self::Blob(r)) => l == r,
            (Self::Date(l), Self::Date(r)) => l == r,
            (Self::Time(l), Self::Time(r)) => l == r,
            (Self::Timestamp(l), Self::Timestamp(r)) => l == r,
            (Self::TimestampWithTimezone(l), Self::TimestampWithTimezone(r)) => l == r,
            (Self::Uuid(l), Self::Uuid(r)) => l == r,
            (Self::Unknown(l), Self::Unknown(r)) => l == r,
            _ => self.is_null() && other.is_null() && self.same_type(other),
        }
    }
}

/// Hashes agree with `eq`: decimals by value whatever their scale, `-0.0` as `0.0`.
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(v) => v.hash(state),
            Value::Int8(v) => v.hash(state),
            Value::Int16(v) => v.hash(state),
            Value::Int32(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            Value::UInt8(v) => v.hash(state),
            Value::UInt16(v) => v.hash(state),
            Value::UInt32(v) => v.hash(state),
            Value::UInt64(v) => v.hash(state),
            Value::Float32(v) => v.map(|v| if v == 0.0 { 0 } else { v.to_bits() }).hash(state),
            Value::Float64(v) => v.map(|v| if v == 0.0 { 0 } else { v.to_bits() }).hash(state),
            Value::Decimal(v, ..) => v.map(|v| v.normalize()).hash(state),
            Value::Varchar(v) | Value::Unknown(v) => v.hash(state),
            Value::Blob(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
            Value::Time(v) => v.hash(state),
            Value::Timestamp(v) => v.hash(state),
            Value::TimestampWithTimezone(v) => v.map(|v| v.unix_timestamp_nanos()).hash(state),
            Value::Uuid(v) => v.hash(state),
        }
    }
}

impl Eq for Value {}

impl Value {
    pub fn same_type(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Boolean(v) => v.is_none(),
            Value::Int8(v) => v.is_none(),
            Value::Int16(v) => v.is_none(),
            Value::Int32(v) => v.is_none(),
            Value::Int64(v) => v.is_none(),
            Value::UInt8(v) => v.is_none(),
            Value::UInt16(v) => v.is_none(),
            Value::UInt32(v) => v.is_none(),
            Value::UInt64(v) => v.is_none(),
            Value::Float32(v) => v.is_none(),
            Value::Float64(v) => v.is_none(),
            Value::Decimal(v, ..) => v.is_none(),
            Value::Varchar(v) => v.is_none(),
            Value::Blob(v) => v.is_none(),
            Value::Date(v) => v.is_none(),
            Value::Time(v) => v.is_none(),
            Value::Timestamp(v) => v.is_none(),
            Value::TimestampWithTimezone(v) => v.is_none(),
            Value::Uuid(v) => v.is_none(),
            Value::Unknown(v) => v.is_none(),
        }
    }

    /// The typed null of the same variant.
    pub fn as_null(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Boolean(..) => Value::Boolean(None),
            Value::Int8(..) => Value::Int8(None),
            Value::Int16(..) => Value::Int16(None),
            Value::Int32(..) => Value::Int32(None),
            Value::Int64(..) => Value::Int64(None),
            Value::UInt8(..) => Value::UInt8(None),
            Value::UInt16(..) => Value::UInt16(None),
            Value::UInt32(..) => Value::UInt32(None),
            Value::UInt64(..) => Value::UInt64(None),
            Value::Float32(..) => Value::Float32(None),
            Value::Float64(..) => Value::Float64(None),
            Value::Decimal(_, precision, scale) => Value::Decimal(None, *precision, *scale),
            Value::Varchar(..) => Value::Varchar(None),
            Value::Blob(..) => Value::Blob(None),
            Value::Date(..) => Value::Date(None),
            Value::Time(..) => Value::Time(None),
            Value::Timestamp(..) => Value::Timestamp(None),
            Value::TimestampWithTimezone(..) => Value::TimestampWithTimezone(None),
            Value::Uuid(..) => Value::Uuid(None),
            Value::Unknown(..) => Value::Unknown(None),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Value::Boolean(..) => DataType::Boolean,
            Value::Int8(..)
            | Value::Int16(..)
            | Value::Int32(..)
            | Value::Int64(..)
            | Value::UInt8(..)
            | Value::UInt16(..)
            | Value::UInt32(..)
            | Value::UInt64(..) => DataType::Integer,
            Value::Float32(..) | Value::Float64(..) => DataType::Float,
            Value::Decimal(..) => DataType::Decimal,
            Value::Varchar(..) => DataType::String,
            Value::Blob(..) => DataType::Binary,
            Value::Date(..) => DataType::Date,
            Value::Time(..) => DataType::Time,
            Value::Timestamp(..) | Value::TimestampWithTimezone(..) => DataType::Timestamp,
            Value::Uuid(..) => DataType::Uuid,
            Value::Null | Value::Unknown(..) => DataType::Unknown,
        }
    }

    /// Converts the value toward the variant of `prototype`.
    ///
    /// Nulls become the prototype's null, values already of the prototype variant are
    /// returned unchanged. A `Value::Null` prototype accepts anything.
    pub fn coerce(self, prototype: &Value) -> Result<Value> {
        if self.is_null() {
            return Ok(prototype.as_null());
        }
        if self.same_type(prototype) {
            return Ok(self);
        }
        fn convert<T: AsValue>(value: Value) -> Result<Value> {
            T::try_from_value(value).map(AsValue::as_value)
        }
        let description = format!("{self:?}");
        let result = match prototype {
            Value::Null => Ok(self),
            Value::Boolean(..) => convert::<bool>(self),
            Value::Int8(..) => convert::<i8>(self),
            Value::Int16(..) => convert::<i16>(self),
            Value::Int32(..) => convert::<i32>(self),
            Value::Int64(..) => convert::<i64>(self),
            Value::UInt8(..) => convert::<u8>(self),
            Value::UInt16(..) => convert::<u16>(self),
            Value::UInt32(..) => convert::<u32>(self),
            Value::UInt64(..) => convert::<u64>(self),
            Value::Float32(..) => convert::<f32>(self),
            Value::Float64(..) => convert::<f64>(self),
            Value::Decimal(_, precision, scale) => Decimal::try_from_value(self)
                .map(|v| Value::Decimal(Some(v), *precision, *scale)),
            Value::Varchar(..) => convert::<String>(self),
            Value::Blob(..) => convert::<Box<[u8]>>(self),
            Value::Date(..) => convert::<Date>(self),
            Value::Time(..) => convert::<Time>(self),
            Value::Timestamp(..) => convert::<PrimitiveDateTime>(self),
            Value::TimestampWithTimezone(..) => convert::<OffsetDateTime>(self),
            Value::Uuid(..) => convert::<Uuid>(self),
            Value::Unknown(..) => Ok(Value::Unknown(Some(self.to_string()))),
        };
        result.map_err(|e| {
            e.context(format!(
                "Cannot coerce {} to {}",
                description,
                prototype.type_name()
            ))
        })
    }

    /// Human readable name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(..) => any::type_name::<bool>(),
            Value::Int8(..) => any::type_name::<i8>(),
            Value::Int16(..) => any::type_name::<i16>(),
            Value::Int32(..) => any::type_name::<i32>(),
            Value::Int64(..) => any::type_name::<i64>(),
            Value::UInt8(..) => any::type_name::<u8>(),
            Value::UInt16(..) => any::type_name::<u16>(),
            Value::UInt32(..) => any::type_name::<u32>(),
            Value::UInt64(..) => any::type_name::<u64>(),
            Value::Float32(..) => any::type_name::<f32>(),
            Value::Float64(..) => any::type_name::<f64>(),
            Value::Decimal(..) => any::type_name::<Decimal>(),
            Value::Varchar(..) => any::type_name::<String>(),
            Value::Blob(..) => any::type_name::<Box<[u8]>>(),
            Value::Date(..) => any::type_name::<Date>(),
            Value::Time(..) => any::type_name::<Time>(),
            Value::Timestamp(..) => any::type_name::<PrimitiveDateTime>(),
            Value::TimestampWithTimezone(..) => any::type_name::<OffsetDateTime>(),
            Value::Uuid(..) => any::type_name::<Uuid>(),
            Value::Unknown(..) => "Unknown",
        }
    }
}

impl DataType {
    /// Prototype value used when reading a column of this class.
    pub fn prototype(&self) -> Result<Value> {
        Ok(match self {
            DataType::Boolean => Value::Boolean(None),
            DataType::Integer => Value::Int64(None),
            DataType::Float => Value::Float64(None),
            DataType::Decimal => Value::Decimal(None, 0, 0),
            DataType::String => Value::Varchar(None),
            DataType::Binary => Value::Blob(None),
            DataType::Date => Value::Date(None),
            DataType::Time => Value::Time(None),
            DataType::Timestamp => Value::Timestamp(None),
            DataType::Uuid => Value::Uuid(None),
            DataType::Unknown => Value::Null,
            DataType::Entity => {
                return Err(Error::msg(
                    "DataType::Entity does not describe a single column",
                ));
            }
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        macro_rules! opt {
            ($v:expr) => {
                match $v {
                    Some(v) => write!(f, "{v}"),
                    None => f.write_str("NULL"),
                }
            };
        }
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(v) => opt!(v),
            Value::Int8(v) => opt!(v),
            Value::Int16(v) => opt!(v),
            Value::Int32(v) => opt!(v),
            Value::Int64(v) => opt!(v),
            Value::UInt8(v) => opt!(v),
            Value::UInt16(v) => opt!(v),
            Value::UInt32(v) => opt!(v),
            Value::UInt64(v) => opt!(v),
            Value::Float32(v) => opt!(v),
            Value::Float64(v) => opt!(v),
            Value::Decimal(v, ..) => opt!(v),
            Value::Varchar(v) => opt!(v),
            Value::Blob(v) => opt!(v.as_ref().map(hex::encode)),
            Value::Date(v) => opt!(v),
            Value::Time(v) => opt!(v),
            Value::Timestamp(v) => opt!(v),
            Value::TimestampWithTimezone(v) => opt!(v),
            Value::Uuid(v) => opt!(v),
            Value::Unknown(v) => opt!(v),
        }
    }
}
