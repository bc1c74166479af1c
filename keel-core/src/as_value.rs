use crate::{Error, Result, Value, consume_while, truncate_long};
use anyhow::Context;
use atoi::FromRadix10SignedChecked;
use fast_float::parse_partial;
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use std::any;
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset, format_description::parse_borrowed,
};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// This is the coercion layer used when a row column does not already carry the
/// declared type of the property it is read into.
///
/// # Parsing contract
/// - `parse` delegates to `extract` then verifies the input is exhausted.
/// - `extract` updates the input slice only on success.
///
/// # Error semantics
/// Numeric conversions are range checked, the error names both the offending value
/// and the target type.
///
/// # Examples
/// ```rust
/// use keel_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let n: i64 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    /// The null value of the variant this type maps to, also used as type prototype.
    fn as_empty_value() -> Value;
    /// Wrap into the owned [`Value`] representation.
    fn as_value(self) -> Value;
    /// Convert a dynamic [`Value`] into `Self`, widening or narrowing when the value fits.
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
    /// Parse the whole string, fails if `extract` leaves something behind.
    fn parse(input: impl AsRef<str>) -> Result<Self>
    where
        Self: Sized,
    {
        let mut value = input.as_ref().trim();
        let result = Self::extract(&mut value)?;
        if !value.trim_start().is_empty() {
            return Err(Error::msg(format!(
                "Value `{}` parsed correctly as {} but it did not consume all the input (remaining: `{}`)",
                truncate_long!(input.as_ref()),
                any::type_name::<Self>(),
                truncate_long!(value),
            )));
        }
        Ok(result)
    }
    /// Parse a prefix of the input, advancing the slice on success.
    fn extract(value: &mut &str) -> Result<Self>
    where
        Self: Sized,
    {
        Err(Error::msg(format!(
            "Cannot parse '{value}' as {}",
            any::type_name::<Self>()
        )))
    }
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&'static str> for Value {
    fn from(value: &'static str) -> Self {
        Value::Varchar(Some(value.into()))
    }
}

macro_rules! impl_as_value_integer {
    ($source:ty, $destination:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            #[allow(unreachable_patterns)]
            fn try_from_value(value: Value) -> Result<Self> {
                let wide: i128 = match value {
                    $destination(Some(v)) => return Ok(v),
                    Value::Int8(Some(v)) => v as _,
                    Value::Int16(Some(v)) => v as _,
                    Value::Int32(Some(v)) => v as _,
                    Value::Int64(Some(v)) => v as _,
                    Value::UInt8(Some(v)) => v as _,
                    Value::UInt16(Some(v)) => v as _,
                    Value::UInt32(Some(v)) => v as _,
                    Value::UInt64(Some(v)) => v as _,
                    Value::Decimal(Some(v), ..) => {
                        let error = || {
                            Error::msg(format!(
                                "Value {v}: Decimal does not fit into {}",
                                any::type_name::<Self>()
                            ))
                        };
                        if !v.is_integer() {
                            return Err(error().context("The value is not a integer"));
                        }
                        v.to_i128().ok_or_else(error)?
                    }
                    Value::Varchar(Some(ref v)) | Value::Unknown(Some(ref v)) => {
                        return Self::parse(v);
                    }
                    _ => {
                        return Err(Error::msg(format!(
                            "Cannot convert {value:?} to {}",
                            any::type_name::<Self>(),
                        )));
                    }
                };
                <$source>::try_from(wide).map_err(|_| {
                    Error::msg(format!(
                        "Value {wide} is out of range for {}",
                        any::type_name::<Self>(),
                    ))
                })
            }
            fn extract(input: &mut &str) -> Result<Self> {
                let value = *input;
                let (num, len) = i128::from_radix_10_signed_checked(value.as_bytes());
                if len == 0 {
                    return Err(Error::msg(format!(
                        "Cannot extract {} from `{}`",
                        any::type_name::<Self>(),
                        truncate_long!(value),
                    )));
                }
                let result = num.and_then(|v| <$source>::try_from(v).ok()).ok_or_else(|| {
                    Error::msg(format!(
                        "Parsed integer {} is out of range for {}",
                        &value[..len],
                        any::type_name::<Self>(),
                    ))
                })?;
                *input = &value[len..];
                Ok(result)
            }
        }
    };
}
impl_as_value_integer!(i8, Value::Int8);
impl_as_value_integer!(i16, Value::Int16);
impl_as_value_integer!(i32, Value::Int32);
impl_as_value_integer!(i64, Value::Int64);
impl_as_value_integer!(u8, Value::UInt8);
impl_as_value_integer!(u16, Value::UInt16);
impl_as_value_integer!(u32, Value::UInt32);
impl_as_value_integer!(u64, Value::UInt64);

macro_rules! impl_as_value {
    ($source:ty, $destination:path, $extract:expr $(, $pat_rest:pat => $expr_rest:expr)* $(,)?) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self.into()))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $destination(Some(v), ..) => Ok(v.into()),
                    $($pat_rest => $expr_rest,)*
                    #[allow(unreachable_patterns)]
                    Value::Unknown(Some(ref v)) => <Self as AsValue>::parse(v),
                    _ => Err(Error::msg(format!(
                        "Cannot convert {value:?} to {}",
                        any::type_name::<Self>(),
                    ))),
                }
            }
            fn extract(value: &mut &str) -> Result<Self> {
                $extract(value)
            }
        }
    };
}

impl_as_value!(
    bool,
    Value::Boolean,
    |input: &mut &str| -> Result<Self> {
        let mut value = *input;
        let result = consume_while(&mut value, |v| v.is_alphanumeric() || *v == '_');
        let result = match result {
            x if x.eq_ignore_ascii_case("true") || x.eq_ignore_ascii_case("t") || x.eq("1") => true,
            x if x.eq_ignore_ascii_case("false") || x.eq_ignore_ascii_case("f") || x.eq("0") => false,
            _ => return Err(Error::msg(format!("Cannot parse boolean from '{input}'"))),
        };
        *input = value;
        Ok(result)
    },
    Value::Int8(Some(v)) => Ok(v != 0),
    Value::Int16(Some(v)) => Ok(v != 0),
    Value::Int32(Some(v)) => Ok(v != 0),
    Value::Int64(Some(v)) => Ok(v != 0),
    Value::UInt8(Some(v)) => Ok(v != 0),
    Value::UInt16(Some(v)) => Ok(v != 0),
    Value::UInt32(Some(v)) => Ok(v != 0),
    Value::UInt64(Some(v)) => Ok(v != 0),
    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
);

macro_rules! extract_float {
    ($input:expr) => {{
        let value = *$input;
        let (num, tail) = parse_partial(value).with_context(|| {
            format!(
                "Cannot extract a floating point value from `{}`",
                truncate_long!(value)
            )
        })?;
        *$input = &value[tail..];
        Ok(num)
    }};
}
impl_as_value!(
    f32,
    Value::Float32,
    |input: &mut &str| -> Result<Self> { extract_float!(input) },
    Value::Float64(Some(v)) => Ok(v as _),
    Value::Int8(Some(v)) => Ok(v as _),
    Value::Int16(Some(v)) => Ok(v as _),
    Value::Int32(Some(v)) => Ok(v as _),
    Value::UInt8(Some(v)) => Ok(v as _),
    Value::UInt16(Some(v)) => Ok(v as _),
    Value::Decimal(Some(v), ..) => Ok(v.try_into()?),
    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
);
impl_as_value!(
    f64,
    Value::Float64,
    |input: &mut &str| -> Result<Self> { extract_float!(input) },
    Value::Float32(Some(v)) => Ok(v as _),
    Value::Int8(Some(v)) => Ok(v as _),
    Value::Int16(Some(v)) => Ok(v as _),
    Value::Int32(Some(v)) => Ok(v as _),
    Value::Int64(Some(v)) => Ok(v as _),
    Value::UInt8(Some(v)) => Ok(v as _),
    Value::UInt16(Some(v)) => Ok(v as _),
    Value::UInt32(Some(v)) => Ok(v as _),
    Value::UInt64(Some(v)) => Ok(v as _),
    Value::Decimal(Some(v), ..) => Ok(v.try_into()?),
    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
);

impl_as_value!(
    String,
    Value::Varchar,
    |input: &mut &str| -> Result<Self> {
        let result = input.to_string();
        *input = "";
        Ok(result)
    },
    Value::Unknown(Some(v)) => Ok(v),
    Value::Uuid(Some(v)) => Ok(v.to_string()),
);

impl_as_value!(
    Box<[u8]>,
    Value::Blob,
    |input: &mut &str| -> Result<Self> {
        let mut value = *input;
        if value.len() >= 2 && value[0..2].eq_ignore_ascii_case("\\x") {
            value = &value[2..];
        }
        let hex = consume_while(&mut value, char::is_ascii_hexdigit);
        let result = hex::decode(hex).map(Into::into).with_context(|| {
            format!(
                "While decoding `{}` as {}",
                truncate_long!(input),
                any::type_name::<Self>()
            )
        })?;
        *input = value;
        Ok(result)
    },
    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
);

impl AsValue for Vec<u8> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self.into_boxed_slice()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        <Box<[u8]> as AsValue>::try_from_value(value).map(Into::into)
    }
    fn extract(value: &mut &str) -> Result<Self> {
        <Box<[u8]> as AsValue>::extract(value).map(Into::into)
    }
}

impl_as_value!(
    Uuid,
    Value::Uuid,
    |input: &mut &str| -> Result<Self> {
        let value = *input;
        let context = || {
            format!(
                "Cannot extract a uuid value from `{}`",
                truncate_long!(value)
            )
        };
        let candidate = value.get(0..36).ok_or_else(|| Error::msg(context()))?;
        let uuid = Uuid::parse_str(candidate).with_context(context)?;
        *input = &value[36..];
        Ok(uuid)
    },
    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
    Value::Blob(Some(ref v)) => Uuid::from_slice(v)
        .with_context(|| format!("Cannot convert a blob of {} bytes to Uuid", v.len())),
);

macro_rules! parse_time {
    ($value:ident, $($formats:literal),+ $(,)?) => {
        'value: {
            for format in [$($formats,)+] {
                let format = parse_borrowed::<2>(format)?;
                let mut parsed = time::parsing::Parsed::new();
                let remaining = parsed.parse_items($value.as_bytes(), &format);
                if let Ok(remaining) = remaining {
                    let result = parsed.try_into()?;
                    *$value = &$value[($value.len() - remaining.len())..];
                    break 'value Ok(result);
                }
            }
            Err(Error::msg(format!(
                "Cannot extract from `{}` as {}",
                $value,
                any::type_name::<Self>()
            )))
        }
    }
}

impl_as_value!(
    Date,
    Value::Date,
    |v: &mut &str| -> Result<Self> { parse_time!(v, "[year]-[month]-[day]") },
    Value::Timestamp(Some(v)) => Ok(v.date()),
    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
);

impl_as_value!(
    Time,
    Value::Time,
    |v: &mut &str| -> Result<Self> {
        parse_time!(
            v,
            "[hour]:[minute]:[second].[subsecond]",
            "[hour]:[minute]:[second]",
            "[hour]:[minute]",
        )
    },
    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
);

impl_as_value!(
    PrimitiveDateTime,
    Value::Timestamp,
    |v: &mut &str| -> Result<Self> {
        parse_time!(
            v,
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]",
            "[year]-[month]-[day]T[hour]:[minute]:[second]",
            "[year]-[month]-[day]T[hour]:[minute]",
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]",
            "[year]-[month]-[day] [hour]:[minute]:[second]",
            "[year]-[month]-[day] [hour]:[minute]",
        )
    },
    Value::TimestampWithTimezone(Some(v)) => {
        let v = v.to_offset(UtcOffset::UTC);
        Ok(PrimitiveDateTime::new(v.date(), v.time()))
    },
    Value::Date(Some(v)) => Ok(v.midnight()),
    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
);

impl_as_value!(
    OffsetDateTime,
    Value::TimestampWithTimezone,
    |v: &mut &str| -> Result<Self> {
        let result: Result<OffsetDateTime> = parse_time!(
            v,
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]",
            "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]",
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]",
            "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]",
            "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]",
        );
        result.or_else(|_| <PrimitiveDateTime as AsValue>::extract(v).map(|v| v.assume_utc()))
    },
    Value::Timestamp(Some(timestamp)) => Ok(timestamp.assume_utc()),
    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
);

impl AsValue for Decimal {
    fn as_empty_value() -> Value {
        Value::Decimal(None, 0, 0)
    }
    fn as_value(self) -> Value {
        Value::Decimal(Some(self), 0, self.scale() as _)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        let error = || Error::msg(format!("Cannot convert {value:?} to Decimal"));
        match value {
            Value::Decimal(Some(v), ..) => Ok(v),
            Value::Int8(Some(v)) => Ok(Decimal::from(v)),
            Value::Int16(Some(v)) => Ok(Decimal::from(v)),
            Value::Int32(Some(v)) => Ok(Decimal::from(v)),
            Value::Int64(Some(v)) => Ok(Decimal::from(v)),
            Value::UInt8(Some(v)) => Ok(Decimal::from(v)),
            Value::UInt16(Some(v)) => Ok(Decimal::from(v)),
            Value::UInt32(Some(v)) => Ok(Decimal::from(v)),
            Value::UInt64(Some(v)) => Ok(Decimal::from(v)),
            Value::Float32(Some(v)) => Decimal::from_f32(v).ok_or_else(error),
            Value::Float64(Some(v)) => Decimal::from_f64(v).ok_or_else(error),
            Value::Varchar(Some(ref v)) | Value::Unknown(Some(ref v)) => Self::parse(v),
            _ => Err(error()),
        }
    }
    fn extract(input: &mut &str) -> Result<Self> {
        let mut value = *input;
        let sign = consume_while(&mut value, |c| *c == '-' || *c == '+');
        let integer = consume_while(&mut value, char::is_ascii_digit);
        let fraction = if value.starts_with('.') {
            value = &value[1..];
            consume_while(&mut value, char::is_ascii_digit)
        } else {
            ""
        };
        if integer.is_empty() && fraction.is_empty() || sign.len() > 1 {
            return Err(Error::msg(format!(
                "Cannot extract a Decimal from `{}`",
                truncate_long!(input)
            )));
        }
        let digits = format!("{sign}{integer}{fraction}");
        let mantissa: i128 = digits
            .parse()
            .with_context(|| format!("Could not create a Decimal from `{}`", truncate_long!(input)))?;
        let result = Decimal::try_from_i128_with_scale(mantissa, fraction.len() as _)
            .map_err(|_| Error::msg(format!("Could not create a Decimal from {mantissa}")))?;
        *input = value;
        Ok(result)
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(T::try_from_value(value)?))
    }
    fn extract(value: &mut &str) -> Result<Self> {
        T::extract(value).map(Some)
    }
}
