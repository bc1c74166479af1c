use crate::{AsValue, Error, Result, Value};
use std::fmt::{self, Display};

/// Identity values of one entity instance, ordered as the identity columns.
///
/// Keys are hashable, a float component equal to NaN never matches another key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Key(pub Box<[Value]>);

impl Key {
    pub fn values(&self) -> &[Value] {
        &self.0
    }
    /// A key is null when any of its components is null.
    pub fn is_null(&self) -> bool {
        self.0.is_empty() || self.0.iter().any(Value::is_null)
    }
    /// Converts a single column key.
    pub fn get<T: AsValue>(&self) -> Result<T> {
        match &*self.0 {
            [value] => T::try_from_value(value.clone()),
            _ => Err(Error::msg(format!(
                "Key {self} has {} components, expected exactly one",
                self.0.len()
            ))),
        }
    }
}

impl<T: AsValue> From<T> for Key {
    fn from(value: T) -> Self {
        Key(Box::new([value.as_value()]))
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str(")")
    }
}

/// State of a to-one association after materialization.
#[derive(Debug)]
pub enum Related<T> {
    /// Not part of the query, left for a separate lookup.
    NotLoaded,
    /// Null foreign key, or an outer join that matched nothing.
    Absent,
    /// Only the identity is known, read from the owning foreign key column.
    Reference(Key),
    /// Fully materialized from joined columns.
    Loaded(Box<T>),
}

impl<T> Related<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Related::Loaded(..))
    }
    pub fn get(&self) -> Option<&T> {
        match self {
            Related::Loaded(v) => Some(v),
            _ => None,
        }
    }
    pub fn into_option(self) -> Option<T> {
        match self {
            Related::Loaded(v) => Some(*v),
            _ => None,
        }
    }
    /// The referenced identity, when known.
    pub fn key(&self) -> Option<&Key> {
        match self {
            Related::Reference(key) => Some(key),
            _ => None,
        }
    }
}

impl<T> Default for Related<T> {
    fn default() -> Self {
        Related::NotLoaded
    }
}

impl<T: PartialEq> PartialEq for Related<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Loaded(lhs), Self::Loaded(rhs)) => lhs == rhs,
            (Self::Reference(lhs), Self::Reference(rhs)) => lhs == rhs,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl<T: Clone> Clone for Related<T> {
    fn clone(&self) -> Self {
        match self {
            Self::NotLoaded => Self::NotLoaded,
            Self::Absent => Self::Absent,
            Self::Reference(key) => Self::Reference(key.clone()),
            Self::Loaded(v) => Self::Loaded(v.clone()),
        }
    }
}

impl<T> From<T> for Related<T> {
    fn from(value: T) -> Self {
        Self::Loaded(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::{Key, Related};
    use crate::Value;
    use rust_decimal::Decimal;
    use std::collections::HashSet;

    #[test]
    fn key() {
        let key = Key(Box::new([Value::Int32(Some(1)), Value::Varchar(Some("a".into()))]));
        assert!(!key.is_null());
        assert_eq!(key.to_string(), "(1, a)");
        assert!(key.get::<i32>().is_err());
        assert!(Key(Box::new([Value::Int32(Some(1)), Value::Varchar(None)])).is_null());
        assert!(Key::default().is_null());
        assert_eq!(Key::from(7_u8).get::<i64>().unwrap(), 7);
    }

    #[test]
    fn key_hash() {
        let mut keys = HashSet::new();
        assert!(keys.insert(Key(Box::new([Value::Decimal(Some(Decimal::new(10, 1)), 10, 1)]))));
        assert!(!keys.insert(Key(Box::new([Value::Decimal(Some(Decimal::new(100, 2)), 10, 2)]))));
        assert!(keys.insert(Key(Box::new([Value::Float64(Some(0.0))]))));
        assert!(!keys.insert(Key(Box::new([Value::Float64(Some(-0.0))]))));
        assert!(keys.insert(Key::from(1_i32)));
        assert!(keys.insert(Key::from(1_i64)));
        assert!(!keys.insert(Key::from(1_i32)));
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn related() {
        let loaded = Related::from(3);
        assert!(loaded.is_loaded());
        assert_eq!(loaded.get(), Some(&3));
        assert_eq!(Related::<i32>::default(), Related::NotLoaded);
        assert_ne!(Related::<i32>::Absent, Related::NotLoaded);
        assert_eq!(Related::<i32>::Reference(Key::from(1_i32)).into_option(), None);
    }
}
