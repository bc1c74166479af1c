use crate::{AsValue, Context, Error, Related, Result, Value};
use std::any::{self, Any};

/// A materialized entity, downcast to the concrete type by the caller.
pub type Instance = Box<dyn Any + Send>;

pub fn downcast<T: Any>(instance: Instance) -> Result<T> {
    instance.downcast::<T>().map(|v| *v).map_err(|_| {
        Error::msg(format!(
            "The instance is not of type `{}`",
            any::type_name::<T>()
        ))
    })
}

/// Value handed to a setter or a constructor argument.
#[derive(Debug)]
pub enum Slot {
    Value(Value),
    One(Related<Instance>),
    Many(Vec<Instance>),
    NotLoaded,
}

impl Slot {
    pub fn into_value<T: AsValue>(self) -> Result<T> {
        match self {
            Slot::Value(v) => T::try_from_value(v),
            _ => Err(Error::msg(format!(
                "Expected a scalar value to build `{}`, found an association",
                any::type_name::<T>()
            ))),
        }
    }

    pub fn into_related<T: Any>(self) -> Result<Related<T>> {
        Ok(match self {
            Slot::One(Related::Loaded(v)) => Related::Loaded(Box::new(downcast::<T>(*v)?)),
            Slot::One(Related::Reference(key)) => Related::Reference(key),
            Slot::One(Related::Absent) => Related::Absent,
            Slot::One(Related::NotLoaded) | Slot::NotLoaded => Related::NotLoaded,
            Slot::Value(Value::Null) => Related::Absent,
            _ => {
                return Err(Error::msg(format!(
                    "Expected a single `{}`",
                    any::type_name::<T>()
                )));
            }
        })
    }

    /// The loaded entity, anything else is an error.
    pub fn into_entity<T: Any>(self) -> Result<T> {
        match self.into_related::<T>()? {
            Related::Loaded(v) => Ok(*v),
            Related::Reference(key) => Err(Error::msg(format!(
                "Expected a loaded `{}`, only the reference {key} is known",
                any::type_name::<T>(),
            ))),
            _ => Err(Error::msg(format!(
                "Expected a loaded `{}`, it is not available",
                any::type_name::<T>(),
            ))),
        }
    }

    pub fn into_optional<T: Any>(self) -> Result<Option<T>> {
        Ok(self.into_related::<T>()?.into_option())
    }

    pub fn into_many<T: Any>(self) -> Result<Vec<T>> {
        match self {
            Slot::Many(v) => v.into_iter().map(downcast::<T>).collect(),
            Slot::NotLoaded => Ok(Vec::new()),
            _ => Err(Error::msg(format!(
                "Expected a collection of `{}`",
                any::type_name::<T>()
            ))),
        }
    }
}

/// Named arguments of a constructor call, in parameter order.
#[derive(Debug)]
pub struct Arguments {
    entity: &'static str,
    values: Vec<(&'static str, Option<Slot>)>,
}

impl Arguments {
    pub fn new(entity: &'static str, values: Vec<(&'static str, Slot)>) -> Self {
        Self {
            entity,
            values: values.into_iter().map(|(k, v)| (k, Some(v))).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Removes the argument, each one can be taken once.
    pub fn take(&mut self, name: &str) -> Result<Slot> {
        self.values
            .iter_mut()
            .find(|(k, ..)| *k == name)
            .and_then(|(.., v)| v.take())
            .ok_or_else(|| {
                Error::msg(format!(
                    "Constructor of `{}` has no argument `{name}` left",
                    self.entity
                ))
            })
    }

    pub fn value<T: AsValue>(&mut self, name: &str) -> Result<T> {
        let entity = self.entity;
        self.take(name)?
            .into_value()
            .with_context(|| format!("While reading argument `{name}` of `{entity}`"))
    }

    pub fn related<T: Any>(&mut self, name: &str) -> Result<Related<T>> {
        let entity = self.entity;
        self.take(name)?
            .into_related()
            .with_context(|| format!("While reading argument `{name}` of `{entity}`"))
    }

    pub fn entity<T: Any>(&mut self, name: &str) -> Result<T> {
        let entity = self.entity;
        self.take(name)?
            .into_entity()
            .with_context(|| format!("While reading argument `{name}` of `{entity}`"))
    }

    pub fn many<T: Any>(&mut self, name: &str) -> Result<Vec<T>> {
        let entity = self.entity;
        self.take(name)?
            .into_many()
            .with_context(|| format!("While reading argument `{name}` of `{entity}`"))
    }
}
