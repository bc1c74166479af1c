use crate::{AsValue, BinaryOpType, PropertyPath, Query, Result, Value};
use std::borrow::Cow;

/// Right hand side of a comparison, or the argument of an aggregate.
#[derive(Debug, Clone)]
pub enum Operand {
    Path(PropertyPath),
    Value(Value),
    /// Named placeholder bound when the statement runs.
    Parameter(Cow<'static, str>),
    Call {
        function: Cow<'static, str>,
        arguments: Vec<Operand>,
    },
    Binary {
        op: BinaryOpType,
        lhs: Box<Operand>,
        rhs: Box<Operand>,
    },
    /// Nested query over its own root, planned separately.
    Subquery(Box<Query>),
}

impl Operand {
    pub fn path(path: &str) -> Result<Self> {
        Ok(Operand::Path(PropertyPath::new(path)?))
    }
    pub fn parameter(name: impl Into<Cow<'static, str>>) -> Self {
        Operand::Parameter(name.into())
    }
    pub fn value(value: impl AsValue) -> Self {
        Operand::Value(value.as_value())
    }
    pub fn call(
        function: impl Into<Cow<'static, str>>,
        arguments: impl IntoIterator<Item = Operand>,
    ) -> Self {
        Operand::Call {
            function: function.into(),
            arguments: arguments.into_iter().collect(),
        }
    }
    pub fn binary(op: BinaryOpType, lhs: Operand, rhs: Operand) -> Self {
        Operand::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

impl From<PropertyPath> for Operand {
    fn from(value: PropertyPath) -> Self {
        Operand::Path(value)
    }
}

impl From<Query> for Operand {
    fn from(value: Query) -> Self {
        Operand::Subquery(Box::new(value))
    }
}
