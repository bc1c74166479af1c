use crate::{BinaryOpType, Extension, Operand, PropertyPath, Result};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckType {
    IsNull,
    IsNotNull,
    IsEmpty,
    IsNotEmpty,
}

/// Boolean filter over property paths.
#[derive(Debug, Clone)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    /// Boolean property used as a condition.
    Path(PropertyPath),
    Compare {
        path: PropertyPath,
        op: BinaryOpType,
        operand: Operand,
    },
    Between {
        path: PropertyPath,
        low: Operand,
        high: Operand,
    },
    In {
        path: PropertyPath,
        values: Vec<Operand>,
    },
    /// Membership in the result of an expression, usually a subquery.
    InExpression {
        path: PropertyPath,
        expression: Operand,
    },
    Check {
        path: PropertyPath,
        check: CheckType,
    },
    Extension(Arc<dyn Extension>),
}

impl Predicate {
    pub fn compare(path: &str, op: BinaryOpType, operand: impl Into<Operand>) -> Result<Self> {
        Ok(Predicate::Compare {
            path: PropertyPath::new(path)?,
            op,
            operand: operand.into(),
        })
    }
    pub fn eq(path: &str, operand: impl Into<Operand>) -> Result<Self> {
        Self::compare(path, BinaryOpType::Equal, operand)
    }
    pub fn between(path: &str, low: impl Into<Operand>, high: impl Into<Operand>) -> Result<Self> {
        Ok(Predicate::Between {
            path: PropertyPath::new(path)?,
            low: low.into(),
            high: high.into(),
        })
    }
    pub fn is_in(path: &str, values: impl IntoIterator<Item = Operand>) -> Result<Self> {
        Ok(Predicate::In {
            path: PropertyPath::new(path)?,
            values: values.into_iter().collect(),
        })
    }
    pub fn in_expression(path: &str, expression: impl Into<Operand>) -> Result<Self> {
        Ok(Predicate::InExpression {
            path: PropertyPath::new(path)?,
            expression: expression.into(),
        })
    }
    pub fn check(path: &str, check: CheckType) -> Result<Self> {
        Ok(Predicate::Check {
            path: PropertyPath::new(path)?,
            check,
        })
    }
    pub fn path(path: &str) -> Result<Self> {
        Ok(Predicate::Path(PropertyPath::new(path)?))
    }
    pub fn and(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::And(predicates.into_iter().collect())
    }
    pub fn or(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Or(predicates.into_iter().collect())
    }
    pub fn not(predicate: Predicate) -> Self {
        Predicate::Not(Box::new(predicate))
    }
}
