use crate::{Extension, Operand, PropertyPath, Result, Value};
use std::{borrow::Cow, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateType {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
}

/// What a query projects.
#[derive(Debug, Clone)]
pub enum Selection {
    Path(PropertyPath),
    Aggregate {
        function: AggregateType,
        operand: Operand,
    },
    Compound(Vec<Selection>),
    Aliased {
        selection: Box<Selection>,
        alias: Cow<'static, str>,
    },
    Literal(Value),
    Extension(Arc<dyn Extension>),
}

impl Selection {
    pub fn path(path: &str) -> Result<Self> {
        Ok(Selection::Path(PropertyPath::new(path)?))
    }
    pub fn aggregate(function: AggregateType, operand: impl Into<Operand>) -> Self {
        Selection::Aggregate {
            function,
            operand: operand.into(),
        }
    }
    pub fn aliased(self, alias: impl Into<Cow<'static, str>>) -> Self {
        Selection::Aliased {
            selection: Box::new(self),
            alias: alias.into(),
        }
    }
    pub fn compound(selections: impl IntoIterator<Item = Selection>) -> Self {
        Selection::Compound(selections.into_iter().collect())
    }
}
