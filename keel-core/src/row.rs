use crate::{AsValue, Context, DataType, Error, Result, Value};
use std::sync::Arc;

pub type RowNames = Arc<[String]>;
pub type Row = Box<[Value]>;

/// Reads typed values from one result row by column label.
pub trait RowReader {
    /// Raw value under `name`, `None` when the row has no such column.
    fn get_column(&self, name: &str) -> Option<&Value>;

    /// Value under `column` converted to the type of `prototype`, null stays null.
    fn read(&self, column: &str, prototype: &Value) -> Result<Value> {
        let Some(value) = self.get_column(column) else {
            return Err(Error::msg(format!(
                "Column `{column}` does not exist in the row provided"
            )));
        };
        value
            .clone()
            .coerce(prototype)
            .with_context(|| format!("While reading column `{column}`"))
    }

    fn read_as(&self, column: &str, data_type: DataType) -> Result<Value> {
        self.read(column, &data_type.prototype()?)
    }

    fn read_typed<T: AsValue>(&self, column: &str) -> Result<T>
    where
        Self: Sized,
    {
        T::try_from_value(self.read(column, &T::as_empty_value())?)
    }
}

/// Row with the column labels attached.
#[derive(Default, Clone, Debug)]
pub struct RowLabeled {
    /// Column names.
    pub labels: RowNames,
    /// Data values, aligned by index with `labels`.
    pub values: Row,
}

impl RowLabeled {
    pub fn new(names: RowNames, values: Row) -> Self {
        Self {
            labels: names,
            values,
        }
    }
    pub fn names(&self) -> &[String] {
        &self.labels
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl RowReader for RowLabeled {
    fn get_column(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v == name)
            .and_then(|i| self.values.get(i))
    }
}

impl<R: RowReader + ?Sized> RowReader for &R {
    fn get_column(&self, name: &str) -> Option<&Value> {
        (**self).get_column(name)
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for RowLabeled {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        let (labels, values): (Vec<String>, Vec<Value>) =
            iter.into_iter().map(|(k, v)| (k.into(), v)).unzip();
        Self::new(labels.into(), values.into())
    }
}

impl From<RowLabeled> for Row {
    fn from(value: RowLabeled) -> Self {
        value.values
    }
}
