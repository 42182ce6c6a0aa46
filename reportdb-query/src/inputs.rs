//! Write inputs: column assignments and atomic number updates.

use crate::filter::FilterValue;
use crate::sql::{SqlBuilder, quote_identifier};

/// How an update changes a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// `col = value`
    Set(FilterValue),
    /// `col = col + value`
    Increment(FilterValue),
    /// `col = col - value`
    Decrement(FilterValue),
    /// `col = col * value`
    Multiply(FilterValue),
    /// `col = col / value`
    Divide(FilterValue),
}

impl Assignment {
    /// Render `"col" = …` into `builder`.
    pub fn to_sql(&self, column: &str, builder: &mut SqlBuilder) {
        let col = quote_identifier(column);
        let (op, value) = match self {
            Self::Set(v) => {
                builder.push(format!("{} = ", col)).push_param(v.clone());
                return;
            }
            Self::Increment(v) => ("+", v),
            Self::Decrement(v) => ("-", v),
            Self::Multiply(v) => ("*", v),
            Self::Divide(v) => ("/", v),
        };
        builder
            .push(format!("{} = {} {} ", col, col, op))
            .push_param(value.clone());
    }
}

/// Update operation on a numeric field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberUpdate<T> {
    /// Replace the value.
    Set(T),
    /// Add to the value.
    Increment(T),
    /// Subtract from the value.
    Decrement(T),
    /// Multiply the value.
    Multiply(T),
    /// Divide the value.
    Divide(T),
}

impl<T> From<T> for NumberUpdate<T> {
    fn from(v: T) -> Self {
        Self::Set(v)
    }
}

impl<T: Into<FilterValue>> From<NumberUpdate<T>> for Assignment {
    fn from(update: NumberUpdate<T>) -> Self {
        match update {
            NumberUpdate::Set(v) => Self::Set(v.into()),
            NumberUpdate::Increment(v) => Self::Increment(v.into()),
            NumberUpdate::Decrement(v) => Self::Decrement(v.into()),
            NumberUpdate::Multiply(v) => Self::Multiply(v.into()),
            NumberUpdate::Divide(v) => Self::Divide(v.into()),
        }
    }
}
