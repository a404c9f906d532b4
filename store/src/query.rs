//! Structured query model.

use tether_core::{Fields, Value};

/// Row predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every row.
    All,
    /// Column equals value.
    Eq(String, Value),
    /// Column is one of the values.
    In(String, Vec<Value>),
    /// All sub-filters hold.
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(column.into(), value.into())
    }

    pub fn in_values(column: impl Into<String>, values: Vec<Value>) -> Self {
        Filter::In(column.into(), values)
    }

    /// Combine with another filter.
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::And(mut list), f) => {
                list.push(f);
                Filter::And(list)
            }
            (a, b) => Filter::And(vec![a, b]),
        }
    }

    /// Evaluate against one row. Missing columns never match.
    pub fn matches(&self, fields: &Fields) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(column, value) => fields.get(column) == Some(value),
            Filter::In(column, values) => fields
                .get(column)
                .map(|v| values.contains(v))
                .unwrap_or(false),
            Filter::And(filters) => filters.iter().all(|f| f.matches(fields)),
        }
    }
}

/// Read a pivot table joined to the queried table in the same statement.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotJoin {
    /// Pivot table name.
    pub table: String,
    /// Pivot column matched against `target_column`.
    pub related_column: String,
    /// Column of the queried table the pivot points at.
    pub target_column: String,
    /// Predicate on pivot rows.
    pub filter: Filter,
    /// Order by this pivot column when present; pivot insertion order otherwise.
    pub order_column: Option<String>,
}

/// One structured query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Queried table.
    pub table: String,
    /// Predicate on rows of `table`.
    pub filter: Filter,
    /// Optional pivot join.
    pub join: Option<PivotJoin>,
    /// Order by this column; insertion order otherwise.
    pub order_by: Option<String>,
}

impl Query {
    /// Select rows of `table`.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: Filter::All,
            join: None,
            order_by: None,
        }
    }

    /// Add a predicate.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = std::mem::replace(&mut self.filter, Filter::All).and(filter);
        self
    }

    /// Join a pivot table.
    pub fn join(mut self, join: PivotJoin) -> Self {
        self.join = Some(join);
        self
    }

    /// Order results by a column.
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self
    }
}

/// A row returned by a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Columns of the queried table.
    pub fields: Fields,
    /// Columns of the joined pivot row, for pivot joins.
    pub pivot: Option<Fields>,
}

impl Row {
    pub fn new(fields: Fields) -> Self {
        Self {
            fields,
            pivot: None,
        }
    }
}
