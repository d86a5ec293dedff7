//! Presence tracking for optional per-row attributes

/// An optional attribute of one row.
///
/// Distinguishes a column the input never had from a cell that was empty
/// or failed coercion, without a sentinel value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OptionalField<T> {
    /// The column was detected and this row holds a usable value
    Present(T),
    /// The column was detected but this row's cell is missing or unparsable
    MissingInRow,
    /// The input has no such column
    #[default]
    NotInSchema,
}

impl<T> OptionalField<T> {
    /// Build from a detected column's cell
    pub fn from_cell(value: Option<T>) -> Self {
        match value {
            Some(v) => OptionalField::Present(v),
            None => OptionalField::MissingInRow,
        }
    }

    /// The value, when present
    pub fn value(&self) -> Option<&T> {
        match self {
            OptionalField::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            OptionalField::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, OptionalField::Present(_))
    }

    /// Whether the input carried the column at all
    pub fn in_schema(&self) -> bool {
        !matches!(self, OptionalField::NotInSchema)
    }
}
