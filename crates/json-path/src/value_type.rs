use json::{Location, Value};

/// The three type categories RFC 9535 §2.4.1 assigns to filter-expression
/// subexpressions: a single (possibly absent) value, a nodelist, or a
/// boolean. Comparisons operate on `ValueType`; test-expressions and
/// logical combinators operate on `LogicalType`; `count()`'s argument (and
/// a bare query used as a function argument) is `NodesType`.
pub enum TypedValue<'v> {
    Value(ValueType<'v>),
    Nodes(Vec<(&'v Value, Location)>),
    Logical(bool),
}

/// A `ValueType`: either an actual JSON value (borrowed from the document
/// or owned, when it came from a literal or a function's computed result)
/// or `Nothing` — RFC 9535's name for "this value does not exist", which is
/// distinct from JSON `null` and participates in comparisons per its own
/// rules (`Nothing == Nothing` is true; `Nothing` compared with anything
/// else via an ordering operator is always false).
pub enum ValueType<'v> {
    Nothing,
    Borrowed(&'v Value),
    Owned(Value),
}

impl<'v> ValueType<'v> {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ValueType::Nothing => None,
            ValueType::Borrowed(v) => Some(v),
            ValueType::Owned(v) => Some(v),
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, ValueType::Nothing)
    }

    pub fn truthy_as_logical(&self) -> bool {
        !self.is_nothing()
    }
}
