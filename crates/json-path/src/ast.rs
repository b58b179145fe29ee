//! JSONPath abstract syntax tree (RFC 9535 §2).

/// A parsed JSONPath query: `$` followed by zero or more segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub segments: Vec<Segment>,
}

impl Query {
    /// True when every selector in every segment is a name or (non-negative
    /// or negative, but single-valued) index selector — i.e. the query can
    /// only ever select at most one node, the "singular-query" subset RFC
    /// 9535 shares with [`json::Location`].
    pub fn is_singular(&self) -> bool {
        self.segments.iter().all(|seg| match seg {
            Segment::Child(sels) => {
                sels.len() == 1 && matches!(sels[0], Selector::Name(_) | Selector::Index(_))
            }
            Segment::Descendant(_) => false,
        })
    }
}

/// A query segment: either a single child step (`.name`, `[sel, sel, ...]`)
/// or a descendant step (`..name`, `..[sel, ...]`), each carrying the set of
/// selectors applied to every node it steps to.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Child(Vec<Selector>),
    Descendant(Vec<Selector>),
}

/// A single selector within a segment's bracketed selector-list (or the
/// lone selector implied by shorthand `.name` / `.*` / `..name` syntax).
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Name(String),
    Wildcard,
    Index(i64),
    Slice {
        start: Option<i64>,
        end: Option<i64>,
        step: Option<i64>,
    },
    Filter(FilterExpr),
}

/// A filter-selector predicate (RFC 9535 §2.3.5), evaluated once per
/// candidate node with `@` bound to that node.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Not(Box<FilterExpr>),
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
    Compare(Box<Comparable>, CompareOp, Box<Comparable>),
    /// A bare query or function-call used as a boolean "test" — true iff
    /// the query selects at least one node, or the function returns a
    /// `LogicalType` true.
    Test { query: TestQuery, negated: bool },
}

/// The left/right operand of a comparison: a literal, a singular query
/// result, or a value-returning function call.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparable {
    Literal(Literal),
    SingularQuery(TestQuery),
    Function(FunctionCall),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TestQuery {
    Relative(Query),
    Absolute(Query),
    Function(FunctionCall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<FunctionArg>,
}

/// A function-call argument: may itself be a nested query, a literal, or
/// another function call, per the typed function-extension grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArg {
    Literal(Literal),
    Query(TestQuery),
    Filter(Box<FilterExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}
