use crate::ast::*;
use crate::error::ParseError;

/// Recursive-descent parser for RFC 9535 JSONPath query strings, following
/// the grammar's own precedence chain directly: [`Parser::query`] ->
/// segments -> selectors -> (for filter-selectors) `logical-or-expr` ->
/// `logical-and-expr` -> `basic-expr`.
pub struct Parser<'a> {
    src: &'a str,
    chars: Vec<char>,
    pos: usize,
}

pub fn parse(input: &str) -> Result<Query, ParseError> {
    let mut p = Parser {
        src: input,
        chars: input.chars().collect(),
        pos: 0,
    };
    let q = p.query()?;
    p.skip_ws();
    if !p.eof() {
        return Err(p.err("unexpected trailing input"));
    }
    Ok(q)
}

impl<'a> Parser<'a> {
    fn err(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.byte_offset(), message)
    }

    fn byte_offset(&self) -> usize {
        self.chars[..self.pos].iter().collect::<String>().len().min(self.src.len())
    }

    fn eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\n' | '\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> Result<(), ParseError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.err(format!("expected {c:?}, found {:?}", self.peek())))
        }
    }

    fn eat(&mut self, s: &str) -> bool {
        let n = s.chars().count();
        if self.chars[self.pos..].iter().take(n).copied().eq(s.chars()) {
            self.pos += n;
            true
        } else {
            false
        }
    }

    /// `jsonpath-query = root-identifier segments`
    pub fn query(&mut self) -> Result<Query, ParseError> {
        self.expect('$')?;
        let segments = self.segments()?;
        Ok(Query { segments })
    }

    /// `rel-query = current-node-identifier segments` — the `@`-rooted form
    /// used inside filter expressions.
    fn rel_query(&mut self) -> Result<Query, ParseError> {
        self.expect('@')?;
        let segments = self.segments()?;
        Ok(Query { segments })
    }

    fn segments(&mut self) -> Result<Vec<Segment>, ParseError> {
        let mut out = Vec::new();
        loop {
            let save = self.pos;
            self.skip_ws();
            if self.eat("..") {
                out.push(self.descendant_segment_tail()?);
            } else if self.peek() == Some('[') {
                out.push(Segment::Child(self.bracketed_selection()?));
            } else if self.peek() == Some('.') {
                self.pos += 1;
                out.push(self.dot_segment_tail()?);
            } else {
                self.pos = save;
                break;
            }
        }
        Ok(out)
    }

    fn dot_segment_tail(&mut self) -> Result<Segment, ParseError> {
        if self.peek() == Some('*') {
            self.pos += 1;
            Ok(Segment::Child(vec![Selector::Wildcard]))
        } else {
            let name = self.member_name_shorthand()?;
            Ok(Segment::Child(vec![Selector::Name(name)]))
        }
    }

    fn descendant_segment_tail(&mut self) -> Result<Segment, ParseError> {
        if self.peek() == Some('[') {
            Ok(Segment::Descendant(self.bracketed_selection()?))
        } else if self.peek() == Some('*') {
            self.pos += 1;
            Ok(Segment::Descendant(vec![Selector::Wildcard]))
        } else {
            let name = self.member_name_shorthand()?;
            Ok(Segment::Descendant(vec![Selector::Name(name)]))
        }
    }

    fn member_name_shorthand(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c == '_' || c.is_alphabetic() || (c as u32) >= 0x80 => self.pos += 1,
            _ => return Err(self.err("expected a member name after '.'")),
        }
        while matches!(self.peek(), Some(c) if c == '_' || c.is_alphanumeric() || (c as u32) >= 0x80)
        {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn bracketed_selection(&mut self) -> Result<Vec<Selector>, ParseError> {
        self.expect('[')?;
        self.skip_ws();
        let mut out = vec![self.selector()?];
        loop {
            self.skip_ws();
            if self.peek() == Some(',') {
                self.pos += 1;
                self.skip_ws();
                out.push(self.selector()?);
            } else {
                break;
            }
        }
        self.skip_ws();
        self.expect(']')?;
        Ok(out)
    }

    fn selector(&mut self) -> Result<Selector, ParseError> {
        match self.peek() {
            Some('\'') | Some('"') => Ok(Selector::Name(self.string_literal()?)),
            Some('*') => {
                self.pos += 1;
                Ok(Selector::Wildcard)
            }
            Some('?') => {
                self.pos += 1;
                self.skip_ws();
                Ok(Selector::Filter(self.logical_or_expr()?))
            }
            Some(c) if c == '-' || c.is_ascii_digit() => self.index_or_slice(),
            Some(':') => self.slice_from_colon(None),
            other => Err(self.err(format!("unexpected selector start {other:?}"))),
        }
    }

    fn index_or_slice(&mut self) -> Result<Selector, ParseError> {
        let n = self.integer()?;
        self.skip_ws();
        if self.peek() == Some(':') {
            self.slice_from_colon(Some(n))
        } else {
            Ok(Selector::Index(n))
        }
    }

    fn slice_from_colon(&mut self, start: Option<i64>) -> Result<Selector, ParseError> {
        self.expect(':')?;
        self.skip_ws();
        let end = self.maybe_integer()?;
        self.skip_ws();
        let step = if self.peek() == Some(':') {
            self.pos += 1;
            self.skip_ws();
            self.maybe_integer()?
        } else {
            None
        };
        Ok(Selector::Slice { start, end, step })
    }

    fn maybe_integer(&mut self) -> Result<Option<i64>, ParseError> {
        match self.peek() {
            Some(c) if c == '-' || c.is_ascii_digit() => Ok(Some(self.integer()?)),
            _ => Ok(None),
        }
    }

    fn integer(&mut self) -> Result<i64, ParseError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            return Err(self.err("expected an integer"));
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<i64>()
            .map_err(|_| self.err(format!("integer out of range: {text}")))
    }

    fn string_literal(&mut self) -> Result<String, ParseError> {
        let quote = self.advance().expect("caller checked quote present");
        let mut out = String::new();
        loop {
            match self.advance() {
                None => return Err(self.err("unterminated string literal")),
                Some(c) if c == quote => break,
                Some('\\') => out.push(self.escape_sequence(quote)?),
                Some(c) => out.push(c),
            }
        }
        Ok(out)
    }

    fn escape_sequence(&mut self, quote: char) -> Result<char, ParseError> {
        match self.advance() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('b') => Ok('\u{8}'),
            Some('f') => Ok('\u{c}'),
            Some('/') => Ok('/'),
            Some('\\') => Ok('\\'),
            Some(c) if c == quote => Ok(quote),
            Some('u') => self.unicode_escape(),
            Some(other) => Err(self.err(format!("invalid escape sequence \\{other}"))),
            None => Err(self.err("unterminated escape sequence")),
        }
    }

    fn unicode_escape(&mut self) -> Result<char, ParseError> {
        let code = self.hex4()?;
        if (0xD800..=0xDBFF).contains(&code) {
            if self.eat("\\u") {
                let low = self.hex4()?;
                if (0xDC00..=0xDFFF).contains(&low) {
                    let c = 0x10000
                        + (code as u32 - 0xD800) * 0x400
                        + (low as u32 - 0xDC00);
                    return char::from_u32(c).ok_or_else(|| self.err("invalid surrogate pair"));
                }
            }
            return Err(self.err("unpaired high surrogate in \\u escape"));
        }
        char::from_u32(code as u32).ok_or_else(|| self.err("invalid \\u escape"))
    }

    fn hex4(&mut self) -> Result<u16, ParseError> {
        let start = self.pos;
        for _ in 0..4 {
            if !matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                return Err(self.err("expected 4 hex digits"));
            }
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        u16::from_str_radix(&text, 16).map_err(|_| self.err("invalid hex escape"))
    }

    // ---- filter-selector expression grammar ----

    fn logical_or_expr(&mut self) -> Result<FilterExpr, ParseError> {
        let mut left = self.logical_and_expr()?;
        loop {
            self.skip_ws();
            if self.eat("||") {
                self.skip_ws();
                let right = self.logical_and_expr()?;
                left = FilterExpr::Or(Box::new(left), Box::new(right));
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn logical_and_expr(&mut self) -> Result<FilterExpr, ParseError> {
        let mut left = self.basic_expr()?;
        loop {
            self.skip_ws();
            if self.eat("&&") {
                self.skip_ws();
                let right = self.basic_expr()?;
                left = FilterExpr::And(Box::new(left), Box::new(right));
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn basic_expr(&mut self) -> Result<FilterExpr, ParseError> {
        self.skip_ws();
        let negated = if self.peek() == Some('!') && self.peek_at(1) != Some('=') {
            self.pos += 1;
            self.skip_ws();
            true
        } else {
            false
        };

        if self.peek() == Some('(') {
            self.pos += 1;
            self.skip_ws();
            let inner = self.logical_or_expr()?;
            self.skip_ws();
            self.expect(')')?;
            return Ok(if negated {
                FilterExpr::Not(Box::new(inner))
            } else {
                inner
            });
        }

        let primary = self.primary()?;
        self.skip_ws();
        if let Some(op) = self.comparison_op() {
            if negated {
                return Err(self.err("'!' cannot precede a comparison"));
            }
            let left = primary.into_comparable(self)?;
            self.skip_ws();
            let right_primary = self.primary()?;
            let right = right_primary.into_comparable(self)?;
            return Ok(FilterExpr::Compare(Box::new(left), op, Box::new(right)));
        }

        let query = primary.into_test_query(self)?;
        Ok(FilterExpr::Test { query, negated })
    }

    fn comparison_op(&mut self) -> Option<CompareOp> {
        let ops: &[(&str, CompareOp)] = &[
            ("==", CompareOp::Eq),
            ("!=", CompareOp::Ne),
            ("<=", CompareOp::Le),
            (">=", CompareOp::Ge),
            ("<", CompareOp::Lt),
            (">", CompareOp::Gt),
        ];
        for (text, op) in ops {
            if self.eat(text) {
                return Some(*op);
            }
        }
        None
    }

    /// A parsed-but-not-yet-classified primary: literal, query, or function
    /// call. Its role (comparable vs. test-expr) is decided by what follows
    /// it, per RFC 9535's grammar ambiguity between `comparison-expr` and
    /// `test-expr`.
    fn primary(&mut self) -> Result<Primary, ParseError> {
        self.skip_ws();
        match self.peek() {
            Some('$') => Ok(Primary::Query(QueryRoot::Absolute(self.query()?))),
            Some('@') => Ok(Primary::Query(QueryRoot::Relative(self.rel_query()?))),
            Some('\'') | Some('"') => Ok(Primary::Literal(Literal::String(self.string_literal()?))),
            Some(c) if c == '-' || c.is_ascii_digit() => Ok(Primary::Literal(self.number_literal()?)),
            Some(c) if c.is_alphabetic() || c == '_' => {
                let word = self.bare_word();
                match word.as_str() {
                    "true" => Ok(Primary::Literal(Literal::Bool(true))),
                    "false" => Ok(Primary::Literal(Literal::Bool(false))),
                    "null" => Ok(Primary::Literal(Literal::Null)),
                    // Built-in variable: `pi` evaluates to a float literal
                    // rather than a function call or query.
                    "pi" => Ok(Primary::Literal(Literal::Number(std::f64::consts::PI))),
                    _ => {
                        self.skip_ws();
                        if self.peek() == Some('(') {
                            Ok(Primary::Function(self.function_call(word)?))
                        } else {
                            Err(self.err(format!("unknown identifier {word:?} in filter expression")))
                        }
                    }
                }
            }
            other => Err(self.err(format!("unexpected token {other:?} in filter expression"))),
        }
    }

    fn bare_word(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn number_literal(&mut self) -> Result<Literal, ParseError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            return Err(self.err("expected a number"));
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let save = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some('+' | '-')) {
                self.pos += 1;
            }
            if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                self.pos = save;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(Literal::Number)
            .map_err(|_| self.err(format!("invalid number literal {text:?}")))
    }

    fn function_call(&mut self, name: String) -> Result<FunctionCall, ParseError> {
        self.expect('(')?;
        self.skip_ws();
        let mut args = Vec::new();
        if self.peek() != Some(')') {
            args.push(self.function_argument()?);
            loop {
                self.skip_ws();
                if self.peek() == Some(',') {
                    self.pos += 1;
                    self.skip_ws();
                    args.push(self.function_argument()?);
                } else {
                    break;
                }
            }
        }
        self.skip_ws();
        self.expect(')')?;
        Ok(FunctionCall { name, args })
    }

    fn function_argument(&mut self) -> Result<FunctionArg, ParseError> {
        self.skip_ws();
        // A function argument can be a literal, a query, a nested function
        // call, or a full filter expression (for logical-typed arguments
        // like `match`'s implicit boolean combinators) — try the richest
        // form and fall back.
        let save = self.pos;
        if let Ok(primary) = self.primary() {
            match primary {
                Primary::Literal(lit) => return Ok(FunctionArg::Literal(lit)),
                Primary::Query(q) => return Ok(FunctionArg::Query(q.into_test_query())),
                Primary::Function(f) => return Ok(FunctionArg::Query(TestQuery::Function(f))),
            }
        }
        self.pos = save;
        let expr = self.logical_or_expr()?;
        Ok(FunctionArg::Filter(Box::new(expr)))
    }
}

enum Primary {
    Literal(Literal),
    Query(QueryRoot),
    Function(FunctionCall),
}

enum QueryRoot {
    Absolute(Query),
    Relative(Query),
}

impl QueryRoot {
    fn into_test_query(self) -> TestQuery {
        match self {
            QueryRoot::Absolute(q) => TestQuery::Absolute(q),
            QueryRoot::Relative(q) => TestQuery::Relative(q),
        }
    }
}

impl Primary {
    fn into_comparable(self, parser: &Parser) -> Result<Comparable, ParseError> {
        match self {
            Primary::Literal(lit) => Ok(Comparable::Literal(lit)),
            Primary::Query(q) => {
                let tq = q.into_test_query();
                match &tq {
                    TestQuery::Relative(query) | TestQuery::Absolute(query) if !query.is_singular() => {
                        return Err(parser.err("comparison operand must be a singular query"));
                    }
                    _ => {}
                }
                Ok(Comparable::SingularQuery(tq))
            }
            Primary::Function(f) => Ok(Comparable::Function(f)),
        }
    }

    fn into_test_query(self, parser: &Parser) -> Result<TestQuery, ParseError> {
        match self {
            Primary::Literal(_) => Err(parser.err("a literal cannot be used as a test expression")),
            Primary::Query(q) => Ok(q.into_test_query()),
            Primary::Function(f) => Ok(TestQuery::Function(f)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dot_and_bracket_child_segments() {
        let q = parse("$.a['b'][0]").unwrap();
        assert_eq!(
            q.segments,
            vec![
                Segment::Child(vec![Selector::Name("a".into())]),
                Segment::Child(vec![Selector::Name("b".into())]),
                Segment::Child(vec![Selector::Index(0)]),
            ]
        );
    }

    #[test]
    fn parses_descendant_and_wildcard() {
        let q = parse("$..*").unwrap();
        assert_eq!(q.segments, vec![Segment::Descendant(vec![Selector::Wildcard])]);
    }

    #[test]
    fn parses_slice_selector() {
        let q = parse("$[1:5:2]").unwrap();
        assert_eq!(
            q.segments,
            vec![Segment::Child(vec![Selector::Slice {
                start: Some(1),
                end: Some(5),
                step: Some(2)
            }])]
        );
    }

    #[test]
    fn parses_filter_comparison() {
        let q = parse("$[?@.price < 10]").unwrap();
        match &q.segments[0] {
            Segment::Child(sels) => match &sels[0] {
                Selector::Filter(FilterExpr::Compare(_, CompareOp::Lt, _)) => {}
                other => panic!("unexpected selector: {other:?}"),
            },
            other => panic!("unexpected segment: {other:?}"),
        }
    }

    #[test]
    fn parses_function_call_in_filter() {
        let q = parse("$[?length(@.name) > 3]").unwrap();
        match &q.segments[0] {
            Segment::Child(sels) => match &sels[0] {
                Selector::Filter(FilterExpr::Compare(left, CompareOp::Gt, _)) => {
                    assert!(matches!(**left, Comparable::Function(_)));
                }
                other => panic!("unexpected selector: {other:?}"),
            },
            other => panic!("unexpected segment: {other:?}"),
        }
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse("$.a extra").is_err());
    }

    #[test]
    fn is_singular_true_only_for_name_and_index_segments() {
        assert!(parse("$.a[0]").unwrap().is_singular());
        assert!(!parse("$.a[*]").unwrap().is_singular());
        assert!(!parse("$..a").unwrap().is_singular());
    }
}
