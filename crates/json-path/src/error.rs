use thiserror::Error;

/// A JSONPath query or filter expression failed to parse.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("invalid JSONPath query at byte {offset}: {message}")]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(offset: usize, message: impl Into<String>) -> ParseError {
        ParseError {
            offset,
            message: message.into(),
        }
    }
}
