//! Tagged JSON value model, plus the two reference kinds everything else in
//! this workspace navigates it with: [`pointer::Pointer`] (RFC 6901) and
//! [`location::Location`] (an owned, possibly-negative-indexed path built up
//! by the path evaluator and the patch/merge engines).

pub mod location;
pub mod pointer;
pub mod reference;
pub mod value;

pub use location::{Location, Segment};
pub use pointer::{Pointer, PointerError, RefError, Token};
pub use reference::{reference, Reference};
pub use value::{Object, Type, Value};
