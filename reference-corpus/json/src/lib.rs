pub mod location;
pub mod node;
mod number;
pub mod ptr;
pub mod schema;
pub mod scope;
pub mod validator;

pub use location::{LocatedItem, LocatedProperty, Location};
pub use node::{AsNode, Field, Fields, Node};
pub use number::Number;
pub use ptr::Pointer;
pub use schema::Schema;
pub use scope::Scope;
pub use validator::Validator;
