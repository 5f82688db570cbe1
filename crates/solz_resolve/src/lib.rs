//! Go-to-definition over a parsed program.
//!
//! The finder walks the AST once, depth first, carrying a chain of nested
//! scopes, and resolves the identifier occurrence at a target offset to the
//! position that declared it.

mod definition;
mod scope;

pub use definition::{resolve_definition, DefinitionError, DefinitionFinder};
pub use scope::Scope;
