//! Domain dispatch
//!
//! Routes entry records to per-category [`DomainParser`]s and collects the
//! [`DomainRecord`]s they emit.

mod domain;
mod parser;
mod reader;

pub use domain::*;
pub use parser::*;
pub use reader::*;

#[cfg(test)]
pub(crate) use parser::test_parsers;
