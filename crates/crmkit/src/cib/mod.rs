//! Reading and writing CIB object definitions.

pub mod parser;
pub mod writer;

pub use parser::{Definition, parse, parse_definition};
pub use writer::render;
