//! Document reader: markup text to an element tree

pub mod ast;
mod grammar;
pub mod lexer;

pub use ast::*;
pub use grammar::{parse, parse_named};
