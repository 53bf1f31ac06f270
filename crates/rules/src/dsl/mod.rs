//! The restricted test language.
//!
//! Test cells (`range(min=0, max=10)`) and free-form conditions
//! (`this > mean(this) & ~isflagged(other)`) share one lexer and parser.
//! Evaluation walks the tree; nothing reaches host-level execution.

mod ast;
mod interpreter;
mod lexer;
mod parser;

#[cfg(test)]
mod tests;

pub use ast::{Arg, BinaryOp, Expr, UnaryOp};
pub use interpreter::{eval_condition, eval_constant, Scope, Value};
pub use parser::{parse_expression, parse_test_call, ParsedCall, MAX_DEPTH};
