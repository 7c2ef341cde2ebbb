//! A two-pan balance scale for algebraic expressions.
//!
//! Blocks of text like `3x + 2` or `√16` are normalized, parsed, and
//! evaluated against a set of variables. Blocks placed on the left and right
//! pans are weighed against each other, and when a single variable is
//! unknown the scale can work out the value which balances it.

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

mod config;
mod env;
mod expr;
mod format;
mod normalize;
pub mod ops;
mod parse;
mod scale;
mod solve;
mod workspace;

pub use config::ScaleConfig;
pub use env::{is_valid_name, Environment, VariableError};
pub use expr::{Arguments, BinaryOperation, Builtin, Expression, Parameter, Params};
pub use format::{display_value, Pretty, DISPLAY_DECIMAL_PLACES};
pub use normalize::{normalize, CanonicalExpression, RejectedInput};
pub use ops::{
    compile, evaluate, evaluate_str, evaluate_with, Evaluation,
    EvaluationResult, InvalidExpression,
};
pub use parse::{parse, ParseError, TokenKind, MAX_DEPTH};
pub use scale::{read, read_with, Relation, ScaleReading};
pub use solve::{solve, solve_with, unknowns, SolveOutcome};
pub use workspace::{Badge, Block, BlockId, Workspace, WorkspaceError, Zone};
