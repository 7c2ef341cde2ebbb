//! Showing expressions and values to people rather than the parser.

use crate::{
    expr::{BinaryOperation, Builtin, Expression, Precedence},
    ops,
};
use std::fmt::{self, Display, Formatter};

/// Values are shown rounded to this many decimal places.
pub const DISPLAY_DECIMAL_PLACES: u32 = 2;

const SUPERSCRIPTS: &[(char, char)] = &[
    ('0', '⁰'),
    ('1', '¹'),
    ('2', '²'),
    ('3', '³'),
    ('4', '⁴'),
    ('5', '⁵'),
    ('6', '⁶'),
    ('7', '⁷'),
    ('8', '⁸'),
    ('9', '⁹'),
    ('x', 'ˣ'),
    ('y', 'ʸ'),
    ('n', 'ⁿ'),
    ('-', '⁻'),
];

const SUBSCRIPTS: &[(char, char)] = &[
    ('0', '₀'),
    ('1', '₁'),
    ('2', '₂'),
    ('3', '₃'),
    ('4', '₄'),
    ('5', '₅'),
    ('6', '₆'),
    ('7', '₇'),
    ('8', '₈'),
    ('9', '₉'),
    ('x', 'ₓ'),
    ('y', 'ᵧ'),
    ('n', 'ₙ'),
];

/// Round a value the way it should be shown, so `0.1 + 0.2` reads as `0.3`.
pub fn display_value(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }

    // adding zero turns -0 into 0
    ops::round_to_decimal_places(value, DISPLAY_DECIMAL_PLACES) + 0.0
}

impl Expression {
    /// Render this expression with hand-written notation (see [`Pretty`]).
    pub fn pretty(&self) -> Pretty<'_> { Pretty(self) }
}

/// Writes an [`Expression`] the way it would be written on paper.
///
/// - `sqrt(x)` and `cbrt(x)` become `√x` and `∛x`
/// - `root(x, 3)` becomes `³√x` and `log(x, 2)` becomes `log₂(x)`
/// - `*` and `/` become `×` and `÷`, with a number multiplying a name or
///   call written next to it (`2x`)
/// - `**` becomes `^` and `PI` becomes `π`
///
/// The output is for display only and isn't guaranteed to parse.
#[derive(Debug, Copy, Clone)]
pub struct Pretty<'a>(pub &'a Expression);

impl Display for Pretty<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_pretty(self.0, f)
    }
}

fn write_pretty(expr: &Expression, f: &mut Formatter<'_>) -> fmt::Result {
    match expr {
        Expression::Parameter(p) if p.name() == "PI" => write!(f, "π"),
        Expression::Parameter(p) => write!(f, "{}", p),
        Expression::Constant(value) => write!(f, "{}", value),
        Expression::Binary { left, right, op } => {
            let (left_needs_parens, right_needs_parens) =
                op.parenthesize(left, right);

            write_operand(left, left_needs_parens, f)?;

            let symbol = match op {
                BinaryOperation::Plus => " + ",
                BinaryOperation::Minus => " - ",
                BinaryOperation::Times if is_coefficient(left, right) => "",
                BinaryOperation::Times => "×",
                BinaryOperation::Divide => "÷",
                BinaryOperation::Power => "^",
            };
            write!(f, "{}", symbol)?;

            write_operand(right, right_needs_parens, f)
        },
        Expression::Negate(inner) => {
            write!(f, "-")?;
            write_operand(inner, inner.precedence() < Precedence::Unary, f)
        },
        Expression::FunctionCall {
            function,
            arguments,
        } => write_call(*function, &arguments[..], f),
    }
}

fn write_call(
    function: Builtin,
    arguments: &[Box<Expression>],
    f: &mut Formatter<'_>,
) -> fmt::Result {
    match (function, arguments) {
        (Builtin::Sqrt, [value]) => write_radical("√", value, f),
        (Builtin::Cbrt, [value]) => write_radical("∛", value, f),
        (Builtin::Root, [value, degree]) => {
            match scripted(degree, SUPERSCRIPTS) {
                Some(index) => write!(f, "{}", index)?,
                None => write_operand(degree, !is_atom(degree), f)?,
            }
            write_radical("√", value, f)
        },
        (Builtin::Log, [value, base]) => {
            write!(f, "log")?;
            match scripted(base, SUBSCRIPTS) {
                Some(base) => write!(f, "{}", base)?,
                None => {
                    write!(f, "_")?;
                    write_operand(base, !is_atom(base), f)?;
                },
            }
            write!(f, "(")?;
            write_pretty(value, f)?;
            write!(f, ")")
        },
        _ => {
            write!(f, "{}(", function)?;

            for (i, arg) in arguments.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_pretty(arg, f)?;
            }

            write!(f, ")")
        },
    }
}

fn write_radical(
    glyph: &str,
    value: &Expression,
    f: &mut Formatter<'_>,
) -> fmt::Result {
    write!(f, "{}", glyph)?;
    write_operand(value, !is_atom(value), f)
}

fn write_operand(
    expr: &Expression,
    parenthesize: bool,
    f: &mut Formatter<'_>,
) -> fmt::Result {
    if parenthesize {
        write!(f, "(")?;
        write_pretty(expr, f)?;
        write!(f, ")")
    } else {
        write_pretty(expr, f)
    }
}

fn is_atom(expr: &Expression) -> bool {
    expr.precedence() == Precedence::Atom
}

/// A positive number times a name or function call, as in `2x`.
fn is_coefficient(left: &Expression, right: &Expression) -> bool {
    let number = match left {
        Expression::Constant(value) => value.is_sign_positive(),
        _ => false,
    };
    let named = match right {
        Expression::Parameter(_) | Expression::FunctionCall { .. } => true,
        _ => false,
    };

    number && named
}

/// Spell `expr` with super/subscript characters, if every character has one.
fn scripted(expr: &Expression, table: &[(char, char)]) -> Option<String> {
    expr.to_string()
        .chars()
        .map(|c| {
            table
                .iter()
                .find(|(plain, _)| *plain == c)
                .map(|(_, scripted)| *scripted)
        })
        .collect()
}
