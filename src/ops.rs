//! [`Expression`] operations.

use crate::{
    env::Environment,
    expr::{BinaryOperation, Builtin, Expression, Parameter},
    normalize::{normalize, RejectedInput},
    parse::{parse, ParseError},
};
use std::{
    error::Error,
    f64::consts,
    fmt::{self, Display, Formatter},
};

/// The outcome of evaluating an expression which parsed successfully.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Evaluation {
    /// A number. This may still be NaN or infinite when the arithmetic says
    /// so (e.g. `0/0` or `1/0`).
    Value(f64),
    /// The expression refers to a variable which hasn't been defined.
    Undefined,
}

impl Evaluation {
    /// The numeric reading, with [`Evaluation::Undefined`] reported as NaN.
    pub fn as_f64(self) -> f64 {
        match self {
            Evaluation::Value(value) => value,
            Evaluation::Undefined => f64::NAN,
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Evaluation::Value(value) => Some(value),
            Evaluation::Undefined => None,
        }
    }

    /// Is this either [`Evaluation::Undefined`] or a NaN value?
    pub fn is_nan(self) -> bool { self.as_f64().is_nan() }

    /// The amount this evaluation adds to a pan's total. Anything which
    /// isn't a finite number weighs nothing.
    pub fn weight(self) -> f64 {
        match self {
            Evaluation::Value(value) if value.is_finite() => value,
            _ => 0.0,
        }
    }
}

/// Why some text can't be evaluated at all.
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidExpression {
    Rejected(RejectedInput),
    Parse(ParseError),
}

impl From<RejectedInput> for InvalidExpression {
    fn from(e: RejectedInput) -> Self { InvalidExpression::Rejected(e) }
}

impl From<ParseError> for InvalidExpression {
    fn from(e: ParseError) -> Self { InvalidExpression::Parse(e) }
}

impl Display for InvalidExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            InvalidExpression::Rejected(_) => {
                write!(f, "The expression contains unsupported text")
            },
            InvalidExpression::Parse(_) => {
                write!(f, "The expression is malformed")
            },
        }
    }
}

impl Error for InvalidExpression {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InvalidExpression::Rejected(inner) => Some(inner),
            InvalidExpression::Parse(inner) => Some(inner),
        }
    }
}

/// `Value`, `Undefined`, or `Invalid` (the `Err` case).
pub type EvaluationResult = Result<Evaluation, InvalidExpression>;

/// Normalize and parse some text typed by a user.
pub fn compile(raw: &str) -> Result<Expression, InvalidExpression> {
    let canonical = normalize(raw)?;
    let expr = parse(canonical.as_str())?;

    Ok(expr)
}

/// Normalize, parse, and evaluate some text against an [`Environment`].
pub fn evaluate_str(raw: &str, env: &Environment) -> EvaluationResult {
    let expr = compile(raw)?;
    Ok(evaluate(&expr, env))
}

/// Evaluate an [`Expression`] against the variables in an [`Environment`].
pub fn evaluate(expr: &Expression, env: &Environment) -> Evaluation {
    evaluate_with(expr, |p| env.get(p.name()))
}

/// Evaluate an [`Expression`], using `lookup_parameter_value` to find the
/// value of each variable.
///
/// A [`Parameter`] the lookup doesn't know about falls back to the builtin
/// constants (see [`constant()`]), and is [`Evaluation::Undefined`] if it
/// isn't one of those either.
pub fn evaluate_with<F>(expr: &Expression, lookup_parameter_value: F) -> Evaluation
where
    F: Fn(&Parameter) -> Option<f64>,
{
    match value_of(expr, &lookup_parameter_value) {
        Some(value) => Evaluation::Value(value),
        None => Evaluation::Undefined,
    }
}

/// `None` means "undefined", which poisons every operation it touches.
fn value_of<F>(expr: &Expression, lookup: &F) -> Option<f64>
where
    F: Fn(&Parameter) -> Option<f64>,
{
    match expr {
        Expression::Parameter(p) => {
            lookup(p).or_else(|| constant(p.name()))
        },
        Expression::Constant(value) => Some(*value),
        Expression::Binary { left, right, op } => {
            let left = value_of(left, lookup)?;
            let right = value_of(right, lookup)?;

            let value = match op {
                BinaryOperation::Plus => left + right,
                BinaryOperation::Minus => left - right,
                BinaryOperation::Times => left * right,
                BinaryOperation::Divide => left / right,
                BinaryOperation::Power => left.powf(right),
            };

            Some(value)
        },
        Expression::Negate(inner) => value_of(inner, lookup).map(|v| -v),
        Expression::FunctionCall {
            function,
            arguments,
        } => {
            let mut values = [f64::NAN; 2];

            for (slot, argument) in values.iter_mut().zip(arguments) {
                *slot = value_of(argument, lookup)?;
            }

            Some(call(*function, &values[..arguments.len()]))
        },
    }
}

/// Look up one of the builtin constants by name.
pub fn constant(name: &str) -> Option<f64> {
    match name {
        "PI" => Some(consts::PI),
        "E" => Some(consts::E),
        "LN2" => Some(consts::LN_2),
        "LN10" => Some(consts::LN_10),
        "LOG2E" => Some(consts::LOG2_E),
        "LOG10E" => Some(consts::LOG10_E),
        "SQRT2" => Some(consts::SQRT_2),
        "SQRT1_2" => Some(consts::FRAC_1_SQRT_2),
        _ => None,
    }
}

/// Invoke a builtin. The parser has already checked `args` against
/// [`Builtin::arity()`].
fn call(function: Builtin, args: &[f64]) -> f64 {
    let x = args.first().copied().unwrap_or(f64::NAN);
    let second = args.get(1).copied();
    let y = second.unwrap_or(f64::NAN);

    match function {
        Builtin::Sqrt => x.sqrt(),
        Builtin::Cbrt => x.cbrt(),
        Builtin::Root => root(x, y),
        Builtin::Log => match second {
            Some(base) => x.ln() / base.ln(),
            None => x.log10(),
        },
        Builtin::Ln => x.ln(),
        Builtin::Log2 => x.log2(),
        Builtin::Log10 => x.log10(),
        Builtin::Log1p => x.ln_1p(),
        Builtin::Exp => x.exp(),
        Builtin::Expm1 => x.exp_m1(),
        Builtin::Abs => x.abs(),
        Builtin::Sign => sign(x),
        Builtin::Floor => x.floor(),
        Builtin::Ceil => x.ceil(),
        Builtin::Round => round_half_up(x),
        Builtin::Trunc => x.trunc(),
        Builtin::Sine => x.sin(),
        Builtin::Cosine => x.cos(),
        Builtin::Tangent => x.tan(),
        Builtin::ArcSine => x.asin(),
        Builtin::ArcCosine => x.acos(),
        Builtin::ArcTangent => x.atan(),
        Builtin::ArcTangent2 => x.atan2(y),
        Builtin::HyperbolicSine => x.sinh(),
        Builtin::HyperbolicCosine => x.cosh(),
        Builtin::HyperbolicTangent => x.tanh(),
        Builtin::HyperbolicArcSine => x.asinh(),
        Builtin::HyperbolicArcCosine => x.acosh(),
        Builtin::HyperbolicArcTangent => x.atanh(),
        Builtin::Hypot => x.hypot(y),
        Builtin::Pow => x.powf(y),
        Builtin::Min => second.map_or(x, |y| min(x, y)),
        Builtin::Max => second.map_or(x, |y| max(x, y)),
    }
}

/// The real `degree`-th root of `value`. Negative values only have a real
/// root when the degree is an odd integer.
fn root(value: f64, degree: f64) -> f64 {
    if value < 0.0 {
        if (degree % 2.0).abs() == 1.0 {
            -(-value).powf(1.0 / degree)
        } else {
            f64::NAN
        }
    } else {
        value.powf(1.0 / degree)
    }
}

/// `-1`, `0` or `1`, keeping the sign of zero and passing NaN through.
fn sign(x: f64) -> f64 {
    if x == 0.0 || x.is_nan() {
        x
    } else {
        x.signum()
    }
}

// f64::min and f64::max ignore NaN, but a NaN argument should win

fn min(x: f64, y: f64) -> f64 {
    if x.is_nan() || y.is_nan() {
        f64::NAN
    } else {
        x.min(y)
    }
}

fn max(x: f64, y: f64) -> f64 {
    if x.is_nan() || y.is_nan() {
        f64::NAN
    } else {
        x.max(y)
    }
}

/// Round to the nearest integer, with halves going towards positive
/// infinity (`-2.5` rounds to `-2`).
pub(crate) fn round_half_up(x: f64) -> f64 {
    let floor = x.floor();

    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// Round to a number of decimal places, with halves going towards positive
/// infinity.
pub(crate) fn round_to_decimal_places(x: f64, decimal_places: u32) -> f64 {
    let scale = 10_f64.powi(decimal_places as i32);
    round_half_up(x * scale) / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn eval(src: &str) -> EvaluationResult {
        evaluate_str(src, &Environment::new())
    }

    fn value(src: &str) -> f64 {
        match eval(src) {
            Ok(Evaluation::Value(value)) => value,
            other => panic!("Expected \"{}\" to be a value, got {:?}", src, other),
        }
    }

    #[test]
    fn simple_arithmetic() {
        let inputs = vec![
            ("1", 1.0),
            ("1 + 1.5", 1.0 + 1.5),
            ("1 - 1.5", 1.0 - 1.5),
            ("2 * 3", 2.0 * 3.0),
            ("4 / 2", 4.0 / 2.0),
            ("10 - 4 - 3", 3.0),
            ("2^3^2", 512.0),
            ("-2^2", -4.0),
            ("(-2)^2", 4.0),
            ("2^-1", 0.5),
            ("2(3 + 4)", 14.0),
            ("(1 + 1)(2 + 2)", 8.0),
            (".5 + 1.", 1.5),
            ("-(1 + 2)", -(1.0 + 2.0)),
        ];

        for (src, should_be) in inputs {
            assert_relative_eq!(value(src), should_be);
        }
    }

    #[test]
    fn builtin_functions() {
        let inputs = vec![
            ("sqrt(4)", 2.0),
            ("sqrt(2 + 2)", 2.0),
            ("√9 + ∛27", 6.0),
            ("cbrt(-27)", -3.0),
            ("root(-8, 3)", -2.0),
            ("root(16, 4)", 2.0),
            ("root(-32, -5)", -0.5),
            ("log(100)", 2.0),
            ("log(8, 2)", 3.0),
            ("ln(E)", 1.0),
            ("log2(8) + log10(1000)", 6.0),
            ("exp(0)", 1.0),
            ("abs(-3)", 3.0),
            ("sign(-3) + sign(0) + sign(7)", 0.0),
            ("floor(2.7) + ceil(2.1) + trunc(-2.7)", 3.0),
            ("round(2.5) + round(-2.5)", 1.0),
            ("sin(PI/2)", 1.0),
            ("cos(0)", 1.0),
            ("atan2(1, 1)", consts::FRAC_PI_4),
            ("hypot(3, 4)", 5.0),
            ("pow(2, 10)", 1024.0),
            ("min(3, 1) + max(3, 1)", 4.0),
            ("max(7)", 7.0),
            ("2pi", 2.0 * consts::PI),
            ("SQRT2 * SQRT1_2", 1.0),
        ];

        for (src, should_be) in inputs {
            assert_relative_eq!(value(src), should_be, epsilon = 1e-12);
        }
    }

    #[test]
    fn implicit_multiplication_with_a_variable() {
        let mut env = Environment::new();
        env.define("x", 5.0).unwrap();

        let got = evaluate_str("2x", &env).unwrap();

        assert_eq!(got, Evaluation::Value(10.0));
    }

    #[test]
    fn missing_variables_are_undefined() {
        let env = Environment::new();
        let inputs = vec!["2x", "0 * x", "x - x", "sqrt(y) + 1", "max(1, z)"];

        for src in inputs {
            let got = evaluate_str(src, &env).unwrap();
            assert_eq!(got, Evaluation::Undefined, "{}", src);
        }
    }

    #[test]
    fn variables_shadow_constants() {
        let mut env = Environment::new();
        env.define("E", 5.0).unwrap();

        let got = evaluate_str("E + PI", &env).unwrap();

        assert_eq!(got, Evaluation::Value(5.0 + consts::PI));
    }

    #[test]
    fn arithmetic_nan_and_infinity_are_values() {
        assert!(value("0/0").is_nan());
        assert!(value("root(-8, 2)").is_nan());
        assert!(value("sqrt(-1)").is_nan());
        assert_eq!(value("1/0"), f64::INFINITY);
        assert_eq!(value("-1/0"), f64::NEG_INFINITY);
    }

    #[test]
    fn malformed_text_is_invalid() {
        let inputs = vec![
            "2x; drop()",
            "",
            "(1 + 2",
            "1 + ",
            "root(8)",
            "log(1, 2, 3)",
            "system(1)",
            "sqrt",
            "√",
            "2 3",
        ];

        for src in inputs {
            assert!(eval(src).is_err(), "{:?} should be invalid", src);
        }
    }

    #[test]
    fn a_name_followed_by_parentheses_is_a_call() {
        // no multiplication is implied, so "x" has to be a function
        let got = eval("x(3)").unwrap_err();

        match got {
            InvalidExpression::Parse(ParseError::UnknownFunction {
                name,
                ..
            }) => assert_eq!(name.as_str(), "x"),
            other => panic!("Unexpected error: {:?}", other),
        }
    }

    #[test]
    fn rejected_text_is_reported_as_such() {
        let got = eval("2x; drop()").unwrap_err();

        assert_eq!(
            got,
            InvalidExpression::Rejected(RejectedInput::DisallowedCharacter {
                character: ';',
                index: 3,
            })
        );
    }

    #[test]
    fn evaluation_is_pure() {
        let mut env = Environment::new();
        env.define("x", 1.5).unwrap();
        let expr = compile("3x^2 - x/2").unwrap();

        let first = evaluate(&expr, &env);
        let second = evaluate(&expr, &env);

        assert_eq!(first, second);
        assert_eq!(first, Evaluation::Value(6.0));
    }

    #[test]
    fn weights_ignore_things_which_arent_finite() {
        assert_eq!(Evaluation::Value(2.5).weight(), 2.5);
        assert_eq!(Evaluation::Value(f64::NAN).weight(), 0.0);
        assert_eq!(Evaluation::Value(f64::INFINITY).weight(), 0.0);
        assert_eq!(Evaluation::Undefined.weight(), 0.0);
    }

    #[test]
    fn rounding_sends_halves_up() {
        assert_eq!(round_half_up(0.49999999999999994), 0.0);
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_relative_eq!(round_to_decimal_places(7.0, 2), 7.0);
        assert_relative_eq!(round_to_decimal_places(1.0 / 3.0, 2), 0.33);
        assert_relative_eq!(round_to_decimal_places(-2.0 / 3.0, 2), -0.67);
    }
}
