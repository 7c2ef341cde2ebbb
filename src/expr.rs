use arrayvec::ArrayVec;
use smol_str::SmolStr;
use std::{
    fmt::{self, Display, Formatter},
    ops::{Add, Div, Mul, Neg, Sub},
};

/// The arguments passed to a [`Builtin`]. No builtin takes more than two.
pub type Arguments = ArrayVec<[Box<Expression>; 2]>;

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A named value, resolved against the caller's variables or the builtin
    /// constants at evaluation time.
    Parameter(Parameter),
    Constant(f64),
    /// An expression involving two operands.
    Binary {
        left: Box<Expression>,
        right: Box<Expression>,
        op: BinaryOperation,
    },
    /// Negate the expression.
    Negate(Box<Expression>),
    /// Invoke a builtin function.
    FunctionCall {
        function: Builtin,
        arguments: Arguments,
    },
}

impl Expression {
    /// Iterate over every [`Parameter`] referenced by this expression, in the
    /// order they appear in the source text.
    pub fn params(&self) -> Params<'_> { Params { stack: vec![self] } }

    pub fn depends_on(&self, param: &Parameter) -> bool {
        self.params().any(|p| p == param)
    }

    pub(crate) fn precedence(&self) -> Precedence {
        match self {
            Expression::Binary { op, .. } => op.precedence(),
            Expression::Negate(_) => Precedence::Unary,
            Expression::Constant(value) if value.is_sign_negative() => {
                Precedence::Unary
            },
            Expression::Parameter(_)
            | Expression::Constant(_)
            | Expression::FunctionCall { .. } => Precedence::Atom,
        }
    }
}

/// A depth-first walk over the [`Parameter`]s in an [`Expression`].
#[derive(Debug, Clone)]
pub struct Params<'a> {
    stack: Vec<&'a Expression>,
}

impl<'a> Iterator for Params<'a> {
    type Item = &'a Parameter;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(expr) = self.stack.pop() {
            match expr {
                Expression::Parameter(p) => return Some(p),
                Expression::Constant(_) => {},
                Expression::Binary { left, right, .. } => {
                    self.stack.push(right);
                    self.stack.push(left);
                },
                Expression::Negate(inner) => self.stack.push(inner),
                Expression::FunctionCall { arguments, .. } => {
                    self.stack.extend(arguments.iter().rev().map(|a| &**a));
                },
            }
        }

        None
    }
}

/// A named value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Parameter(SmolStr);

impl Parameter {
    pub fn named<S: Into<SmolStr>>(name: S) -> Self { Parameter(name.into()) }

    pub fn name(&self) -> &str { &self.0 }
}

impl Display for Parameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Parameter> for Expression {
    fn from(p: Parameter) -> Expression { Expression::Parameter(p) }
}

/// An operation that can be applied to two arguments.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BinaryOperation {
    Plus,
    Minus,
    Times,
    Divide,
    Power,
}

impl BinaryOperation {
    pub(crate) fn precedence(self) -> Precedence {
        match self {
            BinaryOperation::Plus | BinaryOperation::Minus => Precedence::Sum,
            BinaryOperation::Times | BinaryOperation::Divide => {
                Precedence::Product
            },
            BinaryOperation::Power => Precedence::Power,
        }
    }

    /// Whether the `left` and `right` operands need to be wrapped in
    /// parentheses to survive a round trip through the parser.
    pub(crate) fn parenthesize(
        self,
        left: &Expression,
        right: &Expression,
    ) -> (bool, bool) {
        let precedence = self.precedence();

        // ** is right associative, everything else groups to the left
        match self {
            BinaryOperation::Power => (
                left.precedence() <= Precedence::Power,
                right.precedence() < Precedence::Unary,
            ),
            _ => (
                left.precedence() < precedence,
                right.precedence() <= precedence,
            ),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Precedence {
    Sum,
    Product,
    Unary,
    Power,
    Atom,
}

/// The closed set of functions an expression may call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Builtin {
    Sqrt,
    Cbrt,
    /// `root(value, degree)`, the real-valued n-th root.
    Root,
    /// `log(value)` in base 10, or `log(value, base)`.
    Log,
    Ln,
    Log2,
    Log10,
    Log1p,
    Exp,
    Expm1,
    Abs,
    Sign,
    Floor,
    Ceil,
    Round,
    Trunc,
    Sine,
    Cosine,
    Tangent,
    ArcSine,
    ArcCosine,
    ArcTangent,
    ArcTangent2,
    HyperbolicSine,
    HyperbolicCosine,
    HyperbolicTangent,
    HyperbolicArcSine,
    HyperbolicArcCosine,
    HyperbolicArcTangent,
    Hypot,
    Pow,
    Min,
    Max,
}

impl Builtin {
    const ALL: &'static [Builtin] = &[
        Builtin::Sqrt,
        Builtin::Cbrt,
        Builtin::Root,
        Builtin::Log,
        Builtin::Ln,
        Builtin::Log2,
        Builtin::Log10,
        Builtin::Log1p,
        Builtin::Exp,
        Builtin::Expm1,
        Builtin::Abs,
        Builtin::Sign,
        Builtin::Floor,
        Builtin::Ceil,
        Builtin::Round,
        Builtin::Trunc,
        Builtin::Sine,
        Builtin::Cosine,
        Builtin::Tangent,
        Builtin::ArcSine,
        Builtin::ArcCosine,
        Builtin::ArcTangent,
        Builtin::ArcTangent2,
        Builtin::HyperbolicSine,
        Builtin::HyperbolicCosine,
        Builtin::HyperbolicTangent,
        Builtin::HyperbolicArcSine,
        Builtin::HyperbolicArcCosine,
        Builtin::HyperbolicArcTangent,
        Builtin::Hypot,
        Builtin::Pow,
        Builtin::Min,
        Builtin::Max,
    ];

    /// Look up a builtin by the name used to call it.
    pub fn from_name(name: &str) -> Option<Builtin> {
        Builtin::ALL.iter().copied().find(|b| b.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Sqrt => "sqrt",
            Builtin::Cbrt => "cbrt",
            Builtin::Root => "root",
            Builtin::Log => "log",
            Builtin::Ln => "ln",
            Builtin::Log2 => "log2",
            Builtin::Log10 => "log10",
            Builtin::Log1p => "log1p",
            Builtin::Exp => "exp",
            Builtin::Expm1 => "expm1",
            Builtin::Abs => "abs",
            Builtin::Sign => "sign",
            Builtin::Floor => "floor",
            Builtin::Ceil => "ceil",
            Builtin::Round => "round",
            Builtin::Trunc => "trunc",
            Builtin::Sine => "sin",
            Builtin::Cosine => "cos",
            Builtin::Tangent => "tan",
            Builtin::ArcSine => "asin",
            Builtin::ArcCosine => "acos",
            Builtin::ArcTangent => "atan",
            Builtin::ArcTangent2 => "atan2",
            Builtin::HyperbolicSine => "sinh",
            Builtin::HyperbolicCosine => "cosh",
            Builtin::HyperbolicTangent => "tanh",
            Builtin::HyperbolicArcSine => "asinh",
            Builtin::HyperbolicArcCosine => "acosh",
            Builtin::HyperbolicArcTangent => "atanh",
            Builtin::Hypot => "hypot",
            Builtin::Pow => "pow",
            Builtin::Min => "min",
            Builtin::Max => "max",
        }
    }

    /// The smallest and largest number of arguments this function accepts.
    pub fn arity(self) -> (usize, usize) {
        match self {
            Builtin::Log | Builtin::Min | Builtin::Max => (1, 2),
            Builtin::Root
            | Builtin::ArcTangent2
            | Builtin::Hypot
            | Builtin::Pow => (2, 2),
            _ => (1, 1),
        }
    }
}

impl Display for Builtin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// define some operator overloads to make constructing an expression easier.

fn binary(left: Expression, right: Expression, op: BinaryOperation) -> Expression {
    Expression::Binary {
        left: Box::new(left),
        right: Box::new(right),
        op,
    }
}

impl Add for Expression {
    type Output = Expression;

    fn add(self, rhs: Expression) -> Expression {
        binary(self, rhs, BinaryOperation::Plus)
    }
}

impl Sub for Expression {
    type Output = Expression;

    fn sub(self, rhs: Expression) -> Expression {
        binary(self, rhs, BinaryOperation::Minus)
    }
}

impl Mul for Expression {
    type Output = Expression;

    fn mul(self, rhs: Expression) -> Expression {
        binary(self, rhs, BinaryOperation::Times)
    }
}

impl Div for Expression {
    type Output = Expression;

    fn div(self, rhs: Expression) -> Expression {
        binary(self, rhs, BinaryOperation::Divide)
    }
}

impl Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Self::Output { Expression::Negate(Box::new(self)) }
}

/// Writes the canonical text for an expression, which [`crate::parse()`]
/// reads back into the same tree.
impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Parameter(p) => write!(f, "{}", p),
            Expression::Constant(value) => write!(f, "{}", value),
            Expression::Binary { left, right, op } => {
                let (left_needs_parens, right_needs_parens) =
                    op.parenthesize(left, right);

                write_operand(left, left_needs_parens, f)?;

                let op = match op {
                    BinaryOperation::Plus => " + ",
                    BinaryOperation::Minus => " - ",
                    BinaryOperation::Times => "*",
                    BinaryOperation::Divide => "/",
                    BinaryOperation::Power => "**",
                };
                write!(f, "{}", op)?;

                write_operand(right, right_needs_parens, f)
            },
            Expression::Negate(inner) => {
                write!(f, "-")?;
                write_operand(inner, inner.precedence() < Precedence::Unary, f)
            },
            Expression::FunctionCall {
                function,
                arguments,
            } => {
                write!(f, "{}(", function)?;

                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }

                write!(f, ")")
            },
        }
    }
}

fn write_operand(
    expr: &Expression,
    parenthesize: bool,
    f: &mut Formatter<'_>,
) -> fmt::Result {
    if parenthesize {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}
