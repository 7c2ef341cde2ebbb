use crate::{
    config::ScaleConfig,
    env::Environment,
    expr::{Expression, Parameter},
    ops::{self, Evaluation},
};
use std::fmt::{self, Display, Formatter};

/// Find the value of the single unknown variable which balances the `left`
/// and `right` pans, using [`ScaleConfig::default()`].
pub fn solve<'a, L, R>(left: L, right: R, env: &Environment) -> SolveOutcome
where
    L: IntoIterator<Item = &'a Expression>,
    R: IntoIterator<Item = &'a Expression>,
{
    solve_with(left, right, env, &ScaleConfig::default())
}

/// Find the value of the single unknown variable which balances the `left`
/// and `right` pans.
///
/// Each pan's total is assumed to be affine in the unknown, `x`. That means
/// we only need to weigh both pans at two points to know the whole line:
///
/// ```text
/// left(x)  = slope_left * x + left(0)
/// right(x) = slope_right * x + right(0)
/// ```
///
/// where `slope = total(1) - total(0)`. Setting `left(x) = right(x)` and
/// rearranging gives
///
/// ```text
/// x = (right(0) - left(0)) / (slope_left - slope_right)
/// ```
///
/// If the slopes cancel there is either no solution or every value works.
/// Anything non-linear (e.g. `x^2`) is outside these assumptions and gives a
/// meaningless answer.
///
/// The environment is never modified; it is up to the caller to store a
/// [`SolveOutcome::Solved`] value.
pub fn solve_with<'a, L, R>(
    left: L,
    right: R,
    env: &Environment,
    config: &ScaleConfig,
) -> SolveOutcome
where
    L: IntoIterator<Item = &'a Expression>,
    R: IntoIterator<Item = &'a Expression>,
{
    let left: Vec<&Expression> = left.into_iter().collect();
    let right: Vec<&Expression> = right.into_iter().collect();

    if left.is_empty() && right.is_empty() {
        return SolveOutcome::NoBlocksOnScale;
    }

    let mut unknowns = unknowns(left.iter().chain(&right).copied(), env);

    let target = match unknowns.len() {
        0 => return SolveOutcome::NothingToSolve,
        1 => unknowns.remove(0),
        _ => {
            tracing::debug!(count = unknowns.len(), "Too many unknowns to solve");
            return SolveOutcome::TooManyUnknowns(unknowns);
        },
    };

    let weigh = |x: f64| -> (f64, f64) {
        let lookup = |p: &Parameter| {
            if *p == target {
                Some(x)
            } else {
                env.get(p.name())
            }
        };

        (total(&left, &lookup), total(&right, &lookup))
    };

    let (left_0, right_0) = weigh(0.0);
    let (left_1, right_1) = weigh(1.0);

    let slope_left = left_1 - left_0;
    let slope_right = right_1 - right_0;
    let denominator = slope_left - slope_right;

    tracing::debug!(
        unknown = %target,
        slope_left,
        slope_right,
        intercept_left = left_0,
        intercept_right = right_0,
        "Weighed the pans"
    );

    if denominator.abs() < config.degenerate_epsilon {
        // the unknown cancels out, so its value makes no difference
        return if (left_0 - right_0).abs() < config.degenerate_epsilon {
            SolveOutcome::AlreadyBalancedForAnyValue(target)
        } else {
            SolveOutcome::NoSolution(target)
        };
    }

    let value = ops::round_to_decimal_places(
        (right_0 - left_0) / denominator,
        config.decimal_places,
    );

    if !value.is_finite() {
        // a pan total overflowed, so the weighings can't be trusted
        tracing::debug!(unknown = %target, value, "The solution isn't finite");
        return SolveOutcome::NoSolution(target);
    }

    SolveOutcome::Solved {
        unknown: target,
        value,
    }
}

/// Every [`Parameter`] which isn't defined in the [`Environment`] or a builtin
/// constant, in order of first appearance.
pub fn unknowns<'a, I>(expressions: I, env: &Environment) -> Vec<Parameter>
where
    I: IntoIterator<Item = &'a Expression>,
{
    let mut unknowns: Vec<Parameter> = Vec::new();

    for expr in expressions {
        for param in expr.params() {
            let is_known = env.contains(param.name())
                || ops::constant(param.name()).is_some();

            if !is_known && !unknowns.contains(param) {
                unknowns.push(param.clone());
            }
        }
    }

    unknowns
}

fn total<F>(pan: &[&Expression], lookup: &F) -> f64
where
    F: Fn(&Parameter) -> Option<f64>,
{
    pan.iter()
        .map(|expr| ops::evaluate_with(expr, lookup))
        .map(Evaluation::weight)
        .sum()
}

/// What happened when trying to balance the scale.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    /// Both pans are empty.
    NoBlocksOnScale,
    /// Every variable on the scale already has a value.
    NothingToSolve,
    /// Only one unknown can be solved for at a time.
    TooManyUnknowns(Vec<Parameter>),
    /// The unknown cancels out and the pans can never balance.
    NoSolution(Parameter),
    /// The unknown cancels out and the pans balance no matter what.
    AlreadyBalancedForAnyValue(Parameter),
    Solved { unknown: Parameter, value: f64 },
}

impl SolveOutcome {
    pub fn is_solved(&self) -> bool {
        match self {
            SolveOutcome::Solved { .. } => true,
            _ => false,
        }
    }
}

impl Display for SolveOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SolveOutcome::NoBlocksOnScale => {
                write!(f, "Put some blocks on the scale first")
            },
            SolveOutcome::NothingToSolve => {
                write!(f, "There are no unknown variables to calculate")
            },
            SolveOutcome::TooManyUnknowns(names) => {
                let names: Vec<_> = names.iter().map(Parameter::name).collect();
                write!(
                    f,
                    "There are too many unknown variables ({}). The scale can \
                     only solve for one variable at a time",
                    names.join(", ")
                )
            },
            SolveOutcome::NoSolution(unknown) => write!(
                f,
                "Impossible to balance. {} cancels out or the equation has no \
                 solution",
                unknown
            ),
            SolveOutcome::AlreadyBalancedForAnyValue(unknown) => write!(
                f,
                "The scale is already balanced for any value of {}",
                unknown
            ),
            SolveOutcome::Solved { unknown, value } => {
                write!(f, "{} = {}", unknown, value)
            },
        }
    }
}
