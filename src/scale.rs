use crate::{config::ScaleConfig, ops::Evaluation};
use euclid::Angle;
use std::fmt::{self, Display, Formatter};

/// How the two pans compare.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Relation {
    Balanced,
    LeftHeavier,
    RightHeavier,
}

impl Relation {
    /// The symbol written between the left and right totals.
    pub fn symbol(self) -> char {
        match self {
            Relation::Balanced => '=',
            Relation::LeftHeavier => '>',
            Relation::RightHeavier => '<',
        }
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Everything needed to draw the scale.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScaleReading {
    pub left_total: f64,
    pub right_total: f64,
    pub relation: Relation,
    /// How far the beam is rotated. Positive when the right pan is lower.
    pub tilt: Angle<f64>,
    /// At least one block on the scale is NaN, either because it uses an
    /// undefined variable or because its arithmetic produced NaN. The scale
    /// is drawn level while this is set.
    pub has_undefined: bool,
}

/// Read the scale using [`ScaleConfig::default()`].
pub fn read<L, R>(left: L, right: R) -> ScaleReading
where
    L: IntoIterator<Item = Evaluation>,
    R: IntoIterator<Item = Evaluation>,
{
    read_with(left, right, &ScaleConfig::default())
}

/// Total up each pan and work out which way the scale leans.
///
/// A NaN block weighs nothing, and while there are any of them the scale is
/// reported as balanced and level.
pub fn read_with<L, R>(left: L, right: R, config: &ScaleConfig) -> ScaleReading
where
    L: IntoIterator<Item = Evaluation>,
    R: IntoIterator<Item = Evaluation>,
{
    let mut has_undefined = false;
    let left_total = pan_total(left, &mut has_undefined);
    let right_total = pan_total(right, &mut has_undefined);

    // infinite weight on both pans leaves nothing to compare
    let difference = right_total - left_total;
    let comparable = !has_undefined && !difference.is_nan();

    let relation = if !comparable || difference.abs() < config.balance_epsilon
    {
        Relation::Balanced
    } else if left_total > right_total {
        Relation::LeftHeavier
    } else {
        Relation::RightHeavier
    };

    let degrees = if comparable {
        (difference * config.tilt_per_unit)
            .max(-config.max_tilt)
            .min(config.max_tilt)
    } else {
        0.0
    };

    ScaleReading {
        left_total,
        right_total,
        relation,
        tilt: Angle::degrees(degrees),
        has_undefined,
    }
}

fn pan_total<I>(pan: I, has_undefined: &mut bool) -> f64
where
    I: IntoIterator<Item = Evaluation>,
{
    let mut total = 0.0;

    for evaluation in pan {
        if evaluation.is_nan() {
            *has_undefined = true;
        } else {
            total += evaluation.as_f64();
        }
    }

    total
}
