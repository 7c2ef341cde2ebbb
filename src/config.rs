/// The numeric policy used when solving and reading the scale.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScaleConfig {
    /// Slopes or intercepts closer together than this are treated as equal
    /// by the solver.
    pub degenerate_epsilon: f64,
    /// Pan totals closer together than this read as balanced.
    pub balance_epsilon: f64,
    /// How many decimal places a solved value is rounded to.
    pub decimal_places: u32,
    /// Degrees of tilt per unit of difference between the pans.
    pub tilt_per_unit: f64,
    /// The beam never tilts further than this many degrees either way.
    pub max_tilt: f64,
}

impl ScaleConfig {
    pub fn new() -> Self { ScaleConfig::default() }

    pub fn with_degenerate_epsilon(self, degenerate_epsilon: f64) -> Self {
        ScaleConfig {
            degenerate_epsilon,
            ..self
        }
    }

    pub fn with_balance_epsilon(self, balance_epsilon: f64) -> Self {
        ScaleConfig {
            balance_epsilon,
            ..self
        }
    }

    pub fn with_decimal_places(self, decimal_places: u32) -> Self {
        ScaleConfig {
            decimal_places,
            ..self
        }
    }

    pub fn with_tilt(self, tilt_per_unit: f64, max_tilt: f64) -> Self {
        ScaleConfig {
            tilt_per_unit,
            max_tilt,
            ..self
        }
    }
}

impl Default for ScaleConfig {
    fn default() -> Self {
        ScaleConfig {
            degenerate_epsilon: 1e-10,
            balance_epsilon: 0.001,
            decimal_places: 2,
            tilt_per_unit: 2.0,
            max_tilt: 20.0,
        }
    }
}
