use smol_str::SmolStr;
use std::{
    collections::BTreeMap,
    error::Error,
    fmt::{self, Display, Formatter},
};

/// The values assigned to named variables.
///
/// Names follow `[A-Za-z_][A-Za-z0-9_]*` and every value is finite.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Environment {
    values: BTreeMap<SmolStr, f64>,
}

impl Environment {
    pub fn new() -> Self { Environment::default() }

    /// Assign a value to a variable, returning the value it used to have.
    pub fn define<S>(
        &mut self,
        name: S,
        value: f64,
    ) -> Result<Option<f64>, VariableError>
    where
        S: AsRef<str>,
    {
        let name = name.as_ref().trim();

        if !is_valid_name(name) {
            return Err(VariableError::InvalidName { name: name.into() });
        }
        if !value.is_finite() {
            return Err(VariableError::NotFinite {
                name: name.into(),
                value,
            });
        }

        Ok(self.values.insert(name.into(), value))
    }

    /// A copy of this environment with one extra (or replaced) variable.
    pub fn with<S>(&self, name: S, value: f64) -> Result<Self, VariableError>
    where
        S: AsRef<str>,
    {
        let mut env = self.clone();
        env.define(name, value)?;
        Ok(env)
    }

    /// Forget a variable. The name is trimmed the same way as in
    /// [`Environment::define()`].
    pub fn remove(&mut self, name: &str) -> Option<f64> {
        self.values.remove(name.trim())
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize { self.values.len() }

    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    pub fn clear(&mut self) { self.values.clear(); }

    /// Iterate over every variable, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

/// Does `name` look like `[A-Za-z_][A-Za-z0-9_]*`?
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        },
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VariableError {
    InvalidName { name: SmolStr },
    NotFinite { name: SmolStr, value: f64 },
}

impl Display for VariableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            VariableError::InvalidName { name } => write!(
                f,
                "\"{}\" isn't a valid variable name. Use letters, digits and \
                 underscores, starting with a letter or underscore",
                name
            ),
            VariableError::NotFinite { name, value } => {
                write!(f, "Unable to set {} to {}", name, value)
            },
        }
    }
}

impl Error for VariableError {}
