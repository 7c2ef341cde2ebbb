//! Rewriting the notation people type into the canonical text understood by
//! [`crate::parse()`].
//!
//! The rewrites happen in a fixed order, with each step relying on the ones
//! before it:
//!
//! 1. Display glyphs are spelled out (`²` becomes `^2`, `√9` becomes
//!    `sqrt(9)`, `π` and `pi` become `PI`)
//! 2. Implicit multiplication is made explicit (`2x(y)` becomes `2*x*(y)`)
//! 3. `^` becomes the `**` power operator
//! 4. Anything left outside `[0-9+\-*/().,A-Za-z_\s]` rejects the input
//!
//! Normalizing canonical text leaves it unchanged.

use crate::parse::MAX_DEPTH;
use regex::Regex;
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    sync::OnceLock,
};

/// Expression text which has been through [`normalize()`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalExpression(String);

impl CanonicalExpression {
    pub fn as_str(&self) -> &str { &self.0 }

    pub fn into_string(self) -> String { self.0 }
}

impl AsRef<str> for CanonicalExpression {
    fn as_ref(&self) -> &str { &self.0 }
}

impl Display for CanonicalExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why [`normalize()`] refused some text.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectedInput {
    /// There was nothing but whitespace.
    Empty,
    /// A character outside the expression alphabet. The index is a byte
    /// offset into the rewritten text.
    DisallowedCharacter { character: char, index: usize },
    /// Radicals were applied to radicals more than [`MAX_DEPTH`] times. The
    /// index is a byte offset into the original text.
    TooDeeplyNested { index: usize },
}

impl Display for RejectedInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RejectedInput::Empty => write!(f, "The expression is empty"),
            RejectedInput::DisallowedCharacter { character, index } => write!(
                f,
                "\"{}\" (at index {}) isn't allowed in an expression",
                character, index
            ),
            RejectedInput::TooDeeplyNested { index } => write!(
                f,
                "Too many radicals are nested inside each other at index {}",
                index
            ),
        }
    }
}

impl Error for RejectedInput {}

/// Rewrite human-friendly notation into a [`CanonicalExpression`].
pub fn normalize(raw: &str) -> Result<CanonicalExpression, RejectedInput> {
    let raw = raw.trim();

    if raw.is_empty() {
        return Err(RejectedInput::Empty);
    }

    let text = substitute_symbols(raw)?;
    let text = insert_implicit_multiplication(&text);
    let text = text.replace('^', "**");

    if let Some(m) = disallowed_character().find(&text) {
        let character = m.as_str().chars().next().unwrap_or_default();

        return Err(RejectedInput::DisallowedCharacter {
            character,
            index: m.start(),
        });
    }

    Ok(CanonicalExpression(text))
}

fn disallowed_character() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[^0-9+\-*/().,A-Za-z_\s]").expect("Valid regex")
    })
}

fn identifier() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("Valid regex")
    })
}

fn substitute_symbols(src: &str) -> Result<String, RejectedInput> {
    let chars: Vec<char> = src.chars().collect();
    let mut cursor = 0;
    let mut spelled_out = String::with_capacity(src.len());

    while cursor < chars.len() {
        match chars[cursor] {
            '²' => spelled_out.push_str("^2"),
            '³' => spelled_out.push_str("^3"),
            'π' => spelled_out.push_str("PI"),
            '√' | '∛' => {
                cursor = radical(&chars, cursor, &mut spelled_out, 0)?;
                continue;
            },
            other => spelled_out.push(other),
        }

        cursor += 1;
    }

    let spelled_out = identifier()
        .replace_all(&spelled_out, |caps: &regex::Captures<'_>| {
            let name = &caps[0];
            if name.eq_ignore_ascii_case("pi") {
                String::from("PI")
            } else {
                name.to_string()
            }
        })
        .into_owned();

    Ok(spelled_out)
}

/// Spell out the radical at `chars[start]` as a function call, returning the
/// index just past its operand.
///
/// `√(...)` only needs the function name, while a number, identifier, call or
/// nested radical directly after the glyph gets wrapped in parentheses. A
/// radical with nothing usable after it becomes a bare function name, which
/// the parser rejects.
fn radical(
    chars: &[char],
    start: usize,
    out: &mut String,
    depth: usize,
) -> Result<usize, RejectedInput> {
    if depth >= MAX_DEPTH {
        let index = chars[..start].iter().map(|c| c.len_utf8()).sum();
        return Err(RejectedInput::TooDeeplyNested { index });
    }

    let function = if chars[start] == '∛' { "cbrt" } else { "sqrt" };
    out.push_str(function);

    let operand_start = start + 1;

    match chars.get(operand_start) {
        Some('(') => Ok(operand_start),
        Some(&c) if starts_operand(c) => {
            out.push('(');
            let end = operand(chars, operand_start, out, depth)?;
            out.push(')');
            Ok(end)
        },
        _ => Ok(operand_start),
    }
}

fn starts_operand(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '√' || c == '∛'
}

fn operand(
    chars: &[char],
    start: usize,
    out: &mut String,
    depth: usize,
) -> Result<usize, RejectedInput> {
    let c = chars[start];

    if c == '√' || c == '∛' {
        return radical(chars, start, out, depth + 1);
    }

    let is_name = c.is_ascii_alphabetic() || c == '_';
    let mut end = start;

    while end < chars.len() {
        let c = chars[end];
        let keep_going = if is_name {
            c.is_ascii_alphanumeric() || c == '_'
        } else {
            c.is_ascii_digit() || c == '.'
        };

        if !keep_going {
            break;
        }
        end += 1;
    }

    out.extend(&chars[start..end]);

    // a function call's arguments belong to the operand, e.g. "√abs(x)"
    if is_name && chars.get(end) == Some(&'(') {
        let mut open_parens = 0;

        while end < chars.len() {
            let c = chars[end];
            out.push(c);
            end += 1;

            match c {
                '(' => open_parens += 1,
                ')' => {
                    open_parens -= 1;
                    if open_parens == 0 {
                        break;
                    }
                },
                _ => {},
            }
        }
    }

    Ok(end)
}

/// Insert `*` after a number that runs into a name or `(`, and after a `)`
/// that runs into a name, number or `(`.
///
/// Digits inside a name (the `2` in `x2`) belong to the name and never
/// trigger a multiplication.
fn insert_implicit_multiplication(src: &str) -> String {
    let mut out = String::with_capacity(src.len() + src.len() / 4);
    let mut previous: Option<char> = None;
    let mut in_name = false;

    for c in src.chars() {
        if let Some(p) = previous {
            let after_number = p.is_ascii_digit() && !in_name;
            let after_group = p == ')';

            let needs_times = (after_number
                && (c.is_ascii_alphabetic() || c == '_' || c == '('))
                || (after_group
                    && (c.is_ascii_alphanumeric() || c == '_' || c == '('));

            if needs_times {
                out.push('*');
            }
        }

        in_name = if c.is_ascii_alphabetic() || c == '_' {
            true
        } else if c.is_ascii_digit() {
            in_name
        } else {
            false
        };

        out.push(c);
        previous = Some(c);
    }

    out
}
