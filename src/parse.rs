use crate::expr::{Arguments, BinaryOperation, Builtin, Expression, Parameter};
use smol_str::SmolStr;
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    iter::Peekable,
    ops::Range,
};

/// Parse an [`Expression`] tree from canonical text (see
/// [`crate::normalize()`]).
pub fn parse(s: &str) -> Result<Expression, ParseError> {
    Parser::new(s).parse()
}

/// A simple recursive descent parser (`LL(1)`) for converting a string into an
/// expression tree.
///
/// The grammar:
///
/// ```text
/// expression     := term (("+" | "-") term)*
///
/// term           := unary (("*" | "/") unary)*
///
/// unary          := "-" unary
///                 | "+" unary
///                 | power
///
/// power          := primary "**" unary
///                 | primary
///
/// primary        := variable_or_function_call
///                 | "(" expression ")"
///                 | NUMBER
///
/// variable_or_function_call = IDENTIFIER "(" arguments ")"
///                           | IDENTIFIER
///
/// arguments      := expression ("," expression)*
/// ```
///
/// Function names are resolved against [`Builtin`] while parsing, so an
/// unknown function or the wrong number of arguments is a [`ParseError`].
///
/// Every operator and every level of nesting counts towards a limit of
/// [`MAX_DEPTH`], which keeps the recursion (here and when the tree is later
/// walked) well inside the stack.
#[derive(Debug, Clone)]
pub(crate) struct Parser<'a> {
    tokens: Peekable<Tokens<'a>>,
    depth: usize,
}

/// The deepest an expression tree may be.
pub const MAX_DEPTH: usize = 256;

impl<'a> Parser<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Parser {
            tokens: Tokens::new(src).peekable(),
            depth: 0,
        }
    }

    pub(crate) fn parse(mut self) -> Result<Expression, ParseError> {
        let expr = self.expression()?;

        match self.tokens.next() {
            None => Ok(expr),
            Some(Ok(token)) => Err(ParseError::UnexpectedToken {
                found: token.kind,
                span: token.span,
                expected: &[
                    TokenKind::Plus,
                    TokenKind::Minus,
                    TokenKind::Times,
                    TokenKind::Divide,
                    TokenKind::Power,
                ],
            }),
            Some(Err(e)) => Err(e),
        }
    }

    fn peek(&mut self) -> Option<TokenKind> {
        self.tokens
            .peek()
            .and_then(|result| result.as_ref().ok())
            .map(|tok| tok.kind)
    }

    /// Go one level deeper, failing at the token about to be parsed if the
    /// tree would get too deep.
    ///
    /// Errors abort the whole parse, so only the success paths need to
    /// climb back out.
    fn descend(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_DEPTH {
            let span = match self.tokens.peek() {
                Some(Ok(token)) => token.span.clone(),
                Some(Err(e)) => return Err(e.clone()),
                None => return Err(ParseError::UnexpectedEndOfInput),
            };

            return Err(ParseError::TooDeeplyNested { span });
        }

        self.depth += 1;
        Ok(())
    }

    fn advance(&mut self) -> Result<Token<'a>, ParseError> {
        match self.tokens.next() {
            Some(result) => result,
            None => Err(ParseError::UnexpectedEndOfInput),
        }
    }

    fn expect(
        &mut self,
        kind: &'static [TokenKind],
    ) -> Result<Token<'a>, ParseError> {
        let token = self.advance()?;

        if kind.contains(&token.kind) {
            Ok(token)
        } else {
            Err(ParseError::UnexpectedToken {
                found: token.kind,
                span: token.span,
                expected: kind,
            })
        }
    }

    /// Consume the next token if it is one of the `expected` binary
    /// operators.
    fn binary_operator(
        &mut self,
        expected: &[TokenKind],
    ) -> Result<Option<BinaryOperation>, ParseError> {
        match self.peek() {
            Some(kind) if expected.contains(&kind) => {
                // skip past the operator
                let _ = self.advance()?;
                Ok(Some(kind.as_binary_op()))
            },
            _ => Ok(None),
        }
    }

    fn expression(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.term()?;
        let depth = self.depth;

        while let Some(op) =
            self.binary_operator(&[TokenKind::Plus, TokenKind::Minus])?
        {
            // each operator pushes the terms before it one level down
            self.descend()?;
            let right = self.term()?;
            left = Expression::Binary {
                left: Box::new(left),
                right: Box::new(right),
                op,
            };
        }

        self.depth = depth;
        Ok(left)
    }

    fn term(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.unary()?;
        let depth = self.depth;

        while let Some(op) =
            self.binary_operator(&[TokenKind::Times, TokenKind::Divide])?
        {
            self.descend()?;
            let right = self.unary()?;
            left = Expression::Binary {
                left: Box::new(left),
                right: Box::new(right),
                op,
            };
        }

        self.depth = depth;
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expression, ParseError> {
        self.descend()?;

        let expr = match self.peek() {
            Some(TokenKind::Minus) => {
                let _ = self.advance()?;
                let operand = self.unary()?;
                Expression::Negate(Box::new(operand))
            },
            Some(TokenKind::Plus) => {
                let _ = self.advance()?;
                self.unary()?
            },
            _ => self.power()?,
        };

        self.depth -= 1;
        Ok(expr)
    }

    fn power(&mut self) -> Result<Expression, ParseError> {
        let base = self.primary()?;

        if self.peek() == Some(TokenKind::Power) {
            let _ = self.advance()?;
            // the exponent may carry its own sign, as in "2**-1"
            let exponent = self.unary()?;

            return Ok(Expression::Binary {
                left: Box::new(base),
                right: Box::new(exponent),
                op: BinaryOperation::Power,
            });
        }

        Ok(base)
    }

    fn primary(&mut self) -> Result<Expression, ParseError> {
        let expected = &[
            TokenKind::Number,
            TokenKind::Identifier,
            TokenKind::Minus,
            TokenKind::OpenParen,
        ];

        match self.peek() {
            Some(TokenKind::Number) => {
                return self.number();
            },
            Some(TokenKind::Identifier) => {
                return self.variable_or_function_call()
            },
            Some(TokenKind::OpenParen) => {
                let _ = self.advance()?;
                let expr = self.expression()?;
                let _ = self.expect(&[TokenKind::CloseParen])?;
                return Ok(expr);
            },
            _ => {},
        }

        // we couldn't parse the primary, return a nice error
        match self.tokens.next() {
            Some(Ok(Token { span, kind, .. })) => {
                Err(ParseError::UnexpectedToken {
                    found: kind,
                    expected,
                    span,
                })
            },
            Some(Err(e)) => Err(e),
            None => Err(ParseError::UnexpectedEndOfInput),
        }
    }

    fn variable_or_function_call(&mut self) -> Result<Expression, ParseError> {
        let ident = self.advance()?;
        debug_assert_eq!(ident.kind, TokenKind::Identifier);

        if self.peek() == Some(TokenKind::OpenParen) {
            return self.function_call(ident);
        }

        match Builtin::from_name(ident.text) {
            Some(function) => Err(ParseError::MissingArguments {
                function,
                span: ident.span,
            }),
            None => Ok(Expression::Parameter(Parameter::named(ident.text))),
        }
    }

    fn function_call(
        &mut self,
        identifier: Token<'a>,
    ) -> Result<Expression, ParseError> {
        let function = Builtin::from_name(identifier.text).ok_or_else(|| {
            ParseError::UnknownFunction {
                name: identifier.text.into(),
                span: identifier.span.clone(),
            }
        })?;

        let open_paren = self.advance()?;
        debug_assert_eq!(open_paren.kind, TokenKind::OpenParen);

        let mut arguments = Arguments::new();
        let mut count = 0;

        if self.peek() != Some(TokenKind::CloseParen) {
            loop {
                let argument = self.expression()?;
                count += 1;
                // anything past the capacity is still parsed so the error
                // can report how many arguments were given
                let _ = arguments.try_push(Box::new(argument));

                if self.peek() == Some(TokenKind::Comma) {
                    let _ = self.advance()?;
                } else {
                    break;
                }
            }
        }

        let close_paren =
            self.expect(&[TokenKind::Comma, TokenKind::CloseParen])?;
        let span = identifier.span.start..close_paren.span.end;

        let (min, max) = function.arity();
        if count < min || count > max {
            return Err(ParseError::WrongNumberOfArguments {
                function,
                found: count,
                span,
            });
        }

        Ok(Expression::FunctionCall {
            function,
            arguments,
        })
    }

    fn number(&mut self) -> Result<Expression, ParseError> {
        let token = self.advance()?;
        debug_assert_eq!(token.kind, TokenKind::Number);

        token
            .text
            .parse()
            .map(Expression::Constant)
            .map_err(|_| ParseError::InvalidNumber { span: token.span })
    }
}

/// Possible errors that may occur while parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    InvalidCharacter {
        character: char,
        index: usize,
    },
    InvalidNumber {
        span: Range<usize>,
    },
    UnexpectedEndOfInput,
    UnexpectedToken {
        found: TokenKind,
        span: Range<usize>,
        expected: &'static [TokenKind],
    },
    UnknownFunction {
        name: SmolStr,
        span: Range<usize>,
    },
    WrongNumberOfArguments {
        function: Builtin,
        found: usize,
        span: Range<usize>,
    },
    /// A function's name was used without calling it.
    MissingArguments {
        function: Builtin,
        span: Range<usize>,
    },
    /// Parentheses, signs or operators were nested more than [`MAX_DEPTH`]
    /// levels deep.
    TooDeeplyNested {
        span: Range<usize>,
    },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidCharacter { character, index } => write!(
                f,
                "Invalid character, \"{}\", at index {}",
                character, index
            ),
            ParseError::InvalidNumber { span } => {
                write!(f, "Invalid number at {:?}", span)
            },
            ParseError::UnexpectedEndOfInput => {
                write!(f, "Unexpected end of input")
            },
            ParseError::UnexpectedToken {
                found,
                span,
                expected,
            } => write!(
                f,
                "Found a {:?} at {:?} but expected one of {:?}",
                found, span, expected
            ),
            ParseError::UnknownFunction { name, .. } => {
                write!(f, "There is no function called \"{}\"", name)
            },
            ParseError::MissingArguments { function, .. } => {
                write!(f, "{}() needs to be called with arguments", function)
            },
            ParseError::TooDeeplyNested { span } => write!(
                f,
                "The expression is nested too deeply at {:?}",
                span
            ),
            ParseError::WrongNumberOfArguments {
                function, found, ..
            } => {
                let (min, max) = function.arity();
                if min == max {
                    write!(
                        f,
                        "{}() takes {} argument(s) but {} were given",
                        function, min, found
                    )
                } else {
                    write!(
                        f,
                        "{}() takes {} to {} arguments but {} were given",
                        function, min, max, found
                    )
                }
            },
        }
    }
}

impl Error for ParseError {}

#[derive(Debug, Clone, PartialEq)]
struct Tokens<'a> {
    src: &'a str,
    cursor: usize,
}

impl<'a> Tokens<'a> {
    fn new(src: &'a str) -> Self { Tokens { src, cursor: 0 } }

    fn rest(&self) -> &'a str { &self.src[self.cursor..] }

    fn peek(&self) -> Option<char> { self.rest().chars().next() }

    fn peek_second(&self) -> Option<char> { self.rest().chars().nth(1) }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.cursor += c.len_utf8();
        Some(c)
    }

    fn chomp(
        &mut self,
        kind: TokenKind,
        length: usize,
    ) -> Option<Result<Token<'a>, ParseError>> {
        let start = self.cursor;
        for _ in 0..length {
            self.advance()?;
        }
        let end = self.cursor;

        Some(Ok(Token::from_text(self.src, start..end, kind)))
    }

    fn take_while<P>(&mut self, mut predicate: P) -> Range<usize>
    where
        P: FnMut(char) -> bool,
    {
        let start = self.cursor;

        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }

            self.advance();
        }

        start..self.cursor
    }

    fn chomp_integer(&mut self) -> Range<usize> {
        self.take_while(|c| c.is_ascii_digit())
    }

    fn chomp_number(&mut self) -> Token<'a> {
        let start = self.cursor;
        self.chomp_integer();

        if self.peek() == Some('.') {
            // skip past the decimal
            self.advance();
            self.chomp_integer();
        }

        let end = self.cursor;

        Token::from_text(self.src, start..end, TokenKind::Number)
    }

    fn chomp_identifier(&mut self) -> Token<'a> {
        let span = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');

        Token::from_text(self.src, span, TokenKind::Identifier)
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            return match self.peek()? {
                space if space.is_whitespace() => {
                    self.advance();
                    continue;
                },
                '(' => self.chomp(TokenKind::OpenParen, 1),
                ')' => self.chomp(TokenKind::CloseParen, 1),
                ',' => self.chomp(TokenKind::Comma, 1),
                '+' => self.chomp(TokenKind::Plus, 1),
                '-' => self.chomp(TokenKind::Minus, 1),
                '*' if self.peek_second() == Some('*') => {
                    self.chomp(TokenKind::Power, 2)
                },
                '*' => self.chomp(TokenKind::Times, 1),
                '/' => self.chomp(TokenKind::Divide, 1),
                '_' | 'a'..='z' | 'A'..='Z' => {
                    Some(Ok(self.chomp_identifier()))
                },
                '0'..='9' => Some(Ok(self.chomp_number())),
                '.' if self.peek_second().map_or(false, |c| c.is_ascii_digit()) => {
                    Some(Ok(self.chomp_number()))
                },
                other => Some(Err(ParseError::InvalidCharacter {
                    character: other,
                    index: self.cursor,
                })),
            };
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Token<'a> {
    text: &'a str,
    span: Range<usize>,
    kind: TokenKind,
}

impl<'a> Token<'a> {
    fn from_text(
        text: &'a str,
        span: Range<usize>,
        kind: TokenKind,
    ) -> Self {
        Token {
            text: &text[span.clone()],
            span,
            kind,
        }
    }
}

/// The kinds of token that can appear in an [`Expression`]'s text form.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TokenKind {
    Identifier,
    Number,
    OpenParen,
    CloseParen,
    Comma,
    Plus,
    Minus,
    Times,
    Divide,
    Power,
}

impl TokenKind {
    fn as_binary_op(self) -> BinaryOperation {
        match self {
            TokenKind::Plus => BinaryOperation::Plus,
            TokenKind::Minus => BinaryOperation::Minus,
            TokenKind::Times => BinaryOperation::Times,
            TokenKind::Divide => BinaryOperation::Divide,
            TokenKind::Power => BinaryOperation::Power,
            other => unreachable!("{:?} is not a binary op", other),
        }
    }
}


#[cfg(test)]
mod parser_tests {
    use super::*;

    macro_rules! parser_test {
        ($name:ident, $src:expr) => {
            parser_test!($name, $src, $src);
        };
        ($name:ident, $src:expr, $should_be:expr) => {
            #[test]
            fn $name() {
                let got = Parser::new($src).parse().unwrap();

                let round_tripped = got.to_string();
                assert_eq!(round_tripped, $should_be);
            }
        };
    }

    parser_test!(literal_weight, "12");
    parser_test!(coefficient, "3*x");
    parser_test!(adding_a_negative, "x + -4");
    parser_test!(product_before_sum, "2 + 3*y");
    parser_test!(grouped_sum, "(2 + 3)*y");
    parser_test!(negated_variable, "-y");
    parser_test!(redundant_parens, "((x))", "x");
    parser_test!(unary_plus_is_dropped, "+x", "x");
    parser_test!(mixed_operators, "x*2 + 6/(4 - 1) - 0.5");
    parser_test!(subtraction_is_left_associative, "10 - x - 3");
    parser_test!(division_is_left_associative, "8/4/2");
    parser_test!(power_is_right_associative, "2**3**2");
    parser_test!(power_binds_tighter_than_negation, "-x**2");
    parser_test!(negative_exponent, "2**-1");
    parser_test!(grouped_base, "(x + 1)**2");
    parser_test!(function_call, "sin(1)");
    parser_test!(function_call_with_expression, "sqrt(1/0)");
    parser_test!(two_argument_call, "root(-8, 3)");
    parser_test!(optional_second_argument, "log(100)");
    parser_test!(nested_calls, "abs(floor(sqrt(PI*x)))");

    #[test]
    fn subtraction_groups_to_the_left() {
        let got = parse("10 - x - 3").unwrap();

        let ten = Expression::Constant(10.0);
        let x = Expression::Parameter(Parameter::named("x"));
        let three = Expression::Constant(3.0);
        assert_eq!(got, (ten - x) - three);
    }

    #[test]
    fn parse_errors() {
        let inputs = vec![
            ("", ParseError::UnexpectedEndOfInput),
            ("(1 + 2", ParseError::UnexpectedEndOfInput),
            (
                "1 + 2)",
                ParseError::UnexpectedToken {
                    found: TokenKind::CloseParen,
                    span: 5..6,
                    expected: &[
                        TokenKind::Plus,
                        TokenKind::Minus,
                        TokenKind::Times,
                        TokenKind::Divide,
                        TokenKind::Power,
                    ],
                },
            ),
            (
                "foo(1)",
                ParseError::UnknownFunction {
                    name: "foo".into(),
                    span: 0..3,
                },
            ),
            (
                "root(8)",
                ParseError::WrongNumberOfArguments {
                    function: Builtin::Root,
                    found: 1,
                    span: 0..7,
                },
            ),
            (
                "sqrt(1, 2)",
                ParseError::WrongNumberOfArguments {
                    function: Builtin::Sqrt,
                    found: 2,
                    span: 0..10,
                },
            ),
            (
                "max(1, 2, 3)",
                ParseError::WrongNumberOfArguments {
                    function: Builtin::Max,
                    found: 3,
                    span: 0..12,
                },
            ),
            (
                "sqrt + 1",
                ParseError::MissingArguments {
                    function: Builtin::Sqrt,
                    span: 0..4,
                },
            ),
            (
                "sin()",
                ParseError::WrongNumberOfArguments {
                    function: Builtin::Sine,
                    found: 0,
                    span: 0..5,
                },
            ),
        ];

        for (src, should_be) in inputs {
            let got = parse(src).unwrap_err();
            assert_eq!(got, should_be, "{:?}", src);
        }
    }

    #[test]
    fn deeply_nested_parentheses_are_rejected() {
        let src =
            format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));

        let got = parse(&src).unwrap_err();

        assert_eq!(got, ParseError::TooDeeplyNested { span: 256..257 });
    }

    #[test]
    fn long_runs_of_negation_are_rejected() {
        let src = format!("{}1", "-".repeat(10_000));

        let got = parse(&src).unwrap_err();

        assert_eq!(got, ParseError::TooDeeplyNested { span: 256..257 });
    }

    #[test]
    fn long_chains_of_operators_are_rejected() {
        let sum = format!("{}1", "1 + ".repeat(10_000));
        let power = format!("{}2", "2**".repeat(10_000));

        for src in &[sum, power] {
            let got = parse(src).unwrap_err();

            match got {
                ParseError::TooDeeplyNested { .. } => {},
                other => panic!("Unexpected error: {:?}", other),
            }
        }
    }

    #[test]
    fn moderate_nesting_is_fine() {
        let parens = format!("{}x{}", "(".repeat(200), ")".repeat(200));
        let sum = format!("{}1", "x + ".repeat(200));

        assert_eq!(
            parse(&parens).unwrap(),
            Expression::Parameter(Parameter::named("x"))
        );
        assert_eq!(parse(&sum).unwrap().params().count(), 200);
    }
}
