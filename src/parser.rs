/*!
Parser for symbolic branch values.

Turns strings such as `"V1"`, `"2*R"` or `"(R1 + R2)/2"` into an [`Expr`]. Numbers are read as exact decimal
fractions, so `"0.1"` is exactly one tenth. Supported are `+`, `-`, `*`, `/`, integer powers (`^` or `**`) and
parentheses.
*/

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::ToPrimitive;

use crate::{algebra::Expr, value::ExpressionError};

/// Largest magnitude of the exponent in scientific notation (`1e300`).
const MAX_DECIMAL_EXPONENT: u32 = 1000;

/// Largest magnitude of the exponent of a power (`R^64`).
const MAX_POWER: i32 = 256;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(BigRational),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LeftParen,
    RightParen,
}

impl Token {
    fn describe(&self) -> String {
        let text = match self {
            Token::Number(value) => return value.to_string(),
            Token::Identifier(name) => return name.clone(),
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Caret => "^",
            Token::LeftParen => "(",
            Token::RightParen => ")",
        };
        return text.to_string();
    }
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, ExpressionError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        let start = pos;
        if c.is_whitespace() {
            pos += 1;
            continue;
        }
        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '*' => {
                if chars.get(pos + 1) == Some(&'*') {
                    pos += 1;
                    Token::Caret
                } else {
                    Token::Star
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                    pos += 1;
                }
                // Optional exponent, only consumed if digits follow
                if pos < chars.len() && (chars[pos] == 'e' || chars[pos] == 'E') {
                    let marker = pos;
                    let mut lookahead = pos + 1;
                    if lookahead < chars.len()
                        && (chars[lookahead] == '+' || chars[lookahead] == '-')
                    {
                        lookahead += 1;
                    }
                    if lookahead < chars.len() && chars[lookahead].is_ascii_digit() {
                        pos = lookahead;
                        while pos < chars.len() && chars[pos].is_ascii_digit() {
                            pos += 1;
                        }
                        let exponent: String = chars[marker + 1..pos].iter().collect();
                        let in_range = exponent
                            .parse::<i32>()
                            .is_ok_and(|e| e.unsigned_abs() <= MAX_DECIMAL_EXPONENT);
                        if !in_range {
                            return Err(ExpressionError::InvalidExponent { position: marker });
                        }
                    }
                }
                let text: String = chars[start..pos].iter().collect();
                let value = decimal(&text).ok_or(ExpressionError::UnexpectedCharacter {
                    position: start,
                    found: c,
                })?;
                tokens.push((start, Token::Number(value)));
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                while pos < chars.len()
                    && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_')
                {
                    pos += 1;
                }
                tokens.push((start, Token::Identifier(chars[start..pos].iter().collect())));
                continue;
            }
            other => {
                return Err(ExpressionError::UnexpectedCharacter {
                    position: start,
                    found: other,
                });
            }
        };
        tokens.push((start, token));
        pos += 1;
    }
    return Ok(tokens);
}

/**
Reads a decimal literal (`12`, `-0.5`, `1.5e-3`, ...) as an exact fraction. Returns `None` for malformed
literals and for exponents beyond `MAX_DECIMAL_EXPONENT`.
 */
pub(crate) fn decimal(text: &str) -> Option<BigRational> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(idx) => (&body[..idx], body[idx + 1..].parse::<i32>().ok()?),
        None => (body, 0),
    };
    if exponent.unsigned_abs() > MAX_DECIMAL_EXPONENT {
        return None;
    }
    let (int_part, frac_part) = match mantissa.find('.') {
        Some(idx) => (&mantissa[..idx], &mantissa[idx + 1..]),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }

    let digits: BigInt = format!("{int_part}{frac_part}").parse().ok()?;
    let scale = exponent.checked_sub(i32::try_from(frac_part.len()).ok()?)?;
    let power = BigRational::from_integer(num_traits::pow(
        BigInt::from(10),
        usize::try_from(scale.unsigned_abs()).ok()?,
    ));
    let mut value = BigRational::from_integer(digits);
    if scale >= 0 {
        value *= power;
    } else {
        value /= power;
    }
    if negative {
        value = -value;
    }
    return Some(value);
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        return self.tokens.get(self.pos).map(|(_, t)| t);
    }

    fn next(&mut self) -> Option<(usize, Token)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        return item;
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExpressionError> {
        match self.next() {
            Some((_, token)) if token == expected => Ok(()),
            Some((position, token)) => Err(ExpressionError::UnexpectedToken {
                position,
                found: token.describe(),
            }),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }

    fn expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut acc = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    acc = &acc + &self.term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    acc = &acc - &self.term()?;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn term(&mut self) -> Result<Expr, ExpressionError> {
        let mut acc = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    acc = &acc * &self.unary()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let divisor = self.unary()?;
                    acc = acc
                        .checked_div(&divisor)
                        .ok_or(ExpressionError::DivisionByZero)?;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                return Ok(-self.unary()?);
            }
            Some(Token::Plus) => {
                self.pos += 1;
                return self.unary();
            }
            _ => return self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.atom()?;
        if self.peek() != Some(&Token::Caret) {
            return Ok(base);
        }
        self.pos += 1;
        let exponent = self.exponent()?;
        return base.powi(exponent).ok_or(ExpressionError::DivisionByZero);
    }

    fn exponent(&mut self) -> Result<i32, ExpressionError> {
        let position = self
            .tokens
            .get(self.pos)
            .map(|(p, _)| *p)
            .ok_or(ExpressionError::UnexpectedEnd)?;
        let parenthesized = self.peek() == Some(&Token::LeftParen);
        if parenthesized {
            self.pos += 1;
        }
        let negative = self.peek() == Some(&Token::Minus);
        if negative {
            self.pos += 1;
        }
        let value = match self.next() {
            Some((_, Token::Number(value))) if value.is_integer() => value,
            Some(_) => return Err(ExpressionError::InvalidExponent { position }),
            None => return Err(ExpressionError::UnexpectedEnd),
        };
        if parenthesized {
            self.expect(Token::RightParen)?;
        }
        let magnitude = value
            .to_integer()
            .to_i32()
            .filter(|m| *m <= MAX_POWER)
            .ok_or(ExpressionError::InvalidExponent { position })?;
        return Ok(if negative { -magnitude } else { magnitude });
    }

    fn atom(&mut self) -> Result<Expr, ExpressionError> {
        match self.next() {
            Some((_, Token::Number(value))) => Ok(Expr::rational(value)),
            Some((_, Token::Identifier(name))) => Ok(Expr::variable(&name)),
            Some((_, Token::LeftParen)) => {
                let inner = self.expr()?;
                self.expect(Token::RightParen)?;
                Ok(inner)
            }
            Some((position, token)) => Err(ExpressionError::UnexpectedToken {
                position,
                found: token.describe(),
            }),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }
}

/**
Parses `input` into a canonical [`Expr`].
 */
pub(crate) fn parse(input: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExpressionError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr()?;
    if let Some((position, token)) = parser.next() {
        return Err(ExpressionError::UnexpectedToken {
            position,
            found: token.describe(),
        });
    }
    return Ok(expr);
}

/// Exact decimal value of a finite float, via its shortest round-trip representation.
pub(crate) fn rational_from_f64(value: f64) -> Option<BigRational> {
    if !value.is_finite() {
        return None;
    }
    if value == 0.0 {
        return Some(BigRational::from_integer(BigInt::from(0)));
    }
    return decimal(&format!("{value:e}"));
}

#[cfg(test)]
mod tests {

    use super::*;

    fn eval(input: &str) -> f64 {
        return parse(input).unwrap().to_f64().unwrap();
    }

    #[test]
    fn test_numbers() {
        assert_eq!(eval("12"), 12.0);
        assert_eq!(eval("0.5"), 0.5);
        assert_eq!(eval("1.5e3"), 1500.0);
        assert_eq!(eval("25E-2"), 0.25);
        assert_eq!(eval(".25"), 0.25);
        assert_eq!(decimal("0.1"), Some(BigRational::new(1.into(), 10.into())));
        assert_eq!(decimal("."), None);
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1 + 2 * 3"), 7.0);
        assert_eq!(eval("(1 + 2) * 3"), 9.0);
        assert_eq!(eval("-2^2"), -4.0);
        assert_eq!(eval("2**3 / 4"), 2.0);
        assert_eq!(eval("2^(-1)"), 0.5);
        assert_eq!(eval("8 / 2 / 2"), 2.0);
        assert_eq!(eval("3 - 2 - 1"), 0.0);
    }

    #[test]
    fn test_symbols() {
        let parsed = parse("2*R + R").unwrap();
        assert_eq!(parsed, &Expr::integer(3) * &Expr::variable("R"));

        let parsed = parse("(R1*R2)/(R1 + R2) * (R1 + R2)").unwrap();
        assert_eq!(parsed, &Expr::variable("R1") * &Expr::variable("R2"));

        assert_eq!(parse("x_1 - x_1").unwrap(), Expr::zero());
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse(""), Err(ExpressionError::Empty));
        assert_eq!(parse("   "), Err(ExpressionError::Empty));
        assert_eq!(parse("1 +"), Err(ExpressionError::UnexpectedEnd));
        assert_eq!(parse("R / 0"), Err(ExpressionError::DivisionByZero));
        assert_eq!(parse("R / (R - R)"), Err(ExpressionError::DivisionByZero));
        assert_eq!(
            parse("2 $ 3"),
            Err(ExpressionError::UnexpectedCharacter {
                position: 2,
                found: '$'
            })
        );
        assert_eq!(
            parse("R^x"),
            Err(ExpressionError::InvalidExponent { position: 2 })
        );
        assert_eq!(
            parse("(R + 1"),
            Err(ExpressionError::UnexpectedEnd)
        );
        assert_eq!(
            parse("R R"),
            Err(ExpressionError::UnexpectedToken {
                position: 2,
                found: "R".to_string()
            })
        );
    }

    #[test]
    fn test_exponent_limits() {
        assert!(parse("1e1000").is_ok());
        assert!(parse("1e-1000").is_ok());
        assert!(eval("2^256") > 1e77);
        assert_eq!(
            parse("1.5e-2147483648"),
            Err(ExpressionError::InvalidExponent { position: 3 })
        );
        assert_eq!(
            parse("1e999999999"),
            Err(ExpressionError::InvalidExponent { position: 1 })
        );
        assert_eq!(
            parse("2 * 1E1001"),
            Err(ExpressionError::InvalidExponent { position: 5 })
        );
        assert_eq!(
            parse("R^2147483647"),
            Err(ExpressionError::InvalidExponent { position: 2 })
        );
        assert_eq!(
            parse("R**(-257)"),
            Err(ExpressionError::InvalidExponent { position: 3 })
        );
        assert_eq!(decimal("1e-2147483648"), None);
        assert_eq!(decimal("0.5e-1001"), None);
    }

    #[test]
    fn test_rational_from_f64() {
        assert_eq!(
            rational_from_f64(0.1),
            Some(BigRational::new(1.into(), 10.into()))
        );
        assert_eq!(
            rational_from_f64(-2.5e-7),
            Some(BigRational::new((-25).into(), 100_000_000.into()))
        );
        assert_eq!(rational_from_f64(f64::NAN), None);
        assert_eq!(rational_from_f64(f64::INFINITY), None);
    }
}
