/*!
Numeric-or-symbolic branch values.

Every branch attribute (resistance, voltage, current) is stored as a [`Value`], which is either a plain number
([`Value::Numeric`]) or an algebraic expression over named variables ([`Value::Symbolic`]). Arithmetic between
values is carried out exactly on the underlying [`Expr`] representation and collapses back to
[`Value::Numeric`] whenever no free variables remain.

The result of solving for a branch unknown is a [`Resolution`]: either the resolved [`Value`] or
[`Resolution::Indeterminate`] if the circuit equations did not have a unique solution.
*/

use std::{
    collections::BTreeSet,
    fmt,
    ops::{Add, Mul, Neg, Sub},
    str::FromStr,
};

use crate::{
    algebra::Expr,
    parser::{parse, rational_from_f64},
};

/**
An error returned when a string cannot be read as a [`Value`] or a number is not finite.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// The input contains no expression at all.
    Empty,
    /// A character which is neither part of a number, a variable name nor an operator.
    UnexpectedCharacter { position: usize, found: char },
    /// A valid token at a place where the grammar does not allow it (e.g. `R R`).
    UnexpectedToken { position: usize, found: String },
    /// The input ended in the middle of an expression (e.g. `1 +` or `(R`).
    UnexpectedEnd,
    /// Exponents must be integer literals, e.g. `R^2` or `R^(-1)`.
    InvalidExponent { position: usize },
    /// The expression divides by something which is identically zero.
    DivisionByZero,
    /// Numeric values must be finite (no NaN or infinity).
    NonFinite(f64),
}

impl fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionError::Empty => write!(f, "empty expression"),
            ExpressionError::UnexpectedCharacter { position, found } => {
                write!(f, "unexpected character '{found}' at position {position}")
            }
            ExpressionError::UnexpectedToken { position, found } => {
                write!(f, "unexpected '{found}' at position {position}")
            }
            ExpressionError::UnexpectedEnd => write!(f, "unexpected end of expression"),
            ExpressionError::InvalidExponent { position } => write!(
                f,
                "exponent at position {position} is not an integer literal"
            ),
            ExpressionError::DivisionByZero => write!(f, "expression divides by zero"),
            ExpressionError::NonFinite(value) => {
                write!(f, "value {value} is not a finite number")
            }
        }
    }
}

impl std::error::Error for ExpressionError {}

/**
A real number or an algebraic expression over named variables.

A symbolic value without free variables is never stored as [`Value::Symbolic`]: all constructors and
arithmetic operations collapse it into [`Value::Numeric`]. Equality is therefore mathematical equality for
symbolic values (the underlying [`Expr`] is canonical) and plain float equality for numeric ones.

# Examples

```
use kirchhoff_circuit::Value;

let r: Value = "2*R".parse().unwrap();
let half = Value::from(0.5);
assert_eq!(r.clone() * half, "R".parse().unwrap());

// No free variables left => numeric
let zero = r.clone() - r;
assert_eq!(zero, Value::Numeric(0.0));
```

# Features

This enum can be serialized / deserialized via the [serde](https://crates.io/crates/serde)
crate if the `serde` feature is enabled. Numeric values serialize into numbers, symbolic values into
their string representation.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Numeric(f64),
    Symbolic(Expr),
}

impl Value {
    /**
    Parses `text` into a value. Returns [`Value::Numeric`] if the expression has no free variables.
     */
    pub fn parse(text: &str) -> Result<Self, ExpressionError> {
        return Ok(Value::from_expr(parse(text)?));
    }

    /// Creates a numeric value, rejecting NaN and infinities.
    pub fn numeric(value: f64) -> Result<Self, ExpressionError> {
        if !value.is_finite() {
            return Err(ExpressionError::NonFinite(value));
        }
        return Ok(Value::Numeric(value));
    }

    /// Wraps an expression, collapsing it into [`Value::Numeric`] if it has no free variables.
    pub fn from_expr(expr: Expr) -> Self {
        if let Some(value) = expr.to_f64() {
            return Value::Numeric(value);
        }
        return Value::Symbolic(expr);
    }

    /**
    Returns the exact expression of this value. Returns `None` for a non-finite [`Value::Numeric`].
     */
    pub fn to_expr(&self) -> Option<Expr> {
        return match self {
            Value::Numeric(value) => rational_from_f64(*value).map(Expr::rational),
            Value::Symbolic(expr) => Some(expr.clone()),
        };
    }

    pub fn as_f64(&self) -> Option<f64> {
        return match self {
            Value::Numeric(value) => Some(*value),
            Value::Symbolic(_) => None,
        };
    }

    pub fn is_numeric(&self) -> bool {
        return matches!(self, Value::Numeric(_));
    }

    pub fn is_zero(&self) -> bool {
        return match self {
            Value::Numeric(value) => *value == 0.0,
            Value::Symbolic(expr) => expr.is_zero(),
        };
    }

    /// Names of all free variables of the value (empty for numeric values).
    pub fn free_variables(&self) -> BTreeSet<String> {
        return match self {
            Value::Numeric(_) => BTreeSet::new(),
            Value::Symbolic(expr) => expr.variables(),
        };
    }

    /// Division, returning `None` if `rhs` is zero.
    pub fn checked_div(&self, rhs: &Value) -> Option<Value> {
        let lhs = self.to_expr()?;
        let rhs = rhs.to_expr()?;
        return lhs.checked_div(&rhs).map(Value::from_expr);
    }

    fn combine(
        &self,
        rhs: &Value,
        op: impl Fn(&Expr, &Expr) -> Expr,
        fallback: fn(f64, f64) -> f64,
    ) -> Value {
        match (self.to_expr(), rhs.to_expr()) {
            (Some(lhs), Some(rhs)) => return Value::from_expr(op(&lhs, &rhs)),
            // Only reachable with a non-finite numeric operand
            _ => {
                let lhs = self.as_f64().unwrap_or(f64::NAN);
                let rhs = rhs.as_f64().unwrap_or(f64::NAN);
                return Value::Numeric(fallback(lhs, rhs));
            }
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        return Value::Numeric(0.0);
    }
}

impl FromStr for Value {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        return Value::parse(s);
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        return Value::Numeric(value);
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        return Value::Numeric(value.into());
    }
}

impl From<Expr> for Value {
    fn from(expr: Expr) -> Self {
        return Value::from_expr(expr);
    }
}

impl Add for &Value {
    type Output = Value;

    fn add(self, rhs: &Value) -> Value {
        return self.combine(rhs, |a, b| a + b, |a, b| a + b);
    }
}

impl Sub for &Value {
    type Output = Value;

    fn sub(self, rhs: &Value) -> Value {
        return self.combine(rhs, |a, b| a - b, |a, b| a - b);
    }
}

impl Mul for &Value {
    type Output = Value;

    fn mul(self, rhs: &Value) -> Value {
        return self.combine(rhs, |a, b| a * b, |a, b| a * b);
    }
}

impl Neg for &Value {
    type Output = Value;

    fn neg(self) -> Value {
        return match self {
            Value::Numeric(value) => Value::Numeric(-value),
            Value::Symbolic(expr) => Value::Symbolic(-expr),
        };
    }
}

impl Add for Value {
    type Output = Value;

    fn add(self, rhs: Value) -> Value {
        return &self + &rhs;
    }
}

impl Sub for Value {
    type Output = Value;

    fn sub(self, rhs: Value) -> Value {
        return &self - &rhs;
    }
}

impl Mul for Value {
    type Output = Value;

    fn mul(self, rhs: Value) -> Value {
        return &self * &rhs;
    }
}

impl Neg for Value {
    type Output = Value;

    fn neg(self) -> Value {
        return -&self;
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Numeric(value) => write!(f, "{value}"),
            Value::Symbolic(expr) => write!(f, "{expr}"),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Value::Numeric(value) => serializer.serialize_f64(*value),
            Value::Symbolic(expr) => serializer.collect_str(expr),
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> serde::de::Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a finite number or an algebraic expression string")
            }

            fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Value, E> {
                return Value::numeric(v).map_err(E::custom);
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Value, E> {
                return Ok(Value::Numeric(v as f64));
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Value, E> {
                return Ok(Value::Numeric(v as f64));
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Value, E> {
                return Value::parse(v).map_err(E::custom);
            }
        }

        return deserializer.deserialize_any(ValueVisitor);
    }
}

/**
The result for a branch unknown after solving the circuit.

Modelled as an explicit variant instead of a NaN sentinel so that an indeterminate result cannot silently
propagate into further arithmetic.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The unknown has a unique (numeric or symbolic) value.
    Resolved(Value),
    /// The circuit equations have no or infinitely many solutions.
    Indeterminate,
}

impl Resolution {
    pub fn value(&self) -> Option<&Value> {
        return match self {
            Resolution::Resolved(value) => Some(value),
            Resolution::Indeterminate => None,
        };
    }

    pub fn is_indeterminate(&self) -> bool {
        return matches!(self, Resolution::Indeterminate);
    }

    /// Shorthand for `self.value().and_then(Value::as_f64)`.
    pub fn as_f64(&self) -> Option<f64> {
        return self.value().and_then(Value::as_f64);
    }
}

impl From<Value> for Resolution {
    fn from(value: Value) -> Self {
        return Resolution::Resolved(value);
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Resolved(value) => write!(f, "{value}"),
            Resolution::Indeterminate => write!(f, "indeterminate"),
        }
    }
}

/**
Raw user input for a branch component: a number, an expression string or an already built [`Value`].

The conversion into a [`Value`] happens when the branch is added to the circuit, so that malformed
input is reported by [`Circuit::add_branch`](crate::Circuit::add_branch).
 */
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Number(f64),
    Text(String),
    Value(Value),
}

impl Input {
    /// Normalizes the input, parsing text and rejecting non-finite numbers.
    pub fn into_value(self) -> Result<Value, ExpressionError> {
        return match self {
            Input::Number(value) => Value::numeric(value),
            Input::Text(text) => Value::parse(&text),
            Input::Value(Value::Numeric(value)) => Value::numeric(value),
            Input::Value(value) => Ok(value),
        };
    }
}

impl From<f64> for Input {
    fn from(value: f64) -> Self {
        return Input::Number(value);
    }
}

impl From<i32> for Input {
    fn from(value: i32) -> Self {
        return Input::Number(value.into());
    }
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        return Input::Text(value.to_string());
    }
}

impl From<String> for Input {
    fn from(value: String) -> Self {
        return Input::Text(value);
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        return Input::Value(value);
    }
}
