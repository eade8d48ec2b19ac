/*!
Exact algebra over named variables.

This module provides [`Expr`], a rational function (quotient of two multivariate polynomials) with exact
rational coefficients. It is the representation behind [`Value::Symbolic`](crate::Value::Symbolic) and the
scalar type the Kirchhoff equation system is assembled and eliminated over. Because every [`Expr`] is kept
in a canonical form (numerator and denominator coprime, denominator monic), two expressions are
mathematically equal if and only if they are structurally equal, which makes the zero test used for pivoting
exact.
*/

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    fmt,
    ops::{Add, Mul, Neg, Sub},
};

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

/**
A power product of named variables, e.g. `I2*R**2`.

Exponents are always positive: a variable with exponent zero is simply not stored. Monomials are ordered
lexicographically, with the variables themselves compared by name (the alphabetically first variable is the
most significant one). This order is compatible with multiplication, which the polynomial division relies on.
 */
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub(crate) struct Monomial(BTreeMap<String, u32>);

impl Monomial {
    fn variable(name: &str, exponent: u32) -> Self {
        let mut map = BTreeMap::new();
        if exponent > 0 {
            map.insert(name.to_string(), exponent);
        }
        return Monomial(map);
    }

    fn is_one(&self) -> bool {
        return self.0.is_empty();
    }

    fn degree(&self, var: &str) -> u32 {
        return self.0.get(var).copied().unwrap_or(0);
    }

    fn without(&self, var: &str) -> Monomial {
        let mut map = self.0.clone();
        map.remove(var);
        return Monomial(map);
    }

    fn mul(&self, other: &Monomial) -> Monomial {
        let mut map = self.0.clone();
        for (var, exp) in other.0.iter() {
            *map.entry(var.clone()).or_insert(0) += *exp;
        }
        return Monomial(map);
    }

    /// Returns `self / divisor` if `divisor` divides `self`.
    fn checked_div(&self, divisor: &Monomial) -> Option<Monomial> {
        let mut map = self.0.clone();
        for (var, exp) in divisor.0.iter() {
            let own = map.get_mut(var)?;
            match (*own).cmp(exp) {
                Ordering::Less => return None,
                Ordering::Equal => {
                    map.remove(var);
                }
                Ordering::Greater => *own -= *exp,
            }
        }
        return Some(Monomial(map));
    }
}

impl Ord for Monomial {
    fn cmp(&self, other: &Self) -> Ordering {
        let mut lhs = self.0.iter().peekable();
        let mut rhs = other.0.iter().peekable();
        loop {
            match (lhs.peek(), rhs.peek()) {
                (None, None) => return Ordering::Equal,
                (Some(_), None) => return Ordering::Greater,
                (None, Some(_)) => return Ordering::Less,
                (Some((var_l, exp_l)), Some((var_r, exp_r))) => match var_l.cmp(var_r) {
                    // The left side contains a more significant variable the right side lacks
                    Ordering::Less => return Ordering::Greater,
                    Ordering::Greater => return Ordering::Less,
                    Ordering::Equal => match exp_l.cmp(exp_r) {
                        Ordering::Equal => {
                            lhs.next();
                            rhs.next();
                        }
                        ord => return ord,
                    },
                },
            }
        }
    }
}

impl PartialOrd for Monomial {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl fmt::Display for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (var, exp) in self.0.iter() {
            if !first {
                write!(f, "*")?;
            }
            first = false;
            if *exp == 1 {
                write!(f, "{var}")?;
            } else {
                write!(f, "{var}**{exp}")?;
            }
        }
        return Ok(());
    }
}

/**
A sparse multivariate polynomial with exact rational coefficients. Zero coefficients are never stored.
 */
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Poly {
    terms: BTreeMap<Monomial, BigRational>,
}

impl Poly {
    pub(crate) fn zero() -> Self {
        return Poly::default();
    }

    pub(crate) fn one() -> Self {
        return Poly::constant(BigRational::one());
    }

    pub(crate) fn constant(value: BigRational) -> Self {
        let mut poly = Poly::zero();
        poly.add_term(Monomial::default(), value);
        return poly;
    }

    pub(crate) fn variable(name: &str) -> Self {
        let mut poly = Poly::zero();
        poly.add_term(Monomial::variable(name, 1), BigRational::one());
        return poly;
    }

    fn power_of(name: &str, exponent: u32) -> Self {
        let mut poly = Poly::zero();
        poly.add_term(Monomial::variable(name, exponent), BigRational::one());
        return poly;
    }

    pub(crate) fn is_zero(&self) -> bool {
        return self.terms.is_empty();
    }

    pub(crate) fn is_one(&self) -> bool {
        return self.as_constant().is_some_and(|c| c.is_one());
    }

    /// Returns the value of a polynomial without free variables (zero included).
    pub(crate) fn as_constant(&self) -> Option<BigRational> {
        return match self.terms.len() {
            0 => Some(BigRational::zero()),
            1 => self
                .terms
                .iter()
                .next()
                .filter(|(m, _)| m.is_one())
                .map(|(_, c)| c.clone()),
            _ => None,
        };
    }

    fn is_constant(&self) -> bool {
        return self.as_constant().is_some();
    }

    fn term_count(&self) -> usize {
        return self.terms.len();
    }

    fn leading(&self) -> Option<(&Monomial, &BigRational)> {
        return self.terms.last_key_value();
    }

    fn add_term(&mut self, monomial: Monomial, coefficient: BigRational) {
        if coefficient.is_zero() {
            return;
        }
        match self.terms.get_mut(&monomial) {
            Some(existing) => {
                *existing += coefficient;
                if existing.is_zero() {
                    self.terms.remove(&monomial);
                }
            }
            None => {
                self.terms.insert(monomial, coefficient);
            }
        }
    }

    fn mul_term(&self, monomial: &Monomial, coefficient: &BigRational) -> Poly {
        let mut out = Poly::zero();
        for (m, c) in self.terms.iter() {
            out.add_term(m.mul(monomial), c * coefficient);
        }
        return out;
    }

    fn scale(&self, factor: &BigRational) -> Poly {
        return self.mul_term(&Monomial::default(), factor);
    }

    pub(crate) fn variables(&self) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        for monomial in self.terms.keys() {
            vars.extend(monomial.0.keys().cloned());
        }
        return vars;
    }

    fn degree(&self, var: &str) -> u32 {
        return self
            .terms
            .keys()
            .map(|m| m.degree(var))
            .max()
            .unwrap_or(0);
    }

    /// Coefficient of `var^exponent`, seen as a polynomial in all other variables.
    fn coefficient(&self, var: &str, exponent: u32) -> Poly {
        let mut out = Poly::zero();
        for (m, c) in self.terms.iter() {
            if m.degree(var) == exponent {
                out.add_term(m.without(var), c.clone());
            }
        }
        return out;
    }

    fn leading_coefficient(&self, var: &str) -> Poly {
        return self.coefficient(var, self.degree(var));
    }

    /// Scales the polynomial so that its leading coefficient is one.
    pub(crate) fn monic(&self) -> Poly {
        return match self.leading() {
            Some((_, lc)) => self.scale(&lc.recip()),
            None => Poly::zero(),
        };
    }

    pub(crate) fn pow(&self, exponent: u32) -> Poly {
        let mut out = Poly::one();
        for _ in 0..exponent {
            out = &out * self;
        }
        return out;
    }

    /**
    Multivariate division by leading terms. Returns quotient and remainder; the remainder is zero if and only
    if `divisor` divides `self` exactly.
     */
    pub(crate) fn div_rem(&self, divisor: &Poly) -> (Poly, Poly) {
        let (lead_m, lead_c) = match divisor.leading() {
            Some((m, c)) => (m.clone(), c.clone()),
            None => return (Poly::zero(), self.clone()),
        };
        let mut quotient = Poly::zero();
        let mut remainder = Poly::zero();
        let mut rest = self.clone();

        while let Some((m, c)) = rest.leading().map(|(m, c)| (m.clone(), c.clone())) {
            match m.checked_div(&lead_m) {
                Some(q_m) => {
                    let q_c = &c / &lead_c;
                    rest = &rest - &divisor.mul_term(&q_m, &q_c);
                    quotient.add_term(q_m, q_c);
                }
                None => {
                    rest.terms.remove(&m);
                    remainder.add_term(m, c);
                }
            }
        }
        return (quotient, remainder);
    }

    /// Least common multiple of all coefficient denominators.
    fn denominator_lcm(&self) -> BigInt {
        return self
            .terms
            .values()
            .fold(BigInt::one(), |acc, c| acc.lcm(c.denom()));
    }
}

impl Add for &Poly {
    type Output = Poly;

    fn add(self, rhs: &Poly) -> Poly {
        let mut out = self.clone();
        for (m, c) in rhs.terms.iter() {
            out.add_term(m.clone(), c.clone());
        }
        return out;
    }
}

impl Sub for &Poly {
    type Output = Poly;

    fn sub(self, rhs: &Poly) -> Poly {
        let mut out = self.clone();
        for (m, c) in rhs.terms.iter() {
            out.add_term(m.clone(), -c);
        }
        return out;
    }
}

impl Mul for &Poly {
    type Output = Poly;

    fn mul(self, rhs: &Poly) -> Poly {
        let mut out = Poly::zero();
        for (m_l, c_l) in self.terms.iter() {
            for (m_r, c_r) in rhs.terms.iter() {
                out.add_term(m_l.mul(m_r), c_l * c_r);
            }
        }
        return out;
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Poly {
        return self.scale(&-BigRational::one());
    }
}

impl fmt::Display for Poly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        // Most significant term first
        for (position, (monomial, coefficient)) in self.terms.iter().rev().enumerate() {
            let negative = coefficient.is_negative();
            match (position, negative) {
                (0, true) => write!(f, "-")?,
                (0, false) => (),
                (_, true) => write!(f, " - ")?,
                (_, false) => write!(f, " + ")?,
            }
            let magnitude = coefficient.abs();
            let numer = magnitude.numer();
            let denom = magnitude.denom();
            if monomial.is_one() {
                write!(f, "{numer}")?;
            } else if numer.is_one() {
                write!(f, "{monomial}")?;
            } else {
                write!(f, "{numer}*{monomial}")?;
            }
            if !denom.is_one() {
                write!(f, "/{denom}")?;
            }
        }
        return Ok(());
    }
}

/**
Greatest common divisor of two polynomials, normalized to be monic.

Uses the primitive pseudo-remainder sequence in the alphabetically first variable; contents (the gcd of the
coefficients seen as polynomials in the remaining variables) are handled recursively.
 */
pub(crate) fn gcd(a: &Poly, b: &Poly) -> Poly {
    if a.is_zero() {
        return b.monic();
    }
    if b.is_zero() {
        return a.monic();
    }
    if a.is_constant() || b.is_constant() {
        return Poly::one();
    }

    let mut vars = a.variables();
    vars.extend(b.variables());
    let var = match vars.into_iter().next() {
        Some(var) => var,
        None => return Poly::one(),
    };

    if a.degree(&var) == 0 {
        return gcd(a, &content(b, &var));
    }
    if b.degree(&var) == 0 {
        return gcd(&content(a, &var), b);
    }

    let content_a = content(a, &var);
    let content_b = content(b, &var);
    let common_content = gcd(&content_a, &content_b);

    let prim_a = a.div_rem(&content_a).0;
    let prim_b = b.div_rem(&content_b).0;
    let (mut f, mut g) = if prim_a.degree(&var) >= prim_b.degree(&var) {
        (prim_a, prim_b)
    } else {
        (prim_b, prim_a)
    };

    loop {
        let r = pseudo_remainder(&f, &g, &var);
        if r.is_zero() {
            break;
        }
        if r.degree(&var) == 0 {
            g = Poly::one();
            break;
        }
        f = g;
        g = primitive_part(&r, &var);
    }

    return (&common_content * &g).monic();
}

/// Gcd of all coefficients of `p` viewed as a univariate polynomial in `var`.
fn content(p: &Poly, var: &str) -> Poly {
    let mut acc = Poly::zero();
    for exponent in 0..=p.degree(var) {
        let coefficient = p.coefficient(var, exponent);
        if !coefficient.is_zero() {
            acc = gcd(&acc, &coefficient);
            if acc.is_one() {
                break;
            }
        }
    }
    return acc;
}

fn primitive_part(p: &Poly, var: &str) -> Poly {
    let c = content(p, var);
    if c.is_zero() {
        return Poly::zero();
    }
    return p.div_rem(&c).0;
}

fn pseudo_remainder(f: &Poly, g: &Poly, var: &str) -> Poly {
    let deg_g = g.degree(var);
    let lc_g = g.leading_coefficient(var);
    let mut r = f.clone();
    while !r.is_zero() && r.degree(var) >= deg_g {
        let deg_r = r.degree(var);
        let lc_r = r.leading_coefficient(var);
        let shift = Poly::power_of(var, deg_r - deg_g);
        r = &(&r * &lc_g) - &(&(&lc_r * &shift) * g);
    }
    return r;
}

/**
An exact rational function over named variables.

The numerator and denominator are coprime polynomials and the denominator is monic, so the representation is
canonical: derived equality is mathematical equality. A constant expression (no free variables) has the
denominator `1`.

# Examples

```
use kirchhoff_circuit::Expr;

let r = Expr::variable("R");
let v = Expr::variable("V1");
let half = Expr::integer(1).checked_div(&Expr::integer(2)).unwrap();

// (V1 - R) / 2 + R / 2 == V1 / 2
let lhs = &(&(&v - &r) * &half) + &(&r * &half);
assert_eq!(lhs, &v * &half);
assert_eq!(lhs.to_string(), "V1/2");
```
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    num: Poly,
    den: Poly,
}

impl Expr {
    pub fn zero() -> Self {
        return Expr {
            num: Poly::zero(),
            den: Poly::one(),
        };
    }

    pub fn one() -> Self {
        return Expr::integer(1);
    }

    pub fn integer(value: i64) -> Self {
        return Expr::rational(BigRational::from_integer(BigInt::from(value)));
    }

    pub fn rational(value: BigRational) -> Self {
        return Expr {
            num: Poly::constant(value),
            den: Poly::one(),
        };
    }

    pub fn variable(name: &str) -> Self {
        return Expr {
            num: Poly::variable(name),
            den: Poly::one(),
        };
    }

    /// Builds `num / den` in canonical form. Returns `None` for a zero denominator.
    pub(crate) fn from_parts(num: Poly, den: Poly) -> Option<Self> {
        if den.is_zero() {
            return None;
        }
        if num.is_zero() {
            return Some(Expr::zero());
        }
        let divisor = gcd(&num, &den);
        let (mut num, mut den) = if divisor.is_one() {
            (num, den)
        } else {
            (num.div_rem(&divisor).0, den.div_rem(&divisor).0)
        };
        if let Some((_, lc)) = den.leading() {
            let factor = lc.recip();
            if !factor.is_one() {
                num = num.scale(&factor);
                den = den.scale(&factor);
            }
        }
        return Some(Expr { num, den });
    }

    pub fn is_zero(&self) -> bool {
        return self.num.is_zero();
    }

    /// Returns the exact value of an expression without free variables.
    pub fn as_rational(&self) -> Option<BigRational> {
        if !self.den.is_one() {
            return None;
        }
        return self.num.as_constant();
    }

    pub fn to_f64(&self) -> Option<f64> {
        return self.as_rational().and_then(|value| value.to_f64());
    }

    /// Names of all free variables, in alphabetical order.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut vars = self.num.variables();
        vars.extend(self.den.variables());
        return vars;
    }

    pub fn recip(&self) -> Option<Self> {
        return Expr::from_parts(self.den.clone(), self.num.clone());
    }

    pub fn checked_div(&self, rhs: &Expr) -> Option<Self> {
        if rhs.is_zero() {
            return None;
        }
        return Expr::from_parts(&self.num * &rhs.den, &self.den * &rhs.num);
    }

    /// Integer power. Negative exponents of zero yield `None`.
    pub fn powi(&self, exponent: i32) -> Option<Self> {
        let magnitude = exponent.unsigned_abs();
        let raised = Expr::from_parts(self.num.pow(magnitude), self.den.pow(magnitude))?;
        if exponent < 0 {
            return raised.recip();
        }
        return Some(raised);
    }
}

impl Add for &Expr {
    type Output = Expr;

    fn add(self, rhs: &Expr) -> Expr {
        let (num, den) = if self.den == rhs.den {
            (&self.num + &rhs.num, self.den.clone())
        } else {
            (
                &(&self.num * &rhs.den) + &(&rhs.num * &self.den),
                &self.den * &rhs.den,
            )
        };
        // The product of two nonzero denominators is nonzero
        return Expr::from_parts(num, den).unwrap_or_else(Expr::zero);
    }
}

impl Sub for &Expr {
    type Output = Expr;

    fn sub(self, rhs: &Expr) -> Expr {
        return self + &(-rhs);
    }
}

impl Mul for &Expr {
    type Output = Expr;

    fn mul(self, rhs: &Expr) -> Expr {
        if self.is_zero() || rhs.is_zero() {
            return Expr::zero();
        }
        return Expr::from_parts(&self.num * &rhs.num, &self.den * &rhs.den)
            .unwrap_or_else(Expr::zero);
    }
}

impl Neg for &Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        return Expr {
            num: -&self.num,
            den: self.den.clone(),
        };
    }
}

impl Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        return &self + &rhs;
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        return &self - &rhs;
    }
}

impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        return &self * &rhs;
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        return -&self;
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den.is_one() {
            return write!(f, "{}", self.num);
        }

        // Clear the coefficient denominators so that the fraction reads `(a + b)/(2*c)`
        let lcm = self.num.denominator_lcm().lcm(&self.den.denominator_lcm());
        let factor = BigRational::from_integer(lcm);
        let num = self.num.scale(&factor);
        let den = self.den.scale(&factor);

        if num.term_count() > 1 {
            write!(f, "({num})")?;
        } else {
            write!(f, "{num}")?;
        }
        let den_is_atom = den.term_count() == 1
            && den.leading().is_some_and(|(m, c)| {
                c.is_one() && m.0.len() == 1 && m.0.values().all(|e| *e == 1)
            });
        if den_is_atom {
            return write!(f, "/{den}");
        }
        return write!(f, "/({den})");
    }
}
