use std::{cmp::Ordering, fmt::Display};

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::{duration::Duration, error::EvalError, parse::BinaryOp};

/// Significant digits kept when a decimal result cannot be exact.
pub const DECIMAL_PRECISION: u64 = 100;

/// Significant digits shown when a decimal is rendered.
pub const DISPLAY_DIGITS: usize = 16;

/// Largest shift count accepted by `<<` and `>>`.
pub const MAX_SHIFT: u64 = 1 << 20;

/// Largest integer result, in bits, that `*`, `**` and `<<` will build.
pub const MAX_INTEGER_BITS: u64 = 1 << 20;

/// Largest decimal exponent magnitude that `**` will build.
pub const MAX_DECIMAL_EXPONENT: u64 = 1 << 40;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(BigInt),
    Decimal(BigDecimal),
    Boolean(bool),
    String(String),
    Duration(Duration),
}

/// The variant of a literal, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Integer,
    Decimal,
    Boolean,
    String,
    Duration,
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Kind::Integer => "integer",
            Kind::Decimal => "decimal",
            Kind::Boolean => "boolean",
            Kind::String => "string",
            Kind::Duration => "duration",
        })
    }
}

/// A named operation a literal variant may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Add,
    Sub,
    Mult,
    Div,
    Pow,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,
    LogicalAnd,
    LogicalOr,
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

impl Capability {
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Capability::Add | Capability::Sub | Capability::Mult | Capability::Div | Capability::Pow
        )
    }

    pub fn is_bitwise(&self) -> bool {
        matches!(
            self,
            Capability::BitwiseAnd
                | Capability::BitwiseOr
                | Capability::BitwiseXor
                | Capability::ShiftLeft
                | Capability::ShiftRight
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Capability::LogicalAnd | Capability::LogicalOr)
    }

    pub fn is_comparison(&self) -> bool {
        !(self.is_arithmetic() || self.is_bitwise() || self.is_logical())
    }
}

impl Literal {
    pub fn kind(&self) -> Kind {
        match self {
            Literal::Integer(_) => Kind::Integer,
            Literal::Decimal(_) => Kind::Decimal,
            Literal::Boolean(_) => Kind::Boolean,
            Literal::String(_) => Kind::String,
            Literal::Duration(_) => Kind::Duration,
        }
    }

    /// Whether this variant implements `capability` at all, regardless of the
    /// right-hand operand.
    pub fn supports(&self, capability: Capability) -> bool {
        use Capability::*;
        match self.kind() {
            Kind::Integer => !capability.is_logical(),
            Kind::Decimal => capability.is_arithmetic() || capability.is_comparison(),
            Kind::Boolean => matches!(capability, LogicalAnd | LogicalOr | Equal | NotEqual),
            Kind::String => capability == Add || capability.is_comparison(),
            Kind::Duration => matches!(capability, Add | Sub) || capability.is_comparison(),
        }
    }

    /// Applies a binary operator with the left operand as receiver.
    pub fn apply(&self, op: BinaryOp, rhs: &Literal) -> Result<Literal, EvalError> {
        let capability = op.capability();
        if !self.supports(capability) {
            return Err(unsupported(op, self, rhs));
        }
        match capability {
            Capability::Add => self.add(rhs, op),
            Capability::Sub => self.sub(rhs, op),
            Capability::Mult => self.mult(rhs, op),
            Capability::Div => self.div(rhs, op),
            Capability::Pow => self.pow(rhs, op),
            Capability::BitwiseAnd
            | Capability::BitwiseOr
            | Capability::BitwiseXor
            | Capability::ShiftLeft
            | Capability::ShiftRight => self.bitwise(rhs, op),
            Capability::LogicalAnd | Capability::LogicalOr => self.logical(rhs, op),
            Capability::Equal
            | Capability::NotEqual
            | Capability::LessThan
            | Capability::LessOrEqual
            | Capability::GreaterThan
            | Capability::GreaterOrEqual => self.compare(rhs, op),
        }
    }

    pub fn add(&self, rhs: &Literal, op: BinaryOp) -> Result<Literal, EvalError> {
        Ok(match (self, rhs) {
            (Literal::Integer(l), Literal::Integer(r)) => Literal::Integer(l + r),
            (Literal::String(l), Literal::String(r)) => Literal::String(format!("{l}{r}")),
            (Literal::Duration(l), Literal::Duration(r)) => Literal::Duration(
                l.checked_add(*r).ok_or(EvalError::Overflow { op: op.symbol() })?,
            ),
            _ => {
                let (l, r) = promote(op, self, rhs)?;
                Literal::Decimal(decimal_sum(l, r))
            }
        })
    }

    pub fn sub(&self, rhs: &Literal, op: BinaryOp) -> Result<Literal, EvalError> {
        Ok(match (self, rhs) {
            (Literal::Integer(l), Literal::Integer(r)) => Literal::Integer(l - r),
            (Literal::Duration(l), Literal::Duration(r)) => Literal::Duration(
                l.checked_sub(*r).ok_or(EvalError::Overflow { op: op.symbol() })?,
            ),
            _ => {
                let (l, r) = promote(op, self, rhs)?;
                Literal::Decimal(decimal_sum(l, -r))
            }
        })
    }

    pub fn mult(&self, rhs: &Literal, op: BinaryOp) -> Result<Literal, EvalError> {
        Ok(match (self, rhs) {
            (Literal::Integer(l), Literal::Integer(r)) => {
                within_bits(op, (l.bits() + r.bits()).saturating_sub(1))?;
                Literal::Integer(l * r)
            }
            _ => {
                let (l, r) = promote(op, self, rhs)?;
                Literal::Decimal(l * r)
            }
        })
    }

    /// Integer division truncates toward zero; decimal division is rounded to
    /// [`DECIMAL_PRECISION`] significant digits.
    pub fn div(&self, rhs: &Literal, op: BinaryOp) -> Result<Literal, EvalError> {
        Ok(match (self, rhs) {
            (Literal::Integer(l), Literal::Integer(r)) => {
                if r.is_zero() {
                    return Err(EvalError::DivisionByZero);
                }
                Literal::Integer(l / r)
            }
            _ => {
                let (l, r) = promote(op, self, rhs)?;
                if r.is_zero() {
                    return Err(EvalError::DivisionByZero);
                }
                Literal::Decimal((l / r).with_prec(DECIMAL_PRECISION))
            }
        })
    }

    /// Raises to an integral power. A negative integer exponent turns the
    /// result into a decimal.
    pub fn pow(&self, rhs: &Literal, op: BinaryOp) -> Result<Literal, EvalError> {
        let exponent = match rhs {
            Literal::Integer(e) => e.clone(),
            Literal::Decimal(e) if e.is_zero() => BigInt::zero(),
            Literal::Decimal(e) if leading_exponent(e) > 10 => {
                return Err(EvalError::InvalidOperand {
                    op: op.symbol(),
                    reason: format!("exponent {} is out of range", format_decimal(e)),
                });
            }
            Literal::Decimal(e) if leading_exponent(e) >= 0 && e.is_integer() => {
                let (digits, scale) = e.with_scale(0).into_bigint_and_exponent();
                debug_assert_eq!(scale, 0);
                digits
            }
            Literal::Decimal(_) => {
                return Err(EvalError::InvalidOperand {
                    op: op.symbol(),
                    reason: "exponent must be a whole number".into(),
                });
            }
            _ => return Err(unsupported(op, self, rhs)),
        };
        let magnitude = exponent
            .abs()
            .to_u32()
            .ok_or_else(|| EvalError::InvalidOperand {
                op: op.symbol(),
                reason: format!("exponent {exponent} is out of range"),
            })?;

        match self {
            Literal::Integer(base) => {
                // |base| <= 1 never grows
                let grown = base.bits().saturating_sub(1);
                within_bits(op, grown.saturating_mul(magnitude.into()))?;
                let raised = base.pow(magnitude);
                if exponent.is_negative() {
                    inverse(BigDecimal::from(raised))
                } else {
                    Ok(Literal::Integer(raised))
                }
            }
            Literal::Decimal(base) => {
                let scaled =
                    (leading_exponent(base).unsigned_abs() + 1).saturating_mul(magnitude.into());
                if scaled > MAX_DECIMAL_EXPONENT {
                    return Err(EvalError::Overflow { op: op.symbol() });
                }
                let raised = decimal_pow(base, magnitude);
                if exponent.is_negative() {
                    inverse(raised)
                } else {
                    Ok(Literal::Decimal(raised))
                }
            }
            _ => Err(unsupported(op, self, rhs)),
        }
    }

    pub fn bitwise(&self, rhs: &Literal, op: BinaryOp) -> Result<Literal, EvalError> {
        let (Literal::Integer(l), Literal::Integer(r)) = (self, rhs) else {
            return Err(unsupported(op, self, rhs));
        };
        let shift = || {
            r.to_u64()
                .filter(|count| *count <= MAX_SHIFT)
                .map(|count| count as usize)
                .ok_or_else(|| EvalError::InvalidOperand {
                    op: op.symbol(),
                    reason: format!("shift count {r} must be between 0 and {MAX_SHIFT}"),
                })
        };
        Ok(Literal::Integer(match op {
            BinaryOp::BitAnd => l & r,
            BinaryOp::BitOr => l | r,
            BinaryOp::BitXor => l ^ r,
            BinaryOp::ShiftLeft => {
                let count = shift()?;
                if !l.is_zero() {
                    within_bits(op, l.bits() + count as u64)?;
                }
                l << count
            }
            BinaryOp::ShiftRight => l >> shift()?,
            _ => return Err(unsupported(op, self, rhs)),
        }))
    }

    pub fn logical(&self, rhs: &Literal, op: BinaryOp) -> Result<Literal, EvalError> {
        match (self, rhs, op) {
            (Literal::Boolean(l), Literal::Boolean(r), BinaryOp::And) => {
                Ok(Literal::Boolean(*l && *r))
            }
            (Literal::Boolean(l), Literal::Boolean(r), BinaryOp::Or) => {
                Ok(Literal::Boolean(*l || *r))
            }
            _ => Err(unsupported(op, self, rhs)),
        }
    }

    /// Orders two literals of the same variant, promoting integer/decimal pairs.
    pub fn ordering(&self, rhs: &Literal, op: BinaryOp) -> Result<Ordering, EvalError> {
        Ok(match (self, rhs) {
            (Literal::Integer(l), Literal::Integer(r)) => l.cmp(r),
            (Literal::String(l), Literal::String(r)) => l.cmp(r),
            (Literal::Duration(l), Literal::Duration(r)) => l.cmp(r),
            (Literal::Boolean(l), Literal::Boolean(r))
                if matches!(op, BinaryOp::Equal | BinaryOp::NotEqual) =>
            {
                l.cmp(r)
            }
            _ => {
                let (l, r) = promote(op, self, rhs)?;
                decimal_cmp(&l, &r)
            }
        })
    }

    pub fn compare(&self, rhs: &Literal, op: BinaryOp) -> Result<Literal, EvalError> {
        let ordering = self.ordering(rhs, op)?;
        Ok(Literal::Boolean(match op {
            BinaryOp::Equal => ordering.is_eq(),
            BinaryOp::NotEqual => ordering.is_ne(),
            BinaryOp::Less => ordering.is_lt(),
            BinaryOp::LessEqual => ordering.is_le(),
            BinaryOp::Greater => ordering.is_gt(),
            BinaryOp::GreaterEqual => ordering.is_ge(),
            _ => return Err(unsupported(op, self, rhs)),
        }))
    }

    /// `++` and `--`, in the operand's own precision.
    pub fn step(&self, delta: i64) -> Option<Literal> {
        match self {
            Literal::Integer(i) => Some(Literal::Integer(i + delta)),
            Literal::Decimal(d) => Some(Literal::Decimal(decimal_sum(
                d.clone(),
                BigDecimal::from(delta),
            ))),
            _ => None,
        }
    }
}

fn unsupported(op: BinaryOp, lhs: &Literal, rhs: &Literal) -> EvalError {
    EvalError::UnsupportedOperation {
        op: op.symbol(),
        lhs: lhs.kind(),
        rhs: Some(rhs.kind()),
    }
}

/// Both operands as decimals, when each is an integer or a decimal.
fn promote(op: BinaryOp, lhs: &Literal, rhs: &Literal) -> Result<(BigDecimal, BigDecimal), EvalError> {
    let as_decimal = |literal: &Literal| match literal {
        Literal::Integer(i) => Some(BigDecimal::from(i.clone())),
        Literal::Decimal(d) => Some(d.clone()),
        _ => None,
    };
    match (as_decimal(lhs), as_decimal(rhs)) {
        (Some(l), Some(r)) => Ok((l, r)),
        _ => Err(unsupported(op, lhs, rhs)),
    }
}

fn within_bits(op: BinaryOp, bits: u64) -> Result<(), EvalError> {
    if bits > MAX_INTEGER_BITS {
        return Err(EvalError::Overflow { op: op.symbol() });
    }
    Ok(())
}

/// Power of ten of the leading digit: `1234.5` is 3, `0.01` is -2.
fn leading_exponent(value: &BigDecimal) -> i64 {
    let (_, scale) = value.as_bigint_and_exponent();
    value.digits() as i64 - 1 - scale
}

/// Adds without aligning scales across a gap wider than the working
/// precision; the smaller operand cannot change the rounded result there.
fn decimal_sum(l: BigDecimal, r: BigDecimal) -> BigDecimal {
    if l.is_zero() {
        return r;
    }
    if r.is_zero() {
        return l;
    }
    let (el, er) = (leading_exponent(&l), leading_exponent(&r));
    if el.abs_diff(er) > DECIMAL_PRECISION + 1 {
        let larger = if el > er { l } else { r };
        return larger.with_prec(DECIMAL_PRECISION);
    }
    l + r
}

/// Orders by sign and leading exponent before comparing digits.
fn decimal_cmp(l: &BigDecimal, r: &BigDecimal) -> Ordering {
    let by_sign = l.sign().cmp(&r.sign());
    if by_sign.is_ne() || l.is_zero() {
        return by_sign;
    }
    let by_magnitude = leading_exponent(l).cmp(&leading_exponent(r));
    match (by_magnitude, l.is_negative()) {
        (Ordering::Equal, _) => l.cmp(r),
        (ordering, false) => ordering,
        (ordering, true) => ordering.reverse(),
    }
}

fn decimal_pow(base: &BigDecimal, mut exponent: u32) -> BigDecimal {
    let mut result = BigDecimal::one();
    let mut square = base.clone();
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = (&result * &square).with_prec(DECIMAL_PRECISION);
        }
        exponent >>= 1;
        if exponent > 0 {
            square = (&square * &square).with_prec(DECIMAL_PRECISION);
        }
    }
    result
}

fn inverse(value: BigDecimal) -> Result<Literal, EvalError> {
    if value.is_zero() {
        return Err(EvalError::DivisionByZero);
    }
    Ok(Literal::Decimal(
        (BigDecimal::one() / value).with_prec(DECIMAL_PRECISION),
    ))
}

/// Scientific notation with [`DISPLAY_DIGITS`] significant digits, e.g.
/// `3.500000000000000E+00`.
pub fn format_decimal(value: &BigDecimal) -> String {
    let rounded = value.with_prec(DISPLAY_DIGITS as u64);
    let (digits, scale) = rounded.as_bigint_and_exponent();
    let sign = if digits.is_negative() { "-" } else { "" };
    let mut text = digits.abs().to_string();

    let exponent = if digits.is_zero() {
        0
    } else {
        text.len() as i64 - 1 - scale
    };
    text.truncate(DISPLAY_DIGITS);
    while text.len() < DISPLAY_DIGITS {
        text.push('0');
    }

    let exponent_sign = if exponent < 0 { '-' } else { '+' };
    format!(
        "{sign}{}.{}E{exponent_sign}{:02}",
        &text[..1],
        &text[1..],
        exponent.unsigned_abs()
    )
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Integer(i) => write!(f, "{i}"),
            Literal::Decimal(d) => f.write_str(&format_decimal(d)),
            Literal::Boolean(b) => write!(f, "{b}"),
            Literal::String(s) => f.write_str(&quote(s)),
            Literal::Duration(d) => write!(f, "{d}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn int(s: &str) -> Literal {
        Literal::Integer(BigInt::from_str(s).unwrap())
    }

    fn dec(s: &str) -> Literal {
        Literal::Decimal(BigDecimal::from_str(s).unwrap())
    }

    fn string(s: &str) -> Literal {
        Literal::String(s.to_string())
    }

    #[test]
    fn integer_sum_is_exact() {
        let a = int("1234567890123456789012345678901234567890");
        let b = int("9876543210987654321098765432109876543210");
        assert_eq!(
            a.apply(BinaryOp::Add, &b).unwrap(),
            int("11111111101111111110111111111011111111100")
        );
    }

    #[test]
    fn mixed_operands_promote_to_decimal() {
        let left = int("2").apply(BinaryOp::Add, &dec("1.5")).unwrap();
        let right = dec("1.5").apply(BinaryOp::Add, &int("2")).unwrap();
        assert_eq!(left, dec("3.5"));
        assert_eq!(left, right);
        assert_eq!(left.to_string(), "3.500000000000000E+00");
    }

    #[test]
    fn integer_division_truncates() {
        assert_eq!(int("7").apply(BinaryOp::Div, &int("2")).unwrap(), int("3"));
        assert_eq!(int("-7").apply(BinaryOp::Div, &int("2")).unwrap(), int("-3"));
        assert_eq!(
            int("1").apply(BinaryOp::Div, &int("0")),
            Err(EvalError::DivisionByZero)
        );
        assert_eq!(
            dec("1.0").apply(BinaryOp::Div, &int("0")),
            Err(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn powers() {
        assert_eq!(int("2").apply(BinaryOp::Pow, &int("100")).unwrap(), int("1267650600228229401496703205376"));
        assert_eq!(int("2").apply(BinaryOp::Pow, &int("-2")).unwrap(), dec("0.25"));
        assert_eq!(dec("1.5").apply(BinaryOp::Pow, &int("2")).unwrap(), dec("2.25"));
        assert!(matches!(
            dec("1.5").apply(BinaryOp::Pow, &dec("0.5")),
            Err(EvalError::InvalidOperand { .. })
        ));
    }

    #[test]
    fn oversized_integer_results_overflow() {
        let overflow = |op| Err(EvalError::Overflow { op });
        assert_eq!(int("10").apply(BinaryOp::Pow, &int("100000000")), overflow("**"));
        assert_eq!(int("10").apply(BinaryOp::Pow, &int("-100000000")), overflow("**"));
        assert_eq!(int("1").apply(BinaryOp::ShiftLeft, &int("1048576")), overflow("<<"));
        let wide = int("1").apply(BinaryOp::ShiftLeft, &int("700000")).unwrap();
        assert_eq!(wide.apply(BinaryOp::Mul, &wide), overflow("*"));
        assert_eq!(int("1").apply(BinaryOp::Pow, &int("4000000000")).unwrap(), int("1"));
        assert_eq!(int("-1").apply(BinaryOp::Pow, &int("4000000001")).unwrap(), int("-1"));
        assert!(matches!(
            dec("2.5").apply(BinaryOp::Pow, &dec("1e100000000")),
            Err(EvalError::InvalidOperand { .. })
        ));
    }

    #[test]
    fn distant_decimal_magnitudes_stay_cheap() {
        let huge = dec("1e100000000");
        let sum = huge.apply(BinaryOp::Add, &int("1")).unwrap();
        assert_eq!(sum.to_string(), "1.000000000000000E+100000000");
        let diff = int("1").apply(BinaryOp::Sub, &huge).unwrap();
        assert_eq!(diff.to_string(), "-1.000000000000000E+100000000");
        assert_eq!(huge.step(1).unwrap().to_string(), "1.000000000000000E+100000000");

        let t = Literal::Boolean(true);
        assert_eq!(huge.apply(BinaryOp::Greater, &int("1")).unwrap(), t);
        assert_eq!(dec("-1e100000000").apply(BinaryOp::Less, &dec("1e-100000000")).unwrap(), t);
        assert_eq!(dec("1e-100000000").apply(BinaryOp::Less, &dec("2e-100000000")).unwrap(), t);
        assert_eq!(dec("0").apply(BinaryOp::Less, &dec("1e-100000000")).unwrap(), t);

        assert_eq!(dec("1.5").apply(BinaryOp::Add, &int("2")).unwrap(), dec("3.5"));
        assert_eq!(dec("0").apply(BinaryOp::Add, &huge).unwrap(), huge);
    }

    #[test]
    fn bitwise_on_integers() {
        assert_eq!(int("12").apply(BinaryOp::BitAnd, &int("10")).unwrap(), int("8"));
        assert_eq!(int("12").apply(BinaryOp::BitOr, &int("10")).unwrap(), int("14"));
        assert_eq!(int("12").apply(BinaryOp::BitXor, &int("10")).unwrap(), int("6"));
        assert_eq!(int("1").apply(BinaryOp::ShiftLeft, &int("70")).unwrap(), int("1180591620717411303424"));
        assert_eq!(int("-8").apply(BinaryOp::ShiftRight, &int("1")).unwrap(), int("-4"));
        assert!(matches!(
            int("1").apply(BinaryOp::ShiftLeft, &int("-1")),
            Err(EvalError::InvalidOperand { .. })
        ));
        assert_eq!(
            dec("1.0").apply(BinaryOp::BitAnd, &int("1")),
            Err(EvalError::UnsupportedOperation {
                op: "&",
                lhs: Kind::Decimal,
                rhs: Some(Kind::Integer),
            })
        );
    }

    #[test]
    fn strings_concatenate_but_do_not_subtract() {
        assert_eq!(string("a").apply(BinaryOp::Add, &string("b")).unwrap(), string("ab"));
        assert_eq!(
            string("a").apply(BinaryOp::Sub, &string("b")),
            Err(EvalError::UnsupportedOperation {
                op: "-",
                lhs: Kind::String,
                rhs: Some(Kind::String),
            })
        );
        assert!(string("a").apply(BinaryOp::Add, &int("1")).is_err());
    }

    #[test]
    fn comparisons() {
        let t = Literal::Boolean(true);
        let f = Literal::Boolean(false);
        assert_eq!(int("2").apply(BinaryOp::Less, &dec("2.5")).unwrap(), t);
        assert_eq!(dec("2.0").apply(BinaryOp::Equal, &int("2")).unwrap(), t);
        assert_eq!(string("b").apply(BinaryOp::Greater, &string("a")).unwrap(), t);
        assert_eq!(t.apply(BinaryOp::NotEqual, &f).unwrap(), t);
        assert!(t.apply(BinaryOp::Less, &f).is_err());
        assert!(int("1").apply(BinaryOp::Equal, &string("1")).is_err());
    }

    #[test]
    fn logical_needs_booleans() {
        let t = Literal::Boolean(true);
        let f = Literal::Boolean(false);
        assert_eq!(t.apply(BinaryOp::And, &f).unwrap(), f);
        assert_eq!(t.apply(BinaryOp::Or, &f).unwrap(), t);
        assert_eq!(
            int("1").apply(BinaryOp::And, &t),
            Err(EvalError::UnsupportedOperation {
                op: "and",
                lhs: Kind::Integer,
                rhs: Some(Kind::Boolean),
            })
        );
    }

    #[test]
    fn durations_add_and_subtract() {
        let a = Literal::Duration(Duration::from_nanos(3_600_000_000_000));
        let b = Literal::Duration(Duration::from_nanos(1_800_000_000_000));
        assert_eq!(a.apply(BinaryOp::Add, &b).unwrap().to_string(), "1h30m0s");
        assert_eq!(b.apply(BinaryOp::Sub, &a).unwrap().to_string(), "-30m0s");
        assert!(a.apply(BinaryOp::Add, &int("1")).is_err());
        let max = Literal::Duration(Duration::from_nanos(i64::MAX));
        assert_eq!(max.apply(BinaryOp::Add, &max), Err(EvalError::Overflow { op: "+" }));
    }

    #[test]
    fn decimal_rendering() {
        assert_eq!(format_decimal(&BigDecimal::from_str("0").unwrap()), "0.000000000000000E+00");
        assert_eq!(format_decimal(&BigDecimal::from_str("-0.00125").unwrap()), "-1.250000000000000E-03");
        assert_eq!(format_decimal(&BigDecimal::from_str("123456789.123456789").unwrap()), "1.234567891234568E+08");
        assert_eq!(format_decimal(&BigDecimal::from_str("1e120").unwrap()), "1.000000000000000E+120");
    }

    #[test]
    fn string_rendering_escapes() {
        assert_eq!(string("a\"b\n").to_string(), r#""a\"b\n""#);
    }

    #[test]
    fn capability_table() {
        assert!(int("1").supports(Capability::ShiftLeft));
        assert!(!int("1").supports(Capability::LogicalAnd));
        assert!(!dec("1").supports(Capability::BitwiseOr));
        assert!(!Literal::Boolean(true).supports(Capability::Add));
        assert!(!string("s").supports(Capability::Sub));
        assert!(!Literal::Duration(Duration::ZERO).supports(Capability::Mult));
    }
}
