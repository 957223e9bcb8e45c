use lua_core::{LuaError, LuaResult};

use crate::value::{float_to_integer, LuaValue};

/// Arithmetic and bitwise operators, in the order of their opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Mod,
    Pow,
    Div,
    IDiv,
    BAnd,
    BOr,
    BXor,
    Shl,
    Shr,
    Unm,
    BNot,
}

impl ArithOp {
    pub fn is_unary(self) -> bool {
        matches!(self, ArithOp::Unm | ArithOp::BNot)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Mod => "%",
            ArithOp::Pow => "^",
            ArithOp::Div => "/",
            ArithOp::IDiv => "//",
            ArithOp::BAnd => "&",
            ArithOp::BOr => "|",
            ArithOp::BXor => "~",
            ArithOp::Shl => "<<",
            ArithOp::Shr => ">>",
            ArithOp::Unm => "-",
            ArithOp::BNot => "~",
        }
    }

    fn is_bitwise(self) -> bool {
        matches!(
            self,
            ArithOp::BAnd | ArithOp::BOr | ArithOp::BXor | ArithOp::Shl | ArithOp::Shr | ArithOp::BNot
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    Le,
}

// ── Arithmetic helpers ────────────────────────────────────────────────────────

/// Apply `op` to `a` and `b` (`b` is ignored by unary operators).
pub fn arith(a: &LuaValue, b: &LuaValue, op: ArithOp) -> LuaResult<LuaValue> {
    let err = || LuaError::Arithmetic {
        op: op.symbol(),
        lhs: a.type_name(),
        rhs: b.type_name(),
    };

    if op.is_bitwise() {
        let x = bit_operand(a).ok_or_else(err)??;
        let y = bit_operand(b).ok_or_else(err)??;
        return Ok(LuaValue::Integer(match op {
            ArithOp::BAnd => x & y,
            ArithOp::BOr => x | y,
            ArithOp::BXor => x ^ y,
            ArithOp::Shl => shift_left(x, y),
            ArithOp::Shr => shift_left(x, y.wrapping_neg()),
            _ => !x,
        }));
    }

    let x = a.to_number().ok_or_else(err)?;
    let y = b.to_number().ok_or_else(err)?;
    if let (LuaValue::Integer(x), LuaValue::Integer(y)) = (&x, &y) {
        let (x, y) = (*x, *y);
        match op {
            ArithOp::Add => return Ok(LuaValue::Integer(x.wrapping_add(y))),
            ArithOp::Sub => return Ok(LuaValue::Integer(x.wrapping_sub(y))),
            ArithOp::Mul => return Ok(LuaValue::Integer(x.wrapping_mul(y))),
            ArithOp::Mod => return int_mod(x, y).map(LuaValue::Integer),
            ArithOp::IDiv => return int_idiv(x, y).map(LuaValue::Integer),
            ArithOp::Unm => return Ok(LuaValue::Integer(x.wrapping_neg())),
            _ => {}
        }
    }

    let x = x.to_float().ok_or_else(err)?;
    let y = y.to_float().ok_or_else(err)?;
    Ok(LuaValue::Float(match op {
        ArithOp::Add => x + y,
        ArithOp::Sub => x - y,
        ArithOp::Mul => x * y,
        ArithOp::Div => x / y,
        ArithOp::Pow => x.powf(y),
        ArithOp::Mod => float_mod(x, y),
        ArithOp::IDiv => (x / y).floor(),
        _ => -x,
    }))
}

/// `None` when `v` is not a number at all, `Some(Err)` when it is a number
/// without an integer representation.
fn bit_operand(v: &LuaValue) -> Option<LuaResult<i64>> {
    let n = v.to_number()?;
    Some(n.to_integer().ok_or(LuaError::NoIntegerRepresentation))
}

fn int_mod(x: i64, y: i64) -> LuaResult<i64> {
    if y == 0 {
        return Err(LuaError::DivideByZero("%"));
    }
    let m = x.wrapping_rem(y);
    Ok(if m != 0 && (m ^ y) < 0 { m + y } else { m })
}

fn int_idiv(x: i64, y: i64) -> LuaResult<i64> {
    if y == 0 {
        return Err(LuaError::DivideByZero("//"));
    }
    let q = x.wrapping_div(y);
    Ok(if x.wrapping_rem(y) != 0 && (x ^ y) < 0 { q - 1 } else { q })
}

fn float_mod(x: f64, y: f64) -> f64 {
    let m = x % y;
    if (m > 0.0 && y < 0.0) || (m < 0.0 && y > 0.0) {
        m + y
    } else {
        m
    }
}

/// Logical shift; negative counts shift right, counts of 64 or more give 0.
fn shift_left(x: i64, n: i64) -> i64 {
    if n <= -64 || n >= 64 {
        0
    } else if n >= 0 {
        ((x as u64) << n) as i64
    } else {
        ((x as u64) >> -n) as i64
    }
}

// ── Comparison helpers ────────────────────────────────────────────────────────

pub fn compare(a: &LuaValue, b: &LuaValue, op: CompareOp) -> LuaResult<bool> {
    match op {
        CompareOp::Eq => Ok(a == b),
        CompareOp::Lt => cmp_lt(a, b),
        CompareOp::Le => cmp_le(a, b),
    }
}

fn cmp_lt(a: &LuaValue, b: &LuaValue) -> LuaResult<bool> {
    Ok(match (a, b) {
        (LuaValue::Integer(x), LuaValue::Integer(y)) => x < y,
        (LuaValue::Float(x), LuaValue::Float(y)) => x < y,
        (LuaValue::Integer(x), LuaValue::Float(y)) => int_lt_float(*x, *y),
        (LuaValue::Float(x), LuaValue::Integer(y)) => float_lt_int(*x, *y),
        (LuaValue::String(x), LuaValue::String(y)) => x < y,
        _ => {
            return Err(LuaError::Comparison {
                lhs: a.type_name(),
                rhs: b.type_name(),
            })
        }
    })
}

fn cmp_le(a: &LuaValue, b: &LuaValue) -> LuaResult<bool> {
    Ok(match (a, b) {
        (LuaValue::Integer(x), LuaValue::Integer(y)) => x <= y,
        (LuaValue::Float(x), LuaValue::Float(y)) => x <= y,
        (LuaValue::Integer(x), LuaValue::Float(y)) => int_le_float(*x, *y),
        (LuaValue::Float(x), LuaValue::Integer(y)) => float_le_int(*x, *y),
        (LuaValue::String(x), LuaValue::String(y)) => x <= y,
        _ => {
            return Err(LuaError::Comparison {
                lhs: a.type_name(),
                rhs: b.type_name(),
            })
        }
    })
}

// Mixed comparisons round the float to an integer bound. A float outside the
// i64 range decides by its sign; NaN compares false.

fn int_lt_float(i: i64, f: f64) -> bool {
    match float_to_integer(f.ceil()) {
        Some(c) => i < c,
        None => f > 0.0,
    }
}

fn int_le_float(i: i64, f: f64) -> bool {
    match float_to_integer(f.floor()) {
        Some(fl) => i <= fl,
        None => f > 0.0,
    }
}

fn float_lt_int(f: f64, i: i64) -> bool {
    match float_to_integer(f.floor()) {
        Some(fl) => fl < i,
        None => f < 0.0,
    }
}

fn float_le_int(f: f64, i: i64) -> bool {
    match float_to_integer(f.ceil()) {
        Some(c) => c <= i,
        None => f < 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> LuaValue {
        LuaValue::Integer(n)
    }

    fn float(f: f64) -> LuaValue {
        LuaValue::Float(f)
    }

    fn run(a: LuaValue, b: LuaValue, op: ArithOp) -> LuaValue {
        arith(&a, &b, op).unwrap()
    }

    #[test]
    fn integer_ops_stay_integer() {
        assert_eq!(run(int(7), int(3), ArithOp::Add), int(10));
        assert!(matches!(run(int(7), int(3), ArithOp::Sub), LuaValue::Integer(4)));
        assert_eq!(run(int(i64::MAX), int(1), ArithOp::Add), int(i64::MIN));
        assert!(matches!(run(int(7), int(2), ArithOp::Div), LuaValue::Float(f) if f == 3.5));
        assert!(matches!(run(int(2), int(10), ArithOp::Pow), LuaValue::Float(f) if f == 1024.0));
    }

    #[test]
    fn mixed_ops_are_float() {
        assert!(matches!(run(int(1), float(0.5), ArithOp::Add), LuaValue::Float(f) if f == 1.5));
        assert!(matches!(run(float(4.0), int(2), ArithOp::Mul), LuaValue::Float(f) if f == 8.0));
    }

    #[test]
    fn floor_division_and_modulo() {
        assert_eq!(run(int(7), int(2), ArithOp::IDiv), int(3));
        assert_eq!(run(int(-7), int(2), ArithOp::IDiv), int(-4));
        assert_eq!(run(int(-7), int(2), ArithOp::Mod), int(1));
        assert_eq!(run(int(7), int(-2), ArithOp::Mod), int(-1));
        assert_eq!(run(int(i64::MIN), int(-1), ArithOp::IDiv), int(i64::MIN));
        assert!(matches!(run(float(-7.0), int(2), ArithOp::IDiv), LuaValue::Float(f) if f == -4.0));
        assert!(matches!(run(float(5.5), int(-2), ArithOp::Mod), LuaValue::Float(f) if f == -0.5));
    }

    #[test]
    fn integer_division_by_zero() {
        assert_eq!(arith(&int(1), &int(0), ArithOp::Mod), Err(LuaError::DivideByZero("%")));
        assert_eq!(arith(&int(1), &int(0), ArithOp::IDiv), Err(LuaError::DivideByZero("//")));
        assert!(matches!(run(int(1), float(0.0), ArithOp::Div), LuaValue::Float(f) if f.is_infinite()));
    }

    #[test]
    fn bitwise_ops() {
        assert_eq!(run(int(0b1100), int(0b1010), ArithOp::BAnd), int(0b1000));
        assert_eq!(run(int(0b1100), int(0b1010), ArithOp::BOr), int(0b1110));
        assert_eq!(run(int(0b1100), int(0b1010), ArithOp::BXor), int(0b0110));
        assert_eq!(run(int(0), int(0), ArithOp::BNot), int(-1));
        assert_eq!(run(float(3.0), int(1), ArithOp::Shl), int(6));
        assert_eq!(run(int(-1), int(63), ArithOp::Shr), int(1));
        assert_eq!(run(int(1), int(64), ArithOp::Shl), int(0));
        assert_eq!(run(int(8), int(-1), ArithOp::Shl), int(4));
        assert_eq!(run(int(8), int(i64::MIN), ArithOp::Shr), int(0));
        assert_eq!(arith(&float(1.5), &int(1), ArithOp::BAnd), Err(LuaError::NoIntegerRepresentation));
    }

    #[test]
    fn numeric_strings_coerce() {
        assert_eq!(run(LuaValue::from("10"), int(1), ArithOp::Add), int(11));
        assert!(matches!(run(LuaValue::from("0.5"), int(1), ArithOp::Add), LuaValue::Float(f) if f == 1.5));
        assert_eq!(run(LuaValue::from("0x10"), int(0), ArithOp::BOr), int(16));
    }

    #[test]
    fn non_numbers_are_rejected() {
        let err = arith(&LuaValue::Boolean(true), &int(1), ArithOp::Add).unwrap_err();
        assert_eq!(
            err,
            LuaError::Arithmetic {
                op: "+",
                lhs: "boolean",
                rhs: "number"
            }
        );
        assert!(arith(&LuaValue::from("abc"), &int(1), ArithOp::Mul).is_err());
    }

    #[test]
    fn comparisons() {
        assert!(compare(&int(1), &float(1.5), CompareOp::Lt).unwrap());
        assert!(compare(&int(2), &float(2.0), CompareOp::Le).unwrap());
        assert!(compare(&int(2), &float(2.0), CompareOp::Eq).unwrap());
        assert!(compare(&LuaValue::from("a"), &LuaValue::from("b"), CompareOp::Lt).unwrap());
        assert!(!compare(&LuaValue::from("1"), &int(1), CompareOp::Eq).unwrap());
        assert_eq!(
            compare(&int(1), &LuaValue::from("2"), CompareOp::Lt),
            Err(LuaError::Comparison {
                lhs: "number",
                rhs: "string"
            })
        );
    }

    #[test]
    fn mixed_order_is_exact_past_2_53() {
        let big = int(9_007_199_254_740_993);
        let rounded = float(9_007_199_254_740_992.0);
        assert!(compare(&rounded, &big, CompareOp::Lt).unwrap());
        assert!(!compare(&big, &rounded, CompareOp::Le).unwrap());
        assert!(compare(&rounded, &big, CompareOp::Le).unwrap());
        assert!(!compare(&big, &rounded, CompareOp::Eq).unwrap());

        let two_63 = float(9_223_372_036_854_775_808.0);
        assert!(compare(&int(i64::MAX), &two_63, CompareOp::Lt).unwrap());
        assert!(!compare(&two_63, &int(i64::MAX), CompareOp::Le).unwrap());
        assert!(!compare(&int(i64::MAX), &two_63, CompareOp::Eq).unwrap());
        assert!(compare(&float(-1e300), &int(i64::MIN), CompareOp::Lt).unwrap());
        assert!(compare(&int(i64::MIN), &float(-9_223_372_036_854_775_808.0), CompareOp::Le).unwrap());
        assert!(compare(&int(3), &float(3.5), CompareOp::Lt).unwrap());
        assert!(!compare(&float(-3.5), &int(-4), CompareOp::Le).unwrap());
    }

    #[test]
    fn nan_is_unordered() {
        let nan = float(f64::NAN);
        for op in [CompareOp::Lt, CompareOp::Le, CompareOp::Eq] {
            assert!(!compare(&nan, &int(0), op).unwrap());
            assert!(!compare(&int(0), &nan, op).unwrap());
        }
    }
}
