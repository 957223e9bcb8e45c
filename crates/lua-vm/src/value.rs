use std::fmt;
use std::rc::Rc;

use lua_core::Constant;

use crate::closure::Closure;
use crate::table::{new_table, TableRef};

/// Basic type tags, as reported by `type()`. `None` marks an invalid stack index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LuaType {
    None,
    Nil,
    Boolean,
    Number,
    String,
    Table,
    Function,
}

impl LuaType {
    pub fn name(self) -> &'static str {
        match self {
            LuaType::None => "no value",
            LuaType::Nil => "nil",
            LuaType::Boolean => "boolean",
            LuaType::Number => "number",
            LuaType::String => "string",
            LuaType::Table => "table",
            LuaType::Function => "function",
        }
    }
}

/// All Lua value types, mirroring the Lua 5.3 type system.
#[derive(Clone, Default)]
pub enum LuaValue {
    #[default]
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    /// Immutable byte string; Lua strings need not be valid UTF-8.
    String(Rc<[u8]>),
    /// A Lua table (array + hash parts, reference-counted + interior mutability).
    Table(TableRef),
    /// A Lua or host closure.
    Function(Rc<Closure>),
}

impl LuaValue {
    pub fn string(s: impl AsRef<[u8]>) -> Self {
        LuaValue::String(Rc::from(s.as_ref()))
    }

    /// Create a new empty table value.
    pub fn new_table() -> Self {
        LuaValue::Table(new_table(0, 0))
    }

    pub fn type_of(&self) -> LuaType {
        match self {
            LuaValue::Nil => LuaType::Nil,
            LuaValue::Boolean(_) => LuaType::Boolean,
            LuaValue::Integer(_) | LuaValue::Float(_) => LuaType::Number,
            LuaValue::String(_) => LuaType::String,
            LuaValue::Table(_) => LuaType::Table,
            LuaValue::Function(_) => LuaType::Function,
        }
    }

    /// Returns the Lua type name string as per the reference manual.
    pub fn type_name(&self) -> &'static str {
        self.type_of().name()
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, LuaValue::Nil)
    }

    /// Returns `true` if the value is truthy in Lua's sense
    /// (everything except `nil` and `false` is truthy).
    pub fn is_truthy(&self) -> bool {
        !matches!(self, LuaValue::Nil | LuaValue::Boolean(false))
    }

    /// The value as a number, converting numeric strings. Integers stay integers.
    pub fn to_number(&self) -> Option<LuaValue> {
        match self {
            LuaValue::Integer(_) | LuaValue::Float(_) => Some(self.clone()),
            LuaValue::String(s) => parse_number(s),
            _ => None,
        }
    }

    pub fn to_float(&self) -> Option<f64> {
        match self.to_number()? {
            LuaValue::Integer(n) => Some(n as f64),
            LuaValue::Float(f) => Some(f),
            _ => None,
        }
    }

    /// The value as an integer; floats convert only when they are integral.
    pub fn to_integer(&self) -> Option<i64> {
        match self.to_number()? {
            LuaValue::Integer(n) => Some(n),
            LuaValue::Float(f) => float_to_integer(f),
            _ => None,
        }
    }

    /// String form used by concatenation: strings as-is, numbers formatted.
    pub fn to_bytes(&self) -> Option<Rc<[u8]>> {
        match self {
            LuaValue::String(s) => Some(s.clone()),
            LuaValue::Integer(_) | LuaValue::Float(_) => Some(Rc::from(self.to_string().as_bytes())),
            _ => None,
        }
    }
}

impl From<&Constant> for LuaValue {
    fn from(c: &Constant) -> Self {
        match c {
            Constant::Nil => LuaValue::Nil,
            Constant::Boolean(b) => LuaValue::Boolean(*b),
            Constant::Integer(n) => LuaValue::Integer(*n),
            Constant::Float(f) => LuaValue::Float(*f),
            Constant::String(s) => LuaValue::String(s.clone()),
        }
    }
}

impl From<bool> for LuaValue {
    fn from(b: bool) -> Self {
        LuaValue::Boolean(b)
    }
}

impl From<i64> for LuaValue {
    fn from(n: i64) -> Self {
        LuaValue::Integer(n)
    }
}

impl From<f64> for LuaValue {
    fn from(f: f64) -> Self {
        LuaValue::Float(f)
    }
}

impl From<&str> for LuaValue {
    fn from(s: &str) -> Self {
        LuaValue::string(s)
    }
}

// Raw equality: numbers by value across subtypes, references by identity.
impl PartialEq for LuaValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LuaValue::Nil, LuaValue::Nil) => true,
            (LuaValue::Boolean(a), LuaValue::Boolean(b)) => a == b,
            (LuaValue::Integer(a), LuaValue::Integer(b)) => a == b,
            (LuaValue::Float(a), LuaValue::Float(b)) => a == b,
            (LuaValue::Integer(i), LuaValue::Float(f)) | (LuaValue::Float(f), LuaValue::Integer(i)) => {
                float_to_integer(*f) == Some(*i)
            }
            (LuaValue::String(a), LuaValue::String(b)) => a == b,
            (LuaValue::Table(a), LuaValue::Table(b)) => Rc::ptr_eq(a, b),
            (LuaValue::Function(a), LuaValue::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for LuaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuaValue::Nil => write!(f, "LuaValue::Nil"),
            LuaValue::Boolean(b) => write!(f, "LuaValue::Boolean({b})"),
            LuaValue::Integer(n) => write!(f, "LuaValue::Integer({n})"),
            LuaValue::Float(n) => write!(f, "LuaValue::Float({n})"),
            LuaValue::String(s) => write!(f, "LuaValue::String({:?})", String::from_utf8_lossy(s)),
            LuaValue::Table(t) => write!(f, "LuaValue::Table({:p})", Rc::as_ptr(t)),
            LuaValue::Function(c) => write!(f, "LuaValue::Function({:p})", Rc::as_ptr(c)),
        }
    }
}

impl fmt::Display for LuaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuaValue::Nil => write!(f, "nil"),
            LuaValue::Boolean(b) => write!(f, "{b}"),
            LuaValue::Integer(n) => write!(f, "{n}"),
            LuaValue::Float(n) => write!(f, "{}", format_float(*n)),
            LuaValue::String(s) => write!(f, "{}", String::from_utf8_lossy(s)),
            LuaValue::Table(t) => write!(f, "table: {:p}", Rc::as_ptr(t)),
            LuaValue::Function(c) if c.is_host() => write!(f, "function: builtin: {:p}", Rc::as_ptr(c)),
            LuaValue::Function(c) => write!(f, "function: {:p}", Rc::as_ptr(c)),
        }
    }
}

// ── Number conversions ────────────────────────────────────────────────────────

/// Converts a float with an exact integer value; fractional or out-of-range
/// values yield `None`.
pub fn float_to_integer(f: f64) -> Option<i64> {
    // 2^63 is exactly representable; i64::MAX is not.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f) {
        Some(f as i64)
    } else {
        None
    }
}

/// Parses a numeral the way Lua's string coercion does: surrounding
/// whitespace is ignored, decimal and hex integers stay integers, and
/// decimal integers too large for 64 bits fall back to floats.
pub fn parse_number(s: &[u8]) -> Option<LuaValue> {
    let s = std::str::from_utf8(s).ok()?.trim();
    let (neg, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        // hex integers wrap around
        let n = hex.bytes().fold(0i64, |acc, b| {
            let digit = (b as char).to_digit(16).unwrap_or(0) as i64;
            acc.wrapping_mul(16).wrapping_add(digit)
        });
        return Some(LuaValue::Integer(if neg { n.wrapping_neg() } else { n }));
    }

    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-')) {
        return None;
    }
    if body.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = s.parse::<i64>() {
            return Some(LuaValue::Integer(n));
        }
    }
    s.parse::<f64>().ok().map(LuaValue::Float)
}

/// Render a float like C's `%.14g`, adding `.0` when the result would read
/// as an integer.
pub fn format_float(n: f64) -> String {
    if n.is_nan() {
        return if n.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if n.is_infinite() {
        return if n < 0.0 { "-inf" } else { "inf" }.to_string();
    }

    const PRECISION: i32 = 14;
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, n);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    let mut out = if exp < -4 || exp >= PRECISION {
        let mantissa = trim_fraction(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    } else {
        let decimals = (PRECISION - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{n:.decimals$}")).to_string()
    };

    if out.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
        out.push_str(".0");
    }
    out
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
