use std::rc::Rc;

use lua_core::LuaResult;

use super::LuaState;
use crate::value::{LuaType, LuaValue};

// ── Access functions (stack → host) ───────────────────────────────────────────

impl LuaState {
    /// The value at `idx`; unreadable slots read as nil.
    fn peek(&self, idx: isize) -> LuaValue {
        self.value_at(idx).unwrap_or_default()
    }

    pub fn type_name(&self, tp: LuaType) -> &'static str {
        tp.name()
    }

    pub fn type_of(&self, idx: isize) -> LuaType {
        if self.is_valid(idx) {
            self.peek(idx).type_of()
        } else {
            LuaType::None
        }
    }

    pub fn is_none(&self, idx: isize) -> bool {
        self.type_of(idx) == LuaType::None
    }

    pub fn is_nil(&self, idx: isize) -> bool {
        self.type_of(idx) == LuaType::Nil
    }

    pub fn is_none_or_nil(&self, idx: isize) -> bool {
        matches!(self.type_of(idx), LuaType::None | LuaType::Nil)
    }

    pub fn is_boolean(&self, idx: isize) -> bool {
        self.type_of(idx) == LuaType::Boolean
    }

    pub fn is_table(&self, idx: isize) -> bool {
        self.type_of(idx) == LuaType::Table
    }

    pub fn is_function(&self, idx: isize) -> bool {
        self.type_of(idx) == LuaType::Function
    }

    pub fn is_integer(&self, idx: isize) -> bool {
        matches!(self.peek(idx), LuaValue::Integer(_))
    }

    /// True for numbers and for strings convertible to numbers.
    pub fn is_number(&self, idx: isize) -> bool {
        self.to_number_x(idx).is_some()
    }

    /// True for strings and for numbers, which convert to strings.
    pub fn is_string(&self, idx: isize) -> bool {
        matches!(self.type_of(idx), LuaType::String | LuaType::Number)
    }

    pub fn to_boolean(&self, idx: isize) -> bool {
        self.peek(idx).is_truthy()
    }

    pub fn to_number(&self, idx: isize) -> f64 {
        self.to_number_x(idx).unwrap_or(0.0)
    }

    pub fn to_number_x(&self, idx: isize) -> Option<f64> {
        self.peek(idx).to_float()
    }

    pub fn to_integer(&self, idx: isize) -> i64 {
        self.to_integer_x(idx).unwrap_or(0)
    }

    pub fn to_integer_x(&self, idx: isize) -> Option<i64> {
        self.peek(idx).to_integer()
    }

    /// The string at `idx`, converting a number in place.
    pub fn to_string_x(&mut self, idx: isize) -> LuaResult<Option<Rc<[u8]>>> {
        match self.peek(idx) {
            LuaValue::String(s) => Ok(Some(s)),
            v @ (LuaValue::Integer(_) | LuaValue::Float(_)) => {
                let s: Rc<[u8]> = Rc::from(v.to_string().as_bytes());
                self.set_value(idx, LuaValue::String(s.clone()))?;
                Ok(Some(s))
            }
            _ => Ok(None),
        }
    }

    /// Lossy UTF-8 view of the string at `idx`, without conversion.
    pub fn to_str(&self, idx: isize) -> Option<String> {
        match self.peek(idx) {
            LuaValue::String(s) => Some(String::from_utf8_lossy(&s).into_owned()),
            LuaValue::Integer(_) | LuaValue::Float(_) => Some(self.peek(idx).to_string()),
            _ => None,
        }
    }

    /// A copy of the value at `idx`.
    pub fn to_value(&self, idx: isize) -> LuaValue {
        self.peek(idx)
    }

    pub fn raw_equal(&self, idx1: isize, idx2: isize) -> bool {
        self.is_valid(idx1) && self.is_valid(idx2) && self.peek(idx1) == self.peek(idx2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_queries() {
        let mut ls = LuaState::new();
        ls.push_integer(1).unwrap();
        ls.push_string("2.5").unwrap();
        ls.push_string("abc").unwrap();
        ls.push_boolean(false).unwrap();
        ls.new_table().unwrap();

        assert_eq!(ls.type_of(1), LuaType::Number);
        assert_eq!(ls.type_of(6), LuaType::None);
        assert_eq!(ls.type_name(ls.type_of(5)), "table");
        assert!(ls.is_number(2));
        assert!(!ls.is_number(3));
        assert!(ls.is_string(1));
        assert!(ls.is_integer(1));
        assert!(!ls.is_integer(2));
        assert!(ls.is_none(10));
        assert!(ls.is_none_or_nil(10));
        assert!(!ls.to_boolean(4));
        assert!(ls.to_boolean(1));
    }

    #[test]
    fn conversions() {
        let mut ls = LuaState::new();
        ls.push_string("0x10").unwrap();
        ls.push_number(3.0).unwrap();
        ls.push_number(3.5).unwrap();
        assert_eq!(ls.to_integer_x(1), Some(16));
        assert_eq!(ls.to_integer_x(2), Some(3));
        assert_eq!(ls.to_integer_x(3), None);
        assert_eq!(ls.to_number(3), 3.5);
        assert_eq!(ls.to_number(9), 0.0);
    }

    #[test]
    fn to_string_converts_numbers_in_place() {
        let mut ls = LuaState::new();
        ls.push_integer(12).unwrap();
        ls.push_number(0.5).unwrap();
        ls.push_nil().unwrap();
        assert_eq!(ls.to_string_x(1).unwrap().as_deref(), Some(&b"12"[..]));
        assert_eq!(ls.type_of(1), LuaType::String);
        assert_eq!(ls.to_str(2).as_deref(), Some("0.5"));
        assert_eq!(ls.type_of(2), LuaType::Number);
        assert_eq!(ls.to_string_x(3).unwrap(), None);
    }
}
