use std::rc::Rc;

use lua_core::{LuaError, LuaResult};

use super::LuaState;
use crate::arith::{self, ArithOp, CompareOp};
use crate::value::LuaValue;

impl LuaState {
    /// Pop the operand(s) of `op` and push the result.
    pub fn arith(&mut self, op: ArithOp) -> LuaResult<()> {
        let b = self.stack.pop()?;
        let a = if op.is_unary() { b.clone() } else { self.stack.pop()? };
        let result = arith::arith(&a, &b, op)?;
        self.stack.push(result)
    }

    pub fn compare(&self, idx1: isize, idx2: isize, op: CompareOp) -> LuaResult<bool> {
        if !self.is_valid(idx1) || !self.is_valid(idx2) {
            return Ok(false);
        }
        let a = self.value_at(idx1)?;
        let b = self.value_at(idx2)?;
        arith::compare(&a, &b, op)
    }

    /// Push the length of the value at `idx`.
    pub fn len(&mut self, idx: isize) -> LuaResult<()> {
        let n = match self.value_at(idx)? {
            LuaValue::String(s) => s.len(),
            LuaValue::Table(t) => t.borrow().length(),
            other => return Err(LuaError::Length(other.type_name())),
        };
        self.stack.push(LuaValue::Integer(n as i64))
    }

    /// Pop `n` values and push their concatenation.
    pub fn concat(&mut self, n: usize) -> LuaResult<()> {
        if n == 0 {
            return self.stack.push(LuaValue::string(""));
        }
        let parts = self.stack.pop_n(n)?;
        let mut buf = Vec::new();
        for part in &parts {
            match part.to_bytes() {
                Some(bytes) => buf.extend_from_slice(&bytes),
                None => return Err(LuaError::Concat(part.type_name())),
            }
        }
        self.stack.push(LuaValue::String(Rc::from(buf)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chained_arithmetic() {
        let mut ls = LuaState::new();
        for n in [4, 3, 2, 1] {
            ls.push_integer(n).unwrap();
        }
        ls.arith(ArithOp::Sub).unwrap();
        ls.arith(ArithOp::Add).unwrap();
        ls.arith(ArithOp::Mul).unwrap();
        assert_eq!(ls.get_top(), 1);
        assert_eq!(ls.to_integer(1), 16);
    }

    #[test]
    fn unary_pops_one() {
        let mut ls = LuaState::new();
        ls.push_integer(1).unwrap();
        ls.push_number(2.5).unwrap();
        ls.arith(ArithOp::Unm).unwrap();
        assert_eq!(ls.get_top(), 2);
        assert_eq!(ls.to_number(2), -2.5);
    }

    #[test]
    fn compare_by_index() {
        let mut ls = LuaState::new();
        ls.push_integer(1).unwrap();
        ls.push_number(2.0).unwrap();
        assert!(ls.compare(1, 2, CompareOp::Lt).unwrap());
        assert!(!ls.compare(1, 2, CompareOp::Eq).unwrap());
        assert!(!ls.compare(1, 5, CompareOp::Eq).unwrap());
    }

    #[test]
    fn length_and_concat() {
        let mut ls = LuaState::new();
        ls.push_string("abc").unwrap();
        ls.push_integer(1).unwrap();
        ls.push_number(2.0).unwrap();
        ls.concat(3).unwrap();
        assert_eq!(ls.to_str(-1).as_deref(), Some("abc12.0"));
        ls.len(-1).unwrap();
        assert_eq!(ls.to_integer(-1), 7);
        ls.push_boolean(true).unwrap();
        assert_eq!(ls.len(-1), Err(LuaError::Length("boolean")));
        assert_eq!(ls.concat(2), Err(LuaError::Concat("boolean")));
    }
}
