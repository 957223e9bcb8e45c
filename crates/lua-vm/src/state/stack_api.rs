use std::rc::Rc;

use lua_core::{LuaError, LuaResult};

use super::LuaState;
use crate::closure::{Closure, Upvalue};
use crate::value::LuaValue;

// ── Basic stack manipulation ──────────────────────────────────────────────────

impl LuaState {
    pub fn get_top(&self) -> isize {
        self.stack.top() as isize
    }

    pub fn abs_index(&self, idx: isize) -> isize {
        self.stack.abs_index(idx)
    }

    /// Ensure room for `n` more values on the active frame.
    pub fn check_stack(&mut self, n: usize) -> LuaResult<()> {
        self.stack.check(n)
    }

    pub fn pop(&mut self, n: usize) -> LuaResult<()> {
        for _ in 0..n {
            self.stack.pop()?;
        }
        Ok(())
    }

    pub fn copy(&mut self, from: isize, to: isize) -> LuaResult<()> {
        let val = self.value_at(from)?;
        self.set_value(to, val)
    }

    pub fn push_value(&mut self, idx: isize) -> LuaResult<()> {
        let val = self.value_at(idx)?;
        self.stack.push(val)
    }

    /// Pop the top value into `idx`.
    pub fn replace(&mut self, idx: isize) -> LuaResult<()> {
        let val = self.stack.pop()?;
        self.set_value(idx, val)
    }

    /// Move the top value into `idx`, shifting the values above it up.
    pub fn insert(&mut self, idx: isize) -> LuaResult<()> {
        self.rotate(idx, 1)
    }

    pub fn remove(&mut self, idx: isize) -> LuaResult<()> {
        self.rotate(idx, -1)?;
        self.pop(1)
    }

    /// Rotate the values between `idx` and the top `n` positions towards the
    /// top (negative `n` rotates towards `idx`).
    pub fn rotate(&mut self, idx: isize, n: isize) -> LuaResult<()> {
        let p = self.stack.slot_of(idx).ok_or(LuaError::InvalidIndex(idx))?;
        let t = self.stack.top() - 1;
        let len = (t - p + 1) as isize;
        let m = t - n.rem_euclid(len) as usize;
        self.stack.reverse(p, m);
        self.stack.reverse(m + 1, t);
        self.stack.reverse(p, t);
        Ok(())
    }

    /// Set the top to `idx`, popping or nil-filling as needed.
    pub fn set_top(&mut self, idx: isize) -> LuaResult<()> {
        let new_top = self.stack.abs_index(idx);
        if new_top < 0 {
            return Err(LuaError::StackUnderflow);
        }
        let top = self.get_top();
        if new_top < top {
            self.pop((top - new_top) as usize)
        } else {
            for _ in top..new_top {
                self.stack.push(LuaValue::Nil)?;
            }
            Ok(())
        }
    }

    // ── Push functions ────────────────────────────────────────────────────────

    pub fn push(&mut self, val: LuaValue) -> LuaResult<()> {
        self.stack.push(val)
    }

    pub fn push_nil(&mut self) -> LuaResult<()> {
        self.stack.push(LuaValue::Nil)
    }

    pub fn push_boolean(&mut self, b: bool) -> LuaResult<()> {
        self.stack.push(LuaValue::Boolean(b))
    }

    pub fn push_integer(&mut self, n: i64) -> LuaResult<()> {
        self.stack.push(LuaValue::Integer(n))
    }

    pub fn push_number(&mut self, n: f64) -> LuaResult<()> {
        self.stack.push(LuaValue::Float(n))
    }

    pub fn push_string(&mut self, s: impl AsRef<[u8]>) -> LuaResult<()> {
        self.stack.push(LuaValue::string(s))
    }

    pub fn push_host_function<F>(&mut self, f: F) -> LuaResult<()>
    where
        F: Fn(&mut LuaState) -> LuaResult<usize> + 'static,
    {
        self.push_host_closure(f, 0)
    }

    /// Push a host closure capturing the top `n` values as its upvalues.
    pub fn push_host_closure<F>(&mut self, f: F, n: usize) -> LuaResult<()>
    where
        F: Fn(&mut LuaState) -> LuaResult<usize> + 'static,
    {
        let upvalues = self.stack.pop_n(n)?.into_iter().map(Upvalue::closed).collect();
        let closure = Closure::host(Rc::new(f), upvalues);
        self.stack.push(LuaValue::Function(Rc::new(closure)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(ls: &LuaState) -> Vec<i64> {
        (1..=ls.get_top()).map(|i| ls.to_integer(i)).collect()
    }

    #[test]
    fn basic_stack_sequence() {
        let mut ls = LuaState::new();
        ls.push_boolean(true).unwrap();
        ls.push_integer(10).unwrap();
        ls.push_nil().unwrap();
        ls.push_string("hello").unwrap();
        ls.push_value(-4).unwrap();
        assert_eq!(ls.get_top(), 5);
        ls.replace(3).unwrap();
        assert!(ls.to_boolean(3));
        assert_eq!(ls.get_top(), 4);
        ls.set_top(6).unwrap();
        assert!(ls.is_nil(6));
        ls.remove(-3).unwrap();
        assert_eq!(ls.get_top(), 5);
        assert!(ls.is_integer(2));
        assert!(ls.is_boolean(3));
        assert!(ls.is_nil(4));
        ls.set_top(-5).unwrap();
        assert_eq!(ls.get_top(), 1);
        assert!(ls.is_boolean(1));
    }

    #[test]
    fn rotate_and_insert() {
        let mut ls = LuaState::new();
        for i in 1..=5 {
            ls.push_integer(i).unwrap();
        }
        ls.rotate(2, 1).unwrap();
        assert_eq!(ints(&ls), vec![1, 5, 2, 3, 4]);
        ls.rotate(2, -1).unwrap();
        assert_eq!(ints(&ls), vec![1, 2, 3, 4, 5]);
        ls.push_integer(0).unwrap();
        ls.insert(1).unwrap();
        assert_eq!(ints(&ls), vec![0, 1, 2, 3, 4, 5]);
        ls.rotate(2, -1).unwrap();
        assert_eq!(ints(&ls), vec![0, 2, 3, 4, 5, 1]);
    }

    #[test]
    fn invalid_operations_fail() {
        let mut ls = LuaState::new();
        assert_eq!(ls.pop(1), Err(LuaError::StackUnderflow));
        assert_eq!(ls.replace(1), Err(LuaError::StackUnderflow));
        assert_eq!(ls.rotate(1, 1), Err(LuaError::InvalidIndex(1)));
        ls.push_integer(1).unwrap();
        assert_eq!(ls.set_top(-3), Err(LuaError::StackUnderflow));
        assert_eq!(ls.copy(1, 4), Err(LuaError::InvalidIndex(4)));
    }

    #[test]
    fn root_frame_overflows() {
        let mut ls = LuaState::new();
        let capacity = ls.config().min_stack;
        for i in 0..capacity {
            ls.push_integer(i as i64).unwrap();
        }
        assert_eq!(ls.push_nil(), Err(LuaError::StackOverflow));
        ls.check_stack(1).unwrap();
        ls.push_nil().unwrap();
    }

    #[test]
    fn host_closure_captures_upvalues() {
        let mut ls = LuaState::new();
        ls.push_integer(41).unwrap();
        ls.push_host_closure(
            |ls: &mut LuaState| {
                ls.push_value(crate::state::upvalue_index(1))?;
                ls.push_integer(1)?;
                ls.arith(crate::ArithOp::Add)?;
                Ok(1)
            },
            1,
        )
        .unwrap();
        assert_eq!(ls.get_top(), 1);
        ls.call(0, 1).unwrap();
        assert_eq!(ls.to_integer(-1), 42);
    }
}
