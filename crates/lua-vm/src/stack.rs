use std::collections::HashMap;
use std::rc::Rc;

use lua_core::{LuaError, LuaResult, Proto};

use crate::closure::{Closure, UpvalueCell};
use crate::state::LUA_REGISTRYINDEX;
use crate::value::LuaValue;

// ── Register stack / call frame ───────────────────────────────────────────────

/// One call frame: a fixed-capacity, nil-initialised window of slots.
///
/// Indices follow the Lua API convention: positive indices count from 1 at
/// the bottom of the frame, negative ones from the top.
#[derive(Debug)]
pub struct LuaStack {
    slots: Vec<LuaValue>,
    pub(crate) top: usize,
    limit: usize,
    /// The running closure; `None` for the host's base frame.
    pub(crate) closure: Option<Rc<Closure>>,
    pub(crate) varargs: Vec<LuaValue>,
    pub(crate) pc: usize,
    /// Results the caller expects; negative keeps them all.
    pub(crate) nresults: isize,
    /// Cells still aliasing this frame's registers, keyed by slot.
    pub(crate) open_upvalues: HashMap<usize, UpvalueCell>,
}

impl LuaStack {
    pub fn new(size: usize, limit: usize, closure: Option<Rc<Closure>>) -> Self {
        Self {
            slots: vec![LuaValue::Nil; size],
            top: 0,
            limit: limit.max(size),
            closure,
            varargs: Vec::new(),
            pc: 0,
            nresults: -1,
            open_upvalues: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn top(&self) -> usize {
        self.top
    }

    /// Make room for at least `n` more pushes.
    pub fn check(&mut self, n: usize) -> LuaResult<()> {
        let needed = self.top + n;
        if needed > self.slots.len() {
            if needed > self.limit {
                return Err(LuaError::StackOverflow);
            }
            self.slots.resize(needed, LuaValue::Nil);
        }
        Ok(())
    }

    pub fn push(&mut self, val: LuaValue) -> LuaResult<()> {
        if self.top == self.slots.len() {
            return Err(LuaError::StackOverflow);
        }
        self.slots[self.top] = val;
        self.top += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> LuaResult<LuaValue> {
        if self.top == 0 {
            return Err(LuaError::StackUnderflow);
        }
        self.top -= 1;
        Ok(std::mem::take(&mut self.slots[self.top]))
    }

    /// Push `n` values from `vals`, padding with nil; a negative `n` pushes all.
    pub fn push_n(&mut self, vals: Vec<LuaValue>, n: isize) -> LuaResult<()> {
        let n = usize::try_from(n).unwrap_or(vals.len());
        let mut vals = vals.into_iter();
        for _ in 0..n {
            self.push(vals.next().unwrap_or_default())?;
        }
        Ok(())
    }

    /// Pop the top `n` values, returned bottom-first.
    pub fn pop_n(&mut self, n: usize) -> LuaResult<Vec<LuaValue>> {
        if n > self.top {
            return Err(LuaError::StackUnderflow);
        }
        let start = self.top - n;
        let vals = self.slots[start..self.top].iter_mut().map(std::mem::take).collect();
        self.top = start;
        Ok(vals)
    }

    /// Convert a relative index to an absolute one. Pseudo-indices pass through.
    pub fn abs_index(&self, idx: isize) -> isize {
        if idx >= 0 || idx <= LUA_REGISTRYINDEX {
            idx
        } else {
            idx + self.top as isize + 1
        }
    }

    /// Zero-based slot for a valid stack index.
    pub fn slot_of(&self, idx: isize) -> Option<usize> {
        let abs = self.abs_index(idx);
        (abs > 0 && abs as usize <= self.top).then(|| abs as usize - 1)
    }

    pub fn is_valid(&self, idx: isize) -> bool {
        self.slot_of(idx).is_some()
    }

    /// The value at `idx`, or nil for an invalid index.
    pub fn get(&self, idx: isize) -> LuaValue {
        self.slot_of(idx).map(|s| self.slots[s].clone()).unwrap_or_default()
    }

    pub fn set(&mut self, idx: isize, val: LuaValue) -> LuaResult<()> {
        let slot = self.slot_of(idx).ok_or(LuaError::InvalidIndex(idx))?;
        self.slots[slot] = val;
        Ok(())
    }

    /// Raw slot access used by upvalue cells; slots past `top` read as nil.
    pub fn slot(&self, slot: usize) -> LuaValue {
        self.slots.get(slot).cloned().unwrap_or_default()
    }

    pub fn set_slot(&mut self, slot: usize, val: LuaValue) -> LuaResult<()> {
        let cell = self
            .slots
            .get_mut(slot)
            .ok_or(LuaError::InvalidIndex(slot as isize + 1))?;
        *cell = val;
        Ok(())
    }

    /// Reverse the slots `from..=to`.
    pub fn reverse(&mut self, from: usize, to: usize) {
        if from < to && to < self.slots.len() {
            self.slots[from..=to].reverse();
        }
    }

    /// The prototype of the Lua closure running in this frame.
    pub fn proto(&self) -> LuaResult<&Proto> {
        self.closure
            .as_deref()
            .and_then(Closure::proto)
            .ok_or_else(|| LuaError::Internal("frame is not running a Lua function".into()))
    }
}
