use lua_core::{LuaError, LuaResult};

use super::{LuaState, LUA_REGISTRYINDEX, LUA_RIDX_GLOBALS};
use crate::table::new_table;
use crate::value::{LuaType, LuaValue};

// ── Table access ──────────────────────────────────────────────────────────────

fn index(t: &LuaValue, key: &LuaValue) -> LuaResult<LuaValue> {
    match t {
        LuaValue::Table(tbl) => Ok(tbl.borrow().get(key)),
        other => Err(LuaError::NotIndexable(other.type_name())),
    }
}

fn new_index(t: &LuaValue, key: LuaValue, val: LuaValue) -> LuaResult<()> {
    match t {
        LuaValue::Table(tbl) => tbl.borrow_mut().put(key, val),
        other => Err(LuaError::NotIndexable(other.type_name())),
    }
}

impl LuaState {
    pub fn new_table(&mut self) -> LuaResult<()> {
        self.create_table(0, 0)
    }

    /// Push a table preallocated for `narr` array and `nrec` hash entries.
    pub fn create_table(&mut self, narr: usize, nrec: usize) -> LuaResult<()> {
        self.stack.push(LuaValue::Table(new_table(narr, nrec)))
    }

    /// Pop a key and push `t[key]`, where `t` is the value at `idx`.
    pub fn get_table(&mut self, idx: isize) -> LuaResult<LuaType> {
        let t = self.value_at(idx)?;
        let key = self.stack.pop()?;
        self.push_index(&t, &key)
    }

    pub fn get_field(&mut self, idx: isize, k: &str) -> LuaResult<LuaType> {
        let t = self.value_at(idx)?;
        self.push_index(&t, &LuaValue::from(k))
    }

    pub fn get_i(&mut self, idx: isize, i: i64) -> LuaResult<LuaType> {
        let t = self.value_at(idx)?;
        self.push_index(&t, &LuaValue::Integer(i))
    }

    fn push_index(&mut self, t: &LuaValue, key: &LuaValue) -> LuaResult<LuaType> {
        let val = index(t, key)?;
        let tp = val.type_of();
        self.stack.push(val)?;
        Ok(tp)
    }

    /// Pop a value and a key and store `t[key] = value`.
    pub fn set_table(&mut self, idx: isize) -> LuaResult<()> {
        let t = self.value_at(idx)?;
        let val = self.stack.pop()?;
        let key = self.stack.pop()?;
        new_index(&t, key, val)
    }

    pub fn set_field(&mut self, idx: isize, k: &str) -> LuaResult<()> {
        let t = self.value_at(idx)?;
        let val = self.stack.pop()?;
        new_index(&t, LuaValue::from(k), val)
    }

    pub fn set_i(&mut self, idx: isize, i: i64) -> LuaResult<()> {
        let t = self.value_at(idx)?;
        let val = self.stack.pop()?;
        new_index(&t, LuaValue::Integer(i), val)
    }

    /// Length without conversions: bytes of a string, array border of a table.
    pub fn raw_len(&self, idx: isize) -> usize {
        match self.value_at(idx) {
            Ok(LuaValue::String(s)) => s.len(),
            Ok(LuaValue::Table(t)) => t.borrow().length(),
            _ => 0,
        }
    }

    /// Pop a key and push the next key-value pair of the table at `idx`.
    /// Returns `false`, pushing nothing, when the traversal is over.
    pub fn next(&mut self, idx: isize) -> LuaResult<bool> {
        let t = match self.value_at(idx)? {
            LuaValue::Table(t) => t,
            other => {
                return Err(LuaError::TypeError {
                    expected: "table",
                    got: other.type_name(),
                })
            }
        };
        let key = self.stack.pop()?;
        let entry = t.borrow_mut().next(&key)?;
        match entry {
            Some((k, v)) => {
                self.stack.push(k)?;
                self.stack.push(v)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ── Globals ───────────────────────────────────────────────────────────────

    pub fn push_global_table(&mut self) -> LuaResult<()> {
        self.get_i(LUA_REGISTRYINDEX, LUA_RIDX_GLOBALS).map(|_| ())
    }

    pub fn get_global(&mut self, name: &str) -> LuaResult<LuaType> {
        let globals = self.globals();
        self.push_index(&globals, &LuaValue::from(name))
    }

    /// Pop a value into the global `name`.
    pub fn set_global(&mut self, name: &str) -> LuaResult<()> {
        let globals = self.globals();
        let val = self.stack.pop()?;
        new_index(&globals, LuaValue::from(name), val)
    }

    /// Expose a host function to scripts as the global `name`.
    pub fn register<F>(&mut self, name: &str, f: F) -> LuaResult<()>
    where
        F: Fn(&mut LuaState) -> LuaResult<usize> + 'static,
    {
        self.push_host_function(f)?;
        self.set_global(name)
    }
}
