//! The Lua state: registry, call chain and the stack API used by both the
//! dispatcher and embedding code.

mod access;
mod call;
mod ops;
mod stack_api;
mod table_api;
mod vm_api;

use lua_core::{LuaError, LuaResult};

use crate::closure::{Upvalue, UpvalueCell};
use crate::config::VmConfig;
use crate::stack::LuaStack;
use crate::stdlib;
use crate::table::{new_table, TableRef};
use crate::value::LuaValue;

/// Largest stack size the pseudo-index space is laid out around.
pub const LUAI_MAXSTACK: isize = 1_000_000;
/// Pseudo-index addressing the registry table.
pub const LUA_REGISTRYINDEX: isize = -LUAI_MAXSTACK - 1000;
/// Registry slot holding the globals table.
pub const LUA_RIDX_GLOBALS: i64 = 2;

/// Pseudo-index of upvalue `i` (1-based) of the running function.
pub const fn upvalue_index(i: isize) -> isize {
    LUA_REGISTRYINDEX - i
}

/// One VM instance. Owns its registry; independent instances do not share state.
#[derive(Debug)]
pub struct LuaState {
    registry: TableRef,
    /// The active frame.
    stack: LuaStack,
    /// Suspended frames, outermost first. The active frame's depth is `callers.len()`.
    callers: Vec<LuaStack>,
    /// Active `call` invocations on the native stack.
    nested_calls: usize,
    config: VmConfig,
}

impl LuaState {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        let registry = new_table(0, 0);
        let globals = new_table(0, 0);
        if config.open_base_library {
            stdlib::open_base(&mut globals.borrow_mut());
        }
        registry
            .borrow_mut()
            .set_int(LUA_RIDX_GLOBALS, LuaValue::Table(globals));
        let stack = LuaStack::new(config.min_stack, config.max_stack_size, None);
        Self {
            registry,
            stack,
            callers: Vec::new(),
            nested_calls: 0,
            config,
        }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Number of frames above the base frame.
    pub fn call_depth(&self) -> usize {
        self.callers.len()
    }

    pub(crate) fn globals(&self) -> LuaValue {
        self.registry.borrow().get_int(LUA_RIDX_GLOBALS)
    }

    // ── Call chain ────────────────────────────────────────────────────────────

    pub(crate) fn push_frame(&mut self, frame: LuaStack) -> LuaResult<()> {
        if self.callers.len() >= self.config.max_call_depth {
            return Err(LuaError::CallDepthExceeded(self.config.max_call_depth));
        }
        let caller = std::mem::replace(&mut self.stack, frame);
        self.callers.push(caller);
        Ok(())
    }

    /// Unlink the active frame, closing every upvalue still open on it.
    pub(crate) fn pop_frame(&mut self) -> LuaResult<LuaStack> {
        let caller = self
            .callers
            .pop()
            .ok_or_else(|| LuaError::Internal("pop of the base frame".into()))?;
        let mut frame = std::mem::replace(&mut self.stack, caller);
        for (slot, cell) in std::mem::take(&mut frame.open_upvalues) {
            *cell.borrow_mut() = Upvalue::Closed(frame.slot(slot));
        }
        Ok(frame)
    }

    fn frame_at(&self, depth: usize) -> LuaResult<&LuaStack> {
        if depth == self.callers.len() {
            Ok(&self.stack)
        } else {
            self.callers
                .get(depth)
                .ok_or_else(|| LuaError::Internal(format!("open upvalue on dead frame {depth}")))
        }
    }

    fn frame_at_mut(&mut self, depth: usize) -> LuaResult<&mut LuaStack> {
        if depth == self.callers.len() {
            Ok(&mut self.stack)
        } else {
            self.callers
                .get_mut(depth)
                .ok_or_else(|| LuaError::Internal(format!("open upvalue on dead frame {depth}")))
        }
    }

    // ── Upvalue cells ─────────────────────────────────────────────────────────

    fn read_upvalue(&self, cell: &UpvalueCell) -> LuaResult<LuaValue> {
        match &*cell.borrow() {
            Upvalue::Open { depth, slot } => Ok(self.frame_at(*depth)?.slot(*slot)),
            Upvalue::Closed(val) => Ok(val.clone()),
        }
    }

    fn write_upvalue(&mut self, cell: &UpvalueCell, val: LuaValue) -> LuaResult<()> {
        let open = match &*cell.borrow() {
            Upvalue::Open { depth, slot } => Some((*depth, *slot)),
            Upvalue::Closed(_) => None,
        };
        match open {
            Some((depth, slot)) => self.frame_at_mut(depth)?.set_slot(slot, val),
            None => {
                *cell.borrow_mut() = Upvalue::Closed(val);
                Ok(())
            }
        }
    }

    fn upvalue_cell(&self, idx: isize) -> Option<UpvalueCell> {
        let i = usize::try_from(LUA_REGISTRYINDEX - idx - 1).ok()?;
        self.stack.closure.as_ref()?.upvalues.get(i).cloned()
    }

    // ── Index resolution ──────────────────────────────────────────────────────

    /// The value at any acceptable index, pseudo-indices included.
    pub(crate) fn value_at(&self, idx: isize) -> LuaResult<LuaValue> {
        if idx == LUA_REGISTRYINDEX {
            return Ok(LuaValue::Table(self.registry.clone()));
        }
        if idx < LUA_REGISTRYINDEX {
            return match self.upvalue_cell(idx) {
                Some(cell) => self.read_upvalue(&cell),
                None => Ok(LuaValue::Nil),
            };
        }
        Ok(self.stack.get(idx))
    }

    pub(crate) fn set_value(&mut self, idx: isize, val: LuaValue) -> LuaResult<()> {
        if idx == LUA_REGISTRYINDEX {
            return match val {
                LuaValue::Table(t) => {
                    self.registry = t;
                    Ok(())
                }
                other => Err(LuaError::TypeError {
                    expected: "table",
                    got: other.type_name(),
                }),
            };
        }
        if idx < LUA_REGISTRYINDEX {
            return match self.upvalue_cell(idx) {
                Some(cell) => self.write_upvalue(&cell, val),
                None => Err(LuaError::InvalidIndex(idx)),
            };
        }
        self.stack.set(idx, val)
    }

    pub(crate) fn is_valid(&self, idx: isize) -> bool {
        if idx == LUA_REGISTRYINDEX {
            true
        } else if idx < LUA_REGISTRYINDEX {
            self.upvalue_cell(idx).is_some()
        } else {
            self.stack.is_valid(idx)
        }
    }
}

impl Default for LuaState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_holds_globals() {
        let mut ls = LuaState::new();
        ls.push_integer(LUA_RIDX_GLOBALS).unwrap();
        ls.get_table(LUA_REGISTRYINDEX).unwrap();
        ls.push_global_table().unwrap();
        assert!(ls.raw_equal(-1, -2));
    }

    #[test]
    fn instances_are_independent() {
        let mut a = LuaState::new();
        let mut b = LuaState::new();
        a.push_integer(1).unwrap();
        a.set_global("x").unwrap();
        assert_eq!(b.get_global("x").unwrap(), crate::LuaType::Nil);
        assert_eq!(a.get_global("x").unwrap(), crate::LuaType::Number);
    }

    #[test]
    fn base_library_is_optional() {
        let mut ls = LuaState::with_config(VmConfig {
            open_base_library: false,
            ..VmConfig::default()
        });
        assert_eq!(ls.get_global("print").unwrap(), crate::LuaType::Nil);
        let mut ls = LuaState::new();
        assert_eq!(ls.get_global("print").unwrap(), crate::LuaType::Function);
    }

    #[test]
    fn frame_depth_is_bounded() {
        let mut ls = LuaState::with_config(VmConfig {
            max_call_depth: 2,
            ..VmConfig::default()
        });
        ls.push_frame(LuaStack::new(1, 10, None)).unwrap();
        ls.push_frame(LuaStack::new(1, 10, None)).unwrap();
        assert_eq!(ls.push_frame(LuaStack::new(1, 10, None)), Err(LuaError::CallDepthExceeded(2)));
        ls.pop_frame().unwrap();
        ls.pop_frame().unwrap();
        assert!(ls.pop_frame().is_err());
    }
}
