use std::rc::Rc;

use lua_core::{Instruction, LuaError, LuaResult, UpvalueDesc};

use super::LuaState;
use crate::closure::{Closure, FunctionKind, Upvalue, UpvalueCell};
use crate::value::LuaValue;

// ── Dispatcher-facing operations ──────────────────────────────────────────────

impl LuaState {
    pub fn pc(&self) -> usize {
        self.stack.pc
    }

    pub fn add_pc(&mut self, n: isize) {
        self.stack.pc = self.stack.pc.wrapping_add_signed(n);
    }

    /// Read the instruction at the program counter and advance past it.
    pub fn fetch(&mut self) -> LuaResult<Instruction> {
        let ins = self.instruction(self.stack.pc)?;
        self.stack.pc += 1;
        Ok(ins)
    }

    /// The instruction at `pc` of the running function.
    pub fn instruction(&self, pc: usize) -> LuaResult<Instruction> {
        let code = &self.stack.proto()?.code;
        code.get(pc)
            .copied()
            .ok_or(LuaError::PcOutOfRange { pc, len: code.len() })
    }

    /// Push constant `idx` of the running function.
    pub fn get_const(&mut self, idx: usize) -> LuaResult<()> {
        let proto = self.stack.proto()?;
        let val = proto
            .constants
            .get(idx)
            .map(LuaValue::from)
            .ok_or_else(|| LuaError::Internal(format!("constant {idx} out of range")))?;
        self.stack.push(val)
    }

    /// Push an RK operand: a constant when the high bit is set, else a register.
    pub fn get_rk(&mut self, rk: usize) -> LuaResult<()> {
        if rk > 0xFF {
            self.get_const(rk & 0xFF)
        } else {
            self.push_value(rk as isize + 1)
        }
    }

    /// Registers declared by the running function.
    pub fn register_count(&self) -> LuaResult<usize> {
        Ok(self.stack.proto()?.max_stack_size as usize)
    }

    /// Push `n` varargs, padding with nil; a negative `n` pushes them all.
    pub fn load_vararg(&mut self, n: isize) -> LuaResult<()> {
        let varargs = self.stack.varargs.clone();
        let count = usize::try_from(n).unwrap_or(varargs.len());
        self.stack.check(count)?;
        self.stack.push_n(varargs, n)
    }

    /// Instantiate nested prototype `idx` as a closure and push it.
    pub fn load_proto(&mut self, idx: usize) -> LuaResult<()> {
        let parent = self
            .stack
            .closure
            .clone()
            .ok_or_else(|| LuaError::Internal("CLOSURE outside a Lua function".into()))?;
        let FunctionKind::Lua { chunk, proto } = &parent.kind else {
            return Err(LuaError::Internal("CLOSURE inside a host function".into()));
        };
        let missing = || LuaError::Internal(format!("nested prototype {idx} out of range"));
        let child = *chunk
            .get(*proto)
            .and_then(|p| p.protos.get(idx))
            .ok_or_else(missing)?;
        let descs = &chunk.get(child).ok_or_else(missing)?.upvalues;

        let depth = self.callers.len();
        let upvalues = descs
            .iter()
            .map(|desc| match *desc {
                UpvalueDesc::Stack(reg) => Ok(self.capture(depth, reg as usize)),
                UpvalueDesc::Upvalue(i) => parent
                    .upvalues
                    .get(i as usize)
                    .cloned()
                    .ok_or_else(|| LuaError::Internal(format!("upvalue {i} out of range"))),
            })
            .collect::<LuaResult<Vec<_>>>()?;

        let closure = Closure::lua(chunk.clone(), child, upvalues);
        self.stack.push(LuaValue::Function(Rc::new(closure)))
    }

    /// The open cell for register `slot` of the active frame, created on first capture.
    fn capture(&mut self, depth: usize, slot: usize) -> UpvalueCell {
        self.stack
            .open_upvalues
            .entry(slot)
            .or_insert_with(|| Upvalue::open(depth, slot))
            .clone()
    }

    /// Close open upvalues of the active frame at registers `a - 1` and above.
    pub fn close_upvalues(&mut self, a: usize) {
        let from = a.saturating_sub(1);
        let stack = &mut self.stack;
        let closing: Vec<usize> = stack.open_upvalues.keys().copied().filter(|&slot| slot >= from).collect();
        for slot in closing {
            if let Some(cell) = stack.open_upvalues.remove(&slot) {
                *cell.borrow_mut() = Upvalue::Closed(stack.slot(slot));
            }
        }
    }
}
