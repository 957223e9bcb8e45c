use std::rc::Rc;

use lua_core::{Chunk, LuaError, LuaResult, ProtoId};

use super::LuaState;
use crate::closure::{Closure, FunctionKind, HostFunction, Upvalue};
use crate::dispatch;
use crate::stack::LuaStack;
use crate::value::LuaValue;

impl LuaState {
    /// Decode a binary chunk and push its main function.
    ///
    /// The main function's first upvalue is bound to the globals table.
    pub fn load(&mut self, bytes: &[u8], chunk_name: &str) -> LuaResult<()> {
        let chunk = lua_chunk::undump(bytes)?;
        log::debug!("loaded {chunk_name} ({} bytes)", bytes.len());
        self.load_chunk(Rc::new(chunk))
    }

    /// Push the main function of an already decoded chunk.
    pub fn load_chunk(&mut self, chunk: Rc<Chunk>) -> LuaResult<()> {
        let root = chunk
            .root()
            .ok_or_else(|| LuaError::Internal("chunk has no main function".into()))?;
        let globals = self.globals();
        let upvalues = (0..root.upvalues.len())
            .map(|i| Upvalue::closed(if i == 0 { globals.clone() } else { LuaValue::Nil }))
            .collect();
        let closure = Closure::lua(chunk, ProtoId::ROOT, upvalues);
        self.stack.push(LuaValue::Function(Rc::new(closure)))
    }

    /// Call the function sitting below the top `nargs` values.
    ///
    /// Function and arguments are popped; `nresults` results are pushed,
    /// truncated or padded with nil. A negative `nresults` keeps them all.
    ///
    /// Lua-to-Lua calls made by the running code do not nest here; only host
    /// re-entry does, and it is bounded by `max_nested_calls`.
    pub fn call(&mut self, nargs: usize, nresults: isize) -> LuaResult<()> {
        if self.nested_calls >= self.config.max_nested_calls {
            return Err(LuaError::NestedCallsExceeded(self.config.max_nested_calls));
        }
        self.nested_calls += 1;
        let outcome = self.call_value(nargs, nresults);
        self.nested_calls -= 1;
        outcome
    }

    fn call_value(&mut self, nargs: usize, nresults: isize) -> LuaResult<()> {
        let closure = self.callee(nargs)?;
        match closure.kind.clone() {
            FunctionKind::Lua { .. } => {
                self.enter_lua_closure(nargs, nresults, closure)?;
                match dispatch::run(self) {
                    Ok(()) => self.post_call(),
                    Err(err) => {
                        self.pop_frame()?;
                        Err(err)
                    }
                }
            }
            FunctionKind::Host(f) => self.call_host_closure(nargs, nresults, closure, f),
        }
    }

    /// Start the call issued by a CALL or TFORCALL instruction.
    ///
    /// A Lua callee becomes the active frame and `true` is returned; the
    /// dispatcher finishes the call when that frame returns. A host callee runs
    /// to completion and `false` is returned.
    pub(crate) fn pre_call(&mut self, nargs: usize, nresults: isize) -> LuaResult<bool> {
        let closure = self.callee(nargs)?;
        match closure.kind.clone() {
            FunctionKind::Lua { .. } => {
                self.enter_lua_closure(nargs, nresults, closure)?;
                Ok(true)
            }
            FunctionKind::Host(f) => {
                self.call_host_closure(nargs, nresults, closure, f)?;
                Ok(false)
            }
        }
    }

    /// Replace the active frame with a call to the function below the top
    /// `nargs` values, keeping the replaced frame's expected result count.
    ///
    /// A host callee runs as a regular call keeping every result; `false` is
    /// returned and the RETURN that follows hands them on.
    pub(crate) fn tail_call(&mut self, nargs: usize) -> LuaResult<bool> {
        let closure = self.callee(nargs)?;
        let host = match &closure.kind {
            FunctionKind::Host(f) => Some(f.clone()),
            FunctionKind::Lua { .. } => None,
        };
        if let Some(f) = host {
            self.call_host_closure(nargs, -1, closure, f)?;
            return Ok(false);
        }

        let mut args = self.stack.pop_n(nargs + 1)?;
        args.remove(0);
        let nresults = self.stack.nresults;
        self.pop_frame()?;
        let frame = self.new_lua_frame(closure, args, nresults)?;
        self.push_frame(frame)?;
        Ok(true)
    }

    /// Pop the returning Lua frame and hand its results to the caller.
    pub(crate) fn post_call(&mut self) -> LuaResult<()> {
        let mut frame = self.pop_frame()?;
        let nregs = {
            let p = frame.proto()?;
            log::debug!("return {}<{},{}>", p.source, p.line_defined, p.last_line_defined);
            p.max_stack_size as usize
        };
        if frame.nresults != 0 {
            let returned = frame.top().saturating_sub(nregs);
            let results = frame.pop_n(returned)?;
            self.push_results(results, frame.nresults)?;
        }
        Ok(())
    }

    fn callee(&self, nargs: usize) -> LuaResult<Rc<Closure>> {
        match self.stack.get(-(nargs as isize + 1)) {
            LuaValue::Function(c) => Ok(c),
            other => Err(LuaError::NotCallable(other.type_name())),
        }
    }

    fn enter_lua_closure(&mut self, nargs: usize, nresults: isize, closure: Rc<Closure>) -> LuaResult<()> {
        let mut args = self.stack.pop_n(nargs + 1)?;
        args.remove(0);
        let frame = self.new_lua_frame(closure, args, nresults)?;
        self.push_frame(frame)
    }

    /// A fresh frame for `closure` with its fixed parameters in place and any
    /// extra arguments kept as varargs.
    fn new_lua_frame(&self, closure: Rc<Closure>, args: Vec<LuaValue>, nresults: isize) -> LuaResult<LuaStack> {
        let p = closure
            .proto()
            .ok_or_else(|| LuaError::Internal("missing prototype".into()))?;
        let nregs = p.max_stack_size as usize;
        let nparams = p.num_params as usize;
        let is_vararg = p.is_vararg;
        log::debug!("call {}<{},{}>", p.source, p.line_defined, p.last_line_defined);

        let mut frame = LuaStack::new(
            nregs + self.config.frame_headroom,
            self.config.max_stack_size,
            Some(closure),
        );
        if args.len() > nparams && is_vararg {
            frame.varargs = args[nparams..].to_vec();
        }
        frame.push_n(args, nparams as isize)?;
        frame.top = nregs;
        frame.nresults = nresults;
        Ok(frame)
    }

    fn call_host_closure(
        &mut self,
        nargs: usize,
        nresults: isize,
        closure: Rc<Closure>,
        f: HostFunction,
    ) -> LuaResult<()> {
        let mut frame = LuaStack::new(
            nargs + self.config.min_stack,
            self.config.max_stack_size,
            Some(closure),
        );
        let args = self.stack.pop_n(nargs)?;
        frame.push_n(args, nargs as isize)?;
        self.stack.pop()?;

        self.push_frame(frame)?;
        let outcome = f(self);
        let mut frame = self.pop_frame()?;
        let n = outcome?;

        if nresults != 0 {
            let results = frame.pop_n(n)?;
            self.push_results(results, nresults)?;
        }
        Ok(())
    }

    fn push_results(&mut self, results: Vec<LuaValue>, nresults: isize) -> LuaResult<()> {
        let n = usize::try_from(nresults).unwrap_or(results.len());
        self.stack.check(n)?;
        self.stack.push_n(results, nresults)
    }
}
