//! Closure and upvalue types.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use lua_core::{Chunk, LuaResult, Proto, ProtoId};

use crate::state::LuaState;
use crate::value::LuaValue;

/// A function implemented in Rust. Arguments sit at the bottom of its own
/// frame; it returns how many values it pushed as results.
pub type HostFunction = Rc<dyn Fn(&mut LuaState) -> LuaResult<usize>>;

// ── Upvalue cells ─────────────────────────────────────────────────────────────

/// A shared, mutable upvalue cell.
pub type UpvalueCell = Rc<RefCell<Upvalue>>;

/// Interior state of an upvalue cell.
///
/// While the captured local is still on the stack (`Open`), the cell names the
/// frame (by call-chain depth) and register slot holding it. When that frame
/// is destroyed, or a jump leaves the local's scope, the runtime copies the
/// value into the cell (`Closed`).
#[derive(Debug, Clone)]
pub enum Upvalue {
    Open { depth: usize, slot: usize },
    Closed(LuaValue),
}

impl Upvalue {
    pub fn closed(val: LuaValue) -> UpvalueCell {
        Rc::new(RefCell::new(Upvalue::Closed(val)))
    }

    pub fn open(depth: usize, slot: usize) -> UpvalueCell {
        Rc::new(RefCell::new(Upvalue::Open { depth, slot }))
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Upvalue::Open { .. })
    }
}

// ── Closures ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub enum FunctionKind {
    /// A prototype inside a decoded chunk.
    Lua { chunk: Rc<Chunk>, proto: ProtoId },
    Host(HostFunction),
}

/// A runtime closure: a prototype or host function paired with its upvalue cells.
#[derive(Clone)]
pub struct Closure {
    pub kind: FunctionKind,
    /// One cell per upvalue descriptor (Lua) or per captured value (host).
    pub upvalues: Vec<UpvalueCell>,
}

impl Closure {
    pub fn lua(chunk: Rc<Chunk>, proto: ProtoId, upvalues: Vec<UpvalueCell>) -> Self {
        Self {
            kind: FunctionKind::Lua { chunk, proto },
            upvalues,
        }
    }

    pub fn host(f: HostFunction, upvalues: Vec<UpvalueCell>) -> Self {
        Self {
            kind: FunctionKind::Host(f),
            upvalues,
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self.kind, FunctionKind::Host(_))
    }

    /// The prototype of a Lua closure.
    pub fn proto(&self) -> Option<&Proto> {
        match &self.kind {
            FunctionKind::Lua { chunk, proto } => chunk.get(*proto),
            FunctionKind::Host(_) => None,
        }
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FunctionKind::Lua { proto, .. } => f
                .debug_struct("Closure")
                .field("proto", proto)
                .field("upvalues", &self.upvalues.len())
                .finish(),
            FunctionKind::Host(_) => f
                .debug_struct("Closure")
                .field("host", &true)
                .field("upvalues", &self.upvalues.len())
                .finish(),
        }
    }
}
