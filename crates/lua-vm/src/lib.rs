//! `lua-vm`: register-based virtual machine that executes decoded Lua 5.3 chunks.
//!
//! [`LuaState`] owns the registry and the call chain and exposes the stack
//! API shared by the dispatcher and embedding hosts:
//!
//! ```ignore
//! let mut ls = LuaState::new();
//! ls.register("print", |ls: &mut LuaState| { /* ... */ Ok(0) })?;
//! ls.load(&bytes, "chunk")?;
//! ls.call(0, 0)?;
//! ```

pub mod arith;
pub mod closure;
pub mod config;
mod dispatch;
pub mod stack;
pub mod state;
pub mod stdlib;
pub mod table;
pub mod value;

pub use arith::{ArithOp, CompareOp};
pub use closure::{Closure, FunctionKind, HostFunction, Upvalue, UpvalueCell};
pub use config::VmConfig;
pub use stack::LuaStack;
pub use state::{upvalue_index, LuaState, LUA_REGISTRYINDEX, LUA_RIDX_GLOBALS};
pub use table::{LuaTable, TableRef};
pub use value::{LuaType, LuaValue};
