//! `lua-core`: foundational types shared across the lua-rust workspace.
//!
//! This crate defines:
//! - [`LuaError`] and [`ChunkError`]: the unified error types
//! - [`Instruction`]: the packed 32-bit instruction word
//! - [`OpCode`] and the static [`OPCODE_INFO`] descriptor table
//! - [`Chunk`] / [`Proto`]: the prototype arena produced by the decoder

pub mod error;
pub mod instruction;
pub mod opcode;
pub mod proto;

pub use error::{ChunkError, LuaError, LuaResult};
pub use instruction::{fb2int, rk_constant, Instruction, BITRK, LFIELDS_PER_FLUSH, MAXARG_BX, MAXARG_SBX};
pub use opcode::{OpArgMode, OpCode, OpInfo, OpMode, OPCODE_INFO};
pub use proto::{Chunk, Constant, LocVar, Proto, ProtoId, UpvalueDesc};
