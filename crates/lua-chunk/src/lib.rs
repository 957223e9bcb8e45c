//! Reading and writing Lua 5.3 precompiled chunks.
//!
//! [`undump`] turns the bytes of a `.luac` file into a [`lua_core::Chunk`];
//! [`dump`] goes the other way. [`ProtoBuilder`] assembles chunks in code.

pub mod builder;
pub mod decode;
pub mod encode;
pub mod header;

pub use builder::ProtoBuilder;
pub use decode::{undump, Reader, MAX_NESTING};
pub use encode::dump;
