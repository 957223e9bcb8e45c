use thiserror::Error;

/// Reasons a binary chunk is rejected by the decoder.
///
/// Decoding is all-or-nothing: any of these aborts the whole chunk.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChunkError {
    #[error("not a precompiled chunk (bad signature)")]
    BadSignature,

    #[error("version mismatch: expected {expected:#04x}, found {found:#04x}")]
    VersionMismatch { expected: u8, found: u8 },

    #[error("format mismatch: expected 0, found {0}")]
    FormatMismatch(u8),

    #[error("corrupted chunk (bad LUAC_DATA)")]
    Corrupted,

    #[error("{name} size mismatch: expected {expected}, found {found}")]
    SizeMismatch {
        name: &'static str,
        expected: u8,
        found: u8,
    },

    #[error("endianness mismatch")]
    EndiannessMismatch,

    #[error("float format mismatch")]
    FloatFormatMismatch,

    #[error("truncated chunk: need {needed} bytes at offset {offset}, {remaining} left")]
    Truncated {
        needed: usize,
        offset: usize,
        remaining: usize,
    },

    #[error("unknown constant tag: {0:#04x}")]
    UnknownConstantTag(u8),

    #[error("length {0} does not fit in the address space")]
    LengthOverflow(u64),

    #[error("prototypes nested deeper than {0} levels")]
    NestingTooDeep(usize),
}

/// All errors that can occur while loading or running a chunk.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LuaError {
    #[error(transparent)]
    Chunk(#[from] ChunkError),

    /// Wrong type used for an operation.
    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("attempt to perform arithmetic ({op}) on {lhs} and {rhs} values")]
    Arithmetic {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("attempt to compare {lhs} with {rhs}")]
    Comparison {
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("attempt to call a {0} value")]
    NotCallable(&'static str),

    #[error("attempt to index a {0} value")]
    NotIndexable(&'static str),

    #[error("attempt to concatenate a {0} value")]
    Concat(&'static str),

    #[error("attempt to get length of a {0} value")]
    Length(&'static str),

    #[error("number has no integer representation")]
    NoIntegerRepresentation,

    #[error("attempt to perform 'n{0}0'")]
    DivideByZero(&'static str),

    #[error("table index is nil")]
    NilIndex,

    #[error("table index is NaN")]
    NanIndex,

    #[error("invalid table key of type {0}")]
    InvalidKey(&'static str),

    #[error("stack overflow")]
    StackOverflow,

    #[error("stack underflow")]
    StackUnderflow,

    #[error("call chain deeper than {0} frames")]
    CallDepthExceeded(usize),

    #[error("host calls nested deeper than {0} levels")]
    NestedCallsExceeded(usize),

    #[error("invalid stack index {0}")]
    InvalidIndex(isize),

    #[error("invalid opcode {0}")]
    InvalidOpcode(u8),

    #[error("{0} cannot be executed here")]
    Unimplemented(&'static str),

    #[error("pc {pc} is past the end of {len} instructions")]
    PcOutOfRange { pc: usize, len: usize },

    /// Raised by the `error` base function and by other script-level faults.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// A VM bug rather than a script fault.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type LuaResult<T> = Result<T, LuaError>;
