//! Fixed fields of the Lua 5.3 binary chunk header.

pub const LUA_SIGNATURE: &[u8; 4] = b"\x1bLua";
pub const LUAC_VERSION: u8 = 0x53;
pub const LUAC_FORMAT: u8 = 0;
pub const LUAC_DATA: &[u8; 6] = b"\x19\x93\r\n\x1a\n";
pub const CINT_SIZE: u8 = 4;
pub const CSIZET_SIZE: u8 = 8;
pub const INSTRUCTION_SIZE: u8 = 4;
pub const LUA_INTEGER_SIZE: u8 = 8;
pub const LUA_NUMBER_SIZE: u8 = 8;
pub const LUAC_INT: i64 = 0x5678;
pub const LUAC_NUM: f64 = 370.5;

/// Size declarations in header order, with the name used in mismatch errors.
pub const SIZES: [(&str, u8); 5] = [
    ("int", CINT_SIZE),
    ("size_t", CSIZET_SIZE),
    ("instruction", INSTRUCTION_SIZE),
    ("lua integer", LUA_INTEGER_SIZE),
    ("lua number", LUA_NUMBER_SIZE),
];

// Constant tags.
pub const TAG_NIL: u8 = 0x00;
pub const TAG_BOOLEAN: u8 = 0x01;
pub const TAG_NUMBER: u8 = 0x03;
pub const TAG_INTEGER: u8 = 0x13;
pub const TAG_SHORT_STR: u8 = 0x04;
pub const TAG_LONG_STR: u8 = 0x14;

/// Longest string stored with the short-string tag.
pub const MAX_SHORT_LEN: usize = 40;

/// Strings at or above this length (plus one) use the 8-byte length form.
pub const LONG_LENGTH_MARKER: u8 = 0xFF;
