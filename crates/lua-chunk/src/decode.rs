//! Binary decoder: `&[u8]` → [`Chunk`].
//!
//! Mirrors the encoding in `encode.rs` exactly.

use std::rc::Rc;

use lua_core::{Chunk, ChunkError, Constant, Instruction, LocVar, Proto, ProtoId, UpvalueDesc};

use crate::header::*;

/// Deepest prototype nesting accepted before the chunk is rejected.
pub const MAX_NESTING: usize = 200;

// ── Cursor reader ─────────────────────────────────────────────────────────────

pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ChunkError> {
        if self.remaining() < n {
            return Err(ChunkError::Truncated {
                needed: n,
                offset: self.pos,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ChunkError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_byte(&mut self) -> Result<u8, ChunkError> {
        Ok(self.read_bytes(1)?[0])
    }

    /// A C `int`.
    pub fn read_u32(&mut self) -> Result<u32, ChunkError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// A C `size_t`.
    pub fn read_u64(&mut self) -> Result<u64, ChunkError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_lua_integer(&mut self) -> Result<i64, ChunkError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_lua_number(&mut self) -> Result<f64, ChunkError> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// A length-prefixed string. A zero length byte yields an empty string.
    pub fn read_string(&mut self) -> Result<&'a [u8], ChunkError> {
        let mut size = self.read_byte()? as u64;
        if size == LONG_LENGTH_MARKER as u64 {
            size = self.read_u64()?;
        }
        if size == 0 {
            return Ok(&[]);
        }
        let len = usize::try_from(size - 1).map_err(|_| ChunkError::LengthOverflow(size))?;
        self.read_bytes(len)
    }

    /// An element count, capped for preallocation by what is left in the buffer.
    fn read_count(&mut self) -> Result<(usize, usize), ChunkError> {
        let n = self.read_u32()? as usize;
        Ok((n, n.min(self.remaining())))
    }

    pub fn check_header(&mut self) -> Result<(), ChunkError> {
        if self.read_bytes(4)? != LUA_SIGNATURE {
            return Err(ChunkError::BadSignature);
        }
        let version = self.read_byte()?;
        if version != LUAC_VERSION {
            return Err(ChunkError::VersionMismatch {
                expected: LUAC_VERSION,
                found: version,
            });
        }
        let format = self.read_byte()?;
        if format != LUAC_FORMAT {
            return Err(ChunkError::FormatMismatch(format));
        }
        if self.read_bytes(6)? != LUAC_DATA {
            return Err(ChunkError::Corrupted);
        }
        for (name, expected) in SIZES {
            let found = self.read_byte()?;
            if found != expected {
                return Err(ChunkError::SizeMismatch {
                    name,
                    expected,
                    found,
                });
            }
        }
        if self.read_lua_integer()? != LUAC_INT {
            return Err(ChunkError::EndiannessMismatch);
        }
        if self.read_lua_number()? != LUAC_NUM {
            return Err(ChunkError::FloatFormatMismatch);
        }
        Ok(())
    }

    fn read_constant(&mut self) -> Result<Constant, ChunkError> {
        let tag = self.read_byte()?;
        match tag {
            TAG_NIL => Ok(Constant::Nil),
            TAG_BOOLEAN => Ok(Constant::Boolean(self.read_byte()? != 0)),
            TAG_INTEGER => Ok(Constant::Integer(self.read_lua_integer()?)),
            TAG_NUMBER => Ok(Constant::Float(self.read_lua_number()?)),
            TAG_SHORT_STR | TAG_LONG_STR => Ok(Constant::String(Rc::from(self.read_string()?))),
            t => Err(ChunkError::UnknownConstantTag(t)),
        }
    }

    fn read_text(&mut self) -> Result<String, ChunkError> {
        Ok(String::from_utf8_lossy(self.read_string()?).into_owned())
    }

    // ── Proto decoder ─────────────────────────────────────────────────────────

    fn read_proto(
        &mut self,
        chunk: &mut Chunk,
        parent: Option<ProtoId>,
        parent_source: &str,
        depth: usize,
    ) -> Result<ProtoId, ChunkError> {
        if depth > MAX_NESTING {
            return Err(ChunkError::NestingTooDeep(MAX_NESTING));
        }

        let source = match self.read_string()? {
            [] => parent_source.to_owned(),
            bytes => String::from_utf8_lossy(bytes).into_owned(),
        };
        let line_defined = self.read_u32()?;
        let last_line_defined = self.read_u32()?;
        let num_params = self.read_byte()?;
        let is_vararg = self.read_byte()? != 0;
        let max_stack_size = self.read_byte()?;

        let (n, cap) = self.read_count()?;
        let mut code = Vec::with_capacity(cap);
        for _ in 0..n {
            code.push(Instruction(self.read_u32()?));
        }

        let (n, cap) = self.read_count()?;
        let mut constants = Vec::with_capacity(cap);
        for _ in 0..n {
            constants.push(self.read_constant()?);
        }

        let (n, cap) = self.read_count()?;
        let mut upvalues = Vec::with_capacity(cap);
        for _ in 0..n {
            let in_stack = self.read_byte()?;
            let idx = self.read_byte()?;
            upvalues.push(if in_stack != 0 {
                UpvalueDesc::Stack(idx)
            } else {
                UpvalueDesc::Upvalue(idx)
            });
        }

        // Reserve this prototype's slot before its children so parents precede them.
        let id = chunk.push(Proto {
            parent,
            source,
            line_defined,
            last_line_defined,
            num_params,
            is_vararg,
            max_stack_size,
            code,
            constants,
            upvalues,
            ..Proto::new("")
        });

        let (n, cap) = self.read_count()?;
        let mut protos = Vec::with_capacity(cap);
        let own_source = chunk[id].source.clone();
        for _ in 0..n {
            protos.push(self.read_proto(chunk, Some(id), &own_source, depth + 1)?);
        }

        let (n, cap) = self.read_count()?;
        let mut line_info = Vec::with_capacity(cap);
        for _ in 0..n {
            line_info.push(self.read_u32()?);
        }

        let (n, cap) = self.read_count()?;
        let mut loc_vars = Vec::with_capacity(cap);
        for _ in 0..n {
            loc_vars.push(LocVar {
                name: self.read_text()?,
                start_pc: self.read_u32()?,
                end_pc: self.read_u32()?,
            });
        }

        let (n, cap) = self.read_count()?;
        let mut upvalue_names = Vec::with_capacity(cap);
        for _ in 0..n {
            upvalue_names.push(self.read_text()?);
        }

        let proto = &mut chunk[id];
        proto.protos = protos;
        proto.line_info = line_info;
        proto.loc_vars = loc_vars;
        proto.upvalue_names = upvalue_names;
        Ok(id)
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decode a Lua 5.3 binary chunk into its prototype arena.
///
/// The header is validated field by field; any mismatch or truncation rejects
/// the whole chunk.
pub fn undump(bytes: &[u8]) -> Result<Chunk, ChunkError> {
    let mut r = Reader::new(bytes);
    r.check_header()?;
    // size_upvalues of the main closure; the prototype carries the same count.
    r.read_byte()?;
    let mut chunk = Chunk::new();
    r.read_proto(&mut chunk, None, "", 0)?;
    log::debug!(
        "decoded chunk {:?}: {} prototypes",
        chunk[ProtoId::ROOT].source,
        chunk.len()
    );
    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(LUA_SIGNATURE);
        buf.push(LUAC_VERSION);
        buf.push(LUAC_FORMAT);
        buf.extend_from_slice(LUAC_DATA);
        buf.extend_from_slice(&[4, 8, 4, 8, 8]);
        buf.extend_from_slice(&LUAC_INT.to_le_bytes());
        buf.extend_from_slice(&LUAC_NUM.to_le_bytes());
        buf
    }

    /// A `return` chunk as luac 5.3 emits it for an empty file named `empty.lua`.
    fn empty_main() -> Vec<u8> {
        let mut buf = header();
        buf.push(1); // size_upvalues
        buf.push(b"@empty.lua".len() as u8 + 1);
        buf.extend_from_slice(b"@empty.lua");
        buf.extend_from_slice(&0u32.to_le_bytes()); // line_defined
        buf.extend_from_slice(&0u32.to_le_bytes()); // last_line_defined
        buf.extend_from_slice(&[0, 1, 2]); // params, vararg, max stack
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&0x0080_0026u32.to_le_bytes()); // RETURN 0 1
        buf.extend_from_slice(&0u32.to_le_bytes()); // constants
        buf.extend_from_slice(&1u32.to_le_bytes()); // upvalues
        buf.extend_from_slice(&[1, 0]);
        buf.extend_from_slice(&0u32.to_le_bytes()); // protos
        buf.extend_from_slice(&1u32.to_le_bytes()); // line info
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes()); // locals
        buf.extend_from_slice(&1u32.to_le_bytes()); // upvalue names
        buf.push(5);
        buf.extend_from_slice(b"_ENV");
        buf
    }

    #[test]
    fn reader_bytes_and_bounds() {
        let mut r = Reader::new(&[65, 66]);
        assert_eq!(r.read_byte(), Ok(65));
        assert_eq!(r.read_byte(), Ok(66));
        assert!(matches!(r.read_byte(), Err(ChunkError::Truncated { needed: 1, .. })));
    }

    #[test]
    fn reader_integers() {
        let bytes = [0xF0, 0xDE, 0xBC, 0x9A, 0x78, 0x56, 0x34, 0x12];
        assert_eq!(Reader::new(&bytes).read_lua_integer(), Ok(0x1234_5678_9ABC_DEF0));
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_u32(), Ok(0x9ABC_DEF0));
        assert_eq!(r.read_u32(), Ok(0x1234_5678));
        assert!(Reader::new(&bytes[..7]).read_lua_integer().is_err());
    }

    #[test]
    fn reader_floats() {
        let mut bytes = 990.232f64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&23.333f64.to_le_bytes());
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_lua_number(), Ok(990.232));
        assert_eq!(r.read_lua_number(), Ok(23.333));
        assert!(r.read_lua_number().is_err());
    }

    #[test]
    fn reader_strings() {
        let mut r = Reader::new(&[0, 3, b'h', b'i', 2]);
        assert_eq!(r.read_string(), Ok(&b""[..]));
        assert_eq!(r.read_string(), Ok(&b"hi"[..]));
        assert!(matches!(r.read_string(), Err(ChunkError::Truncated { .. })));

        let mut long = vec![0xFF];
        long.extend_from_slice(&4u64.to_le_bytes());
        long.extend_from_slice(b"abc");
        assert_eq!(Reader::new(&long).read_string(), Ok(&b"abc"[..]));
    }

    #[test]
    fn decodes_minimal_chunk() {
        let chunk = undump(&empty_main()).unwrap();
        assert_eq!(chunk.len(), 1);
        let main = chunk.root().unwrap();
        assert_eq!(main.source, "@empty.lua");
        assert!(main.is_vararg);
        assert_eq!(main.max_stack_size, 2);
        assert_eq!(main.code, vec![Instruction(0x0080_0026)]);
        assert_eq!(main.upvalues, vec![UpvalueDesc::Stack(0)]);
        assert_eq!(main.line_info, vec![1]);
        assert_eq!(main.upvalue_names, vec!["_ENV".to_string()]);
    }

    #[test]
    fn header_errors_are_distinct() {
        let good = empty_main();
        let corrupt = |at: usize, byte: u8| {
            let mut b = good.clone();
            b[at] = byte;
            undump(&b)
        };
        assert_eq!(corrupt(0, 0), Err(ChunkError::BadSignature));
        assert_eq!(
            corrupt(4, 0x52),
            Err(ChunkError::VersionMismatch { expected: 0x53, found: 0x52 })
        );
        assert_eq!(corrupt(5, 1), Err(ChunkError::FormatMismatch(1)));
        assert_eq!(corrupt(7, 0), Err(ChunkError::Corrupted));
        assert_eq!(
            corrupt(12, 8),
            Err(ChunkError::SizeMismatch { name: "int", expected: 4, found: 8 })
        );
        assert_eq!(
            corrupt(14, 8),
            Err(ChunkError::SizeMismatch { name: "instruction", expected: 4, found: 8 })
        );
        assert_eq!(corrupt(17, 0x56), Err(ChunkError::EndiannessMismatch));
        assert_eq!(corrupt(25, 0x40), Err(ChunkError::FloatFormatMismatch));
    }

    #[test]
    fn truncation_anywhere_fails() {
        let good = empty_main();
        for len in 0..good.len() {
            assert!(undump(&good[..len]).is_err(), "prefix of {len} bytes decoded");
        }
    }

    #[test]
    fn unknown_constant_tag() {
        let mut r = Reader::new(&[0x07]);
        assert_eq!(r.read_constant(), Err(ChunkError::UnknownConstantTag(7)));
    }
}
