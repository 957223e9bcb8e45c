//! Binary encoder: [`Chunk`] → `Vec<u8>`.
//!
//! Produces the same layout `luac -o` writes on a little-endian 64-bit host.

use lua_core::{Chunk, Constant, Proto, ProtoId};

use crate::header::*;

// ── Low-level write helpers ────────────────────────────────────────────────

fn push_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

fn push_u32_le(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_u64_le(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_i64_le(buf: &mut Vec<u8>, v: i64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_f64_le(buf: &mut Vec<u8>, v: f64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_len(buf: &mut Vec<u8>, n: usize) {
    push_u32_le(buf, n as u32);
}

/// Strings are stored with their length plus one; zero is the absent string.
fn push_str(buf: &mut Vec<u8>, bytes: &[u8]) {
    let size = bytes.len() as u64 + 1;
    if size < LONG_LENGTH_MARKER as u64 {
        push_u8(buf, size as u8);
    } else {
        push_u8(buf, LONG_LENGTH_MARKER);
        push_u64_le(buf, size);
    }
    buf.extend_from_slice(bytes);
}

fn push_absent_str(buf: &mut Vec<u8>) {
    push_u8(buf, 0);
}

fn push_header(buf: &mut Vec<u8>) {
    buf.extend_from_slice(LUA_SIGNATURE);
    push_u8(buf, LUAC_VERSION);
    push_u8(buf, LUAC_FORMAT);
    buf.extend_from_slice(LUAC_DATA);
    for (_, size) in SIZES {
        push_u8(buf, size);
    }
    push_i64_le(buf, LUAC_INT);
    push_f64_le(buf, LUAC_NUM);
}

// ── Proto encoder ──────────────────────────────────────────────────────────

fn encode_proto(chunk: &Chunk, id: ProtoId, parent_source: Option<&str>, strip: bool, buf: &mut Vec<u8>) {
    let proto = &chunk[id];

    if strip || parent_source == Some(proto.source.as_str()) {
        push_absent_str(buf);
    } else {
        push_str(buf, proto.source.as_bytes());
    }
    push_u32_le(buf, proto.line_defined);
    push_u32_le(buf, proto.last_line_defined);
    push_u8(buf, proto.num_params);
    push_u8(buf, proto.is_vararg as u8);
    push_u8(buf, proto.max_stack_size);

    push_len(buf, proto.code.len());
    for ins in &proto.code {
        push_u32_le(buf, ins.0);
    }

    push_len(buf, proto.constants.len());
    for c in &proto.constants {
        encode_constant(c, buf);
    }

    push_len(buf, proto.upvalues.len());
    for desc in &proto.upvalues {
        push_u8(buf, desc.in_stack() as u8);
        push_u8(buf, desc.index());
    }

    push_len(buf, proto.protos.len());
    for child in &proto.protos {
        encode_proto(chunk, *child, Some(&proto.source), strip, buf);
    }

    encode_debug(proto, strip, buf);
}

fn encode_constant(c: &Constant, buf: &mut Vec<u8>) {
    match c {
        Constant::Nil => push_u8(buf, TAG_NIL),
        Constant::Boolean(b) => {
            push_u8(buf, TAG_BOOLEAN);
            push_u8(buf, *b as u8);
        }
        Constant::Integer(n) => {
            push_u8(buf, TAG_INTEGER);
            push_i64_le(buf, *n);
        }
        Constant::Float(f) => {
            push_u8(buf, TAG_NUMBER);
            push_f64_le(buf, *f);
        }
        Constant::String(s) => {
            let tag = if s.len() <= MAX_SHORT_LEN { TAG_SHORT_STR } else { TAG_LONG_STR };
            push_u8(buf, tag);
            push_str(buf, s);
        }
    }
}

fn encode_debug(proto: &Proto, strip: bool, buf: &mut Vec<u8>) {
    if strip {
        // line info, locals, upvalue names
        for _ in 0..3 {
            push_len(buf, 0);
        }
        return;
    }

    push_len(buf, proto.line_info.len());
    for line in &proto.line_info {
        push_u32_le(buf, *line);
    }

    push_len(buf, proto.loc_vars.len());
    for var in &proto.loc_vars {
        push_str(buf, var.name.as_bytes());
        push_u32_le(buf, var.start_pc);
        push_u32_le(buf, var.end_pc);
    }

    push_len(buf, proto.upvalue_names.len());
    for name in &proto.upvalue_names {
        push_str(buf, name.as_bytes());
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encode a chunk to the bytes of a `.luac` file.
///
/// With `strip` set, all debug information (sources, line info, local and
/// upvalue names) is omitted, as `luac -s` does. An empty chunk encodes to the
/// bare header.
pub fn dump(chunk: &Chunk, strip: bool) -> Vec<u8> {
    let mut buf = Vec::new();
    push_header(&mut buf);
    if let Some(root) = chunk.root() {
        push_u8(&mut buf, root.upvalues.len() as u8);
        encode_proto(chunk, ProtoId::ROOT, None, strip, &mut buf);
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::undump;
    use lua_core::{Instruction, LocVar, OpCode, UpvalueDesc};

    fn sample() -> Chunk {
        let mut chunk = Chunk::new();
        let mut main = Proto::new("@sample.lua");
        main.is_vararg = true;
        main.upvalues = vec![UpvalueDesc::Stack(0)];
        main.upvalue_names = vec!["_ENV".into()];
        main.code = vec![
            Instruction::new_abx(OpCode::Closure, 0, 0),
            Instruction::new_abc(OpCode::Return, 0, 1, 0),
        ];
        main.line_info = vec![3, 3];
        main.loc_vars = vec![LocVar { name: "f".into(), start_pc: 1, end_pc: 2 }];
        let root = chunk.push(main);

        let mut child = Proto::new("@sample.lua");
        child.parent = Some(root);
        child.line_defined = 1;
        child.last_line_defined = 3;
        child.num_params = 1;
        child.max_stack_size = 3;
        child.constants = vec![
            Constant::Nil,
            Constant::Boolean(true),
            Constant::Integer(-7),
            Constant::Float(0.25),
            Constant::string("short"),
            Constant::string("x".repeat(300)),
        ];
        child.upvalues = vec![UpvalueDesc::Upvalue(0)];
        child.code = vec![Instruction::new_abc(OpCode::Return, 0, 1, 0)];
        let child = chunk.push(child);
        chunk[root].protos.push(child);
        chunk
    }

    #[test]
    fn header_layout() {
        let bytes = dump(&Chunk::new(), false);
        assert_eq!(bytes.len(), 4 + 2 + 6 + 5 + 8 + 8);
        assert_eq!(&bytes[..4], b"\x1bLua");
        assert_eq!(&bytes[12..17], &[4, 8, 4, 8, 8]);
    }

    #[test]
    fn decodes_back_to_same_chunk() {
        let chunk = sample();
        assert_eq!(undump(&dump(&chunk, false)).unwrap(), chunk);
    }

    #[test]
    fn nested_source_is_elided() {
        let bytes = dump(&sample(), false);
        let needle = b"@sample.lua";
        let hits = bytes.windows(needle.len()).filter(|w| w == needle).count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn long_strings_use_wide_length() {
        let mut buf = Vec::new();
        encode_constant(&Constant::string("y".repeat(300)), &mut buf);
        assert_eq!(buf[0], TAG_LONG_STR);
        assert_eq!(buf[1], LONG_LENGTH_MARKER);
        assert_eq!(u64::from_le_bytes(buf[2..10].try_into().unwrap()), 301);
    }

    #[test]
    fn strip_drops_debug_info() {
        let stripped = undump(&dump(&sample(), true)).unwrap();
        let main = stripped.root().unwrap();
        assert_eq!(main.source, "");
        assert!(main.line_info.is_empty());
        assert!(main.loc_vars.is_empty());
        assert!(main.upvalue_names.is_empty());
        assert_eq!(stripped[main.protos[0]].constants.len(), 6);
    }
}
