use lua_core::{Chunk, Constant, Instruction, LocVar, OpCode, Proto, ProtoId, UpvalueDesc};

// ── Proto builder helpers ─────────────────────────────────────────────────────

/// Mutable builder for a prototype tree, used to assemble chunks by hand.
///
/// Nested functions are built as child builders; [`ProtoBuilder::finish`]
/// lays the tree out in the same pre-order the decoder produces.
#[derive(Debug)]
pub struct ProtoBuilder {
    proto: Proto,
    children: Vec<ProtoBuilder>,
}

impl ProtoBuilder {
    /// A main-chunk builder: vararg, with `_ENV` as its only upvalue.
    pub fn main(source: impl Into<String>) -> Self {
        let mut b = Self::function(source, 0);
        b.proto.is_vararg = true;
        b.proto.upvalues.push(UpvalueDesc::Stack(0));
        b.proto.upvalue_names.push("_ENV".into());
        b
    }

    pub fn function(source: impl Into<String>, num_params: u8) -> Self {
        let mut proto = Proto::new(source);
        proto.num_params = num_params;
        Self {
            proto,
            children: Vec::new(),
        }
    }

    pub fn vararg(mut self) -> Self {
        self.proto.is_vararg = true;
        self
    }

    pub fn max_stack(mut self, size: u8) -> Self {
        self.proto.max_stack_size = size;
        self
    }

    pub fn lines(mut self, defined: u32, last: u32) -> Self {
        self.proto.line_defined = defined;
        self.proto.last_line_defined = last;
        self
    }

    pub fn upvalue(&mut self, desc: UpvalueDesc, name: impl Into<String>) -> u8 {
        let idx = self.proto.upvalues.len() as u8;
        self.proto.upvalues.push(desc);
        self.proto.upvalue_names.push(name.into());
        idx
    }

    pub fn emit(&mut self, ins: Instruction) -> usize {
        self.proto.code.push(ins);
        self.proto.code.len() - 1
    }

    pub fn abc(&mut self, op: OpCode, a: u32, b: u32, c: u32) -> usize {
        self.emit(Instruction::new_abc(op, a, b, c))
    }

    pub fn abx(&mut self, op: OpCode, a: u32, bx: u32) -> usize {
        self.emit(Instruction::new_abx(op, a, bx))
    }

    pub fn asbx(&mut self, op: OpCode, a: u32, sbx: i32) -> usize {
        self.emit(Instruction::new_asbx(op, a, sbx))
    }

    pub fn ax(&mut self, op: OpCode, ax: u32) -> usize {
        self.emit(Instruction::new_ax(op, ax))
    }

    /// Index of `value` in the constant pool, adding it if absent.
    pub fn add_constant(&mut self, value: Constant) -> u32 {
        // deduplicate; floats compare by bits so 0.0 and -0.0 stay distinct
        let same = |c: &Constant| match (c, &value) {
            (Constant::Float(a), Constant::Float(b)) => a.to_bits() == b.to_bits(),
            _ => c == &value,
        };
        if let Some(idx) = self.proto.constants.iter().position(same) {
            return idx as u32;
        }
        self.proto.constants.push(value);
        (self.proto.constants.len() - 1) as u32
    }

    pub fn add_local(&mut self, name: impl Into<String>, start_pc: u32, end_pc: u32) {
        self.proto.loc_vars.push(LocVar {
            name: name.into(),
            start_pc,
            end_pc,
        });
    }

    /// Add a nested function; the returned index is CLOSURE's Bx operand.
    pub fn add_proto(&mut self, child: ProtoBuilder) -> u32 {
        self.children.push(child);
        (self.children.len() - 1) as u32
    }

    pub fn finish(self) -> Chunk {
        let mut chunk = Chunk::new();
        self.flatten(&mut chunk, None);
        chunk
    }

    fn flatten(self, chunk: &mut Chunk, parent: Option<ProtoId>) -> ProtoId {
        let ProtoBuilder { mut proto, children } = self;
        proto.parent = parent;
        let id = chunk.push(proto);
        let ids: Vec<ProtoId> = children
            .into_iter()
            .map(|child| child.flatten(chunk, Some(id)))
            .collect();
        chunk[id].protos = ids;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dump, undump};

    #[test]
    fn constants_are_deduplicated() {
        let mut b = ProtoBuilder::main("=test");
        assert_eq!(b.add_constant(Constant::string("print")), 0);
        assert_eq!(b.add_constant(Constant::Integer(1)), 1);
        assert_eq!(b.add_constant(Constant::string("print")), 0);
        assert_eq!(b.add_constant(Constant::Float(1.0)), 2);
        assert_eq!(b.add_constant(Constant::Float(-0.0)), 3);
        assert_eq!(b.add_constant(Constant::Float(0.0)), 4);
    }

    #[test]
    fn finish_orders_protos_preorder() {
        let mut main = ProtoBuilder::main("=test");
        let mut outer = ProtoBuilder::function("=test", 0);
        outer.add_proto(ProtoBuilder::function("=test", 1));
        main.add_proto(outer);
        main.add_proto(ProtoBuilder::function("=test", 2));
        let chunk = main.finish();

        assert_eq!(chunk.len(), 4);
        assert_eq!(chunk[ProtoId(0)].protos, vec![ProtoId(1), ProtoId(3)]);
        assert_eq!(chunk[ProtoId(1)].protos, vec![ProtoId(2)]);
        assert_eq!(chunk[ProtoId(2)].parent, Some(ProtoId(1)));
        assert_eq!(chunk[ProtoId(3)].num_params, 2);
    }

    #[test]
    fn built_chunk_survives_dump() {
        let mut main = ProtoBuilder::main("@built.lua").max_stack(3);
        let k = main.add_constant(Constant::Integer(42));
        main.abx(OpCode::LoadK, 0, k);
        main.abc(OpCode::Return, 0, 2, 0);
        main.abc(OpCode::Return, 0, 1, 0);
        let mut f = ProtoBuilder::function("@built.lua", 0);
        f.upvalue(UpvalueDesc::Upvalue(0), "_ENV");
        f.abc(OpCode::Return, 0, 1, 0);
        main.add_proto(f);
        let chunk = main.finish();
        assert_eq!(undump(&dump(&chunk, false)).unwrap(), chunk);
    }
}
