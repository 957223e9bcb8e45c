//! Function prototypes, stored in a per-chunk arena.

use std::ops::{Index, IndexMut};
use std::rc::Rc;

use crate::instruction::Instruction;

/// Index of a prototype inside its [`Chunk`]. The root is always `ProtoId(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtoId(pub usize);

impl ProtoId {
    pub const ROOT: ProtoId = ProtoId(0);
}

/// A compile-time constant from a prototype's constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(Rc<[u8]>),
}

impl Constant {
    pub fn string(s: impl AsRef<[u8]>) -> Self {
        Constant::String(Rc::from(s.as_ref()))
    }
}

/// Describes where to find an upvalue at closure instantiation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpvalueDesc {
    /// Capture register `reg` of the frame creating the closure.
    Stack(u8),
    /// Re-use upvalue `idx` of the closure creating the closure.
    Upvalue(u8),
}

impl UpvalueDesc {
    pub fn in_stack(self) -> bool {
        matches!(self, UpvalueDesc::Stack(_))
    }

    pub fn index(self) -> u8 {
        match self {
            UpvalueDesc::Stack(i) | UpvalueDesc::Upvalue(i) => i,
        }
    }
}

/// Debug record for one local variable's live range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocVar {
    pub name: String,
    pub start_pc: u32,
    pub end_pc: u32,
}

/// A compiled function prototype, immutable once decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Proto {
    /// Enclosing prototype; `None` for the root.
    pub parent: Option<ProtoId>,
    /// Source name, already resolved against the enclosing prototype.
    pub source: String,
    pub line_defined: u32,
    pub last_line_defined: u32,
    pub num_params: u8,
    pub is_vararg: bool,
    /// Number of registers the function needs.
    pub max_stack_size: u8,
    pub code: Vec<Instruction>,
    pub constants: Vec<Constant>,
    pub upvalues: Vec<UpvalueDesc>,
    /// Nested prototypes referenced by CLOSURE, as arena indices.
    pub protos: Vec<ProtoId>,
    pub line_info: Vec<u32>,
    pub loc_vars: Vec<LocVar>,
    pub upvalue_names: Vec<String>,
}

impl Proto {
    /// Create an empty proto with the given source label.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            parent: None,
            source: source.into(),
            line_defined: 0,
            last_line_defined: 0,
            num_params: 0,
            is_vararg: false,
            max_stack_size: 2,
            code: Vec::new(),
            constants: Vec::new(),
            upvalues: Vec::new(),
            protos: Vec::new(),
            line_info: Vec::new(),
            loc_vars: Vec::new(),
            upvalue_names: Vec::new(),
        }
    }

    pub fn is_main(&self) -> bool {
        self.parent.is_none()
    }
}

/// A decoded unit of bytecode: every prototype of one binary chunk.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chunk {
    protos: Vec<Proto>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a prototype and return its id. The first one pushed is the root.
    pub fn push(&mut self, proto: Proto) -> ProtoId {
        self.protos.push(proto);
        ProtoId(self.protos.len() - 1)
    }

    pub fn get(&self, id: ProtoId) -> Option<&Proto> {
        self.protos.get(id.0)
    }

    pub fn get_mut(&mut self, id: ProtoId) -> Option<&mut Proto> {
        self.protos.get_mut(id.0)
    }

    pub fn root(&self) -> Option<&Proto> {
        self.get(ProtoId::ROOT)
    }

    pub fn len(&self) -> usize {
        self.protos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protos.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProtoId, &Proto)> {
        self.protos.iter().enumerate().map(|(i, p)| (ProtoId(i), p))
    }

    /// `id` followed by each enclosing prototype up to the root.
    pub fn ancestors(&self, id: ProtoId) -> impl Iterator<Item = ProtoId> + '_ {
        std::iter::successors(self.get(id).map(|_| id), move |cur| {
            self.get(*cur).and_then(|p| p.parent)
        })
    }
}

impl Index<ProtoId> for Chunk {
    type Output = Proto;

    fn index(&self, id: ProtoId) -> &Proto {
        &self.protos[id.0]
    }
}

impl IndexMut<ProtoId> for Chunk {
    fn index_mut(&mut self, id: ProtoId) -> &mut Proto {
        &mut self.protos[id.0]
    }
}
