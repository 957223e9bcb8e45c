//! 32-bit instruction words and their operand layouts.

use std::fmt;

use crate::error::LuaError;
use crate::opcode::{OpArgMode, OpCode, OpMode};

pub const MAXARG_BX: i32 = (1 << 18) - 1;
pub const MAXARG_SBX: i32 = MAXARG_BX >> 1;
pub const MAXARG_AX: u32 = (1 << 26) - 1;

/// RK operands at or above this value address the constant pool.
pub const BITRK: usize = 1 << 8;

/// Number of list items SETLIST flushes per batch.
pub const LFIELDS_PER_FLUSH: usize = 50;

/// Marks an RK operand as a constant-pool index.
pub const fn rk_constant(idx: u32) -> u32 {
    idx | BITRK as u32
}

/// Decodes the "floating point byte" used by NEWTABLE size hints.
pub fn fb2int(x: usize) -> usize {
    if x < 8 {
        x
    } else {
        ((x & 7) + 8) << ((x >> 3) - 1)
    }
}

/// One encoded instruction.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction(pub u32);

impl Instruction {
    pub fn new_abc(op: OpCode, a: u32, b: u32, c: u32) -> Self {
        Self((op as u32) | (a & 0xFF) << 6 | (c & 0x1FF) << 14 | (b & 0x1FF) << 23)
    }

    pub fn new_abx(op: OpCode, a: u32, bx: u32) -> Self {
        Self((op as u32) | (a & 0xFF) << 6 | (bx & MAXARG_BX as u32) << 14)
    }

    pub fn new_asbx(op: OpCode, a: u32, sbx: i32) -> Self {
        Self::new_abx(op, a, (sbx + MAXARG_SBX) as u32)
    }

    pub fn new_ax(op: OpCode, ax: u32) -> Self {
        Self((op as u32) | (ax & MAXARG_AX) << 6)
    }

    pub fn raw_opcode(self) -> u8 {
        (self.0 & 0x3F) as u8
    }

    pub fn opcode(self) -> Result<OpCode, LuaError> {
        let raw = self.raw_opcode();
        OpCode::from_u8(raw).ok_or(LuaError::InvalidOpcode(raw))
    }

    /// `(A, B, C)`
    pub fn abc(self) -> (usize, usize, usize) {
        let a = (self.0 >> 6) & 0xFF;
        let c = (self.0 >> 14) & 0x1FF;
        let b = (self.0 >> 23) & 0x1FF;
        (a as usize, b as usize, c as usize)
    }

    /// `(A, Bx)`
    pub fn abx(self) -> (usize, usize) {
        let a = (self.0 >> 6) & 0xFF;
        let bx = self.0 >> 14;
        (a as usize, bx as usize)
    }

    /// `(A, sBx)`
    pub fn asbx(self) -> (usize, isize) {
        let (a, bx) = self.abx();
        (a, bx as isize - MAXARG_SBX as isize)
    }

    pub fn ax(self) -> usize {
        (self.0 >> 6) as usize
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instruction({:#010x})", self.0)
    }
}

/// Renders operands the way `luac -l` lists them: constants appear as `-1-k`.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.opcode() {
            Ok(op) => op,
            Err(_) => return write!(f, "<invalid {}>", self.raw_opcode()),
        };
        let info = op.info();
        write!(f, "{:<9}", info.name)?;
        match info.mode {
            OpMode::ABC => {
                let (a, b, c) = self.abc();
                write!(f, "{a}")?;
                if info.arg_b != OpArgMode::N {
                    write!(f, " {}", rk_display(b))?;
                }
                if info.arg_c != OpArgMode::N {
                    write!(f, " {}", rk_display(c))?;
                }
                Ok(())
            }
            OpMode::ABx => {
                let (a, bx) = self.abx();
                match info.arg_b {
                    OpArgMode::K => write!(f, "{a} {}", -1 - bx as isize),
                    OpArgMode::U => write!(f, "{a} {bx}"),
                    _ => write!(f, "{a}"),
                }
            }
            OpMode::AsBx => {
                let (a, sbx) = self.asbx();
                write!(f, "{a} {sbx}")
            }
            OpMode::Ax => write!(f, "{}", -1 - self.ax() as isize),
        }
    }
}

fn rk_display(x: usize) -> isize {
    if x >= BITRK {
        -1 - (x & 0xFF) as isize
    } else {
        x as isize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits() {
        assert_eq!(MAXARG_BX, 262_143);
        assert_eq!(MAXARG_SBX, 131_071);
    }

    #[test]
    fn decodes_luac_words() {
        // GETTABUP 0 0 -1 as emitted by luac for `print`
        let i = Instruction(0x0040_0006);
        assert_eq!(i.opcode(), Ok(OpCode::GetTabUp));
        assert_eq!(i.abc(), (0, 0, 256));

        // LOADK 1 -2
        let i = Instruction(0x0000_4041);
        assert_eq!(i.opcode(), Ok(OpCode::LoadK));
        assert_eq!(i.abx(), (1, 1));

        // CALL 0 2 1
        let i = Instruction(0x0100_4024);
        assert_eq!(i.opcode(), Ok(OpCode::Call));
        assert_eq!(i.abc(), (0, 2, 1));

        // RETURN 0 1
        let i = Instruction(0x0080_0026);
        assert_eq!(i.opcode(), Ok(OpCode::Return));
        assert_eq!(i.abc(), (0, 1, 0));
    }

    #[test]
    fn encoders_agree_with_decoders() {
        let i = Instruction::new_abc(OpCode::Add, 3, rk_constant(2), 7);
        assert_eq!(i.abc(), (3, 258, 7));
        let i = Instruction::new_asbx(OpCode::ForLoop, 1, -2);
        assert_eq!(i.asbx(), (1, -2));
        let i = Instruction::new_asbx(OpCode::Jmp, 0, MAXARG_SBX);
        assert_eq!(i.asbx(), (0, MAXARG_SBX as isize));
        let i = Instruction::new_ax(OpCode::ExtraArg, 70_000);
        assert_eq!(i.ax(), 70_000);
    }

    #[test]
    fn unknown_opcode() {
        assert_eq!(Instruction(63).opcode(), Err(LuaError::InvalidOpcode(63)));
    }

    #[test]
    fn listing() {
        assert_eq!(Instruction(0x0040_0006).to_string(), "GETTABUP 0 0 -1");
        assert_eq!(Instruction::new_asbx(OpCode::ForPrep, 1, 1).to_string(), "FORPREP  1 1");
        assert_eq!(Instruction::new_abx(OpCode::LoadK, 0, 2).to_string(), "LOADK    0 -3");
    }

    #[test]
    fn fb2int_values() {
        assert_eq!(fb2int(0), 0);
        assert_eq!(fb2int(7), 7);
        assert_eq!(fb2int(8), 8);
        assert_eq!(fb2int(9), 9);
        assert_eq!(fb2int(16), 16);
        assert_eq!(fb2int(17), 18);
    }
}
