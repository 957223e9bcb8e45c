use lua_core::{Instruction, LuaResult};

use super::reg;
use crate::state::LuaState;

// R(A) := R(B)
pub(super) fn move_(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, _) = ins.abc();
    ls.copy(reg(b), reg(a))
}

// pc += sBx; if (A) close all upvalues >= R(A - 1)
pub(super) fn jmp(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, sbx) = ins.asbx();
    ls.add_pc(sbx);
    if a != 0 {
        ls.close_upvalues(a);
    }
    Ok(())
}

// R(A), R(A+1), ..., R(A+B) := nil
pub(super) fn load_nil(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, _) = ins.abc();
    ls.push_nil()?;
    for r in a..=a + b {
        ls.copy(-1, reg(r))?;
    }
    ls.pop(1)
}

// R(A) := (Bool)B; if (C) pc++
pub(super) fn load_bool(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, c) = ins.abc();
    ls.push_boolean(b != 0)?;
    ls.replace(reg(a))?;
    if c != 0 {
        ls.add_pc(1);
    }
    Ok(())
}

// R(A) := Kst(Bx)
pub(super) fn load_k(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, bx) = ins.abx();
    ls.get_const(bx)?;
    ls.replace(reg(a))
}

// R(A) := Kst(extra arg)
pub(super) fn load_kx(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, _) = ins.abx();
    let ax = ls.fetch()?.ax();
    ls.get_const(ax)?;
    ls.replace(reg(a))
}
