use lua_core::{Instruction, LuaResult};

use super::reg;
use crate::state::{upvalue_index, LuaState};

// R(A) := UpValue[B]
pub(super) fn get_upval(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, _) = ins.abc();
    ls.copy(upvalue_index(reg(b)), reg(a))
}

// UpValue[B] := R(A)
pub(super) fn set_upval(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, _) = ins.abc();
    ls.copy(reg(a), upvalue_index(reg(b)))
}

// R(A) := UpValue[B][RK(C)]
pub(super) fn get_tab_up(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, c) = ins.abc();
    ls.get_rk(c)?;
    ls.get_table(upvalue_index(reg(b)))?;
    ls.replace(reg(a))
}

// UpValue[A][RK(B)] := RK(C)
pub(super) fn set_tab_up(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, c) = ins.abc();
    ls.get_rk(b)?;
    ls.get_rk(c)?;
    ls.set_table(upvalue_index(reg(a)))
}
