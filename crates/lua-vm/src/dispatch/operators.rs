use lua_core::{Instruction, LuaResult};

use super::reg;
use crate::arith::{ArithOp, CompareOp};
use crate::state::LuaState;

// ── Arithmetic, length and concatenation ──────────────────────────────────────

// R(A) := RK(B) op RK(C)
pub(super) fn binary_arith(ins: Instruction, ls: &mut LuaState, op: ArithOp) -> LuaResult<()> {
    let (a, b, c) = ins.abc();
    ls.get_rk(b)?;
    ls.get_rk(c)?;
    ls.arith(op)?;
    ls.replace(reg(a))
}

// R(A) := op R(B)
pub(super) fn unary_arith(ins: Instruction, ls: &mut LuaState, op: ArithOp) -> LuaResult<()> {
    let (a, b, _) = ins.abc();
    ls.push_value(reg(b))?;
    ls.arith(op)?;
    ls.replace(reg(a))
}

// R(A) := not R(B)
pub(super) fn not(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, _) = ins.abc();
    ls.push_boolean(!ls.to_boolean(reg(b)))?;
    ls.replace(reg(a))
}

// R(A) := length of R(B)
pub(super) fn len(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, _) = ins.abc();
    ls.len(reg(b))?;
    ls.replace(reg(a))
}

// R(A) := R(B).. ... ..R(C)
pub(super) fn concat(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, c) = ins.abc();
    let n = (c + 1).saturating_sub(b);
    ls.check_stack(n)?;
    for r in b..=c {
        ls.push_value(reg(r))?;
    }
    ls.concat(n)?;
    ls.replace(reg(a))
}

// ── Comparison and tests ──────────────────────────────────────────────────────

// if ((RK(B) op RK(C)) ~= A) then pc++
pub(super) fn compare(ins: Instruction, ls: &mut LuaState, op: CompareOp) -> LuaResult<()> {
    let (a, b, c) = ins.abc();
    ls.get_rk(b)?;
    ls.get_rk(c)?;
    if ls.compare(-2, -1, op)? != (a != 0) {
        ls.add_pc(1);
    }
    ls.pop(2)
}

// if not (R(A) <=> C) then pc++
pub(super) fn test(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, _, c) = ins.abc();
    if ls.to_boolean(reg(a)) != (c != 0) {
        ls.add_pc(1);
    }
    Ok(())
}

// if (R(B) <=> C) then R(A) := R(B) else pc++
pub(super) fn test_set(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, c) = ins.abc();
    if ls.to_boolean(reg(b)) == (c != 0) {
        ls.copy(reg(b), reg(a))
    } else {
        ls.add_pc(1);
        Ok(())
    }
}
