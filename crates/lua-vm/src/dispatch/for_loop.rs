use lua_core::{Instruction, LuaError, LuaResult};

use super::reg;
use crate::arith::{ArithOp, CompareOp};
use crate::state::LuaState;

// R(A) -= R(A+2); pc += sBx
pub(super) fn for_prep(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, sbx) = ins.asbx();
    let a = reg(a);

    for (idx, what) in [(a, "initial value"), (a + 1, "limit"), (a + 2, "step")] {
        let n = ls
            .to_value(idx)
            .to_number()
            .ok_or_else(|| LuaError::Runtime(format!("'for' {what} must be a number")))?;
        ls.push(n)?;
        ls.replace(idx)?;
    }

    ls.push_value(a)?;
    ls.push_value(a + 2)?;
    ls.arith(ArithOp::Sub)?;
    ls.replace(a)?;
    ls.add_pc(sbx);
    Ok(())
}

// R(A) += R(A+2)
// if R(A) <?= R(A+1) then { pc += sBx; R(A+3) = R(A) }
pub(super) fn for_loop(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, sbx) = ins.asbx();
    let a = reg(a);

    ls.push_value(a + 2)?;
    ls.push_value(a)?;
    ls.arith(ArithOp::Add)?;
    ls.replace(a)?;

    let ascending = ls.to_number(a + 2) >= 0.0;
    let continues = if ascending {
        ls.compare(a, a + 1, CompareOp::Le)?
    } else {
        ls.compare(a + 1, a, CompareOp::Le)?
    };
    if continues {
        ls.add_pc(sbx);
        ls.copy(a, a + 3)?;
    }
    Ok(())
}

// if R(A+1) ~= nil then { R(A) = R(A+1); pc += sBx }
pub(super) fn tfor_loop(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, sbx) = ins.asbx();
    let a = reg(a);
    if !ls.is_nil(a + 1) {
        ls.copy(a + 1, a)?;
        ls.add_pc(sbx);
    }
    Ok(())
}
