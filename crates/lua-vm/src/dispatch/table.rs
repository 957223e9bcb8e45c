use lua_core::{fb2int, Instruction, LuaResult, LFIELDS_PER_FLUSH};

use super::reg;
use crate::state::LuaState;

// R(A) := {} (size = B,C)
pub(super) fn new_table(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, c) = ins.abc();
    ls.create_table(fb2int(b), fb2int(c))?;
    ls.replace(reg(a))
}

// R(A) := R(B)[RK(C)]
pub(super) fn get_table(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, c) = ins.abc();
    ls.get_rk(c)?;
    ls.get_table(reg(b))?;
    ls.replace(reg(a))
}

// R(A)[RK(B)] := RK(C)
pub(super) fn set_table(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, c) = ins.abc();
    ls.get_rk(b)?;
    ls.get_rk(c)?;
    ls.set_table(reg(a))
}

/// `R(A)[(C-1)*FPF+i] := R(A+i), 1 <= i <= B`
///
/// B = 0 stores everything up to the top left by a preceding open call or
/// VARARG; C = 0 takes the batch number from a following EXTRAARG.
pub(super) fn set_list(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, c) = ins.abc();
    let a = reg(a);
    let batch = if c > 0 { c - 1 } else { ls.fetch()?.ax() };

    let open = b == 0;
    let count = if open {
        let first_open = ls.to_integer(-1) as isize;
        ls.pop(1)?;
        (first_open - a - 1).max(0)
    } else {
        b as isize
    };

    ls.check_stack(1)?;
    let mut idx = (batch * LFIELDS_PER_FLUSH) as i64;
    for j in 1..=count {
        idx += 1;
        ls.push_value(a + j)?;
        ls.set_i(a, idx)?;
    }

    if open {
        let nregs = ls.register_count()? as isize;
        for j in nregs + 1..=ls.get_top() {
            idx += 1;
            ls.push_value(j)?;
            ls.set_i(a, idx)?;
        }
        ls.set_top(nregs)?;
    }
    Ok(())
}
