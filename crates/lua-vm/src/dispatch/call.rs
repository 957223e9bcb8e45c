//! Calls, returns, closures and varargs.
//!
//! An open result count (C = 0 on CALL, B = 0 on VARARG) leaves the values on
//! top of the register window followed by an integer marker naming the first
//! register they belong to. The next instruction with an open operand count
//! consumes the marker through [`fix_stack`].

use lua_core::{Instruction, LuaResult, OpCode};

use super::reg;
use crate::state::LuaState;

// R(A+1) := R(B); R(A) := R(B)[RK(C)]
pub(super) fn self_(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, c) = ins.abc();
    ls.copy(reg(b), reg(a + 1))?;
    ls.get_rk(c)?;
    ls.get_table(reg(b))?;
    ls.replace(reg(a))
}

// R(A) := closure(KPROTO[Bx])
pub(super) fn closure(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, bx) = ins.abx();
    ls.load_proto(bx)?;
    ls.replace(reg(a))
}

// R(A), R(A+1), ..., R(A+B-2) = vararg
pub(super) fn vararg(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, _) = ins.abc();
    if b != 1 {
        ls.load_vararg(b as isize - 1)?;
        pop_results(reg(a), b, ls)?;
    }
    Ok(())
}

// R(A), ..., R(A+C-2) := R(A)(R(A+1), ..., R(A+B-1))
pub(super) fn call(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, c) = ins.abc();
    let a = reg(a);
    let nargs = push_func_and_args(a, b, ls)?;
    if !ls.pre_call(nargs, c as isize - 1)? {
        pop_results(a, c, ls)?;
    }
    Ok(())
}

// return R(A)(R(A+1), ..., R(A+B-1))
//
// A Lua callee replaces the running frame. A host callee runs as a regular
// call keeping every result; the RETURN A 0 that always follows hands them on.
pub(super) fn tail_call(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, _) = ins.abc();
    let a = reg(a);
    let nargs = push_func_and_args(a, b, ls)?;
    if !ls.tail_call(nargs)? {
        pop_results(a, 0, ls)?;
    }
    Ok(())
}

// return R(A), ..., R(A+B-2)
pub(super) fn return_(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, b, _) = ins.abc();
    let a = reg(a);
    match b {
        1 => Ok(()),
        0 => fix_stack(a, ls),
        _ => {
            ls.check_stack(b - 1)?;
            for r in a..=a + b as isize - 2 {
                ls.push_value(r)?;
            }
            Ok(())
        }
    }
}

// R(A+3), ..., R(A+2+C) := R(A)(R(A+1), R(A+2))
pub(super) fn tfor_call(ins: Instruction, ls: &mut LuaState) -> LuaResult<()> {
    let (a, _, c) = ins.abc();
    let a = reg(a);
    push_func_and_args(a, 3, ls)?;
    if !ls.pre_call(2, c as isize)? {
        pop_results(a + 3, c + 1, ls)?;
    }
    Ok(())
}

/// Store the results of the CALL or TFORCALL at `pc - 1` once its Lua callee
/// has returned.
pub(super) fn finish_call(ls: &mut LuaState) -> LuaResult<()> {
    let ins = ls.instruction(ls.pc().wrapping_sub(1))?;
    let (a, _, c) = ins.abc();
    match ins.opcode()? {
        OpCode::TForCall => pop_results(reg(a) + 3, c + 1, ls),
        _ => pop_results(reg(a), c, ls),
    }
}

// ── Result window helpers ─────────────────────────────────────────────────────

/// Push the callee at `a` and its arguments; returns the argument count.
fn push_func_and_args(a: isize, b: usize, ls: &mut LuaState) -> LuaResult<usize> {
    if b >= 1 {
        ls.check_stack(b)?;
        for r in a..a + b as isize {
            ls.push_value(r)?;
        }
        Ok(b - 1)
    } else {
        fix_stack(a, ls)?;
        let above = ls.get_top() - ls.register_count()? as isize;
        Ok((above - 1).max(0) as usize)
    }
}

/// Move the results of an open call into place after the fixed values `a..marker`.
fn fix_stack(a: isize, ls: &mut LuaState) -> LuaResult<()> {
    let marker = ls.to_integer(-1) as isize;
    ls.pop(1)?;
    let fixed = (marker - a).max(0);
    ls.check_stack(fixed as usize)?;
    for r in a..marker {
        ls.push_value(r)?;
    }
    if fixed > 0 {
        ls.rotate(ls.register_count()? as isize + 1, fixed)?;
    }
    Ok(())
}

/// Store the results of a call into `a..a+c-2`; `c == 0` leaves them on the
/// stack and pushes the marker.
fn pop_results(a: isize, c: usize, ls: &mut LuaState) -> LuaResult<()> {
    match c {
        1 => Ok(()),
        0 => {
            ls.check_stack(1)?;
            ls.push_integer(a as i64)
        }
        _ => {
            for r in (a..=a + c as isize - 2).rev() {
                ls.replace(r)?;
            }
            Ok(())
        }
    }
}
