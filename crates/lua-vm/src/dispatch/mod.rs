//! Fetch/decode/execute loop for Lua closures.
//!
//! Every instruction is carried out through the `LuaState` API; the handlers
//! below never reach into frame internals. A CALL to a Lua function pushes a
//! frame and the loop carries on inside it, so Lua recursion never grows the
//! native stack.

mod call;
mod for_loop;
mod misc;
mod operators;
mod table;
mod upvalue;

use lua_core::{Instruction, LuaError, LuaResult, OpCode};
use log::trace;

use crate::arith::{ArithOp, CompareOp};
use crate::state::LuaState;

/// Run the active frame until it executes RETURN.
///
/// On error every frame entered since the start of the run is popped again,
/// leaving the entry frame active.
pub(crate) fn run(state: &mut LuaState) -> LuaResult<()> {
    let entry = state.call_depth();
    let outcome = run_frames(state, entry);
    if outcome.is_err() {
        while state.call_depth() > entry {
            state.pop_frame()?;
        }
    }
    outcome
}

fn run_frames(state: &mut LuaState, entry: usize) -> LuaResult<()> {
    loop {
        let pc = state.pc();
        let ins = state.fetch()?;
        let op = ins.opcode()?;
        trace!("[{pc:02}] {ins}");
        execute(ins, op, state)?;
        if op == OpCode::Return {
            if state.call_depth() == entry {
                return Ok(());
            }
            state.post_call()?;
            call::finish_call(state)?;
        }
    }
}

fn execute(ins: Instruction, op: OpCode, ls: &mut LuaState) -> LuaResult<()> {
    match op {
        OpCode::Move => misc::move_(ins, ls),
        OpCode::LoadK => misc::load_k(ins, ls),
        OpCode::LoadKx => misc::load_kx(ins, ls),
        OpCode::LoadBool => misc::load_bool(ins, ls),
        OpCode::LoadNil => misc::load_nil(ins, ls),
        OpCode::GetUpval => upvalue::get_upval(ins, ls),
        OpCode::GetTabUp => upvalue::get_tab_up(ins, ls),
        OpCode::GetTable => table::get_table(ins, ls),
        OpCode::SetTabUp => upvalue::set_tab_up(ins, ls),
        OpCode::SetUpval => upvalue::set_upval(ins, ls),
        OpCode::SetTable => table::set_table(ins, ls),
        OpCode::NewTable => table::new_table(ins, ls),
        OpCode::SelfOp => call::self_(ins, ls),
        OpCode::Add => operators::binary_arith(ins, ls, ArithOp::Add),
        OpCode::Sub => operators::binary_arith(ins, ls, ArithOp::Sub),
        OpCode::Mul => operators::binary_arith(ins, ls, ArithOp::Mul),
        OpCode::Mod => operators::binary_arith(ins, ls, ArithOp::Mod),
        OpCode::Pow => operators::binary_arith(ins, ls, ArithOp::Pow),
        OpCode::Div => operators::binary_arith(ins, ls, ArithOp::Div),
        OpCode::IDiv => operators::binary_arith(ins, ls, ArithOp::IDiv),
        OpCode::BAnd => operators::binary_arith(ins, ls, ArithOp::BAnd),
        OpCode::BOr => operators::binary_arith(ins, ls, ArithOp::BOr),
        OpCode::BXor => operators::binary_arith(ins, ls, ArithOp::BXor),
        OpCode::Shl => operators::binary_arith(ins, ls, ArithOp::Shl),
        OpCode::Shr => operators::binary_arith(ins, ls, ArithOp::Shr),
        OpCode::Unm => operators::unary_arith(ins, ls, ArithOp::Unm),
        OpCode::BNot => operators::unary_arith(ins, ls, ArithOp::BNot),
        OpCode::Not => operators::not(ins, ls),
        OpCode::Len => operators::len(ins, ls),
        OpCode::Concat => operators::concat(ins, ls),
        OpCode::Jmp => misc::jmp(ins, ls),
        OpCode::Eq => operators::compare(ins, ls, CompareOp::Eq),
        OpCode::Lt => operators::compare(ins, ls, CompareOp::Lt),
        OpCode::Le => operators::compare(ins, ls, CompareOp::Le),
        OpCode::Test => operators::test(ins, ls),
        OpCode::TestSet => operators::test_set(ins, ls),
        OpCode::Call => call::call(ins, ls),
        OpCode::TailCall => call::tail_call(ins, ls),
        OpCode::Return => call::return_(ins, ls),
        OpCode::ForLoop => for_loop::for_loop(ins, ls),
        OpCode::ForPrep => for_loop::for_prep(ins, ls),
        OpCode::TForCall => call::tfor_call(ins, ls),
        OpCode::TForLoop => for_loop::tfor_loop(ins, ls),
        OpCode::SetList => table::set_list(ins, ls),
        OpCode::Closure => call::closure(ins, ls),
        OpCode::VarArg => call::vararg(ins, ls),
        OpCode::ExtraArg => Err(LuaError::Unimplemented("EXTRAARG")),
    }
}

/// Stack index of register `r`.
fn reg(r: usize) -> isize {
    r as isize + 1
}
