//! Lua 5.3 opcode set and its static descriptor table.

/// Operand layout of an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpMode {
    /// `[ B:9 ][ C:9 ][ A:8 ][ OP:6 ]`
    ABC,
    /// `[ Bx:18 ][ A:8 ][ OP:6 ]`
    ABx,
    /// `[ sBx:18 ][ A:8 ][ OP:6 ]`
    AsBx,
    /// `[ Ax:26 ][ OP:6 ]`
    Ax,
}

/// How an instruction uses its B or C operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpArgMode {
    /// Not used.
    N,
    /// Used as a plain number.
    U,
    /// A register or a jump offset.
    R,
    /// A constant index or an RK operand.
    K,
}

/// Register-based instruction set, numbered exactly as in Lua 5.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Move = 0,
    LoadK,
    LoadKx,
    LoadBool,
    LoadNil,
    GetUpval,
    GetTabUp,
    GetTable,
    SetTabUp,
    SetUpval,
    SetTable,
    NewTable,
    SelfOp,
    Add,
    Sub,
    Mul,
    Mod,
    Pow,
    Div,
    IDiv,
    BAnd,
    BOr,
    BXor,
    Shl,
    Shr,
    Unm,
    BNot,
    Not,
    Len,
    Concat,
    Jmp,
    Eq,
    Lt,
    Le,
    Test,
    TestSet,
    Call,
    TailCall,
    Return,
    ForLoop,
    ForPrep,
    TForCall,
    TForLoop,
    SetList,
    Closure,
    VarArg,
    ExtraArg,
}

/// Static description of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpInfo {
    pub name: &'static str,
    pub mode: OpMode,
    pub arg_b: OpArgMode,
    pub arg_c: OpArgMode,
    /// Conditionally skips the next instruction instead of producing a value.
    pub test: bool,
    /// Writes register A.
    pub sets_a: bool,
}

const fn info(
    test: bool,
    sets_a: bool,
    arg_b: OpArgMode,
    arg_c: OpArgMode,
    mode: OpMode,
    name: &'static str,
) -> OpInfo {
    OpInfo {
        name,
        mode,
        arg_b,
        arg_c,
        test,
        sets_a,
    }
}

use OpArgMode::{K, N, R, U};
use OpMode::{AsBx, Ax, ABC, ABx};

/// Indexed by `OpCode as usize`.
pub static OPCODE_INFO: [OpInfo; OpCode::COUNT] = [
    info(false, true, R, N, ABC, "MOVE"),       // R(A) := R(B)
    info(false, true, K, N, ABx, "LOADK"),      // R(A) := Kst(Bx)
    info(false, true, N, N, ABx, "LOADKX"),     // R(A) := Kst(extra arg)
    info(false, true, U, U, ABC, "LOADBOOL"),   // R(A) := (bool)B; if (C) pc++
    info(false, true, U, N, ABC, "LOADNIL"),    // R(A), ..., R(A+B) := nil
    info(false, true, U, N, ABC, "GETUPVAL"),   // R(A) := UpValue[B]
    info(false, true, U, K, ABC, "GETTABUP"),   // R(A) := UpValue[B][RK(C)]
    info(false, true, R, K, ABC, "GETTABLE"),   // R(A) := R(B)[RK(C)]
    info(false, false, K, K, ABC, "SETTABUP"),  // UpValue[A][RK(B)] := RK(C)
    info(false, false, U, N, ABC, "SETUPVAL"),  // UpValue[B] := R(A)
    info(false, false, K, K, ABC, "SETTABLE"),  // R(A)[RK(B)] := RK(C)
    info(false, true, U, U, ABC, "NEWTABLE"),   // R(A) := {} (size = B,C)
    info(false, true, R, K, ABC, "SELF"),       // R(A+1) := R(B); R(A) := R(B)[RK(C)]
    info(false, true, K, K, ABC, "ADD"),
    info(false, true, K, K, ABC, "SUB"),
    info(false, true, K, K, ABC, "MUL"),
    info(false, true, K, K, ABC, "MOD"),
    info(false, true, K, K, ABC, "POW"),
    info(false, true, K, K, ABC, "DIV"),
    info(false, true, K, K, ABC, "IDIV"),
    info(false, true, K, K, ABC, "BAND"),
    info(false, true, K, K, ABC, "BOR"),
    info(false, true, K, K, ABC, "BXOR"),
    info(false, true, K, K, ABC, "SHL"),
    info(false, true, K, K, ABC, "SHR"),
    info(false, true, R, N, ABC, "UNM"),
    info(false, true, R, N, ABC, "BNOT"),
    info(false, true, R, N, ABC, "NOT"),
    info(false, true, R, N, ABC, "LEN"),
    info(false, true, R, R, ABC, "CONCAT"),     // R(A) := R(B).. ... ..R(C)
    info(false, false, R, N, AsBx, "JMP"),      // pc += sBx; if (A) close upvalues >= R(A-1)
    info(true, false, K, K, ABC, "EQ"),         // if ((RK(B) == RK(C)) ~= A) then pc++
    info(true, false, K, K, ABC, "LT"),
    info(true, false, K, K, ABC, "LE"),
    info(true, false, N, U, ABC, "TEST"),       // if not (R(A) <=> C) then pc++
    info(true, true, R, U, ABC, "TESTSET"),     // if (R(B) <=> C) then R(A) := R(B) else pc++
    info(false, true, U, U, ABC, "CALL"),       // R(A), ..., R(A+C-2) := R(A)(R(A+1), ..., R(A+B-1))
    info(false, true, U, U, ABC, "TAILCALL"),
    info(false, false, U, N, ABC, "RETURN"),    // return R(A), ..., R(A+B-2)
    info(false, true, R, N, AsBx, "FORLOOP"),
    info(false, true, R, N, AsBx, "FORPREP"),
    info(false, false, N, U, ABC, "TFORCALL"),  // R(A+3), ..., R(A+2+C) := R(A)(R(A+1), R(A+2))
    info(false, true, R, N, AsBx, "TFORLOOP"),
    info(false, false, U, U, ABC, "SETLIST"),   // R(A)[(C-1)*FPF+i] := R(A+i), 1 <= i <= B
    info(false, true, U, N, ABx, "CLOSURE"),    // R(A) := closure(KPROTO[Bx])
    info(false, true, U, N, ABC, "VARARG"),     // R(A), ..., R(A+B-2) = vararg
    info(false, false, U, U, Ax, "EXTRAARG"),
];

const ALL: [OpCode; OpCode::COUNT] = {
    use OpCode::*;
    [
        Move, LoadK, LoadKx, LoadBool, LoadNil, GetUpval, GetTabUp, GetTable, SetTabUp, SetUpval,
        SetTable, NewTable, SelfOp, Add, Sub, Mul, Mod, Pow, Div, IDiv, BAnd, BOr, BXor, Shl, Shr,
        Unm, BNot, Not, Len, Concat, Jmp, Eq, Lt, Le, Test, TestSet, Call, TailCall, Return,
        ForLoop, ForPrep, TForCall, TForLoop, SetList, Closure, VarArg, ExtraArg,
    ]
};

impl OpCode {
    pub const COUNT: usize = 47;

    pub fn from_u8(raw: u8) -> Option<OpCode> {
        ALL.get(raw as usize).copied()
    }

    pub fn info(self) -> &'static OpInfo {
        &OPCODE_INFO[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbering_matches_table() {
        for (i, op) in ALL.iter().enumerate() {
            assert_eq!(*op as usize, i);
            assert_eq!(OpCode::from_u8(i as u8), Some(*op));
        }
        assert_eq!(OpCode::from_u8(47), None);
    }

    #[test]
    fn descriptor_names() {
        assert_eq!(OpCode::Move.name(), "MOVE");
        assert_eq!(OpCode::GetTabUp.name(), "GETTABUP");
        assert_eq!(OpCode::Jmp.info().mode, OpMode::AsBx);
        assert_eq!(OpCode::ExtraArg.name(), "EXTRAARG");
    }

    #[test]
    fn test_flags() {
        let tests: Vec<_> = ALL.iter().filter(|op| op.info().test).map(|op| op.name()).collect();
        assert_eq!(tests, ["EQ", "LT", "LE", "TEST", "TESTSET"]);
        assert!(OpCode::TestSet.info().sets_a);
        assert!(!OpCode::SetTable.info().sets_a);
    }
}
