//! The handful of base functions scripts can rely on without a standard library.

use std::rc::Rc;

use lua_core::{LuaError, LuaResult};

use crate::closure::Closure;
use crate::state::LuaState;
use crate::table::LuaTable;
use crate::value::{parse_number, LuaType, LuaValue};

type BaseFunction = fn(&mut LuaState) -> LuaResult<usize>;

const BASE_FUNCS: [(&str, BaseFunction); 10] = [
    ("print", base_print),
    ("type", base_type),
    ("tostring", base_tostring),
    ("tonumber", base_tonumber),
    ("assert", base_assert),
    ("error", base_error),
    ("next", base_next),
    ("pairs", base_pairs),
    ("ipairs", base_ipairs),
    ("select", base_select),
];

/// Install the base functions into `globals`.
pub fn open_base(globals: &mut LuaTable) {
    for (name, f) in BASE_FUNCS {
        let closure = Closure::host(Rc::new(f), Vec::new());
        globals.set_field(name, LuaValue::Function(Rc::new(closure)));
    }
}

fn bad_argument(n: usize, fname: &str, msg: &str) -> LuaError {
    LuaError::Runtime(format!("bad argument #{n} to '{fname}' ({msg})"))
}

fn check_any(ls: &LuaState, n: isize, fname: &str) -> LuaResult<()> {
    if ls.is_none(n) {
        Err(bad_argument(n as usize, fname, "value expected"))
    } else {
        Ok(())
    }
}

fn check_table(ls: &LuaState, n: isize, fname: &str) -> LuaResult<()> {
    if ls.is_table(n) {
        Ok(())
    } else {
        let got = ls.type_name(ls.type_of(n));
        Err(bad_argument(n as usize, fname, &format!("table expected, got {got}")))
    }
}

// print(...)
fn base_print(ls: &mut LuaState) -> LuaResult<usize> {
    let parts: Vec<String> = (1..=ls.get_top()).map(|i| ls.to_value(i).to_string()).collect();
    println!("{}", parts.join("\t"));
    Ok(0)
}

// type(v)
fn base_type(ls: &mut LuaState) -> LuaResult<usize> {
    check_any(ls, 1, "type")?;
    let name = ls.type_name(ls.type_of(1));
    ls.push_string(name)?;
    Ok(1)
}

// tostring(v)
fn base_tostring(ls: &mut LuaState) -> LuaResult<usize> {
    check_any(ls, 1, "tostring")?;
    match ls.to_value(1) {
        LuaValue::String(_) => ls.push_value(1)?,
        other => ls.push_string(other.to_string())?,
    }
    Ok(1)
}

// tonumber(e [, base])
fn base_tonumber(ls: &mut LuaState) -> LuaResult<usize> {
    if ls.is_none_or_nil(2) {
        check_any(ls, 1, "tonumber")?;
        let n = match ls.to_value(1) {
            v @ (LuaValue::Integer(_) | LuaValue::Float(_)) => v,
            LuaValue::String(s) => parse_number(&s).unwrap_or_default(),
            _ => LuaValue::Nil,
        };
        ls.push(n)?;
        return Ok(1);
    }

    let base = ls
        .to_integer_x(2)
        .ok_or_else(|| bad_argument(2, "tonumber", "number expected"))?;
    if !(2..=36).contains(&base) {
        return Err(bad_argument(2, "tonumber", "base out of range"));
    }
    let digits = match ls.to_value(1) {
        LuaValue::String(s) => s,
        other => {
            let got = other.type_name();
            return Err(bad_argument(1, "tonumber", &format!("string expected, got {got}")));
        }
    };
    match parse_in_base(&digits, base as u32) {
        Some(n) => ls.push_integer(n)?,
        None => ls.push_nil()?,
    }
    Ok(1)
}

fn parse_in_base(s: &[u8], base: u32) -> Option<i64> {
    let s = std::str::from_utf8(s).ok()?.trim();
    let (neg, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if body.is_empty() {
        return None;
    }
    let mut n: i64 = 0;
    for ch in body.chars() {
        let d = ch.to_digit(base)?;
        n = n.wrapping_mul(base as i64).wrapping_add(d as i64);
    }
    Some(if neg { n.wrapping_neg() } else { n })
}

// assert(v [, message, ...])
fn base_assert(ls: &mut LuaState) -> LuaResult<usize> {
    check_any(ls, 1, "assert")?;
    if ls.to_boolean(1) {
        return Ok(ls.get_top() as usize);
    }
    let msg = ls.to_str(2).unwrap_or_else(|| "assertion failed!".to_string());
    Err(LuaError::Runtime(msg))
}

// error(message)
fn base_error(ls: &mut LuaState) -> LuaResult<usize> {
    let msg = ls.to_str(1).unwrap_or_else(|| ls.to_value(1).to_string());
    Err(LuaError::Runtime(msg))
}

// next(table [, index])
fn base_next(ls: &mut LuaState) -> LuaResult<usize> {
    check_table(ls, 1, "next")?;
    ls.set_top(2)?;
    if ls.next(1)? {
        Ok(2)
    } else {
        ls.push_nil()?;
        Ok(1)
    }
}

// pairs(t) -> next, t, nil
fn base_pairs(ls: &mut LuaState) -> LuaResult<usize> {
    check_table(ls, 1, "pairs")?;
    ls.push_host_function(base_next)?;
    ls.push_value(1)?;
    ls.push_nil()?;
    Ok(3)
}

// ipairs(t) -> iterator, t, 0
fn base_ipairs(ls: &mut LuaState) -> LuaResult<usize> {
    check_any(ls, 1, "ipairs")?;
    ls.push_host_function(ipairs_aux)?;
    ls.push_value(1)?;
    ls.push_integer(0)?;
    Ok(3)
}

fn ipairs_aux(ls: &mut LuaState) -> LuaResult<usize> {
    let i = ls.to_integer(2).wrapping_add(1);
    ls.push_integer(i)?;
    if ls.get_i(1, i)? == LuaType::Nil {
        Ok(1)
    } else {
        Ok(2)
    }
}

// select(n, ...)
fn base_select(ls: &mut LuaState) -> LuaResult<usize> {
    let top = ls.get_top();
    if let LuaValue::String(s) = ls.to_value(1) {
        if &*s == b"#" {
            ls.push_integer(top as i64 - 1)?;
            return Ok(1);
        }
    }
    let mut i = ls
        .to_integer_x(1)
        .ok_or_else(|| bad_argument(1, "select", "number expected"))? as isize;
    if i < 0 {
        i += top;
    } else if i > top {
        i = top;
    }
    if i < 1 {
        return Err(bad_argument(1, "select", "index out of range"));
    }
    Ok((top - i) as usize)
}
