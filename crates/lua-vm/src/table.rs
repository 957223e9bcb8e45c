use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use lua_core::{LuaError, LuaResult};

use crate::closure::Closure;
use crate::value::{float_to_integer, LuaValue};

pub type TableRef = Rc<RefCell<LuaTable>>;

pub fn new_table(narr: usize, nrec: usize) -> TableRef {
    Rc::new(RefCell::new(LuaTable::with_capacity(narr, nrec)))
}

/// A Lua table: an associative array keyed by any non-nil, non-NaN value.
///
/// Stores integer keys 1..n in a compact `array` part for fast sequential access;
/// everything else goes into the `hash` part. The hash part never holds the
/// key `n + 1`, so appends always land in the array.
#[derive(Debug, Default)]
pub struct LuaTable {
    array: Vec<LuaValue>, // 1-indexed: array[i-1] = t[i]
    hash: HashMap<HashKey, LuaValue>,
    /// Hash-part traversal order for `next`, built when a traversal starts
    /// and dropped whenever a new key is inserted.
    order: Option<Traversal>,
}

#[derive(Debug, Default)]
struct Traversal {
    keys: Vec<HashKey>,
    position: HashMap<HashKey, usize>,
}

/// Keys that can be stored in the hash part of a table.
///
/// Floats with an integral value are normalised to `Int` before they get here;
/// tables and functions hash by identity.
#[derive(Clone)]
pub enum HashKey {
    Int(i64),
    Float(u64),
    Str(Rc<[u8]>),
    Bool(bool),
    Table(TableRef),
    Function(Rc<Closure>),
}

impl HashKey {
    /// Normalise a value into a key, rejecting nil and NaN.
    pub fn from_value(v: &LuaValue) -> LuaResult<HashKey> {
        Ok(match v {
            LuaValue::Nil => return Err(LuaError::NilIndex),
            LuaValue::Integer(n) => HashKey::Int(*n),
            LuaValue::Float(f) if f.is_nan() => return Err(LuaError::NanIndex),
            LuaValue::Float(f) => match float_to_integer(*f) {
                Some(n) => HashKey::Int(n),
                None => HashKey::Float(f.to_bits()),
            },
            LuaValue::String(s) => HashKey::Str(s.clone()),
            LuaValue::Boolean(b) => HashKey::Bool(*b),
            LuaValue::Table(t) => HashKey::Table(t.clone()),
            LuaValue::Function(c) => HashKey::Function(c.clone()),
        })
    }

    pub fn to_value(&self) -> LuaValue {
        match self {
            HashKey::Int(n) => LuaValue::Integer(*n),
            HashKey::Float(bits) => LuaValue::Float(f64::from_bits(*bits)),
            HashKey::Str(s) => LuaValue::String(s.clone()),
            HashKey::Bool(b) => LuaValue::Boolean(*b),
            HashKey::Table(t) => LuaValue::Table(t.clone()),
            HashKey::Function(c) => LuaValue::Function(c.clone()),
        }
    }

    fn identity(&self) -> Option<usize> {
        match self {
            HashKey::Table(t) => Some(Rc::as_ptr(t) as *const () as usize),
            HashKey::Function(c) => Some(Rc::as_ptr(c) as *const () as usize),
            _ => None,
        }
    }
}

impl fmt::Debug for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashKey({:?})", self.to_value())
    }
}

impl PartialEq for HashKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HashKey::Int(a), HashKey::Int(b)) => a == b,
            (HashKey::Float(a), HashKey::Float(b)) => a == b,
            (HashKey::Str(a), HashKey::Str(b)) => a == b,
            (HashKey::Bool(a), HashKey::Bool(b)) => a == b,
            (HashKey::Table(a), HashKey::Table(b)) => Rc::ptr_eq(a, b),
            (HashKey::Function(a), HashKey::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for HashKey {}

impl Hash for HashKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            HashKey::Int(n) => n.hash(state),
            HashKey::Float(bits) => bits.hash(state),
            HashKey::Str(s) => s.hash(state),
            HashKey::Bool(b) => b.hash(state),
            HashKey::Table(_) | HashKey::Function(_) => self.identity().hash(state),
        }
    }
}

impl LuaTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(narr: usize, nrec: usize) -> Self {
        Self {
            array: Vec::with_capacity(narr),
            hash: HashMap::with_capacity(nrec),
            order: None,
        }
    }

    /// Read `t[key]`. Returns `LuaValue::Nil` for missing keys, including
    /// keys that could never be stored.
    pub fn get(&self, key: &LuaValue) -> LuaValue {
        match HashKey::from_value(key) {
            Ok(hk) => self.get_key(&hk),
            Err(_) => LuaValue::Nil,
        }
    }

    pub fn get_int(&self, i: i64) -> LuaValue {
        self.get_key(&HashKey::Int(i))
    }

    fn get_key(&self, key: &HashKey) -> LuaValue {
        if let HashKey::Int(i) = key {
            if let Some(slot) = self.array_slot(*i) {
                return self.array[slot].clone();
            }
        }
        self.hash.get(key).cloned().unwrap_or_default()
    }

    fn array_slot(&self, i: i64) -> Option<usize> {
        (i >= 1 && (i as u64) <= self.array.len() as u64).then(|| (i - 1) as usize)
    }

    /// Write `t[key] = val`. Setting to nil deletes the entry.
    pub fn put(&mut self, key: LuaValue, val: LuaValue) -> LuaResult<()> {
        let key = HashKey::from_value(&key)?;
        self.put_key(key, val);
        Ok(())
    }

    /// `t[name] = val`; string keys are always valid.
    pub fn set_field(&mut self, name: &str, val: LuaValue) {
        self.put_key(HashKey::Str(Rc::from(name.as_bytes())), val);
    }

    /// `t[i] = val`; integer keys are always valid.
    pub fn set_int(&mut self, i: i64, val: LuaValue) {
        self.put_key(HashKey::Int(i), val);
    }

    fn put_key(&mut self, key: HashKey, val: LuaValue) {
        if let HashKey::Int(i) = key {
            if let Some(slot) = self.array_slot(i) {
                self.array[slot] = val;
                if slot + 1 == self.array.len() {
                    self.shrink_array();
                }
                return;
            }
            if i >= 1 && i as u64 == self.array.len() as u64 + 1 {
                if !val.is_nil() {
                    self.array.push(val);
                    // Drain consecutive integer keys from hash into array
                    self.expand_array();
                }
                return;
            }
        }
        if val.is_nil() {
            self.hash.remove(&key);
        } else if self.hash.insert(key, val).is_none() {
            self.order = None;
        }
    }

    /// Lua-style length: the border of the array part.
    pub fn length(&self) -> usize {
        self.array.len()
    }

    /// Drop trailing nils left by a write at the end of the array part.
    fn shrink_array(&mut self) {
        while matches!(self.array.last(), Some(LuaValue::Nil)) {
            self.array.pop();
        }
    }

    /// After a new integer key extends the array part, pull consecutive keys
    /// from the hash part into the array to keep the invariant.
    fn expand_array(&mut self) {
        loop {
            let next = HashKey::Int(self.array.len() as i64 + 1);
            match self.hash.remove(&next) {
                Some(v) => self.array.push(v),
                None => break,
            }
        }
    }

    /// The entry following `key` in traversal order: the array part first,
    /// then the hash part. `Nil` starts a traversal; `None` marks its end.
    pub fn next(&mut self, key: &LuaValue) -> LuaResult<Option<(LuaValue, LuaValue)>> {
        let array_start = match key {
            LuaValue::Nil => Some(0),
            _ => match HashKey::from_value(key)? {
                HashKey::Int(i) => self.array_slot(i).map(|slot| slot + 1),
                _ => None,
            },
        };

        let hash_start = match array_start {
            Some(start) => {
                if let Some(found) = self.array_entry_from(start) {
                    return Ok(Some(found));
                }
                if key.is_nil() || self.order.is_none() {
                    self.order = Some(self.traversal());
                }
                0
            }
            None => {
                let hk = HashKey::from_value(key)?;
                if self.order.is_none() {
                    self.order = Some(self.traversal());
                }
                match self.order.as_ref().and_then(|o| o.position.get(&hk)) {
                    Some(pos) => pos + 1,
                    None => return Err(LuaError::Runtime("invalid key to 'next'".into())),
                }
            }
        };

        let Some(order) = &self.order else {
            return Ok(None);
        };
        for k in &order.keys[hash_start..] {
            match self.hash.get(k) {
                Some(v) if !v.is_nil() => return Ok(Some((k.to_value(), v.clone()))),
                _ => {}
            }
        }
        Ok(None)
    }

    fn array_entry_from(&self, start: usize) -> Option<(LuaValue, LuaValue)> {
        self.array
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, v)| !v.is_nil())
            .map(|(i, v)| (LuaValue::Integer(i as i64 + 1), v.clone()))
    }

    fn traversal(&self) -> Traversal {
        let keys: Vec<HashKey> = self.hash.keys().cloned().collect();
        let position = keys.iter().cloned().enumerate().map(|(i, k)| (k, i)).collect();
        Traversal { keys, position }
    }
}
