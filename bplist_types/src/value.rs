use crate::ds_n_a::OrderedDict;
use crate::{ContainerId, PlistError, ValueKey};
use anyhow::Result;
use chrono::{DateTime, SubsecRound, Utc};
use derive_more::{Deref, From, Into};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::mem;
use std::rc::Rc;

#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i128),
    Real(f64),
    Date(Date),
    /// Shared, so that a repeated reference costs a refcount bump.
    Bytes(Rc<[u8]>),
    Str(Rc<str>),
    Uid(Uid),
    Array(Array),
    Dict(Dict),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Real(_) => "real",
            Value::Date(_) => "date",
            Value::Bytes(_) => "bytes",
            Value::Str(_) => "str",
            Value::Uid(_) => "uid",
            Value::Array(_) => "array",
            Value::Dict(_) => "dict",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }
}

/* Conversions from native types. */
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i128)
    }
}
impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i as i128)
    }
}
impl From<u64> for Value {
    fn from(i: u64) -> Self {
        Value::Int(i as i128)
    }
}
impl From<i128> for Value {
    fn from(i: i128) -> Self {
        Value::Int(i)
    }
}
impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}
impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(Rc::from(b))
    }
}
impl From<Date> for Value {
    fn from(d: Date) -> Self {
        Value::Date(d)
    }
}
impl From<Uid> for Value {
    fn from(u: Uid) -> Self {
        Value::Uid(u)
    }
}
impl From<Array> for Value {
    fn from(arr: Array) -> Self {
        Value::Array(arr)
    }
}
impl From<Dict> for Value {
    fn from(dict: Dict) -> Self {
        Value::Dict(dict)
    }
}
impl From<Vec<Value>> for Value {
    fn from(members: Vec<Value>) -> Self {
        Value::Array(Array::from(members))
    }
}

/// A reference id, as used by keyed archives. Distinct from [`Value::Int`].
#[derive(From, Into, Deref, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub struct Uid(u64);

impl TryFrom<i128> for Uid {
    type Error = anyhow::Error;
    fn try_from(i: i128) -> Result<Self> {
        let int = u64::try_from(i)
            .map_err(|_| PlistError::Overflow(format!("UID {i} is outside [0, 2^64)")))?;
        Ok(Self(int))
    }
}

/// Seconds between the unix epoch and 2001-01-01T00:00:00Z.
const PLIST_EPOCH_UNIX_SECS: i64 = 978_307_200;
const MICROS_PER_SEC: i64 = 1_000_000;

/// An instant at microsecond resolution, the finest the binary format carries.
#[derive(Into, Deref, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub struct Date(DateTime<Utc>);

/// Truncates to whole microseconds.
impl From<DateTime<Utc>> for Date {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.trunc_subsecs(6))
    }
}

impl Date {
    /// Seconds since 2001-01-01T00:00:00Z.
    pub fn to_plist_secs(&self) -> Result<f64> {
        let out_of_range = || PlistError::Overflow(format!("Date {} is out of range", self.0));
        let micros = self
            .0
            .timestamp()
            .checked_sub(PLIST_EPOCH_UNIX_SECS)
            .and_then(|secs| secs.checked_mul(MICROS_PER_SEC))
            .and_then(|micros| micros.checked_add(self.0.timestamp_subsec_micros() as i64))
            .ok_or_else(out_of_range)?;
        Ok(micros as f64 / MICROS_PER_SEC as f64)
    }

    /// Rounds to the nearest microsecond.
    pub fn from_plist_secs(secs: f64) -> Result<Self> {
        let out_of_range = || PlistError::Overflow(format!("Date offset {secs} is out of range"));
        let rel_micros = (secs * MICROS_PER_SEC as f64).round();
        if !rel_micros.is_finite() || rel_micros.abs() >= i64::MAX as f64 {
            return Err(out_of_range().into());
        }
        let dt = (rel_micros as i64)
            .checked_add(PLIST_EPOCH_UNIX_SECS * MICROS_PER_SEC)
            .and_then(DateTime::<Utc>::from_timestamp_micros)
            .ok_or_else(out_of_range)?;
        Ok(Self(dt))
    }
}

/// A shared handle to an ordered sequence of [`Value`]s.
///
/// Clones share the same instance. Equality is structural.
#[derive(Clone, Default)]
pub struct Array(Rc<RefCell<Vec<Value>>>);

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self::from(Vec::with_capacity(cap))
    }

    pub fn push(&self, val: impl Into<Value>) {
        self.0.borrow_mut().push(val.into());
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, i: usize) -> Option<Value> {
        self.0.borrow().get(i).cloned()
    }

    pub fn borrow(&self) -> Ref<'_, Vec<Value>> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Vec<Value>> {
        self.0.borrow_mut()
    }

    /// A snapshot of the members. Nested containers are shared, not copied.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn container_id(&self) -> ContainerId {
        ContainerId::Array(Rc::as_ptr(&self.0) as *const () as usize)
    }

    fn take_if_last_handle(&self) -> Vec<Value> {
        if Rc::strong_count(&self.0) != 1 {
            return vec![];
        }
        self.0
            .try_borrow_mut()
            .map(|mut members| mem::take(&mut *members))
            .unwrap_or_default()
    }
}

impl Drop for Array {
    fn drop(&mut self) {
        drop_iteratively(self.take_if_last_handle());
    }
}

impl From<Vec<Value>> for Array {
    fn from(members: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(members)))
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Array) -> bool {
        self.ptr_eq(other) || *self.0.borrow() == *other.0.borrow()
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.borrow().iter()).finish()
    }
}

type DictEntries = OrderedDict<ValueKey, (Value, Value)>;

/// A shared handle to an insertion-ordered mapping.
///
/// Keys are unique by [`ValueKey`]: scalars by content, containers by identity.
/// Well-formed plists only use [`Value::Str`] keys; other keys are representable so that an
/// encoder can decide what to do with them.
/// Equality is structural and ignores entry order.
#[derive(Clone, Default)]
pub struct Dict(Rc<RefCell<DictEntries>>);

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the replaced value, if the key was present. An existing key keeps its position.
    pub fn insert(&self, k: impl Into<Value>, v: impl Into<Value>) -> Option<Value> {
        let k = k.into();
        let vk = ValueKey::from(&k);
        self.0
            .borrow_mut()
            .insert(vk, (k, v.into()))
            .map(|(_, old_v)| old_v)
    }

    pub fn get(&self, k: &Value) -> Option<Value> {
        self.get_by_key(&ValueKey::from(k))
    }

    pub fn get_str(&self, k: &str) -> Option<Value> {
        self.get_by_key(&ValueKey::from(k))
    }

    fn get_by_key(&self, vk: &ValueKey) -> Option<Value> {
        self.0.borrow().get(vk).map(|(_, v)| v.clone())
    }

    pub fn remove(&self, k: &Value) -> Option<Value> {
        self.0
            .borrow_mut()
            .remove(&ValueKey::from(k))
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// A snapshot of the entries, in insertion order. Nested containers are shared, not copied.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.0
            .borrow()
            .iter()
            .map(|(_, (k, v))| (k.clone(), v.clone()))
            .collect()
    }

    pub fn keys(&self) -> Vec<Value> {
        self.0.borrow().iter().map(|(_, (k, _))| k.clone()).collect()
    }

    pub fn ptr_eq(&self, other: &Dict) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn container_id(&self) -> ContainerId {
        ContainerId::Dict(Rc::as_ptr(&self.0) as *const () as usize)
    }

    fn take_if_last_handle(&self) -> Vec<Value> {
        if Rc::strong_count(&self.0) != 1 {
            return vec![];
        }
        self.0
            .try_borrow_mut()
            .map(|mut entries| {
                mem::take(&mut *entries)
                    .into_values()
                    .flat_map(|(k, v)| [k, v])
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Drop for Dict {
    fn drop(&mut self) {
        drop_iteratively(self.take_if_last_handle());
    }
}

/// Dropping a container releases its members here rather than through nested drop calls,
/// so that the stack depth does not grow with the nesting depth.
/// Containers that are still shared, including cyclic ones, are left alone.
fn drop_iteratively(mut pending: Vec<Value>) {
    while let Some(val) = pending.pop() {
        match val {
            Value::Array(arr) => pending.extend(arr.take_if_last_handle()),
            Value::Dict(dict) => pending.extend(dict.take_if_last_handle()),
            _ => {}
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Dict
where
    K: Into<Value>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let dict = Dict::new();
        for (k, v) in iter {
            dict.insert(k, v);
        }
        dict
    }
}

impl PartialEq for Dict {
    fn eq(&self, other: &Dict) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let slf = self.0.borrow();
        let oth = other.0.borrow();
        slf.len() == oth.len()
            && slf
                .iter()
                .all(|(vk, (_, v))| oth.get(vk).map_or(false, |(_, oth_v)| v == oth_v))
    }
}

impl fmt::Debug for Dict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.borrow().iter().map(|(_, (k, v))| (k, v)))
            .finish()
    }
}
