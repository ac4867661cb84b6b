use crate::{Date, Uid, Value};
use std::rc::Rc;

/// Content of a scalar [`Value`], usable as a hash key.
/// Cloning shares the byte and text payloads.
///
/// The kind participates in equality, so `Int(1)`, `Real(1.0)` and `Bool(true)` are three keys.
/// `Real` compares by IEEE-754 bit pattern.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub enum ScalarKey {
    Null,
    Bool(bool),
    Int(i128),
    Real(u64),
    Date(Date),
    Bytes(Rc<[u8]>),
    Str(Rc<str>),
    Uid(Uid),
}

/// Identity of a container instance. Only meaningful while the instance is alive.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum ContainerId {
    Array(usize),
    Dict(usize),
}

#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub enum ValueKey {
    Scalar(ScalarKey),
    Container(ContainerId),
}

impl From<&Value> for ValueKey {
    fn from(val: &Value) -> Self {
        let sk = match val {
            Value::Null => ScalarKey::Null,
            Value::Bool(b) => ScalarKey::Bool(*b),
            Value::Int(i) => ScalarKey::Int(*i),
            Value::Real(f) => ScalarKey::Real(f.to_bits()),
            Value::Date(d) => ScalarKey::Date(*d),
            Value::Bytes(b) => ScalarKey::Bytes(b.clone()),
            Value::Str(s) => ScalarKey::Str(s.clone()),
            Value::Uid(u) => ScalarKey::Uid(*u),
            Value::Array(arr) => return ValueKey::Container(arr.container_id()),
            Value::Dict(dict) => return ValueKey::Container(dict.container_id()),
        };
        ValueKey::Scalar(sk)
    }
}

impl From<&str> for ValueKey {
    fn from(s: &str) -> Self {
        ValueKey::Scalar(ScalarKey::Str(Rc::from(s)))
    }
}
