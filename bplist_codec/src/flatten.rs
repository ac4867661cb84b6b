use crate::EncodeOptions;
use anyhow::Result;
use bplist_types::{Array, ContainerId, Dict, PlistError, ScalarKey, Value, ValueKey};
use shorthand::ShortHand;
use std::collections::HashMap;
use std::vec;
use tracing::trace;

/// An index into an [`ObjectTable`].
pub type Slot = usize;

#[derive(PartialEq, Debug)]
pub enum Object {
    Scalar(ScalarKey),
    Array(Vec<Slot>),
    Dict { keys: Vec<Slot>, vals: Vec<Slot> },
}

/// A value graph flattened into a sequence of objects, in depth-first first-encounter order.
///
/// Equal scalars share one slot. Containers share a slot only if they are the same instance.
#[derive(ShortHand)]
#[shorthand(disable(get))]
pub struct ObjectTable {
    #[shorthand(enable(get))]
    objects: Vec<Object>,
    root: Slot,
    scalar_slots: HashMap<ScalarKey, Slot>,
    container_slots: HashMap<ContainerId, Slot>,
}

/// A container whose members are being visited.
struct Frame {
    slot: Slot,
    members: vec::IntoIter<Value>,
    member_slots: Vec<Slot>,
    dict_key_count: Option<usize>,
}

impl Frame {
    fn array(slot: Slot, members: Vec<Value>) -> Self {
        Self {
            slot,
            member_slots: Vec::with_capacity(members.len()),
            members: members.into_iter(),
            dict_key_count: None,
        }
    }

    /// Members are all keys, then all values.
    fn dict(slot: Slot, dict: &Dict, opts: &EncodeOptions) -> Result<Self> {
        let mut entries = Vec::with_capacity(dict.len());
        for (k, v) in dict.entries() {
            match k {
                Value::Str(_) => entries.push((k, v)),
                _ if opts.skip_keys => trace!(kind = k.kind_name(), "Skipping non-string dict key"),
                _ => {
                    return Err(PlistError::Type(format!(
                        "Dict keys must be strings, not {}",
                        k.kind_name()
                    ))
                    .into())
                }
            }
        }
        if opts.sort_keys {
            entries.sort_by(|(k1, _), (k2, _)| k1.as_str().cmp(&k2.as_str()));
        }

        let key_count = entries.len();
        let (keys, vals): (Vec<Value>, Vec<Value>) = entries.into_iter().unzip();
        let mut frame = Self::array(slot, keys.into_iter().chain(vals).collect());
        frame.dict_key_count = Some(key_count);
        Ok(frame)
    }

    fn into_object(self) -> Object {
        match self.dict_key_count {
            None => Object::Array(self.member_slots),
            Some(key_count) => {
                let mut keys = self.member_slots;
                let vals = keys.split_off(key_count);
                Object::Dict { keys, vals }
            }
        }
    }
}

impl ObjectTable {
    pub fn flatten(root: &Value, opts: &EncodeOptions) -> Result<Self> {
        let mut table = Self {
            objects: vec![],
            root: 0,
            scalar_slots: HashMap::new(),
            container_slots: HashMap::new(),
        };

        let mut stack = vec![];
        let (root_slot, root_frame) = table.visit(root, opts)?;
        table.root = root_slot;
        stack.extend(root_frame);

        while let Some(frame) = stack.last_mut() {
            match frame.members.next() {
                Some(member) => {
                    let (slot, member_frame) = table.visit(&member, opts)?;
                    frame.member_slots.push(slot);
                    stack.extend(member_frame);
                }
                None => {
                    if let Some(frame) = stack.pop() {
                        let slot = frame.slot;
                        table.objects[slot] = frame.into_object();
                    }
                }
            }
        }

        Ok(table)
    }

    fn visit(&mut self, val: &Value, opts: &EncodeOptions) -> Result<(Slot, Option<Frame>)> {
        match ValueKey::from(val) {
            ValueKey::Scalar(sk) => {
                if let Some(slot) = self.scalar_slots.get(&sk) {
                    return Ok((*slot, None));
                }
                let slot = self.objects.len();
                self.objects.push(Object::Scalar(sk.clone()));
                self.scalar_slots.insert(sk, slot);
                Ok((slot, None))
            }
            ValueKey::Container(cid) => {
                if let Some(slot) = self.container_slots.get(&cid) {
                    return Ok((*slot, None));
                }
                /* Registered before the members are visited, so that a cycle resolves to this slot. */
                let slot = self.objects.len();
                self.objects.push(Object::Array(vec![]));
                self.container_slots.insert(cid, slot);

                let frame = match val {
                    Value::Dict(dict) => Frame::dict(slot, dict, opts)?,
                    _ => Frame::array(slot, val.as_array().map(Array::to_vec).unwrap_or_default()),
                };
                Ok((slot, Some(frame)))
            }
        }
    }

    pub fn root(&self) -> Slot {
        self.root
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// The slot that `val` occupies, if `val` is part of the flattened graph.
    pub fn slot_of(&self, val: &Value) -> Option<Slot> {
        match ValueKey::from(val) {
            ValueKey::Scalar(sk) => self.scalar_slots.get(&sk).copied(),
            ValueKey::Container(cid) => self.container_slots.get(&cid).copied(),
        }
    }
}
