use crate::flatten::Slot;
use crate::token::{self, TokenInt, TokenType, EXTENDED_SIZE};
use crate::trailer::{Trailer, HEADER_LEN, MAGIC, TRAILER_LEN};
use crate::widths::ByteWidth;
use crate::DecodeOptions;
use anyhow::{anyhow, Result};
use bplist_types::{Array, Date, Dict, Uid, Value};
use itertools::Itertools;
use std::io::{Cursor, Read};
use std::mem;
use std::rc::Rc;
use std::vec;
use tracing::debug;

/// A container that has been registered in the memo table but whose members are still being read.
struct Frame {
    slot: Slot,
    pending: Pending,
    refs: vec::IntoIter<Slot>,
}

enum Pending {
    Array(Array),
    /// Refs alternate key, value. A key waits here for its value.
    Dict { dict: Dict, key: Option<Value> },
}

impl Frame {
    fn accept(&mut self, member: Value) {
        match &mut self.pending {
            Pending::Array(arr) => arr.push(member),
            Pending::Dict { dict, key } => match key.take() {
                None => *key = Some(member),
                Some(k) => {
                    dict.insert(k, member);
                }
            },
        }
    }
}

/// Random-access reader over one binary plist.
struct PlistReader<'b> {
    buf: &'b [u8],
    trailer: Trailer,
    offsets: Vec<u64>,
    memo: Vec<Option<Value>>,
}

impl<'b> PlistReader<'b> {
    fn new(buf: &'b [u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN + TRAILER_LEN {
            return Err(anyhow!("{} bytes is too short", buf.len()));
        }
        if &buf[..HEADER_LEN] != MAGIC {
            return Err(anyhow!("Missing {:?} header", MAGIC));
        }

        let trailer = Trailer::deser(buf)?;
        trailer.validate(buf.len())?;

        let num_objects = trailer.num_objects as usize;
        let mut r = Cursor::new(buf);
        r.set_position(trailer.offset_table_start);
        let mut offsets = Vec::with_capacity(num_objects);
        for slot in 0..num_objects {
            let offset = trailer.offset_size.deser(&mut r)?;
            if offset < HEADER_LEN as u64 || offset >= trailer.offset_table_start {
                return Err(anyhow!("Object {slot} is at out-of-range offset {offset}"));
            }
            offsets.push(offset);
        }

        Ok(Self {
            buf,
            trailer,
            offsets,
            memo: vec![None; num_objects],
        })
    }

    fn deser_root(&mut self, opts: &DecodeOptions) -> Result<Value> {
        let mut stack: Vec<Frame> = vec![];
        /* Slots of the containers on the stack, i.e. the ancestors of the next member. */
        let mut filling = vec![false; self.memo.len()];
        let push = |stack: &mut Vec<Frame>, filling: &mut [bool], frame: Frame| {
            if stack.len() >= opts.max_depth {
                return Err(anyhow!("Nesting is deeper than {} levels", opts.max_depth));
            }
            filling[frame.slot] = true;
            stack.push(frame);
            Ok(())
        };

        let (root, root_frame) = self.deser_slot(self.trailer.root_object as usize)?;
        if let Some(frame) = root_frame {
            push(&mut stack, &mut filling, frame)?;
        }

        while let Some(frame) = stack.last_mut() {
            match frame.refs.next() {
                Some(slot) => {
                    if opts.reject_cycles && filling[slot] {
                        return Err(anyhow!(
                            "Object {} refers back to its ancestor {slot}",
                            frame.slot
                        ));
                    }
                    let (member, member_frame) = self.deser_slot(slot)?;
                    frame.accept(member);
                    if let Some(member_frame) = member_frame {
                        push(&mut stack, &mut filling, member_frame)?;
                    }
                }
                None => {
                    if let Some(frame) = stack.pop() {
                        filling[frame.slot] = false;
                    }
                }
            }
        }

        Ok(root)
    }

    /// Returns the memoized value if the slot was read before.
    /// Otherwise reads the slot's token. A container is memoized before its members are read,
    /// and is returned along with the [`Frame`] that will fill it.
    fn deser_slot(&mut self, slot: Slot) -> Result<(Value, Option<Frame>)> {
        let memoized = self
            .memo
            .get(slot)
            .ok_or_else(|| anyhow!("Object ref {slot} is out of range"))?;
        if let Some(val) = memoized {
            return Ok((val.clone(), None));
        }

        let mut r = Cursor::new(self.buf);
        r.set_position(self.offsets[slot]);

        let (_, tok) = TokenInt::deser(&mut r)?;
        let tok_type = TokenType::try_from(tok)?;
        let unknown = || anyhow!("Unknown token {:#04x} at object {slot}", *tok);

        let (val, frame) = match tok_type {
            TokenType::Singleton => {
                let val = match *tok {
                    token::NULL => Value::Null,
                    token::FALSE => Value::Bool(false),
                    token::TRUE => Value::Bool(true),
                    token::EMPTY_BYTES => Value::Bytes(Rc::from(Vec::new())),
                    _ => return Err(unknown()),
                };
                (val, None)
            }
            TokenType::Int => (Value::Int(Self::deser_int(&mut r, tok.low())?), None),
            TokenType::Real => {
                let f = match *tok {
                    token::REAL_32 => f32::from_be_bytes(Self::deser_array(&mut r)?) as f64,
                    token::REAL_64 => f64::from_be_bytes(Self::deser_array(&mut r)?),
                    _ => return Err(unknown()),
                };
                (Value::Real(f), None)
            }
            TokenType::Date => {
                if *tok != token::DATE {
                    return Err(unknown());
                }
                let secs = f64::from_be_bytes(Self::deser_array(&mut r)?);
                (Value::Date(Date::from_plist_secs(secs)?), None)
            }
            TokenType::Bytes => {
                let len = Self::deser_size(&mut r, tok.low())?;
                (Value::Bytes(Rc::from(Self::deser_bytes(&mut r, len)?)), None)
            }
            TokenType::AsciiStr => {
                let len = Self::deser_size(&mut r, tok.low())?;
                let body = Self::deser_bytes(&mut r, len)?;
                if !body.is_ascii() {
                    return Err(anyhow!("Non-ASCII byte in ASCII string at object {slot}"));
                }
                (Value::Str(Rc::from(String::from_utf8(body)?)), None)
            }
            TokenType::Utf16Str => {
                let units_ct = Self::deser_size(&mut r, tok.low())?;
                let byte_len = units_ct
                    .checked_mul(mem::size_of::<u16>())
                    .ok_or_else(|| anyhow!("UTF-16 string of {units_ct} units is too long"))?;
                let body = Self::deser_bytes(&mut r, byte_len)?;
                let units = body
                    .chunks_exact(mem::size_of::<u16>())
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect::<Vec<_>>();
                (Value::Str(Rc::from(String::from_utf16(&units)?)), None)
            }
            TokenType::Uid => {
                let width = ByteWidth::from_trailer(tok.low() + 1)?;
                let int = width.deser(&mut r)?;
                (Value::Uid(Uid::from(int)), None)
            }
            TokenType::Array => {
                let members_ct = Self::deser_size(&mut r, tok.low())?;
                let refs = self.deser_refs(&mut r, members_ct)?;
                let arr = Array::with_capacity(members_ct);
                let frame = Frame {
                    slot,
                    pending: Pending::Array(arr.clone()),
                    refs: refs.into_iter(),
                };
                (Value::Array(arr), Some(frame))
            }
            TokenType::Dict => {
                let entries_ct = Self::deser_size(&mut r, tok.low())?;
                let key_refs = self.deser_refs(&mut r, entries_ct)?;
                let val_refs = self.deser_refs(&mut r, entries_ct)?;
                let dict = Dict::new();
                let frame = Frame {
                    slot,
                    pending: Pending::Dict {
                        dict: dict.clone(),
                        key: None,
                    },
                    refs: key_refs.into_iter().interleave(val_refs).collect_vec().into_iter(),
                };
                (Value::Dict(dict), Some(frame))
            }
        };

        self.memo[slot] = Some(val.clone());
        Ok((val, frame))
    }

    /// The payload is `2^low` bytes wide, and is signed from 8 bytes up.
    fn deser_int(r: &mut Cursor<&[u8]>, low: u8) -> Result<i128> {
        let i = match low {
            0..=2 => ByteWidth::from_exponent(low)?.deser(r)? as i128,
            3 => i64::from_be_bytes(Self::deser_array(r)?) as i128,
            4 => i128::from_be_bytes(Self::deser_array(r)?),
            _ => return Err(anyhow!("Unsupported int width {} bytes", 1u64 << low)),
        };
        Ok(i)
    }

    /// A count below 15 lives in the low nibble. Otherwise it follows as an int sub-token.
    fn deser_size(r: &mut Cursor<&[u8]>, low: u8) -> Result<usize> {
        if low != EXTENDED_SIZE {
            return Ok(low as usize);
        }
        let (_, size_tok) = TokenInt::deser(r)?;
        if size_tok.high() != TokenType::Int as u8 {
            return Err(anyhow!("Bad size token {:#04x}", *size_tok));
        }
        let width = ByteWidth::from_exponent(size_tok.low())?;
        let size = width.deser(r)?;
        Ok(usize::try_from(size)?)
    }

    fn deser_array<const LEN: usize>(r: &mut Cursor<&[u8]>) -> Result<[u8; LEN]> {
        let mut buf = [0u8; LEN];
        r.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Checks `len` against the remaining bytes before allocating.
    fn deser_bytes(r: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>> {
        let remaining = (r.get_ref().len() as u64).saturating_sub(r.position());
        if len as u64 > remaining {
            return Err(anyhow!("{len} bytes requested, {remaining} remain"));
        }
        let mut buf = vec![0u8; len];
        r.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn deser_refs(&self, r: &mut Cursor<&[u8]>, count: usize) -> Result<Vec<Slot>> {
        let ref_size = self.trailer.ref_size;
        let body = count
            .checked_mul(ref_size.byte_len())
            .ok_or_else(|| anyhow!("{count} refs is too many"))
            .and_then(|len| Self::deser_bytes(r, len))?;

        let mut body_r = Cursor::new(&body[..]);
        let mut refs = Vec::with_capacity(count);
        for _ in 0..count {
            let slot = ref_size.deser(&mut body_r)?;
            if slot >= self.trailer.num_objects {
                return Err(anyhow!(
                    "Object ref {slot} is out of {} objects",
                    self.trailer.num_objects
                ));
            }
            refs.push(slot as usize);
        }
        Ok(refs)
    }
}

/// Deserializes one binary plist held entirely in `buf`.
pub fn deser(buf: &[u8], opts: &DecodeOptions) -> Result<Value> {
    let mut reader = PlistReader::new(buf)?;
    let root = reader.deser_root(opts)?;

    debug!(
        num_objects = reader.trailer.num_objects,
        ref_size = *reader.trailer.ref_size,
        offset_size = *reader.trailer.offset_size,
        r_len = buf.len(),
        "Decoded binary plist"
    );
    Ok(root)
}
