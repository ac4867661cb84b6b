use crate::flatten::{Object, ObjectTable, Slot};
use crate::token::{self, TokenInt, TokenType, EXTENDED_SIZE};
use crate::trailer::{Trailer, MAGIC};
use crate::widths::ByteWidth;
use crate::EncodeOptions;
use anyhow::Result;
use bplist_types::{ScalarKey, Uid, Value};
use derive_more::Deref;
use std::io::Write;
use tracing::debug;

#[derive(Deref, Clone, Copy, PartialEq, Eq, Debug)]
pub struct WriteLen(usize);

/// Writes one flattened object graph, tracking the absolute offset of every byte written.
struct PlistWriter<'w, W: Write> {
    w: &'w mut W,
    w_len: usize,
}

impl<'w, W: Write> PlistWriter<'w, W> {
    fn put(&mut self, buf: &[u8]) -> Result<()> {
        self.w.write_all(buf)?;
        self.w_len += buf.len();
        Ok(())
    }

    fn put_token(&mut self, tok: TokenInt) -> Result<()> {
        self.put(&[*tok])
    }

    fn put_uint(&mut self, width: ByteWidth, int: u64) -> Result<()> {
        self.w_len += width.ser(int, &mut *self.w)?;
        Ok(())
    }

    /// A count below 15 lives in the low nibble. Otherwise it follows as an int sub-token.
    fn put_sized_token(&mut self, tok_type: TokenType, count: usize) -> Result<()> {
        if count < EXTENDED_SIZE as usize {
            return self.put_token(TokenInt::new(tok_type, count as u8));
        }
        self.put_token(TokenInt::new(tok_type, EXTENDED_SIZE))?;

        let count = count as u64;
        let width = ByteWidth::for_count(count);
        self.put_token(TokenInt::new(TokenType::Int, width.exponent()))?;
        self.put_uint(width, count)
    }

    fn put_refs(&mut self, ref_size: ByteWidth, slots: &[Slot]) -> Result<()> {
        for slot in slots {
            self.put_uint(ref_size, *slot as u64)?;
        }
        Ok(())
    }

    fn put_object(&mut self, obj: &Object, ref_size: ByteWidth) -> Result<()> {
        match obj {
            Object::Scalar(sk) => self.put_scalar(sk),
            Object::Array(members) => {
                self.put_sized_token(TokenType::Array, members.len())?;
                self.put_refs(ref_size, members)
            }
            Object::Dict { keys, vals } => {
                self.put_sized_token(TokenType::Dict, keys.len())?;
                self.put_refs(ref_size, keys)?;
                self.put_refs(ref_size, vals)
            }
        }
    }

    fn put_scalar(&mut self, sk: &ScalarKey) -> Result<()> {
        match sk {
            ScalarKey::Null => self.put(&[token::NULL]),
            ScalarKey::Bool(false) => self.put(&[token::FALSE]),
            ScalarKey::Bool(true) => self.put(&[token::TRUE]),
            ScalarKey::Int(i) => self.put_int(*i),
            ScalarKey::Real(bits) => {
                self.put(&[token::REAL_64])?;
                self.put(&f64::from_bits(*bits).to_be_bytes())
            }
            ScalarKey::Date(d) => {
                self.put(&[token::DATE])?;
                self.put(&d.to_plist_secs()?.to_be_bytes())
            }
            ScalarKey::Bytes(b) => {
                self.put_sized_token(TokenType::Bytes, b.len())?;
                self.put(b)
            }
            ScalarKey::Str(s) if s.is_ascii() => {
                self.put_sized_token(TokenType::AsciiStr, s.len())?;
                self.put(s.as_bytes())
            }
            ScalarKey::Str(s) => {
                let units = s.encode_utf16().collect::<Vec<_>>();
                self.put_sized_token(TokenType::Utf16Str, units.len())?;
                let buf = units
                    .iter()
                    .flat_map(|unit| unit.to_be_bytes())
                    .collect::<Vec<_>>();
                self.put(&buf)
            }
            ScalarKey::Uid(u) => self.put_uid(*u),
        }
    }

    /// Non-negative ints take the narrowest of 1, 2, 4, 8 bytes, where 8 bytes is signed.
    /// Negative ints take 8 signed bytes. Anything wider takes 16 signed bytes.
    fn put_int(&mut self, i: i128) -> Result<()> {
        if let Ok(u) = u64::try_from(i) {
            if u < 1 << 32 {
                let width = ByteWidth::for_count(u);
                self.put_token(TokenInt::new(TokenType::Int, width.exponent()))?;
                return self.put_uint(width, u);
            }
        }
        match i64::try_from(i) {
            Ok(i) => {
                self.put_token(TokenInt::new(TokenType::Int, 3))?;
                self.put(&i.to_be_bytes())
            }
            Err(_) => {
                self.put_token(TokenInt::new(TokenType::Int, 4))?;
                self.put(&i.to_be_bytes())
            }
        }
    }

    /// The payload is `low nibble + 1` bytes wide.
    fn put_uid(&mut self, u: Uid) -> Result<()> {
        let width = ByteWidth::for_count(*u);
        self.put_token(TokenInt::new(TokenType::Uid, *width - 1))?;
        self.put_uint(width, *u)
    }
}

/// Serializes the graph rooted at `root` as one binary plist.
pub fn ser(root: &Value, w: &mut impl Write, opts: &EncodeOptions) -> Result<WriteLen> {
    let table = ObjectTable::flatten(root, opts)?;
    let num_objects = table.len() as u64;
    let ref_size = ByteWidth::for_count(num_objects);

    let mut pw = PlistWriter { w, w_len: 0 };
    pw.put(MAGIC)?;

    /* objects */
    let mut offsets = Vec::with_capacity(table.len());
    for obj in table.objects() {
        offsets.push(pw.w_len as u64);
        pw.put_object(obj, ref_size)?;
    }

    /* offset table */
    let offset_table_start = pw.w_len as u64;
    let offset_size = ByteWidth::for_count(offset_table_start);
    for offset in offsets {
        pw.put_uint(offset_size, offset)?;
    }

    /* trailer */
    let trailer = Trailer {
        sort_version: 0,
        offset_size,
        ref_size,
        num_objects,
        root_object: table.root() as u64,
        offset_table_start,
    };
    pw.w_len += trailer.ser(&mut *pw.w)?;

    debug!(
        num_objects,
        ref_size = *ref_size,
        offset_size = *offset_size,
        w_len = pw.w_len,
        "Encoded binary plist"
    );
    Ok(WriteLen(pw.w_len))
}
