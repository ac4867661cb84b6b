//! # Serialization format
//!
//! A binary plist is a header, a sequence of objects, an offset table and a trailer.
//!
//! ```text
//! struct BinaryPlist {
//!     magic:          [u8; 8],                        // "bplist00"
//!     objects:        [Object; num_objects],
//!     offset_table:   [uint<offset_size>; num_objects],
//!     trailer:        Trailer,
//! }
//!
//! struct Trailer {
//!     reserved:               [u8; 5],
//!     sort_version:           u8,
//!     offset_size:            u8,
//!     ref_size:               u8,
//!     num_objects:            u64,
//!     root_object:            u64,
//!     offset_table_start:     u64,
//! }
//! ```
//!
//! All integers are big-endian. `offset_table[i]` is the absolute offset of object `i`.
//!
//! Every object starts with one token byte. The high nibble is the type;
//! the low nibble is either a subtype, a width exponent, or a count.
//!
//! ```text
//! 0000 0000                       null
//! 0000 1000                       false
//! 0000 1001                       true
//! 0000 1111                       empty bytes
//! 0001 nnnn   [u8; 2^nnnn]        int; unsigned below 8 bytes, signed from 8 bytes up
//! 0010 0010   [u8; 4]             f32
//! 0010 0011   [u8; 8]             f64
//! 0011 0011   [u8; 8]             date; f64 seconds since 2001-01-01T00:00:00Z
//! 0100 cccc   [u8; count]         bytes
//! 0101 cccc   [u8; count]         ASCII string
//! 0110 cccc   [u16; count]        UTF-16BE string
//! 1000 nnnn   [u8; nnnn + 1]      uid
//! 1010 cccc   [ref; count]        array
//! 1101 cccc   [ref; count] [ref; count]   dict; keys, then values
//! ```
//!
//! A count of 15 or more is written as `cccc = 1111`, followed by an int object holding the count.
//! A `ref` is a `uint<ref_size>` index into the offset table.
//!
//! Writing flattens the value graph first: equal scalars are written once,
//! and a container instance referenced from several places is written once.
//! `ref_size` is sized by the object count; `offset_size` by the offset table's own offset.

mod deser;
mod flatten;
mod options;
mod ser;
mod token;
mod trailer;
mod widths;

pub use flatten::*;
pub use options::*;
pub use ser::WriteLen;
pub use token::{TokenInt, TokenType};
pub use trailer::*;
pub use widths::*;

use anyhow::{Context, Result};
use bplist_types::{PlistError, Value};
use std::io::{Read, Write};

pub fn encode(root: &Value, opts: &EncodeOptions) -> Result<Vec<u8>> {
    let mut buf = vec![];
    ser::ser(root, &mut buf, opts)?;
    Ok(buf)
}

pub fn encode_to_writer(root: &Value, w: &mut impl Write, opts: &EncodeOptions) -> Result<WriteLen> {
    ser::ser(root, w, opts)
}

/// A file whose containers refer back to their ancestors decodes into a cyclic graph.
/// Such a graph is never freed unless the caller clears one of its containers.
/// Set [`DecodeOptions::reject_cycles`] to refuse such files instead.
pub fn decode(buf: &[u8]) -> Result<Value> {
    decode_with_options(buf, &DecodeOptions::default())
}

/// Every failure carries [`PlistError::InvalidFile`].
pub fn decode_with_options(buf: &[u8], opts: &DecodeOptions) -> Result<Value> {
    deser::deser(buf, opts).context(PlistError::InvalidFile)
}

/// Reads `r` to its end, then decodes.
pub fn decode_from_reader(mut r: impl Read, opts: &DecodeOptions) -> Result<Value> {
    let mut buf = vec![];
    r.read_to_end(&mut buf)?;
    decode_with_options(&buf, opts)
}
