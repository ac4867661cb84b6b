use anyhow::{anyhow, Result};
use bplist_types::PlistError;
use derive_more::Deref;
use std::io::{self, Read, Write};
use std::mem;

/// The byte width of a big-endian unsigned integer field:
/// an object reference, an offset-table entry, or a size sub-token payload.
#[derive(Deref, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct ByteWidth(u8);
impl ByteWidth {
    /// The narrowest of 1, 2, 4, 8 bytes for a table of `count` slots.
    /// Also the narrowest width able to hold the value `count` itself.
    pub fn for_count(count: u64) -> Self {
        let w = if count < 1 << 8 {
            1
        } else if count < 1 << 16 {
            2
        } else if count < 1 << 32 {
            4
        } else {
            8
        };
        Self(w)
    }

    /// Trailers may carry any width in `1..=8`.
    pub fn from_trailer(w: u8) -> Result<Self> {
        if (1..=mem::size_of::<u64>() as u8).contains(&w) {
            Ok(Self(w))
        } else {
            Err(anyhow!("Unsupported field width {w}"))
        }
    }

    /// The width announced by the low nibble of a size sub-token.
    pub fn from_exponent(exp: u8) -> Result<Self> {
        match exp {
            0..=3 => Ok(Self(1 << exp)),
            _ => Err(anyhow!("Unsupported size exponent {exp}")),
        }
    }

    /// `log2(width)`. Only meaningful for the power-of-two widths chosen by [`Self::for_count`].
    pub fn exponent(&self) -> u8 {
        self.0.trailing_zeros() as u8
    }

    pub fn byte_len(&self) -> usize {
        self.0 as usize
    }

    pub fn ser(&self, int: u64, w: &mut impl Write) -> Result<usize> {
        let buf = int.to_be_bytes();
        let skip = buf.len() - self.byte_len();
        if buf[..skip].iter().any(|b| *b != 0) {
            return Err(PlistError::Overflow(format!(
                "{int} does not fit in {} bytes",
                self.0
            ))
            .into());
        }
        w.write_all(&buf[skip..])?;
        Ok(self.byte_len())
    }

    pub fn deser(&self, r: &mut impl Read) -> Result<u64, io::Error> {
        let mut buf = [0u8; mem::size_of::<u64>()];
        let skip = buf.len() - self.byte_len();
        r.read_exact(&mut buf[skip..])?;
        Ok(u64::from_be_bytes(buf))
    }
}
