use crate::widths::ByteWidth;
use anyhow::{anyhow, Result};
use std::io::{Cursor, Read, Write};
use std::mem;

pub const MAGIC: &[u8; 8] = b"bplist00";
pub const HEADER_LEN: usize = MAGIC.len();
pub const TRAILER_LEN: usize = 32;

const TRAILER_PAD_LEN: usize = 5;

/// The fixed-size footer that locates the offset table and the root object.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Trailer {
    pub sort_version: u8,
    pub offset_size: ByteWidth,
    pub ref_size: ByteWidth,
    pub num_objects: u64,
    pub root_object: u64,
    pub offset_table_start: u64,
}

impl Trailer {
    pub fn ser(&self, w: &mut impl Write) -> Result<usize> {
        let mut w_len = 0;

        /* reserved */
        let pad = [0u8; TRAILER_PAD_LEN];
        w.write_all(&pad)?;
        w_len += pad.len();

        /* widths */
        let bytes = [self.sort_version, *self.offset_size, *self.ref_size];
        w.write_all(&bytes)?;
        w_len += bytes.len();

        /* table geometry */
        for int in [self.num_objects, self.root_object, self.offset_table_start] {
            let buf = int.to_be_bytes();
            w.write_all(&buf)?;
            w_len += buf.len();
        }

        Ok(w_len)
    }

    /// Parses the last [`TRAILER_LEN`] bytes of `buf`.
    pub fn deser(buf: &[u8]) -> Result<Self> {
        let trailer_start = buf
            .len()
            .checked_sub(TRAILER_LEN)
            .ok_or_else(|| anyhow!("{} bytes cannot hold a trailer", buf.len()))?;
        let mut r = Cursor::new(&buf[trailer_start..]);

        let mut bytes = [0u8; TRAILER_PAD_LEN + 3];
        r.read_exact(&mut bytes)?;
        let [.., sort_version, offset_size, ref_size] = bytes;

        let mut read_u64 = || -> Result<u64> {
            let mut buf = [0u8; mem::size_of::<u64>()];
            r.read_exact(&mut buf)?;
            Ok(u64::from_be_bytes(buf))
        };
        let num_objects = read_u64()?;
        let root_object = read_u64()?;
        let offset_table_start = read_u64()?;

        Ok(Self {
            sort_version,
            offset_size: ByteWidth::from_trailer(offset_size)?,
            ref_size: ByteWidth::from_trailer(ref_size)?,
            num_objects,
            root_object,
            offset_table_start,
        })
    }

    /// Checks that the described tables fit in a buffer of `buf_len` bytes.
    pub fn validate(&self, buf_len: usize) -> Result<()> {
        if self.num_objects == 0 {
            return Err(anyhow!("Trailer declares no objects"));
        }
        if self.root_object >= self.num_objects {
            return Err(anyhow!(
                "Root object {} is out of {} objects",
                self.root_object,
                self.num_objects
            ));
        }

        let payload_end = buf_len.saturating_sub(TRAILER_LEN) as u64;
        let table_end = self
            .num_objects
            .checked_mul(self.offset_size.byte_len() as u64)
            .and_then(|table_len| table_len.checked_add(self.offset_table_start));
        match table_end {
            Some(table_end)
                if self.offset_table_start >= HEADER_LEN as u64 && table_end <= payload_end =>
            {
                Ok(())
            }
            _ => Err(anyhow!(
                "Offset table of {} x {} bytes at {} does not fit before byte {}",
                self.num_objects,
                self.offset_size.byte_len(),
                self.offset_table_start,
                payload_end
            )),
        }
    }
}
