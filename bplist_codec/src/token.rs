use anyhow::{anyhow, Result};
use derive_more::{Deref, From};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::any;
use std::io::{self, Read};
use std::mem;

pub const NULL: u8 = 0x00;
pub const FALSE: u8 = 0x08;
pub const TRUE: u8 = 0x09;
pub const EMPTY_BYTES: u8 = 0x0F;
pub const REAL_32: u8 = 0x22;
pub const REAL_64: u8 = 0x23;
pub const DATE: u8 = 0x33;

/// The low nibble that announces a size sub-token.
pub const EXTENDED_SIZE: u8 = 0x0F;

/// The leading byte of every object.
#[derive(From, Deref, Clone, Copy, PartialEq, Eq, Debug)]
pub struct TokenInt(u8);
impl TokenInt {
    pub fn new(tok_type: TokenType, low: u8) -> Self {
        Self(tok_type as u8 | (low & 0x0F))
    }
    pub fn high(&self) -> u8 {
        self.0 & 0xF0
    }
    pub fn low(&self) -> u8 {
        self.0 & 0x0F
    }
    pub fn deser(r: &mut impl Read) -> Result<(usize, Self), io::Error> {
        let mut buf = [0u8; mem::size_of::<u8>()];
        r.read_exact(&mut buf)?;
        Ok((buf.len(), Self(buf[0])))
    }
}

/// The high nibble of a [`TokenInt`].
#[repr(u8)]
#[derive(PartialEq, Eq, Hash, Clone, Copy, FromPrimitive, Debug)]
pub enum TokenType {
    Singleton = 0x00,
    Int = 0x10,
    Real = 0x20,
    Date = 0x30,
    Bytes = 0x40,
    AsciiStr = 0x50,
    Utf16Str = 0x60,
    Uid = 0x80,
    Array = 0xA0,
    Dict = 0xD0,
}
impl TryFrom<TokenInt> for TokenType {
    type Error = anyhow::Error;
    fn try_from(tok: TokenInt) -> Result<Self> {
        TokenType::from_u8(tok.high()).ok_or(anyhow!(
            "Unknown {} {:#04x}",
            any::type_name::<TokenInt>(),
            tok.0
        ))
    }
}
