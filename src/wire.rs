//! Big-endian field codec.
//!
//! Every integer in a seal is stored big-endian regardless of host order.
//! These helpers are the only place the conversion happens; the header models
//! and the builder go through them.

use byteorder::{BigEndian, ByteOrder};

#[inline]
pub fn encode_u16(value: u16) -> [u8; 2] {
    let mut buf = [0u8; 2];
    BigEndian::write_u16(&mut buf, value);
    buf
}

#[inline]
pub fn decode_u16(bytes: [u8; 2]) -> u16 {
    BigEndian::read_u16(&bytes)
}

#[inline]
pub fn encode_u32(value: u32) -> [u8; 4] {
    let mut buf = [0u8; 4];
    BigEndian::write_u32(&mut buf, value);
    buf
}

#[inline]
pub fn decode_u32(bytes: [u8; 4]) -> u32 {
    BigEndian::read_u32(&bytes)
}
