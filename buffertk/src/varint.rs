//! Base-128 variable-length integers as laid out by the protocol buffer wire format.
//!
//! Conversions from the native integer types are infallible and sign-extend, so negative values
//! occupy the full ten bytes.  Conversions back to narrower types are checked; callers that want
//! the raw bits should go through `u64` or `i64`.

use super::Error;
use super::Packable;
use super::Unpackable;
use super::Unpacker;

/// The most bytes a varint may occupy.
pub const MAX_VARINT_LEN: usize = 10;

////////////////////////////////////////////// Varint //////////////////////////////////////////////

/// v64 is a variable-length integer.  It can represent any value of 64-bits or fewer.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct v64 {
    x: u64,
}

macro_rules! unsigned_conversions {
    ($what:ty) => {
        impl From<$what> for v64 {
            fn from(x: $what) -> v64 {
                v64 { x: x as u64 }
            }
        }

        impl TryFrom<v64> for $what {
            type Error = Error;

            fn try_from(v: v64) -> Result<$what, Error> {
                <$what>::try_from(v.x).map_err(|_| Error::UnsignedOverflow { value: v.x })
            }
        }
    };
}

macro_rules! signed_conversions {
    ($what:ty) => {
        impl From<$what> for v64 {
            fn from(x: $what) -> v64 {
                v64 { x: x as i64 as u64 }
            }
        }

        impl TryFrom<v64> for $what {
            type Error = Error;

            fn try_from(v: v64) -> Result<$what, Error> {
                let value: i64 = v.x as i64;
                <$what>::try_from(value).map_err(|_| Error::SignedOverflow { value })
            }
        }
    };
}

unsigned_conversions!(u8);
unsigned_conversions!(u16);
unsigned_conversions!(u32);
signed_conversions!(i8);
signed_conversions!(i16);
signed_conversions!(i32);

impl From<u64> for v64 {
    fn from(x: u64) -> v64 {
        v64 { x }
    }
}

impl From<v64> for u64 {
    fn from(v: v64) -> u64 {
        v.x
    }
}

impl From<i64> for v64 {
    fn from(x: i64) -> v64 {
        v64 { x: x as u64 }
    }
}

impl From<v64> for i64 {
    fn from(v: v64) -> i64 {
        v.x as i64
    }
}

impl From<usize> for v64 {
    fn from(x: usize) -> v64 {
        // usize is at most 64 bits on every supported target.
        v64 { x: x as u64 }
    }
}

impl TryFrom<v64> for usize {
    type Error = Error;

    fn try_from(v: v64) -> Result<usize, Error> {
        usize::try_from(v.x).map_err(|_| Error::UnsignedOverflow { value: v.x })
    }
}

impl Packable for v64 {
    fn pack_sz(&self) -> usize {
        let mut x: u64 = self.x >> 7;
        let mut count: usize = 1;
        while x > 0 {
            x >>= 7;
            count += 1;
        }
        count
    }

    fn pack(&self, out: &mut [u8]) {
        let mut x: u64 = self.x;
        let mut idx: usize = 0;
        loop {
            let byte = (x & 0x7f) as u8;
            x >>= 7;
            if x == 0 {
                out[idx] = byte;
                break;
            }
            out[idx] = byte | 0x80;
            idx += 1;
        }
    }
}

impl<'a> Unpackable<'a> for v64 {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let mut ret: u64 = 0;
        for (idx, byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
            // The tenth byte holds only the top bit of a 64-bit value.
            if idx + 1 == MAX_VARINT_LEN && *byte > 1 {
                return Err(Error::MalformedVarint { bytes: idx + 1 });
            }
            ret |= ((*byte & 0x7f) as u64) << (7 * idx);
            if *byte & 0x80 == 0 {
                return Ok((v64 { x: ret }, &buf[idx + 1..]));
            }
        }
        Err(Error::MalformedVarint {
            bytes: buf.len().min(MAX_VARINT_LEN),
        })
    }
}

////////////////////////////////////////// free functions //////////////////////////////////////////

/// Append the varint encoding of `value` to `sink`.
pub fn encode_unsigned(sink: &mut Vec<u8>, value: u64) {
    let v = v64::from(value);
    let start = sink.len();
    sink.resize(start + v.pack_sz(), 0);
    v.pack(&mut sink[start..]);
}

/// Read one varint from the front of `source`, advancing it past the varint.
pub fn decode_unsigned(source: &mut Unpacker<'_>) -> Result<u64, Error> {
    let v: v64 = source.unpack()?;
    Ok(v.into())
}

///////////////////////////////////////////// mod tests ////////////////////////////////////////////
