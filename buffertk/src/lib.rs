//! buffertk provides the byte-level building blocks for the protocol buffer wire format.
//!
//! Objects that know their encoded size implement [Packable]; objects that can be read back from a
//! prefix of a buffer implement [Unpackable].  [stack_pack] chains packables together without
//! intermediate allocation and [Unpacker] walks a buffer front to back.

use std::fmt::Debug;

mod varint;

pub use varint::decode_unsigned;
pub use varint::encode_unsigned;
pub use varint::v64;
pub use varint::MAX_VARINT_LEN;

/////////////////////////////////////////////// Error //////////////////////////////////////////////

/// All Error conditions within `buffertk`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// BufferTooShort indicates that there was a need to unpack more bytes than were available in
    /// the underlying memory.
    BufferTooShort {
        /// Number of bytes required to read the buffer.
        required: usize,
        /// Number of bytes available to read.
        had: usize,
    },
    /// MalformedVarint indicates that a varint ran off the end of the buffer, did not terminate
    /// within ten bytes, or carried more than 64 bits.
    MalformedVarint {
        /// Number of bytes examined.
        bytes: usize,
    },
    /// UnsignedOverflow indicates that a value will not fit its intended (unsigned) target.
    UnsignedOverflow {
        /// Value that would overflow (typically a u32).
        value: u64,
    },
    /// SignedOverflow indicates that a value will not fit its intended (signed) target.
    SignedOverflow {
        /// Value that would overflow (typically an i32).
        value: i64,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::BufferTooShort { required, had } => {
                write!(fmt, "buffer too short: expected {}, had {}", required, had)
            }
            Error::MalformedVarint { bytes } => {
                write!(fmt, "malformed varint after {} bytes", bytes)
            }
            Error::UnsignedOverflow { value } => {
                write!(fmt, "unsigned integer cannot hold value={}", value)
            }
            Error::SignedOverflow { value } => {
                write!(fmt, "signed integer cannot hold value={}", value)
            }
        }
    }
}

impl std::error::Error for Error {}

///////////////////////////////////////////// Packable /////////////////////////////////////////////

/// Packable objects can be serialized into an `&mut [u8]` of exactly `pack_sz()` bytes.
///
/// Packing never fails.  Anything that could be invalid must be checked before it is turned into
/// a Packable.
pub trait Packable {
    /// `pack_sz` returns the number of bytes required to serialize the Packable object.
    fn pack_sz(&self) -> usize;
    /// `pack` fills in the buffer `out` with the packed binary representation of the Packable
    /// object.
    ///
    /// # Panics
    ///
    /// - When `out.len() != self.pack_sz()`
    fn pack(&self, out: &mut [u8]);
}

//////////////////////////////////////////// Unpackable ////////////////////////////////////////////

/// Unpackable objects can be deserialized from an `&[u8]`.
///
/// The format understood by `T:Unpackable` must correspond to the format serialized by
/// `T:Packable`.
pub trait Unpackable<'a>: Sized {
    /// Type of error this unpackable returns.
    type Error: Debug;

    /// `unpack` attempts to return an Unpackable object stored in a prefix of `buf`.  The method
    /// returns the result and remaining unused buffer.
    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Self::Error>;
}

//////////////////////////////////////////// StackPacker ///////////////////////////////////////////

const EMPTY: () = ();

/// `stack_pack` begins a chain of packable data on the stack.
pub fn stack_pack<'a, T: Packable + 'a>(t: T) -> StackPacker<'a, (), T> {
    StackPacker { prefix: &EMPTY, t }
}

/// [StackPacker] is the type returned by [stack_pack].  It points to everything packed before it
/// and owns the most recent item.
pub struct StackPacker<'a, P, T>
where
    P: Packable + 'a,
    T: Packable + 'a,
{
    prefix: &'a P,
    t: T,
}

impl<'a, P, T> StackPacker<'a, P, T>
where
    P: Packable + 'a,
    T: Packable + 'a,
{
    /// `pack` returns a new StackPacker that will pack `u` after everything in `self`.  Nothing is
    /// written until one of the terminal methods is called.
    pub fn pack<'b, U: Packable + 'b>(&'b self, u: U) -> StackPacker<'b, Self, U> {
        StackPacker { prefix: self, t: u }
    }

    /// `to_vec` packs the chain into a freshly allocated, exactly-sized vector.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.pack_sz()];
        Packable::pack(self, &mut buf);
        buf
    }

    /// `append_to_vec` grows `v` by the packed size and packs into the new space.
    pub fn append_to_vec(&self, v: &mut Vec<u8>) {
        let len = self.pack_sz();
        let v_sz = v.len();
        v.resize(v_sz + len, 0);
        Packable::pack(self, &mut v[v_sz..]);
    }
}

impl<'a, P, T> Packable for StackPacker<'a, P, T>
where
    P: Packable + 'a,
    T: Packable + 'a,
{
    fn pack_sz(&self) -> usize {
        self.prefix.pack_sz() + self.t.pack_sz()
    }

    fn pack(&self, out: &mut [u8]) {
        let (prefix, suffix): (&mut [u8], &mut [u8]) = out.split_at_mut(self.prefix.pack_sz());
        self.prefix.pack(prefix);
        self.t.pack(suffix);
    }
}

///////////////////////////////////////////// Unpacker /////////////////////////////////////////////

/// Unpacker parses a buffer start to finish.
#[derive(Clone, Debug, Default)]
pub struct Unpacker<'a> {
    buf: &'a [u8],
}

impl<'a> Unpacker<'a> {
    /// Create a new [Unpacker] that parses `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Unpack from buf into an object of type T.
    pub fn unpack<'b, E, T: Unpackable<'b, Error = E>>(&mut self) -> Result<T, E>
    where
        'a: 'b,
    {
        let (t, buf): (T, &'a [u8]) = Unpackable::unpack(self.buf)?;
        self.buf = buf;
        Ok(t)
    }

    /// Split off the next `len` bytes, advancing past them.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if len > self.buf.len() {
            return Err(Error::BufferTooShort {
                required: len,
                had: self.buf.len(),
            });
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    /// Return true if and only if there's no buffer left to parse.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Return the remaining buffer.
    pub fn remain(&self) -> &'a [u8] {
        self.buf
    }
}

////////////////////////////////////////// Packable for &P /////////////////////////////////////////

impl<P: Packable> Packable for &P {
    fn pack_sz(&self) -> usize {
        (*self).pack_sz()
    }

    fn pack(&self, out: &mut [u8]) {
        (*self).pack(out)
    }
}

impl Packable for () {
    fn pack_sz(&self) -> usize {
        0
    }

    fn pack(&self, _: &mut [u8]) {}
}

/////////////////////////// Packable/Unpackable for fixed-width numbers ////////////////////////////

macro_rules! packable_with_to_le_bytes {
    ($what:ty) => {
        impl Packable for $what {
            fn pack_sz(&self) -> usize {
                std::mem::size_of::<$what>()
            }

            fn pack(&self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_le_bytes());
            }
        }

        impl<'a> Unpackable<'a> for $what {
            type Error = Error;

            fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
                const SZ: usize = std::mem::size_of::<$what>();
                if buf.len() < SZ {
                    return Err(Error::BufferTooShort {
                        required: SZ,
                        had: buf.len(),
                    });
                }
                let mut fbuf: [u8; SZ] = [0; SZ];
                fbuf.copy_from_slice(&buf[0..SZ]);
                Ok((<$what>::from_le_bytes(fbuf), &buf[SZ..]))
            }
        }
    };
}

packable_with_to_le_bytes!(u8);
packable_with_to_le_bytes!(i32);
packable_with_to_le_bytes!(u32);
packable_with_to_le_bytes!(i64);
packable_with_to_le_bytes!(u64);
// IEEE-754 bit patterns are little-endian on the wire just like the integers.
packable_with_to_le_bytes!(f32);
packable_with_to_le_bytes!(f64);

/////////////////////////////////////////////// &[u8] //////////////////////////////////////////////

impl Packable for &[u8] {
    fn pack_sz(&self) -> usize {
        let vsz: v64 = self.len().into();
        vsz.pack_sz() + self.len()
    }

    fn pack(&self, out: &mut [u8]) {
        let vsz: v64 = self.len().into();
        let (prefix, suffix): (&mut [u8], &mut [u8]) = out.split_at_mut(vsz.pack_sz());
        vsz.pack(prefix);
        suffix.copy_from_slice(self);
    }
}

impl<'a> Unpackable<'a> for &'a [u8] {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let mut up = Unpacker::new(buf);
        let vsz: v64 = up.unpack()?;
        let x: usize = usize::try_from(vsz)?;
        let body = up.take(x)?;
        Ok((body, up.remain()))
    }
}

///////////////////////////////////////////// mod tests ////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_pack_with_to_le_bytes {
        ($what:ty, $x:expr, $human:expr) => {{
            const HUMAN: &[u8] = $human;
            let x: $what = $x;
            assert_eq!(HUMAN.len(), x.pack_sz(), "human got pack_sz wrong?");
            let buf = stack_pack(x).to_vec();
            assert_eq!(HUMAN, &buf[..], "human got implementation wrong?");
            let mut up = Unpacker::new(HUMAN);
            let back: Result<$what, Error> = up.unpack();
            assert_eq!(Ok(x), back, "human got decode wrong?");
            assert!(up.is_empty(), "human got remainder wrong?");
        }};
    }

    #[test]
    fn fixed_width() {
        test_pack_with_to_le_bytes!(u8, 0xa5, &[0xa5]);
        test_pack_with_to_le_bytes!(u32, 0xc0ffee, &[0xee, 0xff, 0xc0, 0x00]);
        test_pack_with_to_le_bytes!(i32, -1, &[0xff, 0xff, 0xff, 0xff]);
        test_pack_with_to_le_bytes!(i32, i32::MIN, &[0x00, 0x00, 0x00, 0x80]);
        test_pack_with_to_le_bytes!(u64, 1, &[1, 0, 0, 0, 0, 0, 0, 0]);
        test_pack_with_to_le_bytes!(i64, -2, &[0xfe, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
        test_pack_with_to_le_bytes!(f32, 2.0, &[0x00, 0x00, 0x00, 0x40]);
        test_pack_with_to_le_bytes!(f64, 1.0, &[0, 0, 0, 0, 0, 0, 0xf0, 0x3f]);
    }

    #[test]
    fn fixed_width_short() {
        let mut up = Unpacker::new(&[1, 2, 3]);
        let x: Result<u32, Error> = up.unpack();
        assert_eq!(Err(Error::BufferTooShort { required: 4, had: 3 }), x);
        assert_eq!(3, up.remain().len(), "failed unpack must not advance");
    }

    #[test]
    fn stack_pack_chain() {
        let mut buf = vec![0xaa];
        stack_pack(v64::from(300u32))
            .pack(7u8)
            .pack(&[1u8, 2, 3][..])
            .append_to_vec(&mut buf);
        assert_eq!(&[0xaa, 0xac, 0x02, 0x07, 0x03, 1, 2, 3], &buf[..]);
    }

    #[test]
    fn byte_slices() {
        let body: &[u8] = b"hello";
        let buf = stack_pack(body).to_vec();
        assert_eq!(b"\x05hello", &buf[..]);
        let mut up = Unpacker::new(&buf);
        let back: &[u8] = up.unpack().unwrap();
        assert_eq!(body, back);
        assert!(up.is_empty());
        let truncated: Result<(&[u8], &[u8]), Error> = <&[u8]>::unpack(&buf[..3]);
        assert_eq!(Err(Error::BufferTooShort { required: 5, had: 2 }), truncated);
    }

    #[test]
    fn take() {
        let mut up = Unpacker::new(&[1, 2, 3, 4]);
        assert_eq!(Ok(&[1u8, 2][..]), up.take(2));
        assert_eq!(
            Err(Error::BufferTooShort { required: 3, had: 2 }),
            up.take(3)
        );
        assert_eq!(Ok(&[3u8, 4][..]), up.take(2));
        assert!(up.is_empty());
    }
}
