#![allow(non_camel_case_types)]

// The struct names follow the protobuf type names so that `uint64` reads the way it does in a
// .proto file.

use buffertk::{stack_pack, v64, Packable, Unpackable, Unpacker};

use super::zigzag::{unzigzag, unzigzag32, zigzag, zigzag32};
use super::{EnumDescriptor, Error, FieldKind, Text, Value, WireType};

///////////////////////////////////////////// FieldType ////////////////////////////////////////////

/// FieldType is implemented by one zero-cost wrapper per scalar kind.  The wrapper's Packable and
/// Unpackable impls produce the payload of the field without its tag.
pub trait FieldType: Sized {
    const WIRE_TYPE: WireType;
    const NAME: &'static str;

    /// Check `value` for assignment and return its canonical form.
    fn check(field: &str, value: Value) -> Result<Value, Error>;
    /// Append the payload of an already-checked value.
    fn write(field: &str, value: &Value, out: &mut Vec<u8>) -> Result<(), Error>;
    /// Read one payload.  Only framing and width are verified here.
    fn read(up: &mut Unpacker<'_>) -> Result<Value, Error>;
}

fn integer<T: TryFrom<i128>>(field: &str, kind: &'static str, value: &Value) -> Result<T, Error> {
    match value {
        Value::Int(x) => T::try_from(*x).map_err(|_| Error::RangeError {
            field: field.to_string(),
            kind,
            value: x.to_string(),
        }),
        _ => Err(Error::type_error(field, kind, value)),
    }
}

macro_rules! integer_field_type {
    ($name:ident, $native:ty, $wire:ident) => {
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
        pub struct $name(pub $native);

        impl FieldType for $name {
            const WIRE_TYPE: WireType = WireType::$wire;
            const NAME: &'static str = stringify!($name);

            fn check(field: &str, value: Value) -> Result<Value, Error> {
                let x: $native = integer(field, Self::NAME, &value)?;
                Ok(Value::Int(x as i128))
            }

            fn write(field: &str, value: &Value, out: &mut Vec<u8>) -> Result<(), Error> {
                let x: $native = integer(field, Self::NAME, value)?;
                stack_pack($name(x)).append_to_vec(out);
                Ok(())
            }

            fn read(up: &mut Unpacker<'_>) -> Result<Value, Error> {
                let x: $name = up.unpack()?;
                Ok(Value::Int(x.0 as i128))
            }
        }
    };
}

/////////////////////////////////////////////// int32 //////////////////////////////////////////////

integer_field_type!(int32, i32, Varint);

impl Packable for int32 {
    fn pack_sz(&self) -> usize {
        v64::from(self.0).pack_sz()
    }

    fn pack(&self, out: &mut [u8]) {
        v64::from(self.0).pack(out)
    }
}

impl<'a> Unpackable<'a> for int32 {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let (v, buf) = v64::unpack(buf)?;
        Ok((int32(i32::try_from(v)?), buf))
    }
}

/////////////////////////////////////////////// int64 //////////////////////////////////////////////

integer_field_type!(int64, i64, Varint);

impl Packable for int64 {
    fn pack_sz(&self) -> usize {
        v64::from(self.0).pack_sz()
    }

    fn pack(&self, out: &mut [u8]) {
        v64::from(self.0).pack(out)
    }
}

impl<'a> Unpackable<'a> for int64 {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let (v, buf) = v64::unpack(buf)?;
        Ok((int64(v.into()), buf))
    }
}

////////////////////////////////////////////// uint32 //////////////////////////////////////////////

integer_field_type!(uint32, u32, Varint);

impl Packable for uint32 {
    fn pack_sz(&self) -> usize {
        v64::from(self.0).pack_sz()
    }

    fn pack(&self, out: &mut [u8]) {
        v64::from(self.0).pack(out)
    }
}

impl<'a> Unpackable<'a> for uint32 {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let (v, buf) = v64::unpack(buf)?;
        Ok((uint32(u32::try_from(v)?), buf))
    }
}

////////////////////////////////////////////// uint64 //////////////////////////////////////////////

integer_field_type!(uint64, u64, Varint);

impl Packable for uint64 {
    fn pack_sz(&self) -> usize {
        v64::from(self.0).pack_sz()
    }

    fn pack(&self, out: &mut [u8]) {
        v64::from(self.0).pack(out)
    }
}

impl<'a> Unpackable<'a> for uint64 {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let (v, buf) = v64::unpack(buf)?;
        Ok((uint64(v.into()), buf))
    }
}

////////////////////////////////////////////// sint32 //////////////////////////////////////////////

integer_field_type!(sint32, i32, Varint);

impl Packable for sint32 {
    fn pack_sz(&self) -> usize {
        v64::from(zigzag32(self.0)).pack_sz()
    }

    fn pack(&self, out: &mut [u8]) {
        v64::from(zigzag32(self.0)).pack(out)
    }
}

impl<'a> Unpackable<'a> for sint32 {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let (v, buf) = v64::unpack(buf)?;
        Ok((sint32(unzigzag32(u32::try_from(v)?)), buf))
    }
}

////////////////////////////////////////////// sint64 //////////////////////////////////////////////

integer_field_type!(sint64, i64, Varint);

impl Packable for sint64 {
    fn pack_sz(&self) -> usize {
        v64::from(zigzag(self.0)).pack_sz()
    }

    fn pack(&self, out: &mut [u8]) {
        v64::from(zigzag(self.0)).pack(out)
    }
}

impl<'a> Unpackable<'a> for sint64 {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let (v, buf) = v64::unpack(buf)?;
        Ok((sint64(unzigzag(v.into())), buf))
    }
}

//////////////////////////////// fixed32/fixed64/sfixed32/sfixed64 /////////////////////////////////

macro_rules! fixed_width {
    ($name:ident, $native:ty) => {
        impl Packable for $name {
            fn pack_sz(&self) -> usize {
                self.0.pack_sz()
            }

            fn pack(&self, out: &mut [u8]) {
                self.0.pack(out)
            }
        }

        impl<'a> Unpackable<'a> for $name {
            type Error = Error;

            fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
                let (x, buf) = <$native>::unpack(buf)?;
                Ok(($name(x), buf))
            }
        }
    };
}

integer_field_type!(fixed32, u32, ThirtyTwo);
fixed_width!(fixed32, u32);

integer_field_type!(fixed64, u64, SixtyFour);
fixed_width!(fixed64, u64);

integer_field_type!(sfixed32, i32, ThirtyTwo);
fixed_width!(sfixed32, i32);

integer_field_type!(sfixed64, i64, SixtyFour);
fixed_width!(sfixed64, i64);

/////////////////////////////////////////////// float //////////////////////////////////////////////

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct float(pub f32);

impl float {
    fn native(field: &str, value: &Value) -> Result<f32, Error> {
        match value {
            Value::Int(x) => Ok(*x as f32),
            // Finite doubles beyond f32::MAX would silently become infinity.
            Value::Float(x) if x.is_finite() && (*x as f32).is_infinite() => Err(Error::RangeError {
                field: field.to_string(),
                kind: Self::NAME,
                value: x.to_string(),
            }),
            Value::Float(x) => Ok(*x as f32),
            _ => Err(Error::type_error(field, Self::NAME, value)),
        }
    }
}

impl FieldType for float {
    const WIRE_TYPE: WireType = WireType::ThirtyTwo;
    const NAME: &'static str = "float";

    fn check(field: &str, value: Value) -> Result<Value, Error> {
        Ok(Value::Float(float::native(field, &value)? as f64))
    }

    fn write(field: &str, value: &Value, out: &mut Vec<u8>) -> Result<(), Error> {
        stack_pack(float(float::native(field, value)?)).append_to_vec(out);
        Ok(())
    }

    fn read(up: &mut Unpacker<'_>) -> Result<Value, Error> {
        let x: float = up.unpack()?;
        Ok(Value::Float(x.0 as f64))
    }
}

fixed_width!(float, f32);

////////////////////////////////////////////// double //////////////////////////////////////////////

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct double(pub f64);

impl double {
    fn native(field: &str, value: &Value) -> Result<f64, Error> {
        match value {
            Value::Int(x) => Ok(*x as f64),
            Value::Float(x) => Ok(*x),
            _ => Err(Error::type_error(field, Self::NAME, value)),
        }
    }
}

impl FieldType for double {
    const WIRE_TYPE: WireType = WireType::SixtyFour;
    const NAME: &'static str = "double";

    fn check(field: &str, value: Value) -> Result<Value, Error> {
        Ok(Value::Float(double::native(field, &value)?))
    }

    fn write(field: &str, value: &Value, out: &mut Vec<u8>) -> Result<(), Error> {
        stack_pack(double(double::native(field, value)?)).append_to_vec(out);
        Ok(())
    }

    fn read(up: &mut Unpacker<'_>) -> Result<Value, Error> {
        let x: double = up.unpack()?;
        Ok(Value::Float(x.0))
    }
}

fixed_width!(double, f64);

/////////////////////////////////////////////// Bool ///////////////////////////////////////////////

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bool(pub bool);

impl Bool {
    fn native(field: &str, value: &Value) -> Result<bool, Error> {
        match value {
            Value::Bool(b) => Ok(*b),
            _ => Err(Error::type_error(field, Self::NAME, value)),
        }
    }
}

impl FieldType for Bool {
    const WIRE_TYPE: WireType = WireType::Varint;
    const NAME: &'static str = "bool";

    fn check(field: &str, value: Value) -> Result<Value, Error> {
        Ok(Value::Bool(Bool::native(field, &value)?))
    }

    fn write(field: &str, value: &Value, out: &mut Vec<u8>) -> Result<(), Error> {
        stack_pack(Bool(Bool::native(field, value)?)).append_to_vec(out);
        Ok(())
    }

    fn read(up: &mut Unpacker<'_>) -> Result<Value, Error> {
        let x: Bool = up.unpack()?;
        Ok(Value::Bool(x.0))
    }
}

impl Packable for Bool {
    fn pack_sz(&self) -> usize {
        1
    }

    fn pack(&self, out: &mut [u8]) {
        out[0] = u8::from(self.0);
    }
}

impl<'a> Unpackable<'a> for Bool {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let (v, buf) = v64::unpack(buf)?;
        Ok((Bool(u64::from(v) != 0), buf))
    }
}

////////////////////////////////////////////// string //////////////////////////////////////////////

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct string(pub Text);

impl string {
    fn text(field: &str, value: Value) -> Result<Text, Error> {
        match value {
            Value::String(t) => Ok(t),
            Value::Bytes(b) => Ok(Text::from_bytes(b)),
            value => Err(Error::type_error(field, Self::NAME, &value)),
        }
    }
}

impl FieldType for string {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;
    const NAME: &'static str = "string";

    fn check(field: &str, value: Value) -> Result<Value, Error> {
        let text = string::text(field, value)?;
        if !text.is_valid() {
            return Err(Error::TextEncodingError {
                field: field.to_string(),
            });
        }
        Ok(Value::String(text))
    }

    fn write(field: &str, value: &Value, out: &mut Vec<u8>) -> Result<(), Error> {
        let raw: &[u8] = match value {
            Value::String(t) if t.is_valid() => t.as_bytes(),
            Value::String(_) => {
                return Err(Error::TextEncodingError {
                    field: field.to_string(),
                })
            }
            _ => return Err(Error::type_error(field, Self::NAME, value)),
        };
        stack_pack(raw).append_to_vec(out);
        Ok(())
    }

    // Bytes are tagged as text without validation; the caller decides when to check them.
    fn read(up: &mut Unpacker<'_>) -> Result<Value, Error> {
        let x: string = up.unpack()?;
        Ok(Value::String(x.0))
    }
}

impl Packable for string {
    fn pack_sz(&self) -> usize {
        self.0.as_bytes().pack_sz()
    }

    fn pack(&self, out: &mut [u8]) {
        self.0.as_bytes().pack(out)
    }
}

impl<'a> Unpackable<'a> for string {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let (x, buf) = <&[u8]>::unpack(buf)?;
        Ok((string(Text::from_bytes(x.to_vec())), buf))
    }
}

/////////////////////////////////////////////// bytes //////////////////////////////////////////////

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct bytes(pub Vec<u8>);

impl FieldType for bytes {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;
    const NAME: &'static str = "bytes";

    fn check(field: &str, value: Value) -> Result<Value, Error> {
        match value {
            Value::Bytes(b) => Ok(Value::Bytes(b)),
            Value::String(t) => Ok(Value::Bytes(t.into_bytes())),
            value => Err(Error::type_error(field, Self::NAME, &value)),
        }
    }

    fn write(field: &str, value: &Value, out: &mut Vec<u8>) -> Result<(), Error> {
        let buf: &[u8] = match value {
            Value::Bytes(b) => b,
            Value::String(t) => t.as_bytes(),
            _ => return Err(Error::type_error(field, Self::NAME, value)),
        };
        stack_pack(buf).append_to_vec(out);
        Ok(())
    }

    fn read(up: &mut Unpacker<'_>) -> Result<Value, Error> {
        let x: bytes = up.unpack()?;
        Ok(Value::Bytes(x.0))
    }
}

impl Packable for bytes {
    fn pack_sz(&self) -> usize {
        self.0.as_slice().pack_sz()
    }

    fn pack(&self, out: &mut [u8]) {
        self.0.as_slice().pack(out)
    }
}

impl<'a> Unpackable<'a> for bytes {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let (x, buf) = <&[u8]>::unpack(buf)?;
        Ok((bytes(x.to_vec()), buf))
    }
}

//////////////////////////////////////////// enumeration ///////////////////////////////////////////

/// The payload of an enum field.  Encoded like int32, but read back without narrowing so that a
/// value the local enum does not know can be parked rather than rejected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct enumeration(pub i64);

impl Packable for enumeration {
    fn pack_sz(&self) -> usize {
        v64::from(self.0).pack_sz()
    }

    fn pack(&self, out: &mut [u8]) {
        v64::from(self.0).pack(out)
    }
}

impl<'a> Unpackable<'a> for enumeration {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let (v, buf) = v64::unpack(buf)?;
        Ok((enumeration(v.into()), buf))
    }
}

pub(crate) fn check_enum(
    descriptor: &EnumDescriptor,
    field: &str,
    value: Value,
) -> Result<Value, Error> {
    let kind = "enum";
    let x: i32 = match &value {
        Value::Int(_) => integer(field, kind, &value)?,
        Value::String(t) => match t.as_str().and_then(|name| descriptor.value_for(name)) {
            Some(x) => x,
            None => {
                return Err(Error::RangeError {
                    field: field.to_string(),
                    kind,
                    value: t.to_string(),
                })
            }
        },
        _ => return Err(Error::type_error(field, kind, &value)),
    };
    if !descriptor.contains(x) {
        return Err(Error::RangeError {
            field: field.to_string(),
            kind,
            value: x.to_string(),
        });
    }
    Ok(Value::Int(x as i128))
}

///////////////////////////////////////////// dispatch /////////////////////////////////////////////

macro_rules! dispatch {
    ($kind:expr, $method:ident($($arg:expr),*), $otherwise:expr) => {
        match $kind {
            FieldKind::Int32 => int32::$method($($arg),*),
            FieldKind::Int64 => int64::$method($($arg),*),
            FieldKind::UInt32 => uint32::$method($($arg),*),
            FieldKind::UInt64 => uint64::$method($($arg),*),
            FieldKind::SInt32 => sint32::$method($($arg),*),
            FieldKind::SInt64 => sint64::$method($($arg),*),
            FieldKind::Fixed32 => fixed32::$method($($arg),*),
            FieldKind::Fixed64 => fixed64::$method($($arg),*),
            FieldKind::SFixed32 => sfixed32::$method($($arg),*),
            FieldKind::SFixed64 => sfixed64::$method($($arg),*),
            FieldKind::Float => float::$method($($arg),*),
            FieldKind::Double => double::$method($($arg),*),
            FieldKind::Bool => Bool::$method($($arg),*),
            FieldKind::String => string::$method($($arg),*),
            FieldKind::Bytes => bytes::$method($($arg),*),
            FieldKind::Enum(_) | FieldKind::Message(_) | FieldKind::Group(_) => $otherwise,
        }
    };
}

pub(crate) fn scalar_name(kind: &FieldKind) -> &'static str {
    match kind {
        FieldKind::Int32 => int32::NAME,
        FieldKind::Int64 => int64::NAME,
        FieldKind::UInt32 => uint32::NAME,
        FieldKind::UInt64 => uint64::NAME,
        FieldKind::SInt32 => sint32::NAME,
        FieldKind::SInt64 => sint64::NAME,
        FieldKind::Fixed32 => fixed32::NAME,
        FieldKind::Fixed64 => fixed64::NAME,
        FieldKind::SFixed32 => sfixed32::NAME,
        FieldKind::SFixed64 => sfixed64::NAME,
        FieldKind::Float => float::NAME,
        FieldKind::Double => double::NAME,
        FieldKind::Bool => Bool::NAME,
        FieldKind::String => string::NAME,
        FieldKind::Bytes => bytes::NAME,
        FieldKind::Enum(_) => "enum",
        FieldKind::Message(_) => "message",
        FieldKind::Group(_) => "group",
    }
}

pub(crate) fn scalar_default(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::Float | FieldKind::Double => Value::Float(0.0),
        FieldKind::Bool => Value::Bool(false),
        FieldKind::String => Value::String(Text::default()),
        FieldKind::Bytes => Value::Bytes(Vec::new()),
        _ => Value::Int(0),
    }
}

pub(crate) fn check_scalar(kind: &FieldKind, field: &str, value: Value) -> Result<Value, Error> {
    dispatch!(
        kind,
        check(field, value),
        Err(Error::InvalidSchema {
            what: format!("{} is not a scalar kind", kind)
        })
    )
}

/// Append the tagless payload of `value`.  Enum values are written like int32.
pub(crate) fn write_payload(
    kind: &FieldKind,
    field: &str,
    value: &Value,
    out: &mut Vec<u8>,
) -> Result<(), Error> {
    if let FieldKind::Enum(_) = kind {
        let x: i32 = integer(field, "enum", value)?;
        stack_pack(enumeration(x as i64)).append_to_vec(out);
        return Ok(());
    }
    dispatch!(
        kind,
        write(field, value, out),
        Err(Error::type_error(field, kind, value))
    )
}

/// Read one tagless payload.  Enum values come back as integers that may not be declared.
pub(crate) fn read_payload(kind: &FieldKind, up: &mut Unpacker<'_>) -> Result<Value, Error> {
    if let FieldKind::Enum(_) = kind {
        let x: enumeration = up.unpack()?;
        return Ok(Value::Int(x.0 as i128));
    }
    dispatch!(
        kind,
        read(up),
        Err(Error::InvalidSchema {
            what: format!("{} has no scalar payload", kind)
        })
    )
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    // expect is the body of the field, including length prefix if necessary.
    fn helper_test<T: FieldType>(value: Value, expect: &[u8]) {
        let checked = T::check("f", value.clone()).unwrap();
        let mut output = Vec::new();
        T::write("f", &checked, &mut output).unwrap();
        assert_eq!(expect, &output[..], "human got {} encoding wrong?", T::NAME);
        let mut up = Unpacker::new(expect);
        let unpacked = T::read(&mut up).unwrap();
        assert!(up.is_empty(), "human got {} remainder wrong?", T::NAME);
        assert_eq!(checked, unpacked, "human got {} decoding wrong?", T::NAME);
    }

    #[test]
    fn int32() {
        helper_test::<int32>(
            Value::from(i32::MIN),
            &[0x80, 0x80, 0x80, 0x80, 0xf8, 0xff, 0xff, 0xff, 0xff, 1],
        );
        helper_test::<int32>(
            Value::from(-1),
            &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 1],
        );
        helper_test::<int32>(Value::from(0), &[0]);
        helper_test::<int32>(Value::from(1), &[1]);
        helper_test::<int32>(Value::from(i32::MAX), &[0xff, 0xff, 0xff, 0xff, 0x07]);
    }

    #[test]
    fn int64() {
        helper_test::<int64>(
            Value::from(i64::MIN),
            &[0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 1],
        );
        helper_test::<int64>(
            Value::from(-2082844800000000i64),
            &[0x80, 0xc0, 0xcb, 0xbc, 0x9e, 0xb5, 0xa6, 0xfc, 0xff, 0x01],
        );
        helper_test::<int64>(
            Value::from(i64::MAX),
            &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f],
        );
    }

    #[test]
    fn uint32() {
        helper_test::<uint32>(Value::from(0), &[0]);
        helper_test::<uint32>(Value::from(u32::MAX), &[0xff, 0xff, 0xff, 0xff, 0x0f]);
    }

    #[test]
    fn uint64() {
        helper_test::<uint64>(
            Value::from(u64::MAX),
            &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 1],
        );
    }

    #[test]
    fn sint32() {
        helper_test::<sint32>(Value::from(i32::MIN), &[0xff, 0xff, 0xff, 0xff, 0x0f]);
        helper_test::<sint32>(Value::from(-1), &[1]);
        helper_test::<sint32>(Value::from(1), &[2]);
        helper_test::<sint32>(Value::from(i32::MAX), &[0xfe, 0xff, 0xff, 0xff, 0x0f]);
    }

    #[test]
    fn sint64() {
        helper_test::<sint64>(
            Value::from(i64::MIN),
            &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 1],
        );
        helper_test::<sint64>(Value::from(-1), &[1]);
        helper_test::<sint64>(
            Value::from(i64::MAX),
            &[0xfe, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 1],
        );
    }

    #[test]
    fn fixed() {
        helper_test::<fixed32>(Value::from(1), &[1, 0, 0, 0]);
        helper_test::<fixed64>(Value::from(u64::MAX), &[0xff; 8]);
        helper_test::<sfixed32>(Value::from(i32::MIN), &[0, 0, 0, 0x80]);
        helper_test::<sfixed64>(Value::from(-1), &[0xff; 8]);
    }

    #[test]
    fn floating() {
        helper_test::<float>(Value::from(3.14159f32), &[0xd0, 0x0f, 0x49, 0x40]);
        helper_test::<double>(
            Value::from(3.14159f64),
            &[0x6e, 0x86, 0x1b, 0xf0, 0xf9, 0x21, 0x09, 0x40],
        );
        // integers widen
        helper_test::<double>(Value::from(1), &[0, 0, 0, 0, 0, 0, 0xf0, 0x3f]);
        assert_eq!(Ok(Value::Float(2.0)), float::check("f", Value::from(2)));
    }

    #[test]
    fn bool_and_text() {
        helper_test::<Bool>(Value::from(true), &[1]);
        helper_test::<Bool>(Value::from(false), &[0]);
        helper_test::<string>(Value::from("testing"), b"\x07testing");
        helper_test::<bytes>(Value::from(&[0xffu8, 0x00][..]), &[2, 0xff, 0x00]);
    }

    #[test]
    fn integer_bounds() {
        assert!(uint32::check("f", Value::from(0xffffffffu32)).is_ok());
        assert!(matches!(
            uint32::check("f", Value::from(0x100000000u64)),
            Err(Error::RangeError { kind: "uint32", .. })
        ));
        assert!(matches!(
            uint32::check("f", Value::from(-1)),
            Err(Error::RangeError { .. })
        ));
        assert!(uint64::check("f", Value::from(u64::MAX)).is_ok());
        assert!(matches!(
            uint64::check("f", Value::Int(1i128 << 64)),
            Err(Error::RangeError { .. })
        ));
        assert!(matches!(
            uint64::check("f", Value::from(-1)),
            Err(Error::RangeError { .. })
        ));
        assert!(int64::check("f", Value::from(i64::MIN)).is_ok());
        assert!(matches!(
            int32::check("f", Value::from(1i64 << 33)),
            Err(Error::RangeError { .. })
        ));
    }

    #[test]
    fn type_errors() {
        assert!(matches!(
            fixed32::check("f", Value::from(1.0)),
            Err(Error::TypeError { got: "float", .. })
        ));
        assert!(matches!(
            Bool::check("f", Value::from(1.0)),
            Err(Error::TypeError { .. })
        ));
        assert!(matches!(
            Bool::check("f", Value::from(1)),
            Err(Error::TypeError { .. })
        ));
        assert!(matches!(
            string::check("f", Value::from(1.0)),
            Err(Error::TypeError { .. })
        ));
        assert!(matches!(
            float::check("f", Value::from("1.0")),
            Err(Error::TypeError { .. })
        ));
        assert!(matches!(
            float::check("f", Value::from(1e300)),
            Err(Error::RangeError { .. })
        ));
    }

    #[test]
    fn string_validation_is_deferred() {
        let bad: &[u8] = &[2, 0xc3, 0x28];
        let mut up = Unpacker::new(bad);
        let read = string::read(&mut up).unwrap();
        assert_eq!(Some(&[0xc3u8, 0x28][..]), read.as_text().map(Text::as_bytes));
        assert_eq!(
            Err(Error::TextEncodingError {
                field: "f".to_string()
            }),
            string::check("f", read.clone())
        );
        let mut out = Vec::new();
        assert!(matches!(
            string::write("f", &read, &mut out),
            Err(Error::TextEncodingError { .. })
        ));
    }

    #[test]
    fn decode_bounds() {
        // 2^33 does not fit an int32
        let mut up = Unpacker::new(&[0x80, 0x80, 0x80, 0x80, 0x20]);
        assert_eq!(
            Err(Error::SignedOverflow { value: 1 << 33 }),
            int32::read(&mut up)
        );
        let mut up = Unpacker::new(&[0x80, 0x80]);
        assert!(matches!(
            int64::read(&mut up),
            Err(Error::MalformedVarint { .. })
        ));
        let mut up = Unpacker::new(&[0x05, b'a']);
        assert!(matches!(
            bytes::read(&mut up),
            Err(Error::BufferTooShort { .. })
        ));
    }
}
