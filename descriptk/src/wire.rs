//! Tags and wire types.  Every field on the wire begins with `(field_number << 3) | wire_type`.

use buffertk::{v64, Packable, Unpackable, Unpacker};

use super::Error;

///////////////////////////////////////////// WireType /////////////////////////////////////////////

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum WireType {
    /// Varint is wire type 0.  The payload is a single v64.
    Varint,
    /// SixtyFour represents wire type 1.  The payload is eight little-endian bytes.
    SixtyFour,
    /// LengthDelimited represents wire type 2.  The payload is a v64 length and that many bytes.
    LengthDelimited,
    /// StartGroup represents wire type 3.  Fields follow until the matching EndGroup.
    StartGroup,
    /// EndGroup represents wire type 4.  It carries no payload.
    EndGroup,
    /// ThirtyTwo represents wire type 5.  The payload is four little-endian bytes.
    ThirtyTwo,
}

impl WireType {
    pub fn new(tag_bits: u32) -> Result<WireType, Error> {
        match tag_bits {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::SixtyFour),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::ThirtyTwo),
            _ => Err(Error::UnhandledWireType {
                wire_type: tag_bits,
            }),
        }
    }

    /// `tag_bits` returns the WireType's contribution to the tag, suitable for bit-wise or'ing with
    /// the shifted FieldNumber.
    pub fn tag_bits(&self) -> u32 {
        match self {
            WireType::Varint => 0,
            WireType::SixtyFour => 1,
            WireType::LengthDelimited => 2,
            WireType::StartGroup => 3,
            WireType::EndGroup => 4,
            WireType::ThirtyTwo => 5,
        }
    }
}

//////////////////////////////////////////// FieldNumber ///////////////////////////////////////////

pub const FIRST_FIELD_NUMBER: u32 = 1;
pub const LAST_FIELD_NUMBER: u32 = (1 << 29) - 1;

pub const FIRST_RESERVED_FIELD_NUMBER: u32 = 19000;
pub const LAST_RESERVED_FIELD_NUMBER: u32 = 19999;

/// A field number that a schema may declare.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FieldNumber {
    field_number: u32,
}

impl FieldNumber {
    /// Construct a field number for use in a schema.  The reserved range is rejected.
    pub fn new(field_number: u32) -> Result<FieldNumber, Error> {
        let field_number = FieldNumber::on_wire(field_number)?;
        if (FIRST_RESERVED_FIELD_NUMBER..=LAST_RESERVED_FIELD_NUMBER)
            .contains(&field_number.field_number)
        {
            return Err(Error::InvalidFieldNumber {
                field_number: field_number.field_number,
                what: "field is reserved",
            });
        }
        Ok(field_number)
    }

    // Field numbers read off the wire may fall in the reserved range; they are unknown fields.
    fn on_wire(field_number: u32) -> Result<FieldNumber, Error> {
        if field_number < FIRST_FIELD_NUMBER {
            return Err(Error::InvalidFieldNumber {
                field_number,
                what: "field number must be positive integer",
            });
        }
        if field_number > LAST_FIELD_NUMBER {
            return Err(Error::InvalidFieldNumber {
                field_number,
                what: "field number too large",
            });
        }
        Ok(FieldNumber { field_number })
    }

    pub fn get(&self) -> u32 {
        self.field_number
    }
}

impl From<FieldNumber> for u32 {
    fn from(f: FieldNumber) -> u32 {
        f.field_number
    }
}

impl PartialEq<u32> for FieldNumber {
    fn eq(&self, other: &u32) -> bool {
        self.field_number == *other
    }
}

impl std::fmt::Display for FieldNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.field_number)
    }
}

//////////////////////////////////////////////// Tag ///////////////////////////////////////////////

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tag {
    pub field_number: FieldNumber,
    pub wire_type: WireType,
}

impl Tag {
    pub fn new(field_number: FieldNumber, wire_type: WireType) -> Self {
        Self {
            field_number,
            wire_type,
        }
    }

    fn v64(&self) -> v64 {
        let f: u32 = self.field_number.into();
        let w: u32 = self.wire_type.tag_bits();
        v64::from((f << 3) | w)
    }
}

impl Packable for Tag {
    fn pack_sz(&self) -> usize {
        self.v64().pack_sz()
    }

    fn pack(&self, buf: &mut [u8]) {
        self.v64().pack(buf);
    }
}

impl<'a> Unpackable<'a> for Tag {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let mut up = Unpacker::new(buf);
        let tag: v64 = up.unpack()?;
        let tag: u64 = tag.into();
        if tag > u32::MAX as u64 {
            return Err(Error::TagTooLarge { tag });
        }
        let tag: u32 = tag as u32;
        let field_number = FieldNumber::on_wire(tag >> 3)?;
        let wire_type = WireType::new(tag & 7)?;
        Ok((
            Tag {
                field_number,
                wire_type,
            },
            up.remain(),
        ))
    }
}
