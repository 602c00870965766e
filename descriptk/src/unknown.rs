use std::collections::BTreeMap;

use buffertk::{v64, Unpacker};

use super::{Error, ParseOptions, Tag, WireType};

/////////////////////////////////////////// UnknownFields //////////////////////////////////////////

/// The raw bytes of every field a parse did not recognize, keyed by field number.
///
/// Each entry holds complete tag/value pairs exactly as they appeared on the wire so that they can
/// be written back out byte-for-byte.  Entries for one number are appended in arrival order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct UnknownFields {
    fields: BTreeMap<u32, Vec<u8>>,
}

impl UnknownFields {
    /// The number of distinct field numbers stored.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The raw tag/value bytes stored for `number`.
    pub fn get(&self, number: u32) -> Option<&[u8]> {
        self.fields.get(&number).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &[u8])> {
        self.fields.iter().map(|(n, b)| (*n, b.as_slice()))
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub(crate) fn append(&mut self, number: u32, raw: &[u8]) {
        self.fields.entry(number).or_default().extend_from_slice(raw);
    }

    pub(crate) fn merge(&mut self, other: &UnknownFields) {
        for (number, raw) in other.iter() {
            self.append(number, raw);
        }
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        for raw in self.fields.values() {
            out.extend_from_slice(raw);
        }
    }
}

///////////////////////////////////////////// skip_field ///////////////////////////////////////////

/// Consume the value that follows `tag`.  A group is consumed through its matching end tag.
/// `depth` is the nesting the value would have as a field, counted the same way as messages.
pub(crate) fn skip_field(
    tag: Tag,
    up: &mut Unpacker<'_>,
    options: &ParseOptions,
    depth: usize,
) -> Result<(), Error> {
    match tag.wire_type {
        WireType::Varint => {
            let _: v64 = up.unpack()?;
        }
        WireType::SixtyFour => {
            up.take(8)?;
        }
        WireType::LengthDelimited => {
            let _: &[u8] = up.unpack()?;
        }
        WireType::ThirtyTwo => {
            up.take(4)?;
        }
        WireType::StartGroup => {
            if depth > options.recursion_limit {
                return Err(Error::RecursionLimitExceeded {
                    limit: options.recursion_limit,
                });
            }
            loop {
                if up.is_empty() {
                    return Err(Error::DecodeError {
                        field: None,
                        what: format!("group {} is not terminated", tag.field_number),
                    });
                }
                let inner: Tag = up.unpack()?;
                if inner.wire_type == WireType::EndGroup {
                    if inner.field_number != tag.field_number {
                        return Err(Error::DecodeError {
                            field: None,
                            what: format!(
                                "group {} closed by end tag {}",
                                tag.field_number, inner.field_number
                            ),
                        });
                    }
                    break;
                }
                skip_field(inner, up, options, depth + 1)?;
            }
        }
        WireType::EndGroup => {
            return Err(Error::DecodeError {
                field: None,
                what: format!("unexpected end of group {}", tag.field_number),
            });
        }
    }
    Ok(())
}
