use std::borrow::Cow;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use buffertk::{stack_pack, v64, Unpacker};

use super::field_types;
use super::unknown::skip_field;
use super::{
    Error, FieldDescriptor, FieldKind, FieldNumber, MessageDescriptor, MessageType, ParseOptions,
    RepeatedField, Tag, UnknownFields, Value, WireType, DECODE_ERROR, ENCODE_ERROR,
    UNKNOWN_ENUM_VALUE, UNKNOWN_FIELD,
};

/////////////////////////////////////////// FieldSelector //////////////////////////////////////////

/// FieldSelector names a field either by its name or by its tag number.
pub trait FieldSelector {
    fn index_in(&self, descriptor: &MessageDescriptor) -> Option<usize>;
    fn describe(&self) -> String;
}

impl FieldSelector for &str {
    fn index_in(&self, descriptor: &MessageDescriptor) -> Option<usize> {
        descriptor.index_of_name(self)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl FieldSelector for &String {
    fn index_in(&self, descriptor: &MessageDescriptor) -> Option<usize> {
        descriptor.index_of_name(self)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl FieldSelector for u32 {
    fn index_in(&self, descriptor: &MessageDescriptor) -> Option<usize> {
        descriptor.index_of_number(*self)
    }

    fn describe(&self) -> String {
        format!("#{}", self)
    }
}

/////////////////////////////////////////////// Slot ///////////////////////////////////////////////

#[derive(Clone)]
enum Slot {
    Unset,
    Set(Value),
    // A child handed out by mutable_message.  It counts as present once something touches it.
    Default(Box<Message>),
    Repeated(RepeatedField),
}

#[derive(Debug, PartialEq, Hash)]
enum Present<'a> {
    Value(&'a Value),
    Message(&'a Message),
    Repeated(&'a RepeatedField),
}

////////////////////////////////////////////// Message /////////////////////////////////////////////

/// Message is one instance of a [MessageDescriptor].
///
/// Singular fields are unset until assigned.  Reading an unset field yields its default without
/// changing its state.  An unset message field may be handed out for editing by
/// [Message::mutable_message]; it becomes present the moment anything beneath it is modified, and
/// so does every default-materialized ancestor above it.  Repeated fields are always present.
#[derive(Clone)]
pub struct Message {
    descriptor: &'static MessageDescriptor,
    slots: Vec<Slot>,
    unknown: UnknownFields,
    touched: bool,
}

impl Message {
    pub fn new(descriptor: &'static MessageDescriptor) -> Self {
        let slots = descriptor
            .fields()
            .iter()
            .map(|fd| {
                if fd.is_repeated() {
                    Slot::Repeated(RepeatedField::new(fd))
                } else {
                    Slot::Unset
                }
            })
            .collect();
        Self {
            descriptor,
            slots,
            unknown: UnknownFields::default(),
            touched: false,
        }
    }

    pub fn descriptor(&self) -> &'static MessageDescriptor {
        self.descriptor
    }

    fn lookup(
        &self,
        field: impl FieldSelector,
    ) -> Result<(usize, &'static FieldDescriptor), Error> {
        let descriptor: &'static MessageDescriptor = self.descriptor;
        match field.index_in(descriptor) {
            Some(idx) => Ok((idx, &descriptor.fields()[idx])),
            None => Err(Error::NoSuchField {
                message: descriptor.display_name().to_string(),
                field: field.describe(),
            }),
        }
    }

    fn present(&self, idx: usize) -> Option<Present<'_>> {
        match &self.slots[idx] {
            Slot::Unset => None,
            Slot::Set(Value::Message(m)) => Some(Present::Message(m)),
            Slot::Set(v) => Some(Present::Value(v)),
            Slot::Default(child) if child.is_touched() => Some(Present::Message(child)),
            Slot::Default(_) => None,
            Slot::Repeated(r) => Some(Present::Repeated(r)),
        }
    }

    fn is_touched(&self) -> bool {
        self.touched
            || self.slots.iter().any(|slot| match slot {
                Slot::Default(child) => child.is_touched(),
                Slot::Repeated(r) => r.is_dirty(),
                _ => false,
            })
    }

    /// True if the field is set.  Repeated fields are always set; unknown names never are.
    pub fn has(&self, field: impl FieldSelector) -> bool {
        match self.lookup(field) {
            Ok((idx, _)) => self.present(idx).is_some(),
            Err(_) => false,
        }
    }

    /// The value of the field, or its default if unset.  Repeated fields come back as a list.
    pub fn get(&self, field: impl FieldSelector) -> Result<Cow<'_, Value>, Error> {
        let (idx, fd) = self.lookup(field)?;
        Ok(match &self.slots[idx] {
            Slot::Unset => Cow::Owned(fd.default_value()),
            Slot::Set(v) => Cow::Borrowed(v),
            Slot::Default(child) => Cow::Owned(Value::Message(child.clone())),
            Slot::Repeated(r) => Cow::Owned(Value::List(r.to_vec())),
        })
    }

    /// The message held by a singular message field, or an empty one if unset.
    pub fn message(&self, field: impl FieldSelector) -> Result<Cow<'_, Message>, Error> {
        let (idx, fd) = self.lookup(field)?;
        let ty = singular_message(fd)?;
        Ok(match &self.slots[idx] {
            Slot::Set(Value::Message(m)) => Cow::Borrowed(&**m),
            Slot::Default(child) => Cow::Borrowed(&**child),
            _ => Cow::Owned(ty.new_message()),
        })
    }

    /// Edit a singular message field in place.  An unset field is filled with an empty message
    /// that stays absent until it, or something beneath it, is modified.
    pub fn mutable_message(&mut self, field: impl FieldSelector) -> Result<&mut Message, Error> {
        let (idx, fd) = self.lookup(field)?;
        let ty = singular_message(fd)?;
        if let Slot::Unset = self.slots[idx] {
            self.slots[idx] = Slot::Default(Box::new(ty.new_message()));
        }
        match &mut self.slots[idx] {
            Slot::Set(Value::Message(m)) => Ok(&mut **m),
            Slot::Default(child) => Ok(&mut **child),
            _ => Err(Error::InvalidSchema {
                what: format!("{} does not hold a message", fd),
            }),
        }
    }

    /// Assign the field.  Repeated fields take a list and replace their contents; message fields
    /// take a message of the declared type or a map that builds one.
    pub fn set(&mut self, field: impl FieldSelector, value: impl Into<Value>) -> Result<(), Error> {
        let (idx, fd) = self.lookup(field)?;
        let value = value.into();
        if fd.is_repeated() {
            let list = match value {
                Value::List(list) => list,
                value => return Err(Error::type_error(fd.name(), "list", &value)),
            };
            let list = list
                .into_iter()
                .map(|v| coerce(fd, v))
                .collect::<Result<Vec<_>, Error>>()?;
            self.assign_repeated(idx, list)?;
        } else {
            let value = fd.check(coerce(fd, value)?)?;
            self.slots[idx] = Slot::Set(value);
        }
        self.touched = true;
        Ok(())
    }

    /// Replace the contents of a repeated field.  Nothing changes if any element is rejected.
    pub fn set_repeated<V: Into<Value>>(
        &mut self,
        field: impl FieldSelector,
        values: impl IntoIterator<Item = V>,
    ) -> Result<(), Error> {
        let (idx, _) = self.lookup(field)?;
        self.assign_repeated(idx, values)?;
        self.touched = true;
        Ok(())
    }

    fn assign_repeated<V: Into<Value>>(
        &mut self,
        idx: usize,
        values: impl IntoIterator<Item = V>,
    ) -> Result<(), Error> {
        match &mut self.slots[idx] {
            Slot::Repeated(r) => r.assign(values),
            _ => Err(not_repeated(&self.descriptor.fields()[idx])),
        }
    }

    /// Unset the field.  A repeated field is emptied and stays present.
    pub fn clear(&mut self, field: impl FieldSelector) -> Result<(), Error> {
        let (idx, _) = self.lookup(field)?;
        match &mut self.slots[idx] {
            Slot::Repeated(r) => r.clear(),
            slot => *slot = Slot::Unset,
        }
        Ok(())
    }

    pub fn repeated(&self, field: impl FieldSelector) -> Result<&RepeatedField, Error> {
        let (idx, fd) = self.lookup(field)?;
        match &self.slots[idx] {
            Slot::Repeated(r) => Ok(r),
            _ => Err(not_repeated(fd)),
        }
    }

    /// Edit a repeated field in place.  Handing out the field changes nothing; the message counts
    /// as modified once the field is.
    pub fn mutable_repeated(
        &mut self,
        field: impl FieldSelector,
    ) -> Result<&mut RepeatedField, Error> {
        let (idx, fd) = self.lookup(field)?;
        match &mut self.slots[idx] {
            Slot::Repeated(r) => Ok(r),
            _ => Err(not_repeated(fd)),
        }
    }

    /// Follow a chain of singular message fields and read the last link.  Returns None when any
    /// link is unset.
    pub fn get_path(&self, path: &[&str]) -> Result<Option<Cow<'_, Value>>, Error> {
        self.walk_path(path).map(|walked| walked.ok())
    }

    /// As [Message::get_path], but an unset link is a [Error::FieldNotSet] naming it.
    pub fn get_path_required(&self, path: &[&str]) -> Result<Cow<'_, Value>, Error> {
        match self.walk_path(path)? {
            Ok(value) => Ok(value),
            Err(unset) => Err(Error::FieldNotSet {
                field: path[..=unset].join("."),
            }),
        }
    }

    // The inner Err carries the index of the first unset link.
    fn walk_path(&self, path: &[&str]) -> Result<Result<Cow<'_, Value>, usize>, Error> {
        let (last, links) = match path.split_last() {
            Some(split) => split,
            None => {
                return Err(Error::NoSuchField {
                    message: self.descriptor.display_name().to_string(),
                    field: String::new(),
                })
            }
        };
        let mut current: &Message = self;
        for (depth, link) in links.iter().enumerate() {
            let (idx, fd) = current.lookup(*link)?;
            singular_message(fd)?;
            current = match current.present(idx) {
                Some(Present::Message(m)) => m,
                _ => return Ok(Err(depth)),
            };
        }
        let (idx, _) = current.lookup(*last)?;
        if current.present(idx).is_none() {
            return Ok(Err(links.len()));
        }
        current.get(*last).map(Ok)
    }

    /// Check that every required field is set, here and in every present nested message.
    pub fn validate(&self) -> Result<(), Error> {
        for (idx, fd) in self.descriptor.fields().iter().enumerate() {
            match self.present(idx) {
                None if fd.is_required() => return Err(Error::EncodeError { field: fd }),
                Some(Present::Message(m)) => m.validate()?,
                Some(Present::Repeated(r)) => {
                    for m in r.iter().filter_map(Value::as_message) {
                        m.validate()?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn unknown_fields(&self) -> &UnknownFields {
        &self.unknown
    }

    /// The number of distinct tags this message holds but its descriptor does not declare.
    pub fn unknown_field_count(&self) -> usize {
        self.unknown.len()
    }

    //////////////////////////////////////////// serialize /////////////////////////////////////////

    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.serialize_into(&mut out)?;
        Ok(out)
    }

    /// Append the wire form of this message to `out`.  On error `out` is left as it was.
    pub fn serialize_into(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        let len = out.len();
        if let Err(err) = self.write_fields(out) {
            out.truncate(len);
            ENCODE_ERROR.click();
            return Err(err);
        }
        Ok(())
    }

    fn write_fields(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        let fields = self.descriptor.fields();
        for (idx, fd) in fields.iter().enumerate() {
            if fd.is_required() && self.present(idx).is_none() {
                return Err(Error::EncodeError { field: fd });
            }
        }
        for (idx, fd) in fields.iter().enumerate() {
            match self.present(idx) {
                Some(Present::Value(v)) => write_value(fd, v, out)?,
                Some(Present::Message(m)) => write_message(fd, m, out)?,
                Some(Present::Repeated(r)) => r.write(out)?,
                None => {}
            }
        }
        self.unknown.write(out);
        Ok(())
    }

    ////////////////////////////////////////////// parse ///////////////////////////////////////////

    pub fn parse(descriptor: &'static MessageDescriptor, buf: &[u8]) -> Result<Message, Error> {
        Self::parse_with_options(descriptor, buf, &ParseOptions::default())
    }

    pub fn parse_with_options(
        descriptor: &'static MessageDescriptor,
        buf: &[u8],
        options: &ParseOptions,
    ) -> Result<Message, Error> {
        let mut msg = Message::new(descriptor);
        msg.merge_from_bytes_with_options(buf, options)?;
        Ok(msg)
    }

    /// Decode `buf` on top of this message.  Singular fields are overwritten, singular messages
    /// merge, and repeated fields append.
    pub fn merge_from_bytes(&mut self, buf: &[u8]) -> Result<(), Error> {
        self.merge_from_bytes_with_options(buf, &ParseOptions::default())
    }

    /// As [Message::merge_from_bytes].  On error the message may hold part of the input.
    pub fn merge_from_bytes_with_options(
        &mut self,
        buf: &[u8],
        options: &ParseOptions,
    ) -> Result<(), Error> {
        let ret = self.merge_and_check(buf, options);
        if ret.is_err() {
            DECODE_ERROR.click();
        }
        ret
    }

    fn merge_and_check(&mut self, buf: &[u8], options: &ParseOptions) -> Result<(), Error> {
        if buf.len() > options.max_message_size {
            return Err(Error::MessageTooLarge {
                size: buf.len(),
                limit: options.max_message_size,
            });
        }
        let mut up = Unpacker::new(buf);
        self.merge_fields(&mut up, None, options, 0)?;
        self.check_decoded()
    }

    fn merge_fields(
        &mut self,
        up: &mut Unpacker<'_>,
        group: Option<FieldNumber>,
        options: &ParseOptions,
        depth: usize,
    ) -> Result<(), Error> {
        if depth > options.recursion_limit {
            return Err(Error::RecursionLimitExceeded {
                limit: options.recursion_limit,
            });
        }
        let descriptor: &'static MessageDescriptor = self.descriptor;
        loop {
            if up.is_empty() {
                return match group {
                    Some(number) => Err(Error::DecodeError {
                        field: None,
                        what: format!("group {} is not terminated", number),
                    }),
                    None => Ok(()),
                };
            }
            let start = up.remain();
            let tag: Tag = up.unpack()?;
            if tag.wire_type == WireType::EndGroup {
                return match group {
                    Some(number) if number == tag.field_number => Ok(()),
                    _ => Err(Error::DecodeError {
                        field: None,
                        what: format!("unexpected end of group {}", tag.field_number),
                    }),
                };
            }
            let idx = match descriptor.index_of_number(tag.field_number.get()) {
                Some(idx) => idx,
                None => {
                    skip_field(tag, up, options, depth + 1)?;
                    let raw = &start[..start.len() - up.remain().len()];
                    self.unknown.append(tag.field_number.get(), raw);
                    UNKNOWN_FIELD.click();
                    continue;
                }
            };
            let fd: &'static FieldDescriptor = &descriptor.fields()[idx];
            let kind = fd.kind();
            if fd.is_repeated()
                && kind.is_packable()
                && tag.wire_type == WireType::LengthDelimited
            {
                let block: &[u8] = up.unpack()?;
                let mut elements = Unpacker::new(block);
                while !elements.is_empty() {
                    let value = field_types::read_payload(kind, &mut elements)
                        .map_err(|err| Error::decode(fd, err))?;
                    self.accept_decoded(idx, fd, value, None);
                }
                continue;
            }
            if tag.wire_type != kind.wire_type() {
                return Err(Error::DecodeError {
                    field: Some(fd),
                    what: format!("wire type {:?} cannot hold {}", tag.wire_type, kind),
                });
            }
            match kind {
                FieldKind::Message(ty) => {
                    let body: &[u8] = up.unpack()?;
                    let mut child = self.take_child(idx, *ty);
                    let mut inner = Unpacker::new(body);
                    child
                        .merge_fields(&mut inner, None, options, depth + 1)
                        .and_then(|_| child.check_decoded())
                        .map_err(|err| nested(fd, err))?;
                    self.store_child(idx, child);
                }
                FieldKind::Group(ty) => {
                    let mut child = self.take_child(idx, *ty);
                    child
                        .merge_fields(up, Some(tag.field_number), options, depth + 1)
                        .and_then(|_| child.check_decoded())
                        .map_err(|err| nested(fd, err))?;
                    self.store_child(idx, child);
                }
                _ => {
                    let value =
                        field_types::read_payload(kind, up).map_err(|err| Error::decode(fd, err))?;
                    let raw = &start[..start.len() - up.remain().len()];
                    self.accept_decoded(idx, fd, value, Some(raw));
                }
            }
        }
    }

    // Singular messages merge with what is already there; each repeated occurrence is new.
    fn take_child(&mut self, idx: usize, ty: MessageType) -> Message {
        match std::mem::replace(&mut self.slots[idx], Slot::Unset) {
            Slot::Set(Value::Message(m)) => *m,
            Slot::Default(m) => *m,
            other => {
                self.slots[idx] = other;
                ty.new_message()
            }
        }
    }

    fn store_child(&mut self, idx: usize, child: Message) {
        match &mut self.slots[idx] {
            Slot::Repeated(r) => r.push_checked(Value::from(child)),
            slot => *slot = Slot::Set(Value::from(child)),
        }
        self.touched = true;
    }

    // Enum values the local descriptor does not know are parked with the unknown fields so that
    // they survive a round trip.  `raw` is the tag and value as read; packed elements have none.
    fn accept_decoded(
        &mut self,
        idx: usize,
        fd: &'static FieldDescriptor,
        value: Value,
        raw: Option<&[u8]>,
    ) {
        if let FieldKind::Enum(ty) = fd.kind() {
            let known = value
                .as_i32()
                .map(|x| ty.descriptor().contains(x))
                .unwrap_or(false);
            if !known {
                match raw {
                    Some(raw) => self.unknown.append(fd.number(), raw),
                    None => {
                        let x = value.as_i64().unwrap_or_default();
                        let tag = Tag::new(fd.field_number(), WireType::Varint);
                        let entry = stack_pack(tag).pack(v64::from(x)).to_vec();
                        self.unknown.append(fd.number(), &entry);
                    }
                }
                UNKNOWN_ENUM_VALUE.click();
                return;
            }
        }
        match &mut self.slots[idx] {
            Slot::Repeated(r) => r.push_checked(value),
            slot => *slot = Slot::Set(value),
        }
        self.touched = true;
    }

    fn check_decoded(&self) -> Result<(), Error> {
        for (idx, fd) in self.descriptor.fields().iter().enumerate() {
            if fd.is_required() && self.present(idx).is_none() {
                return Err(Error::DecodeError {
                    field: Some(fd),
                    what: "required field is not set".to_string(),
                });
            }
        }
        Ok(())
    }

    ////////////////////////////////////////////// merge ///////////////////////////////////////////

    /// Merge the present fields of `other` into this message.  Both must share a descriptor.
    pub fn merge_from(&mut self, other: &Message) -> Result<(), Error> {
        if !std::ptr::eq(self.descriptor, other.descriptor) {
            return Err(Error::TypeError {
                field: self.descriptor.display_name().to_string(),
                expected: self.descriptor.display_name().to_string(),
                got: other.descriptor.display_name(),
            });
        }
        let descriptor: &'static MessageDescriptor = self.descriptor;
        for (idx, fd) in descriptor.fields().iter().enumerate() {
            match other.present(idx) {
                Some(Present::Value(v)) => {
                    self.slots[idx] = Slot::Set(v.clone());
                    self.touched = true;
                }
                Some(Present::Message(m)) => {
                    let ty = singular_message(fd)?;
                    let mut child = self.take_child(idx, ty);
                    child.merge_from(m)?;
                    self.store_child(idx, child);
                }
                Some(Present::Repeated(r)) if !r.is_empty() => {
                    if let Slot::Repeated(mine) = &mut self.slots[idx] {
                        for value in r.iter() {
                            mine.push_checked(value.clone());
                        }
                    }
                    self.touched = true;
                }
                _ => {}
            }
        }
        self.unknown.merge(&other.unknown);
        Ok(())
    }

    ////////////////////////////////////////// hash conversion /////////////////////////////////////

    /// The present fields of this message keyed by field name.  Nested messages become maps and
    /// repeated fields become lists.
    pub fn to_hash(&self) -> BTreeMap<String, Value> {
        let mut hash = BTreeMap::new();
        for (idx, fd) in self.descriptor.fields().iter().enumerate() {
            let value = match self.present(idx) {
                Some(Present::Value(v)) => v.clone(),
                Some(Present::Message(m)) => Value::Map(m.to_hash()),
                Some(Present::Repeated(r)) => {
                    Value::List(r.iter().map(hash_element).collect())
                }
                None => continue,
            };
            hash.insert(fd.name().to_string(), value);
        }
        hash
    }

    /// Build a message from a map keyed by field name.  Unknown keys are rejected.
    pub fn from_hash(
        descriptor: &'static MessageDescriptor,
        hash: &BTreeMap<String, Value>,
    ) -> Result<Message, Error> {
        let mut msg = Message::new(descriptor);
        for (key, value) in hash.iter() {
            msg.set(key, value.clone())?;
        }
        Ok(msg)
    }

    /// Build a message from a map, or accept a message that is already of the declared type.
    pub fn from_value(
        descriptor: &'static MessageDescriptor,
        value: Value,
    ) -> Result<Message, Error> {
        match value {
            Value::Map(hash) => Self::from_hash(descriptor, &hash),
            Value::Message(m) if std::ptr::eq(m.descriptor, descriptor) => Ok(*m),
            Value::Message(m) => Err(Error::TypeError {
                field: descriptor.display_name().to_string(),
                expected: descriptor.display_name().to_string(),
                got: m.descriptor.display_name(),
            }),
            value => Err(Error::type_error(
                descriptor.display_name(),
                descriptor.display_name(),
                &value,
            )),
        }
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Message) -> bool {
        std::ptr::eq(self.descriptor, other.descriptor)
            && (0..self.slots.len()).all(|idx| self.present(idx) == other.present(idx))
    }
}

impl Eq for Message {}

impl Hash for Message {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.descriptor, state);
        for idx in 0..self.slots.len() {
            self.present(idx).hash(state);
        }
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct(self.descriptor.display_name());
        for (idx, fd) in self.descriptor.fields().iter().enumerate() {
            if let Some(present) = self.present(idx) {
                s.field(fd.name(), &present);
            }
        }
        if !self.unknown.is_empty() {
            s.field("unknown", &self.unknown);
        }
        s.finish()
    }
}

/////////////////////////////////////////////// utils //////////////////////////////////////////////

fn singular_message(fd: &FieldDescriptor) -> Result<MessageType, Error> {
    match fd.kind().message_type() {
        Some(ty) if !fd.is_repeated() => Ok(ty),
        _ => Err(Error::TypeError {
            field: fd.name().to_string(),
            expected: fd.kind().name(),
            got: "message",
        }),
    }
}

fn not_repeated(fd: &FieldDescriptor) -> Error {
    Error::TypeError {
        field: fd.name().to_string(),
        expected: format!("{} {}", fd.label(), fd.kind()),
        got: "list",
    }
}

// Maps destined for message fields become messages; everything else is checked by the kind.
fn coerce(fd: &FieldDescriptor, value: Value) -> Result<Value, Error> {
    match (fd.kind().message_type(), value) {
        (Some(ty), Value::Map(hash)) => {
            Ok(Value::from(Message::from_hash(ty.descriptor(), &hash)?))
        }
        (_, value) => Ok(value),
    }
}

fn hash_element(value: &Value) -> Value {
    match value {
        Value::Message(m) => Value::Map(m.to_hash()),
        v => v.clone(),
    }
}

// Errors from a nested decode are reported against the field that holds the nested message.
fn nested(fd: &'static FieldDescriptor, err: Error) -> Error {
    match err {
        Error::DecodeError { .. } => Error::decode(fd, err),
        err => err,
    }
}

fn write_message(fd: &FieldDescriptor, m: &Message, out: &mut Vec<u8>) -> Result<(), Error> {
    match fd.kind() {
        FieldKind::Group(_) => {
            stack_pack(Tag::new(fd.field_number(), WireType::StartGroup)).append_to_vec(out);
            m.write_fields(out)?;
            stack_pack(Tag::new(fd.field_number(), WireType::EndGroup)).append_to_vec(out);
        }
        _ => {
            let mut body = Vec::new();
            m.write_fields(&mut body)?;
            stack_pack(fd.tag()).pack(body.as_slice()).append_to_vec(out);
        }
    }
    Ok(())
}

/// Append one tag/value pair for `value`.
pub(crate) fn write_value(
    fd: &FieldDescriptor,
    value: &Value,
    out: &mut Vec<u8>,
) -> Result<(), Error> {
    match (fd.kind(), value) {
        (FieldKind::Message(_) | FieldKind::Group(_), Value::Message(m)) => {
            write_message(fd, m, out)
        }
        (FieldKind::Message(_) | FieldKind::Group(_), value) => {
            Err(Error::type_error(fd.name(), fd.kind(), value))
        }
        (kind, value) => {
            stack_pack(fd.tag()).append_to_vec(out);
            field_types::write_payload(kind, fd.name(), value, out)
        }
    }
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////
