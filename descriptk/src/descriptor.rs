use std::collections::BTreeMap;

use super::field_types;
use super::{EnumType, Error, FieldNumber, Message, Tag, Value, WireType};

/////////////////////////////////////////////// Label //////////////////////////////////////////////

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Label {
    Required,
    Optional,
    Repeated,
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Required => write!(f, "required"),
            Label::Optional => write!(f, "optional"),
            Label::Repeated => write!(f, "repeated"),
        }
    }
}

//////////////////////////////////////////// MessageType ///////////////////////////////////////////

/// A reference to a message descriptor that is resolved only when it is needed.  Holding a
/// function rather than the descriptor lets message types refer to themselves and to each other.
#[derive(Clone, Copy)]
pub struct MessageType {
    resolve: fn() -> &'static MessageDescriptor,
}

impl MessageType {
    pub const fn new(resolve: fn() -> &'static MessageDescriptor) -> Self {
        Self { resolve }
    }

    pub fn descriptor(&self) -> &'static MessageDescriptor {
        (self.resolve)()
    }

    pub fn new_message(&self) -> Message {
        Message::new(self.descriptor())
    }

    /// True when `message` is an instance of this type.
    pub fn is_instance(&self, message: &Message) -> bool {
        std::ptr::eq(self.descriptor(), message.descriptor())
    }

    pub fn name(&self) -> &'static str {
        self.descriptor().display_name()
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &MessageType) -> bool {
        std::ptr::eq(self.descriptor(), other.descriptor())
    }
}

impl Eq for MessageType {}

// Never recurse into the descriptor:  the type graph may be cyclic.
impl std::fmt::Debug for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "message<{}>", self.name())
    }
}

///////////////////////////////////////////// FieldKind ////////////////////////////////////////////

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Int32,
    Int64,
    UInt32,
    UInt64,
    SInt32,
    SInt64,
    Fixed32,
    Fixed64,
    SFixed32,
    SFixed64,
    Float,
    Double,
    Bool,
    Enum(EnumType),
    String,
    Bytes,
    Message(MessageType),
    Group(MessageType),
}

impl FieldKind {
    pub fn wire_type(&self) -> WireType {
        match self {
            FieldKind::Int32
            | FieldKind::Int64
            | FieldKind::UInt32
            | FieldKind::UInt64
            | FieldKind::SInt32
            | FieldKind::SInt64
            | FieldKind::Bool
            | FieldKind::Enum(_) => WireType::Varint,
            FieldKind::Fixed64 | FieldKind::SFixed64 | FieldKind::Double => WireType::SixtyFour,
            FieldKind::Fixed32 | FieldKind::SFixed32 | FieldKind::Float => WireType::ThirtyTwo,
            FieldKind::String | FieldKind::Bytes | FieldKind::Message(_) => {
                WireType::LengthDelimited
            }
            FieldKind::Group(_) => WireType::StartGroup,
        }
    }

    /// Scalar numeric, bool, and enum kinds are written packed when repeated.
    pub fn is_packable(&self) -> bool {
        matches!(
            self.wire_type(),
            WireType::Varint | WireType::SixtyFour | WireType::ThirtyTwo
        )
    }

    pub fn message_type(&self) -> Option<MessageType> {
        match self {
            FieldKind::Message(ty) | FieldKind::Group(ty) => Some(*ty),
            _ => None,
        }
    }

    pub fn name(&self) -> String {
        match self {
            FieldKind::Enum(ty) => format!(
                "enum<{}>",
                ty.descriptor().fully_qualified_name().unwrap_or("anonymous")
            ),
            FieldKind::Message(ty) => format!("message<{}>", ty.name()),
            FieldKind::Group(ty) => format!("group<{}>", ty.name()),
            scalar => field_types::scalar_name(scalar).to_string(),
        }
    }

    /// The value an unset field of this kind reads as.
    pub fn default_value(&self) -> Value {
        match self {
            FieldKind::Enum(ty) => Value::Int(ty.descriptor().default_value() as i128),
            FieldKind::Message(ty) | FieldKind::Group(ty) => Value::from(ty.new_message()),
            scalar => field_types::scalar_default(scalar),
        }
    }

    /// Check `value` against this kind, returning it in canonical form.
    pub fn check(&self, field: &str, value: Value) -> Result<Value, Error> {
        match self {
            FieldKind::Message(ty) | FieldKind::Group(ty) => match value {
                Value::Message(m) if ty.is_instance(&m) => Ok(Value::Message(m)),
                Value::Message(m) => Err(Error::TypeError {
                    field: field.to_string(),
                    expected: self.name(),
                    got: m.descriptor().display_name(),
                }),
                value => Err(Error::type_error(field, self.name(), &value)),
            },
            FieldKind::Enum(ty) => field_types::check_enum(ty.descriptor(), field, value),
            scalar => field_types::check_scalar(scalar, field, value),
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

////////////////////////////////////////// FieldDescriptor /////////////////////////////////////////

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    number: FieldNumber,
    label: Label,
    kind: FieldKind,
    default: Option<Value>,
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> u32 {
        self.number.get()
    }

    pub fn field_number(&self) -> FieldNumber {
        self.number
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.label == Label::Required
    }

    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// The default declared in the schema, if any.
    pub fn explicit_default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// The value this field reads as while unset.
    pub fn default_value(&self) -> Value {
        match (&self.default, self.label) {
            (Some(value), _) => value.clone(),
            (None, Label::Repeated) => Value::List(Vec::new()),
            (None, _) => self.kind.default_value(),
        }
    }

    /// Check `value` for assignment to one element of this field.
    pub fn check(&self, value: Value) -> Result<Value, Error> {
        self.kind.check(&self.name, value)
    }

    /// The tag written before each unpacked value of this field.
    pub fn tag(&self) -> Tag {
        Tag::new(self.number, self.kind.wire_type())
    }
}

impl std::fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (tag={}, label={}, kind={}",
            self.name, self.number, self.label, self.kind
        )?;
        if let Some(default) = &self.default {
            write!(f, ", default={:?}", default)?;
        }
        write!(f, ")")
    }
}

///////////////////////////////////////// MessageDescriptor ////////////////////////////////////////

/// The schema of one message type.  Fields are kept in ascending tag order.
#[derive(Debug, PartialEq)]
pub struct MessageDescriptor {
    full_name: Option<String>,
    fields: Vec<FieldDescriptor>,
    by_name: BTreeMap<String, usize>,
}

impl MessageDescriptor {
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }

    pub fn fully_qualified_name(&self) -> Option<&str> {
        self.full_name.as_deref()
    }

    /// The fully-qualified name, or "anonymous" for a type declared without one.
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or("anonymous")
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.index_of_name(name).map(|idx| &self.fields[idx])
    }

    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.index_of_number(number).map(|idx| &self.fields[idx])
    }

    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn index_of_number(&self, number: u32) -> Option<usize> {
        self.fields
            .binary_search_by_key(&number, FieldDescriptor::number)
            .ok()
    }

    /// A fresh, empty instance of this type.
    pub fn new_message(&'static self) -> Message {
        Message::new(self)
    }
}

/////////////////////////////////////////// MessageBuilder /////////////////////////////////////////

/// Collects the fields of a message type.  Nothing is validated until [MessageBuilder::build].
#[derive(Clone, Debug, Default)]
pub struct MessageBuilder {
    full_name: Option<String>,
    fields: Vec<(String, u32, Label, FieldKind, Option<Value>)>,
}

impl MessageBuilder {
    pub fn full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    pub fn required(self, name: impl Into<String>, number: u32, kind: FieldKind) -> Self {
        self.field(name, number, Label::Required, kind, None)
    }

    pub fn optional(self, name: impl Into<String>, number: u32, kind: FieldKind) -> Self {
        self.field(name, number, Label::Optional, kind, None)
    }

    pub fn optional_with_default(
        self,
        name: impl Into<String>,
        number: u32,
        kind: FieldKind,
        default: impl Into<Value>,
    ) -> Self {
        self.field(name, number, Label::Optional, kind, Some(default.into()))
    }

    pub fn required_with_default(
        self,
        name: impl Into<String>,
        number: u32,
        kind: FieldKind,
        default: impl Into<Value>,
    ) -> Self {
        self.field(name, number, Label::Required, kind, Some(default.into()))
    }

    pub fn repeated(self, name: impl Into<String>, number: u32, kind: FieldKind) -> Self {
        self.field(name, number, Label::Repeated, kind, None)
    }

    pub fn field(
        mut self,
        name: impl Into<String>,
        number: u32,
        label: Label,
        kind: FieldKind,
        default: Option<Value>,
    ) -> Self {
        self.fields.push((name.into(), number, label, kind, default));
        self
    }

    /// Validate the fields and produce the descriptor.  Message kinds are not resolved here, so
    /// recursive types may be built in any order.
    pub fn build(self) -> Result<MessageDescriptor, Error> {
        let display = self.full_name.clone().unwrap_or_else(|| "anonymous".to_string());
        let mut fields = Vec::with_capacity(self.fields.len());
        for (name, number, label, kind, default) in self.fields {
            if name.is_empty() {
                return Err(Error::InvalidSchema {
                    what: format!("{} declares field {} without a name", display, number),
                });
            }
            let number = FieldNumber::new(number)?;
            let default = match default {
                Some(_) if label == Label::Repeated => {
                    return Err(Error::InvalidSchema {
                        what: format!("{}.{} is repeated and cannot have a default", display, name),
                    });
                }
                Some(_) if kind.message_type().is_some() => {
                    return Err(Error::InvalidSchema {
                        what: format!(
                            "{}.{} is a message and cannot have a default",
                            display, name
                        ),
                    });
                }
                Some(default) => Some(kind.check(&name, default)?),
                None => None,
            };
            fields.push(FieldDescriptor {
                name,
                number,
                label,
                kind,
                default,
            });
        }
        fields.sort_by_key(|f| f.number);
        for pair in fields.windows(2) {
            if pair[0].number == pair[1].number {
                return Err(Error::InvalidSchema {
                    what: format!(
                        "{} uses tag {} for both {} and {}",
                        display, pair[0].number, pair[0].name, pair[1].name
                    ),
                });
            }
        }
        let mut by_name = BTreeMap::new();
        for (idx, field) in fields.iter().enumerate() {
            if by_name.insert(field.name.clone(), idx).is_some() {
                return Err(Error::InvalidSchema {
                    what: format!("{} declares {} twice", display, field.name),
                });
            }
        }
        Ok(MessageDescriptor {
            full_name: self.full_name,
            fields,
            by_name,
        })
    }
}
