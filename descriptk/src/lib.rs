//! descriptk is a protocol buffer message runtime driven by descriptors rather than generated
//! structs.  A [MessageDescriptor] is built once per message type and lives for the life of the
//! process; [Message] instances hold per-field state against that descriptor, serialize to the
//! wire format byte-for-byte, parse it back, and carry unknown fields through untouched.
//!
//! Message and enum types may refer to each other (or themselves) through [MessageType] and
//! [EnumType], which resolve their descriptor lazily.  The [message_type] and [enum_type] macros
//! declare such a descriptor as a function backed by a `OnceLock`.

use biometrics::{Collector, Counter};

pub mod descriptor;
pub mod enums;
pub mod field_types;
pub mod message;
pub mod options;
pub mod pool;
pub mod repeated;
pub mod unknown;
pub mod value;
pub mod wire;
pub mod zigzag;

pub use descriptor::{
    FieldDescriptor, FieldKind, Label, MessageBuilder, MessageDescriptor, MessageType,
};
pub use enums::{EnumBuilder, EnumDescriptor, EnumType};
pub use message::{FieldSelector, Message};
pub use options::ParseOptions;
pub use pool::{
    find_enum, find_message, register_enum, register_message, registered_enums,
    registered_messages, Catalog, Published,
};
pub use repeated::RepeatedField;
pub use unknown::UnknownFields;
pub use value::{Text, Value};
pub use wire::{FieldNumber, Tag, WireType};
pub use zigzag::{unzigzag, unzigzag32, zigzag, zigzag32};

///////////////////////////////////////////// biometrics ///////////////////////////////////////////

static UNKNOWN_FIELD: Counter = Counter::new("descriptk.unknown_field");
static UNKNOWN_ENUM_VALUE: Counter = Counter::new("descriptk.unknown_enum_value");
static ENCODE_ERROR: Counter = Counter::new("descriptk.encode_error");
static DECODE_ERROR: Counter = Counter::new("descriptk.decode_error");
static CATALOG_PUBLISH: Counter = Counter::new("descriptk.catalog_publish");

pub fn register_biometrics(collector: &Collector) {
    collector.register_counter(&UNKNOWN_FIELD);
    collector.register_counter(&UNKNOWN_ENUM_VALUE);
    collector.register_counter(&ENCODE_ERROR);
    collector.register_counter(&DECODE_ERROR);
    collector.register_counter(&CATALOG_PUBLISH);
}

/////////////////////////////////////////////// Error //////////////////////////////////////////////

/// Error captures every failure of the message runtime.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// BufferTooShort indicates a payload that claims more bytes than remain.
    BufferTooShort { required: usize, had: usize },
    /// MalformedVarint indicates a varint that ran off the end of the input or past ten bytes.
    MalformedVarint { bytes: usize },
    /// UnsignedOverflow indicates a decoded value too large for its unsigned kind.
    UnsignedOverflow { value: u64 },
    /// SignedOverflow indicates a decoded value outside its signed kind.
    SignedOverflow { value: i64 },
    /// InvalidFieldNumber indicates that the field is not a user-assignable field.
    InvalidFieldNumber {
        field_number: u32,
        what: &'static str,
    },
    /// UnhandledWireType indicates wire type 6 or 7.
    UnhandledWireType { wire_type: u32 },
    /// TagTooLarge indicates the tag would overflow a 32-bit number.
    TagTooLarge { tag: u64 },
    /// RangeError indicates a value outside the bounds of the field's kind.
    RangeError {
        field: String,
        kind: &'static str,
        value: String,
    },
    /// TypeError indicates a value of the wrong shape for the field.
    TypeError {
        field: String,
        expected: String,
        got: &'static str,
    },
    /// TextEncodingError indicates a string field whose bytes are not UTF-8.
    TextEncodingError { field: String },
    /// EncodeError indicates a required field was not set at serialization time.
    EncodeError { field: &'static FieldDescriptor },
    /// DecodeError indicates a parse that produced an invalid message.
    DecodeError {
        field: Option<&'static FieldDescriptor>,
        what: String,
    },
    /// NoSuchField indicates a field name or number the message does not declare.
    NoSuchField { message: String, field: String },
    /// FieldNotSet indicates a path lookup reached an unset field.
    FieldNotSet { field: String },
    /// InvalidSchema indicates a descriptor that cannot be built.
    InvalidSchema { what: String },
    /// RecursionLimitExceeded indicates nesting deeper than [ParseOptions::recursion_limit].
    RecursionLimitExceeded { limit: usize },
    /// MessageTooLarge indicates input larger than [ParseOptions::max_message_size].
    MessageTooLarge { size: usize, limit: usize },
}

impl Error {
    pub(crate) fn type_error(field: &str, expected: impl ToString, value: &Value) -> Self {
        Error::TypeError {
            field: field.to_string(),
            expected: expected.to_string(),
            got: value.kind_name(),
        }
    }

    /// Scope `err` to `field` as a decode error.
    pub(crate) fn decode(field: &'static FieldDescriptor, err: Error) -> Self {
        Error::DecodeError {
            field: Some(field),
            what: err.to_string(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::BufferTooShort { required, had } => {
                write!(f, "buffer too short: expected {}, had {}", required, had)
            }
            Error::MalformedVarint { bytes } => {
                write!(f, "malformed varint after {} bytes", bytes)
            }
            Error::UnsignedOverflow { value } => {
                write!(f, "unsigned integer cannot hold value={}", value)
            }
            Error::SignedOverflow { value } => {
                write!(f, "signed integer cannot hold value={}", value)
            }
            Error::InvalidFieldNumber { field_number, what } => {
                write!(f, "invalid field_number={}: {}", field_number, what)
            }
            Error::UnhandledWireType { wire_type } => {
                write!(f, "wire_type={} not handled by this implementation", wire_type)
            }
            Error::TagTooLarge { tag } => write!(f, "tag={} overflows 32-bits", tag),
            Error::RangeError { field, kind, value } => {
                write!(f, "{} is out of range for {} field {}", value, kind, field)
            }
            Error::TypeError {
                field,
                expected,
                got,
            } => write!(f, "field {} expects {}, got {}", field, expected, got),
            Error::TextEncodingError { field } => {
                write!(f, "string field {} is not valid UTF-8", field)
            }
            Error::EncodeError { field } => write!(f, "required field not set: {}", field),
            Error::DecodeError {
                field: Some(field),
                what,
            } => write!(f, "could not decode {}: {}", field, what),
            Error::DecodeError { field: None, what } => write!(f, "could not decode: {}", what),
            Error::NoSuchField { message, field } => {
                write!(f, "{} has no field {}", message, field)
            }
            Error::FieldNotSet { field } => write!(f, "field {} is not set", field),
            Error::InvalidSchema { what } => write!(f, "invalid schema: {}", what),
            Error::RecursionLimitExceeded { limit } => {
                write!(f, "messages nest deeper than {} levels", limit)
            }
            Error::MessageTooLarge { size, limit } => {
                write!(f, "message of {} bytes exceeds limit of {}", size, limit)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<buffertk::Error> for Error {
    fn from(x: buffertk::Error) -> Self {
        match x {
            buffertk::Error::BufferTooShort { required, had } => {
                Error::BufferTooShort { required, had }
            }
            buffertk::Error::MalformedVarint { bytes } => Error::MalformedVarint { bytes },
            buffertk::Error::UnsignedOverflow { value } => Error::UnsignedOverflow { value },
            buffertk::Error::SignedOverflow { value } => Error::SignedOverflow { value },
        }
    }
}

////////////////////////////////////////////// macros //////////////////////////////////////////////

/// Declare a function returning a `&'static MessageDescriptor` that is built on first use.
///
/// ```
/// use descriptk::{message_type, FieldKind, MessageDescriptor, MessageType};
///
/// message_type! {
///     pub fn node() => MessageDescriptor::builder()
///         .full_name("tree.Node")
///         .optional("label", 1, FieldKind::String)
///         .repeated("children", 2, FieldKind::Message(MessageType::new(node)))
///         .build()
/// }
///
/// let mut root = node().new_message();
/// root.mutable_repeated("children").unwrap().add_message().unwrap();
/// assert_eq!(1, root.repeated("children").unwrap().len());
/// ```
///
/// # Panics
///
/// When the builder returns an error.  Descriptors are program text; a bad one is a bug.
#[macro_export]
macro_rules! message_type {
    ($vis:vis fn $name:ident() => $build:expr) => {
        $vis fn $name() -> &'static $crate::MessageDescriptor {
            static DESCRIPTOR: ::std::sync::OnceLock<$crate::MessageDescriptor> =
                ::std::sync::OnceLock::new();
            DESCRIPTOR.get_or_init(|| {
                let built: ::std::result::Result<$crate::MessageDescriptor, $crate::Error> = $build;
                match built {
                    Ok(descriptor) => descriptor,
                    Err(err) => panic!("invalid descriptor {}: {}", stringify!($name), err),
                }
            })
        }
    };
}

/// Declare a function returning a `&'static EnumDescriptor` that is built on first use.
///
/// # Panics
///
/// When the builder returns an error.
#[macro_export]
macro_rules! enum_type {
    ($vis:vis fn $name:ident() => $build:expr) => {
        $vis fn $name() -> &'static $crate::EnumDescriptor {
            static DESCRIPTOR: ::std::sync::OnceLock<$crate::EnumDescriptor> =
                ::std::sync::OnceLock::new();
            DESCRIPTOR.get_or_init(|| {
                let built: ::std::result::Result<$crate::EnumDescriptor, $crate::Error> = $build;
                match built {
                    Ok(descriptor) => descriptor,
                    Err(err) => panic!("invalid enum {}: {}", stringify!($name), err),
                }
            })
        }
    };
}
