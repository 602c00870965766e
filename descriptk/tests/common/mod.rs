#![allow(dead_code)]

use descriptk::{
    enum_type, message_type, EnumDescriptor, EnumType, FieldKind, MessageDescriptor, MessageType,
};

////////////////////////////////////////////// nesting /////////////////////////////////////////////

message_type! {
    pub fn sub_sub() => MessageDescriptor::builder()
        .full_name("test.SubSub")
        .optional("leaf", 1, FieldKind::Int32)
        .build()
}

message_type! {
    pub fn sub() => MessageDescriptor::builder()
        .full_name("test.Sub")
        .optional("subsub", 1, FieldKind::Message(MessageType::new(sub_sub)))
        .optional("name", 2, FieldKind::String)
        .build()
}

message_type! {
    pub fn top() => MessageDescriptor::builder()
        .full_name("test.Top")
        .optional("sub", 1, FieldKind::Message(MessageType::new(sub)))
        .optional("i32", 2, FieldKind::Int32)
        .optional("u32", 3, FieldKind::UInt32)
        .optional("u64", 4, FieldKind::UInt64)
        .optional("i64", 5, FieldKind::Int64)
        .optional("f32", 6, FieldKind::Float)
        .optional("f64", 7, FieldKind::Double)
        .optional("flag", 8, FieldKind::Bool)
        .optional("text", 9, FieldKind::String)
        .optional("blob", 10, FieldKind::Bytes)
        .repeated("subs", 11, FieldKind::Message(MessageType::new(sub)))
        .repeated("ints", 12, FieldKind::Int32)
        .optional_with_default("greeting", 13, FieldKind::String, "hello")
        .optional("s64", 14, FieldKind::SInt64)
        .repeated("doubles", 15, FieldKind::Double)
        .build()
}

message_type! {
    pub fn outer() => MessageDescriptor::builder()
        .full_name("test.Outer")
        .optional("top", 1, FieldKind::Message(MessageType::new(top)))
        .build()
}

///////////////////////////////////////////// required /////////////////////////////////////////////

message_type! {
    pub fn needy() => MessageDescriptor::builder()
        .full_name("test.Needy")
        .required("id", 1, FieldKind::UInt64)
        .optional("note", 2, FieldKind::String)
        .build()
}

message_type! {
    pub fn holder() => MessageDescriptor::builder()
        .full_name("test.Holder")
        .optional("needy", 1, FieldKind::Message(MessageType::new(needy)))
        .repeated("many", 2, FieldKind::Message(MessageType::new(needy)))
        .build()
}

///////////////////////////////////////////// evolution ////////////////////////////////////////////

message_type! {
    pub fn record_v2() => MessageDescriptor::builder()
        .full_name("test.RecordV2")
        .optional("a", 1, FieldKind::Int32)
        .optional("b", 2, FieldKind::String)
        .optional("c", 3, FieldKind::UInt64)
        .optional("d", 4, FieldKind::Bool)
        .build()
}

// record_v2 without field 2
message_type! {
    pub fn record_v1() => MessageDescriptor::builder()
        .full_name("test.RecordV1")
        .optional("a", 1, FieldKind::Int32)
        .optional("c", 3, FieldKind::UInt64)
        .optional("d", 4, FieldKind::Bool)
        .build()
}

enum_type! {
    pub fn color_v1() => EnumDescriptor::builder()
        .full_name("test.ColorV1")
        .value("RED", 1)
        .value("GREEN", 2)
        .build()
}

enum_type! {
    pub fn color_v2() => EnumDescriptor::builder()
        .full_name("test.ColorV2")
        .value("RED", 1)
        .value("GREEN", 2)
        .value("BLUE", 3)
        .value("AZURE", 3)
        .build()
}

message_type! {
    pub fn paint_v1() => MessageDescriptor::builder()
        .full_name("test.PaintV1")
        .optional("color", 1, FieldKind::Enum(EnumType::new(color_v1)))
        .repeated("colors", 2, FieldKind::Enum(EnumType::new(color_v1)))
        .build()
}

message_type! {
    pub fn paint_v2() => MessageDescriptor::builder()
        .full_name("test.PaintV2")
        .optional("color", 1, FieldKind::Enum(EnumType::new(color_v2)))
        .repeated("colors", 2, FieldKind::Enum(EnumType::new(color_v2)))
        .build()
}

///////////////////////////////////////////// recursion ////////////////////////////////////////////

message_type! {
    pub fn foo() => MessageDescriptor::builder()
        .full_name("test.Foo")
        .optional("bar", 1, FieldKind::Message(MessageType::new(bar)))
        .optional("foo", 2, FieldKind::Message(MessageType::new(foo)))
        .optional("x", 3, FieldKind::Int32)
        .repeated("foos", 4, FieldKind::Message(MessageType::new(foo)))
        .build()
}

message_type! {
    pub fn bar() => MessageDescriptor::builder()
        .full_name("test.Bar")
        .optional("foo", 1, FieldKind::Message(MessageType::new(foo)))
        .optional("y", 2, FieldKind::Int32)
        .build()
}

message_type! {
    pub fn tree() => MessageDescriptor::builder()
        .full_name("test.Tree")
        .optional("value", 1, FieldKind::SInt32)
        .optional("left", 2, FieldKind::Group(MessageType::new(tree)))
        .optional("right", 3, FieldKind::Group(MessageType::new(tree)))
        .build()
}
