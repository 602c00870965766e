use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use descriptk::{Error, Message, Value};

mod common;

use common::{holder, needy, outer, sub, sub_sub, top};

fn hash_of(m: &Message) -> u64 {
    let mut h = DefaultHasher::new();
    m.hash(&mut h);
    h.finish()
}

////////////////////////////////////////////// bounds //////////////////////////////////////////////

#[test]
fn uint32_bounds() {
    let mut m = top().new_message();
    m.set("u32", 0xffffffffu32).unwrap();
    assert_eq!(Some(0xffffffff), m.get("u32").unwrap().as_u32());
    match m.set("u32", 0x100000000u64) {
        Err(Error::RangeError { field, .. }) => assert_eq!("u32", field),
        other => panic!("human got uint32 upper bound wrong? {:?}", other),
    }
    assert!(matches!(m.set("u32", -1), Err(Error::RangeError { .. })));
    // failed assignments leave the field alone
    assert_eq!(Some(0xffffffff), m.get("u32").unwrap().as_u32());
}

#[test]
fn uint64_bounds() {
    let mut m = top().new_message();
    m.set("u64", 0xffffffff_ffffffffu64).unwrap();
    assert!(matches!(
        m.set("u64", Value::Int(0x1_00000000_00000000)),
        Err(Error::RangeError { .. })
    ));
    assert!(matches!(m.set("u64", -1), Err(Error::RangeError { .. })));
}

#[test]
fn int64_literal() {
    let mut m = top().new_message();
    m.set("i64", -2082844800000000i64).unwrap();
    let bytes = m.serialize().unwrap();
    assert_eq!(
        vec![0x28, 0x80, 0xc0, 0xcb, 0xbc, 0x9e, 0xb5, 0xa6, 0xfc, 0xff, 0x01],
        bytes,
        "human got negative int64 encoding wrong?"
    );
    let parsed = Message::parse(top(), &bytes).unwrap();
    assert_eq!(Some(-2082844800000000), parsed.get("i64").unwrap().as_i64());
}

///////////////////////////////////////////// type errors //////////////////////////////////////////

#[test]
fn type_errors() {
    let mut m = top().new_message();
    assert!(matches!(m.set("i32", 1.5), Err(Error::TypeError { .. })));
    assert!(matches!(m.set("flag", 1), Err(Error::TypeError { .. })));
    assert!(matches!(m.set("text", 1), Err(Error::TypeError { .. })));
    assert!(matches!(
        m.set("sub", sub_sub().new_message()),
        Err(Error::TypeError { .. })
    ));
    assert!(matches!(m.set("nope", 1), Err(Error::NoSuchField { .. })));
    assert!(matches!(m.set(99u32, 1), Err(Error::NoSuchField { .. })));
    m.set("f32", 1).unwrap();
    assert_eq!(Value::Float(1.0), *m.get("f32").unwrap(), "human got widening wrong?");
}

#[test]
fn strings_validate_on_write() {
    // field 9 holds 0xc3 0x28, which is not UTF-8
    let m = Message::parse(top(), &[0x4a, 0x02, 0xc3, 0x28]).unwrap();
    let text = m.get("text").unwrap();
    assert!(!text.as_text().unwrap().is_valid());
    assert!(matches!(
        m.serialize(),
        Err(Error::TextEncodingError { .. })
    ));
    let mut m = top().new_message();
    assert!(matches!(
        m.set("text", descriptk::Text::from_bytes(vec![0xff])),
        Err(Error::TextEncodingError { .. })
    ));
}

#[test]
fn bytes_pass_through() {
    let mut m = top().new_message();
    m.set("blob", &[0u8, 0xff, 0x80][..]).unwrap();
    let parsed = Message::parse(top(), &m.serialize().unwrap()).unwrap();
    assert_eq!(Some(&[0u8, 0xff, 0x80][..]), parsed.get("blob").unwrap().as_bytes());
}

//////////////////////////////////////////// presence //////////////////////////////////////////////

#[test]
fn scalar_defaults_do_not_set() {
    let m = top().new_message();
    assert_eq!(Value::Int(0), *m.get("i32").unwrap());
    assert_eq!(Some("hello"), m.get("greeting").unwrap().as_str());
    assert!(!m.has("i32"));
    assert!(!m.has("greeting"));
    assert_eq!(Vec::<u8>::new(), m.serialize().unwrap());
}

#[test]
fn repeated_fields_are_always_present() {
    let mut m = top().new_message();
    assert!(m.has("ints"));
    m.set_repeated("ints", [1, 2]).unwrap();
    m.clear("ints").unwrap();
    assert!(m.has("ints"));
    assert!(m.repeated("ints").unwrap().is_empty());
}

#[test]
fn clear_unsets() {
    let mut m = top().new_message();
    m.set("i32", 5).unwrap();
    assert!(m.has(2u32));
    m.clear(2u32).unwrap();
    assert!(!m.has("i32"));
    assert_eq!(Value::Int(0), *m.get("i32").unwrap());
}

#[test]
fn reading_a_submessage_does_not_set_it() {
    let mut m = top().new_message();
    assert!(!m.message("sub").unwrap().has("name"));
    assert!(!m.has("sub"));
    m.mutable_message("sub").unwrap();
    assert!(!m.has("sub"), "human got lazy materialization wrong?");
    assert_eq!(Vec::<u8>::new(), m.serialize().unwrap());
}

#[test]
fn mutation_propagates_up_the_chain() {
    let mut m = top().new_message();
    m.mutable_message("sub")
        .unwrap()
        .mutable_message("subsub")
        .unwrap()
        .set("leaf", 1)
        .unwrap();
    assert!(m.has("sub"), "grandparent should see its child as set");
    assert!(m.message("sub").unwrap().has("subsub"));
    assert_eq!(
        vec![0x0a, 0x04, 0x0a, 0x02, 0x08, 0x01],
        m.serialize().unwrap()
    );
}

#[test]
fn repeated_mutation_propagates() {
    let mut m = top().new_message();
    m.mutable_message("sub")
        .unwrap()
        .mutable_message("subsub")
        .unwrap();
    assert!(!m.has("sub"));
    let mut child = sub().new_message();
    child.set("name", "x").unwrap();
    m.mutable_repeated("subs").unwrap().push(child).unwrap();
    assert!(!m.has("sub"));
    m.mutable_repeated("subs")
        .unwrap()
        .message_mut(0)
        .unwrap()
        .set("name", "y")
        .unwrap();
    assert_eq!(
        Some("y"),
        m.repeated("subs")
            .unwrap()
            .get(0)
            .unwrap()
            .as_message()
            .unwrap()
            .get("name")
            .unwrap()
            .as_str()
    );
}

#[test]
fn handing_out_a_repeated_field_does_not_set_it() {
    let mut o = outer().new_message();
    o.mutable_message("top")
        .unwrap()
        .mutable_repeated("ints")
        .unwrap();
    assert!(!o.has("top"), "human got repeated presence wrong?");
    assert!(o.serialize().unwrap().is_empty());
    o.mutable_message("top")
        .unwrap()
        .mutable_repeated("ints")
        .unwrap()
        .push(7)
        .unwrap();
    assert!(o.has("top"));
    assert_eq!(vec![0x0a, 0x03, 0x62, 0x01, 0x07], o.serialize().unwrap());
}

/////////////////////////////////////////////// paths //////////////////////////////////////////////

#[test]
fn paths() {
    let mut m = top().new_message();
    assert_eq!(None, m.get_path(&["sub", "subsub", "leaf"]).unwrap());
    assert_eq!(
        Err(Error::FieldNotSet {
            field: "sub".to_string()
        }),
        m.get_path_required(&["sub", "subsub", "leaf"])
    );
    m.mutable_message("sub").unwrap().set("name", "n").unwrap();
    assert_eq!(
        Err(Error::FieldNotSet {
            field: "sub.subsub".to_string()
        }),
        m.get_path_required(&["sub", "subsub", "leaf"])
    );
    m.mutable_message("sub")
        .unwrap()
        .mutable_message("subsub")
        .unwrap()
        .set("leaf", 42)
        .unwrap();
    assert_eq!(
        Some(Value::Int(42)),
        m.get_path(&["sub", "subsub", "leaf"]).unwrap().map(|v| v.into_owned())
    );
    assert!(matches!(
        m.get_path(&["i32", "leaf"]),
        Err(Error::TypeError { .. })
    ));
    assert!(matches!(
        m.get_path(&["sub", "missing"]),
        Err(Error::NoSuchField { .. })
    ));
}

///////////////////////////////////////////// required /////////////////////////////////////////////

#[test]
fn validate_is_recursive() {
    let mut h = holder().new_message();
    assert!(h.is_valid());
    h.mutable_message("needy").unwrap().set("note", "hi").unwrap();
    match h.validate() {
        Err(Error::EncodeError { field }) => assert_eq!("id", field.name()),
        other => panic!("human got recursive validation wrong? {:?}", other),
    }
    h.mutable_message("needy").unwrap().set("id", 7u64).unwrap();
    assert!(h.is_valid());
    h.mutable_repeated("many").unwrap().add_message().unwrap();
    assert!(!h.is_valid());
}

#[test]
fn nested_required_fields_fail_the_outer_field() {
    // holder.needy present but empty
    match Message::parse(holder(), &[0x0a, 0x00]) {
        Err(Error::DecodeError {
            field: Some(field), ..
        }) => assert_eq!("needy", field.name()),
        other => panic!("human got nested decode error wrong? {:?}", other),
    }
    let mut n = needy().new_message();
    n.set("id", 1u64).unwrap();
    let mut h = holder().new_message();
    h.set("needy", n).unwrap();
    assert_eq!(vec![0x0a, 0x02, 0x08, 0x01], h.serialize().unwrap());
}

/////////////////////////////////////////// hash conversion ////////////////////////////////////////

fn populated() -> Message {
    let mut m = top().new_message();
    m.set("i32", -5).unwrap();
    m.set("text", "words").unwrap();
    m.set_repeated("ints", [1, 2, 3]).unwrap();
    m.mutable_message("sub")
        .unwrap()
        .mutable_message("subsub")
        .unwrap()
        .set("leaf", 9)
        .unwrap();
    m.mutable_repeated("subs")
        .unwrap()
        .add_message()
        .unwrap()
        .set("name", "first")
        .unwrap();
    m
}

#[test]
fn to_hash_has_present_fields_only() {
    let hash = populated().to_hash();
    let keys: Vec<&str> = hash.keys().map(String::as_str).collect();
    assert_eq!(vec!["doubles", "i32", "ints", "sub", "subs", "text"], keys);
    assert_eq!(Value::Int(-5), hash["i32"]);
    let sub = hash["sub"].as_map().unwrap();
    let subsub = sub["subsub"].as_map().unwrap();
    assert_eq!(Value::Int(9), subsub["leaf"]);
    let subs = hash["subs"].as_list().unwrap();
    assert_eq!(Some("first"), subs[0].as_map().unwrap()["name"].as_str());
}

#[test]
fn from_hash_inverts_to_hash() {
    let m = populated();
    let back = Message::from_hash(top(), &m.to_hash()).unwrap();
    assert_eq!(m, back);
    assert_eq!(hash_of(&m), hash_of(&back));
}

#[test]
fn from_hash_rejects_bad_input() {
    let mut hash = BTreeMap::new();
    hash.insert("bogus".to_string(), Value::from(1));
    assert!(matches!(
        Message::from_hash(top(), &hash),
        Err(Error::NoSuchField { .. })
    ));
    let mut hash = BTreeMap::new();
    hash.insert("sub".to_string(), Value::from(1));
    assert!(matches!(
        Message::from_hash(top(), &hash),
        Err(Error::TypeError { .. })
    ));
    let mut hash = BTreeMap::new();
    hash.insert("ints".to_string(), Value::from(1));
    assert!(matches!(
        Message::from_hash(top(), &hash),
        Err(Error::TypeError { .. })
    ));
}

//////////////////////////////////////////// equality //////////////////////////////////////////////

#[test]
fn equality_and_hash() {
    let a = populated();
    let b = populated();
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));
    let mut c = populated();
    c.mutable_message("sub")
        .unwrap()
        .mutable_message("subsub")
        .unwrap()
        .set("leaf", 10)
        .unwrap();
    assert_ne!(a, c);
    assert_ne!(hash_of(&a), hash_of(&c));
    // an explicit default differs from an unset field
    let mut d = populated();
    d.set("u32", 0).unwrap();
    assert_ne!(a, d);
}

#[test]
fn different_types_are_never_equal() {
    assert_ne!(sub().new_message(), sub_sub().new_message());
}

#[test]
fn round_trip() {
    let m = populated();
    let bytes = m.serialize().unwrap();
    let parsed = Message::parse(top(), &bytes).unwrap();
    assert_eq!(m, parsed);
    assert_eq!(bytes, parsed.serialize().unwrap());
}

///////////////////////////////////////////// catalogs /////////////////////////////////////////////

#[test]
fn catalog() {
    assert!(descriptk::register_message(top()));
    assert!(!descriptk::register_message(top()));
    assert!(std::ptr::eq(top(), descriptk::find_message("test.Top").unwrap()));
    assert!(descriptk::find_message("test.Missing").is_none());
    assert!(descriptk::registered_messages().contains(&"test.Top".to_string()));
    let anonymous: &'static descriptk::MessageDescriptor = Box::leak(Box::new(
        descriptk::MessageDescriptor::builder().build().unwrap(),
    ));
    assert!(!descriptk::register_message(anonymous));
    assert!(descriptk::register_enum(common::color_v2()));
    assert_eq!(
        Some(3),
        descriptk::find_enum("test.ColorV2").and_then(|e| e.value_for("AZURE"))
    );
}
