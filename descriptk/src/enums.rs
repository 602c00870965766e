use std::collections::BTreeMap;

use super::Error;

////////////////////////////////////////// EnumDescriptor //////////////////////////////////////////

/// The name/value mapping of one enum type.  Several names may alias one value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumDescriptor {
    full_name: Option<String>,
    // declaration order
    values: Vec<(String, i32)>,
    value_to_names: BTreeMap<i32, Vec<String>>,
    name_to_value: BTreeMap<String, i32>,
}

impl EnumDescriptor {
    pub fn builder() -> EnumBuilder {
        EnumBuilder::default()
    }

    pub fn fully_qualified_name(&self) -> Option<&str> {
        self.full_name.as_deref()
    }

    /// The first name declared for `value`.
    pub fn name_for(&self, value: i32) -> Option<&str> {
        self.value_to_names
            .get(&value)
            .and_then(|names| names.first())
            .map(String::as_str)
    }

    /// Every name declared for `value`, in declaration order.
    pub fn names_for(&self, value: i32) -> &[String] {
        self.value_to_names
            .get(&value)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn value_for(&self, name: &str) -> Option<i32> {
        self.name_to_value.get(name).copied()
    }

    pub fn contains(&self, value: i32) -> bool {
        self.value_to_names.contains_key(&value)
    }

    pub fn value_to_names(&self) -> &BTreeMap<i32, Vec<String>> {
        &self.value_to_names
    }

    pub fn name_to_value(&self) -> &BTreeMap<String, i32> {
        &self.name_to_value
    }

    /// The (name, value) pairs in declaration order.
    pub fn values(&self) -> impl Iterator<Item = (&str, i32)> {
        self.values.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// The value an unset field of this type reads as:  the first declared value.
    pub fn default_value(&self) -> i32 {
        self.values.first().map(|(_, v)| *v).unwrap_or(0)
    }
}

//////////////////////////////////////////// EnumBuilder ///////////////////////////////////////////

#[derive(Clone, Debug, Default)]
pub struct EnumBuilder {
    full_name: Option<String>,
    values: Vec<(String, i32)>,
}

impl EnumBuilder {
    pub fn full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    pub fn value(mut self, name: impl Into<String>, value: i32) -> Self {
        self.values.push((name.into(), value));
        self
    }

    pub fn build(self) -> Result<EnumDescriptor, Error> {
        let mut value_to_names: BTreeMap<i32, Vec<String>> = BTreeMap::new();
        let mut name_to_value = BTreeMap::new();
        for (name, value) in self.values.iter() {
            if name.is_empty() {
                return Err(Error::InvalidSchema {
                    what: format!("enum {:?} has a value with no name", self.full_name),
                });
            }
            if name_to_value.insert(name.clone(), *value).is_some() {
                return Err(Error::InvalidSchema {
                    what: format!("enum {:?} declares {} twice", self.full_name, name),
                });
            }
            value_to_names.entry(*value).or_default().push(name.clone());
        }
        Ok(EnumDescriptor {
            full_name: self.full_name,
            values: self.values,
            value_to_names,
            name_to_value,
        })
    }
}

///////////////////////////////////////////// EnumType /////////////////////////////////////////////

/// A reference to an enum descriptor that is resolved only when it is needed.
#[derive(Clone, Copy)]
pub struct EnumType {
    resolve: fn() -> &'static EnumDescriptor,
}

impl EnumType {
    pub const fn new(resolve: fn() -> &'static EnumDescriptor) -> Self {
        Self { resolve }
    }

    pub fn descriptor(&self) -> &'static EnumDescriptor {
        (self.resolve)()
    }
}

impl PartialEq for EnumType {
    fn eq(&self, other: &EnumType) -> bool {
        std::ptr::eq(self.descriptor(), other.descriptor())
    }
}

impl Eq for EnumType {}

impl std::fmt::Debug for EnumType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "enum<{}>",
            self.descriptor().fully_qualified_name().unwrap_or("anonymous")
        )
    }
}
