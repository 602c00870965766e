use buffertk::stack_pack;

use super::field_types;
use super::message::write_value;
use super::{Error, FieldDescriptor, Message, Tag, Value, WireType};

////////////////////////////////////////// RepeatedField ///////////////////////////////////////////

/// The elements of one repeated field.  Every element is checked against the field's kind on the
/// way in, so a RepeatedField never holds a value its field could not serialize.
#[derive(Clone)]
pub struct RepeatedField {
    field: &'static FieldDescriptor,
    values: Vec<Value>,
    // set by anything that may have changed values
    dirty: bool,
}

impl RepeatedField {
    pub(crate) fn new(field: &'static FieldDescriptor) -> Self {
        Self {
            field,
            values: Vec::new(),
            dirty: false,
        }
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn field(&self) -> &'static FieldDescriptor {
        self.field
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.values.clone()
    }

    pub fn push(&mut self, value: impl Into<Value>) -> Result<(), Error> {
        let value = self.field.check(value.into())?;
        self.values.push(value);
        self.dirty = true;
        Ok(())
    }

    /// Append every value or none of them.
    pub fn extend<V: Into<Value>>(
        &mut self,
        values: impl IntoIterator<Item = V>,
    ) -> Result<(), Error> {
        let checked = self.check_all(values)?;
        self.values.extend(checked);
        self.dirty = true;
        Ok(())
    }

    /// Replace the contents with `values`.  On error the field is left unchanged.
    pub fn assign<V: Into<Value>>(
        &mut self,
        values: impl IntoIterator<Item = V>,
    ) -> Result<(), Error> {
        self.values = self.check_all(values)?;
        self.dirty = true;
        Ok(())
    }

    pub fn set(&mut self, idx: usize, value: impl Into<Value>) -> Result<(), Error> {
        let len = self.values.len();
        if idx >= len {
            return Err(Error::RangeError {
                field: self.field.name().to_string(),
                kind: "index",
                value: format!("{} (len {})", idx, len),
            });
        }
        self.values[idx] = self.field.check(value.into())?;
        self.dirty = true;
        Ok(())
    }

    pub fn message_mut(&mut self, idx: usize) -> Option<&mut Message> {
        let msg = self.values.get_mut(idx).and_then(Value::as_message_mut)?;
        self.dirty = true;
        Some(msg)
    }

    /// Append a fresh message and return it for editing.
    pub fn add_message(&mut self) -> Result<&mut Message, Error> {
        let ty = match self.field.kind().message_type() {
            Some(ty) => ty,
            None => {
                return Err(Error::TypeError {
                    field: self.field.name().to_string(),
                    expected: self.field.kind().name(),
                    got: "message",
                })
            }
        };
        let name = self.field.name();
        self.values.push(Value::from(ty.new_message()));
        self.dirty = true;
        self.values
            .last_mut()
            .and_then(Value::as_message_mut)
            .ok_or_else(|| Error::InvalidSchema {
                what: format!("{} did not take a message", name),
            })
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.dirty = true;
        self.values.pop()
    }

    pub fn clear(&mut self) {
        self.dirty = true;
        self.values.clear();
    }

    pub(crate) fn push_checked(&mut self, value: Value) {
        self.dirty = true;
        self.values.push(value);
    }

    fn check_all<V: Into<Value>>(
        &self,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Vec<Value>, Error> {
        values
            .into_iter()
            .map(|v| self.field.check(v.into()))
            .collect()
    }

    /// Packable kinds are written as one length-delimited block; everything else is one tag/value
    /// pair per element.  An empty field writes nothing.
    pub(crate) fn write(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        if self.values.is_empty() {
            return Ok(());
        }
        let kind = self.field.kind();
        if kind.is_packable() {
            let mut body = Vec::new();
            for value in self.values.iter() {
                field_types::write_payload(kind, self.field.name(), value, &mut body)?;
            }
            let tag = Tag::new(self.field.field_number(), WireType::LengthDelimited);
            stack_pack(tag).pack(body.as_slice()).append_to_vec(out);
        } else {
            for value in self.values.iter() {
                write_value(self.field, value, out)?;
            }
        }
        Ok(())
    }
}

impl PartialEq for RepeatedField {
    fn eq(&self, other: &RepeatedField) -> bool {
        self.values == other.values
    }
}

impl Eq for RepeatedField {}

impl std::hash::Hash for RepeatedField {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.values.hash(state);
    }
}

impl std::fmt::Debug for RepeatedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.values.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a RepeatedField {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
