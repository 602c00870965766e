//! Process-wide catalogs of named descriptors.
//!
//! Readers take a snapshot and never block writers for longer than a pointer swap.  Writers copy
//! the current map, modify the copy, and publish it; concurrent writers serialize on the lock.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use super::{EnumDescriptor, MessageDescriptor, CATALOG_PUBLISH};

///////////////////////////////////////////// Published ////////////////////////////////////////////

/// Published holds an immutable snapshot that is replaced wholesale on every update.
#[derive(Debug)]
pub struct Published<T> {
    current: RwLock<Option<Arc<T>>>,
}

impl<T: Clone + Default> Published<T> {
    pub const fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// The most recently published snapshot.
    pub fn load(&self) -> Arc<T> {
        let current = match self.current.read() {
            Ok(current) => current,
            Err(poisoned) => poisoned.into_inner(),
        };
        current.clone().unwrap_or_default()
    }

    /// Apply `f` to a copy of the current snapshot and publish the result.
    pub fn publish<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut current = match self.current.write() {
            Ok(current) => current,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut next: T = current.as_deref().cloned().unwrap_or_default();
        let ret = f(&mut next);
        *current = Some(Arc::new(next));
        CATALOG_PUBLISH.click();
        ret
    }
}

impl<T: Clone + Default> Default for Published<T> {
    fn default() -> Self {
        Self::new()
    }
}

////////////////////////////////////////////// Catalog /////////////////////////////////////////////

/// A name-keyed catalog of static objects.  The first registration of a name wins.
#[derive(Debug)]
pub struct Catalog<T: 'static> {
    entries: Published<BTreeMap<String, &'static T>>,
}

impl<T: 'static> Catalog<T> {
    pub const fn new() -> Self {
        Self {
            entries: Published::new(),
        }
    }

    /// Insert `t` under `name`.  Returns false if the name was already taken.
    pub fn insert(&self, name: &str, t: &'static T) -> bool {
        if self.entries.load().contains_key(name) {
            return false;
        }
        self.entries.publish(|entries| {
            if entries.contains_key(name) {
                false
            } else {
                entries.insert(name.to_string(), t);
                true
            }
        })
    }

    pub fn get(&self, name: &str) -> Option<&'static T> {
        self.entries.load().get(name).copied()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.load().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }
}

impl<T: 'static> Default for Catalog<T> {
    fn default() -> Self {
        Self::new()
    }
}

////////////////////////////////////////////// globals /////////////////////////////////////////////

static MESSAGES: Catalog<MessageDescriptor> = Catalog::new();
static ENUMS: Catalog<EnumDescriptor> = Catalog::new();

/// Make `descriptor` discoverable by its fully qualified name.  A descriptor without a name is
/// not registered and false is returned, as it is when the name is already taken.
pub fn register_message(descriptor: &'static MessageDescriptor) -> bool {
    match descriptor.fully_qualified_name() {
        Some(name) => MESSAGES.insert(name, descriptor),
        None => false,
    }
}

pub fn find_message(name: &str) -> Option<&'static MessageDescriptor> {
    MESSAGES.get(name)
}

pub fn registered_messages() -> Vec<String> {
    MESSAGES.names()
}

/// Make `descriptor` discoverable by its fully qualified name.  See [register_message].
pub fn register_enum(descriptor: &'static EnumDescriptor) -> bool {
    match descriptor.fully_qualified_name() {
        Some(name) => ENUMS.insert(name, descriptor),
        None => false,
    }
}

pub fn find_enum(name: &str) -> Option<&'static EnumDescriptor> {
    ENUMS.get(name)
}

pub fn registered_enums() -> Vec<String> {
    ENUMS.names()
}
