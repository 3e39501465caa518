//! Named enumerations linked to enum-typed fields.
//!
//! An [`Enumeration`] is an owner-scoped set of integer-to-symbol mappings.
//! Enumerations are built once by the schema loader and shared immutably
//! (via `Arc`) with every field that links to them, so they may be read
//! concurrently without locking.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// One element of an enumeration: an integer value with a symbolic name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumElement {
    /// The integer value carried on the wire
    pub value: i64,
    /// Symbolic name shown to consumers
    pub name: String,
    /// Free-text description from the schema
    pub description: String,
}

/// An owner-scoped set of [`EnumElement`]s keyed by value.
///
/// Within one enumeration every value is unique. Elements declared without an
/// explicit value receive one at load time: `0` for the first element,
/// `previous_max + 1` afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumeration {
    /// Enumeration name as declared in the schema
    pub name: String,
    /// Name of the unit that owns this enumeration
    pub owner: String,
    /// Free-text description from the schema
    pub description: String,
    elements: BTreeMap<i64, EnumElement>,
}

impl Enumeration {
    /// Creates an empty enumeration scoped by `(owner, name)`.
    pub fn new(
        name: impl Into<String>,
        owner: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            description: description.into(),
            elements: BTreeMap::new(),
        }
    }

    /// Adds an element, assigning an implicit value if none is given.
    ///
    /// Fails if the element has no name or if its value collides with an
    /// existing entry. An implicit value is `0` for the first element and
    /// `max + 1` afterwards; unless `implicit_is_fine` is set, assigning one
    /// emits a warning (schemas are expected to pin values explicitly).
    pub fn append(
        &mut self,
        name: impl Into<String>,
        value: Option<i64>,
        description: impl Into<String>,
        implicit_is_fine: bool,
    ) -> Result<&EnumElement> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::UnnamedEnumElement {
                enumeration: self.name.clone(),
            });
        }

        if let Some(value) = value {
            if self.elements.contains_key(&value) {
                return Err(Error::DuplicateEnumValue {
                    enumeration: self.name.clone(),
                    value,
                    name,
                });
            }
        }

        let value = match value {
            Some(v) => v,
            None => {
                if !implicit_is_fine {
                    tracing::warn!(
                        enumeration = %self.name,
                        element = %name,
                        "implicit value in enumeration"
                    );
                }
                match self.elements.keys().next_back() {
                    Some(max) => max + 1,
                    None => 0,
                }
            }
        };

        let element = EnumElement {
            value,
            name,
            description: description.into(),
        };
        Ok(self.elements.entry(value).or_insert(element))
    }

    /// Looks up the element carrying `value`.
    pub fn element(&self, value: i64) -> Option<&EnumElement> {
        self.elements.get(&value)
    }

    /// The element with the smallest value, if any.
    pub fn min(&self) -> Option<&EnumElement> {
        self.elements.values().next()
    }

    /// The element with the largest value, if any.
    pub fn max(&self) -> Option<&EnumElement> {
        self.elements.values().next_back()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True if the enumeration has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterates over elements in value order.
    pub fn elements(&self) -> impl Iterator<Item = &EnumElement> {
        self.elements.values()
    }

    /// The `<owner>_<name>` key that enum-typed field tags are matched against.
    pub fn qualified_name(&self) -> String {
        format!("{}_{}", self.owner, self.name)
    }
}
