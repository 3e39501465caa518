//! The message database: schema loading, lookups and decode dispatch.
//!
//! [`CanDatabase`] owns every [`MessageDescriptor`] (keyed by frame
//! identifier) and the registry of shared [`Enumeration`]s. It is built once
//! from one or more schema documents and is read-mostly afterwards; only
//! [`CanDatabase::decode`] mutates state, and it takes `&mut self` so the
//! exclusive access is compiler-enforced.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::enums::Enumeration;
use crate::error::{Error, Result};
use crate::field::{FieldDescriptor, FieldKind, FieldPayload};
use crate::message::MessageDescriptor;
use crate::schema::{
    self, FieldEntry, MessageEntry, SchemaDocument, SchemaNumber, UnitEntry,
    RESERVED_TYPE_TAG, SUPPORTED_SCHEMA_VERSION,
};

/// Metadata of one schema unit (a message/enumeration owner).
#[derive(Debug, Clone)]
pub struct UnitInfo {
    /// Package the unit belongs to
    pub package: String,
    /// Unit name
    pub name: String,
    /// Free-text description
    pub description: String,
}

/// The aggregate over every loaded message layout and enumeration.
#[derive(Debug, Default)]
pub struct CanDatabase {
    messages: BTreeMap<u32, MessageDescriptor>,
    enums: Vec<Arc<Enumeration>>,
    units: Vec<UnitInfo>,
}

impl CanDatabase {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a database from one or more schema files.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut db = Self::new();
        for path in paths {
            db.load_file(path)?;
        }
        Ok(db)
    }

    /// Loads one schema file into this database.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let text = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "loading schema file");
        self.load_json_str(&text)
    }

    /// Loads one schema document from JSON text.
    pub fn load_json_str(&mut self, text: &str) -> Result<()> {
        let document: SchemaDocument = serde_json::from_str(text)?;
        self.load_document(document)
    }

    /// Loads one parsed schema document.
    ///
    /// Per unit, enumerations are loaded before messages so that enum-typed
    /// fields of the same document resolve in a single pass. Rejects any
    /// document whose declared version is not exactly the supported one.
    pub fn load_document(&mut self, document: SchemaDocument) -> Result<()> {
        if document.version != SUPPORTED_SCHEMA_VERSION {
            return Err(Error::SchemaVersion {
                expected: SUPPORTED_SCHEMA_VERSION,
                found: document.version,
            });
        }

        for package in &document.packages {
            for unit in &package.units {
                self.load_unit(&package.name, unit)?;
            }
        }
        Ok(())
    }

    fn load_unit(&mut self, package: &str, unit: &UnitEntry) -> Result<()> {
        self.units.push(UnitInfo {
            package: package.to_string(),
            name: unit.name.clone(),
            description: schema::escape_whitespace(unit.description.as_deref()),
        });

        for entry in &unit.enum_types {
            let mut enumeration = Enumeration::new(
                entry.name.clone(),
                unit.name.clone(),
                schema::escape_whitespace(entry.description.as_deref()),
            );
            for item in &entry.items {
                let value = match &item.value {
                    Some(n) if !n.is_blank() => Some(n.resolve_integer()?),
                    _ => None,
                };
                enumeration.append(
                    item.name.clone(),
                    value,
                    schema::escape_whitespace(item.description.as_deref()),
                    false,
                )?;
            }
            self.enums.push(Arc::new(enumeration));
        }

        for entry in &unit.messages {
            let message = self.build_message(&unit.name, entry)?;
            self.messages.insert(message.id, message);
        }
        Ok(())
    }

    fn build_message(&self, owner: &str, entry: &MessageEntry) -> Result<MessageDescriptor> {
        let id = entry
            .id
            .resolve_integer()
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| Error::InvalidMessageId {
                message: entry.name.clone(),
                literal: format!("{:?}", entry.id),
            })?;

        // full sender and bus names include the package, ignore it
        let senders = entry
            .sent_by
            .iter()
            .map(|s| schema::strip_package(s).to_string())
            .collect();
        let bus = schema::strip_package(entry.bus.as_deref().unwrap_or("UNDEFINED")).to_string();

        let mut message = MessageDescriptor::new(
            entry.name.clone(),
            schema::escape_whitespace(entry.description.as_deref()),
            owner,
            senders,
            id,
            entry.frame_type.is_extended(),
            entry.length,
            entry.timeout.unwrap_or(0.0),
            entry.tx_period.unwrap_or(0.0),
            bus,
        );

        for field_entry in &entry.fields {
            if field_entry.field_type == RESERVED_TYPE_TAG {
                tracing::debug!(message = %entry.name, "reserved field skipped");
                continue;
            }
            let name = match field_entry.name.as_deref() {
                Some(n) if !n.is_empty() => n,
                _ => {
                    tracing::debug!(message = %entry.name, "unnamed field ignored");
                    continue;
                }
            };
            let field = self.build_field(name, field_entry)?;
            message.add_field(field)?;
        }

        Ok(message)
    }

    fn build_field(&self, name: &str, entry: &FieldEntry) -> Result<FieldDescriptor> {
        let kind =
            FieldKind::from_tag(&entry.field_type).ok_or_else(|| Error::UnknownFieldType {
                field: name.to_string(),
                tag: entry.field_type.clone(),
            })?;

        let payload = match kind {
            FieldKind::Bool => FieldPayload::Bool,
            FieldKind::Uint => FieldPayload::Uint,
            FieldKind::Int => FieldPayload::Int,
            FieldKind::Float => FieldPayload::Float,
            FieldKind::Mux => FieldPayload::Mux(Vec::new()),
            FieldKind::Enum => {
                FieldPayload::Enum(self.resolve_enum_link(name, &entry.field_type)?)
            }
        };

        FieldDescriptor::new(
            name,
            schema::escape_whitespace(entry.description.as_deref()),
            entry.unit.clone().unwrap_or_default(),
            payload,
            entry.count,
            entry.bits,
            entry.start_bit,
            SchemaNumber::resolve_opt(&entry.min, f64::NEG_INFINITY)?,
            SchemaNumber::resolve_opt(&entry.max, f64::INFINITY)?,
            SchemaNumber::resolve_opt(&entry.offset, 0.0)?,
            SchemaNumber::resolve_opt(&entry.factor_num, 1.0)?,
        )
    }

    /// Resolves an `"enum <owner>_<name>"` type tag against the registry.
    ///
    /// The composite-key string match is kept for schema compatibility and is
    /// confined to this function; a failed match is a hard load error.
    fn resolve_enum_link(&self, field: &str, tag: &str) -> Result<Arc<Enumeration>> {
        let key = tag.split_whitespace().nth(1).ok_or_else(|| {
            Error::UnresolvedEnumLink {
                field: field.to_string(),
                tag: tag.to_string(),
            }
        })?;
        self.enums
            .iter()
            .find(|e| e.qualified_name() == key)
            .cloned()
            .ok_or_else(|| Error::UnresolvedEnumLink {
                field: field.to_string(),
                tag: tag.to_string(),
            })
    }

    /// True if a message with this identifier is in the database.
    pub fn is_known(&self, id: u32) -> bool {
        self.messages.contains_key(&id)
    }

    /// Looks up a message by frame identifier.
    pub fn message_by_id(&self, id: u32) -> Option<&MessageDescriptor> {
        self.messages.get(&id)
    }

    /// Looks up a message by frame identifier, mutably.
    pub fn message_by_id_mut(&mut self, id: u32) -> Option<&mut MessageDescriptor> {
        self.messages.get_mut(&id)
    }

    /// Looks up a message by owner and name; absence is a hard error.
    pub fn message_by_name(&self, owner: &str, name: &str) -> Result<&MessageDescriptor> {
        self.messages
            .values()
            .find(|m| m.owner == owner && m.name == name)
            .ok_or_else(|| Error::UnknownMessage {
                owner: owner.to_string(),
                name: name.to_string(),
            })
    }

    /// Looks up an enumeration by owner and name; absence is a hard error.
    pub fn enum_by_name(&self, owner: &str, name: &str) -> Result<&Arc<Enumeration>> {
        self.enums
            .iter()
            .find(|e| e.owner == owner && e.name == name)
            .ok_or_else(|| Error::UnknownEnum {
                owner: owner.to_string(),
                name: name.to_string(),
            })
    }

    /// Iterates over messages in identifier order.
    pub fn messages(&self) -> impl Iterator<Item = &MessageDescriptor> {
        self.messages.values()
    }

    /// Every loaded enumeration.
    pub fn enumerations(&self) -> &[Arc<Enumeration>] {
        &self.enums
    }

    /// Metadata of every loaded unit.
    pub fn units(&self) -> &[UnitInfo] {
        &self.units
    }

    /// Decodes one raw frame against the matching message layout.
    ///
    /// Unknown identifiers return `None` (callers treat unknown frames as
    /// ignorable). Otherwise the message's timestamp bookkeeping and field
    /// values are updated in place, any decode anomalies are logged, and the
    /// updated message is returned.
    pub fn decode(&mut self, id: u32, data: &[u8], timestamp: f64) -> Option<&MessageDescriptor> {
        let message = self.messages.get_mut(&id)?;
        for warning in message.parse_from_packet(data, timestamp) {
            tracing::warn!(message = %message.name, id, "{warning}");
        }
        Some(&*message)
    }
}
