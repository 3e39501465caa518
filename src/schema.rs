//! Serde data model of the candb schema document.
//!
//! A schema document is a versioned JSON structure:
//! `packages[] → units[] → { enum_types[], messages[] }`, with each message
//! carrying its ordered field entries. This module only mirrors the document
//! shape; turning entries into live descriptors (enum linking, bound
//! normalization, mux routing) happens in [`crate::database`].
//!
//! Numeric schema values are forgiving: native JSON numbers, decimal strings
//! and `0x`-prefixed hex strings are all accepted, and empty or absent values
//! fall back to kind-specific defaults (infinities for bounds, `0`/`1` for
//! the affine transform). [`SchemaNumber`] captures that flexibility.

use serde::Deserialize;

use crate::error::{Error, Result};

/// The schema document version this crate supports.
pub const SUPPORTED_SCHEMA_VERSION: u32 = 2;

/// Field type tag marking a reserved gap; such entries carry no value and
/// are skipped by the loader.
pub const RESERVED_TYPE_TAG: &str = "reserved";

/// A complete schema document.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaDocument {
    /// Declared document version; must equal [`SUPPORTED_SCHEMA_VERSION`]
    pub version: u32,
    /// Top-level packages
    #[serde(default)]
    pub packages: Vec<PackageEntry>,
}

/// One package grouping a set of units.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageEntry {
    /// Package name
    pub name: String,
    /// Units (message/enumeration owners) of this package
    #[serde(default)]
    pub units: Vec<UnitEntry>,
}

/// One unit: the owner of a set of enumerations and messages.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitEntry {
    /// Unit name; scopes everything it declares
    pub name: String,
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
    /// Enumerations, loaded before messages so links resolve in one pass
    #[serde(default)]
    pub enum_types: Vec<EnumEntry>,
    /// Message layouts
    #[serde(default)]
    pub messages: Vec<MessageEntry>,
}

/// One enumeration declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct EnumEntry {
    /// Enumeration name
    pub name: String,
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
    /// Elements in declaration order
    #[serde(default)]
    pub items: Vec<EnumItemEntry>,
}

/// One element of an enumeration declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct EnumItemEntry {
    /// Element name
    pub name: String,
    /// Explicit value; omitted values are assigned implicitly at load time
    #[serde(default)]
    pub value: Option<SchemaNumber>,
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
}

/// One message declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEntry {
    /// Message name
    pub name: String,
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
    /// Bus the message travels on (may be package-qualified)
    #[serde(default)]
    pub bus: Option<String>,
    /// Sending nodes (may be package-qualified)
    #[serde(default)]
    pub sent_by: Vec<String>,
    /// Numeric frame identifier
    pub id: SchemaNumber,
    /// Standard or extended identifier
    pub frame_type: FrameType,
    /// Payload length in bytes
    pub length: u32,
    /// Reception timeout in seconds
    #[serde(default)]
    pub timeout: Option<f64>,
    /// Nominal transmission period in seconds
    #[serde(default)]
    pub tx_period: Option<f64>,
    /// Field entries in declaration order
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
}

/// One field declaration inside a message.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldEntry {
    /// Field name; entries without one are padding and get skipped
    #[serde(default)]
    pub name: Option<String>,
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
    /// Type tag, e.g. `"uint8"`, `"multiplexor"` or `"enum ECUF_STWIndex"`
    #[serde(rename = "type")]
    pub field_type: String,
    /// Repetition count
    #[serde(default = "default_count")]
    pub count: u32,
    /// Bit width of one repetition
    pub bits: u32,
    /// Absolute bit offset of the first repetition
    pub start_bit: u32,
    /// Physical unit label
    #[serde(default)]
    pub unit: Option<String>,
    /// Smallest allowed value
    #[serde(default)]
    pub min: Option<SchemaNumber>,
    /// Largest allowed value
    #[serde(default)]
    pub max: Option<SchemaNumber>,
    /// Additive part of the affine transform
    #[serde(default)]
    pub offset: Option<SchemaNumber>,
    /// Multiplicative part of the affine transform
    #[serde(default)]
    pub factor_num: Option<SchemaNumber>,
}

fn default_count() -> u32 {
    1
}

/// Frame identifier width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum FrameType {
    /// Standard 11-bit identifier
    #[serde(rename = "CAN_STD")]
    Standard,
    /// Extended 29-bit identifier
    #[serde(rename = "CAN_EXT")]
    Extended,
}

impl FrameType {
    /// True for extended 29-bit identifiers.
    pub fn is_extended(self) -> bool {
        matches!(self, FrameType::Extended)
    }
}

/// A numeric schema literal: a native number, a decimal string or a
/// `0x`-prefixed hex string. Empty strings count as absent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SchemaNumber {
    /// Native integer
    Integer(i64),
    /// Native float
    Float(f64),
    /// String literal, decimal or hex
    Text(String),
}

impl SchemaNumber {
    /// True for an empty string literal, which is treated as absent.
    pub fn is_blank(&self) -> bool {
        matches!(self, SchemaNumber::Text(s) if s.is_empty())
    }

    /// Resolves to a float, using `fallback` for empty literals.
    pub fn resolve(&self, fallback: f64) -> Result<f64> {
        match self {
            SchemaNumber::Integer(v) => Ok(*v as f64),
            SchemaNumber::Float(v) => Ok(*v),
            SchemaNumber::Text(s) if s.is_empty() => Ok(fallback),
            SchemaNumber::Text(s) => {
                if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                    i64::from_str_radix(hex, 16)
                        .map(|v| v as f64)
                        .map_err(|_| Error::InvalidNumber { literal: s.clone() })
                } else {
                    s.parse::<f64>()
                        .map_err(|_| Error::InvalidNumber { literal: s.clone() })
                }
            }
        }
    }

    /// Resolves an optional literal to a float; absent or empty means
    /// `fallback`.
    pub fn resolve_opt(value: &Option<SchemaNumber>, fallback: f64) -> Result<f64> {
        match value {
            Some(n) => n.resolve(fallback),
            None => Ok(fallback),
        }
    }

    /// Resolves to an integer. Floats must be whole numbers.
    pub fn resolve_integer(&self) -> Result<i64> {
        match self {
            SchemaNumber::Integer(v) => Ok(*v),
            SchemaNumber::Float(v) if v.fract() == 0.0 => Ok(*v as i64),
            SchemaNumber::Float(v) => Err(Error::InvalidNumber {
                literal: v.to_string(),
            }),
            SchemaNumber::Text(s) => {
                if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                    i64::from_str_radix(hex, 16)
                        .map_err(|_| Error::InvalidNumber { literal: s.clone() })
                } else {
                    s.parse::<i64>()
                        .map_err(|_| Error::InvalidNumber { literal: s.clone() })
                }
            }
        }
    }
}

/// Escapes `\r`, `\n` and `\t` to literal two-character sequences so that
/// single-line displays of descriptions stay well-formed.
pub fn escape_whitespace(text: Option<&str>) -> String {
    match text {
        None => String::new(),
        Some(s) => s
            .replace('\r', "\\r")
            .replace('\n', "\\n")
            .replace('\t', "\\t"),
    }
}

/// Strips package qualification, keeping the last dot-separated component.
pub fn strip_package(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_parse_from_all_shapes() {
        assert_eq!(SchemaNumber::Integer(42).resolve(0.0).unwrap(), 42.0);
        assert_eq!(SchemaNumber::Float(1.5).resolve(0.0).unwrap(), 1.5);
        assert_eq!(
            SchemaNumber::Text("0xAA".into()).resolve(0.0).unwrap(),
            170.0
        );
        assert_eq!(
            SchemaNumber::Text("-12.5".into()).resolve(0.0).unwrap(),
            -12.5
        );
    }

    #[test]
    fn blank_text_falls_back() {
        assert_eq!(
            SchemaNumber::Text(String::new())
                .resolve(f64::INFINITY)
                .unwrap(),
            f64::INFINITY
        );
        assert_eq!(SchemaNumber::resolve_opt(&None, 1.0).unwrap(), 1.0);
    }

    #[test]
    fn malformed_literal_is_an_error() {
        assert!(matches!(
            SchemaNumber::Text("abc".into()).resolve(0.0),
            Err(Error::InvalidNumber { .. })
        ));
        assert!(matches!(
            SchemaNumber::Text("0xZZ".into()).resolve_integer(),
            Err(Error::InvalidNumber { .. })
        ));
    }

    #[test]
    fn integer_resolution_accepts_hex() {
        assert_eq!(
            SchemaNumber::Text("0x173".into()).resolve_integer().unwrap(),
            0x173
        );
        assert_eq!(SchemaNumber::Integer(371).resolve_integer().unwrap(), 371);
    }

    #[test]
    fn whitespace_is_escaped_for_single_line_display() {
        assert_eq!(escape_whitespace(Some("a\r\nb\tc")), "a\\r\\nb\\tc");
        assert_eq!(escape_whitespace(None), "");
    }

    #[test]
    fn package_qualification_is_stripped() {
        assert_eq!(strip_package("pkg.sub.ECUF"), "ECUF");
        assert_eq!(strip_package("ECUF"), "ECUF");
    }

    #[test]
    fn document_deserializes() {
        let doc: SchemaDocument = serde_json::from_str(
            r#"{
                "version": 2,
                "packages": [{
                    "name": "vehicle",
                    "units": [{
                        "name": "ECUF",
                        "enum_types": [],
                        "messages": [{
                            "name": "Status",
                            "id": "0x173",
                            "frame_type": "CAN_STD",
                            "length": 8,
                            "fields": [{
                                "name": "Speed",
                                "type": "uint16",
                                "bits": 16,
                                "start_bit": 0,
                                "factor_num": 0.25
                            }]
                        }]
                    }]
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(doc.version, 2);
        let msg = &doc.packages[0].units[0].messages[0];
        assert_eq!(msg.id.resolve_integer().unwrap(), 0x173);
        assert_eq!(msg.frame_type, FrameType::Standard);
        assert_eq!(msg.fields[0].count, 1);
    }

    #[test]
    fn unknown_frame_type_is_rejected() {
        let result: core::result::Result<FrameType, _> = serde_json::from_str(r#""CAN_FD""#);
        assert!(result.is_err());
    }
}
