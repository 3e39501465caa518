//! Error types for candb operations.
//!
//! This module defines the [`Error`] enum which represents all possible failures
//! that can occur when loading a schema or encoding message payloads. Decode-time
//! anomalies are deliberately *not* errors; they are reported as
//! [`DecodeWarning`](crate::field::DecodeWarning) values so that one malformed
//! field never discards an entire frame.
//!
//! # Example
//!
//! ```no_run
//! use candb_rs::{CanDatabase, Error, Result};
//!
//! fn load(path: &str) -> Result<CanDatabase> {
//!     match CanDatabase::from_files(&[path]) {
//!         Ok(db) => Ok(db),
//!         Err(Error::SchemaVersion { expected, found }) => {
//!             eprintln!("schema version mismatch: need {expected}, got {found}");
//!             Err(Error::SchemaVersion { expected, found })
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use thiserror::Error;

/// Errors that can occur while loading a schema or assembling a payload.
///
/// Schema errors abort the load; no partially loaded database state should be
/// trusted afterwards. Encode errors abort the `assemble` call; the output
/// buffer contents are unspecified on failure.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema document declares a version other than the supported one.
    #[error("unsupported schema version: expected {expected}, found {found}")]
    SchemaVersion {
        /// The version this crate supports
        expected: u32,
        /// The version the document declared
        found: u32,
    },

    /// The schema document is not well-formed JSON or misses required keys.
    #[error("malformed schema document: {0}")]
    SchemaFormat(#[from] serde_json::Error),

    /// An I/O error occurred while reading a schema file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A numeric schema literal could not be parsed as decimal or `0x` hex.
    #[error("malformed numeric literal {literal:?}")]
    InvalidNumber {
        /// The literal as it appeared in the document
        literal: String,
    },

    /// A message identifier was not a usable integer.
    #[error("message '{message}' has a non-numeric identifier {literal:?}")]
    InvalidMessageId {
        /// Name of the message carrying the bad identifier
        message: String,
        /// The identifier literal from the document
        literal: String,
    },

    /// A field's type tag matched none of the known kinds.
    #[error("field '{field}' has unknown type tag {tag:?}")]
    UnknownFieldType {
        /// Name of the offending field
        field: String,
        /// The unrecognized type tag
        tag: String,
    },

    /// An enum-typed field's link tag matched no loaded enumeration.
    #[error("field '{field}': no enumeration matches link tag {tag:?}")]
    UnresolvedEnumLink {
        /// Name of the offending field
        field: String,
        /// The `"enum <owner>_<name>"` tag that failed to resolve
        tag: String,
    },

    /// Two elements of one enumeration share the same integer value.
    #[error("enumeration '{enumeration}' already contains value {value} (while adding '{name}')")]
    DuplicateEnumValue {
        /// The enumeration being extended
        enumeration: String,
        /// The colliding value
        value: i64,
        /// Name of the element that could not be added
        name: String,
    },

    /// An enumeration element was declared without a name.
    #[error("enumeration '{enumeration}': element without a name")]
    UnnamedEnumElement {
        /// The enumeration being extended
        enumeration: String,
    },

    /// A field was declared with a bit width outside `1..=64`.
    #[error("field '{field}' has unsupported bit width {bits}")]
    InvalidBitWidth {
        /// Name of the offending field
        field: String,
        /// The declared bit width
        bits: u32,
    },

    /// A mux field was declared without finite `min`/`max` bounds, so its
    /// bucket count is undefined.
    #[error("field '{field}': mux fields require finite min and max bounds")]
    MuxRangeUnbounded {
        /// Name of the offending field
        field: String,
    },

    /// A mux field was declared with a repetition count other than one.
    #[error("field '{field}': mux fields cannot be arrays (count {count})")]
    MuxArrayUnsupported {
        /// Name of the offending field
        field: String,
        /// The declared repetition count
        count: u32,
    },

    /// A child field was attached to a field that is not a mux.
    #[error("field '{field}' is not a mux, cannot attach child fields")]
    NotAMuxField {
        /// Name of the field that was wrongly treated as a mux
        field: String,
    },

    /// A negative value's magnitude exceeds what the bit width can represent.
    #[error("value {value} does not fit into {bits} bits")]
    SignedValueOutOfRange {
        /// The value that failed the magnitude check
        value: i64,
        /// The target bit width
        bits: u32,
    },

    /// A value exceeds the unsigned range of its bit width.
    #[error("bit width {bits} too small for value {value}")]
    ValueTooWide {
        /// The value that does not fit
        value: u64,
        /// The target bit width
        bits: u32,
    },

    /// The output buffer cannot hold the requested bit window.
    #[error("buffer too small: required {required} bits, available {available}")]
    BufferTooSmall {
        /// Bits needed to place the value (`offset + width`)
        required: usize,
        /// Bits the buffer provides
        available: usize,
    },

    /// During encoding, a mux selector value chose no declared bucket.
    ///
    /// On decode the same condition is only a warning, but when assembling a
    /// payload there is no branch to route the remaining values into.
    #[error("field '{field}': mux selector {selector} selects no declared bucket")]
    MuxSelectorUnmapped {
        /// Name of the mux field
        field: String,
        /// The selector value that was supplied
        selector: i64,
    },

    /// Float fields cannot be encoded.
    #[error("field '{field}': encoding float fields is not supported")]
    FloatEncodeUnsupported {
        /// Name of the float field
        field: String,
    },

    /// The pending-value list ran out before every field was assembled.
    #[error("ran out of values while assembling field '{field}'")]
    InsufficientValues {
        /// The field that found the list empty
        field: String,
    },

    /// Values remained after every field of the message was assembled.
    #[error("{count} values left over after message assembly")]
    LeftoverValues {
        /// Number of unconsumed values
        count: usize,
    },

    /// A by-name message lookup found nothing.
    #[error("message {owner}::{name} is not in the database")]
    UnknownMessage {
        /// Owning unit of the requested message
        owner: String,
        /// Name of the requested message
        name: String,
    },

    /// A by-name enumeration lookup found nothing.
    #[error("enumeration {owner}::{name} is not in the database")]
    UnknownEnum {
        /// Owning unit of the requested enumeration
        owner: String,
        /// Name of the requested enumeration
        name: String,
    },
}

/// A specialized Result type for candb operations.
pub type Result<T> = core::result::Result<T, Error>;
