#![forbid(unsafe_code)]

//! # candb-rs
//!
//! A Rust library for decoding and encoding CAN bus messages described by a
//! candb JSON schema.
//!
//! A candb schema is a versioned JSON document describing every message on a
//! bus: its frame identifier, byte length and timing, plus the bit-level
//! layout of its fields (arbitrary widths and offsets, repetition counts,
//! scale/offset transforms, linked enumerations and recursively multiplexed
//! sub-layouts). This crate loads such schemas into a [`CanDatabase`] and
//! uses them to turn raw frame payloads into typed, scaled, named values —
//! and back.
//!
//! ## Features
//!
//! - **Decoding**: exact bit-level extraction with two's-complement sign
//!   handling, affine scaling and enum symbol lookup
//! - **Encoding**: packs ordered value lists back into zeroed payload
//!   buffers, with overflow and capacity checks
//! - **Multiplexing**: mux selector fields gate nested child layouts of
//!   arbitrary depth
//! - **Forgiving decode**: range violations, unknown enum keys and
//!   out-of-range selectors are reported as [`DecodeWarning`]s, never
//!   aborting a frame
//!
//! Float-typed fields are a standing limitation: they decode to NaN and
//! refuse to encode.
//!
//! ## Quick Start
//!
//! ### Decoding frames from a log
//!
//! ```no_run
//! use candb_rs::{CanDatabase, Result};
//!
//! fn main() -> Result<()> {
//!     let mut db = CanDatabase::from_files(&["vehicle.json"])?;
//!
//!     // (id, payload, timestamp) triples come from the log reader
//!     if let Some(msg) = db.decode(0x173, &[100, 250, 0, 0, 0, 0, 0, 0], 12.5) {
//!         for field in msg.fields() {
//!             println!("{}: {:?} {}", field.name, field.values(), field.unit);
//!         }
//!         println!("interval: {} s", msg.last_interval());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Encoding a payload
//!
//! ```no_run
//! use candb_rs::{CanDatabase, Result};
//!
//! fn main() -> Result<()> {
//!     let db = CanDatabase::from_files(&["vehicle.json"])?;
//!     let msg = db.message_by_name("ECUF", "Drive")?;
//!
//!     let mut payload = vec![0u8; msg.byte_length as usize];
//!     msg.assemble(&[10.0, 2.5], &mut payload)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bits`] | Bit-level extraction/insertion primitives |
//! | [`enums`] | Owner-scoped enumerations for enum-typed fields |
//! | [`field`] | Field descriptors and per-field decode/encode |
//! | [`message`] | Message descriptors and whole-frame decode/encode |
//! | [`schema`] | Serde model of the versioned schema document |
//! | [`database`] | The [`CanDatabase`] aggregate and schema loader |
//! | [`error`] | Error types and [`Result`] alias |
//!
//! ## Error Handling
//!
//! Schema and encode failures return [`Result<T>`] and abort the operation.
//! Decode anomalies are not errors: they surface as [`DecodeWarning`] values
//! (and `tracing` warnings) while decoding continues, so one malformed field
//! never discards a frame. Decoding an unknown frame identifier yields
//! `None`, not an error.

pub mod bits;
pub mod database;
pub mod enums;
pub mod error;
pub mod field;
pub mod message;
pub mod schema;

// Re-export commonly used types at the crate root
pub use database::{CanDatabase, UnitInfo};
pub use enums::{EnumElement, Enumeration};
pub use error::{Error, Result};
pub use field::{DecodeWarning, FieldDescriptor, FieldKind, FieldPayload};
pub use message::MessageDescriptor;
pub use schema::{FrameType, SchemaDocument, SchemaNumber, SUPPORTED_SCHEMA_VERSION};
