//! Message descriptors: an ordered field layout plus frame metadata.
//!
//! A [`MessageDescriptor`] owns the top-level [`FieldDescriptor`]s of one
//! frame layout together with its identity (numeric id, standard/extended
//! flag, bus), byte length and timing metadata. Decoding a payload mutates
//! the fields' current values and the timestamp bookkeeping in place; the
//! `&mut self` receiver gives callers the exclusive access this requires.

use core::fmt;
use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::field::{DecodeWarning, FieldDescriptor};

/// One message layout of the bus schema.
#[derive(Debug, Clone)]
pub struct MessageDescriptor {
    /// Message name as declared in the schema
    pub name: String,
    /// Free-text description (control characters escaped at load time)
    pub description: String,
    /// Name of the unit that owns this message
    pub owner: String,
    /// Sending node names, package qualification stripped
    pub senders: Vec<String>,
    /// Numeric frame identifier (the database key)
    pub id: u32,
    /// True for extended 29-bit identifiers
    pub extended_id: bool,
    /// Payload length in bytes
    pub byte_length: u32,
    /// Reception timeout in seconds (`0` if unspecified)
    pub timeout: f64,
    /// Nominal transmission period in seconds (`0` if unspecified)
    pub period: f64,
    /// Bus name, package qualification stripped
    pub bus: String,
    fields: Vec<FieldDescriptor>,
    last_timestamp: f64,
    last_interval: f64,
}

impl MessageDescriptor {
    /// Creates a message with an empty field list.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        owner: impl Into<String>,
        senders: Vec<String>,
        id: u32,
        extended_id: bool,
        byte_length: u32,
        timeout: f64,
        period: f64,
        bus: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            owner: owner.into(),
            senders,
            id,
            extended_id,
            byte_length,
            timeout,
            period,
            bus: bus.into(),
            fields: Vec::new(),
            last_timestamp: 0.0,
            last_interval: 0.0,
        }
    }

    /// Appends a field in declaration order.
    ///
    /// If the previous top-level field is a mux, the new field becomes a
    /// muxed child of it (routed to the deepest open mux) rather than a
    /// sibling.
    pub fn add_field(&mut self, field: FieldDescriptor) -> Result<()> {
        match self.fields.last_mut() {
            Some(last) if last.is_mux() => last.add_muxed_subfield(&field),
            _ => {
                self.fields.push(field);
                Ok(())
            }
        }
    }

    /// Top-level fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Looks up a top-level field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Timestamp of the most recent decode, in seconds.
    pub fn last_timestamp(&self) -> f64 {
        self.last_timestamp
    }

    /// Interval between the two most recent decodes, in seconds.
    pub fn last_interval(&self) -> f64 {
        self.last_interval
    }

    /// Decodes a raw payload, updating every field's current values and the
    /// timestamp bookkeeping.
    ///
    /// Returns the anomalies observed while decoding; an empty vector means a
    /// clean frame. Decoding never fails: out-of-range values, unknown enum
    /// keys and out-of-range mux selectors are reported and skipped over.
    pub fn parse_from_packet(&mut self, data: &[u8], timestamp: f64) -> Vec<DecodeWarning> {
        self.last_interval = timestamp - self.last_timestamp;
        self.last_timestamp = timestamp;

        let mut warnings = Vec::new();
        for field in &mut self.fields {
            field.parse_from_packet(data, &mut warnings);
        }
        warnings
    }

    /// Assembles a payload from an ordered value list.
    ///
    /// Values are consumed in decode order: a mux selector first, then the
    /// selected branch's children; plain fields consume their repetition
    /// count each. The list must come out exactly exhausted. `buf` must be
    /// zero-initialized; bits are only ORed in.
    pub fn assemble(&self, values: &[f64], buf: &mut [u8]) -> Result<()> {
        let mut pending: VecDeque<f64> = values.iter().copied().collect();
        for field in &self.fields {
            field.assemble(&mut pending, buf)?;
        }
        if !pending.is_empty() {
            return Err(Error::LeftoverValues {
                count: pending.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for MessageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:4} {:?} {}", self.id, self.senders, self.name)?;
        if self.fields.is_empty() {
            write!(f, "\tno fields")?;
        } else {
            for field in &self.fields {
                field.fmt_indented(f, 0)?;
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldPayload;

    fn uint_field(name: &str, bits: u32, offset: u32, factor: f64) -> FieldDescriptor {
        FieldDescriptor::new(
            name,
            "",
            "",
            FieldPayload::Uint,
            1,
            bits,
            offset,
            f64::NEG_INFINITY,
            f64::INFINITY,
            0.0,
            factor,
        )
        .unwrap()
    }

    fn test_message() -> MessageDescriptor {
        MessageDescriptor::new(
            "Status",
            "",
            "ECU",
            vec!["ECU".into()],
            0x173,
            false,
            8,
            0.0,
            0.1,
            "CAN1",
        )
    }

    #[test]
    fn fields_append_in_order() {
        let mut msg = test_message();
        msg.add_field(uint_field("a", 8, 0, 1.0)).unwrap();
        msg.add_field(uint_field("b", 8, 8, 1.0)).unwrap();
        assert_eq!(msg.fields().len(), 2);
        assert!(msg.field("b").is_some());
        assert!(msg.field("missing").is_none());
    }

    #[test]
    fn field_after_mux_becomes_child() {
        let mut msg = test_message();
        let mux = FieldDescriptor::new(
            "sel", "", "", FieldPayload::Mux(Vec::new()), 1, 2, 0, 0.0, 1.0, 0.0, 1.0,
        )
        .unwrap();
        msg.add_field(mux).unwrap();
        msg.add_field(uint_field("child", 8, 8, 1.0)).unwrap();

        assert_eq!(msg.fields().len(), 1);
        let buckets = msg.fields()[0].mux_buckets().unwrap();
        assert_eq!(buckets[0][0].name, "child");
        assert_eq!(buckets[1][0].name, "child");
    }

    #[test]
    fn decode_updates_timing() {
        let mut msg = test_message();
        msg.add_field(uint_field("a", 8, 0, 1.0)).unwrap();

        msg.parse_from_packet(&[1], 10.0);
        assert_eq!(msg.last_timestamp(), 10.0);
        assert_eq!(msg.last_interval(), 10.0);

        msg.parse_from_packet(&[2], 10.5);
        assert_eq!(msg.last_timestamp(), 10.5);
        assert!((msg.last_interval() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn range_violation_does_not_stop_later_fields() {
        let mut msg = test_message();
        let mut bounded = uint_field("bounded", 8, 0, 1.0);
        bounded.vmax = 100.0;
        bounded.vmin = 0.0;
        msg.add_field(bounded).unwrap();
        msg.add_field(uint_field("after", 8, 8, 1.0)).unwrap();

        let warnings = msg.parse_from_packet(&[150, 42], 1.0);
        assert_eq!(warnings.len(), 1);
        assert_eq!(msg.field("bounded").unwrap().value(), 150.0);
        assert_eq!(msg.field("after").unwrap().value(), 42.0);
    }

    #[test]
    fn assemble_then_decode_round_trips() {
        let mut msg = test_message();
        msg.add_field(uint_field("a", 8, 0, 0.5)).unwrap();
        msg.add_field(uint_field("b", 8, 8, 1.0)).unwrap();

        let mut buf = [0u8; 8];
        msg.assemble(&[21.0, 250.0], &mut buf).unwrap();
        let warnings = msg.parse_from_packet(&buf, 0.0);
        assert!(warnings.is_empty());
        assert_eq!(msg.field("a").unwrap().value(), 21.0);
        assert_eq!(msg.field("b").unwrap().value(), 250.0);
    }

    #[test]
    fn assemble_checks_value_count() {
        let mut msg = test_message();
        msg.add_field(uint_field("a", 8, 0, 1.0)).unwrap();

        let mut buf = [0u8; 8];
        assert!(matches!(
            msg.assemble(&[1.0, 2.0], &mut buf),
            Err(Error::LeftoverValues { count: 1 })
        ));
        assert!(matches!(
            msg.assemble(&[], &mut buf),
            Err(Error::InsufficientValues { .. })
        ));
    }

    #[test]
    fn mux_round_trip_through_message() {
        let mut msg = test_message();
        let mux = FieldDescriptor::new(
            "sel", "", "", FieldPayload::Mux(Vec::new()), 1, 2, 0, 0.0, 3.0, 0.0, 1.0,
        )
        .unwrap();
        msg.add_field(mux).unwrap();
        msg.add_field(uint_field("payload", 8, 8, 1.0)).unwrap();

        let mut buf = [0u8; 2];
        msg.assemble(&[2.0, 85.0], &mut buf).unwrap();
        assert_eq!(buf, [0b10, 85]);

        let warnings = msg.parse_from_packet(&buf, 0.0);
        assert!(warnings.is_empty());
        let buckets = msg.fields()[0].mux_buckets().unwrap();
        assert_eq!(buckets[2][0].value(), 85.0);
    }
}
