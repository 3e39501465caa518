//! Field descriptors and the per-field decode/encode algorithms.
//!
//! A [`FieldDescriptor`] is one bit-addressed region of a message payload:
//! type, bit width, absolute bit offset, repetition count and the affine
//! transform (`raw * factor + offset`) mapping the packed integer to physical
//! units. Enum-typed fields carry a link to their [`Enumeration`]; mux fields
//! carry a table of child field lists keyed by selector value, and those
//! children may themselves be muxes.
//!
//! Decoding mutates the field's current values in place and reports anomalies
//! as [`DecodeWarning`]s instead of failing, so a malformed field never
//! discards the rest of the frame. Encoding is strict and fails fast.

use core::fmt;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::bits::{extract_bits, insert_bits, sign_extend, to_unsigned};
use crate::enums::Enumeration;
use crate::error::{Error, Result};

/// The closed set of field kinds, derived from a textual type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single-bit truth value
    Bool,
    /// Unsigned integer
    Uint,
    /// Two's-complement signed integer
    Int,
    /// IEEE float; decoding is unsupported and yields NaN
    Float,
    /// Integer mapped to a symbolic name via a linked [`Enumeration`]
    Enum,
    /// Multiplex selector gating a table of child field lists
    Mux,
}

impl FieldKind {
    /// Derives the kind from a schema type tag by substring match.
    ///
    /// `"uint"` is tested before `"int"`; tags like `"enum ECUF_STWIndex"`
    /// match on the `"enum"` substring. Returns `None` for unrecognized tags.
    pub fn from_tag(tag: &str) -> Option<FieldKind> {
        if tag.contains("uint") {
            Some(FieldKind::Uint)
        } else if tag.contains("int") {
            Some(FieldKind::Int)
        } else if tag.contains("bool") {
            Some(FieldKind::Bool)
        } else if tag.contains("multiplex") {
            Some(FieldKind::Mux)
        } else if tag.contains("enum") {
            Some(FieldKind::Enum)
        } else if tag.contains("float") {
            Some(FieldKind::Float)
        } else {
            None
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Bool => "BOOL",
            FieldKind::Uint => "UINT",
            FieldKind::Int => "INT",
            FieldKind::Float => "FLOAT",
            FieldKind::Enum => "ENUM",
            FieldKind::Mux => "MUX",
        };
        f.write_str(name)
    }
}

/// Kind-specific payload of a field.
///
/// Plain kinds carry nothing; enum fields carry their resolved enumeration
/// and mux fields carry the child table, one bucket per selector value.
#[derive(Debug, Clone)]
pub enum FieldPayload {
    /// Truth value
    Bool,
    /// Unsigned integer
    Uint,
    /// Signed integer
    Int,
    /// Float (decode yields NaN, encode fails)
    Float,
    /// Enum with its resolved enumeration
    Enum(Arc<Enumeration>),
    /// Mux child table; bucket `i` belongs to selector value `vmin + i`
    Mux(Vec<Vec<FieldDescriptor>>),
}

/// A non-fatal anomaly observed while decoding a field.
///
/// Decoding continues for the rest of the message; the stored value reflects
/// the best-effort raw or transformed result.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeWarning {
    /// The transformed value exceeds the field's declared maximum.
    AboveRange {
        /// Field name
        field: String,
        /// The transformed value
        value: f64,
        /// Declared maximum
        vmax: f64,
    },
    /// The transformed value falls below the field's declared minimum.
    BelowRange {
        /// Field name
        field: String,
        /// The transformed value
        value: f64,
        /// Declared minimum
        vmin: f64,
    },
    /// A received raw value matches no element of the linked enumeration.
    UnknownEnumKey {
        /// Field name
        field: String,
        /// Name of the linked enumeration
        enumeration: String,
        /// The unmatched raw key
        key: i64,
    },
    /// A mux selector value falls outside the declared bucket range.
    MuxSelectorOutOfRange {
        /// Field name
        field: String,
        /// The received selector value
        selector: i64,
    },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::AboveRange { field, value, vmax } => {
                write!(f, "{field}: value above allowed range ({value} > {vmax})")
            }
            DecodeWarning::BelowRange { field, value, vmin } => {
                write!(f, "{field}: value below allowed range ({value} < {vmin})")
            }
            DecodeWarning::UnknownEnumKey {
                field,
                enumeration,
                key,
            } => {
                write!(f, "{field}: key {key} not in enumeration '{enumeration}'")
            }
            DecodeWarning::MuxSelectorOutOfRange { field, selector } => {
                write!(f, "{field}: mux selector {selector} out of range, children skipped")
            }
        }
    }
}

/// A single bit-level field of a message.
///
/// Structure (width, offset, transform, links) is immutable after schema
/// load; only the current values mutate, on each decode.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Field name as declared in the schema
    pub name: String,
    /// Free-text description (control characters escaped at load time)
    pub description: String,
    /// Physical unit label, e.g. `"rpm"` (empty if none)
    pub unit: String,
    /// Bit width of one repetition
    pub bits: u32,
    /// Absolute bit offset of the first repetition within the payload
    pub bit_offset: u32,
    /// Repetition count (`1` for scalar fields)
    pub count: u32,
    /// Smallest allowed transformed value
    pub vmin: f64,
    /// Largest allowed transformed value
    pub vmax: f64,
    /// Additive part of the affine transform
    pub value_offset: f64,
    /// Multiplicative part of the affine transform (never zero)
    pub value_factor: f64,
    payload: FieldPayload,
    values: Vec<f64>,
}

impl FieldDescriptor {
    /// Builds a field descriptor, normalizing bounds and defaults per kind.
    ///
    /// - `bits` outside `1..=64` is rejected;
    /// - a zero `value_factor` is corrected to `1` with a warning;
    /// - enum fields take `vmin`/`vmax`/default from the linked enumeration;
    /// - bool fields use `vmin = 0`, `vmax = 1`;
    /// - the idle value is `vmin`, except unsigned fields with `vmin < 0` and
    ///   signed fields whose range straddles zero, which idle at `0`, and
    ///   enum fields, which idle at the enumeration's minimum element;
    /// - mux fields must have `count == 1` and finite bounds, and get
    ///   `(vmax - vmin + 1)` empty child buckets.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
        payload: FieldPayload,
        count: u32,
        bits: u32,
        bit_offset: u32,
        vmin: f64,
        vmax: f64,
        value_offset: f64,
        value_factor: f64,
    ) -> Result<Self> {
        let name = name.into();

        if bits == 0 || bits > 64 {
            return Err(Error::InvalidBitWidth { field: name, bits });
        }

        let value_factor = if value_factor == 0.0 {
            tracing::warn!(field = %name, "field has factor 0, resetting to 1");
            1.0
        } else {
            value_factor
        };

        let mut vmin = vmin;
        let mut vmax = vmax;
        let mut default = vmin;
        let mut payload = payload;

        match &mut payload {
            FieldPayload::Mux(buckets) => {
                if count != 1 {
                    return Err(Error::MuxArrayUnsupported { field: name, count });
                }
                if !vmin.is_finite() || !vmax.is_finite() {
                    return Err(Error::MuxRangeUnbounded { field: name });
                }
                let bucket_count = ((vmax - vmin) as i64 + 1).max(0) as usize;
                buckets.clear();
                buckets.resize(bucket_count, Vec::new());
            }
            FieldPayload::Enum(e) => {
                vmin = e.min().map(|el| el.value as f64).unwrap_or(0.0);
                vmax = e.max().map(|el| el.value as f64).unwrap_or(0.0);
                default = vmin;
            }
            FieldPayload::Bool => {
                vmin = 0.0;
                vmax = 1.0;
                default = 0.0;
            }
            FieldPayload::Uint => {
                if vmin < 0.0 {
                    default = 0.0;
                }
            }
            FieldPayload::Int => {
                // signed values idle at 0 rather than at the range minimum
                if vmin < 0.0 && vmax > 0.0 {
                    default = 0.0;
                }
            }
            FieldPayload::Float => {}
        }

        Ok(Self {
            name,
            description: description.into(),
            unit: unit.into(),
            bits,
            bit_offset,
            count,
            vmin,
            vmax,
            value_offset,
            value_factor,
            payload,
            values: vec![default; count as usize],
        })
    }

    /// The field's kind, derived from its payload.
    pub fn kind(&self) -> FieldKind {
        match self.payload {
            FieldPayload::Bool => FieldKind::Bool,
            FieldPayload::Uint => FieldKind::Uint,
            FieldPayload::Int => FieldKind::Int,
            FieldPayload::Float => FieldKind::Float,
            FieldPayload::Enum(_) => FieldKind::Enum,
            FieldPayload::Mux(_) => FieldKind::Mux,
        }
    }

    /// True for mux fields.
    pub fn is_mux(&self) -> bool {
        matches!(self.payload, FieldPayload::Mux(_))
    }

    /// True for fields with more than one repetition.
    pub fn is_array(&self) -> bool {
        self.count > 1
    }

    /// Current values, one per repetition.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Current value of the first repetition.
    pub fn value(&self) -> f64 {
        self.values.first().copied().unwrap_or(f64::NAN)
    }

    /// The linked enumeration, for enum fields.
    pub fn linked_enum(&self) -> Option<&Arc<Enumeration>> {
        match &self.payload {
            FieldPayload::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// The mux child table, for mux fields.
    pub fn mux_buckets(&self) -> Option<&[Vec<FieldDescriptor>]> {
        match &self.payload {
            FieldPayload::Mux(buckets) => Some(buckets),
            _ => None,
        }
    }

    /// Symbolic name of the current value, for enum fields.
    pub fn symbol(&self) -> Option<&str> {
        let e = self.linked_enum()?;
        e.element(self.value() as i64).map(|el| el.name.as_str())
    }

    /// Routes a child field into this mux.
    ///
    /// Every bucket receives the child: buckets whose trailing entry is
    /// itself a mux forward the child into that nested mux (matching the
    /// deepest currently-open mux), all others append their own clone.
    pub fn add_muxed_subfield(&mut self, field: &FieldDescriptor) -> Result<()> {
        let FieldPayload::Mux(buckets) = &mut self.payload else {
            return Err(Error::NotAMuxField {
                field: self.name.clone(),
            });
        };
        for bucket in buckets.iter_mut() {
            match bucket.last_mut() {
                Some(last) if last.is_mux() => last.add_muxed_subfield(field)?,
                _ => bucket.push(field.clone()),
            }
        }
        Ok(())
    }

    /// Decodes this field (and, for muxes, the selected bucket's children)
    /// from the whole-message payload buffer.
    ///
    /// Each repetition `i` reads the window at `bit_offset + i * bits`. Mux
    /// children decode against the same full buffer using their own absolute
    /// offsets. Anomalies are pushed onto `warnings`; nothing here fails.
    pub fn parse_from_packet(&mut self, data: &[u8], warnings: &mut Vec<DecodeWarning>) {
        if matches!(self.payload, FieldPayload::Float) {
            // Float decoding is unsupported; NaN keeps the gap visible.
            self.values = vec![f64::NAN; self.count as usize];
            return;
        }

        for i in 0..self.count as usize {
            let window = self.bit_offset as usize + i * self.bits as usize;
            let raw = extract_bits(data, window, self.bits);

            let mut value = match &self.payload {
                FieldPayload::Bool | FieldPayload::Uint | FieldPayload::Mux(_) => raw as f64,
                FieldPayload::Int => sign_extend(raw, self.bits) as f64,
                FieldPayload::Enum(e) => {
                    let key = raw as i64;
                    match e.element(key) {
                        Some(el) => el.value as f64,
                        None => {
                            warnings.push(DecodeWarning::UnknownEnumKey {
                                field: self.name.clone(),
                                enumeration: e.name.clone(),
                                key,
                            });
                            key as f64
                        }
                    }
                }
                FieldPayload::Float => unreachable!("floats return early"),
            };

            if matches!(self.payload, FieldPayload::Uint | FieldPayload::Int) {
                value = value * self.value_factor + self.value_offset;
            }

            self.values[i] = value;

            if value > self.vmax {
                warnings.push(DecodeWarning::AboveRange {
                    field: self.name.clone(),
                    value,
                    vmax: self.vmax,
                });
            } else if value < self.vmin {
                warnings.push(DecodeWarning::BelowRange {
                    field: self.name.clone(),
                    value,
                    vmin: self.vmin,
                });
            }
        }

        let selector = self.value();
        let vmin = self.vmin;
        let name = &self.name;
        if let FieldPayload::Mux(buckets) = &mut self.payload {
            let index = (selector - vmin) as i64;
            if index >= 0 && (index as usize) < buckets.len() {
                for child in &mut buckets[index as usize] {
                    child.parse_from_packet(data, warnings);
                }
            } else {
                warnings.push(DecodeWarning::MuxSelectorOutOfRange {
                    field: name.clone(),
                    selector: selector as i64,
                });
            }
        }
    }

    /// Assembles this field into `buf`, consuming from the front of `values`.
    ///
    /// Plain fields consume `count` values, applying the inverse affine map
    /// (truncated to integer) for numeric kinds. A mux consumes one selector
    /// value, packs it raw at its own window, then delegates the remaining
    /// values to the selected bucket's children. Float fields cannot be
    /// encoded.
    pub fn assemble(&self, values: &mut VecDeque<f64>, buf: &mut [u8]) -> Result<()> {
        match &self.payload {
            FieldPayload::Float => Err(Error::FloatEncodeUnsupported {
                field: self.name.clone(),
            }),
            FieldPayload::Mux(buckets) => {
                let selector = values.pop_front().ok_or_else(|| Error::InsufficientValues {
                    field: self.name.clone(),
                })?;
                let raw = selector as i64;
                let branch = (selector - self.vmin) as i64;
                if branch < 0 || branch as usize >= buckets.len() {
                    return Err(Error::MuxSelectorUnmapped {
                        field: self.name.clone(),
                        selector: raw,
                    });
                }

                let pattern = to_unsigned(raw, self.bits)?;
                insert_bits(buf, pattern, self.bit_offset as usize, self.bits)?;
                for child in &buckets[branch as usize] {
                    child.assemble(values, buf)?;
                }
                Ok(())
            }
            FieldPayload::Bool | FieldPayload::Uint | FieldPayload::Int | FieldPayload::Enum(_) => {
                for i in 0..self.count as usize {
                    let value = values.pop_front().ok_or_else(|| Error::InsufficientValues {
                        field: self.name.clone(),
                    })?;
                    let raw = match self.payload {
                        FieldPayload::Uint | FieldPayload::Int => {
                            ((value - self.value_offset) / self.value_factor) as i64
                        }
                        _ => value as i64,
                    };
                    let pattern = to_unsigned(raw, self.bits)?;
                    let window = self.bit_offset as usize + i * self.bits as usize;
                    insert_bits(buf, pattern, window, self.bits)?;
                }
                Ok(())
            }
        }
    }

    pub(crate) fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        let indent = "    ".repeat(level + 1);
        let end = self.bit_offset + self.bits;
        write!(
            f,
            "{indent}{:5} ({:2}:{:2} = {:2}) [{}] =",
            self.kind().to_string(),
            end,
            self.bit_offset,
            self.bits,
            self.count
        )?;
        for value in &self.values {
            match self.linked_enum() {
                Some(e) => match e.element(*value as i64) {
                    Some(el) => write!(f, " {} (={:2})", el.name, el.value)?,
                    None => write!(f, " ? (={value})")?,
                },
                None => write!(f, " {value:7}")?,
            }
        }
        write!(f, " {} | {}", self.name, self.description)?;

        if let FieldPayload::Mux(buckets) = &self.payload {
            for (i, bucket) in buckets.iter().enumerate() {
                write!(f, "\n{indent}{}[{i}]", self.name)?;
                for child in bucket {
                    writeln!(f)?;
                    child.fmt_indented(f, level + 1)?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
