// src/defaults.rs
//! Write-path default resolution.
//!
//! When a field is needed for writing but holds no value, its default comes
//! from a finite rule table: a handful of fields default to the value of
//! another field (and fail when that dependency is itself unset), a few have
//! fixed defaults, and the rest either stay absent or are required with no
//! default at all. The resolvers here are pure: the same inputs always
//! produce the same result, and "uses a default" is never an error — only a
//! truly missing dependency is.

use crate::error::{HeaderError, Result};
use crate::formats;
use crate::record::{FieldValue, RecordFields, SignalFields};
use crate::spec::{HeaderField, RecordField, SegmentField, SignalField};

/// Resolve the default for a record-line field.
///
/// Returns `Ok(None)` when the field legitimately stays absent (for
/// example `n_seg` on a single-segment record), and an error when the field
/// is required with no default or its default's dependency is unset.
pub fn record_default(fields: &RecordFields, field: RecordField) -> Result<Option<FieldValue>> {
    match field {
        RecordField::CounterFreq => match fields.fs {
            Some(fs) => Ok(Some(FieldValue::Real(fs))),
            None => Err(HeaderError::MissingDependency {
                field: "counter_freq",
                depends_on: "fs",
            }),
        },
        RecordField::NSeg => Ok(None),
        RecordField::Fs => Ok(Some(FieldValue::Real(250.0))),
        RecordField::BaseCounter => Ok(Some(FieldValue::Real(0.0))),
        _ => fixed_default(field),
    }
}

/// Resolve the default for a signal-line field on channel `ch`.
pub fn signal_default(
    record: &RecordFields,
    signals: &SignalFields,
    field: SignalField,
    ch: usize,
) -> Result<Option<FieldValue>> {
    match field {
        // A channel with no explicit file shares the record's dat file.
        SignalField::FileName => match &record.record_name {
            Some(name) => Ok(Some(FieldValue::Text(format!("{name}.dat")))),
            None => Err(HeaderError::MissingDependency {
                field: "file_name",
                depends_on: "record_name",
            }),
        },
        SignalField::Baseline => match signals.adc_zero.get(ch).copied().flatten() {
            Some(zero) => Ok(Some(FieldValue::Int(zero as i64))),
            None => Err(HeaderError::MissingDependency {
                field: "baseline",
                depends_on: "adc_zero",
            }),
        },
        SignalField::InitValue => match signals.adc_zero.get(ch).copied().flatten() {
            Some(zero) => Ok(Some(FieldValue::Int(zero as i64))),
            None => Err(HeaderError::MissingDependency {
                field: "init_value",
                depends_on: "adc_zero",
            }),
        },
        SignalField::AdcRes => match signals.fmt.get(ch).and_then(|f| f.as_deref()) {
            Some(fmt) => Ok(Some(FieldValue::Int(formats::fmt_resolution(fmt)? as i64))),
            None => Err(HeaderError::MissingDependency {
                field: "adc_res",
                depends_on: "fmt",
            }),
        },
        _ => fixed_default(field),
    }
}

/// Resolve the default for a segment-line field. Both are required with no
/// default, so this always fails; it exists so the three families share one
/// resolution protocol.
pub fn segment_default(field: SegmentField) -> Result<Option<FieldValue>> {
    fixed_default(field)
}

/// Fallback for fields with no special rule: use the spec's write default,
/// then its read default; required fields without one are an error,
/// optional ones stay absent.
fn fixed_default<F: HeaderField>(field: F) -> Result<Option<FieldValue>> {
    let spec = field.spec();
    if let Some(default) = spec.write_default.or(spec.read_default) {
        return Ok(Some(FieldValue::from_default(spec.kind, default)));
    }
    if spec.write_required {
        return Err(HeaderError::MissingField(field.name()));
    }
    Ok(None)
}
