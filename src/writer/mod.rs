// src/writer/mod.rs
//! The write path: field selection, cohesion validation, serialization.
//!
//! Writing a header runs three stages. The selector computes the minimal
//! field set to emit: a field is written when it is required or holds a
//! value, and pulls in its whole dependency chain, since a field cannot
//! appear on a line without the fields to its left. The cohesion validator
//! then checks cross-field consistency that no single field's spec can
//! express. Finally the serializer renders the selected fields with their
//! spec delimiters, resolving write defaults for selected fields that hold
//! no value.
//!
//! Single- and multi-segment records share this protocol through
//! [`HeaderWriter`] but remain independent types.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::defaults;
use crate::error::{HeaderError, Result};
use crate::record::{
    FieldValue, Header, MultiSegmentRecord, Record, RecordFields, SignalFields, PLACEHOLDER,
};
use crate::reader::snap_fs;
use crate::spec::{HeaderField, RecordField, SegmentField, SignalField};

/// Write-field sets for a single-segment record: record fields in
/// declaration order, and for each signal field the channels it must be
/// written for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleWriteFields {
    pub record: Vec<RecordField>,
    pub signals: BTreeMap<SignalField, Vec<usize>>,
}

/// Write-field sets for a multi-segment record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiWriteFields {
    pub record: Vec<RecordField>,
    pub segments: Vec<SegmentField>,
}

/// The shared write protocol: compute write fields, validate cohesion,
/// render lines.
pub trait HeaderWriter {
    type WriteFields;

    fn write_fields(&self) -> Self::WriteFields;
    fn check_cohesion(&self, fields: &Self::WriteFields) -> Result<()>;
    fn render(&self) -> Result<Vec<String>>;
}

/// Select the fields to write for one spec family.
///
/// Iterates the spec table in reverse declaration order; a field enters the
/// set when it is write-required or `has_value` reports a value, and brings
/// its full dependency chain with it. The output is in declaration order.
fn write_subset<F: HeaderField>(skip: Option<F>, has_value: impl Fn(F) -> bool) -> Vec<F> {
    let mut selected = vec![false; F::ALL.len()];
    for &field in F::ALL.iter().rev() {
        if Some(field) == skip || selected[field.index()] {
            continue;
        }
        if field.spec().write_required || has_value(field) {
            for dep in field.dependency_chain() {
                selected[dep.index()] = true;
            }
        }
    }
    F::ALL
        .iter()
        .copied()
        .filter(|f| selected[f.index()] && Some(*f) != skip)
        .collect()
}

/// A record field's value, falling back to its resolved write default.
fn record_value(fields: &RecordFields, field: RecordField) -> Result<FieldValue> {
    if let Some(value) = fields.get(field) {
        return Ok(value);
    }
    defaults::record_default(fields, field)?.ok_or(HeaderError::MissingField(field.name()))
}

fn signal_value(
    record: &RecordFields,
    signals: &SignalFields,
    field: SignalField,
    ch: usize,
) -> Result<FieldValue> {
    if let Some(value) = signals.get(field, ch) {
        return Ok(value);
    }
    defaults::signal_default(record, signals, field, ch)?
        .ok_or(HeaderError::MissingField(field.name()))
}

fn render_fs(fs: f64) -> String {
    let fs = snap_fs(fs);
    if fs.fract() == 0.0 {
        format!("{}", fs as i64)
    } else {
        fs.to_string()
    }
}

fn render_record_line(fields: &RecordFields, selected: &[RecordField]) -> Result<String> {
    let mut line = String::new();
    for &field in selected {
        let value = record_value(fields, field)?;
        let text = match (field, &value) {
            (RecordField::Fs, FieldValue::Real(fs)) => render_fs(*fs),
            _ => value.render(),
        };
        line.push_str(field.spec().delimiter);
        line.push_str(&text);
        if field == RecordField::BaseCounter {
            line.push(')');
        }
    }
    Ok(line)
}

impl HeaderWriter for Record {
    type WriteFields = SingleWriteFields;

    fn write_fields(&self) -> SingleWriteFields {
        let record = write_subset(Some(RecordField::NSeg), |f| self.fields.is_set(f));

        let mut signals: BTreeMap<SignalField, Vec<usize>> = BTreeMap::new();
        for ch in 0..self.n_sig() {
            let per_channel = write_subset(None, |f| self.signals.has_value(f, ch));
            for field in per_channel {
                signals.entry(field).or_default().push(ch);
            }
        }

        SingleWriteFields { record, signals }
    }

    fn check_cohesion(&self, _fields: &SingleWriteFields) -> Result<()> {
        let n_sig = self
            .fields
            .n_sig
            .ok_or(HeaderError::MissingField("n_sig"))?;
        if n_sig == 0 {
            return Ok(());
        }

        // Every signal-field vector must span all channels, even when
        // individual slots are unset or the field goes unwritten.
        for &field in SignalField::ALL {
            if self.signals.field_len(field) != n_sig {
                return Err(HeaderError::LengthMismatch {
                    field: field.name(),
                    expected_from: "n_sig",
                    expected: n_sig,
                });
            }
        }

        // Each dat file must have a single fmt, and a single byte offset
        // among the channels that define one.
        let mut dat_fmts: HashMap<&str, &str> = HashMap::new();
        let mut dat_offsets: HashMap<&str, u64> = HashMap::new();
        for ch in 0..n_sig {
            let Some(file_name) = self.signals.file_name[ch].as_deref() else {
                continue;
            };
            if file_name == PLACEHOLDER {
                continue;
            }
            if let Some(fmt) = self.signals.fmt[ch].as_deref() {
                match dat_fmts.insert(file_name, fmt) {
                    Some(prev) if prev != fmt => {
                        return Err(HeaderError::AmbiguousFormat {
                            file_name: file_name.to_string(),
                        });
                    }
                    _ => {}
                }
            }
            if let Some(offset) = self.signals.byte_offset[ch] {
                match dat_offsets.insert(file_name, offset) {
                    Some(prev) if prev != offset => {
                        return Err(HeaderError::AmbiguousByteOffset {
                            file_name: file_name.to_string(),
                        });
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }

    fn render(&self) -> Result<Vec<String>> {
        let fields = self.write_fields();
        self.check_cohesion(&fields)?;

        // Resolve write defaults onto scratch copies, in declaration order,
        // so a later field's default can see an earlier resolution
        // (init_value defaulting to an adc_zero that was itself defaulted).
        let rfields = resolve_record_fields(&self.fields, &fields.record)?;
        let mut signals = self.signals.clone();
        for (&field, channels) in &fields.signals {
            for &ch in channels {
                if signals.has_value(field, ch) {
                    continue;
                }
                let value = signal_value(&rfields, &signals, field, ch)?;
                apply_signal_default(&mut signals, field, ch, value);
            }
        }

        let mut lines = vec![render_record_line(&rfields, &fields.record)?];

        for ch in 0..self.n_sig() {
            let mut line = String::new();
            for (&field, channels) in &fields.signals {
                if !channels.contains(&ch) {
                    continue;
                }
                let value = signal_value(&rfields, &signals, field, ch)?;
                line.push_str(field.spec().delimiter);
                line.push_str(&value.render());
                if field == SignalField::Baseline {
                    line.push(')');
                }
            }
            lines.push(line);
        }

        lines.extend(self.comments.iter().map(|c| format!("# {c}")));
        Ok(lines)
    }
}

/// Fill selected-but-unset record fields with their resolved defaults on a
/// scratch copy.
fn resolve_record_fields(fields: &RecordFields, selected: &[RecordField]) -> Result<RecordFields> {
    let mut resolved = fields.clone();
    for &field in selected {
        if !resolved.is_set(field) {
            let value = record_value(&resolved, field)?;
            apply_record_default(&mut resolved, field, value);
        }
    }
    Ok(resolved)
}

impl HeaderWriter for MultiSegmentRecord {
    type WriteFields = MultiWriteFields;

    fn write_fields(&self) -> MultiWriteFields {
        MultiWriteFields {
            record: write_subset(None, |f| self.fields.is_set(f)),
            // both segment fields are mandatory
            segments: SegmentField::ALL.to_vec(),
        }
    }

    fn check_cohesion(&self, fields: &MultiWriteFields) -> Result<()> {
        let n_seg = self
            .fields
            .n_seg
            .ok_or(HeaderError::MissingField("n_seg"))?;

        for &field in &fields.segments {
            if self.segments.field_len(field) != n_seg {
                return Err(HeaderError::LengthMismatch {
                    field: field.name(),
                    expected_from: "n_seg",
                    expected: n_seg,
                });
            }
        }

        // The segment lengths must account for every sample in the record.
        if let Some(sig_len) = self.fields.sig_len {
            let mut sum: u64 = 0;
            for seg in 0..n_seg {
                if self.segments.is_placeholder(seg) {
                    continue;
                }
                sum += self.segments.seg_len[seg].ok_or(HeaderError::MissingField("seg_len"))?;
            }
            if sum != sig_len {
                return Err(HeaderError::SegmentLengthSum { sum, sig_len });
            }
        }

        Ok(())
    }

    fn render(&self) -> Result<Vec<String>> {
        let fields = self.write_fields();
        self.check_cohesion(&fields)?;

        let rfields = resolve_record_fields(&self.fields, &fields.record)?;
        let mut lines = vec![render_record_line(&rfields, &fields.record)?];

        for seg in 0..self.n_seg() {
            let mut line = String::new();
            for &field in &fields.segments {
                let value = self
                    .segments
                    .get(field, seg)
                    .ok_or(HeaderError::MissingField(field.name()))?;
                line.push_str(field.spec().delimiter);
                line.push_str(&value.render());
            }
            lines.push(line);
        }

        lines.extend(self.comments.iter().map(|c| format!("# {c}")));
        Ok(lines)
    }
}

impl Record {
    /// Fill unset fields in the write set with their resolvable defaults.
    ///
    /// Fields whose default depends on another unset field are left alone;
    /// rendering reports those. Two passes are run so that a default that
    /// depends on a field filled later in declaration order (baseline on
    /// adc_zero) still resolves.
    pub fn set_defaults(&mut self) {
        let fields = self.write_fields();
        for _ in 0..2 {
            for &field in &fields.record {
                if !self.fields.is_set(field) {
                    if let Ok(Some(value)) = defaults::record_default(&self.fields, field) {
                        apply_record_default(&mut self.fields, field, value);
                    }
                }
            }
            for (&field, channels) in &fields.signals {
                for &ch in channels {
                    // tolerate short vectors here; render reports them
                    if ch >= self.signals.field_len(field) || self.signals.has_value(field, ch) {
                        continue;
                    }
                    if let Ok(Some(value)) =
                        defaults::signal_default(&self.fields, &self.signals, field, ch)
                    {
                        apply_signal_default(&mut self.signals, field, ch, value);
                    }
                }
            }
        }
    }
}

impl MultiSegmentRecord {
    /// Fill unset record fields in the write set with their resolvable
    /// defaults. Segment fields have none.
    pub fn set_defaults(&mut self) {
        let fields = self.write_fields();
        for &field in &fields.record {
            if !self.fields.is_set(field) {
                if let Ok(Some(value)) = defaults::record_default(&self.fields, field) {
                    apply_record_default(&mut self.fields, field, value);
                }
            }
        }
    }
}

fn apply_record_default(fields: &mut RecordFields, field: RecordField, value: FieldValue) {
    match (field, value) {
        (RecordField::Fs, FieldValue::Real(v)) => fields.fs = Some(v),
        (RecordField::CounterFreq, FieldValue::Real(v)) => fields.counter_freq = Some(v),
        (RecordField::BaseCounter, FieldValue::Real(v)) => fields.base_counter = Some(v),
        (RecordField::BaseTime, FieldValue::Time(v)) => fields.base_time = Some(v),
        // the remaining record fields have no defaults
        _ => {}
    }
}

fn apply_signal_default(signals: &mut SignalFields, field: SignalField, ch: usize, value: FieldValue) {
    match (field, value) {
        (SignalField::FileName, FieldValue::Text(v)) => signals.file_name[ch] = Some(v),
        (SignalField::SampsPerFrame, FieldValue::Int(v)) => {
            signals.samps_per_frame[ch] = Some(v as u32)
        }
        (SignalField::AdcGain, FieldValue::Real(v)) => signals.adc_gain[ch] = Some(v),
        (SignalField::Baseline, FieldValue::Int(v)) => signals.baseline[ch] = Some(v as i32),
        (SignalField::Units, FieldValue::Text(v)) => signals.units[ch] = Some(v),
        (SignalField::AdcRes, FieldValue::Int(v)) => signals.adc_res[ch] = Some(v as u32),
        (SignalField::AdcZero, FieldValue::Int(v)) => signals.adc_zero[ch] = Some(v as i32),
        (SignalField::InitValue, FieldValue::Int(v)) => signals.init_value[ch] = Some(v as i32),
        (SignalField::BlockSize, FieldValue::Int(v)) => signals.block_size[ch] = Some(v as u32),
        _ => {}
    }
}

/// Render a header to its physical lines.
pub fn render_header(header: &Header) -> Result<Vec<String>> {
    match header {
        Header::Single(record) => record.render(),
        Header::Multi(record) => record.render(),
    }
}

/// Render a header and persist it as `<record_name>.hea` under `dir`.
pub fn write_header_file(header: &Header, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let record_name = header
        .record_name()
        .ok_or(HeaderError::MissingField("record_name"))?;
    let lines = render_header(header)?;

    let path = dir.as_ref().join(format!("{record_name}.hea"));
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(&path, content)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_channel_record() -> Record {
        let mut record = Record::new();
        record.fields.record_name = Some("100".to_string());
        record.fields.n_sig = Some(2);
        record.fields.fs = Some(360.0);
        record.fields.sig_len = Some(650_000);
        record.signals = SignalFields::with_channels(2);
        for ch in 0..2 {
            record.signals.file_name[ch] = Some("100.dat".to_string());
            record.signals.fmt[ch] = Some("212".to_string());
            record.signals.adc_gain[ch] = Some(200.0);
            record.signals.baseline[ch] = Some(0);
            record.signals.units[ch] = Some("mV".to_string());
        }
        record
    }

    #[test]
    fn test_write_subset_includes_dependencies() {
        let mut record = two_channel_record();
        // skew on channel 1 only
        record.signals.skew[1] = Some(4);

        let fields = record.write_fields();
        assert_eq!(fields.signals[&SignalField::Skew], vec![1]);
        // both channels still carry the required fields
        assert_eq!(fields.signals[&SignalField::AdcGain], vec![0, 1]);
        // fmt pulled in as skew's dependency is required anyway; file_name too
        assert_eq!(fields.signals[&SignalField::Fmt], vec![0, 1]);
    }

    #[test]
    fn test_write_subset_pulls_dependency_chain_of_optional_field() {
        let mut record = two_channel_record();
        record.signals.adc_zero[0] = Some(12);

        let fields = record.write_fields();
        // adc_zero's dependency adc_res is selected for channel 0 even
        // though it holds no value; its default must resolve at render time
        assert_eq!(fields.signals[&SignalField::AdcZero], vec![0]);
        assert_eq!(fields.signals[&SignalField::AdcRes], vec![0]);
    }

    #[test]
    fn test_write_fields_idempotent() {
        let record = two_channel_record();
        assert_eq!(record.write_fields(), record.write_fields());
        assert_eq!(record.render().unwrap(), record.render().unwrap());
    }

    #[test]
    fn test_record_excludes_n_seg() {
        let record = two_channel_record();
        let fields = record.write_fields();
        assert!(!fields.record.contains(&RecordField::NSeg));
    }

    #[test]
    fn test_render_basic_record() {
        let mut record = two_channel_record();
        record.signals.sig_name[0] = Some("MLII".to_string());
        record.signals.sig_name[1] = Some("V5".to_string());
        // checksum has no default, so it must be set for the sig_name
        // dependency chain to resolve
        record.signals.checksum = vec![Some(0), Some(0)];
        record.comments.push("a test record".to_string());

        let lines = record.render().unwrap();
        assert_eq!(lines[0], "100 2 360 650000");
        // sig_name pulls in its whole chain, with defaults for the unset
        // middle fields (adc_res from fmt 212, adc_zero 0, ...)
        assert_eq!(lines[1], "100.dat 212 200(0)/mV 12 0 0 0 0 MLII");
        assert_eq!(lines[2], "100.dat 212 200(0)/mV 12 0 0 0 0 V5");
        assert_eq!(lines[3], "# a test record");
    }

    #[test]
    fn test_render_integral_fs() {
        let mut record = two_channel_record();
        record.fields.fs = Some(360.0);
        let lines = record.render().unwrap();
        assert!(lines[0].contains(" 360 "));

        record.fields.fs = Some(257.25);
        let lines = record.render().unwrap();
        assert!(lines[0].contains(" 257.25 "));
    }

    #[test]
    fn test_cohesion_vector_length() {
        let mut record = two_channel_record();
        record.signals.fmt.truncate(1);

        let err = record.render().unwrap_err();
        assert!(matches!(
            err,
            HeaderError::LengthMismatch { field: "fmt", expected: 2, .. }
        ));
    }

    #[test]
    fn test_cohesion_checks_unselected_vectors() {
        // a short all-None vector is never selected for writing, but the
        // per-file scan still walks every channel, so it must be rejected
        // up front rather than indexed out of bounds
        let mut record = two_channel_record();
        record.signals.byte_offset = vec![None];

        let err = record.render().unwrap_err();
        assert!(matches!(
            err,
            HeaderError::LengthMismatch { field: "byte_offset", expected: 2, .. }
        ));
    }

    #[test]
    fn test_cohesion_fmt_per_file() {
        let mut record = two_channel_record();
        record.signals.fmt[1] = Some("16".to_string());

        let err = record.render().unwrap_err();
        assert!(matches!(err, HeaderError::AmbiguousFormat { .. }));
    }

    #[test]
    fn test_cohesion_byte_offset_per_file() {
        let mut record = two_channel_record();
        record.signals.byte_offset[0] = Some(24);
        record.signals.byte_offset[1] = Some(32);

        let err = record.render().unwrap_err();
        assert!(matches!(err, HeaderError::AmbiguousByteOffset { .. }));

        // a single defined offset against an undefined one is fine
        record.signals.byte_offset[1] = None;
        record.render().unwrap();
    }

    #[test]
    fn test_segment_sum_cohesion() {
        let mut record = MultiSegmentRecord::new();
        record.fields.record_name = Some("multi".to_string());
        record.fields.n_seg = Some(2);
        record.fields.n_sig = Some(2);
        record.fields.fs = Some(360.0);
        record.fields.sig_len = Some(300);
        record.segments = crate::record::SegmentFields::with_segments(2);
        record.segments.seg_name[0] = Some("multi_0".to_string());
        record.segments.seg_name[1] = Some("multi_1".to_string());
        record.segments.seg_len[0] = Some(100);
        record.segments.seg_len[1] = Some(200);

        let lines = record.render().unwrap();
        assert_eq!(lines[0], "multi/2 2 360 300");
        assert_eq!(lines[1], "multi_0 100");
        assert_eq!(lines[2], "multi_1 200");

        record.fields.sig_len = Some(301);
        let err = record.render().unwrap_err();
        assert!(matches!(
            err,
            HeaderError::SegmentLengthSum { sum: 300, sig_len: 301 }
        ));
    }

    #[test]
    fn test_placeholder_segment_excluded_from_sum() {
        let mut record = MultiSegmentRecord::new();
        record.fields.record_name = Some("multi".to_string());
        record.fields.n_seg = Some(2);
        record.fields.n_sig = Some(1);
        record.fields.fs = Some(250.0);
        record.fields.sig_len = Some(500);
        record.segments = crate::record::SegmentFields::with_segments(2);
        record.segments.seg_name[0] = Some(PLACEHOLDER.to_string());
        record.segments.seg_len[0] = Some(0);
        record.segments.seg_name[1] = Some("multi_0".to_string());
        record.segments.seg_len[1] = Some(500);

        record.render().unwrap();
    }

    #[test]
    fn test_set_defaults_fills_chain() {
        let mut record = two_channel_record();
        record.signals.baseline = vec![None, None];
        record.signals.adc_zero[0] = Some(7);
        record.set_defaults();

        // baseline takes adc_zero where present
        assert_eq!(record.signals.baseline[0], Some(7));
        // channel 1 has no adc_zero in the write set; baseline stays unset
        assert_eq!(record.signals.baseline[1], None);
    }

    #[test]
    fn test_missing_required_field_aborts_render() {
        let mut record = two_channel_record();
        record.signals.fmt[0] = None;
        let err = record.render().unwrap_err();
        assert!(matches!(err, HeaderError::MissingField("fmt")));
    }

    #[test]
    fn test_base_counter_closes_parenthesis() {
        let mut record = two_channel_record();
        record.fields.counter_freq = Some(500.0);
        record.fields.base_counter = Some(12.0);

        let lines = record.render().unwrap();
        assert_eq!(lines[0], "100 2 360/500(12) 650000");
    }
}
