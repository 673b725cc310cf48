// src/record.rs
//! Record and segment models.
//!
//! A [`Record`] aggregates the record-line fields with one slot per channel
//! for every signal field; a [`MultiSegmentRecord`] aggregates them with one
//! slot per segment instead. Field access is keyed by the field enums from
//! [`crate::spec`], so every access is statically checked.
//!
//! An unset field is `None`. For the per-channel vectors an unset slot is
//! distinct from a shortened vector: every vector must have length `n_sig`
//! (or `n_seg`) to be valid for writing, even when individual slots are
//! unset.

use chrono::{NaiveDate, NaiveTime, Timelike};

use crate::spec::{DefaultValue, RecordField, SegmentField, SignalField, ValueKind};

/// Sentinel marking a channel or segment slot with no backing data.
pub const PLACEHOLDER: &str = "~";

/// A typed field value, as held by a record or produced by the default
/// resolver.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Real(f64),
    Text(String),
    Time(NaiveTime),
    Date(NaiveDate),
}

impl FieldValue {
    /// Render the value the way it appears on a header line.
    ///
    /// Times with a fractional-seconds component have trailing zero digits
    /// stripped; dates are written `DD/MM/YYYY`.
    pub fn render(&self) -> String {
        match self {
            FieldValue::Int(v) => v.to_string(),
            FieldValue::Real(v) => v.to_string(),
            FieldValue::Text(v) => v.clone(),
            FieldValue::Time(t) => render_time(*t),
            FieldValue::Date(d) => d.format("%d/%m/%Y").to_string(),
        }
    }

    /// Materialize a compile-time default for a field of the given kind.
    pub(crate) fn from_default(kind: ValueKind, default: DefaultValue) -> FieldValue {
        match (kind, default) {
            (ValueKind::Integer, DefaultValue::Int(v)) => FieldValue::Int(v),
            (ValueKind::Real, DefaultValue::Int(v)) => FieldValue::Real(v as f64),
            (ValueKind::Real, DefaultValue::Real(v)) => FieldValue::Real(v),
            (ValueKind::Text, DefaultValue::Text(v)) => FieldValue::Text(v.to_string()),
            // The only time-kind default in the registry is midnight.
            (ValueKind::Time, DefaultValue::Text(_)) => FieldValue::Time(NaiveTime::default()),
            // Remaining combinations do not occur in the registry tables.
            (_, DefaultValue::Int(v)) => FieldValue::Int(v),
            (_, DefaultValue::Real(v)) => FieldValue::Real(v),
            (_, DefaultValue::Text(v)) => FieldValue::Text(v.to_string()),
        }
    }
}

fn render_time(t: NaiveTime) -> String {
    let base = t.format("%H:%M:%S").to_string();
    let micros = t.nanosecond() / 1_000;
    if micros == 0 {
        return base;
    }
    let mut frac = format!("{micros:06}");
    while frac.ends_with('0') {
        frac.pop();
    }
    format!("{base}.{frac}")
}

/// Record-line fields, one scalar slot per field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFields {
    pub record_name: Option<String>,
    pub n_seg: Option<usize>,
    pub n_sig: Option<usize>,
    pub fs: Option<f64>,
    pub counter_freq: Option<f64>,
    pub base_counter: Option<f64>,
    pub sig_len: Option<u64>,
    pub base_time: Option<NaiveTime>,
    pub base_date: Option<NaiveDate>,
}

impl RecordFields {
    pub fn get(&self, field: RecordField) -> Option<FieldValue> {
        match field {
            RecordField::RecordName => self.record_name.clone().map(FieldValue::Text),
            RecordField::NSeg => self.n_seg.map(|v| FieldValue::Int(v as i64)),
            RecordField::NSig => self.n_sig.map(|v| FieldValue::Int(v as i64)),
            RecordField::Fs => self.fs.map(FieldValue::Real),
            RecordField::CounterFreq => self.counter_freq.map(FieldValue::Real),
            RecordField::BaseCounter => self.base_counter.map(FieldValue::Real),
            RecordField::SigLen => self.sig_len.map(|v| FieldValue::Int(v as i64)),
            RecordField::BaseTime => self.base_time.map(FieldValue::Time),
            RecordField::BaseDate => self.base_date.map(FieldValue::Date),
        }
    }

    pub fn is_set(&self, field: RecordField) -> bool {
        match field {
            RecordField::RecordName => self.record_name.is_some(),
            RecordField::NSeg => self.n_seg.is_some(),
            RecordField::NSig => self.n_sig.is_some(),
            RecordField::Fs => self.fs.is_some(),
            RecordField::CounterFreq => self.counter_freq.is_some(),
            RecordField::BaseCounter => self.base_counter.is_some(),
            RecordField::SigLen => self.sig_len.is_some(),
            RecordField::BaseTime => self.base_time.is_some(),
            RecordField::BaseDate => self.base_date.is_some(),
        }
    }
}

/// Signal-line fields, one vector per field with one slot per channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalFields {
    pub file_name: Vec<Option<String>>,
    pub fmt: Vec<Option<String>>,
    pub samps_per_frame: Vec<Option<u32>>,
    pub skew: Vec<Option<u32>>,
    pub byte_offset: Vec<Option<u64>>,
    pub adc_gain: Vec<Option<f64>>,
    pub baseline: Vec<Option<i32>>,
    pub units: Vec<Option<String>>,
    pub adc_res: Vec<Option<u32>>,
    pub adc_zero: Vec<Option<i32>>,
    pub init_value: Vec<Option<i32>>,
    pub checksum: Vec<Option<i32>>,
    pub block_size: Vec<Option<u32>>,
    pub sig_name: Vec<Option<String>>,
}

impl SignalFields {
    /// Fresh field vectors with `n` unset channel slots each.
    pub fn with_channels(n: usize) -> Self {
        SignalFields {
            file_name: vec![None; n],
            fmt: vec![None; n],
            samps_per_frame: vec![None; n],
            skew: vec![None; n],
            byte_offset: vec![None; n],
            adc_gain: vec![None; n],
            baseline: vec![None; n],
            units: vec![None; n],
            adc_res: vec![None; n],
            adc_zero: vec![None; n],
            init_value: vec![None; n],
            checksum: vec![None; n],
            block_size: vec![None; n],
            sig_name: vec![None; n],
        }
    }

    pub fn get(&self, field: SignalField, ch: usize) -> Option<FieldValue> {
        match field {
            SignalField::FileName => slot(&self.file_name, ch).cloned().map(FieldValue::Text),
            SignalField::Fmt => slot(&self.fmt, ch).cloned().map(FieldValue::Text),
            SignalField::SampsPerFrame => {
                slot(&self.samps_per_frame, ch).map(|v| FieldValue::Int(*v as i64))
            }
            SignalField::Skew => slot(&self.skew, ch).map(|v| FieldValue::Int(*v as i64)),
            SignalField::ByteOffset => {
                slot(&self.byte_offset, ch).map(|v| FieldValue::Int(*v as i64))
            }
            SignalField::AdcGain => slot(&self.adc_gain, ch).map(|v| FieldValue::Real(*v)),
            SignalField::Baseline => slot(&self.baseline, ch).map(|v| FieldValue::Int(*v as i64)),
            SignalField::Units => slot(&self.units, ch).cloned().map(FieldValue::Text),
            SignalField::AdcRes => slot(&self.adc_res, ch).map(|v| FieldValue::Int(*v as i64)),
            SignalField::AdcZero => slot(&self.adc_zero, ch).map(|v| FieldValue::Int(*v as i64)),
            SignalField::InitValue => {
                slot(&self.init_value, ch).map(|v| FieldValue::Int(*v as i64))
            }
            SignalField::Checksum => slot(&self.checksum, ch).map(|v| FieldValue::Int(*v as i64)),
            SignalField::BlockSize => {
                slot(&self.block_size, ch).map(|v| FieldValue::Int(*v as i64))
            }
            SignalField::SigName => slot(&self.sig_name, ch).cloned().map(FieldValue::Text),
        }
    }

    pub fn has_value(&self, field: SignalField, ch: usize) -> bool {
        match field {
            SignalField::FileName => slot(&self.file_name, ch).is_some(),
            SignalField::Fmt => slot(&self.fmt, ch).is_some(),
            SignalField::SampsPerFrame => slot(&self.samps_per_frame, ch).is_some(),
            SignalField::Skew => slot(&self.skew, ch).is_some(),
            SignalField::ByteOffset => slot(&self.byte_offset, ch).is_some(),
            SignalField::AdcGain => slot(&self.adc_gain, ch).is_some(),
            SignalField::Baseline => slot(&self.baseline, ch).is_some(),
            SignalField::Units => slot(&self.units, ch).is_some(),
            SignalField::AdcRes => slot(&self.adc_res, ch).is_some(),
            SignalField::AdcZero => slot(&self.adc_zero, ch).is_some(),
            SignalField::InitValue => slot(&self.init_value, ch).is_some(),
            SignalField::Checksum => slot(&self.checksum, ch).is_some(),
            SignalField::BlockSize => slot(&self.block_size, ch).is_some(),
            SignalField::SigName => slot(&self.sig_name, ch).is_some(),
        }
    }

    /// Length of the backing vector for a field (not the count of set slots).
    pub fn field_len(&self, field: SignalField) -> usize {
        match field {
            SignalField::FileName => self.file_name.len(),
            SignalField::Fmt => self.fmt.len(),
            SignalField::SampsPerFrame => self.samps_per_frame.len(),
            SignalField::Skew => self.skew.len(),
            SignalField::ByteOffset => self.byte_offset.len(),
            SignalField::AdcGain => self.adc_gain.len(),
            SignalField::Baseline => self.baseline.len(),
            SignalField::Units => self.units.len(),
            SignalField::AdcRes => self.adc_res.len(),
            SignalField::AdcZero => self.adc_zero.len(),
            SignalField::InitValue => self.init_value.len(),
            SignalField::Checksum => self.checksum.len(),
            SignalField::BlockSize => self.block_size.len(),
            SignalField::SigName => self.sig_name.len(),
        }
    }
}

fn slot<T>(vec: &[Option<T>], ch: usize) -> Option<&T> {
    vec.get(ch).and_then(|v| v.as_ref())
}

/// Segment-line fields, one vector per field with one slot per segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentFields {
    pub seg_name: Vec<Option<String>>,
    pub seg_len: Vec<Option<u64>>,
}

impl SegmentFields {
    pub fn with_segments(n: usize) -> Self {
        SegmentFields {
            seg_name: vec![None; n],
            seg_len: vec![None; n],
        }
    }

    pub fn get(&self, field: SegmentField, seg: usize) -> Option<FieldValue> {
        match field {
            SegmentField::SegName => slot(&self.seg_name, seg).cloned().map(FieldValue::Text),
            SegmentField::SegLen => slot(&self.seg_len, seg).map(|v| FieldValue::Int(*v as i64)),
        }
    }

    pub fn field_len(&self, field: SegmentField) -> usize {
        match field {
            SegmentField::SegName => self.seg_name.len(),
            SegmentField::SegLen => self.seg_len.len(),
        }
    }

    /// Whether segment `seg` is a layout placeholder rather than a real
    /// segment.
    pub fn is_placeholder(&self, seg: usize) -> bool {
        slot(&self.seg_name, seg).map(|name| name == PLACEHOLDER) == Some(true)
    }
}

/// Header metadata for a single-segment record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub fields: RecordFields,
    pub signals: SignalFields,
    pub comments: Vec<String>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    /// Number of channels, zero when `n_sig` is unset.
    pub fn n_sig(&self) -> usize {
        self.fields.n_sig.unwrap_or(0)
    }

    /// Index of the channel with the given signal name.
    ///
    /// The name must identify exactly one channel: an absent name is
    /// `ChannelNotFound` and a repeated one is `DuplicateSignalName`.
    pub fn channel_index(&self, name: &str) -> crate::Result<usize> {
        let mut found = None;
        for (ch, sig_name) in self.signals.sig_name.iter().enumerate() {
            if sig_name.as_deref() != Some(name) {
                continue;
            }
            if found.is_some() {
                return Err(crate::HeaderError::DuplicateSignalName(name.to_string()));
            }
            found = Some(ch);
        }
        found.ok_or_else(|| crate::HeaderError::ChannelNotFound(name.to_string()))
    }
}

/// Header metadata for a multi-segment record.
///
/// Owns record-line fields (with `n_seg` set) and per-segment fields; the
/// channel-level metadata of each segment lives in that segment's own
/// header, loaded independently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiSegmentRecord {
    pub fields: RecordFields,
    pub segments: SegmentFields,
    pub comments: Vec<String>,
}

impl MultiSegmentRecord {
    pub fn new() -> Self {
        MultiSegmentRecord::default()
    }

    /// Number of segments, zero when `n_seg` is unset.
    pub fn n_seg(&self) -> usize {
        self.fields.n_seg.unwrap_or(0)
    }
}

/// A parsed header: either a single-segment or a multi-segment record.
///
/// The two variants share the write protocol (compute write fields, check
/// cohesion, render) but are otherwise independent types.
#[derive(Debug, Clone, PartialEq)]
pub enum Header {
    Single(Record),
    Multi(MultiSegmentRecord),
}

impl Header {
    pub fn record_name(&self) -> Option<&str> {
        match self {
            Header::Single(r) => r.fields.record_name.as_deref(),
            Header::Multi(r) => r.fields.record_name.as_deref(),
        }
    }

    pub fn comments(&self) -> &[String] {
        match self {
            Header::Single(r) => &r.comments,
            Header::Multi(r) => &r.comments,
        }
    }

    pub fn as_single(&self) -> Option<&Record> {
        match self {
            Header::Single(r) => Some(r),
            Header::Multi(_) => None,
        }
    }

    pub fn as_multi(&self) -> Option<&MultiSegmentRecord> {
        match self {
            Header::Multi(r) => Some(r),
            Header::Single(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_fields_slots_are_independent() {
        let mut signals = SignalFields::with_channels(3);
        signals.skew[1] = Some(4);

        assert!(!signals.has_value(SignalField::Skew, 0));
        assert!(signals.has_value(SignalField::Skew, 1));
        assert_eq!(
            signals.get(SignalField::Skew, 1),
            Some(FieldValue::Int(4))
        );
        assert_eq!(signals.field_len(SignalField::Skew), 3);
    }

    #[test]
    fn test_channel_index() {
        let mut record = Record::new();
        record.fields.n_sig = Some(2);
        record.signals = SignalFields::with_channels(2);
        record.signals.sig_name[0] = Some("MLII".to_string());
        record.signals.sig_name[1] = Some("V5".to_string());

        assert_eq!(record.channel_index("V5").unwrap(), 1);
        assert!(record.channel_index("V6").is_err());
    }

    #[test]
    fn test_channel_index_rejects_duplicate_name() {
        let mut record = Record::new();
        record.fields.n_sig = Some(2);
        record.signals = SignalFields::with_channels(2);
        record.signals.sig_name[0] = Some("ECG".to_string());
        record.signals.sig_name[1] = Some("ECG".to_string());

        match record.channel_index("ECG").unwrap_err() {
            crate::HeaderError::DuplicateSignalName(name) => assert_eq!(name, "ECG"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_segment_placeholder() {
        let mut segments = SegmentFields::with_segments(2);
        segments.seg_name[0] = Some(PLACEHOLDER.to_string());
        segments.seg_name[1] = Some("100s_0".to_string());

        assert!(segments.is_placeholder(0));
        assert!(!segments.is_placeholder(1));
    }

    #[test]
    fn test_render_time_strips_trailing_zeros() {
        let t = NaiveTime::from_hms_micro_opt(0, 1, 12, 500_000).unwrap();
        assert_eq!(FieldValue::Time(t).render(), "00:01:12.5");

        let t = NaiveTime::from_hms_opt(10, 5, 0).unwrap();
        assert_eq!(FieldValue::Time(t).render(), "10:05:00");
    }

    #[test]
    fn test_render_date_day_first() {
        let d = NaiveDate::from_ymd_opt(1989, 3, 2).unwrap();
        assert_eq!(FieldValue::Date(d).render(), "02/03/1989");
    }
}
