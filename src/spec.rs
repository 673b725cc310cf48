// src/spec.rs
//! The WFDB header field specification registry.
//!
//! Every field that can appear in a header file is described by a
//! [`FieldSpec`]: the kind of value it carries, the delimiter that precedes
//! it on its line, whether it must be written, and its read/write defaults.
//! Fields are identified by one of three enums ([`RecordField`],
//! [`SignalField`], [`SegmentField`]) whose declaration order matches the
//! left-to-right position on the line. Dependency links between fields are
//! expressed as exhaustive match arms so that adding a field without wiring
//! its dependency fails to compile.
//!
//! Read and write defaults are deliberately different: when reading, a
//! missing optional field should stay visibly unset rather than be filled
//! in, but when writing we fill in unimportant fields that other fields
//! depend on so the caller does not have to.

use smallvec::SmallVec;

use crate::error::{HeaderError, Result};

/// The kind of value a header field may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Integer,
    Real,
    Time,
    Date,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Text => "text",
            ValueKind::Integer => "integer",
            ValueKind::Real => "real",
            ValueKind::Time => "time",
            ValueKind::Date => "date",
        }
    }
}

/// A compile-time default value carried by a [`FieldSpec`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Int(i64),
    Real(f64),
    Text(&'static str),
}

/// Specification metadata for a single header field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// The kind of value this field carries.
    pub kind: ValueKind,
    /// The delimiter written immediately before the field on its line.
    pub delimiter: &'static str,
    /// Whether the field must be present when writing a header.
    pub write_required: bool,
    /// Value substituted when the field is absent on a parsed line.
    pub read_default: Option<DefaultValue>,
    /// Value substituted when the field is needed for writing but unset.
    pub write_default: Option<DefaultValue>,
}

/// The three families of header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecFamily {
    Record,
    Signal,
    Segment,
}

impl SpecFamily {
    pub fn name(&self) -> &'static str {
        match self {
            SpecFamily::Record => "record",
            SpecFamily::Signal => "signal",
            SpecFamily::Segment => "segment",
        }
    }
}

/// Common interface over the three field-identifier enums.
///
/// Declaration order is semantically significant: it is the on-line order
/// used by the serializer, and the write-field selector iterates it in
/// reverse.
pub trait HeaderField: Copy + Eq + Ord + std::fmt::Debug + 'static {
    const FAMILY: SpecFamily;
    const ALL: &'static [Self];

    fn name(self) -> &'static str;
    fn spec(self) -> &'static FieldSpec;
    fn dependency(self) -> Option<Self>;
    fn index(self) -> usize;

    fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == name)
            .ok_or_else(|| HeaderError::UnknownField {
                family: Self::FAMILY.name(),
                name: name.to_string(),
            })
    }

    /// The field followed by its dependency ancestors, nearest first.
    fn dependency_chain(self) -> SmallVec<[Self; 9]> {
        let mut chain = SmallVec::new();
        let mut current = Some(self);
        while let Some(field) = current {
            chain.push(field);
            current = field.dependency();
        }
        chain
    }
}

/// Record-line fields, in on-line order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordField {
    RecordName,
    NSeg,
    NSig,
    Fs,
    CounterFreq,
    BaseCounter,
    SigLen,
    BaseTime,
    BaseDate,
}

const fn field_spec(
    kind: ValueKind,
    delimiter: &'static str,
    write_required: bool,
    read_default: Option<DefaultValue>,
    write_default: Option<DefaultValue>,
) -> FieldSpec {
    FieldSpec {
        kind,
        delimiter,
        write_required,
        read_default,
        write_default,
    }
}

pub static RECORD_SPECS: [FieldSpec; 9] = [
    // record_name
    field_spec(ValueKind::Text, "", true, None, None),
    // n_seg
    field_spec(ValueKind::Integer, "/", true, None, None),
    // n_sig
    field_spec(ValueKind::Integer, " ", true, None, None),
    // fs
    field_spec(ValueKind::Real, " ", true, Some(DefaultValue::Int(250)), None),
    // counter_freq
    field_spec(ValueKind::Real, "/", false, None, None),
    // base_counter
    field_spec(ValueKind::Real, "(", false, None, None),
    // sig_len
    field_spec(ValueKind::Integer, " ", true, None, None),
    // base_time
    field_spec(
        ValueKind::Time,
        " ",
        false,
        None,
        Some(DefaultValue::Text("00:00:00")),
    ),
    // base_date
    field_spec(ValueKind::Date, " ", false, None, None),
];

impl HeaderField for RecordField {
    const FAMILY: SpecFamily = SpecFamily::Record;
    const ALL: &'static [Self] = &[
        RecordField::RecordName,
        RecordField::NSeg,
        RecordField::NSig,
        RecordField::Fs,
        RecordField::CounterFreq,
        RecordField::BaseCounter,
        RecordField::SigLen,
        RecordField::BaseTime,
        RecordField::BaseDate,
    ];

    fn name(self) -> &'static str {
        match self {
            RecordField::RecordName => "record_name",
            RecordField::NSeg => "n_seg",
            RecordField::NSig => "n_sig",
            RecordField::Fs => "fs",
            RecordField::CounterFreq => "counter_freq",
            RecordField::BaseCounter => "base_counter",
            RecordField::SigLen => "sig_len",
            RecordField::BaseTime => "base_time",
            RecordField::BaseDate => "base_date",
        }
    }

    fn spec(self) -> &'static FieldSpec {
        &RECORD_SPECS[self.index()]
    }

    fn dependency(self) -> Option<Self> {
        match self {
            RecordField::RecordName => None,
            RecordField::NSeg => Some(RecordField::RecordName),
            RecordField::NSig => Some(RecordField::RecordName),
            RecordField::Fs => Some(RecordField::NSig),
            RecordField::CounterFreq => Some(RecordField::Fs),
            RecordField::BaseCounter => Some(RecordField::CounterFreq),
            RecordField::SigLen => Some(RecordField::Fs),
            RecordField::BaseTime => Some(RecordField::SigLen),
            RecordField::BaseDate => Some(RecordField::BaseTime),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Signal-line fields, in on-line order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SignalField {
    FileName,
    Fmt,
    SampsPerFrame,
    Skew,
    ByteOffset,
    AdcGain,
    Baseline,
    Units,
    AdcRes,
    AdcZero,
    InitValue,
    Checksum,
    BlockSize,
    SigName,
}

pub static SIGNAL_SPECS: [FieldSpec; 14] = [
    // file_name
    field_spec(ValueKind::Text, "", true, None, None),
    // fmt
    field_spec(ValueKind::Text, " ", true, None, None),
    // samps_per_frame
    field_spec(ValueKind::Integer, "x", false, Some(DefaultValue::Int(1)), None),
    // skew
    field_spec(ValueKind::Integer, ":", false, None, None),
    // byte_offset
    field_spec(ValueKind::Integer, "+", false, None, None),
    // adc_gain
    field_spec(ValueKind::Real, " ", true, Some(DefaultValue::Real(200.0)), None),
    // baseline
    field_spec(ValueKind::Integer, "(", true, Some(DefaultValue::Int(0)), None),
    // units
    field_spec(ValueKind::Text, "/", true, Some(DefaultValue::Text("mV")), None),
    // adc_res
    field_spec(ValueKind::Integer, " ", false, None, Some(DefaultValue::Int(0))),
    // adc_zero
    field_spec(ValueKind::Integer, " ", false, None, Some(DefaultValue::Int(0))),
    // init_value
    field_spec(ValueKind::Integer, " ", false, None, None),
    // checksum
    field_spec(ValueKind::Integer, " ", false, None, None),
    // block_size
    field_spec(ValueKind::Integer, " ", false, None, Some(DefaultValue::Int(0))),
    // sig_name
    field_spec(ValueKind::Text, " ", false, None, None),
];

impl HeaderField for SignalField {
    const FAMILY: SpecFamily = SpecFamily::Signal;
    const ALL: &'static [Self] = &[
        SignalField::FileName,
        SignalField::Fmt,
        SignalField::SampsPerFrame,
        SignalField::Skew,
        SignalField::ByteOffset,
        SignalField::AdcGain,
        SignalField::Baseline,
        SignalField::Units,
        SignalField::AdcRes,
        SignalField::AdcZero,
        SignalField::InitValue,
        SignalField::Checksum,
        SignalField::BlockSize,
        SignalField::SigName,
    ];

    fn name(self) -> &'static str {
        match self {
            SignalField::FileName => "file_name",
            SignalField::Fmt => "fmt",
            SignalField::SampsPerFrame => "samps_per_frame",
            SignalField::Skew => "skew",
            SignalField::ByteOffset => "byte_offset",
            SignalField::AdcGain => "adc_gain",
            SignalField::Baseline => "baseline",
            SignalField::Units => "units",
            SignalField::AdcRes => "adc_res",
            SignalField::AdcZero => "adc_zero",
            SignalField::InitValue => "init_value",
            SignalField::Checksum => "checksum",
            SignalField::BlockSize => "block_size",
            SignalField::SigName => "sig_name",
        }
    }

    fn spec(self) -> &'static FieldSpec {
        &SIGNAL_SPECS[self.index()]
    }

    fn dependency(self) -> Option<Self> {
        match self {
            SignalField::FileName => None,
            SignalField::Fmt => Some(SignalField::FileName),
            SignalField::SampsPerFrame => Some(SignalField::Fmt),
            SignalField::Skew => Some(SignalField::Fmt),
            SignalField::ByteOffset => Some(SignalField::Fmt),
            SignalField::AdcGain => Some(SignalField::Fmt),
            SignalField::Baseline => Some(SignalField::AdcGain),
            SignalField::Units => Some(SignalField::AdcGain),
            SignalField::AdcRes => Some(SignalField::AdcGain),
            SignalField::AdcZero => Some(SignalField::AdcRes),
            SignalField::InitValue => Some(SignalField::AdcZero),
            SignalField::Checksum => Some(SignalField::InitValue),
            SignalField::BlockSize => Some(SignalField::Checksum),
            SignalField::SigName => Some(SignalField::BlockSize),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Segment-line fields, in on-line order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SegmentField {
    SegName,
    SegLen,
}

pub static SEGMENT_SPECS: [FieldSpec; 2] = [
    // seg_name
    field_spec(ValueKind::Text, "", true, None, None),
    // seg_len
    field_spec(ValueKind::Integer, " ", true, None, None),
];

impl HeaderField for SegmentField {
    const FAMILY: SpecFamily = SpecFamily::Segment;
    const ALL: &'static [Self] = &[SegmentField::SegName, SegmentField::SegLen];

    fn name(self) -> &'static str {
        match self {
            SegmentField::SegName => "seg_name",
            SegmentField::SegLen => "seg_len",
        }
    }

    fn spec(self) -> &'static FieldSpec {
        &SEGMENT_SPECS[self.index()]
    }

    fn dependency(self) -> Option<Self> {
        match self {
            SegmentField::SegName => None,
            SegmentField::SegLen => Some(SegmentField::SegName),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Look up the specification of a field by family and name.
pub fn lookup(family: SpecFamily, name: &str) -> Result<&'static FieldSpec> {
    match family {
        SpecFamily::Record => RecordField::from_name(name).map(|f| f.spec()),
        SpecFamily::Signal => SignalField::from_name(name).map(|f| f.spec()),
        SpecFamily::Segment => SegmentField::from_name(name).map(|f| f.spec()),
    }
}

/// The dependency chain of a field by name, nearest dependency first,
/// starting with the field itself.
pub fn dependency_chain(family: SpecFamily, name: &str) -> Result<Vec<&'static str>> {
    fn chain_of<F: HeaderField>(name: &str) -> Result<Vec<&'static str>> {
        let field = F::from_name(name)?;
        Ok(field.dependency_chain().iter().map(|f| f.name()).collect())
    }

    match family {
        SpecFamily::Record => chain_of::<RecordField>(name),
        SpecFamily::Signal => chain_of::<SignalField>(name),
        SpecFamily::Segment => chain_of::<SegmentField>(name),
    }
}
