// src/reader/grammar.rs
//! The three header line grammars.
//!
//! Each grammar consumes one physical line and produces named raw captures;
//! a capture of `None` means the field is absent on that line. Matching is
//! anchored to the whole line, so a partially valid line is rejected rather
//! than truncated. Trailing fields are nested optionals: a line may stop
//! after any complete field group, but cannot skip one in the middle.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{HeaderError, Result};

// Record line:
// RECORD_NAME/NSEG NSIG FS/COUNTER_FREQ(BASE_COUNTER) SIG_LEN BASE_TIME BASE_DATE
static RECORD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^[\ \t]* (?P<record_name>[-\w]+)
                 (?: / (?P<n_seg>\d+) )?
         [\ \t]+ (?P<n_sig>\d+)
        (?:
         [\ \t]+ (?P<fs>\d+(?:\.\d+)?)
                 (?: / (?P<counter_freq>-?\d+(?:\.\d+)?) )?
                 (?: \( (?P<base_counter>-?\d+(?:\.\d+)?) \) )?
        (?:
         [\ \t]+ (?P<sig_len>\d+)
        (?:
         [\ \t]+ (?P<base_time>\d{1,2}(?::\d{1,2}){0,2}(?:\.\d{1,6})?)
        (?:
         [\ \t]+ (?P<base_date>\d{1,2}/\d{1,2}/\d{4})
        )? )? )? )?
         [\ \t]*$",
    )
    .unwrap()
});

// Signal line:
// FILE_NAME FMTxSPF:SKEW+OFFSET GAIN(BASELINE)/UNITS RES ZERO INIT CKSUM BSIZE NAME
static SIGNAL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^[\ \t]* (?P<file_name>~|[-\w]+(?:\.\w+)?)
         [\ \t]+ (?P<fmt>\d+)
                 (?: x (?P<samps_per_frame>\d+) )?
                 (?: : (?P<skew>\d+) )?
                 (?: \+ (?P<byte_offset>\d+) )?
        (?:
         [\ \t]+ (?P<adc_gain>-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)
                 (?: \( (?P<baseline>-?\d+) \) )?
                 (?: / (?P<units>[\w\^\-\?%/]+) )?
        (?:
         [\ \t]+ (?P<adc_res>\d+)
        (?:
         [\ \t]+ (?P<adc_zero>-?\d+)
        (?:
         [\ \t]+ (?P<init_value>-?\d+)
        (?:
         [\ \t]+ (?P<checksum>-?\d+)
        (?:
         [\ \t]+ (?P<block_size>\d+)
        (?:
         [\ \t]+ (?P<sig_name>\S(?:[^\t\r\n]*\S)?)
        )? )? )? )? )? )? )?
         [\ \t]*$",
    )
    .unwrap()
});

// Segment line: SEG_NAME SEG_LEN
static SEGMENT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*(?P<seg_name>~|[-\w]+)[ \t]+(?P<seg_len>\d+)[ \t]*$").unwrap()
});

/// Raw captures from a record line.
#[derive(Debug, Clone, Copy)]
pub struct RecordCaptures<'a> {
    pub record_name: &'a str,
    pub n_seg: Option<&'a str>,
    pub n_sig: &'a str,
    pub fs: Option<&'a str>,
    pub counter_freq: Option<&'a str>,
    pub base_counter: Option<&'a str>,
    pub sig_len: Option<&'a str>,
    pub base_time: Option<&'a str>,
    pub base_date: Option<&'a str>,
}

/// Raw captures from a signal line.
#[derive(Debug, Clone, Copy)]
pub struct SignalCaptures<'a> {
    pub file_name: &'a str,
    pub fmt: &'a str,
    pub samps_per_frame: Option<&'a str>,
    pub skew: Option<&'a str>,
    pub byte_offset: Option<&'a str>,
    pub adc_gain: Option<&'a str>,
    pub baseline: Option<&'a str>,
    pub units: Option<&'a str>,
    pub adc_res: Option<&'a str>,
    pub adc_zero: Option<&'a str>,
    pub init_value: Option<&'a str>,
    pub checksum: Option<&'a str>,
    pub block_size: Option<&'a str>,
    pub sig_name: Option<&'a str>,
}

/// Raw captures from a segment line.
#[derive(Debug, Clone, Copy)]
pub struct SegmentCaptures<'a> {
    pub seg_name: &'a str,
    pub seg_len: &'a str,
}

pub fn match_record_line(line: &str) -> Result<RecordCaptures<'_>> {
    let caps = RECORD_LINE
        .captures(line)
        .ok_or_else(|| HeaderError::RecordLineSyntax(line.to_string()))?;
    // mandatory groups: the anchored match guarantees them
    let get = |name| caps.name(name).map(|m| m.as_str());
    Ok(RecordCaptures {
        record_name: caps.name("record_name").unwrap().as_str(),
        n_seg: get("n_seg"),
        n_sig: caps.name("n_sig").unwrap().as_str(),
        fs: get("fs"),
        counter_freq: get("counter_freq"),
        base_counter: get("base_counter"),
        sig_len: get("sig_len"),
        base_time: get("base_time"),
        base_date: get("base_date"),
    })
}

pub fn match_signal_line(line: &str) -> Result<SignalCaptures<'_>> {
    let caps = SIGNAL_LINE
        .captures(line)
        .ok_or_else(|| HeaderError::SignalLineSyntax(line.to_string()))?;
    let get = |name| caps.name(name).map(|m| m.as_str());
    Ok(SignalCaptures {
        file_name: caps.name("file_name").unwrap().as_str(),
        fmt: caps.name("fmt").unwrap().as_str(),
        samps_per_frame: get("samps_per_frame"),
        skew: get("skew"),
        byte_offset: get("byte_offset"),
        adc_gain: get("adc_gain"),
        baseline: get("baseline"),
        units: get("units"),
        adc_res: get("adc_res"),
        adc_zero: get("adc_zero"),
        init_value: get("init_value"),
        checksum: get("checksum"),
        block_size: get("block_size"),
        sig_name: get("sig_name"),
    })
}

pub fn match_segment_line(line: &str) -> Result<SegmentCaptures<'_>> {
    let caps = SEGMENT_LINE
        .captures(line)
        .ok_or_else(|| HeaderError::SegmentLineSyntax(line.to_string()))?;
    Ok(SegmentCaptures {
        seg_name: caps.name("seg_name").unwrap().as_str(),
        seg_len: caps.name("seg_len").unwrap().as_str(),
    })
}
