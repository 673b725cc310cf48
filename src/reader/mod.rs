// src/reader/mod.rs
//! Header parsing: text in, [`Header`] out.
//!
//! The read path tokenizes each line with the grammars in [`grammar`], then
//! coerces the raw captures into typed values. Absent captures take the
//! field's read default where one exists and stay unset otherwise; reading
//! never fails because an optional field is missing, only because a line
//! does not match its grammar or a value does not parse.

pub mod grammar;

use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};

use crate::error::{HeaderError, Result};
use crate::record::{Header, MultiSegmentRecord, Record, RecordFields, SegmentFields, SignalFields};

use grammar::{RecordCaptures, SegmentCaptures, SignalCaptures};

/// Parse the full content of a header file.
///
/// The first data line is the record line; when it carries `n_seg` the
/// remaining data lines are segment lines, otherwise they are signal lines
/// (one per channel). Lines beginning with `#` are comments, and an inline
/// `#` splits a data line into a header portion and a trailing comment.
///
/// The parse is atomic: any malformed line fails the whole call.
pub fn parse_header(text: &str) -> Result<Header> {
    let (data_lines, comments) = split_content(text);

    let record_line = data_lines
        .first()
        .ok_or_else(|| HeaderError::RecordLineSyntax(String::new()))?;
    let fields = coerce_record(&grammar::match_record_line(record_line)?)?;
    let rest = &data_lines[1..];

    if let Some(n_seg) = fields.n_seg {
        if rest.len() != n_seg {
            return Err(HeaderError::LineCount {
                line_kind: "segment",
                expected: n_seg,
                found: rest.len(),
            });
        }
        let segments = coerce_segments(rest)?;
        Ok(Header::Multi(MultiSegmentRecord {
            fields,
            segments,
            comments,
        }))
    } else {
        let n_sig = fields.n_sig.unwrap_or(0);
        if rest.len() != n_sig {
            return Err(HeaderError::LineCount {
                line_kind: "signal",
                expected: n_sig,
                found: rest.len(),
            });
        }
        let signals = coerce_signals(rest)?;
        Ok(Header::Single(Record {
            fields,
            signals,
            comments,
        }))
    }
}

/// Split header content into data lines and comment lines.
fn split_content(text: &str) -> (Vec<&str>, Vec<String>) {
    let mut data_lines = Vec::new();
    let mut comments = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(pos) = line.find('#') {
            // only the marker itself is stripped; a comment may contain '#'
            let comment = line[pos + 1..].trim();
            comments.push(comment.to_string());
            let data = line[..pos].trim_end();
            if !data.is_empty() {
                data_lines.push(data);
            }
        } else {
            data_lines.push(line);
        }
    }

    (data_lines, comments)
}

fn parse_num<T: FromStr>(field: &'static str, kind: &'static str, raw: &str) -> Result<T> {
    raw.parse().map_err(|_| HeaderError::InvalidValue {
        field,
        kind,
        value: raw.to_string(),
    })
}

fn parse_int<T: FromStr>(field: &'static str, raw: &str) -> Result<T> {
    parse_num(field, "integer", raw)
}

fn parse_real(field: &'static str, raw: &str) -> Result<f64> {
    parse_num(field, "real", raw)
}

/// Parse a header time: `SS`, `MM:SS`, or `HH:MM:SS`, each optionally with a
/// fractional-seconds suffix of up to six digits.
pub(crate) fn parse_time(field: &'static str, raw: &str) -> Result<NaiveTime> {
    let invalid = || HeaderError::InvalidValue {
        field,
        kind: "time",
        value: raw.to_string(),
    };

    let (clock, frac) = match raw.split_once('.') {
        Some((clock, frac)) => (clock, Some(frac)),
        None => (raw, None),
    };

    let mut parts = clock.split(':');
    let (h, m, s) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(s), None, None, None) => ("0", "0", s),
        (Some(m), Some(s), None, None) => ("0", m, s),
        (Some(h), Some(m), Some(s), None) => (h, m, s),
        _ => return Err(invalid()),
    };
    let h: u32 = h.parse().map_err(|_| invalid())?;
    let m: u32 = m.parse().map_err(|_| invalid())?;
    let s: u32 = s.parse().map_err(|_| invalid())?;

    let micros = match frac {
        Some(frac) if !frac.is_empty() && frac.len() <= 6 => {
            let digits: u32 = frac.parse().map_err(|_| invalid())?;
            digits * 10u32.pow(6 - frac.len() as u32)
        }
        Some(_) => return Err(invalid()),
        None => 0,
    };

    NaiveTime::from_hms_micro_opt(h, m, s, micros).ok_or_else(invalid)
}

pub(crate) fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%d/%m/%Y").map_err(|_| HeaderError::InvalidValue {
        field,
        kind: "date",
        value: raw.to_string(),
    })
}

/// Snap a sampling frequency to its integral value when it is within 1e-8.
pub(crate) fn snap_fs(fs: f64) -> f64 {
    if (fs - fs.round()).abs() < 1e-8 {
        fs.round()
    } else {
        fs
    }
}

fn coerce_record(caps: &RecordCaptures<'_>) -> Result<RecordFields> {
    let mut fields = RecordFields {
        record_name: Some(caps.record_name.to_string()),
        ..RecordFields::default()
    };

    if let Some(raw) = caps.n_seg {
        fields.n_seg = Some(parse_int("n_seg", raw)?);
    }
    fields.n_sig = Some(parse_int("n_sig", caps.n_sig)?);

    fields.fs = match caps.fs {
        Some(raw) => Some(snap_fs(parse_real("fs", raw)?)),
        // fs is the one record field with a read default
        None => Some(250.0),
    };
    if let Some(raw) = caps.counter_freq {
        fields.counter_freq = Some(parse_real("counter_freq", raw)?);
    }
    if let Some(raw) = caps.base_counter {
        fields.base_counter = Some(parse_real("base_counter", raw)?);
    }
    if let Some(raw) = caps.sig_len {
        fields.sig_len = Some(parse_int("sig_len", raw)?);
    }
    if let Some(raw) = caps.base_time {
        fields.base_time = Some(parse_time("base_time", raw)?);
    }
    if let Some(raw) = caps.base_date {
        fields.base_date = Some(parse_date("base_date", raw)?);
    }

    Ok(fields)
}

fn coerce_signals(lines: &[&str]) -> Result<SignalFields> {
    let n_sig = lines.len();
    let mut signals = SignalFields::with_channels(n_sig);

    for (ch, line) in lines.iter().enumerate() {
        let caps: SignalCaptures<'_> = grammar::match_signal_line(line)?;

        signals.file_name[ch] = Some(caps.file_name.to_string());
        signals.fmt[ch] = Some(caps.fmt.to_string());

        signals.samps_per_frame[ch] = match caps.samps_per_frame {
            Some(raw) => Some(parse_int("samps_per_frame", raw)?),
            None => Some(1),
        };
        if let Some(raw) = caps.skew {
            signals.skew[ch] = Some(parse_int("skew", raw)?);
        }
        if let Some(raw) = caps.byte_offset {
            signals.byte_offset[ch] = Some(parse_int("byte_offset", raw)?);
        }

        signals.adc_gain[ch] = match caps.adc_gain {
            Some(raw) => {
                let gain = parse_real("adc_gain", raw)?;
                // zero gain is a historical encoding for the default
                Some(if gain == 0.0 { 200.0 } else { gain })
            }
            None => Some(200.0),
        };

        let adc_zero = caps
            .adc_zero
            .map(|raw| parse_int::<i32>("adc_zero", raw))
            .transpose()?;

        signals.baseline[ch] = match caps.baseline {
            Some(raw) => Some(parse_int("baseline", raw)?),
            // a missing baseline takes adc_zero when the line carries one
            None => Some(adc_zero.unwrap_or(0)),
        };
        signals.units[ch] = Some(
            caps.units
                .map(str::to_string)
                .unwrap_or_else(|| "mV".to_string()),
        );

        if let Some(raw) = caps.adc_res {
            signals.adc_res[ch] = Some(parse_int("adc_res", raw)?);
        }
        signals.adc_zero[ch] = adc_zero;
        if let Some(raw) = caps.init_value {
            signals.init_value[ch] = Some(parse_int("init_value", raw)?);
        }
        if let Some(raw) = caps.checksum {
            signals.checksum[ch] = Some(parse_int("checksum", raw)?);
        }
        if let Some(raw) = caps.block_size {
            signals.block_size[ch] = Some(parse_int("block_size", raw)?);
        }
        if let Some(raw) = caps.sig_name {
            signals.sig_name[ch] = Some(raw.to_string());
        }
    }

    Ok(signals)
}

fn coerce_segments(lines: &[&str]) -> Result<SegmentFields> {
    let mut segments = SegmentFields::with_segments(lines.len());

    for (i, line) in lines.iter().enumerate() {
        let caps: SegmentCaptures<'_> = grammar::match_segment_line(line)?;
        segments.seg_name[i] = Some(caps.seg_name.to_string());
        segments.seg_len[i] = Some(parse_int("seg_len", caps.seg_len)?);
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_precisions() {
        assert_eq!(
            parse_time("base_time", "12").unwrap(),
            NaiveTime::from_hms_opt(0, 0, 12).unwrap()
        );
        assert_eq!(
            parse_time("base_time", "01:12").unwrap(),
            NaiveTime::from_hms_opt(0, 1, 12).unwrap()
        );
        assert_eq!(
            parse_time("base_time", "00:01:12.5").unwrap(),
            NaiveTime::from_hms_micro_opt(0, 1, 12, 500_000).unwrap()
        );
    }

    #[test]
    fn test_parse_time_rejects_bad_values() {
        assert!(parse_time("base_time", "1:2:3:4").is_err());
        assert!(parse_time("base_time", "25:00:00").is_err());
        assert!(parse_time("base_time", "12.").is_err());
    }

    #[test]
    fn test_parse_date_with_and_without_padding() {
        let d = NaiveDate::from_ymd_opt(1989, 3, 2).unwrap();
        assert_eq!(parse_date("base_date", "02/03/1989").unwrap(), d);
        assert_eq!(parse_date("base_date", "2/3/1989").unwrap(), d);
        assert!(parse_date("base_date", "31/02/1989").is_err());
    }

    #[test]
    fn test_parse_single_segment_header() {
        let text = "\
100 2 360 650000 00:00:00 02/03/1989
100.dat 212 200(-5)/mV 12 -5 995 21756 0 MLII
100.dat 212 200/mV 12 0 1011 20052 0 V5
";
        let header = parse_header(text).unwrap();
        let record = header.as_single().unwrap();

        assert_eq!(record.fields.record_name.as_deref(), Some("100"));
        assert_eq!(record.fields.n_sig, Some(2));
        assert_eq!(record.fields.fs, Some(360.0));
        assert_eq!(record.fields.sig_len, Some(650_000));
        assert_eq!(record.signals.fmt[0].as_deref(), Some("212"));
        assert_eq!(record.signals.baseline[0], Some(-5));
        // baseline absent on channel 1: falls back to the line's adc_zero
        assert_eq!(record.signals.baseline[1], Some(0));
        assert_eq!(record.signals.sig_name[1].as_deref(), Some("V5"));
    }

    #[test]
    fn test_parse_multi_segment_header() {
        let text = "\
100s/3 2 360 45000
~ 0
100s_0 21600
100s_1 23400
";
        let header = parse_header(text).unwrap();
        let record = header.as_multi().unwrap();

        assert_eq!(record.fields.n_seg, Some(3));
        assert!(record.segments.is_placeholder(0));
        assert_eq!(record.segments.seg_len[2], Some(23_400));
    }

    #[test]
    fn test_signal_line_count_mismatch() {
        let text = "100 2 360 650000\n100.dat 212 200/mV\n";
        let err = parse_header(text).unwrap_err();
        assert!(matches!(
            err,
            HeaderError::LineCount { line_kind: "signal", expected: 2, found: 1 }
        ));
    }

    #[test]
    fn test_gain_zero_folds_to_default() {
        let text = "100 1 360 650000\n100.dat 212 0/mV 12 0 0 0 0\n";
        let header = parse_header(text).unwrap();
        let record = header.as_single().unwrap();
        assert_eq!(record.signals.adc_gain[0], Some(200.0));
    }

    #[test]
    fn test_missing_optional_signal_fields_stay_unset() {
        let text = "100 1 360 650000\n100.dat 212\n";
        let header = parse_header(text).unwrap();
        let record = header.as_single().unwrap();

        // read defaults materialize
        assert_eq!(record.signals.samps_per_frame[0], Some(1));
        assert_eq!(record.signals.adc_gain[0], Some(200.0));
        assert_eq!(record.signals.units[0].as_deref(), Some("mV"));
        // no read default: stays unset
        assert_eq!(record.signals.adc_res[0], None);
        assert_eq!(record.signals.skew[0], None);
        assert_eq!(record.signals.sig_name[0], None);
    }

    #[test]
    fn test_inline_comment_splits_line() {
        let text = "100 1 360 650000 # recorded at 360 Hz\n100.dat 212 200/mV\n";
        let header = parse_header(text).unwrap();
        assert_eq!(header.comments(), &["recorded at 360 Hz".to_string()]);
        assert_eq!(header.as_single().unwrap().fields.sig_len, Some(650_000));
    }

    #[test]
    fn test_comment_keeps_extra_hashes() {
        let text = "100 1 360 650000\n100.dat 212 200/mV\n## emphatic note\n";
        let header = parse_header(text).unwrap();
        assert_eq!(header.comments(), &["# emphatic note".to_string()]);
    }

    #[test]
    fn test_fs_read_default() {
        let text = "100 0";
        let header = parse_header(text).unwrap();
        assert_eq!(header.as_single().unwrap().fields.fs, Some(250.0));
    }
}
