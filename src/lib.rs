// src/lib.rs
//! # wfdb-header
//!
//! A Rust library for parsing and serializing WFDB (Waveform Database) record
//! header files, the textual metadata format used by PhysioNet and other
//! physiological-signal archives.
//!
//! A header describes a record's channels, sampling parameters, storage
//! layout, and optional multi-segment structure. This crate implements the
//! header engine only: the field-specification registry, the record/signal/
//! segment line grammars, default-value dependency resolution, write-field
//! selection, cross-field cohesion validation, and textual rendering.
//! Fetching header bytes and decoding the binary sample files referenced by
//! `fmt` are left to the caller.
//!
//! ## Reading a header
//!
//! ```rust
//! use wfdb_header::parse_header;
//!
//! fn main() -> wfdb_header::Result<()> {
//!     let text = "\
//! 100 2 360 650000
//! 100.dat 212 200(-5)/mV 12 -5 995 21756 0 MLII
//! 100.dat 212 200/mV 12 0 1011 20052 0 V5
//! ";
//!     let header = parse_header(text)?;
//!     let record = header.as_single().unwrap();
//!
//!     assert_eq!(record.fields.fs, Some(360.0));
//!     assert_eq!(record.channel_index("V5")?, 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Writing a header
//!
//! ```rust
//! use wfdb_header::{Record, SignalFields, HeaderWriter};
//!
//! fn main() -> wfdb_header::Result<()> {
//!     let mut record = Record::new();
//!     record.fields.record_name = Some("ecg01".to_string());
//!     record.fields.n_sig = Some(1);
//!     record.fields.fs = Some(250.0);
//!     record.fields.sig_len = Some(1000);
//!
//!     record.signals = SignalFields::with_channels(1);
//!     record.signals.file_name[0] = Some("ecg01.dat".to_string());
//!     record.signals.fmt[0] = Some("16".to_string());
//!     record.signals.adc_gain[0] = Some(200.0);
//!     record.signals.baseline[0] = Some(0);
//!     record.signals.units[0] = Some("mV".to_string());
//!
//!     let lines = record.render()?;
//!     assert_eq!(lines[0], "ecg01 1 250 1000");
//!     assert_eq!(lines[1], "ecg01.dat 16 200(0)/mV");
//!     Ok(())
//! }
//! ```

// Modules
pub mod defaults;
pub mod error;
pub mod formats;
pub mod reader;
pub mod record;
pub mod spec;
pub mod writer;

// Re-export commonly used types at the crate root for convenience
pub use error::{HeaderError, Result};

// Model exports
pub use record::{
    FieldValue, Header, MultiSegmentRecord, Record, RecordFields, SegmentFields, SignalFields,
    PLACEHOLDER,
};

// Registry exports
pub use spec::{
    dependency_chain, lookup, DefaultValue, FieldSpec, HeaderField, RecordField, SegmentField,
    SignalField, SpecFamily, ValueKind,
};

// Reader exports
pub use reader::parse_header;

// Writer exports
pub use writer::{
    render_header, write_header_file, HeaderWriter, MultiWriteFields, SingleWriteFields,
};

// Prelude module for glob imports
pub mod prelude {
    //! Convenient imports for common use cases.
    //!
    //! ```rust
    //! use wfdb_header::prelude::*;
    //! ```

    pub use crate::error::{HeaderError, Result};
    pub use crate::reader::parse_header;
    pub use crate::record::{Header, MultiSegmentRecord, Record};
    pub use crate::writer::{render_header, write_header_file, HeaderWriter};
}
