// CADDY - Enterprise CAD System
// IGES Engine - Codec Layer

//! Low-level IGES codec: 80-column records, delimited parameter fields, and
//! the 25-field global section.

pub mod global;
pub mod params;
pub mod record;

pub use global::GlobalSection;
pub use params::{Delimiters, ParameterBuilder, ParameterError, ParameterScanner};
pub use record::{RecordError, RecordWriter, Section, SectionedRecords};
