// CADDY - Enterprise CAD System
// IGES Engine - Record I/O

//! Fixed-column record reader/writer.
//!
//! An IGES file is a stream of 80-column records: 72 columns of content, a
//! section letter in column 73, and a right-justified 7-digit sequence number
//! in columns 74-80. Sections run S, G, D, P, T in that order; sequence
//! numbers are contiguous from 1 within each section. The single T record
//! carries the per-section record counts and terminates the file.

use std::io::{self, Write};
use thiserror::Error;

/// Errors raised by the record layer
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("record {index} is {length} columns; at least 73 are required")]
    ShortRecord { index: usize, length: usize },

    #[error("record {index} has unknown section letter '{letter}'")]
    BadSection { index: usize, letter: char },

    #[error("section {0} appears after a later section")]
    SectionOrder(char),

    #[error("section {0} record has a malformed sequence number")]
    BadSequence(char),

    #[error("section {section} record has sequence {found}, expected {expected}")]
    SequenceGap {
        section: char,
        expected: u32,
        found: u32,
    },

    #[error("malformed terminate record: {0}")]
    BadTerminator(String),

    #[error(
        "terminate counts S{ts}/G{tg}/D{td}/P{tp} do not match read counts S{s}/G{g}/D{d}/P{p}"
    )]
    CountMismatch {
        ts: u32,
        tg: u32,
        td: u32,
        tp: u32,
        s: u32,
        g: u32,
        d: u32,
        p: u32,
    },

    #[error("input ends before the terminate record")]
    MissingTerminator,

    #[error("content after the terminate record")]
    TrailingContent,
}

/// IGES file sections in file order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Section {
    Start,
    Global,
    Directory,
    Parameter,
    Terminate,
}

impl Section {
    /// The column-73 tag for this section
    pub fn letter(self) -> char {
        match self {
            Section::Start => 'S',
            Section::Global => 'G',
            Section::Directory => 'D',
            Section::Parameter => 'P',
            Section::Terminate => 'T',
        }
    }

    /// Parse a column-73 tag
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'S' => Some(Section::Start),
            'G' => Some(Section::Global),
            'D' => Some(Section::Directory),
            'P' => Some(Section::Parameter),
            'T' => Some(Section::Terminate),
            _ => None,
        }
    }
}

/// The content of a file's S, G, D, and P sections, one 72-column string per
/// record, after section order, numbering, and terminator counts have been
/// verified.
#[derive(Debug, Default)]
pub struct SectionedRecords {
    pub start: Vec<String>,
    pub global: Vec<String>,
    pub directory: Vec<String>,
    pub parameter: Vec<String>,
}

/// Split raw input into 80-column records.
///
/// Newlines between records are tolerated and skipped; a file written without
/// newlines is consumed in 80-byte chunks. A trailing 72+8 short form (the
/// sequence field trimmed of right padding) is also accepted.
fn split_records(input: &str) -> Result<Vec<String>, RecordError> {
    let mut records = Vec::new();
    let mut index = 0usize;
    for line in input.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        if line.len() > 80 && line.len() % 80 == 0 {
            // No newline separators; consume fixed 80-byte chunks.
            for chunk in line.as_bytes().chunks(80) {
                index += 1;
                let text = std::str::from_utf8(chunk)
                    .map_err(|_| RecordError::ShortRecord { index, length: 0 })?;
                records.push(text.to_string());
            }
            continue;
        }
        index += 1;
        if line.len() < 73 || line.len() > 80 {
            return Err(RecordError::ShortRecord {
                index,
                length: line.len(),
            });
        }
        records.push(line.to_string());
    }
    Ok(records)
}

fn parse_sequence(record: &str, section: char) -> Result<u32, RecordError> {
    let sequence = record[73..]
        .trim()
        .parse::<u32>()
        .map_err(|_| RecordError::BadSequence(section))?;
    if sequence == 0 {
        return Err(RecordError::BadSequence(section));
    }
    Ok(sequence)
}

/// Read and verify the full record stream of an IGES file.
pub fn read_sections(input: &str) -> Result<SectionedRecords, RecordError> {
    let mut sections = SectionedRecords::default();
    let mut current = Section::Start;
    let mut expected_seq = 1u32;
    let mut terminated = false;

    for (index, record) in split_records(input)?.iter().enumerate() {
        if terminated {
            return Err(RecordError::TrailingContent);
        }
        let letter = record[72..73].chars().next().unwrap_or(' ');
        let section = Section::from_letter(letter).ok_or(RecordError::BadSection {
            index: index + 1,
            letter,
        })?;

        if section < current {
            return Err(RecordError::SectionOrder(letter));
        }
        if section > current {
            current = section;
            expected_seq = 1;
        }

        let sequence = parse_sequence(record, letter)?;
        if sequence != expected_seq {
            return Err(RecordError::SequenceGap {
                section: letter,
                expected: expected_seq,
                found: sequence,
            });
        }
        expected_seq += 1;

        let content = format!("{:<72}", &record[..72]);
        match section {
            Section::Start => sections.start.push(content),
            Section::Global => sections.global.push(content),
            Section::Directory => sections.directory.push(content),
            Section::Parameter => sections.parameter.push(content),
            Section::Terminate => {
                verify_terminator(&content, &sections)?;
                terminated = true;
            }
        }
    }

    if !terminated {
        return Err(RecordError::MissingTerminator);
    }
    Ok(sections)
}

/// Check the `S<sss>G<ggg>D<ddd>P<ppp>` terminate record against what was
/// actually read.
fn verify_terminator(content: &str, sections: &SectionedRecords) -> Result<(), RecordError> {
    let field = |offset: usize, tag: char| -> Result<u32, RecordError> {
        let text = &content[offset..offset + 8];
        let mut chars = text.trim_start().chars();
        if chars.next() != Some(tag) {
            return Err(RecordError::BadTerminator(format!(
                "expected '{}' field at column {}",
                tag,
                offset + 1
            )));
        }
        chars
            .as_str()
            .trim()
            .parse::<u32>()
            .map_err(|_| RecordError::BadTerminator(format!("bad count in '{}' field", tag)))
    };

    let (ts, tg, td, tp) = (field(0, 'S')?, field(8, 'G')?, field(16, 'D')?, field(24, 'P')?);
    let (s, g, d, p) = (
        sections.start.len() as u32,
        sections.global.len() as u32,
        sections.directory.len() as u32,
        sections.parameter.len() as u32,
    );
    if (ts, tg, td, tp) != (s, g, d, p) {
        return Err(RecordError::CountMismatch {
            ts,
            tg,
            td,
            tp,
            s,
            g,
            d,
            p,
        });
    }
    Ok(())
}

/// Sequenced record emitter.
///
/// Pads every record to 72 columns, appends the section letter and a 7-digit
/// sequence number, and writes exactly one terminate record on `finish`.
pub struct RecordWriter<W: Write> {
    writer: W,
    start: u32,
    global: u32,
    directory: u32,
    parameter: u32,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            start: 0,
            global: 0,
            directory: 0,
            parameter: 0,
        }
    }

    /// Emit one record in the given section. Returns the sequence number used.
    pub fn write_record(&mut self, section: Section, content: &str) -> io::Result<u32> {
        let counter = match section {
            Section::Start => &mut self.start,
            Section::Global => &mut self.global,
            Section::Directory => &mut self.directory,
            Section::Parameter => &mut self.parameter,
            Section::Terminate => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "terminate records are emitted by finish()",
                ))
            }
        };
        *counter += 1;
        let sequence = *counter;
        writeln!(
            self.writer,
            "{:<72}{}{:>7}",
            content,
            section.letter(),
            sequence
        )?;
        Ok(sequence)
    }

    /// Emit the terminate record and flush.
    pub fn finish(mut self) -> io::Result<()> {
        let counts = format!(
            "S{:>7}G{:>7}D{:>7}P{:>7}",
            self.start, self.global, self.directory, self.parameter
        );
        writeln!(self.writer, "{:<72}{}{:>7}", counts, 'T', 1)?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(content: &str, letter: char, seq: u32) -> String {
        format!("{:<72}{}{:>7}", content, letter, seq)
    }

    fn minimal_file() -> String {
        [
            rec("test file", 'S', 1),
            rec("1H,,1H;;", 'G', 1),
            rec(
                "S      1G      1D      0P      0",
                'T',
                1,
            ),
        ]
        .join("\n")
    }

    #[test]
    fn test_minimal_file_parses() {
        let sections = read_sections(&minimal_file()).unwrap();
        assert_eq!(sections.start.len(), 1);
        assert_eq!(sections.global.len(), 1);
        assert!(sections.directory.is_empty());
        assert!(sections.parameter.is_empty());
    }

    #[test]
    fn test_file_without_newlines() {
        let glued = minimal_file().replace('\n', "");
        let sections = read_sections(&glued).unwrap();
        assert_eq!(sections.start.len(), 1);
        assert_eq!(sections.global.len(), 1);
    }

    #[test]
    fn test_short_record_is_fatal() {
        let err = read_sections("too short\n").unwrap_err();
        assert!(matches!(err, RecordError::ShortRecord { .. }));
    }

    #[test]
    fn test_bad_section_letter_is_fatal() {
        let input = [rec("x", 'S', 1), rec("y", 'Q', 1)].join("\n");
        assert!(matches!(
            read_sections(&input),
            Err(RecordError::BadSection { letter: 'Q', .. })
        ));
    }

    #[test]
    fn test_sequence_gap_is_fatal() {
        let input = [rec("a", 'S', 1), rec("b", 'S', 3)].join("\n");
        assert!(matches!(
            read_sections(&input),
            Err(RecordError::SequenceGap {
                expected: 2,
                found: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_section_regression_is_fatal() {
        let input = [rec("a", 'G', 1), rec("b", 'S', 1)].join("\n");
        assert!(matches!(
            read_sections(&input),
            Err(RecordError::SectionOrder('S'))
        ));
    }

    #[test]
    fn test_count_mismatch_is_fatal() {
        let input = [
            rec("a", 'S', 1),
            rec("1H,,1H;;", 'G', 1),
            rec("S      2G      1D      0P      0", 'T', 1),
        ]
        .join("\n");
        assert!(matches!(
            read_sections(&input),
            Err(RecordError::CountMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_terminator_is_fatal() {
        let input = rec("a", 'S', 1);
        assert!(matches!(
            read_sections(&input),
            Err(RecordError::MissingTerminator)
        ));
    }

    #[test]
    fn test_writer_round_trip() {
        let mut out = Vec::new();
        {
            let mut w = RecordWriter::new(&mut out);
            w.write_record(Section::Start, "hello").unwrap();
            w.write_record(Section::Global, "1H,,1H;;").unwrap();
            w.finish().unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        for line in text.lines() {
            assert_eq!(line.len(), 80);
        }
        let sections = read_sections(&text).unwrap();
        assert_eq!(sections.start.len(), 1);
        assert_eq!(sections.global.len(), 1);
    }
}
