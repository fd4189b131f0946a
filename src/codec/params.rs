// CADDY - Enterprise CAD System
// IGES Engine - Parameter Codec

//! Delimited parameter-field scanner and builder.
//!
//! Parameter data and the global section are free-format fields separated by
//! the model's parameter delimiter and terminated by its record delimiter.
//! Both delimiters are per-model state threaded through every call; there is
//! no module-level default scanner. Hollerith strings (`nHxxxx`) are length
//! counted in bytes and may contain either delimiter.

use thiserror::Error;

/// Errors raised while scanning or building parameter fields
#[derive(Error, Debug)]
pub enum ParameterError {
    #[error("unparseable integer field '{0}'")]
    BadInteger(String),

    #[error("unparseable real field '{0}'")]
    BadReal(String),

    #[error("unparseable logical field '{0}'")]
    BadLogical(String),

    #[error("Hollerith count in '{0}' is not a number")]
    BadHollerithCount(String),

    #[error("Hollerith string of {expected} bytes overruns the parameter block")]
    HollerithOverrun { expected: usize },

    #[error("Hollerith length splits a UTF-8 character")]
    HollerithBoundary,

    #[error("missing '{0}' delimiter after Hollerith string")]
    UnterminatedHollerith(char),

    #[error("parameter block is not terminated by the record delimiter")]
    UnterminatedRecord,

    #[error("content after the record delimiter")]
    ContentAfterRecord,

    #[error("expected {expected} more fields in parameter block")]
    MissingFields { expected: usize },

    #[error("{count} unread fields before the record delimiter")]
    TrailingFields { count: usize },

    #[error("parameter layout violation: {0}")]
    Layout(String),
}

/// The per-model delimiter pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    /// Separates fields (global field 1, default ',')
    pub parameter: char,
    /// Ends an entity's block (global field 2, default ';')
    pub record: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            parameter: ',',
            record: ';',
        }
    }
}

/// One raw field as scanned
#[derive(Debug, Clone, Copy, PartialEq)]
enum RawField<'a> {
    /// Two adjacent delimiters, or blanks only: the entity default applies
    Empty,
    /// Unquoted text between delimiters
    Text(&'a str),
    /// Content of a Hollerith string
    Hollerith(&'a str),
}

/// Sequential field scanner over one parameter block.
pub struct ParameterScanner<'a> {
    payload: &'a str,
    pos: usize,
    delims: Delimiters,
    terminated: bool,
}

impl<'a> ParameterScanner<'a> {
    pub fn new(payload: &'a str, delims: Delimiters) -> Self {
        Self {
            payload,
            pos: 0,
            delims,
            terminated: false,
        }
    }

    /// Whether another field precedes the record delimiter
    pub fn has_more(&self) -> bool {
        !self.terminated && self.pos <= self.payload.len()
    }

    fn bytes(&self) -> &'a [u8] {
        self.payload.as_bytes()
    }

    /// Scan the next raw field, honouring Hollerith byte counts.
    fn next_raw(&mut self) -> Result<RawField<'a>, ParameterError> {
        if self.terminated {
            return Err(ParameterError::MissingFields { expected: 1 });
        }
        let bytes = self.bytes();
        let mut start = self.pos;
        while start < bytes.len() && bytes[start] == b' ' {
            start += 1;
        }

        // Hollerith detection: leading digits followed immediately by 'H'.
        let mut digits_end = start;
        while digits_end < bytes.len() && bytes[digits_end].is_ascii_digit() {
            digits_end += 1;
        }
        if digits_end > start && digits_end < bytes.len() && bytes[digits_end] == b'H' {
            let count: usize = self.payload[start..digits_end]
                .parse()
                .map_err(|_| ParameterError::BadHollerithCount(self.payload[start..digits_end].to_string()))?;
            let content_start = digits_end + 1;
            let content_end = content_start + count;
            if content_end > bytes.len() {
                return Err(ParameterError::HollerithOverrun { expected: count });
            }
            let content = self
                .payload
                .get(content_start..content_end)
                .ok_or(ParameterError::HollerithBoundary)?;
            // The byte after the string must be a delimiter.
            if content_end >= bytes.len() {
                return Err(ParameterError::UnterminatedHollerith(self.delims.record));
            }
            let delim = bytes[content_end] as char;
            if delim == self.delims.record {
                self.terminated = true;
            } else if delim != self.delims.parameter {
                return Err(ParameterError::UnterminatedHollerith(self.delims.parameter));
            }
            self.pos = content_end + 1;
            self.check_tail()?;
            return Ok(RawField::Hollerith(content));
        }

        // Plain field: take bytes until either delimiter.
        let mut end = start;
        while end < bytes.len() {
            let c = bytes[end] as char;
            if c == self.delims.parameter || c == self.delims.record {
                break;
            }
            end += 1;
        }
        if end >= bytes.len() {
            return Err(ParameterError::UnterminatedRecord);
        }
        if (bytes[end] as char) == self.delims.record {
            self.terminated = true;
        }
        self.pos = end + 1;
        self.check_tail()?;

        let text = self.payload[start..end].trim();
        if text.is_empty() {
            Ok(RawField::Empty)
        } else {
            Ok(RawField::Text(&self.payload[start..end]))
        }
    }

    /// After the record delimiter only blank padding may remain.
    fn check_tail(&self) -> Result<(), ParameterError> {
        if self.terminated && !self.payload[self.pos..].trim().is_empty() {
            return Err(ParameterError::ContentAfterRecord);
        }
        Ok(())
    }

    /// Next integer field; empty yields `default`.
    pub fn next_int(&mut self, default: i64) -> Result<i64, ParameterError> {
        match self.next_raw()? {
            RawField::Empty => Ok(default),
            RawField::Text(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| ParameterError::BadInteger(text.trim().to_string())),
            RawField::Hollerith(text) => Err(ParameterError::BadInteger(text.to_string())),
        }
    }

    /// Next real field; accepts `E` and `D` exponent markers; empty yields
    /// `default`.
    pub fn next_real(&mut self, default: f64) -> Result<f64, ParameterError> {
        match self.next_raw()? {
            RawField::Empty => Ok(default),
            RawField::Text(text) => parse_real(text),
            RawField::Hollerith(text) => Err(ParameterError::BadReal(text.to_string())),
        }
    }

    /// Next string field; a non-Hollerith empty field yields an empty string.
    pub fn next_string(&mut self) -> Result<String, ParameterError> {
        match self.next_raw()? {
            RawField::Empty => Ok(String::new()),
            RawField::Text(text) => Ok(text.trim().to_string()),
            RawField::Hollerith(text) => Ok(text.to_string()),
        }
    }

    /// Next field re-encoded as it would be written: Hollerith strings keep
    /// their length prefix, other fields their trimmed text. Used to retain
    /// form-dependent payloads verbatim.
    pub fn next_field_encoded(&mut self) -> Result<String, ParameterError> {
        match self.next_raw()? {
            RawField::Empty => Ok(String::new()),
            RawField::Text(text) => Ok(text.trim().to_string()),
            RawField::Hollerith(text) => Ok(encode_hollerith(text)),
        }
    }

    /// Next pointer field: a possibly negative DE sequence number, 0 when
    /// absent.
    pub fn next_pointer(&mut self) -> Result<i64, ParameterError> {
        self.next_int(0)
    }

    /// Next logical field; empty yields `default`.
    pub fn next_logical(&mut self, default: bool) -> Result<bool, ParameterError> {
        match self.next_int(if default { 1 } else { 0 })? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ParameterError::BadLogical(other.to_string())),
        }
    }

    /// Require that the record delimiter has been consumed and nothing
    /// follows it. Remaining unread fields are an error.
    pub fn finish(mut self) -> Result<(), ParameterError> {
        if self.terminated {
            return Ok(());
        }
        if self.payload[self.pos..].trim().is_empty() {
            return Err(ParameterError::UnterminatedRecord);
        }
        let mut count = 0usize;
        while !self.terminated {
            self.next_raw()?;
            count += 1;
        }
        Err(ParameterError::TrailingFields { count })
    }

    /// True once the record delimiter has been consumed.
    pub fn terminated(&self) -> bool {
        self.terminated
    }
}

/// Parse an IGES real: C-style mantissa with an `E` or `D` exponent marker.
pub fn parse_real(text: &str) -> Result<f64, ParameterError> {
    let trimmed = text.trim();
    let normalized = trimmed.replace(['D', 'd'], "E");
    normalized
        .parse::<f64>()
        .map_err(|_| ParameterError::BadReal(trimmed.to_string()))
}

/// Format an IGES real: shortest round-tripping mantissa, trailing zeros
/// trimmed, `D` exponent marker. Magnitudes below `min_resolution` round to
/// zero.
pub fn format_real(value: f64, min_resolution: f64) -> String {
    let value = if value.abs() < min_resolution {
        0.0
    } else {
        value
    };
    let upper = format!("{:E}", value);
    let (mantissa, exponent) = match upper.split_once('E') {
        Some(parts) => parts,
        None => (upper.as_str(), "0"),
    };
    if mantissa.contains('.') {
        format!("{}D{}", mantissa, exponent)
    } else {
        format!("{}.0D{}", mantissa, exponent)
    }
}

/// Encode a Hollerith string; the count is the byte length.
pub fn encode_hollerith(text: &str) -> String {
    format!("{}H{}", text.len(), text)
}

/// Accumulates encoded fields and joins them with the model's delimiters.
pub struct ParameterBuilder {
    fields: Vec<String>,
    delims: Delimiters,
    min_resolution: f64,
}

impl ParameterBuilder {
    pub fn new(delims: Delimiters, min_resolution: f64) -> Self {
        Self {
            fields: Vec::new(),
            delims,
            min_resolution,
        }
    }

    pub fn int(&mut self, value: i64) -> &mut Self {
        self.fields.push(value.to_string());
        self
    }

    pub fn real(&mut self, value: f64) -> &mut Self {
        let encoded = format_real(value, self.min_resolution);
        self.fields.push(encoded);
        self
    }

    pub fn string(&mut self, value: &str) -> &mut Self {
        if value.is_empty() {
            self.fields.push(String::new());
        } else {
            self.fields.push(encode_hollerith(value));
        }
        self
    }

    pub fn pointer(&mut self, value: i64) -> &mut Self {
        self.int(value)
    }

    pub fn logical(&mut self, value: bool) -> &mut Self {
        self.int(if value { 1 } else { 0 })
    }

    /// Push a field that is already encoded.
    pub fn raw(&mut self, encoded: &str) -> &mut Self {
        self.fields.push(encoded.to_string());
        self
    }

    /// Join the fields and close the block with the record delimiter.
    pub fn finish(self) -> String {
        let mut payload = self
            .fields
            .join(&self.delims.parameter.to_string());
        payload.push(self.delims.record);
        payload
    }
}

/// Break a payload into fixed-width content columns for emission.
pub fn wrap_payload(payload: &str, width: usize) -> Vec<String> {
    if payload.is_empty() {
        return vec![String::new()];
    }
    payload
        .as_bytes()
        .chunks(width)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scan(payload: &str) -> ParameterScanner<'_> {
        ParameterScanner::new(payload, Delimiters::default())
    }

    #[test]
    fn test_integers_and_defaults() {
        let mut s = scan("110,,-5;");
        assert_eq!(s.next_int(0).unwrap(), 110);
        assert_eq!(s.next_int(7).unwrap(), 7);
        assert_eq!(s.next_int(0).unwrap(), -5);
        s.finish().unwrap();
    }

    #[test]
    fn test_reals_accept_both_exponent_markers() {
        let mut s = scan("1.5,2.54D1,-3.0E-2,1.D0;");
        assert_eq!(s.next_real(0.0).unwrap(), 1.5);
        assert_eq!(s.next_real(0.0).unwrap(), 25.4);
        assert_eq!(s.next_real(0.0).unwrap(), -0.03);
        assert_eq!(s.next_real(0.0).unwrap(), 1.0);
    }

    #[test]
    fn test_hollerith_preserves_delimiters() {
        let mut s = scan("4H a,b,3H;;;;");
        assert_eq!(s.next_string().unwrap(), " a,b");
        assert_eq!(s.next_string().unwrap(), ";;;");
        s.finish().unwrap();
    }

    #[test]
    fn test_hollerith_counts_bytes() {
        // "µ" is two bytes in UTF-8.
        let payload = format!("{};", encode_hollerith("µm"));
        let mut s = ParameterScanner::new(&payload, Delimiters::default());
        assert_eq!(s.next_string().unwrap(), "µm");
    }

    #[test]
    fn test_hollerith_overrun_is_error() {
        let mut s = scan("9Habc;");
        assert!(matches!(
            s.next_string(),
            Err(ParameterError::HollerithOverrun { expected: 9 })
        ));
    }

    #[test]
    fn test_content_after_record_delimiter_is_error() {
        let mut s = scan("1;2");
        assert!(matches!(
            s.next_int(0),
            Err(ParameterError::ContentAfterRecord)
        ));
    }

    #[test]
    fn test_unterminated_record_is_error() {
        let mut s = scan("1,2,3");
        s.next_int(0).unwrap();
        s.next_int(0).unwrap();
        assert!(matches!(
            s.next_int(0),
            Err(ParameterError::UnterminatedRecord)
        ));
    }

    #[test]
    fn test_custom_delimiters() {
        let delims = Delimiters {
            parameter: '/',
            record: '#',
        };
        let mut s = ParameterScanner::new("100/2.5/3Ha,b#", delims);
        assert_eq!(s.next_int(0).unwrap(), 100);
        assert_eq!(s.next_real(0.0).unwrap(), 2.5);
        assert_eq!(s.next_string().unwrap(), "a,b");
        s.finish().unwrap();
    }

    #[test]
    fn test_format_real_trims_and_marks() {
        assert_eq!(format_real(25.4, 1e-6), "2.54D1");
        assert_eq!(format_real(-0.03, 1e-6), "-3.0D-2");
        assert_eq!(format_real(0.0, 1e-6), "0.0D0");
        // below resolution rounds to zero
        assert_eq!(format_real(1e-9, 1e-6), "0.0D0");
    }

    #[test]
    fn test_builder_joins_fields() {
        let mut b = ParameterBuilder::new(Delimiters::default(), 1e-6);
        b.int(110).real(1.0).string("label").pointer(0);
        assert_eq!(b.finish(), "110,1.0D0,5Hlabel,0;");
    }

    #[test]
    fn test_wrap_payload() {
        let lines = wrap_payload("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_payload("", 4), vec![String::new()]);
    }

    proptest! {
        #[test]
        fn prop_hollerith_round_trip(text in "\\PC*") {
            let payload = format!("{};", encode_hollerith(&text));
            let mut s = ParameterScanner::new(&payload, Delimiters::default());
            let decoded = s.next_string().unwrap();
            prop_assert_eq!(decoded, text);
        }

        #[test]
        fn prop_real_round_trip(value in -1e12f64..1e12f64) {
            let encoded = format_real(value, 0.0);
            let decoded = parse_real(&encoded).unwrap();
            prop_assert_eq!(decoded, value);
        }
    }
}
