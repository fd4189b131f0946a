// CADDY - Enterprise CAD System
// IGES Engine - Global Section

//! The 25-field global header: delimiters, identification strings, precision
//! capabilities, units, resolution, and timestamps. The delimiters chosen
//! here govern every parameter-section parse downstream.

use crate::codec::params::{Delimiters, ParameterBuilder, ParameterScanner};
use crate::core::units::Unit;
use crate::error::{IgesError, IgesResult};

/// Parsed global section
#[derive(Debug, Clone)]
pub struct GlobalSection {
    /// Parameter and record delimiters (fields 1-2)
    pub delimiters: Delimiters,
    /// Product identification from the sending system (field 3)
    pub product_id: String,
    /// File name (field 4)
    pub file_name: String,
    /// Native system identification (field 5)
    pub native_system_id: String,
    /// Preprocessor version (field 6)
    pub preprocessor_version: String,
    /// Number of binary bits for integer representation (field 7)
    pub integer_bits: u32,
    /// Maximum power of ten in a single-precision float (field 8)
    pub single_max_power: u32,
    /// Significant digits in a single-precision float (field 9)
    pub single_significance: u32,
    /// Maximum power of ten in a double-precision float (field 10)
    pub double_max_power: u32,
    /// Significant digits in a double-precision float (field 11)
    pub double_significance: u32,
    /// Product identification for the receiving system (field 12)
    pub receiving_product_id: String,
    /// Model space scale (field 13)
    pub model_space_scale: f64,
    /// Units flag (field 14)
    pub units: Unit,
    /// Units name (field 15)
    pub units_name: String,
    /// Maximum number of line-weight gradations (field 16)
    pub max_line_weight_gradations: u32,
    /// Width of the maximum line weight in units (field 17)
    pub max_line_weight: f64,
    /// File creation timestamp, `YYYYMMDD.HHNNSS` (field 18)
    pub created: String,
    /// Minimum user-intended resolution (field 19)
    pub min_resolution: f64,
    /// Approximate maximum coordinate value (field 20)
    pub max_coordinate: f64,
    /// Author (field 21)
    pub author: String,
    /// Author's organization (field 22)
    pub organization: String,
    /// Specification version flag; 11 = IGES 5.3 (field 23)
    pub version_flag: u32,
    /// Drafting standard flag (field 24)
    pub drafting_standard: u32,
    /// Model modification timestamp (field 25)
    pub modified: String,
    /// Application protocol or subset identifier (field 26)
    pub application_protocol: String,
}

impl Default for GlobalSection {
    fn default() -> Self {
        Self {
            delimiters: Delimiters::default(),
            product_id: String::new(),
            file_name: String::new(),
            native_system_id: "CADDY".to_string(),
            preprocessor_version: "1.0".to_string(),
            integer_bits: 32,
            single_max_power: 38,
            single_significance: 6,
            double_max_power: 308,
            double_significance: 15,
            receiving_product_id: String::new(),
            model_space_scale: 1.0,
            units: Unit::Millimeter,
            units_name: Unit::Millimeter.name().to_string(),
            max_line_weight_gradations: 1,
            max_line_weight: 1.0,
            created: String::new(),
            min_resolution: 1e-6,
            max_coordinate: 0.0,
            author: String::new(),
            organization: String::new(),
            version_flag: 11,
            drafting_standard: 0,
            modified: String::new(),
            application_protocol: String::new(),
        }
    }
}

impl GlobalSection {
    /// Unit conversion factor from file units to millimetres.
    ///
    /// 1.0 for millimetre and user-defined-unit files.
    pub fn conversion_factor(&self) -> f64 {
        self.units.to_millimeters()
    }

    /// Parse the global section from the joined content of the G records.
    ///
    /// Fields 1 and 2 are self-describing Hollerith delimiters; omitted
    /// trailing fields take their declared defaults.
    pub fn parse(records: &[String]) -> IgesResult<Self> {
        let payload = records.join("");
        let mut global = GlobalSection::default();

        let (delimiters, offset, terminated) = parse_delimiters(&payload)?;
        global.delimiters = delimiters;
        if terminated {
            // The record delimiter followed field 2: every later field
            // takes its default.
            return Ok(global);
        }

        let mut scan = ParameterScanner::new(&payload[offset..], delimiters);
        global.product_id = next_string(&mut scan, "")?;
        global.file_name = next_string(&mut scan, "")?;
        global.native_system_id = next_string(&mut scan, "CADDY")?;
        global.preprocessor_version = next_string(&mut scan, "1.0")?;
        global.integer_bits = next_int(&mut scan, 32)? as u32;
        global.single_max_power = next_int(&mut scan, 38)? as u32;
        global.single_significance = next_int(&mut scan, 6)? as u32;
        global.double_max_power = next_int(&mut scan, 308)? as u32;
        global.double_significance = next_int(&mut scan, 15)? as u32;
        global.receiving_product_id = next_string(&mut scan, "")?;
        global.model_space_scale = next_real(&mut scan, 1.0)?;

        let flag = next_int(&mut scan, Unit::Millimeter.flag() as i64)?;
        global.units = Unit::from_flag(flag)
            .ok_or_else(|| IgesError::Global(format!("unknown units flag {}", flag)))?;
        global.units_name = next_string(&mut scan, global.units.name())?;

        global.max_line_weight_gradations = next_int(&mut scan, 1)?.max(1) as u32;
        global.max_line_weight = next_real(&mut scan, 1.0)?;
        global.created = next_string(&mut scan, "")?;
        global.min_resolution = next_real(&mut scan, 1e-6)?;
        global.max_coordinate = next_real(&mut scan, 0.0)?;
        global.author = next_string(&mut scan, "")?;
        global.organization = next_string(&mut scan, "")?;
        global.version_flag = next_int(&mut scan, 11)? as u32;
        global.drafting_standard = next_int(&mut scan, 0)? as u32;
        global.modified = next_string(&mut scan, "")?;
        global.application_protocol = next_string(&mut scan, "")?;

        if !scan.terminated() {
            scan.finish().map_err(IgesError::Parameter)?;
        }
        Ok(global)
    }

    /// Emit the global payload, ready to be wrapped into 72-column G records.
    pub fn format(&self) -> String {
        let d = self.delimiters;
        let mut b = ParameterBuilder::new(d, self.min_resolution);
        b.raw(&format!("1H{}", d.parameter))
            .raw(&format!("1H{}", d.record))
            .string(&self.product_id)
            .string(&self.file_name)
            .string(&self.native_system_id)
            .string(&self.preprocessor_version)
            .int(self.integer_bits as i64)
            .int(self.single_max_power as i64)
            .int(self.single_significance as i64)
            .int(self.double_max_power as i64)
            .int(self.double_significance as i64)
            .string(&self.receiving_product_id)
            .real(self.model_space_scale)
            .int(self.units.flag() as i64)
            .string(&self.units_name)
            .int(self.max_line_weight_gradations as i64)
            .real(self.max_line_weight)
            .string(&self.created)
            .real(self.min_resolution)
            .real(self.max_coordinate)
            .string(&self.author)
            .string(&self.organization)
            .int(self.version_flag as i64)
            .int(self.drafting_standard as i64)
            .string(&self.modified)
            .string(&self.application_protocol);
        b.finish()
    }
}

/// Fields 1 and 2 describe the delimiters that the rest of the file uses, so
/// they cannot go through the ordinary scanner. Returns the delimiters, the
/// byte offset of field 3, and whether the record delimiter already closed
/// the section.
fn parse_delimiters(payload: &str) -> IgesResult<(Delimiters, usize, bool)> {
    let bytes = payload.as_bytes();
    let mut delims = Delimiters::default();
    let mut pos = 0usize;

    // Field 1: parameter delimiter, or empty for the default comma.
    if bytes.first() == Some(&b',') {
        pos = 1;
    } else if payload.starts_with("1H") && bytes.len() > 3 {
        delims.parameter = bytes[2] as char;
        if bytes[3] as char != delims.parameter {
            return Err(IgesError::Global(
                "parameter delimiter field is not self-delimited".to_string(),
            ));
        }
        pos = 4;
    } else {
        return Err(IgesError::Global(
            "malformed parameter delimiter field".to_string(),
        ));
    }

    // Field 2: record delimiter, or empty for the default semicolon.
    let rest = &bytes[pos..];
    if rest.first().map(|&b| b as char) == Some(delims.parameter) {
        pos += 1;
    } else if payload[pos..].starts_with("1H") && rest.len() > 3 {
        delims.record = rest[2] as char;
        let after = rest[3] as char;
        if after == delims.record {
            return Ok((delims, pos + 4, true));
        }
        if after != delims.parameter {
            return Err(IgesError::Global(
                "record delimiter field is not delimited".to_string(),
            ));
        }
        pos += 4;
    } else {
        return Err(IgesError::Global(
            "malformed record delimiter field".to_string(),
        ));
    }

    Ok((delims, pos, false))
}

fn next_int(scan: &mut ParameterScanner<'_>, default: i64) -> IgesResult<i64> {
    if scan.terminated() {
        return Ok(default);
    }
    scan.next_int(default).map_err(IgesError::Parameter)
}

fn next_real(scan: &mut ParameterScanner<'_>, default: f64) -> IgesResult<f64> {
    if scan.terminated() {
        return Ok(default);
    }
    scan.next_real(default).map_err(IgesError::Parameter)
}

fn next_string(scan: &mut ParameterScanner<'_>, default: &str) -> IgesResult<String> {
    if scan.terminated() {
        return Ok(default.to_string());
    }
    let text = scan.next_string().map_err(IgesError::Parameter)?;
    if text.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(text)
    }
}
