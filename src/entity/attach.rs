//! Attachable entities: associativity instance (402) and property (406).
//!
//! Both families have form-dependent payloads; the engine keeps their fields
//! as encoded text so that every form round-trips, and attaches them to
//! other entities through the trailing pointer groups of the owner's
//! parameter data.

use crate::codec::params::{ParameterBuilder, ParameterError, ParameterScanner};

/// Entity 402: associativity instance, payload retained per form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Associativity {
    /// Encoded fields after the entity type code, in order
    pub fields: Vec<String>,
}

impl Associativity {
    pub(crate) fn read_pd(&mut self, scan: &mut ParameterScanner<'_>) -> Result<(), ParameterError> {
        self.fields = read_all_fields(scan)?;
        Ok(())
    }

    pub(crate) fn write_pd(&self, b: &mut ParameterBuilder) {
        for field in &self.fields {
            b.raw(field);
        }
    }
}

/// Entity 406: property, payload retained per form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Property {
    /// Encoded fields after the entity type code, in order
    pub fields: Vec<String>,
}

impl Property {
    pub(crate) fn read_pd(&mut self, scan: &mut ParameterScanner<'_>) -> Result<(), ParameterError> {
        self.fields = read_all_fields(scan)?;
        Ok(())
    }

    pub(crate) fn write_pd(&self, b: &mut ParameterBuilder) {
        for field in &self.fields {
            b.raw(field);
        }
    }
}

fn read_all_fields(scan: &mut ParameterScanner<'_>) -> Result<Vec<String>, ParameterError> {
    let mut fields = Vec::new();
    while !scan.terminated() {
        fields.push(scan.next_field_encoded()?);
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::params::Delimiters;

    #[test]
    fn test_property_round_trips_any_form() {
        let payload = "2,3.5,11Hname, value;";
        let mut p = Property::default();
        let mut scan = ParameterScanner::new(payload, Delimiters::default());
        p.read_pd(&mut scan).unwrap();
        assert_eq!(p.fields, vec!["2", "3.5", "11Hname, value"]);

        let mut b = ParameterBuilder::new(Delimiters::default(), 1e-6);
        p.write_pd(&mut b);
        assert_eq!(b.finish(), payload);
    }
}
