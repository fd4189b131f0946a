//! Measurement units recognised by the IGES global section.
//!
//! The engine normalises geometry to millimetres on load when conversion is
//! enabled, so every unit carries its exact factor to millimetres.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Model-space units, keyed by the IGES global-section unit flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// Imperial - inches (flag 1)
    Inch,
    /// Metric - millimeters (flag 2)
    Millimeter,
    /// Unit named by the units-name field only (flag 3)
    UserDefined,
    /// Imperial - feet (flag 4)
    Foot,
    /// Imperial - miles (flag 5)
    Mile,
    /// Metric - meters (flag 6)
    Meter,
    /// Metric - kilometers (flag 7)
    Kilometer,
    /// Imperial - mils, thousandths of an inch (flag 8)
    Mil,
    /// Metric - microns (flag 9)
    Micron,
    /// Metric - centimeters (flag 10)
    Centimeter,
    /// Imperial - microinches (flag 11)
    Microinch,
}

impl Unit {
    /// Returns the conversion factor from this unit to millimeters.
    ///
    /// User-defined units cannot be converted and report 1.0.
    pub fn to_millimeters(&self) -> f64 {
        match self {
            Unit::Inch => 25.4,
            Unit::Millimeter => 1.0,
            Unit::UserDefined => 1.0,
            Unit::Foot => 304.8,
            Unit::Mile => 1_609_344.0,
            Unit::Meter => 1000.0,
            Unit::Kilometer => 1_000_000.0,
            Unit::Mil => 0.0254,
            Unit::Micron => 0.001,
            Unit::Centimeter => 10.0,
            Unit::Microinch => 2.54e-5,
        }
    }

    /// The global-section unit flag for this unit
    pub fn flag(&self) -> u32 {
        match self {
            Unit::Inch => 1,
            Unit::Millimeter => 2,
            Unit::UserDefined => 3,
            Unit::Foot => 4,
            Unit::Mile => 5,
            Unit::Meter => 6,
            Unit::Kilometer => 7,
            Unit::Mil => 8,
            Unit::Micron => 9,
            Unit::Centimeter => 10,
            Unit::Microinch => 11,
        }
    }

    /// Parse a unit from the global-section unit flag
    pub fn from_flag(flag: i64) -> Option<Self> {
        match flag {
            1 => Some(Unit::Inch),
            2 => Some(Unit::Millimeter),
            3 => Some(Unit::UserDefined),
            4 => Some(Unit::Foot),
            5 => Some(Unit::Mile),
            6 => Some(Unit::Meter),
            7 => Some(Unit::Kilometer),
            8 => Some(Unit::Mil),
            9 => Some(Unit::Micron),
            10 => Some(Unit::Centimeter),
            11 => Some(Unit::Microinch),
            _ => None,
        }
    }

    /// The units-name string written to global field 15
    pub fn name(&self) -> &'static str {
        match self {
            Unit::Inch => "INCH",
            Unit::Millimeter => "MM",
            Unit::UserDefined => "UNIT",
            Unit::Foot => "FT",
            Unit::Mile => "MI",
            Unit::Meter => "M",
            Unit::Kilometer => "KM",
            Unit::Mil => "MIL",
            Unit::Micron => "UM",
            Unit::Centimeter => "CM",
            Unit::Microinch => "UIN",
        }
    }

    /// Convert a value from this unit to another unit
    pub fn convert_to(&self, value: f64, target: Unit) -> f64 {
        value * self.to_millimeters() / target.to_millimeters()
    }
}

impl Default for Unit {
    fn default() -> Self {
        Unit::Millimeter
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversion() {
        let value_in_mm = Unit::Inch.convert_to(1.0, Unit::Millimeter);
        assert!((value_in_mm - 25.4).abs() < 1e-12);

        let value_in_cm = Unit::Meter.convert_to(2.0, Unit::Centimeter);
        assert!((value_in_cm - 200.0).abs() < 1e-12);
    }

    #[test]
    fn test_flag_round_trip() {
        for flag in 1..=11 {
            let unit = Unit::from_flag(flag).unwrap();
            assert_eq!(unit.flag() as i64, flag);
        }
        assert!(Unit::from_flag(0).is_none());
        assert!(Unit::from_flag(12).is_none());
    }

    #[test]
    fn test_default_is_millimeters() {
        assert_eq!(Unit::default(), Unit::Millimeter);
        assert_eq!(Unit::default().to_millimeters(), 1.0);
    }
}
