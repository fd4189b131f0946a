//! The directory-entry status number: four two-digit sub-fields controlling
//! visibility, dependence, use, and hierarchy.

use serde::{Deserialize, Serialize};

/// Blank status sub-field (digits 1-2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlankStatus {
    #[default]
    Visible,
    Blanked,
}

/// Subordinate entity switch sub-field (digits 3-4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Subordinate {
    #[default]
    Independent,
    PhysicallyDependent,
    LogicallyDependent,
    PhysicallyAndLogicallyDependent,
}

/// Entity use flag sub-field (digits 5-6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EntityUse {
    #[default]
    Geometry,
    Annotation,
    Definition,
    Other,
    LogicalPositional,
    Parametric2d,
    ConstructionGeometry,
}

/// Hierarchy sub-field (digits 7-8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Hierarchy {
    #[default]
    GlobalTopDown,
    GlobalDefer,
    UseHierarchyProperty,
}

/// The composite 8-digit status number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusNumber {
    pub blank: BlankStatus,
    pub subordinate: Subordinate,
    pub entity_use: EntityUse,
    pub hierarchy: Hierarchy,
}

impl StatusNumber {
    /// Parse the 8-column DE status field; blanks read as zeros.
    pub fn parse(field: &str) -> Option<Self> {
        let padded: String = format!("{:0>8}", field.trim());
        if padded.len() != 8 || !padded.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let pair = |idx: usize| -> u8 {
            padded[idx..idx + 2].parse::<u8>().unwrap_or(0)
        };
        Some(Self {
            blank: match pair(0) {
                0 => BlankStatus::Visible,
                1 => BlankStatus::Blanked,
                _ => return None,
            },
            subordinate: match pair(2) {
                0 => Subordinate::Independent,
                1 => Subordinate::PhysicallyDependent,
                2 => Subordinate::LogicallyDependent,
                3 => Subordinate::PhysicallyAndLogicallyDependent,
                _ => return None,
            },
            entity_use: match pair(4) {
                0 => EntityUse::Geometry,
                1 => EntityUse::Annotation,
                2 => EntityUse::Definition,
                3 => EntityUse::Other,
                4 => EntityUse::LogicalPositional,
                5 => EntityUse::Parametric2d,
                6 => EntityUse::ConstructionGeometry,
                _ => return None,
            },
            hierarchy: match pair(6) {
                0 => Hierarchy::GlobalTopDown,
                1 => Hierarchy::GlobalDefer,
                2 => Hierarchy::UseHierarchyProperty,
                _ => return None,
            },
        })
    }

    /// Format as the 8-digit DE field.
    pub fn to_field(self) -> String {
        format!(
            "{:02}{:02}{:02}{:02}",
            self.blank as u8, self.subordinate as u8, self.entity_use as u8, self.hierarchy as u8
        )
    }

    /// True when the subordinate switch marks any kind of dependence.
    pub fn is_subordinate(&self) -> bool {
        self.subordinate != Subordinate::Independent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default() {
        let status = StatusNumber::parse("00000000").unwrap();
        assert_eq!(status, StatusNumber::default());
        assert!(!status.is_subordinate());
    }

    #[test]
    fn test_parse_blank_padded() {
        let status = StatusNumber::parse("   10201").unwrap();
        // "00010201": visible, physically dependent, definition? no --
        // padded to 00010201: blank=00, sub=01, use=02, hier=01
        assert_eq!(status.blank, BlankStatus::Visible);
        assert_eq!(status.subordinate, Subordinate::PhysicallyDependent);
        assert_eq!(status.entity_use, EntityUse::Definition);
        assert_eq!(status.hierarchy, Hierarchy::GlobalDefer);
    }

    #[test]
    fn test_round_trip() {
        let status = StatusNumber {
            blank: BlankStatus::Blanked,
            subordinate: Subordinate::LogicallyDependent,
            entity_use: EntityUse::Parametric2d,
            hierarchy: Hierarchy::UseHierarchyProperty,
        };
        let field = status.to_field();
        assert_eq!(field, "01020502");
        assert_eq!(StatusNumber::parse(&field).unwrap(), status);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(StatusNumber::parse("00990000").is_none());
        assert!(StatusNumber::parse("abcdefgh").is_none());
    }
}
