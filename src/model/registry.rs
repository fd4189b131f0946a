// CADDY - Enterprise CAD System
// IGES Engine - Entity Registry

//! Closed mapping from entity type codes to payload constructors.
//!
//! Typed codes get their concrete variant; recognised-but-untyped codes and
//! unknown codes both get a [`NullEntity`] shell so the file round-trips.
//! This is the only place entity payloads are allocated from a type code.

use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::entity::{
    Associativity, CircularArc, ColorDefinition, CompositeCurve, ConicArc, CurveOnSurface,
    EntityKind, Line, NullEntity, Property, RationalBSplineCurve, RationalBSplineSurface,
    SubfigureDefinition, SubfigureInstance, SurfaceOfRevolution, TransformationMatrix,
    TrimmedSurface,
};

/// Codes with a concrete typed variant
pub const TYPED_CODES: [u16; 15] = [
    100, 102, 104, 110, 120, 124, 126, 128, 142, 144, 308, 314, 402, 406, 408,
];

/// All codes named by IGES 5.3 that this engine recognises; those without a
/// typed variant become NullEntity shells.
pub static RECOGNIZED_CODES: Lazy<HashSet<u16>> = Lazy::new(|| {
    [
        100, 102, 104, 110, 120, 124, 126, 128, 141, 142, 143, 144, 154, 164, 180, 186, 308, 314,
        402, 406, 408, 410, 502, 504, 508, 510, 514,
    ]
    .into_iter()
    .collect()
});

/// Construct the payload for a type code.
pub fn construct(type_code: u16) -> EntityKind {
    match type_code {
        100 => EntityKind::CircularArc(CircularArc::default()),
        102 => EntityKind::CompositeCurve(CompositeCurve::default()),
        104 => EntityKind::ConicArc(ConicArc::default()),
        110 => EntityKind::Line(Line::default()),
        120 => EntityKind::SurfaceOfRevolution(SurfaceOfRevolution::default()),
        124 => EntityKind::TransformationMatrix(TransformationMatrix::default()),
        126 => EntityKind::RationalBSplineCurve(RationalBSplineCurve::default()),
        128 => EntityKind::RationalBSplineSurface(RationalBSplineSurface::default()),
        142 => EntityKind::CurveOnSurface(CurveOnSurface::default()),
        144 => EntityKind::TrimmedSurface(TrimmedSurface::default()),
        308 => EntityKind::SubfigureDefinition(SubfigureDefinition::default()),
        314 => EntityKind::ColorDefinition(ColorDefinition::default()),
        402 => EntityKind::Associativity(Associativity::default()),
        406 => EntityKind::Property(Property::default()),
        408 => EntityKind::SubfigureInstance(SubfigureInstance::default()),
        other => {
            if !RECOGNIZED_CODES.contains(&other) {
                log::debug!("unknown entity type {}, using a null shell", other);
            }
            EntityKind::Null(NullEntity::new(other))
        }
    }
}

/// The form number a freshly constructed entity starts with.
pub fn default_form(type_code: u16) -> i16 {
    match type_code {
        // Conic arcs have no form 0; an ellipse is the base form.
        104 => 1,
        _ => 0,
    }
}

/// Whether `form` is admissible for `type_code`. Untyped codes accept any
/// non-negative form.
pub fn valid_form(type_code: u16, form: i16) -> bool {
    match type_code {
        100 | 102 | 142 | 144 | 308 | 314 | 408 => form == 0,
        104 => (1..=3).contains(&form),
        110 => (0..=2).contains(&form),
        120 => form == 0,
        124 => matches!(form, 0 | 1 | 10 | 11 | 12),
        126 => (0..=5).contains(&form),
        128 => (0..=9).contains(&form),
        402 | 406 => form >= 0,
        _ => form >= 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_codes_construct_typed_kinds() {
        for code in TYPED_CODES {
            let kind = construct(code);
            assert_eq!(kind.type_code(), code, "code {}", code);
            assert!(!matches!(kind, EntityKind::Null(_)), "code {}", code);
        }
    }

    #[test]
    fn test_untyped_codes_become_null() {
        for code in [141, 143, 154, 164, 180, 186, 410, 502, 504, 508, 510, 514, 999] {
            let kind = construct(code);
            assert!(matches!(kind, EntityKind::Null(_)), "code {}", code);
            assert_eq!(kind.type_code(), code);
        }
    }

    #[test]
    fn test_form_whitelists() {
        assert!(valid_form(110, 0));
        assert!(valid_form(110, 2));
        assert!(!valid_form(110, 3));
        assert!(!valid_form(104, 0));
        assert!(valid_form(104, 1));
        assert!(valid_form(124, 12));
        assert!(!valid_form(124, 2));
        assert!(valid_form(126, 5));
        assert!(!valid_form(126, 6));
        assert!(valid_form(999, 63));
    }

    #[test]
    fn test_default_forms_are_valid() {
        for code in TYPED_CODES {
            assert!(valid_form(code, default_form(code)), "code {}", code);
        }
    }
}
