//! # CADDY IGES Engine
//!
//! File codec and entity-graph engine for IGES 5.3, the ASCII CAD
//! interchange format. The crate reads and writes the fixed-column record
//! grammar, materialises the two-tier Directory-Entry / Parameter-Data
//! entity representation into a typed object graph, and keeps that graph's
//! reference bookkeeping consistent through mutation.
//!
//! ## Architecture
//!
//! - `core`: math aliases, precision handling, and measurement units
//! - `codec`: 80-column records, delimited parameter fields, global section
//! - `entity`: directory entries, typed entity variants, reference lists
//! - `model`: the owning container, registry, resolver, and handle validity
//!
//! ## Quick start
//!
//! ```no_run
//! use caddy_iges::{Model, EntityKind};
//!
//! let mut model = Model::new();
//! model.read("part.igs").unwrap();
//! for entity in model.entities() {
//!     if let Ok(EntityKind::Line(line)) = entity.typed() {
//!         println!("line of length {}", line.length());
//!     }
//! }
//! model.write("part-out.igs", true).unwrap();
//! ```

#![warn(clippy::all)]

pub mod codec;
pub mod core;
pub mod entity;
pub mod error;
pub mod model;

pub use crate::codec::global::GlobalSection;
pub use crate::codec::params::Delimiters;
pub use crate::core::math::{Matrix3, Point2, Point3, Vector2, Vector3};
pub use crate::core::units::Unit;
pub use crate::entity::{
    Associativity, BlankStatus, BoundaryPreference, CircularArc, ColorDefinition, CompositeCurve,
    ConicArc, CurveCreation, CurveOnSurface, Entity, EntityId, EntityKind, EntityUse, Hierarchy,
    Line, NullEntity, Property, RationalBSplineCurve, RationalBSplineSurface, StatusNumber,
    SubfigureDefinition, SubfigureInstance, Subordinate, SurfaceOfRevolution,
    TransformationMatrix, TrimmedSurface,
};
pub use crate::error::{IgesError, IgesResult};
pub use crate::model::{EntityHandle, Model, ModelConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
