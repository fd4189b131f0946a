//! Shell for unknown and untyped entity codes.
//!
//! A NullEntity keeps its raw parameter payload byte-for-byte so the file
//! round-trips losslessly, but offers no typed accessors.

/// Untyped entity preserving its raw parameter data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NullEntity {
    /// The entity type code from the directory entry
    pub type_code: u16,
    /// Raw parameter payload exactly as sliced from the P section
    pub raw: String,
}

impl NullEntity {
    pub fn new(type_code: u16) -> Self {
        Self {
            type_code,
            raw: String::new(),
        }
    }
}
