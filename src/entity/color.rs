//! Entity 314: color definition as a CMY triple with an optional name.

use crate::codec::params::{ParameterBuilder, ParameterError, ParameterScanner};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorDefinition {
    /// Cyan component, percent in [0, 100]
    pub cyan: f64,
    /// Magenta component, percent in [0, 100]
    pub magenta: f64,
    /// Yellow component, percent in [0, 100]
    pub yellow: f64,
    /// Optional color name
    pub name: String,
}

impl ColorDefinition {
    /// Build a named color, clamping each component into [0, 100].
    pub fn new(cyan: f64, magenta: f64, yellow: f64, name: &str) -> Self {
        Self {
            cyan: cyan.clamp(0.0, 100.0),
            magenta: magenta.clamp(0.0, 100.0),
            yellow: yellow.clamp(0.0, 100.0),
            name: name.to_string(),
        }
    }

    pub(crate) fn read_pd(&mut self, scan: &mut ParameterScanner<'_>) -> Result<(), ParameterError> {
        self.cyan = scan.next_real(0.0)?;
        self.magenta = scan.next_real(0.0)?;
        self.yellow = scan.next_real(0.0)?;
        for component in [self.cyan, self.magenta, self.yellow] {
            if !(0.0..=100.0).contains(&component) {
                return Err(ParameterError::Layout(format!(
                    "color component {} outside [0, 100]",
                    component
                )));
            }
        }
        self.name = if scan.terminated() {
            String::new()
        } else {
            scan.next_string()?
        };
        Ok(())
    }

    pub(crate) fn write_pd(&self, b: &mut ParameterBuilder) {
        b.real(self.cyan).real(self.magenta).real(self.yellow);
        if !self.name.is_empty() {
            b.string(&self.name);
        }
    }
}
