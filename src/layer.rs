//! Layers of perceptrons
//!
//! A layer is an ordered sequence of units sharing the same fan-in and role,
//! together with the contiguous output buffer the next layer reads from.

use crate::perceptron::{Perceptron, Role};
use crate::utils::Activation;

/// Position of a layer in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRole {
    Input,
    Hidden,
    Output,
}

/// Ordered sequence of units plus their output buffer.
#[derive(Debug, Clone)]
pub struct Layer {
    role: LayerRole,
    units: Vec<Perceptron>,
    outputs: Vec<f64>,
}

impl Layer {
    /// Input layer of `size` pass-through units, unit `i` bound to pixel `i`.
    pub fn input(size: usize) -> Self {
        Self::from_units(LayerRole::Input, (0..size).map(Perceptron::input).collect())
    }

    /// Hidden layer fully connected to a previous layer of `fan_in` units.
    pub fn hidden(size: usize, fan_in: usize, activation: Activation) -> Self {
        let units = (0..size)
            .map(|_| Perceptron::hidden((0..fan_in).collect(), activation))
            .collect();
        Self::from_units(LayerRole::Hidden, units)
    }

    /// Output layer fully connected to a previous layer of `fan_in` units.
    pub fn output(size: usize, fan_in: usize) -> Self {
        let units = (0..size)
            .map(|_| Perceptron::output_unit((0..fan_in).collect()))
            .collect();
        Self::from_units(LayerRole::Output, units)
    }

    /// Builds a layer from already wired units.
    ///
    /// # Panics
    ///
    /// Panics if a unit's role does not match the layer role.
    pub fn from_units(role: LayerRole, units: Vec<Perceptron>) -> Self {
        let expected = match role {
            LayerRole::Input => Role::Input,
            LayerRole::Hidden => Role::Hidden,
            LayerRole::Output => Role::Output,
        };
        assert!(
            units.iter().all(|unit| unit.role() == expected),
            "Every unit of a {role:?} layer must have the {expected:?} role"
        );

        let outputs = vec![0.0; units.len()];
        Self {
            role,
            units,
            outputs,
        }
    }

    pub fn role(&self) -> LayerRole {
        self.role
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[Perceptron] {
        &self.units
    }

    pub fn units_mut(&mut self) -> &mut [Perceptron] {
        &mut self.units
    }

    /// Contiguous outputs of the last `activate` (or `set_outputs`) call.
    pub fn outputs(&self) -> &[f64] {
        &self.outputs
    }

    /// Error signal of every unit, in unit order.
    pub fn errors(&self) -> Vec<f64> {
        self.units.iter().map(Perceptron::error).collect()
    }

    /// Activates every unit in order and refreshes the output buffer.
    pub fn activate(&mut self, inputs: &[f64]) {
        for (unit, out) in self.units.iter_mut().zip(self.outputs.iter_mut()) {
            unit.activate(inputs);
            *out = unit.output();
        }
    }

    /// Overwrites every unit's output, and the buffer, with `values`.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not have one entry per unit.
    pub fn set_outputs(&mut self, values: &[f64]) {
        assert_eq!(values.len(), self.units.len(), "One output per unit expected");
        for (unit, &value) in self.units.iter_mut().zip(values) {
            unit.set_output(value);
        }
        self.outputs.copy_from_slice(values);
    }

    pub fn parameter_count(&self) -> usize {
        self.units.iter().map(Perceptron::parameter_count).sum()
    }
}
