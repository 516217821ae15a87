//! Activation functions for perceptron units
//!
//! This module provides the activation kinds a unit can be configured with:
//! - Identity (pass-through)
//! - ReLU (default for hidden layers)
//! - Sigmoid
//! - Softmax (output layer only, resolved by the network over the whole layer)
//!
//! Derivatives are expressed in terms of the unit's own output rather than its
//! pre-activation, which is what the error-propagation rule consumes.

use std::fmt;
use std::str::FromStr;

use crate::error::NetworkError;

/// Activation kind selected once at network construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Identity,
    ReLU,
    Sigmoid,
    Softmax,
}

impl Activation {
    /// Applies the activation to a pre-activation value `z`.
    ///
    /// Softmax cannot be evaluated from a single value, so it returns `z`
    /// untouched; the network normalises the output layer afterwards.
    pub fn apply(self, z: f64) -> f64 {
        match self {
            Activation::Identity | Activation::Softmax => z,
            Activation::ReLU => relu(z),
            Activation::Sigmoid => sigmoid(z),
        }
    }

    /// Derivative of the activation evaluated at the unit's `output`.
    pub fn derivative(self, output: f64) -> f64 {
        match self {
            Activation::Identity => 1.0,
            Activation::ReLU => relu_derivative(output),
            // Softmax uses the diagonal term only.
            Activation::Sigmoid | Activation::Softmax => sigmoid_derivative(output),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Activation::Identity => "Identity",
            Activation::ReLU => "ReLU",
            Activation::Sigmoid => "Sigmoid",
            Activation::Softmax => "Softmax",
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Activation {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "identity" | "linear" => Ok(Activation::Identity),
            "relu" => Ok(Activation::ReLU),
            "sigmoid" => Ok(Activation::Sigmoid),
            "softmax" => Ok(Activation::Softmax),
            _ => Err(NetworkError::UnknownActivation(s.to_string())),
        }
    }
}

/// Sigmoid activation function.
///
/// Returns the sigmoid of the input: 1 / (1 + exp(-x))
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Sigmoid derivative assuming x = sigmoid(z).
///
/// Returns the derivative: x * (1 - x)
pub fn sigmoid_derivative(x: f64) -> f64 {
    x * (1.0 - x)
}

/// ReLU activation function: max(0, x).
pub fn relu(x: f64) -> f64 {
    x.max(0.0)
}

/// ReLU derivative assuming x = relu(z).
pub fn relu_derivative(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Softmax over a vector of pre-activations.
///
/// Uses the max-subtraction trick for numerical stability to avoid overflow
/// with large values. An empty input yields an empty output.
pub fn softmax(values: &[f64]) -> Vec<f64> {
    let Some(max_value) = values.iter().copied().reduce(f64::max) else {
        return Vec::new();
    };

    let mut outputs: Vec<f64> = values.iter().map(|&v| (v - max_value).exp()).collect();
    let inv_sum = 1.0 / outputs.iter().sum::<f64>();
    for value in outputs.iter_mut() {
        *value *= inv_sum;
    }

    outputs
}
