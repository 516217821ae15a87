//! Shared utilities for the perceptron network
//!
//! This module provides the activation functions used by units and by the
//! network's output post-processing step.

pub mod activations;

pub use activations::{relu, sigmoid, sigmoid_derivative, softmax, Activation};
