//! Perceptron computation unit
//!
//! A perceptron owns its weights, bias and gradient accumulators, and reads its
//! inputs by index from a contiguous buffer owned by someone else: the previous
//! layer's output buffer, or the normalized pixel vector for input units.
//!
//! Training follows an explicit two-phase protocol. During the accumulate phase
//! `update_error` and `accumulate_gradient` are called once per sample; the
//! apply phase (`apply_update`) averages the accumulated gradients over the
//! sample count, updates the parameters and resets the accumulators.

use crate::error::{NetworkError, Result};
use crate::utils::Activation;

/// Role of a unit inside the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Input,
    Hidden,
    Output,
}

/// Error feedback handed to a unit during the backward pass.
#[derive(Debug, Clone, Copy)]
pub enum Feedback<'a> {
    /// One-hot target for an output unit.
    Target(f64),
    /// Errors of every unit in the next layer, and each of those units' weight
    /// on the connection coming from this unit.
    Downstream {
        errors: &'a [f64],
        weights: &'a [f64],
    },
}

/// A single unit: weights, bias, output, error and gradient sums.
///
/// # Example
///
/// ```
/// use perceptron_network::perceptron::Perceptron;
/// use perceptron_network::utils::Activation;
///
/// let mut unit = Perceptron::hidden(vec![0, 1], Activation::Identity);
/// unit.set_weights(&[0.5, -1.0]);
/// unit.set_bias(0.25);
/// unit.activate(&[2.0, 1.0]);
/// assert_eq!(unit.output(), 0.25);
/// ```
#[derive(Debug, Clone)]
pub struct Perceptron {
    role: Role,
    activation: Activation,
    sources: Vec<usize>,
    weights: Vec<f64>,
    bias: f64,
    output: f64,
    error: f64,
    weight_grad_sum: Vec<f64>,
    bias_grad_sum: f64,
    n_samples: usize,
}

impl Perceptron {
    fn new(role: Role, activation: Activation, sources: Vec<usize>) -> Self {
        let fan_in = sources.len();
        Self {
            role,
            activation,
            sources,
            weights: vec![0.0; fan_in],
            bias: 0.0,
            output: 0.0,
            error: 0.0,
            weight_grad_sum: vec![0.0; fan_in],
            bias_grad_sum: 0.0,
            n_samples: 0,
        }
    }

    /// Creates an input unit that copies the normalized pixel at `pixel`.
    pub fn input(pixel: usize) -> Self {
        Self::new(Role::Input, Activation::Identity, vec![pixel])
    }

    /// Creates a hidden unit reading `sources` from the previous layer's outputs.
    pub fn hidden(sources: Vec<usize>, activation: Activation) -> Self {
        Self::new(Role::Hidden, activation, sources)
    }

    /// Creates an output unit. Its activation is the network-level softmax, so
    /// `activate` leaves the raw weighted sum in `output`.
    pub fn output_unit(sources: Vec<usize>) -> Self {
        Self::new(Role::Output, Activation::Softmax, sources)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_input(&self) -> bool {
        self.role == Role::Input
    }

    pub fn is_output(&self) -> bool {
        self.role == Role::Output
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn fan_in(&self) -> usize {
        self.weights.len()
    }

    pub fn sources(&self) -> &[usize] {
        &self.sources
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    /// Weight on the connection coming from input `index`.
    pub fn weight(&self, index: usize) -> f64 {
        self.weights[index]
    }

    /// Replaces every weight.
    ///
    /// # Panics
    ///
    /// Panics if `weights` does not match the unit's fan-in.
    pub fn set_weights(&mut self, weights: &[f64]) {
        assert_eq!(
            weights.len(),
            self.weights.len(),
            "Weights length must match the unit's fan-in"
        );
        self.weights.copy_from_slice(weights);
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn set_bias(&mut self, bias: f64) {
        self.bias = bias;
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    /// Overwrites the output. Used by the network to write softmax
    /// probabilities back into the output layer.
    pub fn set_output(&mut self, output: f64) {
        self.output = output;
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn weight_grad_sum(&self) -> &[f64] {
        &self.weight_grad_sum
    }

    pub fn bias_grad_sum(&self) -> f64 {
        self.bias_grad_sum
    }

    /// Number of trainable parameters (weights plus bias). Input units have none.
    pub fn parameter_count(&self) -> usize {
        match self.role {
            Role::Input => 0,
            Role::Hidden | Role::Output => self.weights.len() + 1,
        }
    }

    /// Dot product of the weights with the bound inputs, plus bias.
    pub fn weighted_sum(&self, inputs: &[f64]) -> f64 {
        self.sources
            .iter()
            .zip(&self.weights)
            .fold(self.bias, |acc, (&source, &weight)| {
                acc + inputs[source] * weight
            })
    }

    /// Forward step for this unit.
    ///
    /// Input units copy their bound pixel verbatim, output units store the raw
    /// weighted sum and hidden units store the activated weighted sum.
    pub fn activate(&mut self, inputs: &[f64]) {
        self.output = match self.role {
            Role::Input => inputs[self.sources[0]],
            Role::Output => self.weighted_sum(inputs),
            Role::Hidden => self.activation.apply(self.weighted_sum(inputs)),
        };
    }

    /// Computes this unit's error signal for the current sample and counts the
    /// sample.
    ///
    /// # Panics
    ///
    /// Panics if the feedback kind does not match the unit's role, or if the
    /// downstream errors and weights differ in length.
    pub fn update_error(&mut self, feedback: Feedback<'_>) {
        let derivative = self.activation.derivative(self.output);
        self.error = match (self.role, feedback) {
            (Role::Output, Feedback::Target(target)) => (self.output - target) * derivative,
            (Role::Hidden, Feedback::Downstream { errors, weights }) => {
                assert_eq!(
                    errors.len(),
                    weights.len(),
                    "Downstream errors and weights must have the same length"
                );
                let weighted: f64 = weights.iter().zip(errors).map(|(w, e)| w * e).sum();
                derivative * weighted
            }
            (role, feedback) => panic!("{role:?} unit cannot take {feedback:?} feedback"),
        };
        self.n_samples += 1;
    }

    /// Adds the current sample's gradient to the running sums.
    pub fn accumulate_gradient(&mut self, inputs: &[f64]) {
        for (grad, &source) in self.weight_grad_sum.iter_mut().zip(&self.sources) {
            *grad += self.error * inputs[source];
        }
        self.bias_grad_sum += self.error;
    }

    /// Applies the averaged accumulated gradients and resets the accumulators.
    ///
    /// Returns `NoAccumulatedSamples` without touching any state when no sample
    /// was accumulated since the last update.
    pub fn apply_update(&mut self, learning_rate: f64) -> Result<()> {
        if self.n_samples == 0 {
            return Err(NetworkError::NoAccumulatedSamples);
        }

        let n = self.n_samples as f64;
        for (weight, grad) in self.weights.iter_mut().zip(self.weight_grad_sum.iter_mut()) {
            *weight -= learning_rate * (*grad / n);
            *grad = 0.0;
        }
        self.bias -= learning_rate * (self.bias_grad_sum / n);

        self.bias_grad_sum = 0.0;
        self.n_samples = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_unit_shapes() {
        let unit = Perceptron::hidden(vec![0, 1, 2], Activation::ReLU);
        assert_eq!(unit.fan_in(), 3);
        assert_eq!(unit.weight_grad_sum().len(), 3);
        assert_eq!(unit.parameter_count(), 4);
        assert_eq!(unit.n_samples(), 0);
    }

    #[test]
    fn test_input_unit_has_no_parameters() {
        let unit = Perceptron::input(7);
        assert!(unit.is_input());
        assert_eq!(unit.fan_in(), 1);
        assert_eq!(unit.parameter_count(), 0);
    }

    #[test]
    fn test_sigmoid_hidden_activation() {
        let mut unit = Perceptron::hidden(vec![0], Activation::Sigmoid);
        unit.activate(&[5.0]);
        assert!((unit.output() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_apply_update_resets_accumulators() {
        let mut unit = Perceptron::output_unit(vec![0]);
        unit.set_output(0.5);
        unit.update_error(Feedback::Target(1.0));
        unit.accumulate_gradient(&[1.0]);
        unit.apply_update(0.1).unwrap();

        assert_eq!(unit.n_samples(), 0);
        assert_eq!(unit.bias_grad_sum(), 0.0);
        assert_eq!(unit.weight_grad_sum(), &[0.0]);
    }

    #[test]
    #[should_panic(expected = "cannot take")]
    fn test_role_feedback_mismatch_panics() {
        let mut unit = Perceptron::hidden(vec![0], Activation::ReLU);
        unit.update_error(Feedback::Target(1.0));
    }
}
