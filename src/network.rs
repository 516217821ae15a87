//! Feed-forward network of perceptrons
//!
//! The network owns its layers and private copies of the training and
//! evaluation images. One training epoch draws `batch_size` samples uniformly
//! with replacement, runs forward and backward passes for each of them while
//! the units accumulate gradients, and then applies a single parameter update
//! to every unit.
//!
//! # Example
//!
//! ```no_run
//! use perceptron_network::config::TrainingConfig;
//! use perceptron_network::mnist::load_dataset;
//! use perceptron_network::network::Network;
//!
//! let config = TrainingConfig::default();
//! let train = load_dataset(&config.data.train_images, &config.data.train_labels, None).unwrap();
//! let test = load_dataset(&config.data.test_images, &config.data.test_labels, None).unwrap();
//!
//! let mut network = Network::new(&config, &train, &test).unwrap();
//! let report = network.train().unwrap();
//! println!("{}", report.final_evaluation);
//! ```

use std::fmt;
use std::time::Instant;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::TrainingConfig;
use crate::error::{NetworkError, Result};
use crate::initialization::{initialize_layers, Initialization};
use crate::layer::Layer;
use crate::mnist::{MnistImage, IMAGE_SIZE, NUM_CLASSES};
use crate::perceptron::Feedback;
use crate::utils::{softmax, Activation};

/// Floor applied to the true-class probability when reporting cross-entropy.
const LOSS_EPSILON: f64 = 1e-9;

/// Outcome of classifying an evaluation set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub correct: usize,
    pub incorrect: usize,
}

impl Evaluation {
    pub fn total(&self) -> usize {
        self.correct + self.incorrect
    }

    /// Fraction of correct predictions, 0 for an empty set.
    pub fn accuracy(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.correct as f64 / self.total() as f64
        }
    }

    pub fn percentage(&self) -> f64 {
        self.accuracy() * 100.0
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Correct: {}, Wrong: {}, Accuracy: {:.2}%",
            self.correct,
            self.incorrect,
            self.percentage()
        )
    }
}

/// Per-epoch training statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochStats {
    pub epoch: usize,
    /// Mean cross-entropy of the batch, measured before the update
    pub loss: f64,
    pub seconds: f64,
    pub evaluation: Option<Evaluation>,
}

/// Result of a full training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub epochs: Vec<EpochStats>,
    pub final_evaluation: Evaluation,
}

/// A fully connected feed-forward network trained with mini-batch SGD.
pub struct Network {
    layers: Vec<Layer>,
    layer_sizes: Vec<usize>,
    learning_rate: f64,
    epochs: usize,
    batch_size: usize,
    eval_interval: usize,
    activation: Activation,
    initialization: Initialization,
    training_images: Vec<MnistImage>,
    evaluation_images: Vec<MnistImage>,
    rng: StdRng,
}

impl Network {
    /// Builds and initializes a network from `config`.
    ///
    /// Both image sets are deep-copied. Unknown activation or initialization
    /// names fall back to a default with a warning; topology and
    /// hyper-parameter violations are returned as errors before anything is
    /// built.
    pub fn new(
        config: &TrainingConfig,
        training_images: &[MnistImage],
        evaluation_images: &[MnistImage],
    ) -> Result<Self> {
        validate_topology(&config.layers)?;
        if !config.learning_rate.is_finite() || config.learning_rate < 0.0 {
            return Err(NetworkError::InvalidLearningRate(config.learning_rate));
        }
        if config.batch_size == 0 {
            return Err(NetworkError::ZeroBatchSize);
        }

        let activation = resolve_activation(&config.activation);
        let initialization = resolve_initialization(&config.initialization, activation);

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut layers = build_layers(&config.layers, activation);
        initialize_layers(&mut layers, initialization, &mut rng)?;

        let network = Self {
            layers,
            layer_sizes: config.layers.clone(),
            learning_rate: config.learning_rate,
            epochs: config.epochs,
            batch_size: config.batch_size,
            eval_interval: config.eval_interval,
            activation,
            initialization,
            training_images: training_images.to_vec(),
            evaluation_images: evaluation_images.to_vec(),
            rng,
        };

        debug!(
            "Built network {:?} with {} parameters (seed: {:?})",
            network.layer_sizes,
            network.parameter_count(),
            config.seed
        );
        Ok(network)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn initialization(&self) -> Initialization {
        self.initialization
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn epochs(&self) -> usize {
        self.epochs
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn training_images(&self) -> &[MnistImage] {
        &self.training_images
    }

    pub fn evaluation_images(&self) -> &[MnistImage] {
        &self.evaluation_images
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(Layer::parameter_count).sum()
    }

    /// Forward pass returning the softmax class probabilities.
    pub fn infer(&mut self, image: &MnistImage) -> Result<Vec<f64>> {
        let pixels = image.normalized_pixels();
        if pixels.len() != self.layer_sizes[0] {
            return Err(NetworkError::SizeMismatch {
                what: "image pixels and input layer",
                got: pixels.len(),
                expected: self.layer_sizes[0],
            });
        }
        Ok(propagate(&mut self.layers, pixels))
    }

    /// Predicted digit: the index of the highest probability.
    pub fn predict(&mut self, image: &MnistImage) -> Result<usize> {
        Ok(argmax(&self.infer(image)?))
    }

    /// Forward and backward pass for training image `index`, accumulating
    /// gradients without updating any parameter. Returns the sample's
    /// cross-entropy.
    pub fn train_step(&mut self, index: usize) -> Result<f64> {
        let image = self
            .training_images
            .get(index)
            .ok_or(NetworkError::SampleOutOfRange {
                index,
                len: self.training_images.len(),
            })?;
        Ok(train_sample(&mut self.layers, image))
    }

    /// Applies the accumulated gradients of every non-input unit.
    pub fn apply_updates(&mut self) -> Result<()> {
        for layer in self.layers.iter_mut().skip(1) {
            for unit in layer.units_mut() {
                unit.apply_update(self.learning_rate)?;
            }
        }
        Ok(())
    }

    /// Runs every epoch, evaluating every `eval_interval` epochs and once at
    /// the end.
    pub fn train(&mut self) -> Result<TrainingReport> {
        if self.training_images.is_empty() {
            return Err(NetworkError::EmptyTrainingSet);
        }

        let mut epochs = Vec::with_capacity(self.epochs);
        for epoch in 1..=self.epochs {
            let start_time = Instant::now();
            let mut total_loss = 0.0;

            for _ in 0..self.batch_size {
                let index = self.rng.random_range(0..self.training_images.len());
                total_loss += train_sample(&mut self.layers, &self.training_images[index]);
            }
            self.apply_updates()?;

            let loss = total_loss / self.batch_size as f64;
            let seconds = start_time.elapsed().as_secs_f64();
            info!("Epoch {epoch}, Loss: {loss:.6} Time: {seconds:.6}");

            let evaluation = if self.eval_interval > 0
                && epoch % self.eval_interval == 0
                && epoch != self.epochs
            {
                let evaluation = self.evaluate();
                info!("Epoch {epoch} evaluation: {evaluation}");
                Some(evaluation)
            } else {
                None
            };

            epochs.push(EpochStats {
                epoch,
                loss,
                seconds,
                evaluation,
            });
        }

        let final_evaluation = self.evaluate();
        info!("Final evaluation: {final_evaluation}");

        Ok(TrainingReport {
            epochs,
            final_evaluation,
        })
    }

    /// Classifies every evaluation image. Gradient state is left untouched.
    pub fn evaluate(&mut self) -> Evaluation {
        let mut evaluation = Evaluation::default();
        for image in &self.evaluation_images {
            let probabilities = propagate(&mut self.layers, image.normalized_pixels());
            if argmax(&probabilities) == image.label() as usize {
                evaluation.correct += 1;
            } else {
                evaluation.incorrect += 1;
            }
        }
        evaluation
    }

    /// Human-readable structural summary.
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sizes = &self.layer_sizes;
        writeln!(f, "Number of layers: {}", sizes.len())?;
        write!(f, "    Layers sizes: Input layer {} -> ", sizes[0])?;
        for size in &sizes[1..sizes.len() - 1] {
            write!(f, "{size} -> ")?;
        }
        writeln!(f, "Output layer {}", sizes[sizes.len() - 1])?;
        writeln!(f, "Activation function: {}", self.activation)?;
        writeln!(f, "Initialization function: {}", self.initialization)?;
        writeln!(f, "Learning rate: {}", self.learning_rate)?;
        writeln!(f, "Epochs: {}, batch size: {}", self.epochs, self.batch_size)?;
        writeln!(f, "Trainable parameters: {}", self.parameter_count())?;
        write!(
            f,
            "Training images: {}, evaluation images: {}",
            self.training_images.len(),
            self.evaluation_images.len()
        )
    }
}

fn validate_topology(sizes: &[usize]) -> Result<()> {
    if sizes.len() < 2 {
        return Err(NetworkError::InvalidTopology(format!(
            "expected at least an input and an output layer, got {} layer(s)",
            sizes.len()
        )));
    }
    if let Some(index) = sizes.iter().position(|&size| size == 0) {
        return Err(NetworkError::InvalidTopology(format!(
            "layer {index} has no units"
        )));
    }
    if sizes[0] != IMAGE_SIZE {
        return Err(NetworkError::SizeMismatch {
            what: "input layer and image pixels",
            got: sizes[0],
            expected: IMAGE_SIZE,
        });
    }
    if sizes[sizes.len() - 1] != NUM_CLASSES {
        return Err(NetworkError::SizeMismatch {
            what: "output layer and digit classes",
            got: sizes[sizes.len() - 1],
            expected: NUM_CLASSES,
        });
    }
    Ok(())
}

fn resolve_activation(name: &str) -> Activation {
    match name.parse::<Activation>() {
        Ok(Activation::Softmax) => {
            warn!("Softmax is reserved for the output layer, defaulting to ReLU");
            Activation::ReLU
        }
        Ok(activation) => activation,
        Err(err) => {
            warn!("{err}, defaulting to ReLU");
            Activation::ReLU
        }
    }
}

fn resolve_initialization(name: &str, activation: Activation) -> Initialization {
    match name.parse::<Initialization>() {
        Ok(initialization) => initialization,
        Err(err) => {
            let fallback = match activation {
                Activation::Sigmoid => Initialization::Xavier,
                _ => Initialization::Kaiming,
            };
            warn!("{err}, defaulting to {fallback}");
            fallback
        }
    }
}

fn build_layers(sizes: &[usize], activation: Activation) -> Vec<Layer> {
    let last = sizes.len() - 1;
    sizes
        .iter()
        .enumerate()
        .map(|(index, &size)| match index {
            0 => Layer::input(size),
            i if i == last => Layer::output(size, sizes[i - 1]),
            i => Layer::hidden(size, sizes[i - 1], activation),
        })
        .collect()
}

/// Activates every layer in order and replaces the output layer's raw sums
/// with their softmax.
fn propagate(layers: &mut [Layer], pixels: &[f64]) -> Vec<f64> {
    layers[0].activate(pixels);
    for index in 1..layers.len() {
        let (previous, current) = layers.split_at_mut(index);
        current[0].activate(previous[index - 1].outputs());
    }

    let last = layers.len() - 1;
    let probabilities = softmax(layers[last].outputs());
    layers[last].set_outputs(&probabilities);
    probabilities
}

/// Error computation and gradient accumulation, output layer first.
fn backpropagate(layers: &mut [Layer], label: usize) {
    let last = layers.len() - 1;

    let (previous, output) = layers.split_at_mut(last);
    let inputs = previous[last - 1].outputs();
    for (class, unit) in output[0].units_mut().iter_mut().enumerate() {
        let target = if class == label { 1.0 } else { 0.0 };
        unit.update_error(Feedback::Target(target));
        unit.accumulate_gradient(inputs);
    }

    for index in (1..last).rev() {
        let (head, tail) = layers.split_at_mut(index + 1);
        let next = &tail[0];
        let next_errors = next.errors();
        let mut next_weights = vec![0.0; next.len()];

        let (previous, current) = head.split_at_mut(index);
        let inputs = previous[index - 1].outputs();
        for (position, unit) in current[0].units_mut().iter_mut().enumerate() {
            for (weight, next_unit) in next_weights.iter_mut().zip(next.units()) {
                *weight = next_unit.weight(position);
            }
            unit.update_error(Feedback::Downstream {
                errors: &next_errors,
                weights: &next_weights,
            });
            unit.accumulate_gradient(inputs);
        }
    }
}

fn train_sample(layers: &mut [Layer], image: &MnistImage) -> f64 {
    let label = image.label() as usize;
    let probabilities = propagate(layers, image.normalized_pixels());
    backpropagate(layers, label);
    -probabilities[label].max(LOSS_EPSILON).ln()
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (index, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] {
            best = index;
        }
    }
    best
}
