//! Configuration structures for training
//!
//! This module provides the training configuration: network topology,
//! hyper-parameters, activation and initialization names, and the dataset
//! locations used by the training binary.

use serde::Deserialize;
use std::error::Error;
use std::fs;

/// Locations of the four MNIST IDX files.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub train_images: String,
    pub train_labels: String,
    pub test_images: String,
    pub test_labels: String,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            train_images: "./data/train-images.idx3-ubyte".to_string(),
            train_labels: "./data/train-labels.idx1-ubyte".to_string(),
            test_images: "./data/t10k-images.idx3-ubyte".to_string(),
            test_labels: "./data/t10k-labels.idx1-ubyte".to_string(),
        }
    }
}

/// Configuration for a training run.
///
/// Every field is optional in the JSON file and falls back to its default.
/// Unrecognized `activation` or `initialization` names are not rejected here:
/// the network substitutes a default and logs a warning.
///
/// # Example
///
/// ```json
/// {
///   "layers": [784, 16, 16, 10],
///   "learning_rate": 0.002,
///   "epochs": 20,
///   "batch_size": 600,
///   "activation": "ReLU",
///   "initialization": "Kaiming",
///   "seed": 7
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Units per layer, input layer first and output layer last
    pub layers: Vec<usize>,

    pub learning_rate: f64,

    /// Number of mini-batch updates
    pub epochs: usize,

    /// Samples drawn (with replacement) per epoch
    pub batch_size: usize,

    /// Hidden-layer activation: "ReLU", "Sigmoid" or "Identity"
    pub activation: String,

    /// "Xavier", "Normalized Xavier", "Kaiming" or "Zero"
    pub initialization: String,

    /// Seed for initialization and batch sampling; OS entropy when absent
    pub seed: Option<u64>,

    /// Epochs between self-evaluations on the test set (0 evaluates only at the end)
    pub eval_interval: usize,

    pub data: DataPaths,

    pub train_limit: Option<usize>,
    pub test_limit: Option<usize>,

    /// CSV file receiving `epoch,loss,seconds` lines
    pub loss_log: Option<String>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            layers: vec![784, 16, 16, 10],
            learning_rate: 0.002,
            epochs: 20,
            batch_size: 600,
            activation: "ReLU".to_string(),
            initialization: "Kaiming".to_string(),
            seed: None,
            eval_interval: 5,
            data: DataPaths::default(),
            train_limit: None,
            test_limit: None,
            loss_log: None,
        }
    }
}

/// Loads a training configuration from a JSON file.
///
/// Reads the file at `path` and deserializes its JSON contents into a `TrainingConfig`.
///
/// # Returns
///
/// `Ok(TrainingConfig)` on success, or an error if the file cannot be read, the JSON
/// is invalid or a numeric field is out of range.
///
/// # Examples
///
/// ```no_run
/// use perceptron_network::config::load_config;
///
/// let cfg = load_config("config/mnist_relu_kaiming.json").unwrap();
/// assert_eq!(cfg.layers.last(), Some(&10));
/// ```
pub fn load_config(path: &str) -> Result<TrainingConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let config: TrainingConfig = serde_json::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

fn invalid(message: impl Into<String>) -> Box<dyn Error> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message.into(),
    ))
}

fn validate_config(config: &TrainingConfig) -> Result<(), Box<dyn Error>> {
    if !config.learning_rate.is_finite() || config.learning_rate < 0.0 {
        return Err(invalid("learning_rate must be finite and non-negative"));
    }

    if config.batch_size == 0 {
        return Err(invalid("batch_size must be greater than 0"));
    }

    if config.layers.len() < 2 {
        return Err(invalid(
            "layers must list at least an input and an output layer",
        ));
    }

    if let Some(index) = config.layers.iter().position(|&size| size == 0) {
        return Err(invalid(format!("Layer {index}: size must be greater than 0")));
    }

    Ok(())
}
