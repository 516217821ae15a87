//! Perceptron Network Library
//!
//! A from-scratch feed-forward network of individual perceptron units for
//! classifying 28×28 MNIST digit images into 10 classes.
//!
//! # Modules
//!
//! - `perceptron`: the computation unit (forward, error, gradient accumulation, update)
//! - `layer`: ordered sequences of units with a contiguous output buffer
//! - `network`: construction, forward pass, backpropagation, mini-batch SGD and evaluation
//! - `initialization`: Xavier, normalized Xavier, Kaiming and zero weight schemes
//! - `utils`: activation functions (Identity, ReLU, Sigmoid, Softmax)
//! - `mnist`: labelled images and IDX file decoding
//! - `config`: training configuration
//! - `error`: crate error type

pub mod config;
pub mod error;
pub mod initialization;
pub mod layer;
pub mod mnist;
pub mod network;
pub mod perceptron;
pub mod utils;

pub use error::{NetworkError, Result};
pub use network::{Evaluation, Network, TrainingReport};
