// Tests for error propagation, gradient accumulation and the apply phase.

use approx::assert_relative_eq;
use perceptron_network::config::TrainingConfig;
use perceptron_network::error::NetworkError;
use perceptron_network::mnist::{MnistImage, IMAGE_SIZE};
use perceptron_network::network::Network;
use perceptron_network::perceptron::{Feedback, Perceptron};
use perceptron_network::utils::Activation;

fn band_image(label: u8) -> MnistImage {
    let mut pixels = vec![0u8; IMAGE_SIZE];
    let start = label as usize * 78;
    pixels[start..start + 78].fill(220);
    MnistImage::new(label, pixels).expect("valid synthetic image")
}

fn network_with(config: TrainingConfig, images: &[MnistImage]) -> Network {
    Network::new(&config, images, images).expect("valid network")
}

// ============================================================================
// Error Signal Tests
// ============================================================================

mod error_signal_tests {
    use super::*;

    #[test]
    fn test_output_error_formula() {
        let mut unit = Perceptron::output_unit(vec![0]);
        unit.set_output(0.7);

        unit.update_error(Feedback::Target(1.0));

        assert_relative_eq!(unit.error(), (0.7 - 1.0) * 0.7 * 0.3, epsilon = 1e-12);
        assert_eq!(unit.n_samples(), 1);
    }

    #[test]
    fn test_output_error_for_wrong_class_is_positive() {
        let mut unit = Perceptron::output_unit(vec![0]);
        unit.set_output(0.2);

        unit.update_error(Feedback::Target(0.0));

        assert_relative_eq!(unit.error(), 0.2 * 0.2 * 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_hidden_error_relu() {
        let mut unit = Perceptron::hidden(vec![0], Activation::ReLU);
        unit.set_weights(&[1.0]);
        unit.activate(&[0.5]);

        unit.update_error(Feedback::Downstream {
            errors: &[0.5, -0.25],
            weights: &[2.0, 1.0],
        });

        assert_relative_eq!(unit.error(), 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_hidden_error_inactive_relu_is_zero() {
        let mut unit = Perceptron::hidden(vec![0], Activation::ReLU);
        unit.set_weights(&[-1.0]);
        unit.activate(&[0.5]);

        unit.update_error(Feedback::Downstream {
            errors: &[0.5, 0.5],
            weights: &[2.0, 1.0],
        });

        assert_eq!(unit.error(), 0.0);
    }

    #[test]
    fn test_hidden_error_applies_derivative_once() {
        // Sigmoid of 0 is 0.5, so the derivative is 0.25.
        let mut unit = Perceptron::hidden(vec![0], Activation::Sigmoid);
        unit.activate(&[0.0]);

        unit.update_error(Feedback::Downstream {
            errors: &[1.0, 1.0, 1.0],
            weights: &[1.0, 1.0, 1.0],
        });

        assert_relative_eq!(unit.error(), 0.25 * 3.0, epsilon = 1e-12);
    }

    #[test]
    #[should_panic(expected = "same length")]
    fn test_downstream_length_mismatch_panics() {
        let mut unit = Perceptron::hidden(vec![0], Activation::ReLU);
        unit.update_error(Feedback::Downstream {
            errors: &[1.0, 2.0],
            weights: &[1.0],
        });
    }
}

// ============================================================================
// Accumulate / Apply Tests
// ============================================================================

mod accumulate_apply_tests {
    use super::*;

    fn unit_after_error(output: f64, target: f64) -> Perceptron {
        let mut unit = Perceptron::output_unit(vec![0, 1]);
        unit.set_weights(&[0.3, -0.6]);
        unit.set_bias(0.1);
        unit.set_output(output);
        unit.update_error(Feedback::Target(target));
        unit
    }

    #[test]
    fn test_accumulate_gradient_sums() {
        let mut unit = unit_after_error(0.6, 1.0);
        let error = unit.error();

        unit.accumulate_gradient(&[0.5, 2.0]);
        unit.accumulate_gradient(&[0.5, 2.0]);

        assert_relative_eq!(unit.weight_grad_sum()[0], 2.0 * error * 0.5, epsilon = 1e-12);
        assert_relative_eq!(unit.weight_grad_sum()[1], 2.0 * error * 2.0, epsilon = 1e-12);
        assert_relative_eq!(unit.bias_grad_sum(), 2.0 * error, epsilon = 1e-12);
    }

    #[test]
    fn test_apply_update_averages_over_samples() {
        let samples = [([0.2, 0.9], 0.6, 1.0), ([0.7, 0.1], 0.3, 0.0), ([1.0, 0.5], 0.8, 0.0)];
        let learning_rate = 0.5;

        let mut unit = Perceptron::output_unit(vec![0, 1]);
        unit.set_weights(&[0.3, -0.6]);
        unit.set_bias(0.1);

        let mut expected_grads = [0.0; 2];
        let mut expected_bias_grad = 0.0;
        for (inputs, output, target) in samples {
            unit.set_output(output);
            unit.update_error(Feedback::Target(target));
            unit.accumulate_gradient(&inputs);

            let error = (output - target) * output * (1.0 - output);
            expected_grads[0] += error * inputs[0];
            expected_grads[1] += error * inputs[1];
            expected_bias_grad += error;
        }
        assert_eq!(unit.n_samples(), 3);

        unit.apply_update(learning_rate).unwrap();

        assert_relative_eq!(
            unit.weights()[0],
            0.3 - learning_rate * expected_grads[0] / 3.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            unit.weights()[1],
            -0.6 - learning_rate * expected_grads[1] / 3.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            unit.bias(),
            0.1 - learning_rate * expected_bias_grad / 3.0,
            epsilon = 1e-12
        );
        assert_eq!(unit.n_samples(), 0);
    }

    #[test]
    fn test_batch_size_invariance() {
        let samples = [([0.2, 0.9], 0.6, 1.0), ([0.7, 0.1], 0.3, 0.0), ([1.0, 0.5], 0.8, 0.0)];
        let learning_rate = 0.1;

        let mut template = Perceptron::output_unit(vec![0, 1]);
        template.set_weights(&[0.3, -0.6]);
        template.set_bias(0.1);

        // One batch of n.
        let mut batched = template.clone();
        for (inputs, output, target) in samples {
            batched.set_output(output);
            batched.update_error(Feedback::Target(target));
            batched.accumulate_gradient(&inputs);
        }
        batched.apply_update(learning_rate).unwrap();

        // n batches of 1, gradients summed by hand.
        let mut grads = [0.0; 2];
        let mut bias_grad = 0.0;
        for (inputs, output, target) in samples {
            let mut single = template.clone();
            single.set_output(output);
            single.update_error(Feedback::Target(target));
            single.accumulate_gradient(&inputs);
            grads[0] += single.weight_grad_sum()[0];
            grads[1] += single.weight_grad_sum()[1];
            bias_grad += single.bias_grad_sum();
        }
        let n = samples.len() as f64;

        assert_relative_eq!(
            batched.weights()[0],
            0.3 - learning_rate * grads[0] / n,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            batched.weights()[1],
            -0.6 - learning_rate * grads[1] / n,
            epsilon = 1e-12
        );
        assert_relative_eq!(batched.bias(), 0.1 - learning_rate * bias_grad / n, epsilon = 1e-12);
    }

    #[test]
    fn test_apply_update_without_samples_fails() {
        let mut unit = Perceptron::hidden(vec![0, 1], Activation::ReLU);
        unit.set_weights(&[0.5, 0.5]);

        let result = unit.apply_update(0.1);

        assert!(matches!(result, Err(NetworkError::NoAccumulatedSamples)));
        assert_eq!(unit.weights(), &[0.5, 0.5]);
    }
}

// ============================================================================
// Network Backward Tests
// ============================================================================

mod network_backward_tests {
    use super::*;

    #[test]
    fn test_hidden_error_uses_column_of_next_layer_weights() {
        let config = TrainingConfig {
            layers: vec![784, 4, 3, 10],
            seed: Some(5),
            ..TrainingConfig::default()
        };
        let images = vec![band_image(6)];
        let mut network = network_with(config, &images);

        network.train_step(0).unwrap();

        for (layer_index, next_index) in [(2, 3), (1, 2)] {
            let layer = &network.layers()[layer_index];
            let next = &network.layers()[next_index];
            for (position, unit) in layer.units().iter().enumerate() {
                let weighted: f64 = next
                    .units()
                    .iter()
                    .map(|n| n.weight(position) * n.error())
                    .sum();
                let derivative = if unit.output() > 0.0 { 1.0 } else { 0.0 };
                assert_relative_eq!(unit.error(), derivative * weighted, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_train_step_accumulates_without_updating() {
        let config = TrainingConfig {
            layers: vec![784, 4, 10],
            seed: Some(9),
            ..TrainingConfig::default()
        };
        let images = vec![band_image(1), band_image(2)];
        let mut network = network_with(config, &images);
        let before: Vec<Vec<f64>> = network.layers()[1]
            .units()
            .iter()
            .map(|u| u.weights().to_vec())
            .collect();

        network.train_step(0).unwrap();
        network.train_step(1).unwrap();

        for (unit, weights) in network.layers()[1].units().iter().zip(&before) {
            assert_eq!(unit.weights(), weights.as_slice());
            assert_eq!(unit.n_samples(), 2);
        }
        for unit in network.layers()[2].units() {
            assert_eq!(unit.n_samples(), 2);
        }
        for unit in network.layers()[0].units() {
            assert_eq!(unit.n_samples(), 0);
        }
    }

    #[test]
    fn test_apply_updates_resets_every_unit() {
        let config = TrainingConfig {
            layers: vec![784, 4, 10],
            seed: Some(9),
            ..TrainingConfig::default()
        };
        let images = vec![band_image(1)];
        let mut network = network_with(config, &images);

        network.train_step(0).unwrap();
        network.apply_updates().unwrap();

        for layer in network.layers() {
            for unit in layer.units() {
                assert_eq!(unit.n_samples(), 0);
                assert_eq!(unit.bias_grad_sum(), 0.0);
            }
        }
    }

    #[test]
    fn test_apply_updates_without_samples_fails() {
        let config = TrainingConfig {
            layers: vec![784, 4, 10],
            seed: Some(9),
            ..TrainingConfig::default()
        };
        let images = vec![band_image(1)];
        let mut network = network_with(config, &images);

        assert!(matches!(
            network.apply_updates(),
            Err(NetworkError::NoAccumulatedSamples)
        ));
    }

    #[test]
    fn test_train_step_out_of_range() {
        let config = TrainingConfig {
            layers: vec![784, 4, 10],
            seed: Some(9),
            ..TrainingConfig::default()
        };
        let images = vec![band_image(1)];
        let mut network = network_with(config, &images);

        assert!(matches!(
            network.train_step(3),
            Err(NetworkError::SampleOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn test_single_update_raises_true_class_probability() {
        // Zero weights silence the hidden errors, so only output biases move:
        // the true class bias rises and every other bias falls.
        let config = TrainingConfig {
            layers: vec![784, 4, 10],
            initialization: "Zero".to_string(),
            learning_rate: 1.0,
            seed: Some(3),
            ..TrainingConfig::default()
        };
        let image = band_image(8);
        let images = vec![image.clone()];
        let mut network = network_with(config, &images);

        let before = network.infer(&image).unwrap()[8];
        network.train_step(0).unwrap();
        network.apply_updates().unwrap();
        let after = network.infer(&image).unwrap()[8];

        assert!(after > before, "expected {after} > {before}");
    }
}
