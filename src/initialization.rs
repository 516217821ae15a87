//! Weight initialization schemes
//!
//! Every scheme zeroes the bias and draws each weight independently of the
//! weights already present, so re-running a scheme with a fresh random source
//! fully determines the result.
//!
//! | scheme            | weight distribution                          |
//! |-------------------|----------------------------------------------|
//! | Zero              | 0                                            |
//! | Xavier            | Uniform(-1/n_in, 1/n_in)                     |
//! | Normalized Xavier | Uniform(-√6/(n_in+n_out), √6/(n_in+n_out))   |
//! | Kaiming           | Normal(0, √(2/n_in))                         |

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use crate::error::{NetworkError, Result};
use crate::layer::{Layer, LayerRole};

/// Initialization scheme selected once at network construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initialization {
    Xavier,
    NormalizedXavier,
    Kaiming,
    Zero,
}

impl Initialization {
    pub fn name(self) -> &'static str {
        match self {
            Initialization::Xavier => "Xavier",
            Initialization::NormalizedXavier => "Normalized Xavier",
            Initialization::Kaiming => "Kaiming",
            Initialization::Zero => "Zero",
        }
    }

    /// Fills `weights` for a unit with the given fan-in and fan-out.
    pub fn fill<R: Rng + ?Sized>(
        self,
        weights: &mut [f64],
        fan_in: usize,
        fan_out: usize,
        rng: &mut R,
    ) -> Result<()> {
        match self {
            Initialization::Zero => weights.fill(0.0),
            Initialization::Xavier => {
                let limit = 1.0 / fan_in as f64;
                sample_into(weights, uniform(limit)?, rng);
            }
            Initialization::NormalizedXavier => {
                let limit = 6.0f64.sqrt() / (fan_in + fan_out) as f64;
                sample_into(weights, uniform(limit)?, rng);
            }
            Initialization::Kaiming => {
                let std_dev = (2.0 / fan_in as f64).sqrt();
                let normal = Normal::new(0.0, std_dev)
                    .map_err(|err| NetworkError::Initialization(err.to_string()))?;
                sample_into(weights, normal, rng);
            }
        }
        Ok(())
    }
}

impl fmt::Display for Initialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Initialization {
    type Err = NetworkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(&['_', '-'][..], " ");
        match normalized.as_str() {
            "xavier" => Ok(Initialization::Xavier),
            "normalized" | "normalized xavier" => Ok(Initialization::NormalizedXavier),
            "kaiming" | "he" => Ok(Initialization::Kaiming),
            "zero" | "zeros" => Ok(Initialization::Zero),
            _ => Err(NetworkError::UnknownInitialization(s.to_string())),
        }
    }
}

fn uniform(limit: f64) -> Result<Uniform<f64>> {
    Uniform::new(-limit, limit).map_err(|err| NetworkError::Initialization(err.to_string()))
}

fn sample_into<R, D>(weights: &mut [f64], distribution: D, rng: &mut R)
where
    R: Rng + ?Sized,
    D: Distribution<f64>,
{
    for weight in weights.iter_mut() {
        *weight = distribution.sample(rng);
    }
}

/// Runs `scheme` over every non-input unit of `layers` and zeroes the biases.
///
/// The fan-out of a unit is the size of the next layer, or 1 for the last one.
pub fn initialize_layers<R: Rng + ?Sized>(
    layers: &mut [Layer],
    scheme: Initialization,
    rng: &mut R,
) -> Result<()> {
    let sizes: Vec<usize> = layers.iter().map(Layer::len).collect();

    for (index, layer) in layers.iter_mut().enumerate() {
        if layer.role() == LayerRole::Input {
            continue;
        }
        let fan_out = sizes.get(index + 1).copied().unwrap_or(1);
        for unit in layer.units_mut() {
            let fan_in = unit.fan_in();
            scheme.fill(unit.weights_mut(), fan_in, fan_out, rng)?;
            unit.set_bias(0.0);
        }
    }

    Ok(())
}
